//! A MIPS32 assembler and single-cycle simulator.
//!
//! The [`assembler`] turns program text into binary-exact machine words in
//! two passes; the [`runtime`] executes them one committed instruction per
//! cycle against a modeled processor (32 general-purpose registers, HI/LO,
//! PC, and 64 KiB of big-endian byte-addressable memory).
//!
//! Known deviations from strict MIPS32, on purpose: `add`/`addi`/`sub`
//! wrap instead of trapping on signed overflow, branch delay slots are not
//! modeled, and `div`/`divu` with a zero divisor leave HI/LO unchanged.

pub mod assembler;
pub mod constants;
pub mod parser;
pub mod runtime;

pub use self::{assembler::assemble, parser::parse, runtime::Processor};
