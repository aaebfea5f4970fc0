//! Datapath control signal generation.
//!
//! A pure function from decoded fields to the control bits of the
//! conventional single-cycle datapath. The signals drive nothing here;
//! they are recorded per step for observability.

use bitflags::bitflags;
use parse_display::Display;

use super::decode::InstructionFields;
use crate::constants::*;

bitflags! {
    /// One-bit control lines
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControlSignals: u8 {
        const REG_WRITE  = 1 << 0;
        const MEM_READ   = 1 << 1;
        const MEM_WRITE  = 1 << 2;
        const MEM_TO_REG = 1 << 3;
        const BRANCH     = 1 << 4;
        const JUMP       = 1 << 5;
        const ALU_SRC    = 1 << 6;
        const REG_DST    = 1 << 7;
    }
}

/// ALU operation selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display(style = "snake_case")]
pub enum AluOp {
    Add,
    Subtract,
    And,
    Or,
    Xor,
    SetLessThan,
    SetLessThanUnsigned,
    UpperImmediate,
    /// R-type: the funct field selects the operation
    Funct,
    None,
}

/// The control word for one instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Control {
    pub signals: ControlSignals,
    pub alu_op: AluOp,
}

/// Derive the control word from decoded fields.
///
/// The mapping is per-opcode; R-type instructions share one row, with the
/// funct field left to the ALU decoder.
#[must_use]
pub fn control_signals(fields: InstructionFields) -> Control {
    use ControlSignals as S;

    let (signals, alu_op) = match fields.opcode {
        OP_R_TYPE => (S::REG_WRITE | S::REG_DST, AluOp::Funct),

        OP_LB | OP_LH | OP_LW | OP_LBU | OP_LHU => (
            S::REG_WRITE | S::MEM_READ | S::MEM_TO_REG | S::ALU_SRC,
            AluOp::Add,
        ),
        OP_SB | OP_SH | OP_SW => (S::MEM_WRITE | S::ALU_SRC, AluOp::Add),

        OP_BEQ | OP_BNE | OP_BGTZ | OP_BLEZ => (S::BRANCH, AluOp::Subtract),

        OP_ADDI | OP_ADDIU => (S::REG_WRITE | S::ALU_SRC, AluOp::Add),
        OP_SLTI => (S::REG_WRITE | S::ALU_SRC, AluOp::SetLessThan),
        OP_SLTIU => (S::REG_WRITE | S::ALU_SRC, AluOp::SetLessThanUnsigned),
        OP_ANDI => (S::REG_WRITE | S::ALU_SRC, AluOp::And),
        OP_ORI => (S::REG_WRITE | S::ALU_SRC, AluOp::Or),
        OP_XORI => (S::REG_WRITE | S::ALU_SRC, AluOp::Xor),
        OP_LUI => (S::REG_WRITE | S::ALU_SRC, AluOp::UpperImmediate),

        OP_J => (S::JUMP, AluOp::None),
        OP_JAL => (S::JUMP | S::REG_WRITE, AluOp::None),

        _ => (S::empty(), AluOp::None),
    };

    Control { signals, alu_op }
}
