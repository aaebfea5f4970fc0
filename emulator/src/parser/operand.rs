//! Instruction operand parsing.
//!
//! Operands come in four shapes: a register reference, an immediate
//! literal, a label reference, or the `offset(base)` form used by loads and
//! stores. The `offset(base)` form is parsed into its own variant here;
//! nothing downstream re-interprets strings.

use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::take_while1;
use nom::character::complete::char;
use nom::combinator::{map, map_res};
use nom::sequence::{delimited, preceded};
use nom::IResult;

use super::literal::parse_immediate;
use super::parse_identifier;
use crate::runtime::Reg;

/// A single instruction operand, as written in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A register reference, e.g. `$t0`
    Register(Reg),

    /// An immediate literal, e.g. `-3` or `0xFF`
    Immediate(i64),

    /// A memory operand, e.g. `4($sp)`
    Indexed { offset: i64, base: Reg },

    /// A label reference, e.g. `loop`
    Label(String),
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Register(reg) => write!(f, "{reg}"),
            Self::Immediate(value) => write!(f, "{value}"),
            Self::Indexed { offset, base } => write!(f, "{offset}({base})"),
            Self::Label(label) => write!(f, "{label}"),
        }
    }
}

/// Parse a register reference, `$` followed by a number or an ABI name
pub(crate) fn parse_register(input: &str) -> IResult<&str, Reg> {
    map_res(
        preceded(char('$'), take_while1(|c: char| c.is_ascii_alphanumeric())),
        Reg::from_str,
    )(input)
}

/// Parse an `offset(base)` memory operand
fn parse_indexed(input: &str) -> IResult<&str, Operand> {
    let (input, offset) = parse_immediate(input)?;
    let (input, base) = delimited(char('('), parse_register, char(')'))(input)?;
    Ok((input, Operand::Indexed { offset, base }))
}

/// Parse any operand form
pub(crate) fn parse_operand(input: &str) -> IResult<&str, Operand> {
    alt((
        parse_indexed,
        map(parse_register, Operand::Register),
        map(parse_immediate, Operand::Immediate),
        map(parse_identifier, |label| Operand::Label(label.to_string())),
    ))(input)
}
