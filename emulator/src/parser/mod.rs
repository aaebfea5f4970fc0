//! Assembly source parsing.
//!
//! The parser turns program text into a list of [`Line`]s, each carrying
//! its label definitions and an optional instruction (mnemonic plus
//! structured operands). It is deliberately permissive: unknown mnemonics
//! and operand-shape mistakes are reported by the assembler, with the
//! label environment in hand.

use nom::bytes::complete::take_while;
use nom::character::complete::satisfy;
use nom::combinator::{all_consuming, recognize};
use nom::sequence::pair;
use nom::IResult;
use thiserror::Error;

mod line;
mod literal;
mod operand;

pub use self::line::{Line, LineContent};
pub use self::operand::Operand;

/// Error raised when a source line does not parse
#[derive(Debug, Error, PartialEq)]
#[error("line {line}: invalid syntax near {snippet:?}")]
pub struct ParseError {
    pub line: usize,
    pub snippet: String,
}

/// Parses an identifier: a letter or underscore, then letters, digits and
/// underscores
pub(crate) fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

/// Parses a whole program, one line at a time.
///
/// Comments run from `#` to the end of the line and are stripped here.
pub fn parse(input: &str) -> Result<Vec<Line>, ParseError> {
    input
        .lines()
        .enumerate()
        .map(|(index, raw)| {
            let code = raw.split('#').next().unwrap_or_default();
            let (_, mut line) =
                all_consuming(line::parse_line)(code).map_err(|_| ParseError {
                    line: index + 1,
                    snippet: code.trim().to_string(),
                })?;
            line.number = index + 1;
            Ok(line)
        })
        .collect()
}
