//! Program line parsing.
//!
//! A line holds zero or more label definitions followed by at most one
//! instruction. Comments (`#` to end of line) are stripped before this
//! module sees the text. The mnemonic is not validated here: any
//! identifier is accepted and checked when the line is encoded, which
//! keeps this pass permissive.

use nom::branch::alt;
use nom::character::complete::{char, space0, space1};
use nom::combinator::{opt, value};
use nom::multi::separated_list1;
use nom::sequence::{delimited, preceded};
use nom::IResult;

use super::operand::{parse_operand, Operand};
use super::parse_identifier;

/// The instruction part of a line
#[derive(Debug, Clone, PartialEq)]
pub struct LineContent {
    /// Lowercased mnemonic
    pub mnemonic: String,
    pub operands: Vec<Operand>,
    /// The instruction text as written (labels and comment stripped)
    pub source: String,
}

/// A source line: label definitions plus an optional instruction
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Line {
    /// 1-based line number in the source text
    pub number: usize,
    pub labels: Vec<String>,
    pub content: Option<LineContent>,
}

/// Parses a label definition, `identifier ":"`
fn parse_label_definition(input: &str) -> IResult<&str, String> {
    let (input, label) = parse_identifier(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = char(':')(input)?;
    Ok((input, label.to_string()))
}

/// Parses the separator between two operands: a comma (with optional
/// surrounding spaces) or plain whitespace
fn parse_operand_separator(input: &str) -> IResult<&str, ()> {
    alt((
        value((), delimited(space0, char(','), space0)),
        value((), space1),
    ))(input)
}

/// Parses a mnemonic and its operand list
fn parse_line_content(input: &str) -> IResult<&str, (String, Vec<Operand>)> {
    let (input, mnemonic) = parse_identifier(input)?;
    let (input, operands) = opt(preceded(
        space1,
        separated_list1(parse_operand_separator, parse_operand),
    ))(input)?;
    Ok((input, (mnemonic.to_lowercase(), operands.unwrap_or_default())))
}

/// Parses a whole line
pub(super) fn parse_line(input: &str) -> IResult<&str, Line> {
    let (rest, _) = space0(input)?;

    // Extract the label definitions
    let mut cursor = rest;
    let mut labels = Vec::new();
    while let (rest, Some(label)) = opt(parse_label_definition)(cursor)? {
        let (rest, _) = space0(rest)?;
        labels.push(label);
        cursor = rest;
    }

    // What remains (trimmed) is the instruction as written
    let source = cursor.trim_end();

    let (rest, content) = opt(parse_line_content)(cursor)?;
    let (rest, _) = space0(rest)?;

    let content = content.map(|(mnemonic, operands)| LineContent {
        mnemonic,
        operands,
        source: source.to_string(),
    });

    Ok((
        rest,
        Line {
            number: 0,
            labels,
            content,
        },
    ))
}
