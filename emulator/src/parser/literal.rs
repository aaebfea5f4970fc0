//! Parse number literals.
//!
//! Literals are base 10, base 16 (prefixed by `0x`) or base 2 (prefixed by
//! `0b`), with an optional leading minus. Values are parsed wide; the
//! encoder masks them down to the field they land in.

use nom::branch::alt;
use nom::bytes::complete::{tag_no_case, take_while1};
use nom::character::complete::{char, digit1};
use nom::combinator::{cut, map_res, opt};
use nom::IResult;

fn is_hex_digit(c: char) -> bool {
    c.is_ascii_hexdigit()
}

fn is_bin_digit(c: char) -> bool {
    c == '0' || c == '1'
}

/// Extract a hexadecimal literal
fn parse_hexadecimal_literal(input: &str) -> IResult<&str, i64> {
    let (input, _) = tag_no_case("0x")(input)?;
    cut(map_res(take_while1(is_hex_digit), |digits| {
        i64::from_str_radix(digits, 16)
    }))(input)
}

/// Extract a binary literal
fn parse_binary_literal(input: &str) -> IResult<&str, i64> {
    let (input, _) = tag_no_case("0b")(input)?;
    cut(map_res(take_while1(is_bin_digit), |digits| {
        i64::from_str_radix(digits, 2)
    }))(input)
}

/// Extract a decimal literal
fn parse_decimal_literal(input: &str) -> IResult<&str, i64> {
    map_res(digit1, str::parse)(input)
}

/// Parse a number literal in any of the accepted radices
pub(crate) fn parse_number_literal(input: &str) -> IResult<&str, i64> {
    alt((
        parse_hexadecimal_literal,
        parse_binary_literal,
        parse_decimal_literal,
    ))(input)
}

/// Parse a number literal with an optional leading minus
pub(crate) fn parse_immediate(input: &str) -> IResult<&str, i64> {
    let (input, sign) = opt(char('-'))(input)?;
    let (input, value) = parse_number_literal(input)?;
    let value = if sign.is_some() { -value } else { value };
    Ok((input, value))
}
