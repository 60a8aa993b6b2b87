//! Parse number literals.
//!
//! Object files carry bare digits in a fixed [`Radix`]. Literals typed by a user (on the command
//! line or in the debugger) may instead carry a prefix: `0x` for hexadecimal, `0o` for octal and
//! `0b` for binary. Anything else is decimal.

use std::num::{IntErrorKind, ParseIntError};
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_while1},
    combinator::{all_consuming, map_res},
    Finish, IResult,
};
use thiserror::Error;

use crate::constants::{Word, WORD_MASK};

/// Base of the digits found in an object file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Radix {
    #[default]
    Hexadecimal,
    Octal,
}

impl Radix {
    const fn base(self) -> u32 {
        match self {
            Self::Hexadecimal => 16,
            Self::Octal => 8,
        }
    }

    /// Check if character is a digit in this radix
    #[must_use]
    pub fn is_digit(self, c: char) -> bool {
        c.is_digit(self.base())
    }

    /// Parse a string of digits in this radix
    ///
    /// Values too wide for 32 bits saturate to [`u32::MAX`].
    ///
    /// # Errors
    ///
    /// Fails if the input is empty or if a character is not a digit
    pub fn parse(self, input: &str) -> Result<u32, ParseIntError> {
        match u32::from_str_radix(input, self.base()) {
            Err(e) if *e.kind() == IntErrorKind::PosOverflow => Ok(u32::MAX),
            result => result,
        }
    }
}

/// Take a run of digits in the given radix
pub(crate) fn take_digits(radix: Radix) -> impl FnMut(&str) -> IResult<&str, &str> {
    move |input| take_while1(|c| radix.is_digit(c))(input)
}

fn from_decimal(input: &str) -> Result<u16, ParseIntError> {
    u16::from_str(input)
}

fn take_prefixed<'a>(
    prefix: &'static str,
    radix: u32,
) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    move |input| {
        let (input, _) = tag_no_case(prefix)(input)?;
        take_while1(|c: char| c.is_digit(radix))(input)
    }
}

/// Parse a prefixed number literal
pub fn parse_literal(input: &str) -> IResult<&str, u16> {
    alt((
        map_res(take_prefixed("0x", 16), |s| u16::from_str_radix(s, 16)),
        map_res(take_prefixed("0o", 8), |s| u16::from_str_radix(s, 8)),
        map_res(take_prefixed("0b", 2), |s| u16::from_str_radix(s, 2)),
        map_res(take_while1(|c: char| c.is_ascii_digit()), from_decimal),
    ))(input)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LiteralParseError {
    #[error("invalid number literal {0:?}")]
    Invalid(String),

    #[error("value {0:#o} does not fit in a 12-bit word")]
    TooWide(u16),
}

/// Parse a complete literal which must fit in a machine word
///
/// # Errors
///
/// Fails if the input is not exactly one literal or if it is wider than 12 bits
pub fn parse_word(input: &str) -> Result<Word, LiteralParseError> {
    let (_, value) = all_consuming(parse_literal)(input.trim())
        .finish()
        .map_err(|_: nom::error::Error<&str>| LiteralParseError::Invalid(input.to_owned()))?;

    if value > WORD_MASK {
        return Err(LiteralParseError::TooWide(value));
    }

    Ok(value)
}
