use std::str::FromStr;

use nom::branch::alt;
use nom::combinator::{all_consuming, map, map_res};
use nom::number::complete::recognize_float;
use nom::{Finish, IResult};
use pdp8_emulator::constants as C;
use pdp8_emulator::parser::literal::{parse_literal, parse_word, LiteralParseError};
use pdp8_emulator::runtime::Reg;
use thiserror::Error;

/// Where the `set` command writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentTarget {
    Register(Reg),
    Address(C::Address),
}

#[derive(Debug, Error)]
#[error("expected a register name or an address: {0}")]
pub struct ParseTargetError(#[from] LiteralParseError);

impl FromStr for AssignmentTarget {
    type Err = ParseTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(reg) = s.parse() {
            return Ok(Self::Register(reg));
        }

        Ok(Self::Address(parse_word(s)?))
    }
}

/// A value typed by the user
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Integer(u16),
    Float(f32),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValueError {
    #[error("could not parse value {0:?}")]
    Invalid(String),

    #[error("expected a 12-bit integer, got {0}")]
    NotAWord(String),
}

fn parse_value(input: &str) -> IResult<&str, Value> {
    alt((
        all_consuming(map(parse_literal, Value::Integer)),
        all_consuming(map_res(recognize_float, |s: &str| {
            s.parse::<f32>().map(Value::Float)
        })),
    ))(input)
}

impl FromStr for Value {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (_, value) = parse_value(s.trim())
            .finish()
            .map_err(|_: nom::error::Error<&str>| ValueError::Invalid(s.to_owned()))?;
        Ok(value)
    }
}

impl Value {
    /// The value as a 12-bit machine word
    pub fn word(self) -> Result<C::Word, ValueError> {
        match self {
            Self::Integer(value) if value <= C::WORD_MASK => Ok(value),
            Self::Integer(value) => Err(ValueError::NotAWord(format!("{value:#o}"))),
            Self::Float(value) => Err(ValueError::NotAWord(value.to_string())),
        }
    }

    /// The value in the floating accumulator layout
    pub fn float_bits(self) -> u32 {
        match self {
            Self::Integer(value) => f32::from(value).to_bits(),
            Self::Float(value) => value.to_bits(),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value:04o}"),
            Self::Float(value) => write!(f, "{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_target_test() {
        assert_eq!(
            "ac".parse::<AssignmentTarget>().unwrap(),
            AssignmentTarget::Register(Reg::AC)
        );
        assert_eq!(
            "0o200".parse::<AssignmentTarget>().unwrap(),
            AssignmentTarget::Address(0o200)
        );
        assert!("0o10000".parse::<AssignmentTarget>().is_err());
        assert!("foo".parse::<AssignmentTarget>().is_err());
    }

    #[test]
    fn parse_value_test() {
        assert_eq!("0o7402".parse::<Value>(), Ok(Value::Integer(0o7402)));
        assert_eq!("42".parse::<Value>(), Ok(Value::Integer(42)));
        assert_eq!("-2.5".parse::<Value>(), Ok(Value::Float(-2.5)));
        assert_eq!("1e3".parse::<Value>(), Ok(Value::Float(1000.0)));
        assert!("twelve".parse::<Value>().is_err());
    }

    #[test]
    fn value_conversion_test() {
        assert_eq!(Value::Integer(0o7777).word(), Ok(0o7777));
        assert!(Value::Integer(0o10000).word().is_err());
        assert!(Value::Float(1.5).word().is_err());

        assert_eq!(Value::Integer(3).float_bits(), 3.0f32.to_bits());
        assert_eq!(Value::Float(-2.5).float_bits(), (-2.5f32).to_bits());
    }
}
