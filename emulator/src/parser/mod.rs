//! Object file parsing
//!
//! An object file is a whitespace-separated list of tokens. A token starting with `@` moves the
//! load address, any other token is a word to store at the current load address. The parsing is
//! handled by the `nom` library; range checks are left to the [loader](crate::loader).

use std::ops::Range;

use nom::{
    branch::alt,
    character::complete::{char, multispace0, multispace1},
    combinator::{all_consuming, eof, map, map_res, peek},
    multi::many0,
    sequence::{preceded, terminated},
    Finish, IResult, Offset,
};

pub mod literal;

use self::literal::{take_digits, Radix};

/// A single token of an object file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    /// `@XXXX`: set the load address
    Origin(u32),

    /// `XXXX`: store a word and advance the load address
    Word(u32),
}

/// A record with the byte range it was parsed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located<T> {
    pub inner: T,
    pub location: Range<usize>,
}

fn parse_number(radix: Radix) -> impl FnMut(&str) -> IResult<&str, u32> {
    move |input| map_res(take_digits(radix), |digits| radix.parse(digits))(input)
}

fn parse_record(radix: Radix) -> impl FnMut(&str) -> IResult<&str, Record> {
    move |input| {
        // A token must end on a whitespace or at the end of the file
        terminated(
            alt((
                map(preceded(char('@'), parse_number(radix)), Record::Origin),
                map(parse_number(radix), Record::Word),
            )),
            peek(alt((multispace1, eof))),
        )(input)
    }
}

fn parse_located<'a>(
    source: &'a str,
    radix: Radix,
    input: &'a str,
) -> IResult<&'a str, Located<Record>> {
    let (input, _) = multispace0(input)?;
    let start = source.offset(input);
    let (rest, record) = parse_record(radix)(input)?;
    let end = source.offset(rest);
    Ok((
        rest,
        Located {
            inner: record,
            location: start..end,
        },
    ))
}

/// Parse a full object file
///
/// # Errors
///
/// On failure, returns the byte offset of the first token which could not be parsed.
pub fn parse_object(input: &str, radix: Radix) -> Result<Vec<Located<Record>>, usize> {
    let (_, records) = all_consuming(terminated(
        many0(|i| parse_located(input, radix, i)),
        multispace0,
    ))(input)
    .finish()
    .map_err(|e: nom::error::Error<&str>| input.offset(e.input))?;

    Ok(records)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn records(input: &str, radix: Radix) -> Vec<Record> {
        parse_object(input, radix)
            .unwrap()
            .into_iter()
            .map(|r| r.inner)
            .collect()
    }

    #[test]
    fn parse_record_test() {
        assert_eq!(
            parse_record(Radix::Hexadecimal)("@0200\n"),
            Ok(("\n", Record::Origin(0x200)))
        );
        assert_eq!(
            parse_record(Radix::Hexadecimal)("e02"),
            Ok(("", Record::Word(0xe02)))
        );
        assert!(parse_record(Radix::Octal)("@").is_err());
        assert!(parse_record(Radix::Octal)("12x").is_err()); // Trailing garbage
        assert!(parse_record(Radix::Octal)("0800").is_err()); // Not an octal token
    }

    #[test]
    fn parse_object_test() {
        let input = indoc::indoc! {"
            @0080
            e02
            f02

            @0010 001
        "};

        assert_eq!(
            records(input, Radix::Hexadecimal),
            vec![
                Record::Origin(0x80),
                Record::Word(0xe02),
                Record::Word(0xf02),
                Record::Origin(0x10),
                Record::Word(0x001),
            ]
        );
    }

    #[test]
    fn parse_wide_numbers_test() {
        // Range checks happen in the loader
        assert_eq!(
            records("@10000 ffffffffff", Radix::Hexadecimal),
            vec![Record::Origin(0x1_0000), Record::Word(u32::MAX)]
        );
    }

    #[test]
    fn parse_object_locations_test() {
        let records = parse_object("  @20\n 7402", Radix::Octal).unwrap();
        assert_eq!(
            records,
            vec![
                Located {
                    inner: Record::Origin(0o20),
                    location: 2..5,
                },
                Located {
                    inner: Record::Word(0o7402),
                    location: 7..11,
                },
            ]
        );
    }

    #[test]
    fn parse_object_error_test() {
        assert_eq!(parse_object("", Radix::Hexadecimal), Ok(Vec::new()));
        assert_eq!(parse_object("@10 12 zz 13", Radix::Hexadecimal), Err(7));
        assert_eq!(parse_object("1 2 @", Radix::Octal), Err(4));
        assert_eq!(parse_object("10 1x", Radix::Hexadecimal), Err(3));
    }
}
