//! Load object files in memory

use miette::SourceSpan;
use thiserror::Error;
use tracing::debug;

use crate::constants::{Address, Word, MEMORY_SIZE, WORD_MASK};
use crate::parser::{literal::Radix, parse_object, Record};
use crate::runtime::Memory;

#[derive(Error, Debug, Clone, PartialEq, Eq, miette::Diagnostic)]
pub enum LoadError {
    #[error("invalid token in object file")]
    #[diagnostic(help("tokens are `@` followed by an address, or a word, in {radix}"))]
    Syntax {
        #[label("this token")]
        span: SourceSpan,
        radix: &'static str,
    },

    #[error("address {address:#o} is out of memory")]
    OutOfRange {
        address: u32,
        #[label("loading here")]
        span: SourceSpan,
    },

    #[error("word {value:#o} does not fit in 12 bits")]
    InvalidWord {
        value: u32,
        #[label("this word")]
        span: SourceSpan,
    },
}

/// Length of the whitespace-delimited token starting at `offset`
fn token_len(source: &str, offset: usize) -> usize {
    source[offset..]
        .find(char::is_whitespace)
        .unwrap_or(source.len() - offset)
}

/// Load an object file into a fresh memory
///
/// # Errors
///
/// Fails on invalid tokens, words wider than 12 bits and addresses past the end of memory.
pub fn load(source: &str, radix: Radix) -> Result<Memory, LoadError> {
    let records = parse_object(source, radix).map_err(|offset| LoadError::Syntax {
        span: (offset, token_len(source, offset)).into(),
        radix: match radix {
            Radix::Hexadecimal => "hexadecimal",
            Radix::Octal => "octal",
        },
    })?;

    let mut memory = Memory::default();
    let mut address: Address = 0;
    let mut loaded = 0;

    for record in records {
        let span: SourceSpan = record.location.into();
        match record.inner {
            Record::Origin(origin) => {
                address = match Address::try_from(origin) {
                    Ok(origin) if usize::from(origin) < MEMORY_SIZE => origin,
                    _ => {
                        return Err(LoadError::OutOfRange {
                            address: origin,
                            span,
                        });
                    }
                };
            }

            Record::Word(value) => {
                let word = match Word::try_from(value) {
                    Ok(word) if word <= WORD_MASK => word,
                    _ => return Err(LoadError::InvalidWord { value, span }),
                };

                memory.set(address, word).map_err(|_| LoadError::OutOfRange {
                    address: address.into(),
                    span,
                })?;

                address += 1;
                loaded += 1;
            }
        }
    }

    debug!(words = loaded, "Object file loaded");
    Ok(memory)
}
