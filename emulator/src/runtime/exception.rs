use thiserror::Error;

use crate::constants::Word;

/// Faults raised while executing an instruction.
///
/// None of them stops the processor: the faulting operation is skipped and execution continues
/// with the next instruction.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exception {
    #[error("invalid IOT instruction {0:04o}")]
    InvalidIot(Word),

    #[error("unsupported group 1 rotate code {0}")]
    UnsupportedRotate(u8),

    #[error("group 3 microinstruction {0:04o}")]
    Group3(Word),
}
