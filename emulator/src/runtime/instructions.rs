//! Instruction decoding
//!
//! A word decodes to an [`Instruction`], which can be displayed with the usual PDP-8 mnemonics.
//! Execution dispatches on the [`Opcode`] and lives in the sibling modules.

use bitflags::bitflags;
use parse_display::Display;

use crate::constants::{Word, PAGE_OFFSET_MASK};

/// Indirect addressing bit of a memory-reference instruction
pub const INDIRECT_BIT: Word = 0o400;

/// Page zero select bit of a memory-reference instruction
pub const PAGE_ZERO_BIT: Word = 0o200;

/// Group select bit of an operate instruction
const GROUP_BIT: Word = 0o400;

/// Group 3 select bit of a group 2 operate instruction
const GROUP_3_BIT: Word = 0o001;

/// Rotate field of a group 1 operate instruction
const ROTATE_FIELD: Word = 0o016;

/// Major opcode, the 3 upper bits of an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display(style = "UPPERCASE")]
pub enum Opcode {
    /// Bitwise `and` of the accumulator with a memory word
    And = 0,

    /// Two's complement add of a memory word to the accumulator
    Tad = 1,

    /// Increment a memory word, skip the next instruction if it became zero
    Isz = 2,

    /// Deposit the accumulator in memory and clear it
    Dca = 3,

    /// Jump to subroutine
    Jms = 4,

    /// Jump
    Jmp = 5,

    /// Input/output transfer
    Iot = 6,

    /// Operate (microinstructions)
    Opr = 7,
}

impl Opcode {
    pub const ALL: [Self; 8] = [
        Self::And,
        Self::Tad,
        Self::Isz,
        Self::Dca,
        Self::Jms,
        Self::Jmp,
        Self::Iot,
        Self::Opr,
    ];

    /// Extract the opcode of an instruction word
    #[must_use]
    pub const fn decode(word: Word) -> Self {
        Self::ALL[((word >> 9) & 0o7) as usize]
    }

    /// Clock cycles spent on the instruction before any address resolution
    #[must_use]
    pub const fn base_cost(self) -> u64 {
        match self {
            Self::And | Self::Tad | Self::Isz | Self::Dca | Self::Jms => 2,
            Self::Jmp | Self::Opr => 1,
            Self::Iot => 0,
        }
    }

    /// Index of the opcode in per-opcode tables
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Floating point coprocessor operations, selected by the full IOT word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Iot {
    /// Clear the floating accumulator
    #[display("FPCLR")]
    Clear,

    /// Load the floating accumulator from memory
    #[display("FPLOAD")]
    Load,

    /// Store the floating accumulator in memory
    #[display("FPSTORE")]
    Store,

    /// Add a value from memory to the floating accumulator
    #[display("FPADD")]
    Add,

    /// Multiply the floating accumulator by a value from memory
    #[display("FPMULT")]
    Multiply,
}

impl Iot {
    /// Decode an IOT instruction word, returning `None` for unknown device codes
    #[must_use]
    pub const fn decode(word: Word) -> Option<Self> {
        match word {
            0o6550 => Some(Self::Clear),
            0o6551 => Some(Self::Load),
            0o6552 => Some(Self::Store),
            0o6553 => Some(Self::Add),
            0o6554 => Some(Self::Multiply),
            _ => None,
        }
    }

    /// Whether the operation takes an operand pointer from the next word
    #[must_use]
    pub const fn has_operand(self) -> bool {
        !matches!(self, Self::Clear)
    }
}

bitflags! {
    /// Group 1 microinstructions, applied in declaration order
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Group1: Word {
        /// Clear accumulator
        const CLA = 0o200;
        /// Clear link
        const CLL = 0o100;
        /// Complement accumulator
        const CMA = 0o040;
        /// Complement link
        const CML = 0o020;
        /// Increment accumulator (and link)
        const IAC = 0o001;
    }
}

bitflags! {
    /// Group 2 microinstructions
    ///
    /// The skip conditions read differently when [`Group2::REVERSE`] is set: `SMA` becomes `SPA`,
    /// `SZA` becomes `SNA` and `SNL` becomes `SZL`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Group2: Word {
        /// Clear accumulator
        const CLA = 0o200;
        /// Skip on minus accumulator (`SPA` when reversed)
        const SMA = 0o100;
        /// Skip on zero accumulator (`SNA` when reversed)
        const SZA = 0o040;
        /// Skip on non-zero link (`SZL` when reversed)
        const SNL = 0o020;
        /// Reverse the sense of the skip
        const REVERSE = 0o010;
        /// OR the switch register into the accumulator
        const OSR = 0o004;
        /// Halt
        const HLT = 0o002;
    }
}

/// Rotation applied at the end of a group 1 instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotate {
    None,

    /// Swap the two 6-bit halves of the accumulator
    ByteSwap,

    /// Rotate accumulator and link left once
    LeftOnce,

    /// Rotate accumulator and link left twice
    LeftTwice,

    /// Rotate accumulator and link right once
    RightOnce,

    /// Rotate accumulator and link right twice
    RightTwice,

    /// Codes 6 and 7 have no meaning
    Unsupported(u8),
}

impl Rotate {
    #[allow(clippy::cast_possible_truncation)]
    const fn decode(word: Word) -> Self {
        match (word & ROTATE_FIELD) >> 1 {
            0 => Self::None,
            1 => Self::ByteSwap,
            2 => Self::LeftOnce,
            3 => Self::LeftTwice,
            4 => Self::RightOnce,
            5 => Self::RightTwice,
            code => Self::Unsupported(code as u8),
        }
    }

    const fn mnemonic(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::ByteSwap => Some("BSW"),
            Self::LeftOnce => Some("RAL"),
            Self::LeftTwice => Some("RTL"),
            Self::RightOnce => Some("RAR"),
            Self::RightTwice => Some("RTR"),
            Self::Unsupported(6) => Some("ROT6"),
            Self::Unsupported(_) => Some("ROT7"),
        }
    }
}

/// Decoded operate instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operate {
    Group1 { micro: Group1, rotate: Rotate },
    Group2(Group2),
    Group3(Word),
}

impl Operate {
    #[must_use]
    pub const fn decode(word: Word) -> Self {
        if word & GROUP_BIT == 0 {
            Self::Group1 {
                micro: Group1::from_bits_truncate(word),
                rotate: Rotate::decode(word),
            }
        } else if word & GROUP_3_BIT != 0 {
            Self::Group3(word)
        } else {
            Self::Group2(Group2::from_bits_truncate(word))
        }
    }
}

impl std::fmt::Display for Operate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut words: Vec<&str> = Vec::new();
        match *self {
            Self::Group1 { micro, rotate } => {
                for (flag, name) in [
                    (Group1::CLA, "CLA"),
                    (Group1::CLL, "CLL"),
                    (Group1::CMA, "CMA"),
                    (Group1::CML, "CML"),
                    (Group1::IAC, "IAC"),
                ] {
                    if micro.contains(flag) {
                        words.push(name);
                    }
                }
                words.extend(rotate.mnemonic());
            }

            Self::Group2(micro) => {
                let reverse = micro.contains(Group2::REVERSE);
                let conditions = [
                    (Group2::SMA, "SMA", "SPA"),
                    (Group2::SZA, "SZA", "SNA"),
                    (Group2::SNL, "SNL", "SZL"),
                ];
                for (flag, name, reversed) in conditions {
                    if micro.contains(flag) {
                        words.push(if reverse { reversed } else { name });
                    }
                }
                if reverse && !micro.intersects(Group2::SMA | Group2::SZA | Group2::SNL) {
                    words.push("SKP");
                }
                for (flag, name) in [
                    (Group2::CLA, "CLA"),
                    (Group2::OSR, "OSR"),
                    (Group2::HLT, "HLT"),
                ] {
                    if micro.contains(flag) {
                        words.push(name);
                    }
                }
            }

            Self::Group3(word) => return write!(f, "OPR {word:04o}"),
        }

        if words.is_empty() {
            write!(f, "NOP")
        } else {
            write!(f, "{}", words.join(" "))
        }
    }
}

/// A decoded instruction word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// One of the six memory-reference instructions
    Memory {
        opcode: Opcode,
        indirect: bool,
        page_zero: bool,
        offset: Word,
    },

    /// A known floating point IOT
    Iot(Iot),

    /// An IOT with an unknown device code
    InvalidIot(Word),

    Operate(Operate),
}

impl Instruction {
    #[must_use]
    pub const fn decode(word: Word) -> Self {
        match Opcode::decode(word) {
            Opcode::Iot => match Iot::decode(word) {
                Some(iot) => Self::Iot(iot),
                None => Self::InvalidIot(word),
            },
            Opcode::Opr => Self::Operate(Operate::decode(word)),
            opcode => Self::Memory {
                opcode,
                indirect: word & INDIRECT_BIT != 0,
                page_zero: word & PAGE_ZERO_BIT != 0,
                offset: word & PAGE_OFFSET_MASK,
            },
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory {
                opcode,
                indirect,
                page_zero,
                offset,
            } => {
                write!(f, "{opcode}")?;
                if *indirect {
                    write!(f, " I")?;
                }
                if *page_zero {
                    write!(f, " Z")?;
                }
                write!(f, " {offset:03o}")
            }
            Self::Iot(iot) => write!(f, "{iot}"),
            Self::InvalidIot(word) => write!(f, "IOT {word:04o}"),
            Self::Operate(operate) => write!(f, "{operate}"),
        }
    }
}
