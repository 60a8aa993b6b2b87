//! Operate instruction microcode

use tracing::{debug, info};

use crate::constants::{mask, Word, SIGN_BIT, WORD_MASK};

use super::exception::Exception;
use super::instructions::{Group1, Group2, Operate, Rotate};
use super::registers::{Registers, Status};

/// Mask of the 13-bit value made of the link and the accumulator
const LINK_AC_MASK: u16 = 0o17777;

fn rotate_left(value: u16, count: u32) -> u16 {
    (value << count | value >> (13 - count)) & LINK_AC_MASK
}

fn rotate_right(value: u16, count: u32) -> u16 {
    (value >> count | value << (13 - count)) & LINK_AC_MASK
}

/// Swap the two 6-bit halves of a word
const fn byte_swap(word: Word) -> Word {
    (word & 0o77) << 6 | (word & 0o7700) >> 6
}

/// Evaluate the skip condition of a group 2 instruction
fn should_skip(micro: Group2, registers: &Registers) -> bool {
    let negative = registers.ac & SIGN_BIT != 0;

    if micro.contains(Group2::REVERSE) {
        // Skip unless a selected condition fails (SZL, SNA, SPA)
        let mut skip = true;
        if micro.contains(Group2::SNL) && registers.link {
            skip = false;
        }
        if micro.contains(Group2::SZA) && registers.ac == 0 {
            skip = false;
        }
        if micro.contains(Group2::SMA) && negative {
            skip = false;
        }
        skip
    } else {
        // Skip if any selected condition holds (SNL, SZA, SMA)
        let mut skip = false;
        if micro.contains(Group2::SNL) && registers.link {
            skip = true;
        }
        if micro.contains(Group2::SZA) && registers.ac == 0 {
            skip = true;
        }
        if micro.contains(Group2::SMA) && negative {
            skip = true;
        }
        skip
    }
}

impl Registers {
    fn group1(&mut self, micro: Group1, rotate: Rotate) -> Result<(), Exception> {
        if micro.contains(Group1::CLA) {
            self.ac = 0;
        }

        if micro.contains(Group1::CLL) {
            self.link = false;
        }

        if micro.contains(Group1::CMA) {
            self.ac = !self.ac & WORD_MASK;
        }

        if micro.contains(Group1::CML) {
            self.link = !self.link;
        }

        if micro.contains(Group1::IAC) {
            self.set_link_ac(self.link_ac() + 1);
        }

        match rotate {
            Rotate::None => {}
            // Only the rotation is skipped, the micro-ops above still apply
            Rotate::Unsupported(code) => return Err(Exception::UnsupportedRotate(code)),
            Rotate::ByteSwap => self.ac = byte_swap(self.ac),
            Rotate::LeftOnce => self.set_link_ac(rotate_left(self.link_ac(), 1)),
            Rotate::LeftTwice => self.set_link_ac(rotate_left(self.link_ac(), 2)),
            Rotate::RightOnce => self.set_link_ac(rotate_right(self.link_ac(), 1)),
            Rotate::RightTwice => self.set_link_ac(rotate_right(self.link_ac(), 2)),
        }

        debug!(ac = format_args!("{:04o}", self.ac), link = self.link_bit(), "Group 1");
        Ok(())
    }

    fn group2(&mut self, micro: Group2) {
        if should_skip(micro, self) {
            debug!("Skipping next instruction");
            self.pc = mask(self.pc + 1);
        }

        if micro.contains(Group2::CLA) {
            self.ac = 0;
        }

        if micro.contains(Group2::OSR) {
            self.ac |= self.sr;
        }

        if micro.contains(Group2::HLT) {
            info!(pc = format_args!("{:04o}", self.pc), "Halting");
            self.status.remove(Status::RUN);
        }
    }

    /// Execute an operate instruction
    pub(crate) fn operate(&mut self, operate: Operate) -> Result<(), Exception> {
        match operate {
            Operate::Group1 { micro, rotate } => self.group1(micro, rotate),
            Operate::Group2(micro) => {
                self.group2(micro);
                Ok(())
            }
            Operate::Group3(word) => Err(Exception::Group3(word)),
        }
    }
}
