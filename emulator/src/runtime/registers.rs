use bitflags::bitflags;
use parse_display::Display;
use thiserror::Error;

use crate::constants::{self as C, mask};

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        /// Interrupts are enabled
        const INTERRUPTS_ON     = 0b001;
        /// A device requests an interrupt
        const INTERRUPT_REQUEST = 0b010;
        /// The processor is running. Cleared by the `HLT` microinstruction.
        const RUN               = 0b100;
    }
}

impl Default for Status {
    fn default() -> Self {
        // On startup, only the run bit is set
        Status::RUN
    }
}

impl std::fmt::Debug for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#05b}", self.bits())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registers {
    /// Program counter
    pub pc: C::Address,

    /// Instruction register
    pub ir: C::Word,

    /// Accumulator
    pub ac: C::Word,

    /// Link, the carry out of the accumulator
    pub link: bool,

    /// Memory address register, the last resolved effective address
    pub ma: C::Address,

    /// Front panel switch register
    pub sr: C::Word,

    /// Floating accumulator, in the single precision layout
    pub fpac: u32,

    /// Page of the instruction being executed
    pub page: C::Word,

    /// Interrupt and run flags
    pub status: Status,
}

impl Default for Registers {
    fn default() -> Self {
        Self {
            pc: C::PROGRAM_START,
            ir: 0,
            ac: 0,
            link: false,
            ma: 0,
            sr: 0,
            fpac: 0,
            page: 0,
            status: Status::default(),
        }
    }
}

impl Registers {
    /// The link as a single bit
    #[must_use]
    pub const fn link_bit(&self) -> C::Word {
        if self.link {
            1
        } else {
            0
        }
    }

    /// Accumulator and link, as a 13-bit value with the link on top
    #[must_use]
    pub const fn link_ac(&self) -> u16 {
        self.link_bit() << 12 | self.ac
    }

    /// Split a 13-bit value back into the link and the accumulator
    pub fn set_link_ac(&mut self, value: u16) {
        self.link = value & 0o10000 != 0;
        self.ac = mask(value);
    }

    #[must_use]
    pub fn get(&self, reg: Reg) -> u32 {
        match reg {
            Reg::PC => self.pc.into(),
            Reg::IR => self.ir.into(),
            Reg::AC => self.ac.into(),
            Reg::L => self.link_bit().into(),
            Reg::MA => self.ma.into(),
            Reg::SR => self.sr.into(),
            Reg::FPAC => self.fpac,
        }
    }

    /// Set a register value
    ///
    /// Values of 12-bit registers are masked, and the link only keeps its lowest bit.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set(&mut self, reg: Reg, value: u32) {
        let word = mask(value as C::Word);
        match reg {
            Reg::PC => self.pc = word,
            Reg::IR => self.ir = word,
            Reg::AC => self.ac = word,
            Reg::L => self.link = value & 1 != 0,
            Reg::MA => self.ma = word,
            Reg::SR => self.sr = word,
            Reg::FPAC => self.fpac = value,
        }
    }

    /// Check if the processor is still running
    #[must_use]
    pub const fn running(&self) -> bool {
        self.status.contains(Status::RUN)
    }
}

impl std::fmt::Display for Registers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PC = {:04o} | IR = {:04o} | AC = {:04o} | L = {} | MA = {:04o} | SR = {:04o} | FPAC = {:08x} | status = {:?}",
            self.pc,
            self.ir,
            self.ac,
            self.link_bit(),
            self.ma,
            self.sr,
            self.fpac,
            self.status
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Reg {
    /// Program counter
    PC,

    /// Instruction register
    IR,

    /// Accumulator
    AC,

    /// Link
    L,

    /// Memory address register
    MA,

    /// Switch register
    SR,

    /// Floating accumulator
    FPAC,
}

#[derive(Error, Debug)]
#[error("could not parse register")]
pub struct RegisterParseError;

impl std::str::FromStr for Reg {
    type Err = RegisterParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pc" => Ok(Reg::PC),
            "ir" => Ok(Reg::IR),
            "ac" => Ok(Reg::AC),
            "l" | "link" => Ok(Reg::L),
            "ma" => Ok(Reg::MA),
            "sr" | "switches" => Ok(Reg::SR),
            "fpac" => Ok(Reg::FPAC),
            _ => Err(RegisterParseError),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_state_test() {
        let registers = Registers::default();
        assert_eq!(registers.pc, 0o200);
        assert_eq!(registers.ac, 0);
        assert!(!registers.link);
        assert!(registers.running());
        assert!(!registers.status.contains(Status::INTERRUPTS_ON));
        assert!(!registers.status.contains(Status::INTERRUPT_REQUEST));
    }

    #[test]
    fn link_ac_test() {
        let mut registers = Registers::default();
        registers.set_link_ac(0o17777);
        assert!(registers.link);
        assert_eq!(registers.ac, 0o7777);
        assert_eq!(registers.link_ac(), 0o17777);

        registers.set_link_ac(0o20000);
        assert!(!registers.link);
        assert_eq!(registers.ac, 0);
    }

    #[test]
    fn get_set_test() {
        let mut registers = Registers::default();
        registers.set(Reg::AC, 0o17777);
        assert_eq!(registers.get(Reg::AC), 0o7777);

        registers.set(Reg::L, 3);
        assert_eq!(registers.get(Reg::L), 1);

        registers.set(Reg::FPAC, 0xdead_beef);
        assert_eq!(registers.get(Reg::FPAC), 0xdead_beef);
    }

    #[test]
    fn parse_register_test() {
        assert_eq!("pc".parse::<Reg>().unwrap(), Reg::PC);
        assert_eq!("FPAC".parse::<Reg>().unwrap(), Reg::FPAC);
        assert_eq!("link".parse::<Reg>().unwrap(), Reg::L);
        assert!("sp".parse::<Reg>().is_err());
        assert_eq!(Reg::FPAC.to_string(), "FPAC");
    }
}
