use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::constants::{self as C, mask};

mod address;
mod exception;
pub mod float;
mod fpu;
pub mod instructions;
mod memory;
mod operate;
mod registers;
mod statistics;

pub use self::address::{direct_address, is_auto_index};
pub use self::exception::Exception;
pub use self::float::{Float, PackedFloat};
pub use self::instructions::{Instruction, Iot, Opcode, Operate};
pub use self::memory::{Memory, MemoryError};
pub use self::registers::{Reg, RegisterParseError, Registers, Status};
pub use self::statistics::Statistics;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessorError {
    #[error("CPU exception: {0}")]
    Exception(#[from] Exception),

    #[error("invalid memory access: {0}")]
    InvalidMemoryAccess(#[from] MemoryError),

    #[error("no halt after {limit} instruction cycles")]
    CycleLimitExceeded { limit: u64 },

    #[error("the processor is halted")]
    Halted,
}

type Result<T> = std::result::Result<T, ProcessorError>;

#[derive(Default)]
pub struct Computer {
    pub registers: Registers,
    pub memory: Memory,
    pub statistics: Statistics,

    /// Maximum number of instruction cycles executed by [`Computer::run`]
    pub cycle_limit: Option<u64>,
}

impl std::fmt::Debug for Computer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Computer {{ registers: {:?}, memory: [...] }}",
            self.registers
        )
    }
}

impl Computer {
    /// Build a computer in its reset state around a loaded memory
    #[must_use]
    pub fn new(memory: Memory) -> Self {
        Self {
            memory,
            ..Self::default()
        }
    }

    /// Load the word at PC in IR and advance PC
    pub(crate) fn fetch(&mut self) -> Result<()> {
        let pc = self.registers.pc;
        self.registers.ir = self.memory.get(pc)?;
        self.registers.page = pc >> C::PAGE_BITS;
        self.registers.pc = mask(pc + 1);
        trace!(
            pc = format_args!("{pc:04o}"),
            ir = format_args!("{:04o}", self.registers.ir),
            "Fetch"
        );
        Ok(())
    }

    fn execute(&mut self, opcode: Opcode, clocks: &mut u64) -> Result<()> {
        let ir = self.registers.ir;
        match opcode {
            Opcode::And => {
                let address = self.effective_address(clocks)?;
                self.registers.ac &= self.memory.get(address)?;
                debug!("AND {address:04o}: AC = {:04o}", self.registers.ac);
            }

            Opcode::Tad => {
                let address = self.effective_address(clocks)?;
                let sum = self.registers.ac + self.memory.get(address)?;
                self.registers.set_link_ac(sum);
                debug!(
                    "TAD {address:04o}: AC = {:04o}, L = {}",
                    self.registers.ac,
                    self.registers.link_bit()
                );
            }

            Opcode::Isz => {
                let address = self.effective_address(clocks)?;
                let word = self.memory.get_mut(address)?;
                *word = mask(*word + 1);
                debug!("ISZ {address:04o}: {:04o}", *word);
                if *word == 0 {
                    self.registers.pc = mask(self.registers.pc + 1);
                }
            }

            Opcode::Dca => {
                let address = self.effective_address(clocks)?;
                self.memory.set(address, self.registers.ac)?;
                debug!("DCA {address:04o}: {:04o}", self.registers.ac);
                self.registers.ac = 0;
            }

            Opcode::Jms => {
                let address = self.effective_address(clocks)?;
                self.memory.set(address, self.registers.pc)?;
                self.registers.pc = mask(address + 1);
                debug!("JMS {address:04o}");
            }

            Opcode::Jmp => {
                let address = self.effective_address(clocks)?;
                self.registers.pc = address;
                debug!("JMP {address:04o}");
            }

            Opcode::Iot => match Iot::decode(ir) {
                Some(iot) => self.execute_iot(iot)?,
                None => return Err(Exception::InvalidIot(ir).into()),
            },

            Opcode::Opr => self.registers.operate(Operate::decode(ir))?,
        }

        Ok(())
    }

    /// Take a pending interrupt, if interrupts are enabled
    fn check_interrupt(&mut self) -> Result<()> {
        if self
            .registers
            .status
            .contains(Status::INTERRUPTS_ON | Status::INTERRUPT_REQUEST)
        {
            debug!(
                pc = format_args!("{:04o}", self.registers.pc),
                "Taking interrupt"
            );
            self.memory
                .set(C::INTERRUPT_PC_SAVE, self.registers.pc)?;
            self.registers.pc = C::INTERRUPT_HANDLER;
        }
        Ok(())
    }

    /// Execute one instruction cycle
    ///
    /// Faults raised by the instruction are logged and the instruction is skipped.
    ///
    /// # Errors
    ///
    /// Fails if the processor is halted
    #[tracing::instrument(skip(self), level = "debug")]
    pub fn step(&mut self) -> Result<()> {
        if !self.registers.running() {
            return Err(ProcessorError::Halted);
        }

        let pc = self.registers.pc;
        self.fetch()?;
        let opcode = Opcode::decode(self.registers.ir);
        let mut clocks = opcode.base_cost();

        match self.execute(opcode, &mut clocks) {
            Ok(()) => {}
            Err(ProcessorError::Exception(exception)) => {
                warn!(pc = format_args!("{pc:04o}"), "{exception}, ignoring");
            }
            Err(e) => return Err(e),
        }

        self.statistics.record(opcode, clocks);
        self.check_interrupt()
    }

    /// Run until the processor halts
    ///
    /// # Errors
    ///
    /// Fails if the cycle limit is reached before the processor halts
    #[tracing::instrument(skip(self))]
    pub fn run(&mut self) -> Result<()> {
        while self.registers.running() {
            if let Some(limit) = self.cycle_limit {
                if self.statistics.total_instructions() >= limit {
                    return Err(ProcessorError::CycleLimitExceeded { limit });
                }
            }

            self.step()?;
        }

        info!(
            instructions = self.statistics.total_instructions(),
            clocks = self.statistics.total_clocks(),
            "Halted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::loader::load;
    use crate::parser::literal::Radix;

    fn computer(source: &str) -> Computer {
        Computer::new(load(source, Radix::Octal).unwrap())
    }

    #[test]
    fn halt_scenario_test() {
        // AND I Z 0, HLT
        let mut computer = computer("@0200 0600 7402");
        computer.run().unwrap();

        assert!(!computer.registers.running());
        assert_eq!(computer.registers.pc, 0o202);
        assert_eq!(computer.statistics.count(Opcode::And), 1);
        assert_eq!(computer.statistics.count(Opcode::Opr), 1);
        assert_eq!(computer.statistics.total_instructions(), 2);
        // 2 base clocks, 1 for the indirection, 1 for the operate instruction
        assert_eq!(computer.statistics.clocks(Opcode::And), 3);
        assert_eq!(computer.statistics.total_clocks(), 4);

        assert_eq!(computer.step(), Err(ProcessorError::Halted));
    }

    #[test]
    fn and_test() {
        // TAD 0210 (current page), AND 0011 (page zero), HLT
        let mut computer = computer(indoc! {"
            @0011 1234
            @0200
            1010 0211 7402
            @0210
            7070
        "});
        computer.run().unwrap();

        assert_eq!(computer.registers.ac, 0o1030);
        assert_eq!(computer.registers.ma, 0o011);
        assert!(!computer.registers.link);
        assert_eq!(computer.statistics.clocks(Opcode::And), 2);
    }

    #[test]
    fn tad_overflow_test() {
        let mut computer = computer(indoc! {"
            @0200
            1005 1006 3007 7402
            @0205
            7000 1001
        "});
        computer.run().unwrap();

        assert!(computer.registers.link);
        assert_eq!(computer.memory.get(0o207), Ok(0o0001));
        assert_eq!(computer.registers.ac, 0);
    }

    #[test]
    fn isz_skip_test() {
        // ISZ 0210, HLT, CLA IAC HLT
        let mut computer = computer(indoc! {"
            @0200
            2010 7402 7201 7402
            @0210
            7777
        "});
        computer.run().unwrap();

        assert_eq!(computer.memory.get(0o210), Ok(0));
        assert_eq!(computer.registers.ac, 1);
        assert_eq!(computer.registers.pc, 0o204);
    }

    #[test]
    fn subroutine_test() {
        // JMS 0210, HLT; at 0210: return slot, CLA IAC, JMP I 0210
        let mut computer = computer(indoc! {"
            @0200
            4010 7402
            @0210
            0000 7201 5410
        "});
        computer.run().unwrap();

        assert_eq!(computer.memory.get(0o210), Ok(0o201));
        assert_eq!(computer.registers.ac, 1);
        assert_eq!(computer.registers.pc, 0o202);
        assert_eq!(computer.statistics.count(Opcode::Jms), 1);
        assert_eq!(computer.statistics.clocks(Opcode::Jmp), 2);
    }

    #[test]
    fn auto_index_loop_test() {
        // Sum the three words at 0300..0302 through the auto-index register 010,
        // counting with ISZ on 0221
        let mut computer = computer(indoc! {"
            @0010 0277
            @0200
            7300 1610 2021 5001 7402
            @0221 7775
            @0300 0001 0002 0003
        "});
        computer.run().unwrap();

        assert_eq!(computer.registers.ac, 6);
        assert_eq!(computer.memory.get(0o10), Ok(0o302));
        // Each TAD I costs 2 + 1 + 1 clocks
        assert_eq!(computer.statistics.clocks(Opcode::Tad), 12);
    }

    #[test]
    fn switch_register_test() {
        // CLA OSR, DCA 0210, HLT
        let mut computer = computer("@0200 7604 3010 7402");
        computer.registers.sr = 0o5252;
        computer.run().unwrap();
        assert_eq!(computer.memory.get(0o210), Ok(0o5252));
    }

    #[test]
    fn exceptions_are_ignored_test() {
        // Unknown IOT, unsupported rotate, group 3, CLA IAC, HLT
        let mut computer = computer("@0200 6001 7014 7421 7201 7402");
        computer.run().unwrap();

        assert_eq!(computer.registers.ac, 1);
        assert_eq!(computer.registers.pc, 0o205);
        assert_eq!(computer.statistics.count(Opcode::Iot), 1);
        assert_eq!(computer.statistics.count(Opcode::Opr), 4);
    }

    #[test]
    fn floating_point_scenario_test() {
        // FPLOAD, FPADD, FPSTORE then HLT, with double pointers in page 0
        let a = 1234.567_f32;
        let b = -0.003_141_5_f32;
        let [a0, a1, a2] = PackedFloat::pack(Float::from_bits(a.to_bits())).0;
        let [b0, b1, b2] = PackedFloat::pack(Float::from_bits(b.to_bits())).0;

        let source = format!(
            "@0020 0400 0410 0420
             @0200 6551 0020 6553 0021 6552 0022 7402
             @0400 {a0:o} {a1:o} {a2:o}
             @0410 {b0:o} {b1:o} {b2:o}"
        );
        let mut computer = computer(&source);
        computer.run().unwrap();

        let result = PackedFloat::read(&computer.memory, 0o420).unwrap();
        let expected = float::add(Float::from_bits(a.to_bits()), Float::from_bits(b.to_bits()));
        assert_eq!(result, PackedFloat::pack(expected));

        // Truncating addition is at most one unit in the last place below the exact sum
        let exact = a + b;
        let got = f32::from_bits(result.unpack().to_bits());
        let ulps = exact.to_bits().abs_diff(got.to_bits());
        assert!(ulps <= 1, "{got} is too far from {exact}");
        assert_eq!(computer.statistics.count(Opcode::Iot), 3);
        assert_eq!(computer.statistics.clocks(Opcode::Iot), 0);
    }

    #[test]
    fn cycle_limit_test() {
        // JMP 0200
        let mut computer = computer("@0200 5000");
        computer.cycle_limit = Some(100);
        assert_eq!(
            computer.run(),
            Err(ProcessorError::CycleLimitExceeded { limit: 100 })
        );
        assert_eq!(computer.statistics.count(Opcode::Jmp), 100);
        assert!(computer.registers.running());
    }

    #[test]
    fn interrupt_test() {
        // CLA IAC at 0200; the handler at 0001 halts
        let mut computer = computer("@0001 7402 @0200 7201 7201");
        computer.registers.status |= Status::INTERRUPTS_ON | Status::INTERRUPT_REQUEST;

        computer.step().unwrap();
        assert_eq!(computer.memory.get(0), Ok(0o201));
        assert_eq!(computer.registers.pc, 1);

        // The flags are never cleared, so the halt itself is interrupted
        computer.run().unwrap();
        assert!(!computer.registers.running());
        assert_eq!(computer.registers.ac, 1);
        assert_eq!(computer.memory.get(0), Ok(0o2));
        assert_eq!(computer.registers.pc, 1);
    }

    #[test]
    fn interrupt_needs_both_flags_test() {
        let mut computer = computer("@0200 7201 7402");
        computer.registers.status |= Status::INTERRUPT_REQUEST;
        computer.run().unwrap();
        assert_eq!(computer.registers.pc, 0o202);
        assert_eq!(computer.memory.get(0), Ok(0));
    }
}
