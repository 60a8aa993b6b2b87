//! Floating point coprocessor, reached through IOT instructions

use tracing::debug;

use crate::constants::Address;

use super::float::{self, Float, PackedFloat};
use super::instructions::Iot;
use super::{Computer, Result};

impl Computer {
    /// Fetch the operand pointer following an IOT instruction
    ///
    /// The word after the instruction holds the address of a word which itself holds the base
    /// address of the packed operand.
    fn operand_address(&mut self) -> Result<Address> {
        self.fetch()?;
        let address = self.memory.get(self.registers.ir)?;
        self.registers.ma = address;
        debug!("Floating operand at {address:04o}");
        Ok(address)
    }

    fn operand(&mut self) -> Result<Float> {
        let address = self.operand_address()?;
        Ok(PackedFloat::read(&self.memory, address)?.unpack())
    }

    fn fpac(&self) -> Float {
        Float::from_bits(self.registers.fpac)
    }

    fn set_fpac(&mut self, value: Float) {
        self.registers.fpac = value.to_bits();
        debug!(fpac = format_args!("{:08x}", self.registers.fpac), "FPAC = {value}");
    }

    /// Execute a floating point operation
    pub(crate) fn execute_iot(&mut self, iot: Iot) -> Result<()> {
        match iot {
            Iot::Clear => self.set_fpac(Float::default()),

            Iot::Load => {
                let value = self.operand()?;
                self.set_fpac(value);
            }

            Iot::Store => {
                let address = self.operand_address()?;
                PackedFloat::pack(self.fpac()).write(&mut self.memory, address)?;
            }

            Iot::Add => {
                let operand = self.operand()?;
                self.set_fpac(float::add(self.fpac(), operand));
            }

            Iot::Multiply => {
                let operand = self.operand()?;
                self.set_fpac(float::multiply(self.fpac(), operand));
            }
        }

        Ok(())
    }
}
