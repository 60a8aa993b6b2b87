//! Effective address resolution for memory-reference instructions

use tracing::debug;

use crate::constants::{mask, Address, Word, AUTO_INDEX_BLOCK, PAGE_BITS, PAGE_OFFSET_MASK};

use super::instructions::{INDIRECT_BIT, PAGE_ZERO_BIT};
use super::{Computer, Result};

/// Address designated by an instruction before any indirection
#[must_use]
pub const fn direct_address(instruction: Word, page: Word) -> Address {
    let offset = instruction & PAGE_OFFSET_MASK;
    if instruction & PAGE_ZERO_BIT != 0 {
        offset
    } else {
        mask(page << PAGE_BITS | offset)
    }
}

/// Whether the address is one of the auto-index registers
#[must_use]
pub const fn is_auto_index(address: Address) -> bool {
    address >> 3 == AUTO_INDEX_BLOCK
}

impl Computer {
    /// Resolve the effective address of the instruction in IR
    ///
    /// Indirect addressing costs one clock, plus one more when going through an auto-index
    /// register, which is incremented before being read.
    pub(crate) fn effective_address(&mut self, clocks: &mut u64) -> Result<Address> {
        let ir = self.registers.ir;
        let mut address = direct_address(ir, self.registers.page);

        if ir & INDIRECT_BIT != 0 {
            *clocks += 1;

            if is_auto_index(address) {
                *clocks += 1;
                let pointer = self.memory.get_mut(address)?;
                *pointer = mask(*pointer + 1);
                debug!("Auto-increment register {address:04o} to {:04o}", *pointer);
            }

            address = self.memory.get(address)?;
        }

        self.registers.ma = address;
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Memory;

    fn computer(ir: Word, page: Word) -> Computer {
        let mut computer = Computer::new(Memory::default());
        computer.registers.ir = ir;
        computer.registers.page = page;
        computer
    }

    #[test]
    fn page_zero_test() {
        for page in 0..32 {
            assert_eq!(direct_address(0o1234, page), 0o34);
            assert_eq!(direct_address(0o0377, page), 0o177);
        }
    }

    #[test]
    fn current_page_test() {
        assert_eq!(direct_address(0o1034, 0), 0o34);
        assert_eq!(direct_address(0o1034, 1), 0o234);
        assert_eq!(direct_address(0o1177, 0o37), 0o7777);
    }

    #[test]
    fn auto_index_range_test() {
        assert!(!is_auto_index(0o7));
        for address in 0o10..=0o17 {
            assert!(is_auto_index(address));
        }
        assert!(!is_auto_index(0o20));
    }

    #[test]
    fn direct_resolution_test() {
        let mut computer = computer(0o1234, 3);
        let mut clocks = 0;
        assert_eq!(computer.effective_address(&mut clocks).unwrap(), 0o34);
        assert_eq!(computer.registers.ma, 0o34);
        assert_eq!(clocks, 0);
    }

    #[test]
    fn indirect_resolution_test() {
        // TAD I 50 on page 1: address 0o250 holds the pointer
        let mut computer = computer(0o1450, 1);
        computer.memory.set(0o250, 0o1234).unwrap();
        computer.memory.set(0o1234, 0o5).unwrap();

        let mut clocks = 0;
        assert_eq!(computer.effective_address(&mut clocks).unwrap(), 0o1234);
        assert_eq!(clocks, 1);

        // Only one level of indirection
        assert_eq!(computer.memory.get(0o250), Ok(0o1234));
    }

    #[test]
    fn auto_index_test() {
        // TAD I Z 10
        let mut computer = computer(0o1610, 2);
        computer.memory.set(0o10, 0o2777).unwrap();

        let mut clocks = 0;
        let address = computer.effective_address(&mut clocks).unwrap();
        assert_eq!(address, 0o3000);
        assert_eq!(computer.memory.get(0o10), Ok(0o3000));
        assert_eq!(clocks, 2);

        // Wraps around
        computer.memory.set(0o10, 0o7777).unwrap();
        let address = computer.effective_address(&mut clocks).unwrap();
        assert_eq!(address, 0);
        assert_eq!(computer.memory.get(0o10), Ok(0));
    }

    #[test]
    fn no_auto_index_without_indirection_test() {
        // TAD Z 10
        let mut computer = computer(0o1210, 0);
        computer.memory.set(0o10, 0o42).unwrap();

        let mut clocks = 0;
        assert_eq!(computer.effective_address(&mut clocks).unwrap(), 0o10);
        assert_eq!(computer.memory.get(0o10), Ok(0o42));
    }
}
