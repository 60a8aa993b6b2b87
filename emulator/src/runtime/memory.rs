use thiserror::Error;

use crate::constants::{mask, Address, Word, MEMORY_SIZE};

/// Represents errors related to memory manipulations
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// The given address was invalid
    #[error("invalid address {0:#o}")]
    InvalidAddress(Address),
}

/// Holds the memory words of the computer.
///
/// It has 4096 words of 12 bits each. Every word is masked to 12 bits when written.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    inner: Box<[Word; MEMORY_SIZE]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            inner: Box::new([0; MEMORY_SIZE]),
        }
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Memory {{ {} non-zero words }}", self.non_zero().count())
    }
}

impl Memory {
    /// Get the word at an address
    ///
    /// # Errors
    ///
    /// It fails if the address is out of bounds.
    pub fn get(&self, address: Address) -> Result<Word, MemoryError> {
        self.inner
            .get(usize::from(address))
            .copied()
            .ok_or(MemoryError::InvalidAddress(address))
    }

    /// Get a mutable reference to the word at an address
    ///
    /// Callers writing through this reference are responsible for keeping the value on 12 bits.
    ///
    /// # Errors
    ///
    /// It fails if the address is out of bounds.
    pub fn get_mut(&mut self, address: Address) -> Result<&mut Word, MemoryError> {
        self.inner
            .get_mut(usize::from(address))
            .ok_or(MemoryError::InvalidAddress(address))
    }

    /// Set the word at an address, keeping only its 12 low bits
    ///
    /// # Errors
    ///
    /// It fails if the address is out of bounds.
    pub fn set(&mut self, address: Address, value: Word) -> Result<(), MemoryError> {
        *self.get_mut(address)? = mask(value);
        Ok(())
    }

    /// Iterate over every non-zero word, with its address
    pub fn non_zero(&self) -> impl Iterator<Item = (Address, Word)> + '_ {
        (0..).zip(self.inner.iter().copied()).filter(|&(_, w)| w != 0)
    }
}
