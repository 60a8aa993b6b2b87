pub type Address = u16;
pub type Word = u16;

/// Total size of the computer memory, in words
pub const MEMORY_SIZE: usize = 4096;

/// Mask keeping the 12 significant bits of a word
pub const WORD_MASK: Word = 0o7777;

/// Sign bit of a word, when interpreted as two's complement
pub const SIGN_BIT: Word = 0o4000;

/// Number of address bits used for the offset inside a page
pub const PAGE_BITS: u32 = 7;

/// Mask of the page offset in a memory-reference instruction
pub const PAGE_OFFSET_MASK: Word = 0o177;

/// Address where the program starts after a reset
pub const PROGRAM_START: Address = 0o200;

/// Address where the PC is saved when an interrupt is taken
pub const INTERRUPT_PC_SAVE: Address = 0;

/// Address of the interrupt handler
pub const INTERRUPT_HANDLER: Address = 1;

/// Auto-index registers live at `0o010..=0o017`, i.e. addresses whose value shifted right by 3
/// bits is 1.
pub const AUTO_INDEX_BLOCK: Address = 1;

/// Keep the 12 significant bits of a value
#[inline]
#[must_use]
pub const fn mask(value: Word) -> Word {
    value & WORD_MASK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_is_idempotent_test() {
        for value in (0..=u16::MAX).step_by(7) {
            assert_eq!(mask(mask(value)), mask(value));
            assert!(mask(value) <= WORD_MASK);
        }
    }
}
