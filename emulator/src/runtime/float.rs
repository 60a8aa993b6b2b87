//! Floating point values handled by the coprocessor.
//!
//! The floating accumulator uses the single precision layout: a sign bit, an 8-bit exponent
//! biased by 127 and a 23-bit mantissa with an implicit leading one. In memory, a value spans
//! three consecutive words:
//!
//! ```text
//! MA + 0:    0000 eeee eeee     exponent
//! MA + 1:    smmm mmmm mmmm     sign, mantissa bits 12..=22
//! MA + 2:    mmmm mmmm mmmm     mantissa bits 0..=11
//! ```
//!
//! Arithmetic is done by hand on the sign/exponent/mantissa triple. There is no rounding and no
//! handling of zeroes, infinities or NaNs.

use crate::constants::{mask, Address, Word};

use super::memory::{Memory, MemoryError};

const EXPONENT_BIAS: i32 = 127;
const MANTISSA_MASK: u32 = 0x7f_ffff;
const HIDDEN_BIT: u32 = 1 << 23;
const CARRY_BIT: u32 = 1 << 24;
const PRODUCT_TOP_BIT: u64 = 1 << 47;

/// An unpacked floating point value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Float {
    /// `true` for negative values
    pub sign: bool,

    /// Biased exponent
    pub exponent: u8,

    /// Mantissa, without the implicit leading bit
    pub mantissa: u32,
}

impl Float {
    /// Unpack a value from the floating accumulator layout
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self {
            sign: bits >> 31 != 0,
            exponent: ((bits >> 23) & 0xff) as u8,
            mantissa: bits & MANTISSA_MASK,
        }
    }

    /// Pack the value in the floating accumulator layout
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn to_bits(self) -> u32 {
        (self.sign as u32) << 31 | (self.exponent as u32) << 23 | (self.mantissa & MANTISSA_MASK)
    }

    /// Mantissa with the implicit leading bit restored
    const fn significand(self) -> u32 {
        self.mantissa | HIDDEN_BIT
    }

    /// Build a value from an unbounded exponent, keeping its low 8 bits
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    const fn with_exponent(sign: bool, exponent: i32, mantissa: u32) -> Self {
        Self {
            sign,
            exponent: (exponent & 0xff) as u8,
            mantissa: mantissa & MANTISSA_MASK,
        }
    }
}

impl std::fmt::Display for Float {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}1.{:06x}p{:+}",
            if self.sign { "-" } else { "" },
            self.mantissa << 1,
            i32::from(self.exponent) - EXPONENT_BIAS
        )
    }
}

/// A floating point value as stored in three memory words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackedFloat(pub [Word; 3]);

impl PackedFloat {
    /// Pack a value in three words
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn pack(value: Float) -> Self {
        let bits = value.to_bits();
        Self([
            ((bits & 0x7f80_0000) >> 23) as Word,
            (((bits & 0x007f_f000) >> 12) | ((bits & 0x8000_0000) >> 20)) as Word,
            (bits & 0xfff) as Word,
        ])
    }

    /// Unpack the three words into a value
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn unpack(self) -> Float {
        let [exponent, high, low] = self.0;
        let bits = ((exponent as u32) & 0xff) << 23
            | ((high as u32) & 0x800) << 20
            | ((high as u32) & 0x7ff) << 12
            | ((low as u32) & 0xfff);
        Float::from_bits(bits)
    }

    /// Read a packed value from memory, starting at `base`
    ///
    /// Addresses past the end of memory wrap around to the beginning.
    ///
    /// # Errors
    ///
    /// Fails if a word cannot be read
    pub fn read(memory: &Memory, base: Address) -> Result<Self, MemoryError> {
        Ok(Self([
            memory.get(base)?,
            memory.get(mask(base.wrapping_add(1)))?,
            memory.get(mask(base.wrapping_add(2)))?,
        ]))
    }

    /// Write the packed value in memory, starting at `base`
    ///
    /// # Errors
    ///
    /// Fails if a word cannot be written
    pub fn write(self, memory: &mut Memory, base: Address) -> Result<(), MemoryError> {
        for (offset, word) in (0..).zip(self.0) {
            memory.set(mask(base.wrapping_add(offset)), word)?;
        }
        Ok(())
    }
}

/// Add two values
///
/// The operand with the smallest exponent is shifted right to the scale of the other one. Bits
/// shifted out are lost.
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
pub fn add(a: Float, b: Float) -> Float {
    let (a, b) = if a.exponent < b.exponent {
        (b, a)
    } else {
        (a, b)
    };

    let mut exponent = i32::from(a.exponent);
    let shift = u32::from(a.exponent - b.exponent);

    let sig_a = a.significand() as i32;
    let sig_b = b.significand().checked_shr(shift).unwrap_or(0) as i32;

    let sig_a = if a.sign { -sig_a } else { sig_a };
    let sig_b = if b.sign { -sig_b } else { sig_b };

    let sum = sig_a + sig_b;
    let sign = sum < 0;
    let mut mantissa = sum.unsigned_abs();

    if mantissa & CARRY_BIT != 0 {
        exponent += 1;
        mantissa >>= 1;
    } else if mantissa != 0 {
        // Bring the highest set bit back to the hidden bit position
        let shift = mantissa.leading_zeros() - HIDDEN_BIT.leading_zeros();
        exponent -= shift as i32;
        mantissa <<= shift;
    }

    Float::with_exponent(sign, exponent, mantissa)
}

/// Multiply two values
///
/// The 48-bit product of the significands is computed by shifting and adding, then truncated to
/// 23 bits.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn multiply(a: Float, b: Float) -> Float {
    let sig_a = u64::from(a.significand());
    let sig_b = b.significand();

    let mut product: u64 = 0;
    for i in 0..24 {
        if (sig_b >> i) & 1 != 0 {
            product += sig_a << i;
        }
    }

    let mut exponent = i32::from(a.exponent) + i32::from(b.exponent) - EXPONENT_BIAS;
    let sign = a.sign ^ b.sign;

    if product & PRODUCT_TOP_BIT != 0 {
        exponent += 1;
        product >>= 1;
    }

    let mantissa = (product >> 23) as u32;
    Float::with_exponent(sign, exponent, mantissa)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn float(value: f32) -> Float {
        Float::from_bits(value.to_bits())
    }

    fn value(float: Float) -> f32 {
        f32::from_bits(float.to_bits())
    }

    #[test]
    fn bits_test() {
        let one = float(1.0);
        assert_eq!(
            one,
            Float {
                sign: false,
                exponent: 127,
                mantissa: 0,
            }
        );

        let value = float(-2.5);
        assert!(value.sign);
        assert_eq!(value.exponent, 128);
        assert_eq!(value.mantissa, 0x20_0000);
        assert_eq!(value.to_bits(), (-2.5f32).to_bits());
    }

    #[test]
    fn pack_test() {
        // Same layout as the object files written by the converter
        assert_eq!(PackedFloat::pack(float(1.0)).0, [0x07f, 0x000, 0x000]);
        assert_eq!(PackedFloat::pack(float(-2.5)).0, [0x080, 0xa00, 0x000]);
        assert_eq!(PackedFloat::pack(float(6.375)).0, [0x081, 0x4c0, 0x000]);
        assert_eq!(PackedFloat::pack(float(-4.75)).0, [0x081, 0x980, 0x000]);
    }

    #[test]
    fn unpack_restores_sign_test() {
        for v in [1.0f32, -1.0, -2.5, 6.375, -1234.5, 1.0e-10, -7.5e12] {
            let packed = PackedFloat::pack(float(v));
            assert_eq!(packed.unpack().to_bits(), v.to_bits());
            // And the three words come back unchanged
            assert_eq!(PackedFloat::pack(packed.unpack()), packed);
        }
    }

    #[test]
    fn memory_round_trip_test() {
        let mut memory = Memory::default();
        let packed = PackedFloat([0x080, 0xc8f, 0x5c3]);
        packed.write(&mut memory, 0o7776).unwrap();

        // Wraps at the end of memory
        assert_eq!(memory.get(0o7776), Ok(0x080));
        assert_eq!(memory.get(0o7777), Ok(0xc8f));
        assert_eq!(memory.get(0), Ok(0x5c3));

        assert_eq!(PackedFloat::read(&memory, 0o7776), Ok(packed));
    }

    #[test]
    fn add_test() {
        assert_eq!(value(add(float(1.0), float(1.0))), 2.0);
        assert_eq!(value(add(float(1.5), float(2.25))), 3.75);
        assert_eq!(value(add(float(10.0), float(-4.0))), 6.0);
        assert_eq!(value(add(float(-10.0), float(4.0))), -6.0);
        assert_eq!(value(add(float(0.75), float(-0.5))), 0.25);
        assert_eq!(value(add(float(-3.0), float(-5.0))), -8.0);
    }

    #[test]
    fn add_truncates_test() {
        // 1 + 2^-30 loses every bit of the small operand
        assert_eq!(value(add(float(1.0), Float::from_bits(0x3080_0000))), 1.0);

        // The exact sum of these needs 25 bits, the last one is dropped
        let a = f32::from_bits(0x3fff_ffff); // 2 - 2^-23
        let b = f32::from_bits(0x3f80_0002); // 1 + 2^-22
        let sum = add(float(a), float(b));
        assert_eq!(sum.exponent, 128);
        assert_eq!(sum.to_bits(), 0x4040_0000);
    }

    #[test]
    fn add_is_commutative_test() {
        let values = [1.0f32, -2.5, 6.375, 1024.125, -0.001, 7.0e5];
        for &a in &values {
            for &b in &values {
                if a.to_bits() == (-b).to_bits() {
                    continue;
                }
                assert_eq!(add(float(a), float(b)), add(float(b), float(a)));
            }
        }
    }

    #[test]
    fn multiply_test() {
        assert_eq!(value(multiply(float(2.0), float(3.0))), 6.0);
        assert_eq!(value(multiply(float(1.5), float(1.5))), 2.25);
        assert_eq!(value(multiply(float(-4.0), float(0.5))), -2.0);
        assert_eq!(value(multiply(float(-4.0), float(-0.25))), 1.0);
        assert_eq!(value(multiply(float(12.5), float(-8.0))), -100.0);
    }

    #[test]
    fn multiply_by_one_test() {
        for v in [6.375f32, -2.5, 1.0e-10, -7.5e12, 1.999_999_9] {
            assert_eq!(multiply(float(v), float(1.0)), float(v));
            assert_eq!(multiply(float(1.0), float(v)), float(v));
        }
    }

    #[test]
    fn multiply_truncates_test() {
        // 1.0000001^2 = 1.0000002 + 2^-46, the small part is dropped
        let a = f32::from_bits(0x3f80_0001);
        assert_eq!(multiply(float(a), float(a)).to_bits(), 0x3f80_0002);

        // (2 - 2^-23)^2 carries into bit 47
        let b = f32::from_bits(0x3fff_ffff);
        assert_eq!(multiply(float(b), float(b)).to_bits(), 0x407f_fffe);
    }

    #[test]
    fn display_test() {
        assert_eq!(float(1.0).to_string(), "1.000000p+0");
        assert_eq!(float(-2.5).to_string(), "-1.400000p+1");
    }
}
