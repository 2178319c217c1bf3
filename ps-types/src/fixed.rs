//! fixed-point numerical types

use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

// shared between Fixed and F24Dot8
macro_rules! fixed_impl {
    ($name:ident, $fract_bits:literal) => {
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[doc = concat!("32-bit signed fixed point number with ", stringify!($fract_bits), " bits of fraction." )]
        pub struct $name(i32);

        impl $name {
            /// Minimum value.
            pub const MIN: Self = Self(i32::MIN);

            /// Maximum value.
            pub const MAX: Self = Self(i32::MAX);

            /// This type's smallest representable value
            pub const EPSILON: Self = Self(1);

            /// Representation of 0.0.
            pub const ZERO: Self = Self(0);

            /// Representation of 1.0.
            pub const ONE: Self = Self(1 << $fract_bits);

            /// Representation of 0.5.
            pub const HALF: Self = Self(1 << ($fract_bits - 1));

            const INT_MASK: i32 = !0 << $fract_bits;
            const ROUND: i32 = 1 << ($fract_bits - 1);
            const FRACT_BITS: u32 = $fract_bits;

            /// Creates a new value from the raw bit representation.
            #[inline(always)]
            pub const fn from_bits(bits: i32) -> Self {
                Self(bits)
            }

            /// Returns the raw bit representation.
            #[inline(always)]
            pub const fn to_bits(self) -> i32 {
                self.0
            }

            /// Creates a value from an integer, wrapping on overflow.
            #[inline(always)]
            pub const fn from_i32(value: i32) -> Self {
                Self(value.wrapping_shl(Self::FRACT_BITS))
            }

            /// Returns the value truncated toward negative infinity.
            #[inline(always)]
            pub const fn to_i32(self) -> i32 {
                self.0 >> Self::FRACT_BITS
            }

            /// Returns the nearest integer value.
            pub fn round(self) -> Self {
                Self(self.0.wrapping_add(Self::ROUND) & Self::INT_MASK)
            }

            /// Returns the absolute value of the number.
            pub fn abs(self) -> Self {
                Self(self.0.wrapping_abs())
            }

            /// Returns the largest integer less than or equal to the number.
            pub fn floor(self) -> Self {
                Self(self.0 & Self::INT_MASK)
            }

            /// Returns the fractional part of the number.
            pub fn fract(self) -> Self {
                Self(self.0 - self.floor().0)
            }

            /// Wrapping addition.
            pub fn wrapping_add(self, other: Self) -> Self {
                Self(self.0.wrapping_add(other.0))
            }

            /// Saturating addition.
            pub fn saturating_add(self, other: Self) -> Self {
                Self(self.0.saturating_add(other.0))
            }

            /// Wrapping subtraction.
            pub fn wrapping_sub(self, other: Self) -> Self {
                Self(self.0.wrapping_sub(other.0))
            }

            /// Saturating subtraction.
            pub fn saturating_sub(self, other: Self) -> Self {
                Self(self.0.saturating_sub(other.0))
            }
        }

        impl Add for $name {
            type Output = Self;
            #[inline(always)]
            fn add(self, other: Self) -> Self {
                // same overflow semantics as std: panic in debug, wrap in release
                Self(self.0 + other.0)
            }
        }

        impl AddAssign for $name {
            fn add_assign(&mut self, other: Self) {
                *self = *self + other;
            }
        }

        impl Sub for $name {
            type Output = Self;
            #[inline(always)]
            fn sub(self, other: Self) -> Self {
                Self(self.0 - other.0)
            }
        }

        impl SubAssign for $name {
            fn sub_assign(&mut self, other: Self) {
                *self = *self - other;
            }
        }

        impl Neg for $name {
            type Output = Self;
            #[inline(always)]
            fn neg(self) -> Self {
                Self(self.0.wrapping_neg())
            }
        }
    };
}

/// impl float conversion methods.
///
/// Both types are 32 bits wide so f64 round-trips every value.
macro_rules! float_conv {
    ($name:ident) => {
        impl $name {
            /// Creates a fixed point value from an f64.
            ///
            /// This operation is lossy; the float will be rounded to the nearest
            /// representable value, saturating at the bounds of the type.
            pub fn from_f64(x: f64) -> Self {
                let scaled = x * Self::ONE.0 as f64;
                // rounds half away from zero
                let rounded = if scaled < 0.0 {
                    scaled - 0.5
                } else {
                    scaled + 0.5
                };
                // float to int casts saturate
                Self(rounded as i32)
            }

            /// Returns the value as an f64.
            ///
            /// This operation is lossless: all representable values can be
            /// round-tripped.
            pub fn to_f64(self) -> f64 {
                self.0 as f64 / Self::ONE.0 as f64
            }
        }

        //hack: we can losslessly go to float, so use those fmt impls
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                self.to_f64().fmt(f)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                self.to_f64().fmt(f)
            }
        }
    };
}

fixed_impl!(Fixed, 16);
fixed_impl!(F24Dot8, 8);
float_conv!(Fixed);
float_conv!(F24Dot8);

impl Fixed {
    /// Multiplication with rounding, saturating on overflow.
    pub fn mul(self, other: Self) -> Self {
        let product = (self.0 as i64 * other.0 as i64 + 0x8000) >> 16;
        Self(product.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
    }

    /// Division with rounding, saturating on overflow.
    ///
    /// Returns `None` when `other` is zero.
    pub fn checked_div(self, other: Self) -> Option<Self> {
        if other.0 == 0 {
            return None;
        }
        let num = (self.0 as i64) << 16;
        let den = other.0 as i64;
        let truncated = num / den;
        // round half away from zero based on the remainder
        let rem = num - truncated * den;
        let rounded = if rem != 0 && 2 * rem.abs() >= den.abs() {
            if (num < 0) != (den < 0) {
                truncated - 1
            } else {
                truncated + 1
            }
        } else {
            truncated
        };
        Some(Self(rounded.clamp(i32::MIN as i64, i32::MAX as i64) as i32))
    }

    /// Converts to the 24.8 representation used for glyph coordinates.
    ///
    /// The low 8 bits of fraction are discarded with an arithmetic shift.
    #[inline(always)]
    pub const fn to_f24dot8(self) -> F24Dot8 {
        F24Dot8(self.0 >> 8)
    }
}

impl F24Dot8 {
    /// Converts to 16.16, wrapping when the integer part does not fit.
    #[inline(always)]
    pub const fn to_fixed(self) -> Fixed {
        Fixed(self.0.wrapping_shl(8))
    }

    /// Returns the value as an f32.
    #[inline(always)]
    pub fn to_f32(self) -> f32 {
        self.0 as f32 / 256.0
    }
}

impl From<i32> for Fixed {
    fn from(value: i32) -> Self {
        Self::from_i32(value)
    }
}

#[cfg(test)]
mod tests {
    #![allow(overflowing_literals)] // we want to specify byte values directly
    use super::*;

    #[test]
    fn round_fixed() {
        assert_eq!(Fixed(0x0001_7FFE).round(), Fixed(0x0001_0000));
        assert_eq!(Fixed(0x0001_7FFF).round(), Fixed(0x0001_0000));
        assert_eq!(Fixed(0x0001_8000).round(), Fixed(0x0002_0000));
    }

    #[test]
    fn fixed_floats() {
        assert_eq!(Fixed(0x7fff_0000), Fixed::from_f64(32767.));
        assert_eq!(Fixed(0x7000_0001), Fixed::from_f64(28672.00001525879));
        assert_eq!(Fixed(0x0001_0000), Fixed::from_f64(1.0));
        assert_eq!(Fixed(0x0000_0000), Fixed::from_f64(0.0));
        assert_eq!(
            Fixed(i32::from_be_bytes([0xff; 4])),
            Fixed::from_f64(-0.000015259)
        );
        assert_eq!(Fixed(0x7fff_ffff), Fixed::from_f64(32768.0));
    }

    #[test]
    fn f24dot8_floats() {
        assert_eq!(F24Dot8::from_f64(1.5).to_bits(), 0x180);
        assert_eq!(F24Dot8::from_f64(-0.25).to_bits(), -64);
        assert_eq!(F24Dot8::from_bits(-64).to_f64(), -0.25);
        assert_eq!(F24Dot8::from_i32(-3).to_f32(), -3.0);
    }

    #[test]
    fn fixed_to_f24dot8() {
        assert_eq!(Fixed::from_i32(12).to_f24dot8(), F24Dot8::from_i32(12));
        assert_eq!(Fixed::from_f64(0.5).to_f24dot8(), F24Dot8::HALF);
        // arithmetic shift floors negative fractions
        assert_eq!(Fixed::from_bits(-1).to_f24dot8(), F24Dot8::from_bits(-1));
        assert_eq!(F24Dot8::from_i32(-7).to_fixed(), Fixed::from_i32(-7));
    }

    #[test]
    fn fixed_mul() {
        let a = Fixed::from_f64(1.5);
        let b = Fixed::from_f64(-2.25);
        assert_eq!(a.mul(b), Fixed::from_f64(-3.375));
        assert_eq!(Fixed::from_i32(30000).mul(Fixed::from_i32(30000)), Fixed::MAX);
    }

    #[test]
    fn fixed_div() {
        let a = Fixed::from_i32(7);
        assert_eq!(a.checked_div(Fixed::from_i32(2)), Some(Fixed::from_f64(3.5)));
        assert_eq!(
            Fixed::from_i32(-1).checked_div(Fixed::from_i32(3)),
            Some(Fixed::from_bits(-21845))
        );
        assert_eq!(
            Fixed::from_i32(2).checked_div(Fixed::from_i32(3)),
            Some(Fixed::from_bits(43691))
        );
        assert_eq!(a.checked_div(Fixed::ZERO), None);
    }

    #[test]
    fn floor_fract() {
        let v = F24Dot8::from_f64(-1.25);
        assert_eq!(v.floor(), F24Dot8::from_i32(-2));
        assert_eq!(v.fract(), F24Dot8::from_f64(0.75));
    }
}
