//! Fixed point linear transforms.
//!
//! A [`FractionMatrix`] stores the linear part of a transform as four
//! integer numerators over a shared power of two denominator. The number of
//! fraction bits is chosen so that transforming a coordinate with at most
//! [`MAX_COORD_BITS`] significant bits fits in 32 bits after the product is
//! shifted right by [`G2O_BITSHIFT`].

#[cfg(feature = "libm")]
#[allow(unused_imports)]
use core_maths::*;

/// Number of fraction bits in 24.8 glyph and device coordinates.
pub(crate) const FIXED_SHIFT: i32 = 8;
pub(crate) const FIXED_ONE: i32 = 1 << FIXED_SHIFT;
pub(crate) const FIXED_HALF: i32 = FIXED_ONE / 2;

/// Shift applied to the product of a coordinate and a coefficient.
pub(crate) const SPLIT_BITS: i32 = 12;
/// Significant bits of an imported coordinate.
pub(crate) const MAX_COORD_BITS: i32 = 24;
/// Significant bits of a matrix coefficient.
pub(crate) const MATRIX_BITS: i32 = 19;
/// Shift used when mapping glyph space to outliner space.
pub(crate) const G2O_BITSHIFT: i32 = 12;

/// Computes `(a * b) >> shift` without intermediate overflow.
#[inline(always)]
pub(crate) fn mul_shift(a: i32, b: i32, shift: i32) -> i32 {
    ((a as i64 * b as i64) >> shift) as i32
}

/// Computes `(a * b) >> shift`, rounding half up. `shift` must be positive.
#[inline(always)]
pub(crate) fn mul_shift_round(a: i32, b: i32, shift: i32) -> i32 {
    ((((a as i64 * b as i64) >> (shift - 1)) + 1) >> 1) as i32
}

/// Shifts right by `shift` bits with rounding. A negative shift scales up.
#[inline]
pub(crate) fn shift_rounded(value: i32, shift: i32) -> i32 {
    if shift > 0 {
        ((value >> (shift - 1).min(31)).wrapping_add(1)) >> 1
    } else {
        value.wrapping_shl(shift.unsigned_abs())
    }
}

/// Shifts left for positive `shift` and right for negative.
#[inline]
pub(crate) fn rshift(value: i64, shift: i32) -> i64 {
    if shift > 0 {
        value.wrapping_shl(shift as u32)
    } else {
        value >> shift.unsigned_abs().min(63)
    }
}

/// Returns the exponent `e` such that `value == m * 2^e` with
/// `0.5 <= |m| < 1`.
///
/// Zero and non-finite values produce 0, matching C `frexp`.
pub(crate) fn frexp_exponent(value: f64) -> i32 {
    if value == 0.0 || !value.is_finite() {
        return 0;
    }
    let biased = ((value.to_bits() >> 52) & 0x7ff) as i32;
    if biased == 0 {
        // Subnormal
        return frexp_exponent(value * (1u64 << 54) as f64) - 54;
    }
    biased - 1022
}

/// Linear transform with floating point coefficients.
///
/// Coefficients follow the PostScript matrix convention:
/// `x' = x * xx + y * yx` and `y' = x * xy + y * yy`.
#[derive(Copy, Clone, PartialEq, Default, Debug)]
pub(crate) struct DoubleMatrix {
    pub xx: f64,
    pub xy: f64,
    pub yx: f64,
    pub yy: f64,
}

impl DoubleMatrix {
    /// Returns the inverse matrix or `None` if the determinant is too
    /// small relative to the coefficients.
    pub fn invert(&self) -> Option<Self> {
        let det = self.xx * self.yy - self.xy * self.yx;
        let magnitude = self.xx.abs() + self.xy.abs() + self.yx.abs() + self.yy.abs();
        // Also rejects NaN determinants
        if !(det.abs() * 1_000_000.0 > magnitude) {
            return None;
        }
        Some(Self {
            xx: self.yy / det,
            xy: -self.xy / det,
            yx: -self.yx / det,
            yy: self.xx / det,
        })
    }
}

/// Linear transform with integer numerators over a power of two
/// denominator.
///
/// A zero denominator marks a degenerate matrix.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub(crate) struct FractionMatrix {
    pub xx: i32,
    pub xy: i32,
    pub yx: i32,
    pub yy: i32,
    pub denominator: i32,
    pub bitshift: i32,
}

impl FractionMatrix {
    /// Converts a floating point matrix, keeping [`MATRIX_BITS`]
    /// significant bits in the largest coefficient.
    pub fn from_double(m: &DoubleMatrix) -> Self {
        let scale = (m.xx.abs() + m.xy.abs()).max(m.yx.abs() + m.yy.abs());
        let bitshift = MATRIX_BITS - frexp_exponent(scale);
        if !(0..32).contains(&bitshift) {
            return Self {
                bitshift,
                ..Default::default()
            };
        }
        let denominator = 1i32.wrapping_shl(bitshift as u32);
        let den = denominator as f64;
        // Values are truncated after adding one half, which rounds
        // negative coefficients towards zero.
        let mut result = Self {
            xx: (m.xx * den + 0.5) as i32,
            xy: (m.xy * den + 0.5) as i32,
            yx: (m.yx * den + 0.5) as i32,
            yy: (m.yy * den + 0.5) as i32,
            denominator,
            bitshift,
        };
        let max = result
            .xx
            .unsigned_abs()
            .max(result.xy.unsigned_abs())
            .max(result.yx.unsigned_abs())
            .max(result.yy.unsigned_abs());
        let exp = frexp_exponent(max as f64);
        if exp > MATRIX_BITS {
            result.drop_bits(exp - MATRIX_BITS);
        }
        result
    }

    pub fn is_degenerate(&self) -> bool {
        self.denominator == 0
    }

    /// Removes `bits` bits of precision from all coefficients.
    pub fn drop_bits(&mut self, bits: i32) {
        if bits <= 0 {
            return;
        }
        self.xx = shift_rounded(self.xx, bits);
        self.xy = shift_rounded(self.xy, bits);
        self.yx = shift_rounded(self.yx, bits);
        self.yy = shift_rounded(self.yy, bits);
        self.denominator = self.denominator.checked_shr(bits as u32).unwrap_or(0);
        self.bitshift -= bits;
    }

    pub fn to_double(&self) -> Option<DoubleMatrix> {
        if self.is_degenerate() {
            return None;
        }
        let den = self.denominator as f64;
        Some(DoubleMatrix {
            xx: self.xx as f64 / den,
            xy: self.xy as f64 / den,
            yx: self.yx as f64 / den,
            yy: self.yy as f64 / den,
        })
    }

    /// Returns the inverse of this matrix, computed from its exact rational
    /// value rather than from the source floating point matrix.
    pub fn invert(&self) -> Option<Self> {
        let inverse = self.to_double()?.invert()?;
        Some(Self::from_double(&inverse))
    }

    #[inline(always)]
    pub fn transform_x(&self, x: i32, y: i32, shift: i32) -> i32 {
        mul_shift_round(x, self.xx, shift).wrapping_add(mul_shift_round(y, self.yx, shift))
    }

    #[inline(always)]
    pub fn transform_y(&self, x: i32, y: i32, shift: i32) -> i32 {
        mul_shift_round(x, self.xy, shift).wrapping_add(mul_shift_round(y, self.yy, shift))
    }
}
