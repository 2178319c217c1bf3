//! Affine transforms describing the placement of a glyph on the device.

use core::ops::Mul;

use crate::fraction::DoubleMatrix;

#[cfg(feature = "libm")]
#[allow(unused_imports)]
use core_maths::*;

/// An affine transformation matrix in PostScript order
/// `[xx xy yx yy tx ty]`.
///
/// For a vector `(x, y)` the transformed position is
/// `x' = xx * x + yx * y + tx` and `y' = xy * x + yy * y + ty`.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    pub xx: f64,
    pub xy: f64,
    pub yx: f64,
    pub yy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Transform {
    pub const IDENTITY: Self = Self::scale(1.0, 1.0);

    pub const fn new(xx: f64, xy: f64, yx: f64, yy: f64, tx: f64, ty: f64) -> Self {
        Self {
            xx,
            xy,
            yx,
            yy,
            tx,
            ty,
        }
    }

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    pub const fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Transforms a point.
    pub fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        let (dx, dy) = self.transform_distance(x, y);
        (dx + self.tx, dy + self.ty)
    }

    /// Transforms a vector, ignoring the translation.
    pub fn transform_distance(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.xx + y * self.yx, x * self.xy + y * self.yy)
    }

    /// Returns the transform that applies `self` followed by `next`.
    pub fn then(&self, next: &Transform) -> Self {
        let (tx, ty) = next.transform(self.tx, self.ty);
        Self {
            xx: self.xx * next.xx + self.xy * next.yx,
            xy: self.xx * next.xy + self.xy * next.yy,
            yx: self.yx * next.xx + self.yy * next.yx,
            yy: self.yx * next.xy + self.yy * next.yy,
            tx,
            ty,
        }
    }

    /// Length of the transformed unit vertical vector.
    pub(crate) fn vertical_scale(&self) -> f64 {
        let (x, y) = self.transform_distance(0.0, 1.0);
        x.hypot(y)
    }

    pub(crate) fn linear(&self) -> DoubleMatrix {
        DoubleMatrix {
            xx: self.xx,
            xy: self.xy,
            yx: self.yx,
            yy: self.yy,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// `a * b` applies `a` first.
impl Mul for Transform {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        self.then(&rhs)
    }
}

/// The matrices that place glyphs of a font on the device.
///
/// Glyph coordinates are mapped through the font matrix and then the
/// current transformation matrix. The base font matrix is the font matrix
/// before any `scalefont`/`makefont` adjustment and is only used to report
/// the effective font size.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceSetup {
    /// Maps text space to device pixels.
    pub ctm: Transform,
    pub font_matrix: Transform,
    pub base_font_matrix: Transform,
}

impl DeviceSetup {
    pub fn new(font_matrix: Transform, ctm: Transform) -> Self {
        Self {
            ctm,
            font_matrix,
            base_font_matrix: font_matrix,
        }
    }

    /// Creates a setup for a font with a `1 / units_per_em` font matrix
    /// drawn at `ppem` pixels per em with the glyph origin at the device
    /// origin.
    pub fn from_ppem(units_per_em: u16, ppem: f64) -> Self {
        let unit = 1.0 / units_per_em.max(1) as f64;
        Self::new(Transform::scale(unit, unit), Transform::scale(ppem, ppem))
    }

    pub fn with_base_font_matrix(mut self, base_font_matrix: Transform) -> Self {
        self.base_font_matrix = base_font_matrix;
        self
    }

    /// Moves the glyph origin to the given device position.
    pub fn with_origin(mut self, x: f64, y: f64) -> Self {
        self.ctm.tx = x;
        self.ctm.ty = y;
        self
    }

    /// Returns the transform from glyph space to device space.
    pub fn glyph_to_device(&self) -> Transform {
        self.font_matrix.then(&self.ctm)
    }
}

impl Default for DeviceSetup {
    fn default() -> Self {
        Self::from_ppem(1000, 12.0)
    }
}
