//! Conversions between glyph, outliner and device coordinates.
//!
//! Three coordinate spaces are involved:
//!
//! * glyph space: charstring units as 24.8 fixed point values,
//! * outliner space: device space relative to the glyph origin with
//!   `g2o_fraction_bits` bits of fraction,
//! * device space: 24.8 fixed point device units.
//!
//! The glyph to outliner transform is a [`FractionMatrix`]. Its precision
//! is reduced on the fly when a coordinate arrives that could overflow the
//! 32 bit products; every value derived from the old precision is
//! recomputed at that point.

use crate::{
    fraction::{
        mul_shift, rshift, shift_rounded, FractionMatrix, FIXED_ONE, FIXED_SHIFT, G2O_BITSHIFT,
        MAX_COORD_BITS, SPLIT_BITS,
    },
    options::HintingOptions,
    transform::DeviceSetup,
};

#[cfg(feature = "libm")]
#[allow(unused_imports)]
use core_maths::*;

/// Largest supported oversampling shift.
const MAX_LOG2_PIXELS: i32 = 8;

/// Scale factors outside of this range disable hinting.
const MIN_HINTING_SCALE: f64 = 1.0 / 1024.0;
const MAX_HINTING_SCALE: f64 = 4.0;

#[derive(Clone, Debug)]
pub(crate) struct Mapping {
    /// Glyph to outliner transform.
    pub ctmf: FractionMatrix,
    /// Inverse of `ctmf`.
    pub ctmi: FractionMatrix,
    pub g2o_fraction_bits: i32,
    /// One device unit in outliner space.
    pub g2o_fraction: i32,
    max_import_coord: u64,
    /// Device distance per glyph unit between horizontal lines.
    pub height_coef: f64,
    /// Device distance per glyph unit between vertical lines.
    pub width_coef: f64,
    pub height_coef_rat: i32,
    pub width_coef_rat: i32,
    pub height_coef_inv: i32,
    pub width_coef_inv: i32,
    /// True when glyph x maps mostly to device y.
    pub transposed: bool,
    /// True if the transform has little enough skew to keep stem widths.
    pub keep_stem_width: bool,
    pub grid_fit_x: bool,
    pub grid_fit_y: bool,
    /// False for pass-through mode.
    pub hinting: bool,
    pub align_to_pixels: bool,
    pub log2_pixels: (i32, i32),
    pub log2_subpixels: (i32, i32),
    /// Glyph origin in device space, aligned to the grid.
    pub orig_dx: i32,
    pub orig_dy: i32,
    /// Glyph origin in outliner space.
    pub orig_ox: i32,
    pub orig_oy: i32,
    /// Size of a grid cell in outliner space.
    pub pixel_o_x: i32,
    pub pixel_o_y: i32,
    /// Size of a grid cell in glyph space, vertically and horizontally.
    pub pixel_gh: i32,
    pub pixel_gw: i32,
    pub font_size: f64,
    pub resolution: f64,
}

impl Mapping {
    pub fn new(setup: &DeviceSetup, options: &HintingOptions) -> Self {
        let char_matrix = setup.glyph_to_device();
        let linear = char_matrix.linear();
        let scale = (linear.xx.abs() + linear.xy.abs()).max(linear.yx.abs() + linear.yy.abs());
        let mut hinting =
            options.enabled && (MIN_HINTING_SCALE..=MAX_HINTING_SCALE).contains(&scale);
        let mut ctmf = FractionMatrix::from_double(&linear);
        let mut g2o_fraction_bits = ctmf.bitshift - G2O_BITSHIFT + FIXED_SHIFT;
        if g2o_fraction_bits > MAX_COORD_BITS {
            ctmf.drop_bits(g2o_fraction_bits - MAX_COORD_BITS);
            g2o_fraction_bits = MAX_COORD_BITS;
        }
        let mut ctmi = FractionMatrix::default();
        if !ctmf.is_degenerate() {
            match ctmf.invert() {
                Some(inverse) => ctmi = inverse,
                None => ctmf.denominator = 0,
            }
        }
        let mut g2o_fraction = 0;
        if !ctmf.is_degenerate() {
            match u32::try_from(g2o_fraction_bits)
                .ok()
                .and_then(|bits| 1i32.checked_shl(bits))
            {
                Some(fraction) if fraction > 0 => g2o_fraction = fraction,
                _ => ctmf.denominator = 0,
            }
        }
        if ctmf.is_degenerate() || ctmi.is_degenerate() {
            if options.enabled {
                log::warn!("degenerate glyph transform {linear:?}, hinting disabled");
            }
            hinting = false;
            ctmf.denominator = 1;
        }
        let transposed = (ctmf.xy.unsigned_abs() as u64) * 10 > ctmf.xx.unsigned_abs() as u64;
        let clamp_log2 = |(x, y): (i32, i32)| (x.min(MAX_LOG2_PIXELS), y.min(MAX_LOG2_PIXELS));
        let mut mapping = Self {
            ctmf,
            ctmi,
            g2o_fraction_bits,
            g2o_fraction,
            max_import_coord: 1 << MAX_COORD_BITS,
            height_coef: 0.0,
            width_coef: 0.0,
            height_coef_rat: 0,
            width_coef_rat: 0,
            height_coef_inv: 0,
            width_coef_inv: 0,
            transposed,
            keep_stem_width: false,
            grid_fit_x: false,
            grid_fit_y: false,
            hinting,
            align_to_pixels: options.align_to_pixels,
            log2_pixels: clamp_log2(options.log2_pixels_i32()),
            log2_subpixels: clamp_log2(options.log2_subpixels_i32()),
            orig_dx: 0,
            orig_dy: 0,
            orig_ox: 0,
            orig_oy: 0,
            pixel_o_x: 0,
            pixel_o_y: 0,
            pixel_gh: 0,
            pixel_gw: 0,
            font_size: 0.0,
            resolution: 0.0,
        };
        if let Some(m) = mapping.ctmf.to_double() {
            let vp = (m.xx * m.yy - m.yx * m.xy).abs();
            let sp = (m.xx * m.yx + m.xy * m.yy).abs();
            let div_x = m.xx.hypot(m.yx);
            let div_y = m.xy.hypot(m.yy);
            if vp != 0.0 && div_x != 0.0 && div_y != 0.0 {
                let (height, width) = if transposed {
                    (vp / div_y, vp / div_x)
                } else {
                    (vp / div_x, vp / div_y)
                };
                mapping.height_coef = height;
                mapping.width_coef = width;
                mapping.compute_rat_coefs();
                // Small skew
                mapping.keep_stem_width = sp <= vp / 3.0;
            }
        }
        let d0 = setup.base_font_matrix.vertical_scale();
        let d1 = setup.font_matrix.vertical_scale();
        let d2 = char_matrix.vertical_scale();
        mapping.font_size = (d1 / d0 * 10_000.0 + 0.5).floor() / 10_000.0;
        mapping.resolution = (d2 / d1 * 10_000_000.0 + 0.5).floor() / 10_000_000.0;
        let f = &mapping.ctmf;
        let (xx, xy) = (f.xx.unsigned_abs() as u64, f.xy.unsigned_abs() as u64);
        let (yx, yy) = (f.yx.unsigned_abs() as u64, f.yy.unsigned_abs() as u64);
        mapping.grid_fit_y = xy * 10 < xx || xx * 10 < xy;
        mapping.grid_fit_x = yx * 10 < yy || yy * 10 < yx;
        mapping.set_origin(
            to_device_fixed(char_matrix.tx),
            to_device_fixed(char_matrix.ty),
        );
        mapping
    }

    /// Returns the grid shifts for the x and y axes.
    pub fn grid_log2(&self, align_to_pixels: bool) -> (i32, i32) {
        if align_to_pixels {
            self.log2_pixels
        } else {
            self.log2_subpixels
        }
    }

    fn set_origin(&mut self, dx: i32, dy: i32) {
        let (log2_x, log2_y) = self.grid_log2(self.align_to_pixels);
        let align_x = rshift(FIXED_ONE as i64, log2_x);
        let align_y = rshift(FIXED_ONE as i64, log2_y);
        self.orig_dx = ((dx as i64 + align_x / 2) & !(align_x - 1)) as i32;
        self.orig_dy = ((dy as i64 + align_y / 2) & !(align_y - 1)) as i32;
        self.adjust_precision(self.orig_dx, self.orig_dy);
        self.update_derived();
    }

    /// Recomputes the values cached in outliner units.
    fn update_derived(&mut self) {
        self.orig_ox = self.d2o(self.orig_dx);
        self.orig_oy = self.d2o(self.orig_dy);
        let (log2_x, log2_y) = self.grid_log2(self.align_to_pixels);
        self.pixel_o_x = rshift(self.g2o_fraction as i64, log2_x) as i32;
        self.pixel_o_y = rshift(self.g2o_fraction as i64, log2_y) as i32;
        self.pixel_gh = self
            .o2g_dist(self.pixel_o_x, self.height_coef_inv)
            .wrapping_abs();
        self.pixel_gw = self
            .o2g_dist(self.pixel_o_y, self.width_coef_inv)
            .wrapping_abs();
    }

    pub fn compute_rat_coefs(&mut self) {
        let den = self.ctmf.denominator as f64;
        self.height_coef_rat = (self.height_coef * den + 0.5) as i32;
        self.width_coef_rat = (self.width_coef * den + 0.5) as i32;
        let inv_den = self.ctmi.denominator as f64;
        let inverse = |coef: f64| {
            if coef != 0.0 {
                (inv_den / coef + 0.5) as i32
            } else {
                0
            }
        };
        self.height_coef_inv = inverse(self.height_coef);
        self.width_coef_inv = inverse(self.width_coef);
    }

    /// Reduces the precision of the transform until coordinates of the
    /// given magnitude can be transformed without overflow.
    pub fn adjust_precision(&mut self, x: i32, y: i32) {
        let c = x.unsigned_abs().max(y.unsigned_abs()) as u64;
        if c >= self.max_import_coord {
            while c >= self.max_import_coord {
                self.max_import_coord <<= 1;
                self.ctmf.drop_bits(1);
                self.ctmi.drop_bits(1);
                self.g2o_fraction_bits -= 1;
                self.g2o_fraction >>= 1;
                self.compute_rat_coefs();
            }
            log::trace!(
                "transform precision reduced to {} fraction bits",
                self.g2o_fraction_bits
            );
            if self.ctmf.denominator == 0 {
                self.ctmf.denominator = 1;
            }
            self.update_derived();
        }
    }

    /// Outliner to device.
    pub fn o2d(&self, value: i32) -> i32 {
        shift_rounded(value, self.g2o_fraction_bits - FIXED_SHIFT)
    }

    /// Device to outliner.
    pub fn d2o(&self, value: i32) -> i32 {
        let s = self.g2o_fraction_bits - FIXED_SHIFT;
        if s >= 0 {
            value.wrapping_shl(s as u32)
        } else {
            value >> (-s).min(31)
        }
    }

    /// Glyph to outliner.
    pub fn g2o(&self, gx: i32, gy: i32) -> (i32, i32) {
        (
            self.ctmf.transform_x(gx, gy, G2O_BITSHIFT),
            self.ctmf.transform_y(gx, gy, G2O_BITSHIFT),
        )
    }

    /// Scales a glyph space distance by a rational coefficient.
    pub fn g2o_dist(gd: i32, coef: i32) -> i32 {
        mul_shift(gd, coef, G2O_BITSHIFT)
    }

    /// Glyph to device, including the origin.
    pub fn g2d(&self, gx: i32, gy: i32) -> (i32, i32) {
        let (dx, dy) = self.g2d_dist(gx, gy);
        (dx.wrapping_add(self.orig_dx), dy.wrapping_add(self.orig_dy))
    }

    /// Glyph to device for a vector.
    pub fn g2d_dist(&self, gx: i32, gy: i32) -> (i32, i32) {
        let (ox, oy) = self.g2o(gx, gy);
        (self.o2d(ox), self.o2d(oy))
    }

    fn o2g_shift(&self) -> i32 {
        self.g2o_fraction_bits + self.ctmi.bitshift - FIXED_SHIFT - SPLIT_BITS
    }

    /// Outliner to glyph.
    pub fn o2g(&self, ox: i32, oy: i32) -> (i32, i32) {
        let s = self.o2g_shift();
        (
            shift_rounded(self.ctmi.transform_x(ox, oy, SPLIT_BITS), s),
            shift_rounded(self.ctmi.transform_y(ox, oy, SPLIT_BITS), s),
        )
    }

    /// Scales an outliner distance by an inverse rational coefficient.
    pub fn o2g_dist(&self, od: i32, coef: i32) -> i32 {
        shift_rounded(mul_shift(od, coef, SPLIT_BITS), self.o2g_shift())
    }
}

/// Converts a device coordinate to 24.8, truncating.
fn to_device_fixed(value: f64) -> i32 {
    (value * FIXED_ONE as f64) as i32
}
