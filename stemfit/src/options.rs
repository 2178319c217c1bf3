//! Hinting configuration.

/// Configuration for grid fitting.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HintingOptions {
    /// When false, outlines are transformed without any alignment.
    ///
    /// Defaults to true.
    pub enabled: bool,
    /// Aligns to whole device pixels rather than to the subpixel grid
    /// given by [`log2_subpixels`](Self::log2_subpixels).
    ///
    /// Defaults to true.
    pub align_to_pixels: bool,
    /// Base 2 logarithm of the number of device units per pixel on the
    /// x and y axes, for devices that oversample.
    pub log2_pixels: (u8, u8),
    /// Base 2 logarithm of the subpixel grid used when not aligning to
    /// whole pixels.
    pub log2_subpixels: (u8, u8),
    /// Replaces the flex height given by Type 1 charstrings, in hundredths
    /// of a pixel.
    pub flex_threshold_override: Option<i32>,
}

impl HintingOptions {
    /// Options that disable hinting entirely.
    pub fn unhinted() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub(crate) fn log2_pixels_i32(&self) -> (i32, i32) {
        (self.log2_pixels.0 as i32, self.log2_pixels.1 as i32)
    }

    pub(crate) fn log2_subpixels_i32(&self) -> (i32, i32) {
        (self.log2_subpixels.0 as i32, self.log2_subpixels.1 as i32)
    }
}

impl Default for HintingOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            align_to_pixels: true,
            log2_pixels: (0, 0),
            log2_subpixels: (0, 0),
            flex_threshold_override: None,
        }
    }
}
