//! Hinting parameters and metrics from a font's Private dictionary.

use ps_types::Fixed;

/// Maximum number of zone pairs in a blue array.
///
/// BlueValues holds at most 14 numbers and the other arrays fewer.
/// <https://adobe-type-tools.github.io/font-tech-notes/pdfs/T1_SPEC.pdf#page=37>
const MAX_BLUE_VALUES: usize = 7;

/// Operand for the `BlueValues`, `OtherBlues`, `FamilyBlues` and
/// `FamilyOtherBlues` entries.
///
/// These are used to generate zones when applying hints.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Blues {
    values: [(Fixed, Fixed); MAX_BLUE_VALUES],
    len: u32,
}

impl Blues {
    /// Creates a blue array from a flat list of values. A trailing
    /// unpaired value is ignored.
    pub fn new(values: impl Iterator<Item = Fixed>) -> Self {
        let mut blues = Self::default();
        let mut stash = Fixed::ZERO;
        for (i, value) in values.take(MAX_BLUE_VALUES * 2).enumerate() {
            if (i & 1) == 0 {
                stash = value;
            } else {
                blues.values[i / 2] = (stash, value);
                blues.len += 1;
            }
        }
        blues
    }

    /// Creates a blue array from integer font units.
    pub fn from_i32s(values: &[i32]) -> Self {
        Self::new(values.iter().copied().map(Fixed::from_i32))
    }

    pub fn values(&self) -> &[(Fixed, Fixed)] {
        &self.values[..self.len as usize]
    }
}

/// Summary: older PostScript interpreters accept two values, but newer ones
/// accept 12. We'll assume that as maximum.
/// <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5049.StemSnap.pdf>
const MAX_STEM_SNAPS: usize = 12;

/// Operand for the `StemSnapH` and `StemSnapV` entries.
///
/// These are used to choose consistent stem widths when applying hints.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StemSnaps {
    values: [Fixed; MAX_STEM_SNAPS],
    len: u32,
}

impl StemSnaps {
    pub fn new(values: impl Iterator<Item = Fixed>) -> Self {
        let mut snaps = Self::default();
        for (value, target_value) in values.take(MAX_STEM_SNAPS).zip(&mut snaps.values) {
            *target_value = value;
            snaps.len += 1;
        }
        snaps
    }

    pub fn from_i32s(values: &[i32]) -> Self {
        Self::new(values.iter().copied().map(Fixed::from_i32))
    }

    pub fn values(&self) -> &[Fixed] {
        &self.values[..self.len as usize]
    }
}

/// Maximum number of masters in a multiple master font.
pub const MAX_MASTERS: usize = 16;

/// Interpolation weights of a multiple master instance.
///
/// This is also registry item 0 for the Type 2 `store` and `load`
/// operators.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeightVector {
    values: [Fixed; MAX_MASTERS],
    len: u32,
}

impl WeightVector {
    pub fn new(values: impl Iterator<Item = Fixed>) -> Self {
        let mut weights = Self::default();
        for (value, target_value) in values.take(MAX_MASTERS).zip(&mut weights.values) {
            *target_value = value;
            weights.len += 1;
        }
        weights
    }

    pub fn values(&self) -> &[Fixed] {
        &self.values[..self.len as usize]
    }

    pub fn values_mut(&mut self) -> &mut [Fixed] {
        &mut self.values[..self.len as usize]
    }
}

/// Font wide values that control hinting and charstring decoding.
///
/// This is read-only during glyph processing and may be shared between
/// threads.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrivateDict {
    pub blue_values: Blues,
    pub other_blues: Blues,
    pub family_blues: Blues,
    pub family_other_blues: Blues,
    pub blue_scale: Fixed,
    pub blue_shift: Fixed,
    pub blue_fuzz: Fixed,
    pub std_hw: Option<Fixed>,
    pub std_vw: Option<Fixed>,
    pub stem_snap_h: StemSnaps,
    pub stem_snap_v: StemSnaps,
    pub force_bold: bool,
    pub language_group: i32,
    /// Number of random bytes at the start of each charstring, or -1 if
    /// charstrings are not encrypted.
    pub len_iv: i32,
    pub default_width_x: Fixed,
    pub nominal_width_x: Fixed,
    pub weight_vector: WeightVector,
}

impl Default for PrivateDict {
    fn default() -> Self {
        Self {
            blue_values: Blues::default(),
            other_blues: Blues::default(),
            family_blues: Blues::default(),
            family_other_blues: Blues::default(),
            // See <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5176.CFF.pdf#page=24>
            blue_scale: Fixed::from_f64(0.039625),
            blue_shift: Fixed::from_i32(7),
            blue_fuzz: Fixed::ONE,
            std_hw: None,
            std_vw: None,
            stem_snap_h: StemSnaps::default(),
            stem_snap_v: StemSnaps::default(),
            force_bold: false,
            language_group: 0,
            len_iv: 4,
            default_width_x: Fixed::ZERO,
            nominal_width_x: Fixed::ZERO,
            weight_vector: WeightVector::default(),
        }
    }
}
