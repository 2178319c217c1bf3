//! Alignment zones and stem snap tables derived from the Private
//! dictionary.
//!
//! See "5.6 Alignment Zones" and "5.7 Stem Width Snapping" at
//! <https://adobe-type-tools.github.io/font-tech-notes/pdfs/T1_SPEC.pdf#page=41>

use alloc::vec::Vec;

use read_charstrings::{Fixed, PrivateDict};

use crate::{
    error::HintError,
    fraction::{FIXED_HALF, FIXED_ONE},
    mapping::Mapping,
};

/// Stem snap tables are indexed by axis: horizontal stems first.
pub(crate) const HORIZONTAL: usize = 0;
pub(crate) const VERTICAL: usize = 1;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum ZoneKind {
    Top,
    Bottom,
}

/// A band of y coordinates to which nearby horizontal features are
/// attracted.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) struct Zone {
    pub kind: ZoneKind,
    /// Flat position of the zone.
    pub y: i32,
    /// Position of overshooting features.
    pub overshoot_y: i32,
    pub y_min: i32,
    pub y_max: i32,
}

impl Zone {
    fn new(kind: ZoneKind, pair: (Fixed, Fixed), blue_fuzz: i32) -> Self {
        let mut y = glyph_coord(pair.0);
        let mut overshoot_y = glyph_coord(pair.1);
        let y_min = y.min(overshoot_y).wrapping_sub(blue_fuzz);
        let y_max = y.max(overshoot_y).wrapping_add(blue_fuzz);
        let swap = match kind {
            ZoneKind::Bottom => overshoot_y > y,
            ZoneKind::Top => overshoot_y < y,
        };
        if swap {
            core::mem::swap(&mut y, &mut overshoot_y);
        }
        Self {
            kind,
            y,
            overshoot_y,
            y_min,
            y_max,
        }
    }
}

/// Font wide hinting data in glyph space 24.8 units.
#[derive(Clone, Default, Debug)]
pub(crate) struct FontHints {
    pub zones: Vec<Zone>,
    /// Sorted, distinct preferred stem widths per axis.
    pub stem_snap: [Vec<i32>; 2],
    pub blue_fuzz: i32,
    /// True at sizes where overshoots should be flattened.
    pub suppress_overshoots: bool,
    /// Half a pixel in glyph units.
    pub overshoot_threshold: i32,
}

impl FontHints {
    /// Builds the zone and snap tables.
    ///
    /// May reduce the precision of `mapping` to accommodate large zone
    /// coordinates.
    pub fn new(dict: &PrivateDict, mapping: &mut Mapping) -> Result<Self, HintError> {
        let blue_fuzz = glyph_coord(dict.blue_fuzz);
        let log2_py = mapping.log2_pixels.1;
        let pixel_scale = (1i32 << log2_py) as f64;
        let blue_scale = dict.blue_scale.to_f64();
        let mut hints = Self {
            blue_fuzz,
            suppress_overshoots: blue_scale > mapping.height_coef / pixel_scale - 0.00020417,
            overshoot_threshold: if mapping.height_coef != 0.0 {
                (FIXED_HALF as f64 * pixel_scale / mapping.height_coef) as i32
            } else {
                0
            },
            ..Default::default()
        };
        if !mapping.hinting {
            return Ok(hints);
        }
        let (first_blues, other_blues) = split_first(dict.blue_values.values());
        hints.add_zones(dict.other_blues.values(), ZoneKind::Bottom, mapping)?;
        hints.add_zones(first_blues, ZoneKind::Bottom, mapping)?;
        hints.add_zones(other_blues, ZoneKind::Top, mapping)?;
        let (first_family, other_family) = split_first(dict.family_blues.values());
        hints.add_family_zones(dict.family_other_blues.values(), ZoneKind::Bottom, mapping);
        hints.add_family_zones(first_family, ZoneKind::Bottom, mapping);
        hints.add_family_zones(other_family, ZoneKind::Top, mapping);
        let (pixel_gh, pixel_gw) = (mapping.pixel_gh, mapping.pixel_gw);
        if let Some(std_hw) = dict.std_hw {
            hints.set_stem_snap(&[std_hw], HORIZONTAL, pixel_gh)?;
        }
        if let Some(std_vw) = dict.std_vw {
            hints.set_stem_snap(&[std_vw], VERTICAL, pixel_gw)?;
        }
        hints.set_stem_snap(dict.stem_snap_h.values(), HORIZONTAL, pixel_gh)?;
        hints.set_stem_snap(dict.stem_snap_v.values(), VERTICAL, pixel_gw)?;
        log::debug!(
            "{} alignment zones, stem snaps {:?}, overshoots {}",
            hints.zones.len(),
            hints.stem_snap,
            if hints.suppress_overshoots {
                "suppressed"
            } else {
                "enforced"
            }
        );
        Ok(hints)
    }

    fn add_zones(
        &mut self,
        pairs: &[(Fixed, Fixed)],
        kind: ZoneKind,
        mapping: &mut Mapping,
    ) -> Result<(), HintError> {
        self.zones.try_reserve(pairs.len())?;
        for pair in pairs {
            let zone = Zone::new(kind, *pair, self.blue_fuzz);
            mapping.adjust_precision(zone.y_min, zone.y_max);
            self.zones.push(zone);
        }
        Ok(())
    }

    /// Family zones replace the zones of the font that lie within one
    /// device pixel of them.
    fn add_family_zones(&mut self, pairs: &[(Fixed, Fixed)], kind: ZoneKind, mapping: &mut Mapping) {
        let coef = mapping.height_coef / FIXED_ONE as f64;
        let near = |a: i32, b: i32| (a as f64 - b as f64).abs() * coef <= 1.0;
        for pair in pairs {
            let family = Zone::new(kind, *pair, self.blue_fuzz);
            mapping.adjust_precision(family.y_min, family.y_max);
            for zone in self.zones.iter_mut() {
                if near(family.y, zone.y) && near(family.overshoot_y, zone.overshoot_y) {
                    *zone = family;
                }
            }
        }
    }

    /// Installs a snap table if it has a single entry or spans more than
    /// a pixel. A later table replaces an earlier one.
    fn set_stem_snap(
        &mut self,
        values: &[Fixed],
        axis: usize,
        pixel_g: i32,
    ) -> Result<(), HintError> {
        if pixel_g == 0 || values.is_empty() {
            return Ok(());
        }
        let first = glyph_coord(values[0]);
        let last = glyph_coord(values[values.len() - 1]);
        if values.len() > 1 && last.wrapping_sub(first) <= pixel_g {
            return Ok(());
        }
        let table = &mut self.stem_snap[axis];
        table.clear();
        table.try_reserve(values.len())?;
        table.extend(values.iter().map(|v| glyph_coord(*v)));
        table.sort_unstable();
        table.dedup();
        Ok(())
    }

    /// Returns the first zone of an allowed kind that contains `y`.
    ///
    /// Curves may only fall in top zones when convex and in bottom zones
    /// when concave.
    pub fn find_zone(&self, y: i32, curve: bool, convex: bool, concave: bool) -> Option<&Zone> {
        let maybe_top = !curve || convex;
        let maybe_bottom = !curve || concave;
        self.zones.iter().find(|zone| {
            let kind_ok = match zone.kind {
                ZoneKind::Top => maybe_top,
                ZoneKind::Bottom => maybe_bottom,
            };
            kind_ok && zone.y_min <= y && y <= zone.y_max
        })
    }
}

fn split_first(pairs: &[(Fixed, Fixed)]) -> (&[(Fixed, Fixed)], &[(Fixed, Fixed)]) {
    pairs.split_at(pairs.len().min(1))
}

/// Converts a 16.16 value to a 24.8 glyph coordinate.
pub(crate) fn glyph_coord(value: Fixed) -> i32 {
    value.to_f24dot8().to_bits()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{options::HintingOptions, transform::DeviceSetup};
    use read_charstrings::{Blues, StemSnaps};

    fn test_dict() -> PrivateDict {
        let mut dict = PrivateDict::default();
        dict.blue_values = Blues::from_i32s(&[-15, 0, 715, 730, 510, 520]);
        dict.other_blues = Blues::from_i32s(&[-210, -200]);
        dict.std_hw = Some(Fixed::from_i32(30));
        dict.std_vw = Some(Fixed::from_i32(80));
        dict
    }

    fn mapping(ppem: f64) -> Mapping {
        Mapping::new(
            &DeviceSetup::from_ppem(1000, ppem),
            &HintingOptions::default(),
        )
    }

    #[test]
    fn zone_order_and_orientation() {
        let hints = FontHints::new(&test_dict(), &mut mapping(12.0)).unwrap();
        let summary: Vec<_> = hints
            .zones
            .iter()
            .map(|z| (z.kind, z.y >> 8, z.overshoot_y >> 8))
            .collect();
        assert_eq!(
            summary,
            [
                (ZoneKind::Bottom, -200, -210),
                (ZoneKind::Bottom, 0, -15),
                (ZoneKind::Top, 715, 730),
                (ZoneKind::Top, 510, 520),
            ]
        );
        let base = hints.zones[1];
        assert_eq!(base.y_min, -16 << 8);
        assert_eq!(base.y_max, 1 << 8);
    }

    #[test]
    fn find_zone_respects_convexity() {
        let hints = FontHints::new(&test_dict(), &mut mapping(12.0)).unwrap();
        assert_eq!(hints.find_zone(720 << 8, false, false, false).unwrap().y, 715 << 8);
        // A concave curve may not use a top zone
        assert!(hints.find_zone(720 << 8, true, false, true).is_none());
        assert_eq!(hints.find_zone(-10 << 8, true, false, true).unwrap().y, 0);
        assert!(hints.find_zone(300 << 8, false, false, false).is_none());
    }

    #[test]
    fn family_zones_replace_close_zones() {
        let mut dict = test_dict();
        dict.family_blues = Blues::from_i32s(&[-15, 0, 716, 731]);
        let hints = FontHints::new(&dict, &mut mapping(12.0)).unwrap();
        assert_eq!(hints.zones[2].y, 716 << 8);
        assert_eq!(hints.zones[2].overshoot_y, 731 << 8);
        // At a large size the difference exceeds a pixel
        let hints = FontHints::new(&dict, &mut mapping(2000.0)).unwrap();
        assert_eq!(hints.zones[2].y, 715 << 8);
    }

    #[test]
    fn overshoot_suppression_depends_on_size() {
        // BlueScale 0.039625 corresponds to ~39.6 pixels per 1000 units
        let small = FontHints::new(&test_dict(), &mut mapping(12.0)).unwrap();
        assert!(small.suppress_overshoots);
        let large = FontHints::new(&test_dict(), &mut mapping(100.0)).unwrap();
        assert!(!large.suppress_overshoots);
        // Half a pixel at 100 ppem is 5 units
        assert!((large.overshoot_threshold - (5 << 8)).abs() <= 1);
    }

    #[test]
    fn stem_snap_tables() {
        let mut dict = test_dict();
        let hints = FontHints::new(&dict, &mut mapping(12.0)).unwrap();
        assert_eq!(hints.stem_snap, [vec![30 << 8], vec![80 << 8]]);
        // A table spanning less than a pixel is ignored
        dict.stem_snap_v = StemSnaps::from_i32s(&[80, 90]);
        let hints = FontHints::new(&dict, &mut mapping(12.0)).unwrap();
        assert_eq!(hints.stem_snap[VERTICAL], [80 << 8]);
        // .. but used when larger than a pixel
        let hints = FontHints::new(&dict, &mut mapping(200.0)).unwrap();
        assert_eq!(hints.stem_snap[VERTICAL], [80 << 8, 90 << 8]);
        dict.stem_snap_h = StemSnaps::from_i32s(&[36, 30, 36, 90]);
        let hints = FontHints::new(&dict, &mut mapping(12.0)).unwrap();
        assert_eq!(hints.stem_snap[HORIZONTAL], [30 << 8, 36 << 8, 90 << 8]);
    }

    #[test]
    fn unhinted_has_no_zones() {
        let mut m = Mapping::new(
            &DeviceSetup::from_ppem(1000, 12.0),
            &HintingOptions::unhinted(),
        );
        let hints = FontHints::new(&test_dict(), &mut m).unwrap();
        assert!(hints.zones.is_empty());
        assert!(hints.stem_snap.iter().all(|t| t.is_empty()));
    }
}
