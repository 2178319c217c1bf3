//! Flex resolution.
//!
//! A Type 1 flex is accumulated as eight poles: the point before the flex,
//! the reference point and the six points of the two curves. It is drawn
//! as a straight line when the curves deviate less than the flex height
//! from the chord.
//!
//! Fonts without declared flex frequently contain the same shallow bumps.
//! These are detected per contour and flattened so that they do not
//! disturb the alignment of the plateau they sit on.
//!
//! See "8.3 Flex" at
//! <https://adobe-type-tools.github.io/font-tech-notes/pdfs/T1_SPEC.pdf#page=81>

use crate::{
    mapping::Mapping,
    outline::{Axis, HintKind, Outline, PoleKind},
};

/// Number of poles buffered for a Type 1 flex.
pub(crate) const FLEX_POLE_COUNT: usize = 8;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum FlexShape {
    Curves,
    Line,
}

/// Decides whether the buffered flex poles form visible curves.
///
/// `height` is the flex height in hundredths of a device pixel. Returns
/// `None` if fewer than eight poles are buffered.
pub(crate) fn flex_shape(outline: &Outline, mapping: &Mapping, height: f64) -> Option<FlexShape> {
    let pole0 = outline.poles.len().checked_sub(FLEX_POLE_COUNT)?;
    let pole1 = &outline.poles[pole0 + 1];
    let pole4 = &outline.poles[pole0 + 4];
    let (ox, oy) = mapping.g2o(
        pole4.gx.wrapping_sub(pole1.gx),
        pole4.gy.wrapping_sub(pole1.gy),
    );
    let div_x = (mapping.g2o_fraction as i64) << mapping.log2_pixels.0;
    let div_y = (mapping.g2o_fraction as i64) << mapping.log2_pixels.1;
    let visible = (ox as f64).abs() > div_x as f64 * height / 100.0
        || (oy as f64).abs() > div_y as f64 * height / 100.0;
    Some(if visible {
        FlexShape::Curves
    } else {
        FlexShape::Line
    })
}

/// Replaces the buffered flex poles with the chosen shape.
pub(crate) fn collapse_flex(outline: &mut Outline, shape: FlexShape) {
    let Some(pole0) = outline.poles.len().checked_sub(FLEX_POLE_COUNT) else {
        return;
    };
    let poles = &mut outline.poles;
    match shape {
        FlexShape::Curves => {
            // Drop the reference point
            poles.remove(pole0 + 1);
            let kinds = [
                PoleKind::OffCurve,
                PoleKind::OffCurve,
                PoleKind::OnCurve,
                PoleKind::OffCurve,
                PoleKind::OffCurve,
                PoleKind::OnCurve,
            ];
            for (pole, kind) in poles[pole0 + 1..].iter_mut().zip(kinds) {
                pole.kind = kind;
            }
        }
        FlexShape::Line => {
            let mut end = poles[pole0 + 7];
            end.kind = PoleKind::OnCurve;
            poles[pole0 + 1] = end;
            poles.truncate(pole0 + 2);
        }
    }
}

/// Flattens shallow bumps in the most recently closed contour.
pub(crate) fn fix_missed_flex(outline: &mut Outline, pixel_gw: i32, pixel_gh: i32) {
    let contour_count = outline.contour_count();
    if contour_count == 0 || outline.last_pole_kind() != Some(PoleKind::ClosePath) {
        return;
    }
    let contour_beg = outline.contours[contour_count - 1];
    // The closing pole
    let mut contour_end = outline.poles.len() - 1;
    if contour_beg + 8 >= contour_end {
        return;
    }
    for axis in [Axis::X, Axis::Y] {
        let other = axis.other();
        let pixel_g = match axis {
            Axis::X => pixel_gw,
            Axis::Y => pixel_gh,
        };
        if pixel_g <= 0 {
            continue;
        }
        let threshold = pixel_g * 5 / 10;
        let in_band = |g: i32, gc: i32| g >= gc - threshold && g <= gc + threshold;
        let gc = outline.poles[contour_beg].g(axis);
        // Search backward for the start of a plateau
        let mut i = contour_end;
        while i > contour_beg {
            let pole = &outline.poles[i];
            if !pole.is_off_curve() && !in_band(pole.g(axis), gc) {
                break;
            }
            i -= 1;
        }
        let mut wrapped = false;
        if i == contour_end {
            i = contour_beg;
            wrapped = true;
        } else {
            i += 1;
        }
        // Search forward for all plateaus
        loop {
            if i >= contour_end {
                if wrapped {
                    break;
                }
                wrapped = true;
                i = contour_beg;
            }
            let gc = outline.poles[i].g(axis);
            let mut ge = outline.poles[i].g(other);
            let mut prev_dir = 0;
            let (mut pj, mut j, mut n) = (i, i + 1, 0usize);
            loop {
                if j >= contour_end {
                    j = contour_beg;
                }
                if j == i {
                    break;
                }
                let pole = &outline.poles[j];
                if !pole.is_off_curve() {
                    if !in_band(pole.g(axis), gc) {
                        break;
                    }
                    let gd = pole.g(other);
                    let dir = if gd > ge { 1 } else { -1 };
                    if dir * prev_dir < 0 {
                        break;
                    }
                    ge = gd;
                    prev_dir = dir;
                }
                pj = j;
                j += 1;
                n += 1;
            }
            if n >= 6 {
                let span = ContourSpan {
                    beg: contour_beg,
                    end: contour_end,
                };
                if let Some(flex) = find_flex(outline, axis, span, pixel_g, threshold, i, pj, n) {
                    compact_flex(outline, span, flex.beg, flex.end, &mut i);
                    adjust_stem_hints(outline, gc, flex.extreme, axis);
                    contour_end = outline.poles.len() - 1;
                }
            }
            i += 1;
        }
    }
}

/// First pole and closing pole of the contour being repaired.
#[derive(Copy, Clone, Debug)]
struct ContourSpan {
    beg: usize,
    end: usize,
}

impl ContourSpan {
    fn forward(&self, i: usize) -> usize {
        if i + 1 >= self.end {
            self.beg
        } else {
            i + 1
        }
    }

    fn backward(&self, i: usize) -> usize {
        if i <= self.beg {
            self.end - 1
        } else {
            i - 1
        }
    }
}

struct MissedFlex {
    beg: usize,
    end: usize,
    /// Coordinate of the deepest point of the bump.
    extreme: i32,
}

/// Looks for a flex starting at the first on-curve pole of a plateau.
#[allow(clippy::too_many_arguments)]
fn find_flex(
    outline: &Outline,
    axis: Axis,
    span: ContourSpan,
    pixel_g: i32,
    threshold: i32,
    i0: usize,
    i1: usize,
    count: usize,
) -> Option<MissedFlex> {
    let other = axis.other();
    let poles = &outline.poles;
    let mut i = i0;
    for _ in 0..count - 5 {
        if i >= span.end {
            i = span.beg;
        }
        if poles[i].is_off_curve() {
            i += 1;
            continue;
        }
        let gc0 = poles[i].g(axis);
        let gd0 = poles[i].g(other);
        let mut j = i1;
        for _ in 0..count - 5 {
            let candidate = j;
            j = span.backward(j);
            if poles[candidate].is_off_curve() {
                continue;
            }
            let gc1 = poles[candidate].g(axis);
            let gd1 = poles[candidate].g(other);
            // At least four pixels long
            if (gd1 as i64 - gd0 as i64).abs() < pixel_g as i64 * 4 || gc0 != gc1 {
                continue;
            }
            let mut extreme = gc0;
            let mut extreme_dist = 0;
            let (mut lt, mut gt) = (false, false);
            let mut area = 0.0f64;
            let (mut dir, mut prev_dir, mut dir_changes) = (0, 0, 0);
            let (mut gcp, mut gdp) = (gc0, gd0);
            let mut l = i;
            loop {
                if l >= span.end {
                    l = span.beg;
                }
                let gcl = poles[l].g(axis);
                let gdl = poles[l].g(other);
                if l != i {
                    area += (gcp as f64 - gc0 as f64) * (gdl as f64 - gdp as f64)
                        - (gdp as f64 - gd0 as f64) * (gcl as f64 - gcp as f64);
                    let dist = (gcl as i64 - gc0 as i64).abs();
                    if extreme_dist < dist {
                        extreme = gcl;
                        extreme_dist = dist;
                    }
                    dir = match gcp.cmp(&gcl) {
                        core::cmp::Ordering::Less => 1,
                        core::cmp::Ordering::Greater => -1,
                        core::cmp::Ordering::Equal => prev_dir,
                    };
                    if dir * prev_dir < 0 {
                        dir_changes += 1;
                    }
                }
                if l == candidate {
                    break;
                }
                lt |= gcl < gc0;
                gt |= gcl > gc0;
                gcp = gcl;
                gdp = gdl;
                prev_dir = dir;
                l += 1;
            }
            if dir_changes > 1 || extreme_dist > threshold as i64 {
                continue;
            }
            let area = area.abs() / 2.0;
            let bounds = ((gd1 as f64 - gd0 as f64) * extreme_dist as f64).abs();
            if area > bounds * 0.75 {
                // Looks like a rounded rectangle
                continue;
            }
            if !lt || !gt {
                let gii = poles[span.backward(i)].g(axis);
                let gjj = poles[span.forward(candidate)].g(axis);
                if (lt && gii <= gc0 && gjj <= gc0) || (gt && gii >= gc0 && gjj >= gc0) {
                    return Some(MissedFlex {
                        beg: i,
                        end: candidate,
                        extreme,
                    });
                }
            }
        }
        // Later starting points are tried by the caller
        break;
    }
    None
}

/// Removes the poles strictly between `i0` and `i1`, wrapping around the
/// contour if `i0 > i1`.
fn compact_flex(outline: &mut Outline, span: ContourSpan, i0: usize, i1: usize, pi: &mut usize) {
    if i0 > i1 {
        compact_flex(outline, span, i0, span.end, pi);
        compact_flex(outline, span, span.beg, i1, pi);
        return;
    }
    if i0 + 1 >= i1 {
        return;
    }
    let removed = i1 - i0 - 1;
    let shift = |index: usize| {
        if index >= i1 {
            index - removed
        } else if index > i0 {
            i0
        } else {
            index
        }
    };
    for range in &mut outline.ranges {
        range.beg = shift(range.beg);
        range.end = range.end.map(shift);
    }
    outline.poles.drain(i0 + 1..i1);
    if let Some(open) = outline.contours.last_mut() {
        *open = open.saturating_sub(removed);
    }
    *pi = shift(*pi);
}

/// Moves stem boundaries that fell inside a flattened bump onto the
/// plateau.
fn adjust_stem_hints(outline: &mut Outline, plateau: i32, extreme: i32, axis: Axis) {
    let (lo, hi) = (plateau.min(extreme), plateau.max(extreme));
    let kind = match axis {
        Axis::X => HintKind::VStem,
        Axis::Y => HintKind::HStem,
    };
    for hint in outline.hints.iter_mut().filter(|hint| hint.kind == kind) {
        if (lo..=hi).contains(&hint.g0) {
            hint.g0 = plateau;
            hint.ag0 = plateau;
        }
        if (lo..=hi).contains(&hint.g1) {
            hint.g1 = plateau;
            hint.ag1 = plateau;
        }
    }
}
