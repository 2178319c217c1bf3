//! Outline and hint representation for a single glyph.
//!
//! Points are stored in glyph space as 24.8 values. A contour is the run
//! of poles between a move and the following close; the close is either a
//! separate pole or, when the path returns to its start, the last pole of
//! the contour retagged. Cyclic walks over a contour never visit the close
//! pole.

use alloc::{vec, vec::Vec};

use crate::error::HintError;

/// Selects one of the coordinates of a pole.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum Axis {
    X,
    Y,
}

impl Axis {
    pub fn other(self) -> Self {
        match self {
            Self::X => Self::Y,
            Self::Y => Self::X,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum PoleKind {
    OnCurve,
    OffCurve,
    ClosePath,
    MoveTo,
}

/// Strength of the alignment applied to a coordinate.
///
/// Later variants take priority over earlier ones.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default, Debug)]
pub(crate) enum Alignment {
    #[default]
    Unaligned,
    Weak,
    Aligned,
    TopZone,
    BottomZone,
}

impl Alignment {
    pub fn is_aligned(self) -> bool {
        self != Self::Unaligned
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) struct Pole {
    /// Original glyph space coordinates.
    pub gx: i32,
    pub gy: i32,
    /// Aligned glyph space coordinates.
    pub ax: i32,
    pub ay: i32,
    pub kind: PoleKind,
    pub contour_index: usize,
    pub aligned_x: Alignment,
    pub aligned_y: Alignment,
    /// Length of the opposite stem boundary, used to resolve conflicting
    /// alignments.
    pub boundary_length_x: i32,
    pub boundary_length_y: i32,
}

impl Pole {
    pub fn new(x: i32, y: i32, kind: PoleKind, contour_index: usize) -> Self {
        Self {
            gx: x,
            gy: y,
            ax: x,
            ay: y,
            kind,
            contour_index,
            aligned_x: Alignment::Unaligned,
            aligned_y: Alignment::Unaligned,
            boundary_length_x: 0,
            boundary_length_y: 0,
        }
    }

    pub fn g(&self, axis: Axis) -> i32 {
        match axis {
            Axis::X => self.gx,
            Axis::Y => self.gy,
        }
    }

    pub fn a(&self, axis: Axis) -> i32 {
        match axis {
            Axis::X => self.ax,
            Axis::Y => self.ay,
        }
    }

    pub fn a_mut(&mut self, axis: Axis) -> &mut i32 {
        match axis {
            Axis::X => &mut self.ax,
            Axis::Y => &mut self.ay,
        }
    }

    pub fn aligned(&self, axis: Axis) -> Alignment {
        match axis {
            Axis::X => self.aligned_x,
            Axis::Y => self.aligned_y,
        }
    }

    pub fn aligned_mut(&mut self, axis: Axis) -> &mut Alignment {
        match axis {
            Axis::X => &mut self.aligned_x,
            Axis::Y => &mut self.aligned_y,
        }
    }

    pub fn boundary_length(&self, axis: Axis) -> i32 {
        match axis {
            Axis::X => self.boundary_length_x,
            Axis::Y => self.boundary_length_y,
        }
    }

    pub fn boundary_length_mut(&mut self, axis: Axis) -> &mut i32 {
        match axis {
            Axis::X => &mut self.boundary_length_x,
            Axis::Y => &mut self.boundary_length_y,
        }
    }

    pub fn is_off_curve(&self) -> bool {
        self.kind == PoleKind::OffCurve
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum HintKind {
    /// Horizontal stem, bounded by two y coordinates.
    HStem,
    /// Vertical stem, bounded by two x coordinates.
    VStem,
    /// Marks the contour that follows as a dot.
    Dot,
}

impl HintKind {
    /// The axis of the coordinates that bound the stem.
    pub fn axis(self) -> Axis {
        match self {
            Self::VStem => Axis::X,
            _ => Axis::Y,
        }
    }

    pub fn is_stem(self) -> bool {
        self != Self::Dot
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) struct Hint {
    pub kind: HintKind,
    /// Boundaries in glyph space.
    pub g0: i32,
    pub g1: i32,
    /// Aligned boundaries.
    pub ag0: i32,
    pub ag1: i32,
    pub aligned0: Alignment,
    pub aligned1: Alignment,
    /// Tangent quality of the pole that produced each aligned boundary.
    /// Smaller is better.
    pub q0: i32,
    pub q1: i32,
    /// True when a pole of the outline realizes the boundary.
    pub b0: bool,
    pub b1: bool,
    /// Position in an hstem3/vstem3 group, or 0.
    pub stem3_index: u8,
    /// Head of the list of ranges where the hint is active.
    pub range_index: Option<usize>,
    /// Entry of the stem snap table chosen for this stem.
    pub stem_snap_index: Option<usize>,
    pub boundary_length0: i32,
    pub boundary_length1: i32,
}

impl Hint {
    pub fn new(kind: HintKind, g0: i32, g1: i32, stem3_index: u8) -> Self {
        Self {
            kind,
            g0,
            g1,
            ag0: g0,
            ag1: g1,
            aligned0: Alignment::Unaligned,
            aligned1: Alignment::Unaligned,
            q0: i32::MAX,
            q1: i32::MAX,
            b0: false,
            b1: false,
            stem3_index,
            range_index: None,
            stem_snap_index: Some(0),
            boundary_length0: 0,
            boundary_length1: 0,
        }
    }

    /// Width of the stem in glyph units.
    pub fn width(&self) -> i32 {
        self.g1.wrapping_sub(self.g0).wrapping_abs()
    }

    /// Proposes an aligned coordinate for the boundary nearest to the
    /// coordinate `g` of a pole.
    pub fn set_aligned_coord(&mut self, gc: i32, g: i32, align: Alignment, quality: i32) {
        if (self.g0 - g).abs() < (self.g1 - g).abs() {
            if self.aligned0 <= align && self.q0 > quality {
                self.ag0 = gc;
                self.aligned0 = align;
                self.q0 = quality;
            }
        } else if self.aligned1 <= align && self.q1 > quality {
            self.ag1 = gc;
            self.aligned1 = align;
            self.q1 = quality;
        }
    }
}

/// Interval of poles, inclusive, where a hint applies.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) struct HintRange {
    pub beg: usize,
    /// None while the range is still open.
    pub end: Option<usize>,
    /// Previous range of the same hint.
    pub next: Option<usize>,
}

#[derive(Clone, Debug)]
pub(crate) struct Outline {
    pub poles: Vec<Pole>,
    /// Start of each closed contour followed by the start of the current
    /// one.
    pub contours: Vec<usize>,
    pub hints: Vec<Hint>,
    pub ranges: Vec<HintRange>,
    /// Number of ranges declared before the first hint replacement.
    pub primary_hint_count: Option<usize>,
    pub y_min: i32,
    pub y_max: i32,
    pub y_mid: i32,
}

impl Default for Outline {
    fn default() -> Self {
        Self {
            poles: Vec::new(),
            contours: vec![0],
            hints: Vec::new(),
            ranges: Vec::new(),
            primary_hint_count: None,
            y_min: 0,
            y_max: 0,
            y_mid: 0,
        }
    }
}

/// Next index in the cyclic interval `beg..=end`.
#[inline]
pub(crate) fn step_forward(i: usize, beg: usize, end: usize) -> usize {
    if i >= end {
        beg
    } else {
        i + 1
    }
}

/// Previous index in the cyclic interval `beg..=end`.
#[inline]
pub(crate) fn step_back(i: usize, beg: usize, end: usize) -> usize {
    if i <= beg {
        end
    } else {
        (i - 1).min(end)
    }
}

impl Outline {
    /// Number of closed contours.
    pub fn contour_count(&self) -> usize {
        self.contours.len() - 1
    }

    /// Index of the first pole of the contour that is being built.
    pub fn open_contour_start(&self) -> usize {
        self.contours.last().copied().unwrap_or(0)
    }

    pub fn last_pole_kind(&self) -> Option<PoleKind> {
        self.poles.last().map(|pole| pole.kind)
    }

    /// Returns the first and last pole of a closed contour, excluding the
    /// closing pole.
    pub fn contour_bounds(&self, contour_index: usize) -> Option<(usize, usize)> {
        let beg = *self.contours.get(contour_index)?;
        let next = *self.contours.get(contour_index + 1)?;
        Some((beg, next.saturating_sub(2).max(beg)))
    }

    /// Contour bounds for the contour owning the given pole.
    pub fn pole_bounds(&self, pole_index: usize) -> (usize, usize) {
        self.poles
            .get(pole_index)
            .and_then(|pole| self.contour_bounds(pole.contour_index))
            .unwrap_or((pole_index, pole_index))
    }

    /// Index of the first pole after the contour owning the given pole.
    pub fn next_contour_start(&self, pole_index: usize) -> usize {
        self.poles
            .get(pole_index)
            .and_then(|pole| self.contours.get(pole.contour_index + 1))
            .copied()
            .unwrap_or(self.poles.len())
    }

    pub fn next_contour_pole(&self, pole_index: usize) -> usize {
        let (beg, end) = self.pole_bounds(pole_index);
        step_forward(pole_index, beg, end)
    }

    /// Returns the on-curve pole that starts the segment ending at the
    /// given pole.
    pub fn segment_beg(&self, pole_index: usize) -> usize {
        let (beg, end) = self.pole_bounds(pole_index);
        let mut prev = step_back(pole_index, beg, end);
        for _ in beg..=end {
            if !self.poles[prev].is_off_curve() {
                break;
            }
            prev = step_back(prev, beg, end);
        }
        prev
    }

    /// Returns the on-curve pole that ends the segment starting at the
    /// given pole.
    pub fn segment_end(&self, pole_index: usize) -> usize {
        let (beg, end) = self.pole_bounds(pole_index);
        let mut next = step_forward(pole_index, beg, end);
        for _ in beg..=end {
            if !self.poles[next].is_off_curve() {
                break;
            }
            next = step_forward(next, beg, end);
        }
        next
    }

    /// Steps to the next segment of a range walk, moving on to the next
    /// contour after wrapping around.
    pub fn next_range_pole(&self, pole_index: usize) -> usize {
        let next = self.segment_end(pole_index);
        if next <= pole_index {
            self.next_contour_start(next)
        } else {
            next
        }
    }

    /// Tests whether the vector between two poles is within a small angle
    /// of the tangent `(tan_x, tan_y)`, returning the quality of the match
    /// (0 is best).
    ///
    /// The angle must satisfy `sin/cos <= alpha_div / alpha`.
    pub fn small_angle_quality(
        &self,
        pole_index0: usize,
        pole_index1: usize,
        tan_x: i64,
        tan_y: i64,
        alpha: i64,
        alpha_div: i64,
    ) -> Option<i32> {
        let p0 = &self.poles[pole_index0];
        let p1 = &self.poles[pole_index1];
        let gx = p1.gx as i64 - p0.gx as i64;
        let gy = p1.gy as i64 - p0.gy as i64;
        if gx == 0 && gy == 0 {
            return None;
        }
        let vp = ((gx * tan_y) >> 8) - ((gy * tan_x) >> 8);
        let sp = ((gx * tan_x) >> 8) + ((gy * tan_y) >> 8);
        let (vp, sp) = (vp.abs(), sp.abs());
        if vp >= sp || vp / alpha_div > sp / alpha {
            return None;
        }
        Some((vp * 100 / sp) as i32)
    }

    /// Tests whether the outline is nearly tangent to the given direction
    /// at a pole, returning the best quality of the two adjacent segments.
    pub fn good_tangent(&self, pole_index: usize, tan_x: i64, tan_y: i64) -> (bool, i32) {
        const ALPHA: i64 = 9;
        const ALPHA_DIV: i64 = 10;
        let (beg, end) = self.pole_bounds(pole_index);
        let prev = step_back(pole_index, beg, end);
        let quality0 = self.small_angle_quality(prev, pole_index, tan_x, tan_y, ALPHA, ALPHA_DIV);
        if quality0 == Some(0) {
            return (true, 0);
        }
        let next = step_forward(pole_index, beg, end);
        let quality1 = self.small_angle_quality(next, pole_index, tan_x, tan_y, ALPHA, ALPHA_DIV);
        let quality = quality0
            .unwrap_or(i32::MAX)
            .min(quality1.unwrap_or(i32::MAX));
        (quality0.is_some() || quality1.is_some(), quality)
    }

    /// Computes the vertical extent of the outline, ignoring the trailing
    /// advance pole of non-empty glyphs.
    pub fn compute_y_span(&mut self) {
        let Some(first) = self.poles.first() else {
            return;
        };
        let mut n = self.poles.len() - 1;
        if n > 1 {
            n -= 1;
        }
        let (mut y_min, mut y_max) = (first.gy, first.gy);
        for pole in self.poles.iter().take(n).skip(1) {
            y_min = y_min.min(pole.gy);
            y_max = y_max.max(pole.gy);
        }
        self.y_min = y_min;
        self.y_max = y_max;
        self.y_mid = ((y_max as i64 + y_min as i64) / 2) as i32;
    }

    /// Limits hint ranges to existing poles.
    ///
    /// A range may start after the last pole when hints are declared just
    /// before a move that is later discarded.
    pub fn clamp_ranges(&mut self) {
        let Some(last) = self.poles.len().checked_sub(1) else {
            self.ranges.clear();
            for hint in &mut self.hints {
                hint.range_index = None;
            }
            return;
        };
        for range in &mut self.ranges {
            range.beg = range.beg.min(last);
            range.end = range.end.map(|end| end.min(last));
        }
    }

    /// Prepares the accumulated outline for alignment.
    ///
    /// Hints for axes that are not grid fitted are removed, hint ranges are
    /// extended to segment boundaries and moves become on-curve poles.
    pub fn simplify(&mut self, grid_fit_x: bool, grid_fit_y: bool) {
        let len = self.poles.len();
        if len <= 1 {
            return;
        }
        let mut last_pole = len - 1;
        if last_pole > 1 && self.poles[last_pole - 1].kind == PoleKind::ClosePath {
            // Skip the trailing advance pole
            last_pole -= 2;
        }
        if !grid_fit_x || !grid_fit_y {
            self.hints.retain(|hint| match hint.kind {
                HintKind::VStem => grid_fit_x,
                HintKind::HStem => grid_fit_y,
                HintKind::Dot => true,
            });
        }
        let is_off = |poles: &[Pole], i: usize| poles[i].kind == PoleKind::OffCurve;
        for range in &mut self.ranges {
            let mut j = range.beg;
            if self.poles[j].kind == PoleKind::ClosePath {
                range.beg = (j + 1).min(len - 1);
            } else {
                for _ in 0..2 {
                    if j > 0 && is_off(&self.poles, j) {
                        j -= 1;
                        range.beg = j;
                    }
                }
            }
            let mut j = range.end.unwrap_or(last_pole);
            for _ in 0..2 {
                if j + 1 < len && is_off(&self.poles, j) {
                    j += 1;
                }
            }
            range.end = Some(j);
        }
        for &start in &self.contours {
            if let Some(pole) = self.poles.get_mut(start) {
                if pole.kind == PoleKind::MoveTo {
                    pole.kind = PoleKind::OnCurve;
                }
            }
        }
        // Hint commands refer to the last pole before the hint
        // replacement; move them to the start of that segment.
        for r in 0..self.ranges.len() {
            let beg = self.ranges[r].beg;
            let contour_beg = self
                .contours
                .get(self.poles[beg].contour_index)
                .copied()
                .unwrap_or(beg);
            if beg > contour_beg && beg < last_pole {
                let segment_beg = self.segment_beg(beg);
                self.ranges[r].beg = segment_beg;
            }
        }
    }

    /// Type 1 hints declared before the first hint replacement apply to
    /// the whole glyph.
    pub fn extend_primary_ranges(&mut self) {
        if self.hints.is_empty() {
            return;
        }
        let end = self.poles.len().saturating_sub(3);
        let count = self
            .primary_hint_count
            .unwrap_or(self.ranges.len())
            .min(self.ranges.len());
        // Dotsections keep the contour they were declared on
        let mut is_dot = vec![false; self.ranges.len()];
        for hint in self.hints.iter().filter(|hint| hint.kind == HintKind::Dot) {
            let mut next = hint.range_index;
            while let Some(r) = next.filter(|&r| r < is_dot.len() && !is_dot[r]) {
                is_dot[r] = true;
                next = self.ranges[r].next;
            }
        }
        for (range, _) in self.ranges[..count]
            .iter_mut()
            .zip(&is_dot)
            .filter(|(_, is_dot)| !**is_dot)
        {
            range.beg = 0;
            range.end = Some(end);
        }
    }

    /// Closes ranges that are still open at the end of the glyph.
    pub fn close_open_ranges(&mut self) {
        let end = self.poles.len().saturating_sub(2);
        for range in &mut self.ranges {
            if range.end.is_none() {
                range.end = Some(end);
            }
        }
    }

    /// Checks the relationships between poles, contours, hints and ranges
    /// that the alignment passes rely on.
    pub fn validate(&self) -> Result<(), HintError> {
        let len = self.poles.len();
        let contour_count = self.contour_count();
        if self.contours.windows(2).any(|w| w[0] > w[1]) || self.open_contour_start() > len {
            return Err(HintError::Internal("contour starts out of order"));
        }
        if self
            .poles
            .iter()
            .any(|pole| pole.contour_index > contour_count)
        {
            return Err(HintError::Internal("pole refers to a missing contour"));
        }
        for (i, range) in self.ranges.iter().enumerate() {
            let end_ok = matches!(range.end, Some(end) if end < len);
            if range.beg >= len || !end_ok {
                return Err(HintError::Internal("hint range outside of glyph"));
            }
            if matches!(range.next, Some(next) if next >= i) {
                return Err(HintError::Internal("hint range list is not ordered"));
            }
        }
        if self
            .hints
            .iter()
            .any(|hint| matches!(hint.range_index, Some(r) if r >= self.ranges.len()))
        {
            return Err(HintError::Internal("hint refers to a missing range"));
        }
        Ok(())
    }

    /// Iterates over the pole intervals where a hint applies.
    pub fn hint_ranges(&self, hint_index: usize) -> HintRangeIter<'_> {
        HintRangeIter {
            ranges: &self.ranges,
            next: self.hints.get(hint_index).and_then(|hint| hint.range_index),
        }
    }
}

/// Iterator over the `(beg, end)` pole intervals of a hint.
pub(crate) struct HintRangeIter<'a> {
    ranges: &'a [HintRange],
    next: Option<usize>,
}

impl Iterator for HintRangeIter<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let range = self.ranges.get(self.next?)?;
        self.next = range.next;
        Some((range.beg, range.end.unwrap_or(range.beg)))
    }
}
