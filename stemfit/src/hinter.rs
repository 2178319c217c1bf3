//! Accumulation of charstring events into a hintable outline.
//!
//! The [`Hinter`] receives the path and hint events of one glyph from the
//! interpreter. When hinting is active, poles, contours, hints and hint
//! ranges are collected and the outline is grid fitted once the glyph is
//! complete. Otherwise the path is transformed to device space as it
//! arrives.
//!
//! Either way the device path is buffered: the first error aborts the
//! glyph and nothing is produced.

use alloc::vec::Vec;

use read_charstrings::{CharstringKind, CharstringSink, Error as CharstringError, Fixed, Point};

use crate::{
    align,
    error::HintError,
    export::{self, PathWriter},
    flex::{self, FlexShape, FLEX_POLE_COUNT},
    mapping::Mapping,
    options::HintingOptions,
    outline::{Axis, Hint, HintKind, HintRange, Outline, Pole, PoleKind},
    zones::{glyph_coord, FontHints},
};

/// Device space result of hinting one glyph.
#[derive(Clone, Debug)]
pub(crate) struct HintedGlyph {
    pub path: PathWriter,
    /// Advance vector in 24.8 device units.
    pub advance: (i32, i32),
    pub pole_count: usize,
    pub contour_count: usize,
    pub hint_count: usize,
    pub subglyph_count: usize,
    pub grid_fit_x: bool,
    pub grid_fit_y: bool,
}

/// Charstring sink that hints and transforms a single glyph.
pub(crate) struct Hinter<'a> {
    mapping: Mapping,
    font_hints: &'a FontHints,
    kind: CharstringKind,
    flex_threshold_override: Option<i32>,
    /// Transform without collecting an outline.
    pass_through: bool,
    outline: Outline,
    writer: PathWriter,
    /// Current point.
    cx: i32,
    cy: i32,
    /// Start of the current contour.
    bx: i32,
    by: i32,
    /// Side bearing point of the glyph.
    orig: (i32, i32),
    /// Side bearing point of the current seac component.
    subglyph_orig: (i32, i32),
    width: (i32, i32),
    /// Number of buffered flex points, including the point before the
    /// flex.
    flex_count: usize,
    have_flex: bool,
    /// Hints in the order their stems were declared in the current
    /// subglyph, for resolving hint masks.
    stem_order: Vec<usize>,
    subglyph_count: usize,
    error: Option<HintError>,
}

impl<'a> Hinter<'a> {
    pub fn new(
        mapping: Mapping,
        font_hints: &'a FontHints,
        kind: CharstringKind,
        options: &HintingOptions,
    ) -> Self {
        let pass_through = !mapping.hinting;
        Self {
            mapping,
            font_hints,
            kind,
            flex_threshold_override: options.flex_threshold_override,
            pass_through,
            outline: Outline::default(),
            writer: PathWriter::default(),
            cx: 0,
            cy: 0,
            bx: 0,
            by: 0,
            orig: (0, 0),
            subglyph_orig: (0, 0),
            width: (0, 0),
            flex_count: 0,
            have_flex: false,
            stem_order: Vec::new(),
            subglyph_count: 0,
            error: None,
        }
    }

    /// Runs an operation unless an earlier one failed, keeping the first
    /// error.
    fn apply(&mut self, op: impl FnOnce(&mut Self) -> Result<(), HintError>) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = op(self) {
            log::debug!("glyph aborted: {e}");
            self.error = Some(e);
        }
    }

    fn device_point(&self, gx: i32, gy: i32) -> (i32, i32) {
        self.mapping.g2d(gx, gy)
    }

    /// Moves the current point by a vector, returning the new position.
    fn advance_current(&mut self, dx: i32, dy: i32) -> (i32, i32) {
        self.cx = self.cx.wrapping_add(dx);
        self.cy = self.cy.wrapping_add(dy);
        self.mapping.adjust_precision(self.cx, self.cy);
        (self.cx, self.cy)
    }

    fn add_pole(&mut self, dx: i32, dy: i32, kind: PoleKind) -> Result<(), HintError> {
        let (x, y) = self.advance_current(dx, dy);
        let contour_index = self.outline.contour_count();
        self.outline.poles.try_reserve(1)?;
        self.outline
            .poles
            .push(Pole::new(x, y, kind, contour_index));
        Ok(())
    }

    /// Removes the last `count` poles if they coincide with the pole before
    /// them.
    fn skip_degenerate_segment(&mut self, count: usize) {
        let len = self.outline.poles.len();
        if self.outline.open_contour_start() + count >= len {
            return;
        }
        let (cx, cy) = (self.cx, self.cy);
        if self.outline.poles[len - count - 1..len - 1]
            .iter()
            .all(|pole| pole.gx == cx && pole.gy == cy)
        {
            self.outline.poles.truncate(len - count);
        }
    }

    /// Starts a device subpath at the given glyph point unless one is
    /// open.
    fn ensure_subpath(&mut self, gx: i32, gy: i32) -> Result<(), HintError> {
        if !self.writer.has_subpath() {
            let start = self.device_point(gx, gy);
            self.writer.move_to(start)?;
        }
        Ok(())
    }

    fn set_metrics(&mut self, side_bearing: (i32, i32), width: (i32, i32)) {
        self.mapping.adjust_precision(side_bearing.0, side_bearing.1);
        self.mapping.adjust_precision(width.0, width.1);
        (self.cx, self.cy) = side_bearing;
        self.orig = side_bearing;
        self.subglyph_orig = side_bearing;
        self.width = width;
    }

    fn start_subglyph(&mut self, offset: (i32, i32)) {
        self.mapping.adjust_precision(offset.0, offset.1);
        self.subglyph_orig = (
            self.orig.0.wrapping_add(offset.0),
            self.orig.1.wrapping_add(offset.1),
        );
        (self.cx, self.cy) = self.subglyph_orig;
    }

    fn move_to(&mut self, dx: i32, dy: i32) -> Result<(), HintError> {
        if self.flex_count == 0 {
            if self.pass_through {
                let (x, y) = self.advance_current(dx, dy);
                (self.bx, self.by) = (x, y);
                let point = self.device_point(x, y);
                return self.writer.move_to(point);
            }
            if self.outline.last_pole_kind() == Some(PoleKind::MoveTo) {
                // Only the last of consecutive moves starts a contour
                self.outline.poles.pop();
            }
            if matches!(self.outline.last_pole_kind(), Some(kind) if kind != PoleKind::ClosePath) {
                self.close_contour()?;
            }
            if !self.have_flex {
                flex::fix_missed_flex(
                    &mut self.outline,
                    self.mapping.pixel_gw,
                    self.mapping.pixel_gh,
                );
            }
        }
        self.add_pole(dx, dy, PoleKind::MoveTo)?;
        if self.flex_count == 0 {
            (self.bx, self.by) = (self.cx, self.cy);
        }
        Ok(())
    }

    fn line_to(&mut self, dx: i32, dy: i32) -> Result<(), HintError> {
        if self.pass_through {
            self.ensure_subpath(self.cx, self.cy)?;
            let (x, y) = self.advance_current(dx, dy);
            let point = self.device_point(x, y);
            return self.writer.line_to(point);
        }
        self.add_pole(dx, dy, PoleKind::OnCurve)?;
        self.skip_degenerate_segment(1);
        Ok(())
    }

    fn curve_to(&mut self, deltas: [(i32, i32); 3]) -> Result<(), HintError> {
        if self.pass_through {
            self.ensure_subpath(self.cx, self.cy)?;
            let mut points = [(0, 0); 3];
            for (point, (dx, dy)) in points.iter_mut().zip(deltas) {
                let (x, y) = self.advance_current(dx, dy);
                *point = self.device_point(x, y);
            }
            return self.writer.curve_to(points[0], points[1], points[2]);
        }
        let [d0, d1, d2] = deltas;
        self.add_pole(d0.0, d0.1, PoleKind::OffCurve)?;
        self.add_pole(d1.0, d1.1, PoleKind::OffCurve)?;
        self.add_pole(d2.0, d2.1, PoleKind::OnCurve)?;
        self.skip_degenerate_segment(3);
        Ok(())
    }

    fn close_path(&mut self) -> Result<(), HintError> {
        if self.pass_through {
            return self.writer.close();
        }
        self.close_contour()
    }

    /// Ends the contour being built with a closing pole at its start.
    fn close_contour(&mut self) -> Result<(), HintError> {
        let contour_beg = self.outline.open_contour_start();
        let len = self.outline.poles.len();
        if contour_beg >= len {
            return Ok(());
        }
        if len == contour_beg + 1 && self.outline.poles[contour_beg].kind == PoleKind::MoveTo {
            // Nothing was drawn since the move
            return Ok(());
        }
        if (self.bx, self.by) == (self.cx, self.cy) {
            if let Some(last) = self.outline.poles.last_mut() {
                last.kind = PoleKind::ClosePath;
            }
        } else {
            let (cx, cy) = (self.cx, self.cy);
            self.add_pole(self.bx.wrapping_sub(cx), self.by.wrapping_sub(cy), PoleKind::ClosePath)?;
            (self.cx, self.cy) = (cx, cy);
        }
        self.outline.contours.try_reserve(1)?;
        self.outline.contours.push(self.outline.poles.len());
        Ok(())
    }

    fn flex_begin(&mut self) -> Result<(), HintError> {
        if self.flex_count != 0 {
            return Err(CharstringError::InvalidFlexSequence.into());
        }
        self.flex_count = 1;
        self.have_flex = true;
        if self.pass_through {
            // Buffer the point before the flex
            self.move_to(0, 0)?;
        }
        Ok(())
    }

    fn flex_point(&mut self) -> Result<(), HintError> {
        if self.flex_count == 0 || self.flex_count >= FLEX_POLE_COUNT {
            return Err(CharstringError::InvalidFlexSequence.into());
        }
        self.flex_count += 1;
        Ok(())
    }

    fn flex_end(&mut self, height: Fixed) -> Result<(), HintError> {
        if self.flex_count != FLEX_POLE_COUNT {
            return Err(CharstringError::InvalidFlexSequence.into());
        }
        let height = self
            .flex_threshold_override
            .map_or(height.to_f64(), f64::from);
        let shape = flex::flex_shape(&self.outline, &self.mapping, height)
            .ok_or(HintError::Internal("flex points missing"))?;
        log::trace!("flex drawn as {shape:?}");
        if self.pass_through {
            let poles = &self.outline.poles;
            let pole0 = poles.len() - FLEX_POLE_COUNT;
            let mut points = [(0, 0); FLEX_POLE_COUNT];
            for (point, pole) in points.iter_mut().zip(&poles[pole0..]) {
                *point = self.mapping.g2d(pole.gx, pole.gy);
            }
            let (gx, gy) = (poles[pole0].gx, poles[pole0].gy);
            self.ensure_subpath(gx, gy)?;
            match shape {
                FlexShape::Curves => {
                    self.writer.curve_to(points[2], points[3], points[4])?;
                    self.writer.curve_to(points[5], points[6], points[7])?;
                }
                FlexShape::Line => self.writer.line_to(points[7])?,
            }
            self.outline.poles.clear();
        } else {
            flex::collapse_flex(&mut self.outline, shape);
        }
        self.flex_count = 0;
        Ok(())
    }

    /// Draws a Type 2 flex as two curves, or as a line when the joining
    /// point is closer to the chord than `depth` device pixels.
    fn flex2(&mut self, args: [Fixed; 12], depth: Fixed) -> Result<(), HintError> {
        let d = args.map(glyph_coord);
        let sum = |indices: [usize; 3]| {
            indices
                .iter()
                .fold(0i32, |acc, &i| acc.wrapping_add(d[i]))
        };
        let (jx, jy) = (sum([0, 2, 4]), sum([1, 3, 5]));
        let (ex, ey) = (
            jx.wrapping_add(sum([6, 8, 10])),
            jy.wrapping_add(sum([7, 9, 11])),
        );
        let (jx, jy) = self.mapping.g2d_dist(jx, jy);
        let (ex_d, ey_d) = self.mapping.g2d_dist(ex, ey);
        let deviation = if ex_d.abs() >= ey_d.abs() {
            chord_deviation(jx, jy, ex_d, ey_d)
        } else {
            chord_deviation(jy, jx, ey_d, ex_d)
        };
        // 16.16 pixels to 24.8 device units
        let threshold = (depth.to_bits() >> 8) as i64;
        if deviation.abs() < threshold {
            self.line_to(ex, ey)
        } else {
            self.curve_to([(d[0], d[1]), (d[2], d[3]), (d[4], d[5])])?;
            self.curve_to([(d[6], d[7]), (d[8], d[9]), (d[10], d[11])])
        }
    }

    fn add_stem(&mut self, kind: HintKind, v0: i32, v1: i32, stem3_index: u8) -> Result<(), HintError> {
        if self.pass_through {
            return Ok(());
        }
        let s = match kind.axis() {
            Axis::X => self.subglyph_orig.0,
            Axis::Y => self.subglyph_orig.1,
        };
        let g0 = s.wrapping_add(v0);
        let g1 = g0.wrapping_add(v1);
        self.mapping.adjust_precision(g0, g1);
        let outline = &mut self.outline;
        let existing = outline
            .hints
            .iter()
            .position(|hint| hint.kind == kind && hint.g0 == g0 && hint.g1 == g1);
        let index = match existing {
            Some(index) => index,
            None => {
                outline.hints.try_reserve(1)?;
                outline.hints.push(Hint::new(kind, g0, g1, stem3_index));
                outline.hints.len() - 1
            }
        };
        let hint = &mut outline.hints[index];
        let is_active = hint
            .range_index
            .is_some_and(|r| outline.ranges[r].end.is_none());
        if !is_active {
            outline.ranges.try_reserve(1)?;
            outline.ranges.push(HintRange {
                beg: outline.poles.len(),
                end: None,
                next: hint.range_index,
            });
            hint.range_index = Some(outline.ranges.len() - 1);
        }
        if kind.is_stem() {
            self.stem_order.try_reserve(1)?;
            self.stem_order.push(index);
        }
        Ok(())
    }

    fn activate_hint(&mut self, index: usize) -> Result<(), HintError> {
        let outline = &mut self.outline;
        let pc = outline.poles.len();
        let hint = &mut outline.hints[index];
        if let Some(r) = hint.range_index {
            let range = &mut outline.ranges[r];
            if range.end.map_or(true, |end| end == pc) {
                range.end = None;
                return Ok(());
            }
        }
        outline.ranges.try_reserve(1)?;
        outline.ranges.push(HintRange {
            beg: pc,
            end: None,
            next: hint.range_index,
        });
        hint.range_index = Some(outline.ranges.len() - 1);
        Ok(())
    }

    fn deactivate_hint(&mut self, index: usize) {
        let pc = self.outline.poles.len();
        if let Some(r) = self.outline.hints[index].range_index {
            let range = &mut self.outline.ranges[r];
            if range.end.is_none() {
                range.end = Some(pc);
            }
        }
    }

    /// Applies a hint mask. Bit `i` refers to the `i`th stem of the
    /// current subglyph.
    fn apply_hint_mask(&mut self, mask: &[u8]) -> Result<(), HintError> {
        if self.pass_through {
            return Ok(());
        }
        for i in 0..self.stem_order.len() {
            let index = self.stem_order[i];
            let active = mask
                .get(i / 8)
                .is_some_and(|byte| byte & (0x80 >> (i % 8)) != 0);
            if active {
                self.activate_hint(index)?;
            } else {
                self.deactivate_hint(index);
            }
        }
        Ok(())
    }

    /// Type 1 hint replacement: all hints become inactive until declared
    /// again.
    fn drop_hints(&mut self) {
        if self.pass_through {
            return;
        }
        if self.outline.primary_hint_count.is_none() {
            self.outline.primary_hint_count = Some(self.outline.ranges.len());
        }
        for index in 0..self.outline.hints.len() {
            self.deactivate_hint(index);
        }
    }

    fn dotsection(&mut self) -> Result<(), HintError> {
        // Only the dotsection that starts a contour is recorded
        if self.outline.last_pole_kind() != Some(PoleKind::MoveTo) {
            return Ok(());
        }
        self.add_stem(HintKind::Dot, 0, 0, 0)
    }

    fn end_subglyph(&mut self) {
        self.subglyph_count += 1;
        let pc = self.outline.poles.len();
        for range in &mut self.outline.ranges {
            if range.end.is_none() {
                range.end = Some(pc);
            }
        }
        self.stem_order.clear();
    }

    /// Completes the glyph: appends the advance pole, fits the outline to
    /// the grid and produces the device path.
    pub fn finish(mut self) -> Result<HintedGlyph, HintError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        if self.flex_count != 0 {
            return Err(CharstringError::InvalidFlexSequence.into());
        }
        let (dx, dy) = (
            self.width.0.wrapping_sub(self.cx),
            self.width.1.wrapping_sub(self.cy),
        );
        self.move_to(dx, dy)?;
        self.end_subglyph();
        self.mapping.adjust_precision(self.orig.0, self.orig.1);
        let (grid_fit_x, grid_fit_y) = (self.mapping.grid_fit_x, self.mapping.grid_fit_y);
        let advance = if self.pass_through {
            let (x, y) = self.mapping.g2d(self.width.0, self.width.1);
            (
                x.wrapping_sub(self.mapping.orig_dx),
                y.wrapping_sub(self.mapping.orig_dy),
            )
        } else {
            let outline = &mut self.outline;
            outline.compute_y_span();
            outline.clamp_ranges();
            outline.simplify(grid_fit_x, grid_fit_y);
            outline.validate()?;
            if (grid_fit_x || grid_fit_y) && outline.contour_count() > 0 {
                match self.kind {
                    CharstringKind::Type1 => outline.extend_primary_ranges(),
                    CharstringKind::Type2 => outline.close_open_ranges(),
                }
                log::trace!(
                    "aligning {} poles with {} hints",
                    outline.poles.len(),
                    outline.hints.len()
                );
                align::align_outline(outline, &self.mapping, self.font_hints)?;
            }
            export::export_outline(outline, &self.mapping, &mut self.writer)?;
            export::outline_advance(outline, &self.mapping).unwrap_or_default()
        };
        let glyph = HintedGlyph {
            path: self.writer,
            advance,
            pole_count: self.outline.poles.len(),
            contour_count: self.outline.contour_count(),
            hint_count: self.outline.hints.len(),
            subglyph_count: self.subglyph_count,
            grid_fit_x: grid_fit_x && !self.pass_through,
            grid_fit_y: grid_fit_y && !self.pass_through,
        };
        log::debug!(
            "glyph of {} poles, {} contours, {} hints, grid fit x: {}, y: {}",
            glyph.pole_count,
            glyph.contour_count,
            glyph.hint_count,
            glyph.grid_fit_x,
            glyph.grid_fit_y
        );
        Ok(glyph)
    }
}

/// Distance along the minor axis from the joining point of a flex to the
/// chord through its end point.
fn chord_deviation(join_major: i32, join_minor: i32, end_major: i32, end_minor: i32) -> i64 {
    let (jm, jn) = (join_major as i64, join_minor as i64);
    let (em, en) = (end_major as i64, end_minor as i64);
    if em == 0 {
        jn
    } else {
        jn - en * jm / em
    }
}

fn point_coords(point: Point<Fixed>) -> (i32, i32) {
    (glyph_coord(point.x), glyph_coord(point.y))
}

impl CharstringSink for Hinter<'_> {
    fn sbw(&mut self, side_bearing: Point<Fixed>, width: Point<Fixed>) {
        self.apply(|h| {
            h.set_metrics(point_coords(side_bearing), point_coords(width));
            Ok(())
        });
    }

    fn sbw_seac(&mut self, offset: Point<Fixed>) {
        self.apply(|h| {
            h.start_subglyph(point_coords(offset));
            Ok(())
        });
    }

    fn rmoveto(&mut self, dx: Fixed, dy: Fixed) {
        self.apply(|h| h.move_to(glyph_coord(dx), glyph_coord(dy)));
    }

    fn rlineto(&mut self, dx: Fixed, dy: Fixed) {
        self.apply(|h| h.line_to(glyph_coord(dx), glyph_coord(dy)));
    }

    fn rcurveto(&mut self, dx1: Fixed, dy1: Fixed, dx2: Fixed, dy2: Fixed, dx3: Fixed, dy3: Fixed) {
        let deltas = [(dx1, dy1), (dx2, dy2), (dx3, dy3)]
            .map(|(dx, dy)| (glyph_coord(dx), glyph_coord(dy)));
        self.apply(|h| h.curve_to(deltas));
    }

    fn closepath(&mut self) {
        self.apply(|h| h.close_path());
    }

    fn set_current_point(&mut self, x: Fixed, y: Fixed) {
        self.apply(|h| {
            (h.cx, h.cy) = (glyph_coord(x), glyph_coord(y));
            Ok(())
        });
    }

    fn hstem(&mut self, y: Fixed, dy: Fixed) {
        self.apply(|h| h.add_stem(HintKind::HStem, glyph_coord(y), glyph_coord(dy), 0));
    }

    fn vstem(&mut self, x: Fixed, dx: Fixed) {
        self.apply(|h| h.add_stem(HintKind::VStem, glyph_coord(x), glyph_coord(dx), 0));
    }

    fn hstem3(&mut self, stems: [(Fixed, Fixed); 3]) {
        for (i, (y, dy)) in stems.into_iter().enumerate() {
            self.apply(|h| {
                h.add_stem(HintKind::HStem, glyph_coord(y), glyph_coord(dy), i as u8 + 1)
            });
        }
    }

    fn vstem3(&mut self, stems: [(Fixed, Fixed); 3]) {
        for (i, (x, dx)) in stems.into_iter().enumerate() {
            self.apply(|h| {
                h.add_stem(HintKind::VStem, glyph_coord(x), glyph_coord(dx), i as u8 + 1)
            });
        }
    }

    fn hint_mask(&mut self, mask: &[u8]) {
        self.apply(|h| h.apply_hint_mask(mask));
    }

    fn replace_hints(&mut self) {
        self.apply(|h| {
            h.drop_hints();
            Ok(())
        });
    }

    fn dotsection(&mut self) {
        self.apply(|h| h.dotsection());
    }

    fn flex_begin(&mut self) {
        self.apply(|h| h.flex_begin());
    }

    fn flex_point(&mut self) {
        self.apply(|h| h.flex_point());
    }

    fn flex_end(&mut self, height: Fixed) {
        self.apply(|h| h.flex_end(height));
    }

    fn flex(&mut self, args: [Fixed; 12], depth: Fixed) {
        self.apply(|h| h.flex2(args, depth));
    }

    fn end_subglyph(&mut self) {
        self.apply(|h| {
            h.end_subglyph();
            Ok(())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::DeviceSetup;
    use ps_types::PathElement;
    use pretty_assertions::assert_eq;

    fn fx(value: i32) -> Fixed {
        Fixed::from_i32(value)
    }

    fn pt(x: i32, y: i32) -> Point<Fixed> {
        Point::new(fx(x), fx(y))
    }

    fn hinter<'a>(
        hints: &'a FontHints,
        ppem: f64,
        options: &HintingOptions,
        kind: CharstringKind,
    ) -> Hinter<'a> {
        let mapping = Mapping::new(&DeviceSetup::from_ppem(1000, ppem), options);
        Hinter::new(mapping, hints, kind, options)
    }

    /// Draws a 100 unit square at (10, 10).
    fn square(sink: &mut impl CharstringSink) {
        sink.sbw(pt(0, 0), pt(500, 0));
        sink.rmoveto(fx(10), fx(10));
        sink.rlineto(fx(100), fx(0));
        sink.rlineto(fx(0), fx(100));
        sink.rlineto(fx(-100), fx(0));
        sink.closepath();
    }

    fn square_path() -> Vec<PathElement> {
        vec![
            PathElement::MoveTo { x: 10.0, y: 10.0 },
            PathElement::LineTo { x: 110.0, y: 10.0 },
            PathElement::LineTo { x: 110.0, y: 110.0 },
            PathElement::LineTo { x: 10.0, y: 110.0 },
            PathElement::Close,
        ]
    }

    #[test]
    fn pass_through_square() {
        let hints = FontHints::default();
        let options = HintingOptions::unhinted();
        let mut sink = hinter(&hints, 1000.0, &options, CharstringKind::Type1);
        square(&mut sink);
        let glyph = sink.finish().unwrap();
        assert_eq!(glyph.path.elements(), square_path());
        assert_eq!(glyph.advance, (500 << 8, 0));
        assert_eq!(glyph.pole_count, 0);
        assert!(!glyph.grid_fit_x);
    }

    #[test]
    fn hinted_square_on_grid_is_unchanged() {
        let _ = env_logger::builder().is_test(true).try_init();
        let hints = FontHints::default();
        let options = HintingOptions::default();
        let mut sink = hinter(&hints, 1000.0, &options, CharstringKind::Type1);
        square(&mut sink);
        let glyph = sink.finish().unwrap();
        assert_eq!(glyph.path.elements(), square_path());
        assert_eq!(glyph.advance, (500 << 8, 0));
        // Four corners, the close and the advance
        assert_eq!(glyph.pole_count, 6);
        assert_eq!(glyph.contour_count, 1);
        assert!(glyph.grid_fit_x && glyph.grid_fit_y);
    }

    #[test]
    fn degenerate_segments_are_skipped() {
        let hints = FontHints::default();
        let options = HintingOptions::default();
        let mut sink = hinter(&hints, 1000.0, &options, CharstringKind::Type1);
        sink.sbw(pt(0, 0), pt(500, 0));
        sink.rmoveto(fx(10), fx(10));
        sink.rlineto(fx(0), fx(0));
        sink.rlineto(fx(100), fx(0));
        sink.rcurveto(fx(0), fx(0), fx(0), fx(0), fx(0), fx(0));
        sink.rlineto(fx(0), fx(100));
        sink.closepath();
        let glyph = sink.finish().unwrap();
        assert_eq!(glyph.pole_count, 5);
        assert_eq!(glyph.path.elements().len(), 4);
    }

    #[test]
    fn consecutive_moves_collapse() {
        let hints = FontHints::default();
        let options = HintingOptions::default();
        let mut sink = hinter(&hints, 1000.0, &options, CharstringKind::Type2);
        sink.sbw(pt(0, 0), pt(500, 0));
        sink.rmoveto(fx(50), fx(50));
        sink.rmoveto(fx(-40), fx(-40));
        sink.rlineto(fx(100), fx(0));
        sink.rlineto(fx(0), fx(100));
        sink.rlineto(fx(-100), fx(0));
        // Type 2 contours are closed by the next move
        let glyph = sink.finish().unwrap();
        assert_eq!(glyph.path.elements(), square_path());
    }

    #[test]
    fn hint_mask_selects_declared_stems() {
        let hints = FontHints::default();
        let options = HintingOptions::default();
        let mut sink = hinter(&hints, 1000.0, &options, CharstringKind::Type2);
        sink.sbw(pt(0, 0), pt(500, 0));
        sink.hstem(fx(0), fx(50));
        sink.hstem(fx(100), fx(50));
        // Same boundaries as the first stem
        sink.hstem(fx(0), fx(50));
        sink.hint_mask(&[0x40]);
        let outline = &sink.outline;
        assert_eq!(outline.hints.len(), 2);
        assert_eq!(outline.ranges.len(), 2);
        assert_eq!(sink.stem_order, [0, 1, 0]);
        // Neither bit of the first stem is set
        let first = outline.hints[0].range_index.unwrap();
        assert_eq!(outline.ranges[first].end, Some(0));
        let second = outline.hints[1].range_index.unwrap();
        assert_eq!(outline.ranges[second].end, None);
    }

    #[test]
    fn hint_replacement_records_primary_ranges() {
        let hints = FontHints::default();
        let options = HintingOptions::default();
        let mut sink = hinter(&hints, 1000.0, &options, CharstringKind::Type1);
        square(&mut sink);
        sink.vstem(fx(10), fx(20));
        sink.replace_hints();
        sink.vstem(fx(90), fx(20));
        assert_eq!(sink.outline.primary_hint_count, Some(1));
        assert_eq!(sink.outline.ranges[0].end, Some(5));
        assert_eq!(sink.outline.ranges[1].end, None);
    }

    #[test]
    fn stems_are_relative_to_the_subglyph() {
        let hints = FontHints::default();
        let options = HintingOptions::default();
        let mut sink = hinter(&hints, 1000.0, &options, CharstringKind::Type1);
        sink.sbw(pt(40, 0), pt(500, 0));
        sink.vstem(fx(0), fx(80));
        sink.end_subglyph();
        sink.sbw_seac(pt(200, 300));
        sink.hstem(fx(10), fx(20));
        let hints = &sink.outline.hints;
        assert_eq!((hints[0].g0, hints[0].g1), (40 << 8, 120 << 8));
        assert_eq!((hints[1].g0, hints[1].g1), (310 << 8, 330 << 8));
        assert_eq!((sink.cx, sink.cy), (240 << 8, 300 << 8));
        assert!(sink.stem_order.len() == 1 && sink.subglyph_count == 1);
    }

    #[test]
    fn errors_are_sticky() {
        let hints = FontHints::default();
        let options = HintingOptions::default();
        let mut sink = hinter(&hints, 1000.0, &options, CharstringKind::Type1);
        square(&mut sink);
        sink.flex_point();
        sink.rlineto(fx(10), fx(10));
        assert_eq!(
            sink.finish().unwrap_err(),
            HintError::InvalidFont(CharstringError::InvalidFlexSequence)
        );
    }

    /// Feeds a Type 1 flex from the current point (0, 0) to (60, 0) whose
    /// joining point lies `depth` units below the chord.
    fn type1_flex(sink: &mut impl CharstringSink, depth: i32) {
        sink.flex_begin();
        // Reference point, then the points of both curves
        let deltas = [
            (30, 0),
            (-20, 0),
            (10, -depth),
            (10, 0),
            (10, 0),
            (10, depth),
            (10, 0),
        ];
        for (dx, dy) in deltas {
            sink.rmoveto(fx(dx), fx(dy));
            sink.flex_point();
        }
        sink.flex_end(fx(50));
        sink.set_current_point(fx(60), fx(0));
    }

    #[test]
    fn type1_flex_pass_through() {
        let hints = FontHints::default();
        let options = HintingOptions::unhinted();
        for (ppem, expected_curves) in [(10.0, 0), (1000.0, 2)] {
            let mut sink = hinter(&hints, ppem, &options, CharstringKind::Type1);
            sink.sbw(pt(0, 0), pt(100, 0));
            sink.rmoveto(fx(0), fx(0));
            type1_flex(&mut sink, 5);
            sink.rlineto(fx(0), fx(100));
            sink.closepath();
            let glyph = sink.finish().unwrap();
            let elements = glyph.path.elements();
            let curves = elements
                .iter()
                .filter(|e| matches!(e, PathElement::CurveTo { .. }))
                .count();
            assert_eq!(curves, expected_curves, "at {ppem} ppem");
            assert!(matches!(elements[0], PathElement::MoveTo { .. }));
        }
    }

    #[test]
    fn type1_flex_hinted_collapses_to_line() {
        let hints = FontHints::default();
        let options = HintingOptions::default();
        let mut sink = hinter(&hints, 10.0, &options, CharstringKind::Type1);
        sink.sbw(pt(0, 0), pt(100, 0));
        sink.rmoveto(fx(0), fx(0));
        type1_flex(&mut sink, 5);
        // Move, the line replacing the flex
        assert_eq!(sink.outline.poles.len(), 2);
        assert_eq!(sink.outline.poles[1].kind, PoleKind::OnCurve);
        assert_eq!(sink.outline.poles[1].gx, 60 << 8);
        assert_eq!((sink.cx, sink.cy), (60 << 8, 0));
    }

    #[test]
    fn type2_flex_depth() {
        let hints = FontHints::default();
        let options = HintingOptions::unhinted();
        // A unit is a tenth of a pixel
        for (depth, expected) in [(3, 1), (10, 2)] {
            let mut sink = hinter(&hints, 100.0, &options, CharstringKind::Type2);
            sink.sbw(pt(0, 0), pt(100, 0));
            sink.rmoveto(fx(0), fx(0));
            let args = [10, 0, 10, -depth, 10, 0, 10, 0, 10, depth, 10, 0].map(fx);
            sink.flex(args, Fixed::HALF);
            let glyph = sink.finish().unwrap();
            // Move, segments and the close from the final move
            assert_eq!(glyph.path.elements().len(), 2 + expected, "depth {depth}");
        }
    }
}
