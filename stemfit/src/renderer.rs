//! Rendering of hinted glyph outlines.

use ps_types::{BoundingBox, Pen, Point};
use read_charstrings::{CharstringSource, Interpreter, Progress, SideBearingWidth};

use crate::{
    error::HintError,
    export::device_to_f32,
    hinter::Hinter,
    mapping::Mapping,
    options::HintingOptions,
    transform::DeviceSetup,
    zones::FontHints,
};

/// Produces device space outlines for the glyphs of a single font at a
/// fixed size and transform.
///
/// The alignment zones and stem snap tables of the font are computed once
/// at construction and shared by every glyph rendered afterwards.
///
/// # Example
///
/// ```
/// use read_charstrings::{CharstringFont, CharstringKind, PrivateDict};
/// use stemfit::{DeviceSetup, GlyphRenderer, HintingOptions, PathElement};
///
/// let mut dict = PrivateDict::default();
/// // plain, unencrypted charstrings
/// dict.len_iv = -1;
/// let font = CharstringFont::new(CharstringKind::Type1, dict);
/// let setup = DeviceSetup::from_ppem(1000, 16.0);
/// let renderer = GlyphRenderer::new(&font, &setup, &HintingOptions::default()).unwrap();
/// // 0 500 hsbw endchar
/// let charstring = [139, 248, 136, 13, 14];
/// let mut path: Vec<PathElement> = Vec::new();
/// let output = renderer.render(&charstring, &mut path).unwrap();
/// assert!(path.is_empty());
/// assert_eq!(output.control_box, None);
/// assert!((output.advance.x - 8.0).abs() < 0.01);
/// ```
#[derive(Clone, Debug)]
pub struct GlyphRenderer<'a, F> {
    font: &'a F,
    mapping: Mapping,
    font_hints: FontHints,
    options: HintingOptions,
}

impl<'a, F: CharstringSource> GlyphRenderer<'a, F> {
    /// Creates a new renderer for the given font, device and options.
    ///
    /// Hinting is silently disabled when the glyph transform is degenerate
    /// or the glyph scale is too small or too large to be usefully fitted.
    pub fn new(
        font: &'a F,
        setup: &DeviceSetup,
        options: &HintingOptions,
    ) -> Result<Self, HintError> {
        let mut mapping = Mapping::new(setup, options);
        let font_hints = if mapping.hinting {
            FontHints::new(font.private_dict(), &mut mapping)?
        } else {
            FontHints::default()
        };
        Ok(Self {
            font,
            mapping,
            font_hints,
            options: *options,
        })
    }

    /// Returns true if glyphs will be fitted to the device grid.
    pub fn is_hinting(&self) -> bool {
        self.mapping.hinting
    }

    /// Evaluates a charstring and writes the resulting outline to `pen`.
    ///
    /// The path is only written once the glyph has been completely
    /// processed. On error, nothing is written.
    pub fn render(
        &self,
        charstring: &[u8],
        pen: &mut impl Pen,
    ) -> Result<GlyphOutput, HintError> {
        self.render_with_width(charstring, None, pen)
    }

    /// Evaluates a charstring, replacing the side bearing and advance width
    /// it specifies with `width` when provided.
    ///
    /// This supports the metrics overrides of a `Metrics` dictionary or
    /// of the `hmtx` table.
    pub fn render_with_width(
        &self,
        charstring: &[u8],
        width: Option<SideBearingWidth>,
        pen: &mut impl Pen,
    ) -> Result<GlyphOutput, HintError> {
        let mut hinter = Hinter::new(
            self.mapping.clone(),
            &self.font_hints,
            self.font.kind(),
            &self.options,
        );
        let mut interpreter = Interpreter::new(self.font, charstring);
        while let Progress::NeedWidth(_) = interpreter.run(&mut hinter)? {
            if let Some(width) = width {
                interpreter.set_width(width);
            }
        }
        let glyph = hinter.finish()?;
        glyph.path.replay(pen);
        Ok(GlyphOutput {
            advance: Point::new(device_to_f32(glyph.advance.0), device_to_f32(glyph.advance.1)),
            control_box: glyph.path.control_box(),
            stats: GlyphStats {
                poles: glyph.pole_count,
                contours: glyph.contour_count,
                hints: glyph.hint_count,
                subglyphs: glyph.subglyph_count,
                font_size: self.mapping.font_size,
                resolution: self.mapping.resolution,
                grid_fit_x: glyph.grid_fit_x,
                grid_fit_y: glyph.grid_fit_y,
            },
        })
    }
}

/// Result of rendering a glyph.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlyphOutput {
    /// Advance vector in device pixels.
    pub advance: Point<f32>,
    /// Extents of the points of the emitted path in device pixels, or
    /// `None` for an empty glyph.
    pub control_box: Option<BoundingBox<f32>>,
    pub stats: GlyphStats,
}

/// Diagnostic counters describing the work done for a glyph.
#[derive(Copy, Clone, PartialEq, Default, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlyphStats {
    /// Number of outline points collected for grid fitting. Zero when
    /// hinting is disabled.
    pub poles: usize,
    pub contours: usize,
    /// Number of distinct stem hints.
    pub hints: usize,
    /// Number of subglyphs: one for a simple glyph, two for an accented
    /// glyph built with `seac`.
    pub subglyphs: usize,
    /// Effective font size in pixels.
    pub font_size: f64,
    /// Device resolution relative to the font size.
    pub resolution: f64,
    pub grid_fit_x: bool,
    pub grid_fit_y: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::CharstringError, transform::Transform};
    use font_test_data::{
        charstring::{assemble_type1, assemble_type2},
        private, type1, type2, GlyphSource,
    };
    use kurbo::{BezPath, Rect, Shape};
    use ps_types::PathElement;
    use read_charstrings::{
        Blues, CharstringFont, CharstringKind, Fixed, PrivateDict, StemSnaps,
    };

    /// Pen that builds a kurbo path.
    #[derive(Default)]
    struct BezPen(BezPath);

    impl Pen for BezPen {
        fn move_to(&mut self, x: f32, y: f32) {
            self.0.move_to((x as f64, y as f64));
        }

        fn line_to(&mut self, x: f32, y: f32) {
            self.0.line_to((x as f64, y as f64));
        }

        fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
            self.0.curve_to(
                (cx0 as f64, cy0 as f64),
                (cx1 as f64, cy1 as f64),
                (x as f64, y as f64),
            );
        }

        fn close(&mut self) {
            self.0.close_path();
        }
    }

    fn private_dict() -> PrivateDict {
        let fx = |v: i32| Fixed::from_i32(v);
        PrivateDict {
            blue_values: Blues::from_i32s(private::BLUE_VALUES),
            other_blues: Blues::from_i32s(private::OTHER_BLUES),
            family_blues: Blues::from_i32s(private::FAMILY_BLUES),
            family_other_blues: Blues::from_i32s(private::FAMILY_OTHER_BLUES),
            blue_scale: Fixed::from_f64(private::BLUE_SCALE),
            blue_shift: fx(private::BLUE_SHIFT),
            blue_fuzz: fx(private::BLUE_FUZZ),
            std_hw: Some(fx(private::STD_HW)),
            std_vw: Some(fx(private::STD_VW)),
            stem_snap_h: StemSnaps::from_i32s(private::STEM_SNAP_H),
            stem_snap_v: StemSnaps::from_i32s(private::STEM_SNAP_V),
            len_iv: -1,
            default_width_x: fx(private::DEFAULT_WIDTH_X),
            nominal_width_x: fx(private::NOMINAL_WIDTH_X),
            ..Default::default()
        }
    }

    fn type1_font() -> CharstringFont {
        let mut font = CharstringFont::new(CharstringKind::Type1, private_dict())
            .with_subrs(type1::SUBRS.iter().map(|s| assemble_type1(s)).collect());
        for glyph in [&type1::H, &type1::ACUTE] {
            font = font.with_seac_component(glyph.code, assemble_type1(glyph.source));
        }
        font
    }

    fn type2_font() -> CharstringFont {
        let mut font = CharstringFont::new(CharstringKind::Type2, private_dict())
            .with_subrs(type2::SUBRS.iter().map(|s| assemble_type2(s)).collect())
            .with_global_subrs(type2::GLOBAL_SUBRS.iter().map(|s| assemble_type2(s)).collect());
        for glyph in [&type2::H, &type2::ACUTE] {
            font = font.with_seac_component(glyph.code, assemble_type2(glyph.source));
        }
        font
    }

    fn assemble(font: &CharstringFont, glyph: &GlyphSource) -> Vec<u8> {
        match font.kind() {
            CharstringKind::Type1 => assemble_type1(glyph.source),
            CharstringKind::Type2 => assemble_type2(glyph.source),
        }
    }

    fn render_path(
        font: &CharstringFont,
        glyph: &GlyphSource,
        ppem: f64,
        options: &HintingOptions,
    ) -> (Vec<PathElement>, GlyphOutput) {
        let setup = DeviceSetup::from_ppem(1000, ppem);
        let renderer = GlyphRenderer::new(font, &setup, options).unwrap();
        let mut path = Vec::new();
        let output = renderer.render(&assemble(font, glyph), &mut path).unwrap();
        (path, output)
    }

    fn bounds(path: &[PathElement]) -> Rect {
        let mut pen = BezPen::default();
        for element in path {
            element.apply(&mut pen);
        }
        pen.0.bounding_box()
    }

    fn curve_count(path: &[PathElement]) -> usize {
        path.iter()
            .filter(|element| matches!(element, PathElement::CurveTo { .. }))
            .count()
    }

    /// All end point x coordinates of a path.
    fn x_coords(path: &[PathElement]) -> Vec<f32> {
        path.iter()
            .filter_map(|element| match *element {
                PathElement::MoveTo { x, .. }
                | PathElement::LineTo { x, .. }
                | PathElement::CurveTo { x, .. } => Some(x),
                PathElement::Close => None,
            })
            .collect()
    }

    fn assert_near(actual: Rect, expected: Rect) {
        let diffs = [
            actual.x0 - expected.x0,
            actual.y0 - expected.y0,
            actual.x1 - expected.x1,
            actual.y1 - expected.y1,
        ];
        assert!(
            diffs.iter().all(|d| d.abs() <= 1.0 / 64.0),
            "{actual:?} != {expected:?}"
        );
    }

    fn assert_advance(output: &GlyphOutput, x: f32) {
        assert!(
            (output.advance.x - x).abs() <= 1.0 / 64.0 && output.advance.y.abs() <= 1.0 / 64.0,
            "{:?}",
            output.advance
        );
    }

    fn assert_integral(values: &[f32]) {
        for value in values {
            assert!(
                (value - value.round()).abs() <= 1.0 / 128.0,
                "{value} is not on the pixel grid"
            );
        }
    }

    #[test]
    fn unhinted_bounds_in_glyph_units() {
        for font in [type1_font(), type2_font()] {
            let h = match font.kind() {
                CharstringKind::Type1 => &type1::H,
                CharstringKind::Type2 => &type2::H,
            };
            let (path, output) = render_path(&font, h, 1000.0, &HintingOptions::unhinted());
            assert_near(bounds(&path), Rect::new(40.0, 0.0, 620.0, 715.0));
            assert_advance(&output, 700.0);
            let control_box = output.control_box.unwrap();
            assert_eq!(
                (control_box.x_min, control_box.x_max),
                (bounds(&path).x0 as f32, bounds(&path).x1 as f32)
            );
            assert!(!output.stats.grid_fit_x);
            assert_eq!(output.stats.poles, 0);
        }
    }

    #[test]
    fn unhinted_output_is_scaled_outline() {
        let font = type1_font();
        let options = HintingOptions::unhinted();
        let (large, _) = render_path(&font, &type1::O, 1000.0, &options);
        let (small, _) = render_path(&font, &type1::O, 10.0, &options);
        assert_eq!(large.len(), small.len());
        let (large_x, small_x) = (x_coords(&large), x_coords(&small));
        for (a, b) in large_x.iter().zip(&small_x) {
            assert!((a / 100.0 - b).abs() <= 1.0 / 128.0, "{a} vs {b}");
        }
    }

    #[test]
    fn hinted_stems_fill_whole_pixels() {
        let _ = env_logger::builder().is_test(true).try_init();
        for font in [type1_font(), type2_font()] {
            let h = match font.kind() {
                CharstringKind::Type1 => &type1::H,
                CharstringKind::Type2 => &type2::H,
            };
            let (path, output) = render_path(&font, h, 12.0, &HintingOptions::default());
            assert!(output.stats.grid_fit_x && output.stats.grid_fit_y);
            assert_eq!(output.stats.contours, 1);
            assert_eq!(output.stats.hints, 3);
            let xs = x_coords(&path);
            assert_integral(&xs);
            let mut edges: Vec<i32> = xs.iter().map(|x| x.round() as i32).collect();
            edges.sort_unstable();
            edges.dedup();
            // Two 80 unit stems of a little under one pixel each
            assert_eq!(edges.len(), 4, "{edges:?}");
            assert_eq!(edges[1] - edges[0], 1);
            assert_eq!(edges[3] - edges[2], 1);
            // Baseline and cap height sit on pixel boundaries
            let bbox = bounds(&path);
            assert_integral(&[bbox.y0 as f32, bbox.y1 as f32]);
        }
    }

    #[test]
    fn shallow_flex_collapses_at_small_sizes() {
        let options = HintingOptions::default();
        for (font, glyph) in [
            (type1_font(), &type1::FLEX_BAR),
            (type2_font(), &type2::FLEX_BAR),
        ] {
            let (small, _) = render_path(&font, glyph, 12.0, &options);
            assert_eq!(curve_count(&small), 0, "{:?}", font.kind());
            let (large, _) = render_path(&font, glyph, 1000.0, &options);
            assert_eq!(curve_count(&large), 2, "{:?}", font.kind());
        }
    }

    #[test]
    fn seac_places_accent() {
        for font in [type1_font(), type2_font()] {
            let glyph = match font.kind() {
                CharstringKind::Type1 => &type1::H_ACUTE,
                CharstringKind::Type2 => &type2::H_ACUTE,
            };
            let (path, output) = render_path(&font, glyph, 1000.0, &HintingOptions::unhinted());
            assert_near(bounds(&path), Rect::new(40.0, 0.0, 620.0, 830.0));
            let moves: Vec<_> = path
                .iter()
                .filter_map(|element| match *element {
                    PathElement::MoveTo { x, y } => Some((x, y)),
                    _ => None,
                })
                .collect();
            assert_eq!(moves.len(), 2);
            let (x, y) = moves[1];
            assert!((x - 250.0).abs() < 0.01 && (y - 750.0).abs() < 0.01, "{moves:?}");
            assert_advance(&output, 700.0);
            // Hinted, both components are still present
            let (_, hinted) = render_path(&font, glyph, 12.0, &HintingOptions::default());
            assert_eq!(hinted.stats.contours, 2);
            assert_eq!(hinted.stats.subglyphs, 2);
        }
    }

    #[test]
    fn hint_replacement_keeps_both_bars_aligned() {
        let font = type1_font();
        let (path, output) = render_path(
            &font,
            &type1::HINT_REPLACEMENT,
            12.0,
            &HintingOptions::default(),
        );
        assert_eq!(output.stats.contours, 2);
        assert_eq!(output.stats.hints, 2);
        let moves = path
            .iter()
            .filter(|element| matches!(element, PathElement::MoveTo { .. }))
            .count();
        assert_eq!(moves, 2);
        // The wide bar is governed by the first hint set
        let xs = x_coords(&path);
        assert_integral(&xs[..4]);
    }

    #[test]
    fn width_override() {
        let font = type1_font();
        let setup = DeviceSetup::from_ppem(1000, 1000.0);
        let renderer = GlyphRenderer::new(&font, &setup, &HintingOptions::unhinted()).unwrap();
        let width = SideBearingWidth::new(
            Point::new(Fixed::from_i32(100), Fixed::ZERO),
            Point::new(Fixed::from_i32(800), Fixed::ZERO),
        );
        let mut path = Vec::new();
        let output = renderer
            .render_with_width(&assemble_type1(type1::H.source), Some(width), &mut path)
            .unwrap();
        assert_advance(&output, 800.0);
        assert_near(bounds(&path), Rect::new(100.0, 0.0, 680.0, 715.0));
    }

    #[test]
    fn error_writes_nothing() {
        let font = type1_font();
        let setup = DeviceSetup::from_ppem(1000, 12.0);
        let renderer = GlyphRenderer::new(&font, &setup, &HintingOptions::default()).unwrap();
        let charstring = assemble_type1(
            "40 700 hsbw 0 0 rmoveto 80 hlineto 715 vlineto 1 0 div rlineto endchar",
        );
        let mut path: Vec<PathElement> = Vec::new();
        let result = renderer.render(&charstring, &mut path);
        assert_eq!(
            result,
            Err(HintError::InvalidFont(CharstringError::DivisionByZero))
        );
        assert!(path.is_empty());
        // Calls to missing subroutines are skipped
        let charstring = assemble_type1(
            "40 700 hsbw 0 0 rmoveto 80 hlineto 715 vlineto 99 callsubr -80 hlineto \
             closepath endchar",
        );
        assert!(renderer.render(&charstring, &mut path).is_ok());
        assert!(!path.is_empty());
    }

    #[test]
    fn degenerate_transform_disables_hinting() {
        let font = type1_font();
        let setup = DeviceSetup::new(
            Transform::scale(0.001, 0.001),
            Transform::new(12.0, 0.0, 12.0, 0.0, 0.0, 0.0),
        );
        let renderer = GlyphRenderer::new(&font, &setup, &HintingOptions::default()).unwrap();
        assert!(!renderer.is_hinting());
        let mut path: Vec<PathElement> = Vec::new();
        let output = renderer
            .render(&assemble_type1(type1::I.source), &mut path)
            .unwrap();
        assert!(!output.stats.grid_fit_x);
    }

    #[test]
    fn rendering_is_repeatable() {
        let font = type2_font();
        let setup = DeviceSetup::from_ppem(1000, 17.0);
        let renderer = GlyphRenderer::new(&font, &setup, &HintingOptions::default()).unwrap();
        for glyph in type2::GLYPHS {
            let charstring = assemble_type2(glyph.source);
            let mut first: Vec<PathElement> = Vec::new();
            let mut second: Vec<PathElement> = Vec::new();
            let a = renderer.render(&charstring, &mut first).unwrap();
            let b = renderer.render(&charstring, &mut second).unwrap();
            assert_eq!(first, second, "{}", glyph.name);
            assert_eq!(a, b);
        }
    }

    /// Renders a charstring with a font that has no alignment zones or
    /// snap widths, hinted and unhinted.
    fn render_both(kind: CharstringKind, source: &str, setup: &DeviceSetup) -> [Vec<PathElement>; 2] {
        let mut dict = PrivateDict::default();
        dict.len_iv = -1;
        let font = CharstringFont::new(kind, dict);
        let charstring = match kind {
            CharstringKind::Type1 => assemble_type1(source),
            CharstringKind::Type2 => assemble_type2(source),
        };
        [HintingOptions::default(), HintingOptions::unhinted()].map(|options| {
            let renderer = GlyphRenderer::new(&font, setup, &options).unwrap();
            let mut path = Vec::new();
            renderer.render(&charstring, &mut path).unwrap();
            path
        })
    }

    fn assert_paths_near(hinted: &[PathElement], unhinted: &[PathElement]) {
        assert_eq!(hinted.len(), unhinted.len(), "{hinted:?}\n{unhinted:?}");
        let coords = |element: &PathElement| match *element {
            PathElement::MoveTo { x, y } | PathElement::LineTo { x, y } => vec![x, y],
            PathElement::CurveTo {
                cx0,
                cy0,
                cx1,
                cy1,
                x,
                y,
            } => vec![cx0, cy0, cx1, cy1, x, y],
            PathElement::Close => vec![],
        };
        for (a, b) in hinted.iter().zip(unhinted) {
            assert_eq!(
                core::mem::discriminant(a),
                core::mem::discriminant(b),
                "{a:?} vs {b:?}"
            );
            for (u, v) in coords(a).into_iter().zip(coords(b)) {
                assert!((u - v).abs() <= 1.0 / 64.0, "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn outline_without_hints_is_not_moved() {
        let sources = [
            (
                CharstringKind::Type1,
                "0 500 hsbw 37 12 rmoveto 411 31 rlineto -57 388 rlineto \
                 -296 -45 rlineto closepath endchar",
            ),
            (
                CharstringKind::Type2,
                "37 12 rmoveto 411 31 -57 388 -296 -45 rlineto endchar",
            ),
        ];
        for ppem in [9.0, 12.0, 17.3, 33.0] {
            let setup = DeviceSetup::from_ppem(1000, ppem).with_origin(3.37, 5.61);
            for (kind, source) in sources {
                let [hinted, unhinted] = render_both(kind, source, &setup);
                assert!(!unhinted.is_empty());
                assert_eq!(hinted, unhinted, "{kind:?} at {ppem} ppem");
            }
        }
    }

    #[test]
    fn outline_on_pixel_grid_is_not_moved() {
        // Stems and extrema on 100 unit boundaries: whole pixels at 10
        // and 20 ppem
        let sources = [
            (
                CharstringKind::Type1,
                "0 600 hsbw 0 200 hstem 100 200 vstem 100 0 rmoveto 200 hlineto \
                 200 vlineto -200 hlineto closepath endchar",
            ),
            (
                CharstringKind::Type2,
                "0 200 hstem 100 200 vstem 100 0 rmoveto 200 200 -200 hlineto endchar",
            ),
            (
                CharstringKind::Type1,
                "0 600 hsbw 0 200 hstem 300 200 hstem 100 200 vstem 100 0 rmoveto \
                 200 hlineto 200 vlineto -200 hlineto closepath 0 100 rmoveto \
                 200 hlineto 200 vlineto -200 hlineto closepath endchar",
            ),
            (
                CharstringKind::Type2,
                "0 200 100 200 hstem 100 200 vstem 100 0 rmoveto 200 200 -200 hlineto \
                 0 100 rmoveto 200 200 -200 hlineto endchar",
            ),
            (
                CharstringKind::Type1,
                "0 600 hsbw 0 400 hstem 100 400 vstem 300 0 rmoveto \
                 110 90 90 110 hvcurveto 110 -90 90 -110 vhcurveto \
                 -110 -90 -90 -110 hvcurveto -110 90 -90 110 vhcurveto closepath endchar",
            ),
            (
                CharstringKind::Type2,
                "0 400 hstem 100 400 vstem 300 0 rmoveto \
                 110 90 90 110 hvcurveto 110 -90 90 -110 vhcurveto \
                 -110 -90 -90 -110 hvcurveto -110 90 -90 110 vhcurveto endchar",
            ),
        ];
        for ppem in [10.0, 20.0] {
            let setup = DeviceSetup::from_ppem(1000, ppem);
            for (kind, source) in sources {
                let [hinted, unhinted] = render_both(kind, source, &setup);
                assert!(!unhinted.is_empty());
                assert_paths_near(&hinted, &unhinted);
            }
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn stats_serde() {
        let (_, output) = render_path(&type1_font(), &type1::O, 12.0, &HintingOptions::default());
        let json = serde_json::to_string(&output).unwrap();
        let back: GlyphOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back, output);
        assert!(json.contains("\"grid_fit_x\":true"));
    }
}
