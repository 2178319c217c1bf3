//! Test data shared by the charstring and hinting crates.

pub mod charstring;

/// A fixture glyph: name, StandardEncoding code and charstring source.
#[derive(Copy, Clone, Debug)]
pub struct GlyphSource {
    pub name: &'static str,
    pub code: i32,
    pub source: &'static str,
}

/// Hinting parameters shared by the Type 1 and Type 2 fixture fonts.
///
/// Units are font units of a 1000 unit em.
pub mod private {
    /// Baseline overshoot, cap height and x-height zones.
    pub static BLUE_VALUES: &[i32] = &[-15, 0, 715, 730, 510, 520];
    /// Descender zone.
    pub static OTHER_BLUES: &[i32] = &[-210, -200];
    pub static FAMILY_BLUES: &[i32] = &[-15, 0, 716, 731, 510, 520];
    pub static FAMILY_OTHER_BLUES: &[i32] = &[-210, -200];
    pub const BLUE_SCALE: f64 = 0.039625;
    pub const BLUE_SHIFT: i32 = 7;
    pub const BLUE_FUZZ: i32 = 1;
    pub const STD_HW: i32 = 30;
    pub const STD_VW: i32 = 80;
    pub static STEM_SNAP_H: &[i32] = &[30, 36];
    pub static STEM_SNAP_V: &[i32] = &[80, 90];
    /// Type 2 width defaults.
    pub const DEFAULT_WIDTH_X: i32 = 500;
    pub const NOMINAL_WIDTH_X: i32 = 600;
}

/// A synthetic Type 1 font.
///
/// The first four subroutines are the standard flex and hint replacement
/// helpers.
pub mod type1 {
    use super::GlyphSource;

    pub static SUBRS: &[&str] = &[
        "3 0 callothersubr pop pop setcurrentpoint return",
        "0 1 callothersubr return",
        "0 2 callothersubr return",
        "return",
        // Hint set used by `hint replacement` glyphs
        "0 80 vstem return",
        "400 40 vstem return",
    ];

    pub static H: GlyphSource = GlyphSource {
        name: "H",
        code: 72,
        source: "40 700 hsbw 330 30 hstem 0 80 vstem 500 80 vstem \
                 0 0 rmoveto 80 hlineto 330 vlineto 420 hlineto -330 vlineto \
                 80 hlineto 715 vlineto -80 hlineto -355 vlineto -420 hlineto \
                 355 vlineto -80 hlineto closepath endchar",
    };

    pub static O: GlyphSource = GlyphSource {
        name: "o",
        code: 111,
        source: "30 500 hsbw -10 80 hstem 450 70 hstem 0 80 vstem 360 80 vstem \
                 0 260 rmoveto -150 90 -120 130 vhcurveto 130 90 120 150 hvcurveto \
                 150 -90 110 -130 vhcurveto -130 -90 -110 -150 hvcurveto closepath \
                 80 0 rmoveto 110 50 80 90 vhcurveto 90 50 -80 -110 hvcurveto \
                 -110 -50 -80 -90 vhcurveto -90 -50 80 110 hvcurveto closepath endchar",
    };

    pub static I: GlyphSource = GlyphSource {
        name: "i",
        code: 105,
        source: "20 240 hsbw 0 80 vstem 0 0 rmoveto 80 hlineto 520 vlineto \
                 -80 hlineto closepath 0 110 rmoveto dotsection 80 hlineto 80 vlineto \
                 -80 hlineto closepath dotsection endchar",
    };

    /// A bar whose top edge is a shallow flex.
    pub static FLEX_BAR: GlyphSource = GlyphSource {
        name: "flexbar",
        code: 95,
        source: "50 600 hsbw 0 300 hstem 0 0 rmoveto 500 hlineto 300 vlineto \
                 1 callsubr -250 0 rmoveto 2 callsubr 200 0 rmoveto 2 callsubr \
                 -150 -5 rmoveto 2 callsubr -50 0 rmoveto 2 callsubr \
                 -50 0 rmoveto 2 callsubr -150 5 rmoveto 2 callsubr \
                 -50 0 rmoveto 2 callsubr 50 50 300 0 callsubr closepath endchar",
    };

    /// Two vertical bars whose stems are declared in separate hint sets.
    pub static HINT_REPLACEMENT: GlyphSource = GlyphSource {
        name: "bars",
        code: 124,
        source: "40 600 hsbw 4 1 3 callothersubr pop callsubr \
                 0 0 rmoveto 80 hlineto 700 vlineto -80 hlineto closepath \
                 5 1 3 callothersubr pop callsubr \
                 400 -700 rmoveto 40 hlineto 700 vlineto -40 hlineto closepath endchar",
    };

    pub static ACUTE: GlyphSource = GlyphSource {
        name: "acute",
        code: 194,
        source: "0 300 hsbw 0 600 rmoveto 100 hlineto 60 80 rlineto -100 hlineto \
                 closepath endchar",
    };

    /// H with an acute accent, built with seac.
    pub static H_ACUTE: GlyphSource = GlyphSource {
        name: "Hacute",
        code: 0,
        source: "40 700 hsbw 0 250 150 72 194 seac",
    };

    pub static GLYPHS: &[&GlyphSource] =
        &[&H, &O, &I, &FLEX_BAR, &HINT_REPLACEMENT, &ACUTE, &H_ACUTE];
}

/// A synthetic Type 2 (CFF) font.
pub mod type2 {
    use super::GlyphSource;

    pub static SUBRS: &[&str] = &["80 hlineto return"];

    pub static GLOBAL_SUBRS: &[&str] = &["-80 hlineto return"];

    /// H with an explicit width of 700 and a hint mask.
    pub static H: GlyphSource = GlyphSource {
        name: "H",
        code: 72,
        source: "100 330 30 hstemhm 40 80 420 80 vstemhm hintmask #e0 40 0 rmoveto \
                 80 330 420 -330 80 715 -80 -355 -420 355 -80 hlineto endchar",
    };

    /// H drawn through subroutines with the default width.
    pub static H_SUBRS: GlyphSource = GlyphSource {
        name: "H.subrs",
        code: 0,
        source: "330 30 hstem 40 80 420 80 vstem 40 0 rmoveto -107 callsubr \
                 330 420 -330 vlineto -107 callsubr 715 -80 -355 -420 355 vlineto \
                 -107 callgsubr endchar",
    };

    pub static FLEX_BAR: GlyphSource = GlyphSource {
        name: "flexbar",
        code: 95,
        source: "0 300 hstem 50 0 rmoveto 500 300 hlineto \
                 -50 0 -150 -5 -50 0 -50 0 -150 5 -50 0 50 flex endchar",
    };

    pub static ACUTE: GlyphSource = GlyphSource {
        name: "acute",
        code: 194,
        source: "-200 0 600 rmoveto 100 hlineto 60 80 rlineto -100 hlineto endchar",
    };

    /// H with an acute accent, using the implied seac of endchar.
    pub static H_ACUTE: GlyphSource = GlyphSource {
        name: "Hacute",
        code: 0,
        source: "100 250 150 72 194 endchar",
    };

    pub static GLYPHS: &[&GlyphSource] = &[&H, &H_SUBRS, &FLEX_BAR, &ACUTE, &H_ACUTE];
}
