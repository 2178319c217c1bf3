#![no_main]
use libfuzzer_sys::{
    arbitrary::{self, Arbitrary},
    fuzz_target,
};
use read_charstrings::{Blues, Fixed, StemSnaps};
use stemfit::{
    CharstringFont, CharstringKind, DeviceSetup, GlyphRenderer, HintingOptions, NullPen,
    PrivateDict, Transform,
};

/// Everything needed to render one glyph of a one glyph font.
///
/// See <https://rust-fuzz.github.io/book/cargo-fuzz/structure-aware-fuzzing.html>
#[derive(Arbitrary, Debug)]
struct RenderRequest<'a> {
    type2: bool,
    /// Coefficients of the current transformation matrix.
    ctm: [f32; 6],
    ppem: u16,
    hinted: bool,
    align_to_pixels: bool,
    log2_pixels: (u8, u8),
    log2_subpixels: (u8, u8),
    flex_threshold: Option<i32>,
    blue_values: Vec<i16>,
    stem_snap_h: Vec<i16>,
    stem_snap_v: Vec<i16>,
    blue_scale: u16,
    subrs: Vec<&'a [u8]>,
    accent: &'a [u8],
    charstring: &'a [u8],
}

fn private_dict(request: &RenderRequest) -> PrivateDict {
    let to_i32s = |values: &[i16]| values.iter().map(|v| *v as i32).collect::<Vec<_>>();
    let mut dict = PrivateDict::default();
    dict.len_iv = -1;
    dict.blue_values = Blues::from_i32s(&to_i32s(&request.blue_values));
    dict.stem_snap_h = StemSnaps::from_i32s(&to_i32s(&request.stem_snap_h));
    dict.stem_snap_v = StemSnaps::from_i32s(&to_i32s(&request.stem_snap_v));
    dict.blue_scale = Fixed::from_f64(request.blue_scale as f64 / 65536.0);
    dict
}

fuzz_target!(|request: RenderRequest| {
    let kind = if request.type2 {
        CharstringKind::Type2
    } else {
        CharstringKind::Type1
    };
    let subrs = request.subrs.iter().map(|s| s.to_vec()).collect();
    let font = CharstringFont::new(kind, private_dict(&request))
        .with_subrs(subrs)
        .with_seac_component(194, request.accent.to_vec());
    let [xx, xy, yx, yy, tx, ty] = request.ctm.map(|v| v as f64);
    let unit = 1.0 / request.ppem.max(1) as f64;
    let setup = DeviceSetup::new(
        Transform::scale(unit, unit),
        Transform::new(xx, xy, yx, yy, tx, ty),
    );
    let options = HintingOptions {
        enabled: request.hinted,
        align_to_pixels: request.align_to_pixels,
        log2_pixels: request.log2_pixels,
        log2_subpixels: request.log2_subpixels,
        flex_threshold_override: request.flex_threshold,
    };
    let Ok(renderer) = GlyphRenderer::new(&font, &setup, &options) else {
        return;
    };
    let _ = renderer.render(request.charstring, &mut NullPen);
});
