//! Grid fitting of Type 1 and Type 2 glyph outlines.
//!
//! The [`GlyphRenderer`] evaluates a charstring, collects its outline and
//! stem hints and aligns the outline to the device pixel grid before
//! writing it to a [`Pen`]. Alignment follows the stem hints, alignment
//! zones and stem snap widths of the font's Private dictionary.
//!
//! All geometry is computed in fixed point so that the result does not
//! depend on the floating point behavior of the host. When hinting is
//! disabled, or the glyph transform does not allow it, outlines are
//! transformed to device space unchanged.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

#[cfg(all(not(feature = "std"), not(test)))]
#[macro_use]
extern crate core as std;

extern crate alloc;

mod align;
mod error;
mod export;
mod flex;
mod fraction;
mod hinter;
mod mapping;
mod options;
mod outline;
mod renderer;
mod transform;
mod zones;

pub use error::{CharstringError, HintError};
pub use options::HintingOptions;
pub use renderer::{GlyphOutput, GlyphRenderer, GlyphStats};
pub use transform::{DeviceSetup, Transform};

pub use ps_types::{BoundingBox, NullPen, PathElement, Pen, Point};
pub use read_charstrings::{
    CharstringFont, CharstringKind, CharstringSource, PrivateDict, SideBearingWidth,
};
