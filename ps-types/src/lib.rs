//! Common scalar and geometry types used when interpreting and hinting
//! PostScript (Type 1 and Type 2) outlines.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

#[cfg(all(not(feature = "std"), not(test)))]
#[macro_use]
extern crate core as std;

extern crate alloc;

mod bbox;
mod fixed;
mod pen;
mod point;


pub use bbox::BoundingBox;
pub use fixed::{F24Dot8, Fixed};
pub use pen::{NullPen, PathElement, Pen};
pub use point::Point;
