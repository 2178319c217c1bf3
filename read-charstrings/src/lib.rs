//! Decoding and evaluation of Type 1 and Type 2 charstrings.
//!
//! The [`Interpreter`] executes the charstring of a single glyph and reports
//! the resulting path and hint operations to a [`CharstringSink`]. Font wide
//! data (subroutines, seac components and the hinting parameters of the
//! Private dictionary) is supplied by a [`CharstringSource`].
//!
//! Evaluation is resumable: when the charstring establishes its side
//! bearing and advance width, [`Interpreter::run`] returns
//! [`Progress::NeedWidth`] so that the caller may substitute its own metrics
//! before evaluation continues with the same operator.

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

mod cipher;
mod cursor;
mod error;
mod interpreter;
mod number;
mod private;
mod sink;
mod source;
mod stack;

/// Maximum nesting depth for subroutine calls.
///
/// See "Appendix B Type 2 Charstring Implementation Limits" at
/// <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=33>
pub const NESTING_DEPTH_LIMIT: u32 = 10;

pub use cipher::{decrypt_in_place, eexec_decrypt, Cipher, CHARSTRING_KEY, EEXEC_KEY};
pub use error::Error;
pub use interpreter::{evaluate, Interpreter, Progress, SideBearingWidth, TRANSIENT_ARRAY_SIZE};
pub use number::{encode_number, EncodedNumber};
pub use private::{Blues, PrivateDict, StemSnaps, WeightVector, MAX_MASTERS};
pub use sink::CharstringSink;
pub use source::{subr_bias, CharstringFont, CharstringKind, CharstringSource};
pub use stack::{Number, Stack, MAX_STACK};

pub use ps_types::{Fixed, Point};
