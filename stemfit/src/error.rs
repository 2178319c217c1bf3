//! Error type for glyph rendering.

use core::fmt;

pub use read_charstrings::Error as CharstringError;

/// Errors that may occur when hinting and rendering a glyph.
///
/// Any error aborts the current glyph and nothing is written to the pen.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum HintError {
    /// Failed to grow one of the working arrays.
    OutOfMemory,
    /// An internal consistency check failed.
    Internal(&'static str),
    /// The charstring is malformed.
    InvalidFont(CharstringError),
}

impl HintError {
    /// Returns true if this error reports malformed font data.
    pub fn is_invalid_font(&self) -> bool {
        matches!(self, Self::InvalidFont(e) if e.is_invalid_font())
    }
}

impl From<CharstringError> for HintError {
    fn from(value: CharstringError) -> Self {
        Self::InvalidFont(value)
    }
}

impl From<alloc::collections::TryReserveError> for HintError {
    fn from(_: alloc::collections::TryReserveError) -> Self {
        Self::OutOfMemory
    }
}

impl fmt::Display for HintError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "exceeded memory limits while hinting"),
            Self::Internal(what) => write!(f, "internal hinter error: {what}"),
            Self::InvalidFont(e) => write!(f, "invalid font: {e}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HintError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_font_classification() {
        let e: HintError = CharstringError::DivisionByZero.into();
        assert!(e.is_invalid_font());
        assert!(!HintError::OutOfMemory.is_invalid_font());
        assert_eq!(
            HintError::Internal("hint range outside of glyph").to_string(),
            "internal hinter error: hint range outside of glyph"
        );
    }

    #[test]
    fn reserve_failure_is_out_of_memory() {
        let mut v: Vec<u64> = Vec::new();
        let e: HintError = v.try_reserve(usize::MAX).unwrap_err().into();
        assert_eq!(e, HintError::OutOfMemory);
    }
}
