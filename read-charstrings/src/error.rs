//! Errors produced while interpreting charstrings.

use std::fmt;

/// Errors that may occur when interpreting a charstring.
///
/// Every variant describes malformed font data. The glyph being processed
/// is abandoned but no state shared with other glyphs is affected.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// The charstring ended in the middle of a number or operator.
    UnexpectedEnd,
    /// A byte that does not begin a valid number encoding.
    InvalidNumber(u8),
    /// An undefined single byte operator.
    InvalidOperator(u8),
    /// An undefined escaped (two byte) operator.
    InvalidEscapeOperator(u8),
    /// Attempted to push a value to a full operand stack.
    StackOverflow,
    /// Attempted to pop a value from an empty operand stack or an operator
    /// received fewer operands than it requires.
    StackUnderflow,
    /// Access to a stack element with an invalid index.
    InvalidStackAccess(usize),
    /// Subroutine calls nested deeper than the interpreter allows.
    CharstringNestingDepthLimitExceeded,
    /// A `return` operator with no subroutine to return from.
    ReturnWithoutCall,
    /// Attempted to divide by zero with the `div` operator.
    DivisionByZero,
    /// An `index` or `roll` operand outside of the stack bounds.
    InvalidStackIndex(i32),
    /// A `put` or `get` index outside of the transient array.
    InvalidTransientIndex(i32),
    /// A `store` or `load` registry index that does not exist.
    InvalidRegistry(i32),
    /// A `store` or `load` that would read or write outside of the
    /// registry array.
    InvalidRegistryRange,
    /// A seac component character code with no glyph in the font.
    InvalidSeacComponent(i32),
    /// A seac component that itself uses seac.
    NestedSeac,
    /// Flex othersubrs called out of sequence.
    InvalidFlexSequence,
    /// A `pop` with no othersubr result available.
    MissingOtherSubrResult,
    /// An othersubr call with a malformed argument count.
    InvalidOtherSubrArgs(i32),
    /// A multiple master operator used by a font without a weight vector
    /// of the required size.
    InvalidBlend,
    /// A drawing operator executed before the side bearing and width were
    /// established by `hsbw` or `sbw`.
    MissingWidth,
    /// A hint mask referencing more stems than the interpreter tracks.
    TooManyStems(usize),
}

impl Error {
    /// Returns true if this error reports malformed font data.
    ///
    /// All interpreter errors currently fall in this category.
    pub fn is_invalid_font(&self) -> bool {
        true
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEnd => write!(f, "unexpected end of charstring"),
            Self::InvalidNumber(b0) => write!(f, "invalid number encoding with lead byte {b0}"),
            Self::InvalidOperator(op) => write!(f, "invalid charstring operator {op}"),
            Self::InvalidEscapeOperator(op) => {
                write!(f, "invalid escaped charstring operator 12 {op}")
            }
            Self::StackOverflow => write!(f, "attempted to push a value to a full stack"),
            Self::StackUnderflow => {
                write!(f, "attempted to pop a value from an empty stack")
            }
            Self::InvalidStackAccess(index) => write!(f, "invalid stack access for index {index}"),
            Self::CharstringNestingDepthLimitExceeded => write!(
                f,
                "exceeded subroutine nesting depth limit ({}) while evaluating a charstring",
                crate::NESTING_DEPTH_LIMIT
            ),
            Self::ReturnWithoutCall => write!(f, "return operator outside of a subroutine"),
            Self::DivisionByZero => write!(f, "division by zero"),
            Self::InvalidStackIndex(index) => {
                write!(f, "stack index or roll count {index} is out of bounds")
            }
            Self::InvalidTransientIndex(index) => {
                write!(f, "transient array index {index} is out of bounds")
            }
            Self::InvalidRegistry(index) => write!(f, "invalid registry item {index}"),
            Self::InvalidRegistryRange => write!(f, "registry access is out of bounds"),
            Self::InvalidSeacComponent(code) => {
                write!(f, "seac component with character code {code} is not present")
            }
            Self::NestedSeac => write!(f, "seac component glyphs may not use seac"),
            Self::InvalidFlexSequence => write!(f, "flex othersubrs called out of sequence"),
            Self::MissingOtherSubrResult => {
                write!(f, "pop operator with no othersubr result available")
            }
            Self::InvalidOtherSubrArgs(count) => {
                write!(f, "othersubr called with invalid argument count {count}")
            }
            Self::InvalidBlend => write!(f, "multiple master blend without matching weight vector"),
            Self::MissingWidth => write!(f, "path operator before side bearing and width"),
            Self::TooManyStems(count) => {
                write!(f, "hint mask covering {count} stems exceeds the supported maximum")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
