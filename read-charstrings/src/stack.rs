//! Operand stack for charstring evaluation.

use std::fmt;

use ps_types::Fixed;

use super::Error;

/// Maximum size of the operand stack.
///
/// "The Type 2 argument stack is limited to 48 entries" and the Type 1
/// limit of 24 is lower, so a single capacity serves both.
///
/// See "Appendix B Type 2 Charstring Implementation Limits" at
/// <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=33>
pub const MAX_STACK: usize = 48;

/// Operand stack for charstrings.
///
/// The operand stack can contain either 32-bit integers or 16.16 fixed point
/// values. Type 1 charstrings may push integers that do not fit in 16.16
/// (commonly as `div` operands) so integers are kept exact until an
/// operator requests a fixed point value.
///
/// Entries are stored in parallel arrays holding the raw 32-bit value and a
/// flag that tracks which values are fixed point.
#[derive(Clone)]
pub struct Stack {
    values: [i32; MAX_STACK],
    value_is_fixed: [bool; MAX_STACK],
    top: usize,
}

impl Stack {
    pub fn new() -> Self {
        Self {
            values: [0; MAX_STACK],
            value_is_fixed: [false; MAX_STACK],
            top: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.top == 0
    }

    pub fn len(&self) -> usize {
        self.top
    }

    pub fn verify_at_least_len(&self, len: usize) -> Result<(), Error> {
        if self.top < len {
            Err(Error::StackUnderflow)
        } else {
            Ok(())
        }
    }

    /// Returns true if the number of elements on the stack is odd.
    ///
    /// Used for processing some charstring operators where an odd
    /// count represents the presence of the glyph advance width at the
    /// bottom of the stack.
    pub fn len_is_odd(&self) -> bool {
        self.top & 1 != 0
    }

    pub fn clear(&mut self) {
        self.top = 0;
    }

    pub fn push(&mut self, number: impl Into<Number>) -> Result<(), Error> {
        match number.into() {
            Number::I32(value) => self.push_impl(value, false),
            Number::Fixed(value) => self.push_impl(value.to_bits(), true),
        }
    }

    /// Returns the number at the given index on the stack.
    pub fn get(&self, index: usize) -> Result<Number, Error> {
        if index >= self.top {
            return Err(Error::InvalidStackAccess(index));
        }
        Ok(Number::from_stack(
            self.values[index],
            self.value_is_fixed[index],
        ))
    }

    /// Returns the 16.16 fixed point value at the given index on the stack.
    ///
    /// If the value was pushed as an integer, it will be automatically
    /// converted to 16.16 fixed point.
    pub fn get_fixed(&self, index: usize) -> Result<Fixed, Error> {
        Ok(self.get(index)?.to_fixed())
    }

    /// Replaces the value at the given index.
    pub fn set(&mut self, index: usize, number: impl Into<Number>) -> Result<(), Error> {
        if index >= self.top {
            return Err(Error::InvalidStackAccess(index));
        }
        let (value, is_fixed) = number.into().to_stack();
        self.values[index] = value;
        self.value_is_fixed[index] = is_fixed;
        Ok(())
    }

    /// Pops a number from the top of the stack.
    pub fn pop(&mut self) -> Result<Number, Error> {
        if self.top > 0 {
            self.top -= 1;
            Ok(Number::from_stack(
                self.values[self.top],
                self.value_is_fixed[self.top],
            ))
        } else {
            Err(Error::StackUnderflow)
        }
    }

    /// Pops a 16.16 fixed point value from the top of the stack.
    ///
    /// If the value was pushed as an integer, it will be automatically
    /// converted to 16.16 fixed point.
    pub fn pop_fixed(&mut self) -> Result<Fixed, Error> {
        Ok(self.pop()?.to_fixed())
    }

    /// Pops an integer from the top of the stack.
    ///
    /// Fixed point values are truncated toward negative infinity.
    pub fn pop_i32(&mut self) -> Result<i32, Error> {
        Ok(self.pop()?.to_i32())
    }

    /// Removes the element at `index`, shifting all elements above it down.
    pub fn remove(&mut self, index: usize) -> Result<Number, Error> {
        let number = self.get(index)?;
        self.values.copy_within(index + 1..self.top, index);
        self.value_is_fixed.copy_within(index + 1..self.top, index);
        self.top -= 1;
        Ok(number)
    }

    /// Drops all elements at or above `len`.
    pub fn truncate(&mut self, len: usize) {
        self.top = self.top.min(len);
    }

    /// Returns an array of `N` 16.16 fixed point values starting at
    /// `first_index`.
    pub fn fixed_array<const N: usize>(&self, first_index: usize) -> Result<[Fixed; N], Error> {
        let mut result = [Fixed::ZERO; N];
        if first_index >= self.top {
            return Err(Error::InvalidStackAccess(first_index));
        }
        let end = first_index + N;
        if end > self.top {
            return Err(Error::InvalidStackAccess(end - 1));
        }
        for (i, dest) in (first_index..end).zip(&mut result) {
            *dest = Number::from_stack(self.values[i], self.value_is_fixed[i]).to_fixed();
        }
        Ok(result)
    }

    /// Returns an iterator yielding all elements on the stack as number
    /// values.
    ///
    /// This is useful for capturing the current state of the stack.
    pub fn number_values(&self) -> impl Iterator<Item = Number> + '_ {
        self.values[..self.top]
            .iter()
            .zip(&self.value_is_fixed)
            .map(|(value, is_fixed)| Number::from_stack(*value, *is_fixed))
    }

    /// Copies the element `index` positions below the top to the top of
    /// the stack.
    ///
    /// A negative index copies the top element.
    pub fn index(&mut self, index: i32) -> Result<(), Error> {
        let index = index.max(0) as usize;
        if index >= self.top {
            return Err(Error::InvalidStackIndex(index as i32));
        }
        let number = self.get(self.top - 1 - index)?;
        self.push(number)
    }

    /// Rolls the top `count` elements by `shift` positions toward the top
    /// of the stack. Negative shifts roll toward the bottom.
    pub fn roll(&mut self, count: i32, shift: i32) -> Result<(), Error> {
        if count < 0 || count as usize > self.top {
            return Err(Error::InvalidStackIndex(count));
        }
        if count == 0 {
            return Ok(());
        }
        let start = self.top - count as usize;
        let shift = shift.rem_euclid(count) as usize;
        self.values[start..self.top].rotate_right(shift);
        self.value_is_fixed[start..self.top].rotate_right(shift);
        Ok(())
    }

    fn push_impl(&mut self, value: i32, is_fixed: bool) -> Result<(), Error> {
        if self.top == MAX_STACK {
            return Err(Error::StackOverflow);
        }
        self.values[self.top] = value;
        self.value_is_fixed[self.top] = is_fixed;
        self.top += 1;
        Ok(())
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.number_values()).finish()
    }
}

/// Either a signed 32-bit integer or a 16.16 fixed point number.
///
/// This represents the charstring "number" operand type.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Number {
    I32(i32),
    Fixed(Fixed),
}

impl Number {
    fn from_stack(raw: i32, is_fixed: bool) -> Self {
        if is_fixed {
            Self::Fixed(Fixed::from_bits(raw))
        } else {
            Self::I32(raw)
        }
    }

    fn to_stack(self) -> (i32, bool) {
        match self {
            Self::I32(value) => (value, false),
            Self::Fixed(value) => (value.to_bits(), true),
        }
    }

    /// Returns the value as 16.16 fixed point, wrapping integers that are
    /// out of range.
    pub fn to_fixed(self) -> Fixed {
        match self {
            Self::I32(value) => Fixed::from_i32(value),
            Self::Fixed(value) => value,
        }
    }

    /// Returns the value as an integer, truncating fixed point values
    /// toward negative infinity.
    pub fn to_i32(self) -> i32 {
        match self {
            Self::I32(value) => value,
            Self::Fixed(value) => value.to_i32(),
        }
    }

    /// Returns the value as an f64 without loss.
    pub fn to_f64(self) -> f64 {
        match self {
            Self::I32(value) => value as f64,
            Self::Fixed(value) => value.to_f64(),
        }
    }

    pub fn is_zero(self) -> bool {
        self.to_stack().0 == 0
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Self::I32(value)
    }
}

impl From<Fixed> for Number {
    fn from(value: Fixed) -> Self {
        Self::Fixed(value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I32(value) => value.fmt(f),
            Self::Fixed(value) => value.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use ps_types::Fixed;

    use super::{Number, Stack, MAX_STACK};
    use crate::Error;

    #[test]
    fn push_pop() {
        let mut stack = Stack::new();
        stack.push(20).unwrap();
        stack.push(Fixed::from_f64(42.42)).unwrap();
        assert!(!stack.len_is_odd());
        stack.verify_at_least_len(2).unwrap();
        assert_eq!(stack.pop_fixed().unwrap(), Fixed::from_f64(42.42));
        assert_eq!(stack.pop_i32().unwrap(), 20);
        assert_eq!(stack.pop(), Err(Error::StackUnderflow));
    }

    #[test]
    fn push_fixed_pop_i32_truncates() {
        let mut stack = Stack::new();
        stack.push(Fixed::from_f64(-1.5)).unwrap();
        assert_eq!(stack.pop_i32().unwrap(), -2);
    }

    #[test]
    fn push_i32_pop_fixed() {
        let mut stack = Stack::new();
        stack.push(123).unwrap();
        assert_eq!(stack.pop_fixed().unwrap(), Fixed::from_f64(123.0));
    }

    #[test]
    fn overflow() {
        let mut stack = Stack::new();
        for i in 0..MAX_STACK {
            stack.push(i as i32).unwrap();
        }
        assert_eq!(stack.push(0), Err(Error::StackOverflow));
    }

    #[test]
    fn remove_bottom() {
        let mut stack = Stack::new();
        for i in 1..=4 {
            stack.push(i).unwrap();
        }
        assert_eq!(stack.remove(0).unwrap(), Number::I32(1));
        let values: Vec<_> = stack.number_values().collect();
        assert_eq!(values, [2, 3, 4].map(Number::I32));
        assert_eq!(stack.remove(3), Err(Error::InvalidStackAccess(3)));
    }

    #[test]
    fn fixed_array() {
        let mut stack = Stack::new();
        stack.push(1).unwrap();
        stack.push(Fixed::from_f64(2.5)).unwrap();
        stack.push(3).unwrap();
        let values = [1.0, 2.5, 3.0].map(Fixed::from_f64);
        assert_eq!(stack.fixed_array::<3>(0).unwrap(), values);
        assert_eq!(stack.fixed_array::<2>(1).unwrap(), [values[1], values[2]]);
        assert_eq!(
            stack.fixed_array::<3>(1),
            Err(Error::InvalidStackAccess(3))
        );
    }

    #[test]
    fn index_copies_element() {
        let mut stack = Stack::new();
        for i in [10, 20, 30] {
            stack.push(i).unwrap();
        }
        stack.index(2).unwrap();
        assert_eq!(stack.pop_i32().unwrap(), 10);
        // negative index duplicates the top
        stack.index(-5).unwrap();
        assert_eq!(stack.pop_i32().unwrap(), 30);
        assert_eq!(stack.index(3), Err(Error::InvalidStackIndex(3)));
    }

    #[test]
    fn roll() {
        let mut stack = Stack::new();
        for i in [1, 2, 3, 4] {
            stack.push(i).unwrap();
        }
        // 2 3 4 rolled up by one becomes 4 2 3
        stack.roll(3, 1).unwrap();
        let values: Vec<_> = stack.number_values().map(Number::to_i32).collect();
        assert_eq!(values, [1, 4, 2, 3]);
        stack.roll(4, -1).unwrap();
        let values: Vec<_> = stack.number_values().map(Number::to_i32).collect();
        assert_eq!(values, [4, 2, 3, 1]);
        assert_eq!(stack.roll(5, 1), Err(Error::InvalidStackIndex(5)));
    }
}
