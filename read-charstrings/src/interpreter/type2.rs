//! Type 2 charstring operators.
//!
//! See <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf>

#[cfg(feature = "libm")]
#[allow(unused_imports)]
use core_maths::CoreFloat;

use ps_types::{Fixed, Point};

use super::{
    Component, Flow, InitState, Interpreter, SideBearingWidth, MAX_HINT_MASK_BYTES,
    TRANSIENT_ARRAY_SIZE,
};
use crate::{cursor::Cursor, CharstringSink, CharstringSource, Error, Number};

/// Registry item holding the multiple master weight vector.
const WEIGHT_VECTOR_REGISTRY: i32 = 0;

impl<'a, F: CharstringSource> Interpreter<'a, F> {
    pub(super) fn evaluate_type2(
        &mut self,
        operator: Operator,
        saved: Cursor<'a>,
        sink: &mut impl CharstringSink,
    ) -> Result<Flow, Error> {
        use Operator::*;
        if let Some(has_width) = self.first_operator_width(operator) {
            if self.check_width(has_width, saved, sink)? {
                return Ok(Flow::NeedWidth);
            }
        }
        match operator {
            // Emits a sequence of stem hints
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=21>
            HStem | VStem | HStemHm | VStemHm => {
                self.emit_stems(0, matches!(operator, HStem | HStemHm), sink)?;
            }
            // Applies a hint or counter mask. Arguments on the stack are an
            // implied vstemhm.
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=24>
            HintMask | CntrMask => {
                self.emit_stems(0, false, sink)?;
                let len = self.hint_mask_len()?;
                let mut mask = [0u8; MAX_HINT_MASK_BYTES];
                let cursor = &mut self.frames[self.depth];
                for byte in &mut mask[..len] {
                    *byte = cursor.read_u8()?;
                }
                if operator == HintMask {
                    sink.hint_mask(&mask[..len]);
                } else {
                    sink.counter_mask(&mask[..len]);
                }
            }
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=16>
            RMoveTo => {
                let len = self.stack.len();
                self.stack.verify_at_least_len(2)?;
                if len > 2 {
                    // Extra leading pairs are treated as vertical stems
                    self.emit_stems(2, false, sink)?;
                }
                let [dx, dy] = self.top_args()?;
                sink.rmoveto(dx, dy);
            }
            HMoveTo => {
                let [dx] = self.top_args()?;
                sink.rmoveto(dx, Fixed::ZERO);
            }
            VMoveTo => {
                let [dy] = self.top_args()?;
                sink.rmoveto(Fixed::ZERO, dy);
            }
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=16>
            RLineTo => {
                let len = self.stack.len();
                self.stack.verify_at_least_len(2)?;
                let mut i = 0;
                while i + 2 <= len {
                    let [dx, dy] = self.stack.fixed_array::<2>(i)?;
                    sink.rlineto(dx, dy);
                    i += 2;
                }
            }
            HLineTo | VLineTo => {
                self.stack.verify_at_least_len(1)?;
                let mut is_x = operator == HLineTo;
                for i in 0..self.stack.len() {
                    let value = self.stack.get_fixed(i)?;
                    if is_x {
                        sink.rlineto(value, Fixed::ZERO);
                    } else {
                        sink.rlineto(Fixed::ZERO, value);
                    }
                    is_x = !is_x;
                }
            }
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=17>
            RrCurveTo | RCurveLine => {
                let len = self.stack.len();
                let curve_end = if operator == RCurveLine {
                    self.stack.verify_at_least_len(8)?;
                    len - 2
                } else {
                    self.stack.verify_at_least_len(6)?;
                    len
                };
                let mut i = 0;
                while i + 6 <= curve_end {
                    self.emit_curve(i, sink)?;
                    i += 6;
                }
                if operator == RCurveLine {
                    let [dx, dy] = self.top_args()?;
                    sink.rlineto(dx, dy);
                }
            }
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=18>
            RLineCurve => {
                self.stack.verify_at_least_len(8)?;
                let len = self.stack.len();
                let mut i = 0;
                while i + 2 <= len - 6 {
                    let [dx, dy] = self.stack.fixed_array::<2>(i)?;
                    sink.rlineto(dx, dy);
                    i += 2;
                }
                self.emit_curve(len - 6, sink)?;
            }
            // Curves that start and end vertical, unless the stack count is
            // odd, in which case the first curve may start with a horizontal
            // tangent.
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=18>
            VvCurveTo => {
                self.stack.verify_at_least_len(4)?;
                let len = self.stack.len();
                let mut i = 0;
                let mut dx1 = Fixed::ZERO;
                if len & 1 != 0 {
                    dx1 = self.stack.get_fixed(0)?;
                    i = 1;
                }
                while i + 4 <= len {
                    let [dya, dxb, dyb, dyc] = self.stack.fixed_array::<4>(i)?;
                    sink.rcurveto(dx1, dya, dxb, dyb, Fixed::ZERO, dyc);
                    dx1 = Fixed::ZERO;
                    i += 4;
                }
            }
            // Curves that start and end horizontal, unless the stack count
            // is odd, in which case the first curve may start with a
            // vertical tangent.
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=17>
            HhCurveTo => {
                self.stack.verify_at_least_len(4)?;
                let len = self.stack.len();
                let mut i = 0;
                let mut dy1 = Fixed::ZERO;
                if len & 1 != 0 {
                    dy1 = self.stack.get_fixed(0)?;
                    i = 1;
                }
                while i + 4 <= len {
                    let [dxa, dxb, dyb, dxc] = self.stack.fixed_array::<4>(i)?;
                    sink.rcurveto(dxa, dy1, dxb, dyb, dxc, Fixed::ZERO);
                    dy1 = Fixed::ZERO;
                    i += 4;
                }
            }
            // Curves alternating between horizontal and vertical tangents.
            // A fifth argument in the final group gives the last coordinate
            // that would otherwise be zero.
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=17>
            HvCurveTo | VhCurveTo => {
                self.stack.verify_at_least_len(4)?;
                let len = self.stack.len();
                let mut horizontal = operator == HvCurveTo;
                let mut i = 0;
                while i + 4 <= len {
                    let [a, b, c, d] = self.stack.fixed_array::<4>(i)?;
                    let last = if len - i == 5 {
                        self.stack.get_fixed(i + 4)?
                    } else {
                        Fixed::ZERO
                    };
                    if horizontal {
                        sink.rcurveto(a, Fixed::ZERO, b, c, last, d);
                    } else {
                        sink.rcurveto(Fixed::ZERO, a, b, c, d, last);
                    }
                    horizontal = !horizontal;
                    i += 4;
                }
            }
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=18>
            Flex => {
                let args = self.stack.fixed_array::<13>(0)?;
                let mut curves = [Fixed::ZERO; 12];
                curves.copy_from_slice(&args[..12]);
                // Flex depth is given in hundredths of a device pixel
                let depth = Fixed::from_f64(args[12].to_f64() / 100.0);
                sink.flex(curves, depth);
            }
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=19>
            HFlex => {
                let [dx1, dx2, dy2, dx3, dx4, dx5, dx6] = self.stack.fixed_array::<7>(0)?;
                let zero = Fixed::ZERO;
                sink.flex(
                    [dx1, zero, dx2, dy2, dx3, zero, dx4, zero, dx5, -dy2, dx6, zero],
                    Fixed::HALF,
                );
            }
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=19>
            HFlex1 => {
                let [dx1, dy1, dx2, dy2, dx3, dx4, dx5, dy5, dx6] =
                    self.stack.fixed_array::<9>(0)?;
                let zero = Fixed::ZERO;
                let dy6 = -(dy1.wrapping_add(dy2).wrapping_add(dy5));
                sink.flex(
                    [dx1, dy1, dx2, dy2, dx3, zero, dx4, zero, dx5, dy5, dx6, dy6],
                    Fixed::HALF,
                );
            }
            // The last argument is the x or y delta of the final point,
            // depending on the dominant direction of the whole flex.
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=20>
            Flex1 => {
                let args = self.stack.fixed_array::<11>(0)?;
                let mut dx = Fixed::ZERO;
                let mut dy = Fixed::ZERO;
                for pair in args[..10].chunks_exact(2) {
                    dx = dx.wrapping_add(pair[0]);
                    dy = dy.wrapping_add(pair[1]);
                }
                let mut curves = [Fixed::ZERO; 12];
                curves[..10].copy_from_slice(&args[..10]);
                if dx.abs() > dy.abs() {
                    curves[10] = args[10];
                    curves[11] = -dy;
                } else {
                    curves[10] = -dx;
                    curves[11] = args[10];
                }
                sink.flex(curves, Fixed::HALF);
            }
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=21>
            EndChar => {
                if self.stack.len() >= 4 {
                    // Implied seac: adx ady bchar achar
                    let [adx, ady, bchar, achar] = self.top_args()?;
                    self.start_seac(bchar.to_i32(), achar.to_i32(), Point::new(adx, ady))?;
                    return Ok(Flow::Continue);
                }
                return self.end_char(sink);
            }
            DotSection => {
                sink.dotsection();
            }
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=29>
            CallSubr | CallGsubr => {
                if self.stack.is_empty() {
                    log::warn!("subroutine call without an index");
                    return Ok(Flow::Continue);
                }
                let index = self.stack.pop_i32()?;
                self.call_subr(index, operator == CallGsubr)?;
                return Ok(Flow::Continue);
            }
            Return => {
                self.return_from_subr()?;
                return Ok(Flow::Continue);
            }
            // Multiple master blend: n values followed by n * (k - 1) deltas
            Blend => {
                let count = self.stack.pop_i32()?;
                let count = usize::try_from(count).map_err(|_| Error::InvalidBlend)?;
                let total = count * self.weight_vector.values().len();
                let first = self
                    .stack
                    .len()
                    .checked_sub(total)
                    .ok_or(Error::StackUnderflow)?;
                self.blend(first, count)?;
                return Ok(Flow::Continue);
            }
            _ => {
                self.evaluate_arithmetic(operator)?;
                return Ok(Flow::Continue);
            }
        }
        self.stack.clear();
        Ok(Flow::Continue)
    }

    /// Returns whether an operator that may be the first stack clearing
    /// operator of the glyph carries an explicit width operand, or `None`
    /// if the operator never establishes the width.
    fn first_operator_width(&self, operator: Operator) -> Option<bool> {
        use Operator::*;
        let len = self.stack.len();
        Some(match operator {
            HStem | VStem | HStemHm | VStemHm | RMoveTo | HintMask | CntrMask => len & 1 != 0,
            HMoveTo | VMoveTo => len > 1,
            EndChar if len >= 4 => len > 4,
            EndChar => len >= 1,
            RLineTo | HLineTo | VLineTo | RrCurveTo | RCurveLine | RLineCurve | VvCurveTo
            | HhCurveTo | VhCurveTo | HvCurveTo | HFlex | Flex | HFlex1 | Flex1 | DotSection => {
                false
            }
            _ => return None,
        })
    }

    /// Handles the optional width operand. Returns true if evaluation must
    /// pause for width resolution.
    fn check_width(
        &mut self,
        has_width: bool,
        saved: Cursor<'a>,
        sink: &mut impl CharstringSink,
    ) -> Result<bool, Error> {
        match self.component {
            Component::Glyph => {
                if self.init != InitState::Pending {
                    return Ok(false);
                }
                let dict = self.font.private_dict();
                let width = if has_width {
                    dict.nominal_width_x
                        .wrapping_add(self.stack.get_fixed(0)?)
                } else {
                    dict.default_width_x
                };
                self.explicit_width = has_width;
                let metrics =
                    SideBearingWidth::new(Point::default(), Point::new(width, Fixed::ZERO));
                Ok(self.request_width(metrics, saved))
            }
            _ => {
                if !self.component_started {
                    if has_width {
                        self.stack.remove(0)?;
                    }
                    self.start_component_outline(Point::default(), sink);
                }
                Ok(false)
            }
        }
    }

    /// Emits stem hints from pairs of arguments, stopping `reserved`
    /// arguments before the top of the stack.
    fn emit_stems(
        &mut self,
        reserved: usize,
        is_horizontal: bool,
        sink: &mut impl CharstringSink,
    ) -> Result<(), Error> {
        let end = self.stack.len().saturating_sub(reserved);
        let mut u = Fixed::ZERO;
        let mut i = 0;
        while i + 2 <= end {
            let [du, w] = self.stack.fixed_array::<2>(i)?;
            u = u.wrapping_add(du);
            if is_horizontal {
                sink.hstem(u, w);
            } else {
                sink.vstem(u, w);
            }
            u = u.wrapping_add(w);
            self.stem_count += 1;
            i += 2;
        }
        Ok(())
    }

    fn emit_curve(&mut self, first: usize, sink: &mut impl CharstringSink) -> Result<(), Error> {
        let [dx1, dy1, dx2, dy2, dx3, dy3] = self.stack.fixed_array::<6>(first)?;
        sink.rcurveto(dx1, dy1, dx2, dy2, dx3, dy3);
        Ok(())
    }

    /// Arithmetic, storage and conditional operators.
    ///
    /// See "4.4 Arithmetic Operators" through "4.6 Conditional Operators" at
    /// <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=25>
    fn evaluate_arithmetic(&mut self, operator: Operator) -> Result<(), Error> {
        use Operator::*;
        let stack = &mut self.stack;
        match operator {
            Clear => stack.clear(),
            Abs => {
                let a = stack.pop_fixed()?;
                stack.push(a.abs())?;
            }
            Add => {
                let b = stack.pop_fixed()?;
                let a = stack.pop_fixed()?;
                stack.push(a.wrapping_add(b))?;
            }
            Sub => {
                let b = stack.pop_fixed()?;
                let a = stack.pop_fixed()?;
                stack.push(a.wrapping_sub(b))?;
            }
            Div => {
                let b = stack.pop()?;
                let a = stack.pop()?;
                if b.is_zero() {
                    return Err(Error::DivisionByZero);
                }
                stack.push(Fixed::from_f64(a.to_f64() / b.to_f64()))?;
            }
            Neg => {
                let a = stack.pop_fixed()?;
                stack.push(-a)?;
            }
            Mul => {
                let b = stack.pop_fixed()?;
                let a = stack.pop_fixed()?;
                stack.push(a.mul(b))?;
            }
            Sqrt => {
                let a = stack.pop_fixed()?;
                let root = if a >= Fixed::ZERO {
                    Fixed::from_f64(a.to_f64().sqrt())
                } else {
                    a
                };
                stack.push(root)?;
            }
            And | Or => {
                let b = stack.pop()?;
                let a = stack.pop()?;
                let value = if operator == And {
                    !a.is_zero() && !b.is_zero()
                } else {
                    !a.is_zero() || !b.is_zero()
                };
                stack.push(value as i32)?;
            }
            Not => {
                let a = stack.pop()?;
                stack.push(a.is_zero() as i32)?;
            }
            Eq => {
                let b = stack.pop_fixed()?;
                let a = stack.pop_fixed()?;
                stack.push((a == b) as i32)?;
            }
            IfElse => {
                let v2 = stack.pop_fixed()?;
                let v1 = stack.pop_fixed()?;
                let s2 = stack.pop()?;
                let s1 = stack.pop()?;
                stack.push(if v1 <= v2 { s1 } else { s2 })?;
            }
            Drop => {
                stack.pop()?;
            }
            Dup => {
                let a = stack.pop()?;
                stack.push(a)?;
                stack.push(a)?;
            }
            Exch => {
                let b = stack.pop()?;
                let a = stack.pop()?;
                stack.push(b)?;
                stack.push(a)?;
            }
            Index => {
                let index = stack.pop_i32()?;
                stack.index(index)?;
            }
            Roll => {
                let shift = stack.pop_i32()?;
                let count = stack.pop_i32()?;
                stack.roll(count, shift)?;
            }
            Put => {
                let index = stack.pop_i32()?;
                let value = stack.pop()?;
                *transient_entry(&mut self.transient, index)? = value;
            }
            Get => {
                let index = stack.pop_i32()?;
                let value = *transient_entry(&mut self.transient, index)?;
                stack.push(value)?;
            }
            Random => {
                let value = self.next_random();
                self.stack.push(value)?;
            }
            // Copies transient array elements into a registry object
            Store => {
                let count = stack.pop_i32()?;
                let transient_index = stack.pop_i32()?;
                let registry_index = stack.pop_i32()?;
                let registry = stack.pop_i32()?;
                if registry != WEIGHT_VECTOR_REGISTRY {
                    return Err(Error::InvalidRegistry(registry));
                }
                let source = transient_range(&self.transient, transient_index, count)?;
                let target = registry_range(
                    self.weight_vector.values_mut(),
                    registry_index,
                    count,
                )?;
                for (target, source) in target.iter_mut().zip(source) {
                    *target = source.to_fixed();
                }
            }
            // Copies a registry object into the transient array
            Load => {
                let count = stack.pop_i32()?;
                let transient_index = stack.pop_i32()?;
                let registry = stack.pop_i32()?;
                if registry != WEIGHT_VECTOR_REGISTRY {
                    return Err(Error::InvalidRegistry(registry));
                }
                let weights = self.weight_vector;
                let source = weights
                    .values()
                    .get(..count.max(0) as usize)
                    .ok_or(Error::InvalidRegistryRange)?;
                // Validate the destination before writing anything
                transient_range(&self.transient, transient_index, count)?;
                let start = transient_index as usize;
                for (i, weight) in source.iter().enumerate() {
                    self.transient[start + i] = Number::Fixed(*weight);
                }
            }
            // Path, hint and subroutine operators are handled by the caller
            _ => {}
        }
        Ok(())
    }
}

fn transient_entry(
    transient: &mut [Number; TRANSIENT_ARRAY_SIZE],
    index: i32,
) -> Result<&mut Number, Error> {
    usize::try_from(index)
        .ok()
        .and_then(|i| transient.get_mut(i))
        .ok_or(Error::InvalidTransientIndex(index))
}

fn transient_range(transient: &[Number], start: i32, count: i32) -> Result<&[Number], Error> {
    let (Ok(start_ix), Ok(count_ix)) = (usize::try_from(start), usize::try_from(count)) else {
        return Err(Error::InvalidTransientIndex(start));
    };
    transient
        .get(start_ix..start_ix + count_ix)
        .ok_or(Error::InvalidTransientIndex(start.saturating_add(count)))
}

fn registry_range(registry: &mut [Fixed], start: i32, count: i32) -> Result<&mut [Fixed], Error> {
    let (Ok(start), Ok(count)) = (usize::try_from(start), usize::try_from(count)) else {
        return Err(Error::InvalidRegistryRange);
    };
    registry
        .get_mut(start..start + count)
        .ok_or(Error::InvalidRegistryRange)
}

/// Type 2 charstring operator.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(super) enum Operator {
    HStem,
    VStem,
    VMoveTo,
    RLineTo,
    HLineTo,
    VLineTo,
    RrCurveTo,
    CallSubr,
    Return,
    EndChar,
    Clear,
    Blend,
    HStemHm,
    HintMask,
    CntrMask,
    RMoveTo,
    HMoveTo,
    VStemHm,
    RCurveLine,
    RLineCurve,
    VvCurveTo,
    HhCurveTo,
    CallGsubr,
    VhCurveTo,
    HvCurveTo,
    DotSection,
    And,
    Or,
    Not,
    Store,
    Abs,
    Add,
    Sub,
    Div,
    Load,
    Neg,
    Eq,
    Drop,
    Put,
    Get,
    IfElse,
    Random,
    Mul,
    Sqrt,
    Dup,
    Exch,
    Index,
    Roll,
    HFlex,
    Flex,
    HFlex1,
    Flex1,
}

impl Operator {
    pub fn read(cursor: &mut Cursor, b0: u8) -> Result<Self, Error> {
        // Escape opcode for accessing two byte operators
        const ESCAPE: u8 = 12;
        if b0 == ESCAPE {
            let b1 = cursor.read_u8()?;
            Self::from_two_byte_opcode(b1).ok_or(Error::InvalidEscapeOperator(b1))
        } else {
            Self::from_opcode(b0).ok_or(Error::InvalidOperator(b0))
        }
    }

    fn from_opcode(opcode: u8) -> Option<Self> {
        use Operator::*;
        Some(match opcode {
            1 => HStem,
            3 => VStem,
            4 => VMoveTo,
            5 => RLineTo,
            6 => HLineTo,
            7 => VLineTo,
            8 => RrCurveTo,
            10 => CallSubr,
            11 => Return,
            14 => EndChar,
            // Undocumented, but used by some old fonts
            15 => Clear,
            16 => Blend,
            18 => HStemHm,
            19 => HintMask,
            20 => CntrMask,
            21 => RMoveTo,
            22 => HMoveTo,
            23 => VStemHm,
            24 => RCurveLine,
            25 => RLineCurve,
            26 => VvCurveTo,
            27 => HhCurveTo,
            29 => CallGsubr,
            30 => VhCurveTo,
            31 => HvCurveTo,
            _ => return None,
        })
    }

    fn from_two_byte_opcode(opcode: u8) -> Option<Self> {
        use Operator::*;
        Some(match opcode {
            // Deprecated, retained for compatibility with Type 1
            0 => DotSection,
            3 => And,
            4 => Or,
            5 => Not,
            8 => Store,
            9 => Abs,
            10 => Add,
            11 => Sub,
            12 => Div,
            13 => Load,
            14 => Neg,
            15 => Eq,
            18 => Drop,
            20 => Put,
            21 => Get,
            22 => IfElse,
            23 => Random,
            24 => Mul,
            26 => Sqrt,
            27 => Dup,
            28 => Exch,
            29 => Index,
            30 => Roll,
            34 => HFlex,
            35 => Flex,
            36 => HFlex1,
            37 => Flex1,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use font_test_data::charstring::assemble_type2;
    use pretty_assertions::assert_eq;

    use super::super::test_sink::{fx, pt, CaptureSink, Command, Command::*};
    use crate::{
        evaluate, CharstringFont, CharstringKind, Error, Fixed, Interpreter, PrivateDict,
        Progress, SideBearingWidth, WeightVector,
    };

    fn font() -> CharstringFont {
        let mut dict = PrivateDict::default();
        dict.default_width_x = Fixed::from_i32(500);
        dict.nominal_width_x = Fixed::from_i32(600);
        CharstringFont::new(CharstringKind::Type2, dict)
    }

    fn run(font: &CharstringFont, source: &str) -> Result<Vec<Command>, Error> {
        let charstring = assemble_type2(source);
        let mut sink = CaptureSink::default();
        evaluate(font, &charstring, &mut sink)?;
        Ok(sink.0)
    }

    #[test]
    fn default_width() {
        let _ = env_logger::builder().is_test(true).try_init();
        let commands = run(&font(), "10 20 rmoveto 30 hlineto endchar").unwrap();
        assert_eq!(
            commands,
            vec![
                Sbw(pt(0, 0), pt(500, 0)),
                MoveTo(fx(10), fx(20)),
                LineTo(fx(30), fx(0)),
            ]
        );
    }

    #[test]
    fn explicit_width_on_stems() {
        let commands = run(&font(), "-50 0 20 100 30 hstem 10 vmoveto endchar").unwrap();
        assert_eq!(
            commands,
            vec![
                Sbw(pt(0, 0), pt(550, 0)),
                HStem(fx(0), fx(20)),
                HStem(fx(120), fx(30)),
                MoveTo(fx(0), fx(10)),
            ]
        );
    }

    #[test]
    fn explicit_width_on_moveto_and_endchar() {
        let commands = run(&font(), "25 5 hmoveto endchar").unwrap();
        assert_eq!(commands[0], Sbw(pt(0, 0), pt(625, 0)));
        assert_eq!(commands[1], MoveTo(fx(5), fx(0)));
        let commands = run(&font(), "-100 endchar").unwrap();
        assert_eq!(commands, vec![Sbw(pt(0, 0), pt(500, 0))]);
    }

    #[test]
    fn resumes_on_width_operator() {
        let font = font();
        let charstring = assemble_type2("7 10 20 rmoveto endchar");
        let mut sink = CaptureSink::default();
        let mut interpreter = Interpreter::new(&font, &charstring);
        assert_eq!(
            interpreter.run(&mut sink).unwrap(),
            Progress::NeedWidth(SideBearingWidth::new(pt(0, 0), pt(607, 0)))
        );
        interpreter.set_width(SideBearingWidth::new(pt(0, 0), pt(700, 0)));
        assert_eq!(interpreter.run(&mut sink).unwrap(), Progress::Done);
        assert_eq!(
            sink.0,
            vec![Sbw(pt(0, 0), pt(700, 0)), MoveTo(fx(10), fx(20))]
        );
    }

    #[test]
    fn hint_mask_implies_vstems() {
        let commands = run(
            &font(),
            "0 10 hstem 20 30 hintmask #c0 0 0 rmoveto endchar",
        )
        .unwrap();
        assert_eq!(
            &commands[1..],
            &[
                HStem(fx(0), fx(10)),
                VStem(fx(20), fx(30)),
                HintMask(vec![0xc0]),
                MoveTo(fx(0), fx(0)),
            ]
        );
    }

    #[test]
    fn hint_mask_length_follows_stem_count() {
        let stems = "0 1 2 1 4 1 6 1 8 1 10 1 12 1 14 1 16 1 hstemhm";
        let source = format!("{stems} hintmask #ff #80 cntrmask #01 #02 0 0 rmoveto endchar");
        let commands = run(&font(), &source).unwrap();
        assert_eq!(commands[10], HintMask(vec![0xff, 0x80]));
        assert_eq!(commands[11], CounterMask(vec![0x01, 0x02]));
    }

    #[test]
    fn curve_operators() {
        let commands = run(
            &font(),
            "0 0 rmoveto 1 2 3 4 5 hvcurveto 6 1 2 3 4 vvcurveto \
             1 2 3 4 5 6 7 8 rcurveline 1 2 3 4 5 6 7 8 rlinecurve endchar",
        )
        .unwrap();
        assert_eq!(
            &commands[2..],
            &[
                CurveTo(fx(1), fx(0), fx(2), fx(3), fx(5), fx(4)),
                CurveTo(fx(6), fx(1), fx(2), fx(3), fx(0), fx(4)),
                CurveTo(fx(1), fx(2), fx(3), fx(4), fx(5), fx(6)),
                LineTo(fx(7), fx(8)),
                LineTo(fx(1), fx(2)),
                CurveTo(fx(3), fx(4), fx(5), fx(6), fx(7), fx(8)),
            ]
        );
    }

    #[test]
    fn alternating_curves() {
        let commands = run(
            &font(),
            "0 0 rmoveto 1 2 3 4 5 6 7 8 vhcurveto 1 2 3 4 hhcurveto endchar",
        )
        .unwrap();
        assert_eq!(
            &commands[2..],
            &[
                CurveTo(fx(0), fx(1), fx(2), fx(3), fx(4), fx(0)),
                CurveTo(fx(5), fx(0), fx(6), fx(7), fx(0), fx(8)),
                CurveTo(fx(1), fx(0), fx(2), fx(3), fx(4), fx(0)),
            ]
        );
    }

    #[test]
    fn flex_variants() {
        let commands = run(
            &font(),
            "0 0 rmoveto 1 2 3 4 5 6 7 8 9 10 11 12 50 flex \
             1 2 3 4 5 6 7 hflex 1 2 3 4 5 6 7 8 9 hflex1 \
             10 1 10 1 10 1 10 -1 10 -1 10 flex1 endchar",
        )
        .unwrap();
        let f = |values: [i32; 12]| values.map(fx);
        assert_eq!(
            &commands[2..],
            &[
                Flex(
                    f([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]),
                    Fixed::from_f64(0.5)
                ),
                Flex(f([1, 0, 2, 3, 4, 0, 5, 0, 6, -3, 7, 0]), Fixed::HALF),
                Flex(f([1, 2, 3, 4, 5, 0, 6, 0, 7, 8, 9, -14]), Fixed::HALF),
                Flex(f([10, 1, 10, 1, 10, 1, 10, -1, 10, -1, 10, -1]), Fixed::HALF),
            ]
        );
    }

    #[test]
    fn arithmetic() {
        // (3 + 4) * 2 - 1 = 13; 13 / 2 = 6.5; abs(neg(6.5)) = 6.5
        let commands = run(
            &font(),
            "3 4 add 2 mul 1 sub 2 div neg abs 0 rlineto endchar",
        )
        .unwrap();
        assert_eq!(commands[1], LineTo(Fixed::from_f64(6.5), fx(0)));
        let commands = run(&font(), "16 sqrt 2 exch rlineto endchar").unwrap();
        assert_eq!(commands[1], LineTo(fx(2), fx(4)));
    }

    #[test]
    fn logic_and_conditionals() {
        let commands = run(
            &font(),
            "1 0 and 1 0 or 0 not 5 5 eq rlineto 10 20 1 2 ifelse 10 20 2 1 ifelse rlineto endchar",
        )
        .unwrap();
        assert_eq!(
            &commands[1..],
            &[LineTo(fx(0), fx(1)), LineTo(fx(1), fx(1)), LineTo(fx(10), fx(20))]
        );
    }

    #[test]
    fn stack_manipulation() {
        let commands = run(
            &font(),
            "1 2 3 3 1 roll drop rlineto 7 dup rlineto 5 6 1 index rlineto endchar",
        )
        .unwrap();
        assert_eq!(
            &commands[1..],
            &[LineTo(fx(3), fx(1)), LineTo(fx(7), fx(7)), LineTo(fx(5), fx(6))]
        );
    }

    #[test]
    fn transient_array() {
        let commands = run(&font(), "42 3 put 3 get 3 get rlineto endchar").unwrap();
        assert_eq!(commands[1], LineTo(fx(42), fx(42)));
        assert_eq!(
            run(&font(), "1 32 put"),
            Err(Error::InvalidTransientIndex(32))
        );
        assert_eq!(
            run(&font(), "-1 get"),
            Err(Error::InvalidTransientIndex(-1))
        );
    }

    #[test]
    fn registry_store_and_load() {
        let mut font = font();
        font.private_dict_mut().weight_vector =
            WeightVector::new([0.5, 0.5].into_iter().map(Fixed::from_f64));
        // Replace the weights with (0.25, 0.75) and blend 100 + 40 * 0.75
        let commands = run(
            &font,
            "0.25 0 put 0.75 1 put 0 0 0 2 store 100 40 1 blend 0 rlineto \
             0 5 2 load 6 get 0 rlineto endchar",
        )
        .unwrap();
        assert_eq!(
            &commands[1..],
            &[LineTo(fx(130), fx(0)), LineTo(Fixed::from_f64(0.75), fx(0))]
        );
        assert_eq!(
            run(&font, "1 0 0 1 store"),
            Err(Error::InvalidRegistry(1))
        );
        assert_eq!(
            run(&font, "0 1 0 2 store"),
            Err(Error::InvalidRegistryRange)
        );
    }

    #[test]
    fn random_is_deterministic() {
        let source = "random random rlineto endchar";
        let first = run(&font(), source).unwrap();
        let second = run(&font(), source).unwrap();
        assert_eq!(first, second);
        let LineTo(dx, dy) = first[1] else {
            panic!("expected a line");
        };
        for value in [dx, dy] {
            assert!(value > Fixed::ZERO && value <= Fixed::ONE);
        }
    }

    #[test]
    fn subroutines_are_biased() {
        let font = font()
            .with_subrs(vec![assemble_type2("1 2 rlineto return")])
            .with_global_subrs(vec![assemble_type2("3 4 rlineto")]);
        let commands = run(&font, "0 0 rmoveto -107 callsubr -107 callgsubr 5 callsubr endchar")
            .unwrap();
        assert_eq!(
            &commands[2..],
            &[LineTo(fx(1), fx(2)), LineTo(fx(3), fx(4))]
        );
    }

    #[test]
    fn implied_seac() {
        let font = font()
            .with_seac_component(97, assemble_type2("0 0 rmoveto endchar"))
            .with_seac_component(194, assemble_type2("100 10 10 rmoveto endchar"));
        let commands = run(&font, "450 150 200 97 194 endchar").unwrap();
        assert_eq!(
            commands,
            vec![
                Sbw(pt(0, 0), pt(1050, 0)),
                SbwSeac(pt(0, 0)),
                MoveTo(fx(0), fx(0)),
                EndSubglyph,
                SbwSeac(pt(150, 200)),
                MoveTo(fx(10), fx(10)),
            ]
        );
    }

    #[test]
    fn invalid_operators() {
        assert_eq!(run(&font(), "0 0 rmoveto 2"), Err(Error::InvalidOperator(2)));
        assert_eq!(
            run(&font(), "1 2 #0c #26"),
            Err(Error::InvalidEscapeOperator(0x26))
        );
        assert_eq!(run(&font(), "1 0 div"), Err(Error::DivisionByZero));
    }
}
