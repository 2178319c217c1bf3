//! Type 1 charstring operators.
//!
//! See "6 CharString Commands" at
//! <https://adobe-type-tools.github.io/font-tech-notes/pdfs/T1_SPEC.pdf#page=55>

use ps_types::{Fixed, Point};

use super::{Component, Flow, Interpreter, SideBearingWidth};
use crate::{cursor::Cursor, CharstringSink, CharstringSource, Error};

/// Number of blended values produced by the multiple master othersubrs
/// 14 through 18.
const BLEND_RESULT_COUNTS: [usize; 5] = [1, 2, 3, 4, 6];

impl<'a, F: CharstringSource> Interpreter<'a, F> {
    pub(super) fn evaluate_type1(
        &mut self,
        operator: Operator,
        saved: Cursor<'a>,
        sink: &mut impl CharstringSink,
    ) -> Result<Flow, Error> {
        use Operator::*;
        match operator {
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/T1_SPEC.pdf#page=61>
            Hsbw => {
                let [sbx, wx] = self.top_args()?;
                let metrics = SideBearingWidth::new(
                    Point::new(sbx, Fixed::ZERO),
                    Point::new(wx, Fixed::ZERO),
                );
                return self.set_side_bearing_width(metrics, saved, sink);
            }
            Sbw => {
                let [sbx, sby, wx, wy] = self.top_args()?;
                let metrics = SideBearingWidth::new(Point::new(sbx, sby), Point::new(wx, wy));
                return self.set_side_bearing_width(metrics, saved, sink);
            }
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/T1_SPEC.pdf#page=62>
            HStem => {
                self.require_width()?;
                let [y, dy] = self.top_args()?;
                sink.hstem(y, dy);
            }
            VStem => {
                self.require_width()?;
                let [x, dx] = self.top_args()?;
                sink.vstem(x, dx);
            }
            HStem3 => {
                self.require_width()?;
                let [y0, dy0, y1, dy1, y2, dy2] = self.top_args()?;
                sink.hstem3([(y0, dy0), (y1, dy1), (y2, dy2)]);
            }
            VStem3 => {
                self.require_width()?;
                let [x0, dx0, x1, dx1, x2, dx2] = self.top_args()?;
                sink.vstem3([(x0, dx0), (x1, dx1), (x2, dx2)]);
            }
            DotSection => {
                self.require_width()?;
                sink.dotsection();
            }
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/T1_SPEC.pdf#page=59>
            RMoveTo => {
                self.require_width()?;
                let [dx, dy] = self.top_args()?;
                sink.rmoveto(dx, dy);
            }
            HMoveTo => {
                self.require_width()?;
                let [dx] = self.top_args()?;
                sink.rmoveto(dx, Fixed::ZERO);
            }
            VMoveTo => {
                self.require_width()?;
                let [dy] = self.top_args()?;
                sink.rmoveto(Fixed::ZERO, dy);
            }
            RLineTo => {
                self.require_width()?;
                let [dx, dy] = self.top_args()?;
                sink.rlineto(dx, dy);
            }
            HLineTo => {
                self.require_width()?;
                let [dx] = self.top_args()?;
                sink.rlineto(dx, Fixed::ZERO);
            }
            VLineTo => {
                self.require_width()?;
                let [dy] = self.top_args()?;
                sink.rlineto(Fixed::ZERO, dy);
            }
            RrCurveTo => {
                self.require_width()?;
                let [dx1, dy1, dx2, dy2, dx3, dy3] = self.top_args()?;
                sink.rcurveto(dx1, dy1, dx2, dy2, dx3, dy3);
            }
            // A curve that starts vertical and ends horizontal
            VhCurveTo => {
                self.require_width()?;
                let [dy1, dx2, dy2, dx3] = self.top_args()?;
                sink.rcurveto(Fixed::ZERO, dy1, dx2, dy2, dx3, Fixed::ZERO);
            }
            // A curve that starts horizontal and ends vertical
            HvCurveTo => {
                self.require_width()?;
                let [dx1, dx2, dy2, dy3] = self.top_args()?;
                sink.rcurveto(dx1, Fixed::ZERO, dx2, dy2, Fixed::ZERO, dy3);
            }
            ClosePath => {
                self.require_width()?;
                sink.closepath();
            }
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/T1_SPEC.pdf#page=63>
            SetCurrentPoint => {
                self.require_width()?;
                let [x, y] = self.top_args()?;
                let offset = self.absolute_offset();
                sink.set_current_point(x.wrapping_add(offset.x), y.wrapping_add(offset.y));
            }
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/T1_SPEC.pdf#page=61>
            EndChar => {
                self.require_width()?;
                return self.end_char(sink);
            }
            // Standard encoding accented character
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/T1_SPEC.pdf#page=61>
            Seac => {
                self.require_width()?;
                let [asb, adx, ady, bchar, achar] = self.top_args()?;
                let accent_offset = Point::new(adx.wrapping_sub(asb), ady);
                self.start_seac(bchar.to_i32(), achar.to_i32(), accent_offset)?;
                return Ok(Flow::Continue);
            }
            // Spec: <https://adobe-type-tools.github.io/font-tech-notes/pdfs/T1_SPEC.pdf#page=64>
            Div => {
                let divisor = self.stack.pop()?;
                let dividend = self.stack.pop()?;
                if divisor.is_zero() {
                    return Err(Error::DivisionByZero);
                }
                self.stack
                    .push(Fixed::from_f64(dividend.to_f64() / divisor.to_f64()))?;
                return Ok(Flow::Continue);
            }
            CallSubr => {
                let index = self.stack.pop_i32()?;
                self.call_subr(index, false)?;
                return Ok(Flow::Continue);
            }
            Return => {
                self.return_from_subr()?;
                return Ok(Flow::Continue);
            }
            CallOtherSubr => {
                let index = self.stack.pop_i32()?;
                let count = self.stack.pop_i32()?;
                let first = usize::try_from(count)
                    .ok()
                    .and_then(|count| self.stack.len().checked_sub(count))
                    .ok_or(Error::InvalidOtherSubrArgs(count))?;
                self.call_other_subr(index, first, sink)?;
                return Ok(Flow::Continue);
            }
            Pop => {
                let result = self.next_result()?;
                self.stack.push(result)?;
                return Ok(Flow::Continue);
            }
            Clear => {}
        }
        self.stack.clear();
        Ok(Flow::Continue)
    }

    fn set_side_bearing_width(
        &mut self,
        metrics: SideBearingWidth,
        saved: Cursor<'a>,
        sink: &mut impl CharstringSink,
    ) -> Result<Flow, Error> {
        match self.component {
            Component::Glyph => {
                if self.request_width(metrics, saved) {
                    return Ok(Flow::NeedWidth);
                }
            }
            _ => {
                // Component metrics only position the component
                if !self.component_started {
                    self.start_component_outline(metrics.side_bearing, sink);
                }
            }
        }
        self.stack.clear();
        Ok(Flow::Continue)
    }

    /// Executes one of the standard othersubrs with the arguments on the
    /// stack starting at `first`.
    ///
    /// See "8 Using Subroutines" at
    /// <https://adobe-type-tools.github.io/font-tech-notes/pdfs/T1_SPEC.pdf#page=77>
    fn call_other_subr(
        &mut self,
        index: i32,
        first: usize,
        sink: &mut impl CharstringSink,
    ) -> Result<(), Error> {
        let count = self.stack.len() - first;
        match index {
            // Flex end: flex height, end x, end y; leaves the end point
            0 => {
                if count != 3 {
                    return Err(Error::InvalidOtherSubrArgs(count as i32));
                }
                if self.flex_points != Some(8) {
                    return Err(Error::InvalidFlexSequence);
                }
                self.flex_points = None;
                let height = self.stack.get_fixed(first)?;
                sink.flex_end(height);
                self.set_results(first + 1)?;
                self.stack.truncate(first);
            }
            // Flex begin
            1 => {
                if self.flex_points.is_some() {
                    return Err(Error::InvalidFlexSequence);
                }
                self.flex_points = Some(1);
                sink.flex_begin();
                self.set_results(first)?;
            }
            // Flex point
            2 => {
                let points = self.flex_points.ok_or(Error::InvalidFlexSequence)?;
                if points >= 8 {
                    return Err(Error::InvalidFlexSequence);
                }
                self.flex_points = Some(points + 1);
                sink.flex_point();
                self.set_results(first)?;
            }
            // Hint replacement; leaves the subroutine number
            3 => {
                if count != 1 {
                    return Err(Error::InvalidOtherSubrArgs(count as i32));
                }
                sink.replace_hints();
                self.set_results(first)?;
            }
            // Counter control is not used by the hinter
            12 | 13 => {
                self.stack.truncate(first);
                self.result_len = 0;
                self.result_pos = 0;
            }
            // Multiple master blends
            14..=18 => {
                let values = BLEND_RESULT_COUNTS[(index - 14) as usize];
                if count != values * self.weight_vector.values().len() {
                    return Err(Error::InvalidBlend);
                }
                self.blend(first, values)?;
                self.set_results(first)?;
            }
            _ => {
                log::warn!("unknown othersubr {index} with {count} arguments");
                self.set_results(first)?;
            }
        }
        Ok(())
    }
}

/// Type 1 charstring operator.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(super) enum Operator {
    HStem,
    VStem,
    VMoveTo,
    RLineTo,
    HLineTo,
    VLineTo,
    RrCurveTo,
    ClosePath,
    CallSubr,
    Return,
    Hsbw,
    EndChar,
    Clear,
    RMoveTo,
    HMoveTo,
    VhCurveTo,
    HvCurveTo,
    DotSection,
    VStem3,
    HStem3,
    Seac,
    Sbw,
    Div,
    CallOtherSubr,
    Pop,
    SetCurrentPoint,
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
            9 => ClosePath,
            10 => CallSubr,
            11 => Return,
            13 => Hsbw,
            14 => EndChar,
            // Undocumented, but used by some old fonts
            15 => Clear,
            21 => RMoveTo,
            22 => HMoveTo,
            30 => VhCurveTo,
            31 => HvCurveTo,
            _ => return None,
        })
    }

    fn from_two_byte_opcode(opcode: u8) -> Option<Self> {
        use Operator::*;
        Some(match opcode {
            0 => DotSection,
            1 => VStem3,
            2 => HStem3,
            6 => Seac,
            7 => Sbw,
            12 => Div,
            16 => CallOtherSubr,
            17 => Pop,
            33 => SetCurrentPoint,
            _ => return None,
        })
    }
}
