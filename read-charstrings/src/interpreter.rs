//! Resumable charstring interpreter.

mod type1;
mod type2;

use ps_types::{Fixed, Point};

use super::{
    cipher::CHARSTRING_KEY,
    cursor::Cursor,
    number::read_number,
    source::subr_bias,
    stack::{Stack, MAX_STACK},
    CharstringKind, CharstringSink, CharstringSource, Error, Number, WeightVector,
    NESTING_DEPTH_LIMIT,
};

/// Number of entries in the Type 2 transient array.
///
/// See "Appendix B Type 2 Charstring Implementation Limits" at
/// <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=33>
pub const TRANSIENT_ARRAY_SIZE: usize = 32;

/// The top level charstring plus one frame for each nested subroutine.
const MAX_FRAMES: usize = NESTING_DEPTH_LIMIT as usize + 1;

/// Hint masks cover at most this many bytes (256 stems).
const MAX_HINT_MASK_BYTES: usize = 32;

const RANDOM_SEED: u32 = 0x2545_f491;

/// Side bearing point and advance vector of a glyph.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SideBearingWidth {
    pub side_bearing: Point<Fixed>,
    pub width: Point<Fixed>,
}

impl SideBearingWidth {
    pub fn new(side_bearing: Point<Fixed>, width: Point<Fixed>) -> Self {
        Self {
            side_bearing,
            width,
        }
    }
}

/// Status of an interrupted or completed evaluation.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Progress {
    /// The charstring has established its side bearing and width.
    ///
    /// The caller may replace these with [`Interpreter::set_width`] and must
    /// call [`Interpreter::run`] again to continue. The operator that
    /// carried the width is executed again on resumption.
    NeedWidth(SideBearingWidth),
    /// Evaluation reached the final `endchar`.
    Done,
}

/// Width resolution state.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum InitState {
    /// No width has been seen.
    Pending,
    /// The width is known and the caller has been asked to confirm it.
    Resolving,
    Done,
}

/// Which charstring of a (possibly composite) glyph is executing.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Component {
    Glyph,
    SeacBase,
    SeacAccent,
}

/// Result of evaluating a single operator.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Flow {
    Continue,
    /// Stop and ask the caller for the width. The decoding position has
    /// been restored to the start of the current operator.
    NeedWidth,
    Done,
}

/// Evaluation state for a single glyph.
///
/// Subroutine calls are tracked in a fixed array of frames rather than
/// by recursion, which allows evaluation to be suspended and resumed at
/// any operator.
pub struct Interpreter<'a, F> {
    font: &'a F,
    kind: CharstringKind,
    frames: [Cursor<'a>; MAX_FRAMES],
    depth: usize,
    stack: Stack,
    init: InitState,
    /// Metrics as given by the charstring.
    pending: SideBearingWidth,
    /// Metrics supplied by the caller while resolving.
    width_override: Option<SideBearingWidth>,
    width: Option<SideBearingWidth>,
    /// True if the bottom stack element is a Type 2 width operand that
    /// must be dropped once the width is resolved.
    explicit_width: bool,
    /// Displacement of the glyph caused by a side bearing override.
    origin_shift: Point<Fixed>,
    component: Component,
    /// Offset of the component's own coordinate system relative to the
    /// composite glyph.
    component_offset: Point<Fixed>,
    component_started: bool,
    seac_accent: Option<(i32, Point<Fixed>)>,
    stem_count: usize,
    flex_points: Option<u8>,
    transient: [Number; TRANSIENT_ARRAY_SIZE],
    results: [Number; MAX_STACK],
    result_len: usize,
    result_pos: usize,
    weight_vector: WeightVector,
    random_state: u32,
    finished: bool,
}

impl<'a, F: CharstringSource> Interpreter<'a, F> {
    /// Creates an interpreter for the given glyph charstring.
    ///
    /// Type 1 charstrings are expected to be encrypted unless the Private
    /// dictionary sets lenIV to -1.
    pub fn new(font: &'a F, charstring: &'a [u8]) -> Self {
        let kind = font.kind();
        let weight_vector = font.private_dict().weight_vector;
        let mut interpreter = Self {
            font,
            kind,
            frames: [Cursor::new(&[]); MAX_FRAMES],
            depth: 0,
            stack: Stack::new(),
            init: InitState::Pending,
            pending: SideBearingWidth::default(),
            width_override: None,
            width: None,
            explicit_width: false,
            origin_shift: Point::default(),
            component: Component::Glyph,
            component_offset: Point::default(),
            component_started: false,
            seac_accent: None,
            stem_count: 0,
            flex_points: None,
            transient: [Number::I32(0); TRANSIENT_ARRAY_SIZE],
            results: [Number::I32(0); MAX_STACK],
            result_len: 0,
            result_pos: 0,
            weight_vector,
            random_state: RANDOM_SEED,
            finished: false,
        };
        interpreter.frames[0] = interpreter.cursor_for(charstring);
        interpreter
    }

    pub fn kind(&self) -> CharstringKind {
        self.kind
    }

    /// Returns the resolved side bearing and width, if known.
    pub fn width(&self) -> Option<SideBearingWidth> {
        self.width
    }

    /// Replaces the side bearing and width reported by the last
    /// [`Progress::NeedWidth`].
    ///
    /// The glyph outline is displaced by the difference between the given
    /// side bearing and the one found in the charstring.
    pub fn set_width(&mut self, width: SideBearingWidth) {
        if self.init == InitState::Resolving {
            self.width_override = Some(width);
        }
    }

    /// Evaluates the charstring until it completes or needs the caller to
    /// confirm the glyph metrics.
    pub fn run(&mut self, sink: &mut impl CharstringSink) -> Result<Progress, Error> {
        if self.finished {
            return Ok(Progress::Done);
        }
        if self.init == InitState::Resolving {
            self.finish_width(sink)?;
        }
        let kind = self.kind;
        loop {
            let mut cursor = self.frames[self.depth];
            if cursor.is_empty() {
                if self.depth == 0 {
                    return Err(Error::UnexpectedEnd);
                }
                // Falling off the end of a subroutine is an implied return
                self.depth -= 1;
                continue;
            }
            let saved = cursor;
            let b0 = cursor.read_u8()?;
            let is_number = match kind {
                CharstringKind::Type1 => b0 >= 32,
                CharstringKind::Type2 => b0 == 28 || b0 >= 32,
            };
            if is_number {
                let number = read_number(&mut cursor, b0, kind)?;
                self.frames[self.depth] = cursor;
                self.stack.push(number)?;
                continue;
            }
            let flow = match kind {
                CharstringKind::Type1 => {
                    let operator = type1::Operator::read(&mut cursor, b0)?;
                    self.frames[self.depth] = cursor;
                    log::trace!("{operator:?} {:?}", self.stack);
                    self.evaluate_type1(operator, saved, sink)?
                }
                CharstringKind::Type2 => {
                    let operator = type2::Operator::read(&mut cursor, b0)?;
                    self.frames[self.depth] = cursor;
                    log::trace!("{operator:?} {:?}", self.stack);
                    self.evaluate_type2(operator, saved, sink)?
                }
            };
            match flow {
                Flow::Continue => {}
                Flow::NeedWidth => return Ok(Progress::NeedWidth(self.pending)),
                Flow::Done => {
                    self.finished = true;
                    return Ok(Progress::Done);
                }
            }
        }
    }

    fn cursor_for(&self, data: &'a [u8]) -> Cursor<'a> {
        match self.kind {
            CharstringKind::Type1 if self.font.private_dict().len_iv >= 0 => Cursor::new_encrypted(
                data,
                CHARSTRING_KEY,
                self.font.private_dict().len_iv as usize,
            ),
            _ => Cursor::new(data),
        }
    }

    /// Restores the decoding position to the start of the current operator.
    fn rewind(&mut self, saved: Cursor<'a>) {
        self.frames[self.depth] = saved;
    }

    /// Requests width resolution for the glyph. Returns true if evaluation
    /// must pause.
    fn request_width(&mut self, metrics: SideBearingWidth, saved: Cursor<'a>) -> bool {
        if self.init != InitState::Pending {
            return false;
        }
        log::debug!(
            "charstring width {}, side bearing {}",
            metrics.width.x,
            metrics.side_bearing.x
        );
        self.pending = metrics;
        self.init = InitState::Resolving;
        self.rewind(saved);
        true
    }

    fn finish_width(&mut self, sink: &mut impl CharstringSink) -> Result<(), Error> {
        let resolved = self.width_override.take().unwrap_or(self.pending);
        if self.explicit_width {
            self.stack.remove(0)?;
            self.explicit_width = false;
        }
        self.origin_shift = Point::new(
            resolved
                .side_bearing
                .x
                .wrapping_sub(self.pending.side_bearing.x),
            resolved
                .side_bearing
                .y
                .wrapping_sub(self.pending.side_bearing.y),
        );
        self.width = Some(resolved);
        self.init = InitState::Done;
        sink.sbw(resolved.side_bearing, resolved.width);
        Ok(())
    }

    /// Returns an error if a path or hint operator appears before the
    /// current charstring has established its metrics.
    fn require_width(&self) -> Result<(), Error> {
        let ready = match self.component {
            Component::Glyph => self.init == InitState::Done,
            _ => self.component_started,
        };
        if ready {
            Ok(())
        } else {
            Err(Error::MissingWidth)
        }
    }

    /// Begins the outline of a seac component whose own side bearing is
    /// `side_bearing`.
    fn start_component_outline(
        &mut self,
        side_bearing: Point<Fixed>,
        sink: &mut impl CharstringSink,
    ) {
        let composite = self.pending.side_bearing;
        let offset = Point::new(
            self.component_offset
                .x
                .wrapping_add(side_bearing.x)
                .wrapping_sub(composite.x),
            self.component_offset
                .y
                .wrapping_add(side_bearing.y)
                .wrapping_sub(composite.y),
        );
        self.component_started = true;
        sink.sbw_seac(offset);
    }

    /// Offset applied to absolute coordinates given in the coordinate
    /// system of the current charstring.
    fn absolute_offset(&self) -> Point<Fixed> {
        self.component_offset.wrapping_add(self.origin_shift)
    }

    fn start_seac(
        &mut self,
        base_code: i32,
        accent_code: i32,
        accent_offset: Point<Fixed>,
    ) -> Result<(), Error> {
        if self.component != Component::Glyph {
            return Err(Error::NestedSeac);
        }
        let font = self.font;
        let base = font
            .seac_component(base_code)
            .ok_or(Error::InvalidSeacComponent(base_code))?;
        if font.seac_component(accent_code).is_none() {
            return Err(Error::InvalidSeacComponent(accent_code));
        }
        log::debug!("seac base {base_code}, accent {accent_code} at {accent_offset:?}");
        self.seac_accent = Some((accent_code, accent_offset));
        self.begin_component(Component::SeacBase, base, Point::default());
        Ok(())
    }

    fn begin_component(&mut self, component: Component, data: &'a [u8], offset: Point<Fixed>) {
        self.component = component;
        self.component_offset = offset;
        self.component_started = false;
        self.stack.clear();
        self.stem_count = 0;
        self.flex_points = None;
        self.result_len = 0;
        self.result_pos = 0;
        self.depth = 0;
        self.frames[0] = self.cursor_for(data);
    }

    fn end_char(&mut self, sink: &mut impl CharstringSink) -> Result<Flow, Error> {
        self.stack.clear();
        if self.component != Component::SeacBase {
            return Ok(Flow::Done);
        }
        sink.end_subglyph();
        let (code, offset) = self.seac_accent.take().ok_or(Error::NestedSeac)?;
        let font = self.font;
        let accent = font
            .seac_component(code)
            .ok_or(Error::InvalidSeacComponent(code))?;
        self.begin_component(Component::SeacAccent, accent, offset);
        Ok(Flow::Continue)
    }

    /// Pushes a frame for the given subroutine.
    ///
    /// Type 2 indices are biased. Calls to subroutines that do not exist
    /// are ignored.
    fn call_subr(&mut self, index: i32, is_global: bool) -> Result<(), Error> {
        let font = self.font;
        let data = match self.kind {
            CharstringKind::Type1 => usize::try_from(index).ok().and_then(|i| font.subr(i)),
            CharstringKind::Type2 => {
                let count = if is_global {
                    font.global_subr_count()
                } else {
                    font.subr_count()
                };
                let biased = index as i64 + subr_bias(count) as i64;
                usize::try_from(biased).ok().and_then(|i| {
                    if is_global {
                        font.global_subr(i)
                    } else {
                        font.subr(i)
                    }
                })
            }
        };
        let Some(data) = data else {
            log::warn!("ignoring call to missing subroutine {index} (global: {is_global})");
            return Ok(());
        };
        if self.depth + 1 > NESTING_DEPTH_LIMIT as usize {
            return Err(Error::CharstringNestingDepthLimitExceeded);
        }
        self.depth += 1;
        self.frames[self.depth] = self.cursor_for(data);
        Ok(())
    }

    fn return_from_subr(&mut self) -> Result<(), Error> {
        if self.depth == 0 {
            return Err(Error::ReturnWithoutCall);
        }
        self.depth -= 1;
        Ok(())
    }

    /// Returns the topmost `N` stack elements as fixed point values.
    fn top_args<const N: usize>(&self) -> Result<[Fixed; N], Error> {
        let len = self.stack.len();
        if len < N {
            return Err(Error::StackUnderflow);
        }
        self.stack.fixed_array::<N>(len - N)
    }

    /// Replaces `count * k` values starting at `first` with `count` values
    /// interpolated by the weight vector of the `k` masters.
    ///
    /// The first `count` values are those of the first master, followed by
    /// `k - 1` deltas for each value.
    fn blend(&mut self, first: usize, count: usize) -> Result<(), Error> {
        let weights = self.weight_vector;
        let weights = weights.values();
        let masters = weights.len();
        if masters == 0 || first + count * masters > self.stack.len() {
            return Err(Error::InvalidBlend);
        }
        let deltas_start = first + count;
        for i in 0..count {
            let mut value = self.stack.get_fixed(first + i)?;
            for (j, weight) in weights.iter().enumerate().skip(1) {
                let delta = self
                    .stack
                    .get_fixed(deltas_start + i * (masters - 1) + j - 1)?;
                value = value.wrapping_add(delta.mul(*weight));
            }
            self.stack.set(first + i, value)?;
        }
        self.stack.truncate(first + count);
        Ok(())
    }

    /// Moves the stack elements starting at `first` to the othersubr result
    /// queue.
    fn set_results(&mut self, first: usize) -> Result<(), Error> {
        let len = self.stack.len();
        self.result_pos = 0;
        self.result_len = 0;
        for i in first..len {
            self.results[self.result_len] = self.stack.get(i)?;
            self.result_len += 1;
        }
        self.stack.truncate(first);
        Ok(())
    }

    fn next_result(&mut self) -> Result<Number, Error> {
        if self.result_pos >= self.result_len {
            return Err(Error::MissingOtherSubrResult);
        }
        let result = self.results[self.result_pos];
        self.result_pos += 1;
        Ok(result)
    }

    /// Deterministic pseudo random value in the range (0, 1].
    fn next_random(&mut self) -> Fixed {
        let mut x = self.random_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.random_state = x;
        Fixed::from_bits((x & 0xFFFF) as i32 + 1)
    }

    fn hint_mask_len(&self) -> Result<usize, Error> {
        let len = self.stem_count.div_ceil(8);
        if len > MAX_HINT_MASK_BYTES {
            return Err(Error::TooManyStems(self.stem_count));
        }
        Ok(len)
    }
}

/// Evaluates the given charstring, accepting the metrics it declares, and
/// sends the resulting operations to `sink`.
///
/// Returns the side bearing and width of the glyph.
pub fn evaluate<F: CharstringSource>(
    font: &F,
    charstring: &[u8],
    sink: &mut impl CharstringSink,
) -> Result<SideBearingWidth, Error> {
    let mut interpreter = Interpreter::new(font, charstring);
    while let Progress::NeedWidth(_) = interpreter.run(sink)? {}
    interpreter.width().ok_or(Error::MissingWidth)
}

#[cfg(test)]
pub(crate) mod test_sink {
    use ps_types::{Fixed, Point};

    use crate::CharstringSink;

    #[derive(Clone, PartialEq, Debug)]
    pub enum Command {
        Sbw(Point<Fixed>, Point<Fixed>),
        SbwSeac(Point<Fixed>),
        MoveTo(Fixed, Fixed),
        LineTo(Fixed, Fixed),
        CurveTo(Fixed, Fixed, Fixed, Fixed, Fixed, Fixed),
        ClosePath,
        SetCurrentPoint(Fixed, Fixed),
        HStem(Fixed, Fixed),
        VStem(Fixed, Fixed),
        HintMask(Vec<u8>),
        CounterMask(Vec<u8>),
        ReplaceHints,
        DotSection,
        FlexBegin,
        FlexPoint,
        FlexEnd(Fixed),
        Flex([Fixed; 12], Fixed),
        EndSubglyph,
    }

    #[derive(PartialEq, Default, Debug)]
    pub struct CaptureSink(pub Vec<Command>);

    impl CharstringSink for CaptureSink {
        fn sbw(&mut self, side_bearing: Point<Fixed>, width: Point<Fixed>) {
            self.0.push(Command::Sbw(side_bearing, width))
        }

        fn sbw_seac(&mut self, offset: Point<Fixed>) {
            self.0.push(Command::SbwSeac(offset))
        }

        fn rmoveto(&mut self, dx: Fixed, dy: Fixed) {
            self.0.push(Command::MoveTo(dx, dy))
        }

        fn rlineto(&mut self, dx: Fixed, dy: Fixed) {
            self.0.push(Command::LineTo(dx, dy))
        }

        fn rcurveto(
            &mut self,
            dx1: Fixed,
            dy1: Fixed,
            dx2: Fixed,
            dy2: Fixed,
            dx3: Fixed,
            dy3: Fixed,
        ) {
            self.0
                .push(Command::CurveTo(dx1, dy1, dx2, dy2, dx3, dy3))
        }

        fn closepath(&mut self) {
            self.0.push(Command::ClosePath)
        }

        fn set_current_point(&mut self, x: Fixed, y: Fixed) {
            self.0.push(Command::SetCurrentPoint(x, y))
        }

        fn hstem(&mut self, y: Fixed, dy: Fixed) {
            self.0.push(Command::HStem(y, dy))
        }

        fn vstem(&mut self, x: Fixed, dx: Fixed) {
            self.0.push(Command::VStem(x, dx))
        }

        fn hint_mask(&mut self, mask: &[u8]) {
            self.0.push(Command::HintMask(mask.to_vec()))
        }

        fn counter_mask(&mut self, mask: &[u8]) {
            self.0.push(Command::CounterMask(mask.to_vec()))
        }

        fn replace_hints(&mut self) {
            self.0.push(Command::ReplaceHints)
        }

        fn dotsection(&mut self) {
            self.0.push(Command::DotSection)
        }

        fn flex_begin(&mut self) {
            self.0.push(Command::FlexBegin)
        }

        fn flex_point(&mut self) {
            self.0.push(Command::FlexPoint)
        }

        fn flex_end(&mut self, height: Fixed) {
            self.0.push(Command::FlexEnd(height))
        }

        fn flex(&mut self, args: [Fixed; 12], depth: Fixed) {
            self.0.push(Command::Flex(args, depth))
        }

        fn end_subglyph(&mut self) {
            self.0.push(Command::EndSubglyph)
        }
    }

    pub fn fx(value: i32) -> Fixed {
        Fixed::from_i32(value)
    }

    pub fn pt(x: i32, y: i32) -> Point<Fixed> {
        Point::new(fx(x), fx(y))
    }
}
