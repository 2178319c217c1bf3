//! Receiver for the events produced by charstring evaluation.

use ps_types::{Fixed, Point};

/// Trait for processing the primitive path and hint operations resulting
/// from charstring evaluation.
///
/// All path coordinates are relative to the current point, which the sink
/// tracks. The specialized Type 1 and Type 2 path operators are reduced to
/// relative move, line and curve operations.
///
/// Hint operations have default empty implementations so that a sink that
/// only wants the outline may ignore them. See "4.3 Hint Operators" at
/// <https://adobe-type-tools.github.io/font-tech-notes/pdfs/5177.Type2.pdf#page=21>
/// and "6.3 Hint Commands" at
/// <https://adobe-type-tools.github.io/font-tech-notes/pdfs/T1_SPEC.pdf#page=60>.
#[allow(unused_variables)]
pub trait CharstringSink {
    /// Establishes the side bearing point (which is also the initial
    /// current point) and advance of the glyph.
    ///
    /// Called exactly once per glyph before any other operation.
    fn sbw(&mut self, side_bearing: Point<Fixed>, width: Point<Fixed>);

    /// Starts a seac component whose origin is displaced by `offset`
    /// relative to the side bearing point of the composite glyph.
    fn sbw_seac(&mut self, offset: Point<Fixed>) {}

    // Path construction operators.
    fn rmoveto(&mut self, dx: Fixed, dy: Fixed);
    fn rlineto(&mut self, dx: Fixed, dy: Fixed);
    fn rcurveto(&mut self, dx1: Fixed, dy1: Fixed, dx2: Fixed, dy2: Fixed, dx3: Fixed, dy3: Fixed);
    fn closepath(&mut self);

    /// Moves the current point to an absolute position without adding a
    /// point to the outline.
    fn set_current_point(&mut self, x: Fixed, y: Fixed) {}

    // Hint operators.
    /// Horizontal stem hint at `y` with height `dy`, relative to the side
    /// bearing point of the current subglyph.
    fn hstem(&mut self, y: Fixed, dy: Fixed) {}
    /// Vertical stem hint at `x` with width `dx`, relative to the side
    /// bearing point of the current subglyph.
    fn vstem(&mut self, x: Fixed, dx: Fixed) {}
    /// Three horizontal stems declared together by `hstem3`.
    fn hstem3(&mut self, stems: [(Fixed, Fixed); 3]) {
        for (y, dy) in stems {
            self.hstem(y, dy);
        }
    }
    /// Three vertical stems declared together by `vstem3`.
    fn vstem3(&mut self, stems: [(Fixed, Fixed); 3]) {
        for (x, dx) in stems {
            self.vstem(x, dx);
        }
    }
    /// Bitmask defining the hints that should be made active for the
    /// commands that follow. Bit `i` (most significant bit first) refers
    /// to the `i`th stem declared in the current subglyph.
    fn hint_mask(&mut self, mask: &[u8]) {}
    /// Bitmask defining the counter hints that should be made active for the
    /// commands that follow.
    fn counter_mask(&mut self, mask: &[u8]) {}
    /// Deactivates all hints so that a new set may be declared (Type 1
    /// hint replacement).
    fn replace_hints(&mut self) {}
    /// Marks the following contour as a dot section.
    fn dotsection(&mut self) {}

    // Type 1 flex, expressed through othersubrs 0, 1 and 2.
    /// Begins a flex sequence. The following seven `rmoveto` operations
    /// supply the reference point and the six curve points.
    fn flex_begin(&mut self) {}
    /// Marks the end of one flex point.
    fn flex_point(&mut self) {}
    /// Completes a flex sequence. The curves collapse to a line if they
    /// are shallower than `height` hundredths of a device pixel.
    fn flex_end(&mut self, height: Fixed) {}

    /// Type 2 flex: two relative curves given by `args` that may be drawn
    /// as a single line when the join is shallower than `depth` device
    /// pixels.
    fn flex(&mut self, args: [Fixed; 12], depth: Fixed) {
        let [a0, a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11] = args;
        self.rcurveto(a0, a1, a2, a3, a4, a5);
        self.rcurveto(a6, a7, a8, a9, a10, a11);
    }

    /// Ends the base glyph of a seac composite.
    fn end_subglyph(&mut self) {}
}
