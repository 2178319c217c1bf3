//! Types for receiving the device space path of a glyph.

use alloc::vec::Vec;

/// Interface for accepting a sequence of path commands.
///
/// PostScript outlines are built from cubic segments only, so there is no
/// quadratic variant.
pub trait Pen {
    /// Emit a command to begin a new subpath at (x, y).
    fn move_to(&mut self, x: f32, y: f32);

    /// Emit a line segment from the current point to (x, y).
    fn line_to(&mut self, x: f32, y: f32);

    /// Emit a cubic bezier segment from the current point with control
    /// points at (cx0, cy0) and (cx1, cy1) and ending at (x, y).
    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32);

    /// Emit a command to close the current subpath.
    fn close(&mut self);
}

/// Single element of a path.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathElement {
    /// Begin a new subpath at (x, y).
    MoveTo { x: f32, y: f32 },
    /// Draw a line from the current point to (x, y).
    LineTo { x: f32, y: f32 },
    /// Draw a cubic bezier from the current point with control points at
    /// (cx0, cy0) and (cx1, cy1) and ending at (x, y).
    CurveTo {
        cx0: f32,
        cy0: f32,
        cx1: f32,
        cy1: f32,
        x: f32,
        y: f32,
    },
    /// Close the current subpath.
    Close,
}

impl PathElement {
    /// Replays this element into the given pen.
    pub fn apply(&self, pen: &mut impl Pen) {
        match *self {
            Self::MoveTo { x, y } => pen.move_to(x, y),
            Self::LineTo { x, y } => pen.line_to(x, y),
            Self::CurveTo {
                cx0,
                cy0,
                cx1,
                cy1,
                x,
                y,
            } => pen.curve_to(cx0, cy0, cx1, cy1, x, y),
            Self::Close => pen.close(),
        }
    }
}

impl Pen for Vec<PathElement> {
    fn move_to(&mut self, x: f32, y: f32) {
        self.push(PathElement::MoveTo { x, y })
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.push(PathElement::LineTo { x, y })
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        self.push(PathElement::CurveTo {
            cx0,
            cy0,
            cx1,
            cy1,
            x,
            y,
        })
    }

    fn close(&mut self) {
        self.push(PathElement::Close)
    }
}

/// Pen that drops all drawing output into the ether.
pub struct NullPen;

impl Pen for NullPen {
    fn move_to(&mut self, _x: f32, _y: f32) {}
    fn line_to(&mut self, _x: f32, _y: f32) {}
    fn curve_to(&mut self, _cx0: f32, _cy0: f32, _cx1: f32, _cy1: f32, _x: f32, _y: f32) {}
    fn close(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_elements() {
        let mut elements = Vec::new();
        elements.move_to(0.0, 0.0);
        elements.line_to(10.0, 0.0);
        elements.curve_to(10.0, 5.0, 5.0, 10.0, 0.0, 10.0);
        elements.close();
        let mut replayed = Vec::new();
        for element in &elements {
            element.apply(&mut replayed);
        }
        assert_eq!(replayed, elements);
        assert_eq!(
            replayed[2],
            PathElement::CurveTo {
                cx0: 10.0,
                cy0: 5.0,
                cx1: 5.0,
                cy1: 10.0,
                x: 0.0,
                y: 10.0
            }
        );
        // Nothing to observe, but every command is accepted
        for element in &elements {
            element.apply(&mut NullPen);
        }
    }
}
