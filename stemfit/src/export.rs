//! Conversion of glyph space poles to a device space path.

use alloc::vec::Vec;

use ps_types::{BoundingBox, PathElement, Pen};

use crate::{
    error::HintError,
    fraction::FIXED_ONE,
    mapping::Mapping,
    outline::{Outline, PoleKind},
};

/// Converts a 24.8 device coordinate to the `f32` units of a pen.
pub(crate) fn device_to_f32(value: i32) -> f32 {
    value as f32 / FIXED_ONE as f32
}

/// Collects path elements in device space.
///
/// A move is held back until the first segment of its subpath so that
/// consecutive moves collapse into one and a trailing move is never
/// emitted.
#[derive(Clone, Default, Debug)]
pub(crate) struct PathWriter {
    elements: Vec<PathElement>,
    pending_move: Option<(i32, i32)>,
    opened: bool,
}

impl PathWriter {
    #[cfg(test)]
    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    pub fn is_opened(&self) -> bool {
        self.opened
    }

    /// Returns true if a segment may be appended.
    pub fn has_subpath(&self) -> bool {
        self.opened || self.pending_move.is_some()
    }

    fn push(&mut self, element: PathElement) -> Result<(), HintError> {
        self.elements.try_reserve(1)?;
        self.elements.push(element);
        Ok(())
    }

    pub fn move_to(&mut self, point: (i32, i32)) -> Result<(), HintError> {
        self.close()?;
        self.pending_move = Some(point);
        Ok(())
    }

    /// Emits the pending move if no subpath is open.
    fn begin_segment(&mut self) -> Result<(), HintError> {
        if self.opened {
            return Ok(());
        }
        let (x, y) = self
            .pending_move
            .take()
            .ok_or(HintError::Internal("segment without a current point"))?;
        self.push(PathElement::MoveTo {
            x: device_to_f32(x),
            y: device_to_f32(y),
        })?;
        self.opened = true;
        Ok(())
    }

    pub fn line_to(&mut self, point: (i32, i32)) -> Result<(), HintError> {
        self.begin_segment()?;
        self.push(PathElement::LineTo {
            x: device_to_f32(point.0),
            y: device_to_f32(point.1),
        })
    }

    pub fn curve_to(
        &mut self,
        c0: (i32, i32),
        c1: (i32, i32),
        point: (i32, i32),
    ) -> Result<(), HintError> {
        self.begin_segment()?;
        self.push(PathElement::CurveTo {
            cx0: device_to_f32(c0.0),
            cy0: device_to_f32(c0.1),
            cx1: device_to_f32(c1.0),
            cy1: device_to_f32(c1.1),
            x: device_to_f32(point.0),
            y: device_to_f32(point.1),
        })
    }

    pub fn close(&mut self) -> Result<(), HintError> {
        if self.opened {
            self.opened = false;
            self.push(PathElement::Close)?;
        }
        Ok(())
    }

    /// Returns the extents of all on and off curve points of the path.
    pub fn control_box(&self) -> Option<BoundingBox<f32>> {
        let mut bounds: Option<BoundingBox<f32>> = None;
        let mut add = |x: f32, y: f32| match bounds.as_mut() {
            Some(bounds) => bounds.add_point(x, y),
            None => bounds = Some(BoundingBox::from_point(x, y)),
        };
        for element in &self.elements {
            match *element {
                PathElement::MoveTo { x, y } | PathElement::LineTo { x, y } => add(x, y),
                PathElement::CurveTo {
                    cx0,
                    cy0,
                    cx1,
                    cy1,
                    x,
                    y,
                } => {
                    add(cx0, cy0);
                    add(cx1, cy1);
                    add(x, y);
                }
                PathElement::Close => {}
            }
        }
        bounds
    }

    /// Replays the collected path into a pen.
    pub fn replay(&self, pen: &mut impl Pen) {
        for element in &self.elements {
            element.apply(pen);
        }
    }
}

/// Writes the closed contours of an outline using the aligned pole
/// coordinates.
///
/// The poles of each contour run from its start to the pole before its
/// close. A curve missing its final points ends on the contour start.
pub(crate) fn export_outline(
    outline: &Outline,
    mapping: &Mapping,
    writer: &mut PathWriter,
) -> Result<(), HintError> {
    let device = |index: usize| {
        let pole = &outline.poles[index];
        mapping.g2d(pole.ax, pole.ay)
    };
    for contour_index in 0..outline.contour_count() {
        let Some((beg, end)) = outline.contour_bounds(contour_index) else {
            continue;
        };
        writer.move_to(device(beg))?;
        let or_start = |index: usize| if index <= end { index } else { beg };
        let mut j = beg + 1;
        while j <= end {
            if outline.poles[j].kind == PoleKind::OffCurve {
                writer.curve_to(device(j), device(or_start(j + 1)), device(or_start(j + 2)))?;
                j += 3;
            } else {
                writer.line_to(device(j))?;
                j += 1;
            }
        }
        if !writer.is_opened() {
            // A contour of a single pole
            writer.begin_segment()?;
        }
        writer.close()?;
    }
    Ok(())
}

/// Returns the device space advance given by the trailing pole of an
/// outline, if present.
pub(crate) fn outline_advance(outline: &Outline, mapping: &Mapping) -> Option<(i32, i32)> {
    let pole = outline.poles.get(outline.open_contour_start())?;
    let (x, y) = mapping.g2d(pole.ax, pole.ay);
    Some((
        x.wrapping_sub(mapping.orig_dx),
        y.wrapping_sub(mapping.orig_dy),
    ))
}
