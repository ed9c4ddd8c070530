//! Shape normalization.
//!
//! A raw landmark list depends on where the subject stands and how large it
//! appears in the frame. Normalization removes both: the bounding box is moved
//! to the origin, stretched to a fixed size on each axis and shifted by a small
//! margin, so two detections of the same pose land on the same coordinates.

use crate::{
    constants::{NORMALIZED_OFFSET_X, NORMALIZED_OFFSET_Y, NORMALIZED_SIZE},
    landmarks::Landmark,
    Error, Result,
};
use std::ops::Deref;

/// A landmark list mapped into the `[3, 13] x [1, 11]` box
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedShape(Vec<Landmark>);

impl Deref for NormalizedShape {
    type Target = [Landmark];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Axis-aligned extent of a landmark list
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Compute the bounding box, `None` for an empty list
    #[must_use]
    pub fn of(points: &[Landmark]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let init = Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        };

        Some(points.iter().fold(init, |b, p| Self {
            min_x: b.min_x.min(p.x),
            min_y: b.min_y.min(p.y),
            max_x: b.max_x.max(p.x),
            max_y: b.max_y.max(p.y),
        }))
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Normalize a landmark list for size and position independent comparison
///
/// An empty list yields an empty shape.
///
/// # Errors
///
/// Returns [`Error::DegenerateShape`] when every point shares the same x or the
/// same y coordinate, or when any coordinate is not finite.
pub fn normalize(points: &[Landmark]) -> Result<NormalizedShape> {
    let Some(bbox) = BoundingBox::of(points) else {
        return Ok(NormalizedShape::default());
    };

    // min/max skip NaN, so a bad point would otherwise pass the extent check
    if points.iter().any(|p| !(p.x.is_finite() && p.y.is_finite())) {
        return Err(Error::DegenerateShape {
            width: f64::NAN,
            height: f64::NAN,
        });
    }

    let width = bbox.width();
    let height = bbox.height();
    if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
        return Err(Error::DegenerateShape { width, height });
    }

    let shape = points
        .iter()
        .map(|p| Landmark {
            x: (p.x - bbox.min_x) * NORMALIZED_SIZE / width + NORMALIZED_OFFSET_X,
            y: (p.y - bbox.min_y) * NORMALIZED_SIZE / height + NORMALIZED_OFFSET_Y,
        })
        .collect();

    Ok(NormalizedShape(shape))
}
