//! Utility functions for coordinate transformations.

pub mod safe_cast;

use crate::landmarks::Landmark;
use opencv::core::Point;
use safe_cast::f64_to_i32_clamp;

/// Map a landmark in image fractions to a pixel position
///
/// Points outside the frame are clamped to its border.
#[must_use]
pub fn landmark_to_pixel(landmark: &Landmark, width: i32, height: i32) -> Point {
    let max_x = (width - 1).max(0);
    let max_y = (height - 1).max(0);
    Point::new(
        f64_to_i32_clamp(landmark.x * f64::from(width), 0, max_x),
        f64_to_i32_clamp(landmark.y * f64::from(height), 0, max_y),
    )
}
