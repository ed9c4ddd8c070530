//! Landmark points, skeleton topology and session modes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Number of hand knuckle landmarks
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Number of full body landmarks
pub const BODY_LANDMARK_COUNT: usize = 33;

/// Shoulders through hips of the full body skeleton
pub const UPPER_BODY_RANGE: Range<usize> = 11..23;

/// Bones of the 21 point hand skeleton
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (0, 17), (17, 18), (18, 19), (19, 20),
];

/// Bones of the 33 point body skeleton
pub const POSE_CONNECTIONS: [(usize, usize); 35] = [
    (0, 1), (1, 2), (2, 3), (3, 7), (0, 4), (4, 5), (5, 6), (6, 8), (9, 10),
    (11, 12), (11, 13), (13, 15), (15, 17), (15, 19), (15, 21), (17, 19),
    (12, 14), (14, 16), (16, 18), (16, 20), (16, 22), (18, 20),
    (11, 23), (12, 24), (23, 24), (23, 25), (24, 26), (25, 27), (26, 28),
    (27, 29), (28, 30), (29, 31), (30, 32), (27, 31), (28, 32),
];

/// A tracked 2-D point, as a fraction of image width and height
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal position
    pub x: f64,
    /// Vertical position
    pub y: f64,
}

impl Landmark {
    /// Create a landmark
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Whether the point lies inside the frame, borders included
    #[must_use]
    pub fn is_in_unit_square(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }
}

impl From<(f64, f64)> for Landmark {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// What kind of pose a capture/detect cycle works with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// One hand, 21 knuckles
    Hand,
    /// Shoulders to hips, 12 body joints
    HalfBody,
    /// Whole body, 33 joints
    FullBody,
}

impl SessionMode {
    /// Number of landmarks a complete detection has in this mode
    #[must_use]
    pub const fn landmark_count(self) -> usize {
        match self {
            Self::Hand => HAND_LANDMARK_COUNT,
            Self::HalfBody => UPPER_BODY_RANGE.end - UPPER_BODY_RANGE.start,
            Self::FullBody => BODY_LANDMARK_COUNT,
        }
    }

    /// Skeleton drawn on annotated frames
    #[must_use]
    pub fn connections(self) -> &'static [(usize, usize)] {
        match self {
            Self::Hand => &HAND_CONNECTIONS,
            Self::HalfBody | Self::FullBody => &POSE_CONNECTIONS,
        }
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Hand => "hand",
            Self::HalfBody => "half body",
            Self::FullBody => "full body",
        };
        f.write_str(name)
    }
}

/// Which hand the hand extractor reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandSide {
    /// Left hand
    Left,
    /// Right hand
    Right,
}

impl HandSide {
    /// Classify a handedness score from the hand model
    #[must_use]
    pub fn from_score(score: f32) -> Self {
        if score >= crate::constants::HANDEDNESS_THRESHOLD {
            Self::Right
        } else {
            Self::Left
        }
    }
}
