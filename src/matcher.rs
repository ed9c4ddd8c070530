//! Matching a normalized shape against a library of reference poses.

use crate::{
    constants::{MATCH_SCALE, TOLERANCE_DIFFICULT, TOLERANCE_EASY, TOLERANCE_MEDIUM},
    landmarks::Landmark,
    normalizer::NormalizedShape,
    Error,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How strict matching is, as a radius in scaled shape units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tolerance {
    /// Radius 30
    Difficult,
    /// Radius 40
    #[default]
    Medium,
    /// Radius 50
    Easy,
}

impl Tolerance {
    /// Radius used by the point test
    #[must_use]
    pub const fn radius(self) -> u32 {
        match self {
            Self::Difficult => TOLERANCE_DIFFICULT,
            Self::Medium => TOLERANCE_MEDIUM,
            Self::Easy => TOLERANCE_EASY,
        }
    }

    /// Map a radius back to its preset
    #[must_use]
    pub const fn from_radius(radius: u32) -> Option<Self> {
        match radius {
            TOLERANCE_DIFFICULT => Some(Self::Difficult),
            TOLERANCE_MEDIUM => Some(Self::Medium),
            TOLERANCE_EASY => Some(Self::Easy),
            _ => None,
        }
    }
}

impl FromStr for Tolerance {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "difficult" | "30" => Ok(Self::Difficult),
            "medium" | "40" => Ok(Self::Medium),
            "easy" | "50" => Ok(Self::Easy),
            _ => Err(Error::InvalidInput(format!("Unknown tolerance: {s}"))),
        }
    }
}

/// Point-in-circle test used by the matcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMetric {
    /// Plain Euclidean distance on scaled coordinates
    #[default]
    Euclidean,
    /// The asymmetric test of the first release, where the second y factor
    /// adds 20 to the unscaled candidate coordinate
    Legacy,
}

impl MatchMetric {
    /// Whether `point` lies within `radius` of `center`
    #[must_use]
    pub fn within(self, point: &Landmark, center: &Landmark, radius: f64) -> bool {
        let dx = point.x * MATCH_SCALE - center.x * MATCH_SCALE;
        let dy = point.y * MATCH_SCALE - center.y * MATCH_SCALE;
        let y_term = match self {
            Self::Euclidean => dy * dy,
            Self::Legacy => dy * (point.y + MATCH_SCALE - center.y * MATCH_SCALE),
        };
        dx * dx + y_term <= radius * radius
    }
}

impl FromStr for MatchMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "euclidean" => Ok(Self::Euclidean),
            "legacy" => Ok(Self::Legacy),
            _ => Err(Error::InvalidInput(format!("Unknown match metric: {s}"))),
        }
    }
}

/// Reference library and first-match-wins lookup
#[derive(Debug, Clone, Default)]
pub struct PoseMatcher {
    metric: MatchMetric,
    references: Vec<NormalizedShape>,
}

impl PoseMatcher {
    /// Create an empty matcher using the Euclidean metric
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty matcher with the given metric
    #[must_use]
    pub fn with_metric(metric: MatchMetric) -> Self {
        Self {
            metric,
            references: Vec::new(),
        }
    }

    /// Replace the reference set
    pub fn store_library(&mut self, shapes: Vec<NormalizedShape>) {
        self.references = shapes;
    }

    /// Drop every reference
    pub fn clear(&mut self) {
        self.references.clear();
    }

    /// Stored references in slot order
    #[must_use]
    pub fn references(&self) -> &[NormalizedShape] {
        &self.references
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.references.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    #[must_use]
    pub fn metric(&self) -> MatchMetric {
        self.metric
    }

    /// Index of the first reference the shape matches at `tolerance`
    ///
    /// Candidate and references must have the same number of landmarks.
    #[must_use]
    pub fn find_match(&self, shape: &NormalizedShape, tolerance: f64) -> Option<usize> {
        self.references
            .iter()
            .position(|reference| self.matches(shape, reference, tolerance))
    }

    /// Whether every candidate point lies within `tolerance` of its reference point
    #[must_use]
    pub fn matches(&self, shape: &NormalizedShape, reference: &NormalizedShape, tolerance: f64) -> bool {
        debug_assert_eq!(
            shape.len(),
            reference.len(),
            "candidate and reference landmark counts differ"
        );
        if shape.len() != reference.len() {
            return false;
        }

        shape
            .iter()
            .zip(reference.iter())
            .all(|(point, center)| self.metric.within(point, center, tolerance))
    }
}
