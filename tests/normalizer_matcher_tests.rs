//! Normalization and matching working together


use pose_catcher::{
    landmarks::Landmark,
    matcher::{MatchMetric, PoseMatcher, Tolerance},
    normalizer::{normalize, NormalizedShape},
};
use proptest::prelude::*;
use test_helpers::{moved, pose_a, pose_b, pose_c};

fn shape(points: &[Landmark]) -> NormalizedShape {
    normalize(points).unwrap()
}

fn library(poses: &[Vec<Landmark>]) -> PoseMatcher {
    let mut matcher = PoseMatcher::new();
    matcher.store_library(poses.iter().map(|p| shape(p)).collect());
    matcher
}

fn radius(tolerance: Tolerance) -> f64 {
    f64::from(tolerance.radius())
}

#[test]
fn test_each_reference_matches_itself() {
    let matcher = library(&[pose_a(), pose_b(), pose_c()]);
    for (index, pose) in [pose_a(), pose_b(), pose_c()].iter().enumerate() {
        assert_eq!(matcher.find_match(&shape(pose), radius(Tolerance::Difficult)), Some(index));
    }
}

#[test]
fn test_first_match_wins() {
    let mut near_b = pose_b();
    near_b[4].x += 0.005;

    let matcher = library(&[pose_a(), pose_b(), near_b.clone()]);
    assert_eq!(matcher.find_match(&shape(&near_b), radius(Tolerance::Easy)), Some(1));
}

#[test]
fn test_all_points_must_be_within_tolerance() {
    let matcher = library(&[pose_b()]);

    // 3.0 normalized units on one point, 60 after scaling
    let mut off = pose_b();
    off[1].y += 0.15;
    assert_eq!(matcher.find_match(&shape(&off), radius(Tolerance::Easy)), None);
}

#[test]
fn test_tolerance_levels() {
    let matcher = library(&[pose_b()]);

    // 2.25 normalized units, 45 after scaling
    let mut nudged = pose_b();
    nudged[4].y -= 0.1125;
    let candidate = shape(&nudged);

    assert_eq!(matcher.find_match(&candidate, radius(Tolerance::Difficult)), None);
    assert_eq!(matcher.find_match(&candidate, radius(Tolerance::Medium)), None);
    assert_eq!(matcher.find_match(&candidate, radius(Tolerance::Easy)), Some(0));
}

#[test]
fn test_legacy_metric_accepts_what_euclidean_rejects() {
    // Reference point at normalized y 5, candidate point at y 9
    let mut middle = pose_b();
    middle[4].y = 0.4;
    let reference = shape(&middle);

    // Moving a point down makes the second legacy factor negative
    let mut lowered = pose_b();
    lowered[4].y = 0.6;
    let candidate = shape(&lowered);

    let euclidean = PoseMatcher::with_metric(MatchMetric::Euclidean);
    let legacy = PoseMatcher::with_metric(MatchMetric::Legacy);
    let tolerance = radius(Tolerance::Medium);

    assert!(!euclidean.matches(&candidate, &reference, tolerance));
    assert!(legacy.matches(&candidate, &reference, tolerance));
}

#[test]
fn test_empty_library_never_matches() {
    let matcher = PoseMatcher::new();
    assert_eq!(matcher.find_match(&shape(&pose_a()), radius(Tolerance::Easy)), None);
}

proptest! {
    #[test]
    fn prop_moved_pose_matches_original(
        scale in 0.3f64..1.0,
        dx in 0.0f64..0.1,
        dy in 0.0f64..0.1,
    ) {
        let matcher = library(&[pose_a(), pose_b(), pose_c()]);
        let candidate = shape(&moved(&pose_c(), scale, dx, dy));
        prop_assert_eq!(matcher.find_match(&candidate, radius(Tolerance::Difficult)), Some(2));
    }
}
