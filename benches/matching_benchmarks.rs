//! Benchmarks for shape normalization and library matching

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pose_catcher::{
    constants::MAX_POSES,
    landmarks::{Landmark, SessionMode},
    matcher::{MatchMetric, PoseMatcher, Tolerance},
    normalizer::normalize,
};

/// Deterministic pose with `count` landmarks, shaped by `seed`
fn synthetic_pose(count: usize, seed: usize) -> Vec<Landmark> {
    (0..count)
        .map(|i| {
            let t = (i + seed * 7) as f64 * 0.37;
            Landmark::new(0.5 + 0.3 * t.sin(), 0.5 + 0.3 * (t * 1.3).cos())
        })
        .collect()
}

fn benchmark_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    for mode in [SessionMode::Hand, SessionMode::HalfBody, SessionMode::FullBody] {
        let pose = synthetic_pose(mode.landmark_count(), 1);
        group.bench_with_input(BenchmarkId::from_parameter(mode), &pose, |b, pose| {
            b.iter(|| black_box(normalize(black_box(pose))));
        });
    }

    group.finish();
}

fn benchmark_find_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_match");
    let count = SessionMode::FullBody.landmark_count();
    let tolerance = f64::from(Tolerance::Medium.radius());

    let references = (0..MAX_POSES)
        .map(|seed| normalize(&synthetic_pose(count, seed)))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    for metric in [MatchMetric::Euclidean, MatchMetric::Legacy] {
        let mut matcher = PoseMatcher::with_metric(metric);
        matcher.store_library(references.clone());

        // The candidate is the last reference; Legacy may accept an earlier one first
        let last = normalize(&synthetic_pose(count, MAX_POSES - 1)).unwrap();
        if metric == MatchMetric::Euclidean {
            assert_eq!(matcher.find_match(&last, tolerance), Some(MAX_POSES - 1));
        }
        group.bench_with_input(BenchmarkId::new("last_of_six", format!("{metric:?}")), &last, |b, shape| {
            b.iter(|| black_box(matcher.find_match(black_box(shape), tolerance)));
        });
    }

    group.finish();
}

fn benchmark_frame_pipeline(c: &mut Criterion) {
    let count = SessionMode::Hand.landmark_count();
    let mut matcher = PoseMatcher::new();
    matcher.store_library(
        (0..MAX_POSES)
            .map(|seed| normalize(&synthetic_pose(count, seed)).unwrap())
            .collect(),
    );
    let tolerance = f64::from(Tolerance::Easy.radius());
    let frame = synthetic_pose(count, 3);

    c.bench_function("normalize_and_match_hand", |b| {
        b.iter(|| {
            let shape = normalize(black_box(&frame)).unwrap();
            black_box(matcher.find_match(&shape, tolerance))
        });
    });
}

criterion_group!(benches, benchmark_normalize, benchmark_find_match, benchmark_frame_pipeline);
criterion_main!(benches);
