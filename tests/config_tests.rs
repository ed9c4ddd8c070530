//! Configuration file loading and saving

use pose_catcher::{
    config::{Config, EXAMPLE_CONFIG},
    landmarks::{HandSide, SessionMode},
    matcher::{MatchMetric, Tolerance},
    Error,
};
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("pose-catcher-{}-{name}", std::process::id()))
}

#[test]
fn test_config_file_round_trip() {
    let path = temp_path("round-trip.yaml");

    let mut config = Config::default();
    config.camera.index = 3;
    config.camera.mirror = false;
    config.matching.tolerance = Tolerance::Easy;
    config.matching.metric = MatchMetric::Legacy;
    config.models.hand_side = HandSide::Right;
    config.display.slot_labels[5] = "jump".to_string();

    config.to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.camera.index, 3);
    assert!(!loaded.camera.mirror);
    assert_eq!(loaded.matching.tolerance, Tolerance::Easy);
    assert_eq!(loaded.matching.metric, MatchMetric::Legacy);
    assert_eq!(loaded.models.hand_side, HandSide::Right);
    assert_eq!(loaded.display.slot_labels[5], "jump");
    assert!(loaded.validate().is_ok());
}

#[test]
fn test_missing_file_is_io_error() {
    let result = Config::from_file(temp_path("does-not-exist.yaml"));
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_malformed_file_is_config_error() {
    let path = temp_path("malformed.yaml");
    std::fs::write(&path, "camera: [this is not a mapping").unwrap();
    let result = Config::from_file(&path);
    std::fs::remove_file(&path).ok();

    assert!(matches!(result, Err(Error::ConfigError(_))));
}

#[test]
fn test_example_config_from_file() {
    let path = temp_path("example.yaml");
    std::fs::write(&path, EXAMPLE_CONFIG).unwrap();
    let config = Config::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert!(config.validate().is_ok());
    assert_eq!(config.models.for_mode(SessionMode::Hand).input_size, 224);
    assert_eq!(config.models.for_mode(SessionMode::HalfBody).input_size, 256);
    assert_eq!(config.models.for_mode(SessionMode::FullBody).values_per_landmark, 5);
}
