//! Pose catcher application: teach poses from the webcam, then detect them.

use anyhow::Result;
use clap::Parser;
use log::info;
use pose_catcher::{
    app::PoseCatcherApp,
    config::{Config, EXAMPLE_CONFIG},
    matcher::{MatchMetric, Tolerance},
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera index to use
    #[arg(long, default_value = "0")]
    cam: i32,

    /// Video file to process instead of the camera
    #[arg(short, long)]
    video: Option<PathBuf>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Matching tolerance (difficult, medium, easy)
    #[arg(short, long, value_parser = parse_tolerance)]
    tolerance: Option<Tolerance>,

    /// Point test used for matching (euclidean, legacy)
    #[arg(short, long, value_parser = parse_metric)]
    metric: Option<MatchMetric>,

    /// Do not mirror the camera image
    #[arg(long)]
    no_mirror: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    example_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn parse_tolerance(value: &str) -> Result<Tolerance, String> {
    value.parse().map_err(|e: pose_catcher::Error| e.to_string())
}

fn parse_metric(value: &str) -> Result<MatchMetric, String> {
    value.parse().map_err(|e: pose_catcher::Error| e.to_string())
}

impl Args {
    /// Build the configuration from the config file and command line overrides
    fn into_config(self) -> Config {
        let mut config = if let Some(config_path) = &self.config {
            info!("Loading configuration from: {}", config_path.display());
            match Config::from_file(config_path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    log::warn!("Failed to load config file: {}. Using defaults.", e);
                    Config::default()
                }
            }
        } else {
            Config::default()
        };

        if self.cam != 0 {
            config.camera.index = self.cam;
        }
        if let Some(video) = self.video {
            config.camera.video_file = Some(video);
        }
        if let Some(tolerance) = self.tolerance {
            config.matching.tolerance = tolerance;
        }
        if let Some(metric) = self.metric {
            config.matching.metric = metric;
        }
        if self.no_mirror {
            config.camera.mirror = false;
        }

        config
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.example_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    info!("Pose Catcher");

    let config = args.into_config();
    config.validate()?;

    let mut app = PoseCatcherApp::new(&config)?;
    app.run()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["pose-catcher"]).unwrap();
        assert_eq!(args.cam, 0);
        assert!(args.video.is_none());
        assert!(args.tolerance.is_none());
        assert!(!args.no_mirror);

        let config = args.into_config();
        assert_eq!(config.matching.tolerance, Tolerance::Medium);
        assert!(config.camera.mirror);
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "pose-catcher",
            "--cam",
            "2",
            "--tolerance",
            "easy",
            "--metric",
            "legacy",
            "--no-mirror",
            "-v",
            "clip.mp4",
        ])
        .unwrap();

        let config = args.into_config();
        assert_eq!(config.camera.index, 2);
        assert_eq!(config.camera.video_file, Some(PathBuf::from("clip.mp4")));
        assert_eq!(config.matching.tolerance, Tolerance::Easy);
        assert_eq!(config.matching.metric, MatchMetric::Legacy);
        assert!(!config.camera.mirror);
    }

    #[test]
    fn test_invalid_tolerance_rejected() {
        assert!(Args::try_parse_from(["pose-catcher", "--tolerance", "lenient"]).is_err());
    }

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let args = Args::try_parse_from(["pose-catcher", "-C", "/nonexistent/pose-catcher.yaml"]).unwrap();
        let config = args.into_config();
        assert_eq!(config.camera.preview_width, 800);
    }
}
