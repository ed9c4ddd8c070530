//! Configuration management for the pose catcher application

use crate::{
    constants::{
        DEFAULT_MIN_PRESENCE, DEFAULT_PREVIEW_HEIGHT, DEFAULT_PREVIEW_WIDTH, DEFAULT_RETRY_DELAY_MS,
        DEFAULT_SLOT_LABELS, DEFAULT_THUMBNAIL_HEIGHT, DEFAULT_THUMBNAIL_WIDTH, MAX_POSES,
    },
    landmarks::{HandSide, SessionMode},
    matcher::{MatchMetric, Tolerance},
    Error, Result,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Video source configuration
    pub camera: CameraConfig,

    /// Landmark model configuration
    pub models: ModelConfig,

    /// Matching configuration
    pub matching: MatchingConfig,

    /// Display configuration
    pub display: DisplayConfig,
}

/// Video source and preview frame settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Webcam index
    pub index: i32,

    /// Read frames from a video file instead of the webcam
    pub video_file: Option<PathBuf>,

    /// Preview frame width
    pub preview_width: i32,

    /// Preview frame height
    pub preview_height: i32,

    /// Mirror frames horizontally
    pub mirror: bool,

    /// Pause after a failed frame read, in milliseconds
    pub retry_delay_ms: u64,
}

/// Landmark model files and their output layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Hand landmark model
    #[serde(deserialize_with = "hand_model")]
    pub hand: LandmarkModelConfig,

    /// Body landmark model, shared by half and full body modes
    #[serde(deserialize_with = "body_model")]
    pub body: LandmarkModelConfig,

    /// Which hand is tracked in hand mode
    pub hand_side: HandSide,
}

/// One landmark model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkModelConfig {
    /// Path to the ONNX model
    pub path: PathBuf,

    /// Side length of the square model input
    pub input_size: i32,

    /// Floats per landmark in the first output
    pub values_per_landmark: usize,

    /// Output holding the presence score
    pub presence_output: Option<usize>,

    /// Output holding the handedness score
    pub handedness_output: Option<usize>,

    /// Presence score below which nothing is reported
    pub min_presence: f32,
}

/// Fields given in a model section; missing ones keep the model's defaults
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LandmarkModelOverrides {
    path: Option<PathBuf>,
    input_size: Option<i32>,
    values_per_landmark: Option<usize>,
    #[serde(deserialize_with = "explicit_option")]
    presence_output: Option<Option<usize>>,
    #[serde(deserialize_with = "explicit_option")]
    handedness_output: Option<Option<usize>>,
    min_presence: Option<f32>,
}

impl LandmarkModelOverrides {
    fn apply(self, base: LandmarkModelConfig) -> LandmarkModelConfig {
        LandmarkModelConfig {
            path: self.path.unwrap_or(base.path),
            input_size: self.input_size.unwrap_or(base.input_size),
            values_per_landmark: self.values_per_landmark.unwrap_or(base.values_per_landmark),
            presence_output: self.presence_output.unwrap_or(base.presence_output),
            handedness_output: self.handedness_output.unwrap_or(base.handedness_output),
            min_presence: self.min_presence.unwrap_or(base.min_presence),
        }
    }
}

/// Tell an explicit `null` (`Some(None)`) apart from a missing field (`None`)
fn explicit_option<'de, D>(deserializer: D) -> std::result::Result<Option<Option<usize>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<usize>::deserialize(deserializer).map(Some)
}

fn hand_model<'de, D>(deserializer: D) -> std::result::Result<LandmarkModelConfig, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(LandmarkModelOverrides::deserialize(deserializer)?.apply(LandmarkModelConfig::hand()))
}

fn body_model<'de, D>(deserializer: D) -> std::result::Result<LandmarkModelConfig, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(LandmarkModelOverrides::deserialize(deserializer)?.apply(LandmarkModelConfig::body()))
}

/// Matching settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Tolerance selected at startup
    pub tolerance: Tolerance,

    /// Point test used by the matcher
    pub metric: MatchMetric,
}

/// Thumbnail and slot label settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Thumbnail width
    pub thumbnail_width: i32,

    /// Thumbnail height
    pub thumbnail_height: i32,

    /// Action name per slot, applied when the library is saved
    pub slot_labels: Vec<String>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            video_file: None,
            preview_width: DEFAULT_PREVIEW_WIDTH,
            preview_height: DEFAULT_PREVIEW_HEIGHT,
            mirror: true,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            hand: LandmarkModelConfig::hand(),
            body: LandmarkModelConfig::body(),
            hand_side: HandSide::Left,
        }
    }
}

impl LandmarkModelConfig {
    /// 21 point hand model with presence and handedness outputs
    #[must_use]
    pub fn hand() -> Self {
        Self {
            path: PathBuf::from("assets/hand_landmark.onnx"),
            input_size: 224,
            values_per_landmark: 3,
            presence_output: Some(1),
            handedness_output: Some(2),
            min_presence: DEFAULT_MIN_PRESENCE,
        }
    }

    /// 33 point body model with a presence output
    #[must_use]
    pub fn body() -> Self {
        Self {
            path: PathBuf::from("assets/pose_landmark.onnx"),
            input_size: 256,
            values_per_landmark: 5,
            presence_output: Some(1),
            handedness_output: None,
            min_presence: DEFAULT_MIN_PRESENCE,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            thumbnail_width: DEFAULT_THUMBNAIL_WIDTH,
            thumbnail_height: DEFAULT_THUMBNAIL_HEIGHT,
            slot_labels: DEFAULT_SLOT_LABELS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl CameraConfig {
    /// Back-off after a failed frame read
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl ModelConfig {
    /// Model used for a session mode
    #[must_use]
    pub fn for_mode(&self, mode: SessionMode) -> &LandmarkModelConfig {
        match mode {
            SessionMode::Hand => &self.hand,
            SessionMode::HalfBody | SessionMode::FullBody => &self.body,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration values
    ///
    /// Model files are not checked here; a missing model surfaces when its
    /// mode is selected.
    pub fn validate(&self) -> Result<()> {
        if self.camera.preview_width <= 0 || self.camera.preview_height <= 0 {
            return Err(Error::ConfigError("Preview size must be positive".to_string()));
        }
        if self.display.thumbnail_width <= 0 || self.display.thumbnail_height <= 0 {
            return Err(Error::ConfigError("Thumbnail size must be positive".to_string()));
        }
        if self.display.slot_labels.len() < MAX_POSES {
            return Err(Error::ConfigError(format!(
                "Expected {MAX_POSES} slot labels, got {}",
                self.display.slot_labels.len()
            )));
        }

        for (name, model) in [("hand", &self.models.hand), ("body", &self.models.body)] {
            if model.input_size <= 0 {
                return Err(Error::ConfigError(format!("{name} model input size must be positive")));
            }
            if model.values_per_landmark < 2 {
                return Err(Error::ConfigError(format!(
                    "{name} model needs at least 2 values per landmark"
                )));
            }
            if !(0.0..=1.0).contains(&model.min_presence) {
                return Err(Error::ConfigError(format!(
                    "{name} model presence threshold must be between 0.0 and 1.0"
                )));
            }
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Pose Catcher Configuration

# Video source
camera:
  index: 0
  preview_width: 800
  preview_height: 600
  mirror: true
  retry_delay_ms: 10

# Landmark models
models:
  hand_side: left
  hand:
    path: "assets/hand_landmark.onnx"
    input_size: 224
    values_per_landmark: 3
    presence_output: 1
    handedness_output: 2
    min_presence: 0.5
  body:
    path: "assets/pose_landmark.onnx"
    input_size: 256
    values_per_landmark: 5
    presence_output: 1
    handedness_output: null
    min_presence: 0.5

# Matching
matching:
  tolerance: medium
  metric: euclidean

# Thumbnails and slot labels
display:
  thumbnail_width: 160
  thumbnail_height: 120
  slot_labels: ["forward", "back", "left", "right", "up", "down"]
"#;
