//! Constants used throughout the application

/// Maximum number of poses a library can hold
pub const MAX_POSES: usize = 6;

/// Side length of the normalized bounding box
pub const NORMALIZED_SIZE: f64 = 10.0;

/// Horizontal offset applied after normalization
pub const NORMALIZED_OFFSET_X: f64 = 3.0;

/// Vertical offset applied after normalization
pub const NORMALIZED_OFFSET_Y: f64 = 1.0;

/// Scale applied to normalized coordinates before the tolerance test
pub const MATCH_SCALE: f64 = 20.0;

/// Tolerance values offered to the user
pub const TOLERANCE_DIFFICULT: u32 = 30;
pub const TOLERANCE_MEDIUM: u32 = 40;
pub const TOLERANCE_EASY: u32 = 50;

/// Preview frame size
pub const DEFAULT_PREVIEW_WIDTH: i32 = 800;
pub const DEFAULT_PREVIEW_HEIGHT: i32 = 600;

/// Thumbnail size for captured poses
pub const DEFAULT_THUMBNAIL_WIDTH: i32 = 160;
pub const DEFAULT_THUMBNAIL_HEIGHT: i32 = 120;

/// Back-off after the video source fails to deliver a frame
pub const DEFAULT_RETRY_DELAY_MS: u64 = 10;

/// Action names attached to the pose slots once the library is saved
pub const DEFAULT_SLOT_LABELS: [&str; MAX_POSES] = ["forward", "back", "left", "right", "up", "down"];

/// Handedness score at or above which a hand is reported as right
pub const HANDEDNESS_THRESHOLD: f32 = 0.5;

/// Default presence score below which a detection is discarded
pub const DEFAULT_MIN_PRESENCE: f32 = 0.5;

/// Detection label position and style on the preview frame
pub const MATCH_LABEL_X: i32 = 50;
pub const MATCH_LABEL_Y: i32 = 450;
pub const MATCH_LABEL_SCALE: f64 = 3.0;
pub const MATCH_LABEL_THICKNESS: i32 = 10;
