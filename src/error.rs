//! Error types for the pose catcher library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// `ONNX` Runtime inference failed
    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(#[from] ort::OrtError),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Landmark bounding box has no extent on one axis
    #[error("Degenerate shape: bounding box is {width} x {height}")]
    DegenerateShape {
        /// Bounding box width in source units
        width: f64,
        /// Bounding box height in source units
        height: f64,
    },

    /// A captured landmark lies outside the unit square
    #[error("Landmark {index} out of frame at ({x:.3}, {y:.3})")]
    OutOfRangeSample {
        /// Position of the offending landmark in the list
        index: usize,
        /// Raw x coordinate
        x: f64,
        /// Raw y coordinate
        y: f64,
    },

    /// Nothing was detected in the frame a sample was requested for
    #[error("No landmarks detected")]
    EmptySample,

    /// The detection has the wrong number of landmarks for the session mode
    #[error("Expected {expected} landmarks, got {found}")]
    IncompleteSample {
        /// Landmark count of the session mode
        expected: usize,
        /// Landmark count of the detection
        found: usize,
    },

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model loading or inference error
    #[error("Model error: {0}")]
    ModelError(String),

    /// Model output processing error
    #[error("Model output error: {0}")]
    ModelOutputError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The background frame loop panicked
    #[error("Frame loop worker panicked")]
    WorkerPanicked,
}

impl Error {
    /// Whether this error only rejects a single sample and leaves the session usable
    #[must_use]
    pub fn is_sample_rejection(&self) -> bool {
        matches!(
            self,
            Self::DegenerateShape { .. }
                | Self::OutOfRangeSample { .. }
                | Self::EmptySample
                | Self::IncompleteSample { .. }
        )
    }
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_rejection_classification() {
        assert!(Error::EmptySample.is_sample_rejection());
        assert!(Error::IncompleteSample { expected: 21, found: 3 }.is_sample_rejection());
        assert!(Error::DegenerateShape { width: 0.0, height: 1.0 }.is_sample_rejection());
        assert!(Error::OutOfRangeSample { index: 3, x: 1.2, y: 0.5 }.is_sample_rejection());
        assert!(!Error::ConfigError("bad".to_string()).is_sample_rejection());
        assert!(!Error::WorkerPanicked.is_sample_rejection());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::OutOfRangeSample { index: 4, x: 1.25, y: -0.5 };
        assert_eq!(err.to_string(), "Landmark 4 out of frame at (1.250, -0.500)");
        assert!(Error::DegenerateShape { width: 0.0, height: 2.0 }
            .to_string()
            .starts_with("Degenerate shape"));
    }
}
