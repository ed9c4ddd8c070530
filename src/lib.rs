//! Pose catching library: teach a handful of body or hand poses from a live
//! camera, then recognise them in real time.
//!
//! This library provides:
//! - ONNX Runtime landmark extraction for hands and bodies
//! - `OpenCV` video capture, drawing and display
//! - Translation and scale invariant shape normalization
//! - Tolerance based matching against a small pose library
//!
//! A session goes through these steps:
//! 1. Select a mode (hand, half body or full body)
//! 2. Start the camera and capture up to six sample poses
//! 3. Save the samples as the reference library
//! 4. Detect: every frame is matched against the library, first match wins
//!
//! # Examples
//!
//! ## Matching Shapes
//!
//! ```
//! use pose_catcher::{landmarks::Landmark, matcher::{PoseMatcher, Tolerance}, normalizer::normalize};
//!
//! # fn main() -> pose_catcher::Result<()> {
//! let points: Vec<Landmark> = (0..21)
//!     .map(|i| Landmark::new(0.2 + 0.03 * f64::from(i), 0.2 + 0.5 * f64::from(i % 2)))
//!     .collect();
//!
//! let shape = normalize(&points)?;
//! let mut matcher = PoseMatcher::new();
//! matcher.store_library(vec![shape.clone()]);
//!
//! let tolerance = f64::from(Tolerance::Medium.radius());
//! assert_eq!(matcher.find_match(&shape, tolerance), Some(0));
//! # Ok(())
//! # }
//! ```
//!
//! ## Running a Session
//!
//! ```no_run
//! use pose_catcher::{
//!     config::Config,
//!     display::{DisplayBoard, SharedDisplay},
//!     extractor::OnnxExtractorFactory,
//!     landmarks::SessionMode,
//!     session::{Command, PoseSession, SessionOptions},
//!     video::CameraSource,
//! };
//! use opencv::core::Size;
//! use std::sync::{Arc, Mutex};
//!
//! # fn main() -> pose_catcher::Result<()> {
//! let config = Config::default();
//! let source = CameraSource::open(&config.camera)?;
//! let factory = OnnxExtractorFactory::new(config.models.clone());
//! let display: SharedDisplay = Arc::new(Mutex::new(DisplayBoard::new(Size::new(160, 120))));
//!
//! let mut session = PoseSession::new(
//!     Box::new(source),
//!     Box::new(factory),
//!     display,
//!     SessionOptions::from_config(&config),
//! );
//!
//! session.handle(Command::SelectMode(SessionMode::Hand))?;
//! session.handle(Command::Start)?;
//! session.handle(Command::CaptureSample)?;
//! session.handle(Command::Save)?;
//! session.handle(Command::DetectToggle)?;
//!
//! println!("Matched: {:?}", session.last_match());
//! session.shutdown()?;
//! # Ok(())
//! # }
//! ```

/// Landmark types, topology and session modes
pub mod landmarks;

/// Translation and scale normalization of landmark shapes
pub mod normalizer;

/// Tolerance based matching against reference shapes
pub mod matcher;

/// Fixed capacity store of captured samples
pub mod library;

/// ONNX landmark extraction
pub mod extractor;

/// Frame acquisition from cameras and video files
pub mod video;

/// Preview, thumbnails and pose gallery
pub mod display;

/// Capture/detect state machine and frame loop
pub mod session;

/// Utility functions for coordinate transformations
pub mod utils;

/// Error types and result handling
pub mod error;

/// Main application module
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
