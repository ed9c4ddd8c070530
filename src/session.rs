//! Capture/detect session.
//!
//! The session walks through a fixed cycle:
//!
//! ```text
//! SelectingMode -> ReadyToCapture -> Capturing -> ReadyToDetect -> Detecting
//!       ^                                                              |
//!       +--------------------------------------------------------------+
//! ```
//!
//! Commands arrive from the user while a single background frame loop reads
//! the video source. The loop owns the video source and the extractor while
//! it runs and hands them back when it is joined, so at most one loop can
//! exist. The two sides only share a few atomics (running, capture requested,
//! tolerance), the pose library, the last match and the display sink.

use crate::{
    config::Config,
    constants::{
        DEFAULT_PREVIEW_HEIGHT, DEFAULT_PREVIEW_WIDTH, DEFAULT_RETRY_DELAY_MS, DEFAULT_SLOT_LABELS,
        DEFAULT_THUMBNAIL_HEIGHT, DEFAULT_THUMBNAIL_WIDTH, MAX_POSES,
    },
    display::{lock, overlay_match, render_thumbnail, SharedDisplay},
    extractor::{Extraction, ExtractorFactory, LandmarkExtractor},
    landmarks::{Landmark, SessionMode},
    library::PoseLibrary,
    matcher::{MatchMetric, PoseMatcher, Tolerance},
    normalizer::{normalize, NormalizedShape},
    video::{prepare_frame, VideoSource},
    Error, Result,
};
use log::{debug, error, info, warn};
use opencv::core::Size;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Where the session is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the user to pick hand, half body or full body
    SelectingMode,
    /// Mode chosen, capture not started
    ReadyToCapture,
    /// Frame loop running, samples can be captured and deleted
    Capturing,
    /// Library handed to the matcher
    ReadyToDetect,
    /// Frame loop running, frames matched against the library
    Detecting,
}

/// User commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Choose the kind of pose
    SelectMode(SessionMode),
    /// Start the capture loop
    Start,
    /// Capture the next processed frame as a sample
    CaptureSample,
    /// Remove the most recent sample
    Delete,
    /// Finish capturing and hand the library to the matcher
    Save,
    /// Start detecting, or stop and reset when already detecting
    DetectToggle,
    /// Change matching strictness
    SetTolerance(Tolerance),
}

impl SessionState {
    /// Transition table: whether `command` does anything in this state
    #[must_use]
    pub fn accepts(self, command: &Command) -> bool {
        matches!(
            (self, command),
            (Self::SelectingMode, Command::SelectMode(_))
                | (Self::ReadyToCapture, Command::Start)
                | (Self::Capturing, Command::CaptureSample | Command::Delete | Command::Save)
                | (Self::ReadyToDetect | Self::Detecting, Command::DetectToggle)
                | (_, Command::SetTolerance(_))
        )
    }
}

/// Frame and library settings of a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Size frames are resized to before extraction
    pub frame_size: Size,
    /// Mirror frames horizontally
    pub mirror: bool,
    /// Pause after the video source fails to deliver a frame
    pub retry_delay: Duration,
    /// Thumbnail size for captured poses
    pub thumbnail_size: Size,
    /// Action name per slot
    pub slot_labels: Vec<String>,
    /// Point test used when matching
    pub metric: MatchMetric,
    /// Initial tolerance
    pub tolerance: Tolerance,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            frame_size: Size::new(DEFAULT_PREVIEW_WIDTH, DEFAULT_PREVIEW_HEIGHT),
            mirror: true,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            thumbnail_size: Size::new(DEFAULT_THUMBNAIL_WIDTH, DEFAULT_THUMBNAIL_HEIGHT),
            slot_labels: DEFAULT_SLOT_LABELS.iter().map(ToString::to_string).collect(),
            metric: MatchMetric::default(),
            tolerance: Tolerance::default(),
        }
    }
}

impl SessionOptions {
    /// Take the session settings from the application configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            frame_size: Size::new(config.camera.preview_width, config.camera.preview_height),
            mirror: config.camera.mirror,
            retry_delay: config.camera.retry_delay(),
            thumbnail_size: Size::new(config.display.thumbnail_width, config.display.thumbnail_height),
            slot_labels: config.display.slot_labels.clone(),
            metric: config.matching.metric,
            tolerance: config.matching.tolerance,
        }
    }
}

/// Check a captured landmark list and normalize it
///
/// # Errors
///
/// Returns a sample rejection error when the list is empty, has the wrong
/// length, has a point outside the frame or cannot be normalized.
pub fn validate_sample(landmarks: &[Landmark], expected: usize) -> Result<NormalizedShape> {
    if landmarks.is_empty() {
        return Err(Error::EmptySample);
    }
    if landmarks.len() != expected {
        return Err(Error::IncompleteSample {
            expected,
            found: landmarks.len(),
        });
    }
    if let Some((index, point)) = landmarks.iter().enumerate().find(|(_, p)| !p.is_in_unit_square()) {
        return Err(Error::OutOfRangeSample {
            index,
            x: point.x,
            y: point.y,
        });
    }
    normalize(landmarks)
}

/// State shared by the command handler and the frame loop
struct Shared {
    running: AtomicBool,
    capture_requested: AtomicBool,
    tolerance: AtomicU32,
    library: Mutex<PoseLibrary>,
    last_match: Mutex<Option<usize>>,
    display: SharedDisplay,
}

/// What the frame loop does with each frame
enum LoopTask {
    Capture,
    Detect(Arc<PoseMatcher>),
}

/// Resources a stopped frame loop hands back
struct LoopResources {
    source: Box<dyn VideoSource>,
    extractor: Box<dyn LandmarkExtractor>,
}

struct FrameLoop {
    source: Box<dyn VideoSource>,
    extractor: Box<dyn LandmarkExtractor>,
    shared: Arc<Shared>,
    task: LoopTask,
    mode: SessionMode,
    frame_size: Size,
    mirror: bool,
    retry_delay: Duration,
    thumbnail_size: Size,
}

impl FrameLoop {
    fn run(mut self) -> LoopResources {
        debug!("Frame loop started");
        while self.shared.running.load(Ordering::Acquire) {
            // The source and extractor survive a panicking frame
            match panic::catch_unwind(AssertUnwindSafe(|| self.step())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Frame skipped: {e}"),
                Err(_) => {
                    error!("Frame processing panicked, frame skipped");
                    self.shared.capture_requested.store(false, Ordering::Release);
                    thread::sleep(self.retry_delay);
                }
            }
        }
        debug!("Frame loop stopped");

        LoopResources {
            source: self.source,
            extractor: self.extractor,
        }
    }

    fn step(&mut self) -> Result<()> {
        let frame = match self.source.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                debug!("Ignoring empty camera frame");
                thread::sleep(self.retry_delay);
                return Ok(());
            }
            Err(e) => {
                warn!("Failed to read frame, retrying: {e}");
                thread::sleep(self.retry_delay);
                return Ok(());
            }
        };

        let frame = prepare_frame(&frame, self.frame_size, self.mirror)?;
        let extraction = self.extractor.extract(&frame)?;

        match &self.task {
            LoopTask::Capture => self.capture(extraction),
            LoopTask::Detect(matcher) => self.detect(matcher, extraction),
        }
    }

    fn capture(&self, extraction: Extraction) -> Result<()> {
        let stored = if self.shared.capture_requested.load(Ordering::Acquire) {
            let outcome = self.store_sample(&extraction);
            self.shared.capture_requested.store(false, Ordering::Release);
            outcome
        } else {
            Ok(())
        };

        lock(&self.shared.display).show_frame(&extraction.annotated)?;
        stored
    }

    /// Validate the frame's landmarks and add them to the library
    fn store_sample(&self, extraction: &Extraction) -> Result<()> {
        let shape = match validate_sample(&extraction.landmarks, self.mode.landmark_count()) {
            Ok(shape) => shape,
            Err(e) if e.is_sample_rejection() => {
                debug!("Sample rejected: {e}");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        // The library stays locked until the thumbnail is shown so a
        // concurrent delete cannot clear the slot in between. The shape is
        // only stored once its thumbnail is on screen.
        let mut library = lock(&self.shared.library);
        if library.is_full() {
            debug!("Library full, sample dropped");
            return Ok(());
        }
        let slot = library.len();

        let thumbnail = render_thumbnail(&extraction.annotated, slot, self.thumbnail_size)?;
        lock(&self.shared.display).show_thumbnail(slot, &thumbnail)?;
        library.push(shape);
        info!("Captured pose {}", slot + 1);
        Ok(())
    }

    fn detect(&self, matcher: &PoseMatcher, extraction: Extraction) -> Result<()> {
        let tolerance = f64::from(self.shared.tolerance.load(Ordering::Acquire));

        let matched = if extraction.landmarks.len() == self.mode.landmark_count() {
            normalize(&extraction.landmarks)
                .ok()
                .and_then(|shape| matcher.find_match(&shape, tolerance))
        } else {
            None
        };

        {
            let mut last = lock(&self.shared.last_match);
            if *last != matched {
                debug!("Match changed: {matched:?}");
            }
            *last = matched;
        }

        let mut preview = extraction.annotated;
        overlay_match(&mut preview, matched)?;
        lock(&self.shared.display).show_frame(&preview)
    }
}

/// The capture/detect state machine
pub struct PoseSession {
    state: SessionState,
    mode: Option<SessionMode>,
    factory: Box<dyn ExtractorFactory>,
    source: Option<Box<dyn VideoSource>>,
    extractor: Option<Box<dyn LandmarkExtractor>>,
    matcher: Option<Arc<PoseMatcher>>,
    worker: Option<JoinHandle<LoopResources>>,
    shared: Arc<Shared>,
    options: SessionOptions,
}

impl PoseSession {
    /// Create a session waiting for a mode selection
    pub fn new(
        source: Box<dyn VideoSource>,
        factory: Box<dyn ExtractorFactory>,
        display: SharedDisplay,
        options: SessionOptions,
    ) -> Self {
        let shared = Arc::new(Shared {
            running: AtomicBool::new(false),
            capture_requested: AtomicBool::new(false),
            tolerance: AtomicU32::new(options.tolerance.radius()),
            library: Mutex::new(PoseLibrary::new()),
            last_match: Mutex::new(None),
            display,
        });

        Self {
            state: SessionState::SelectingMode,
            mode: None,
            factory,
            source: Some(source),
            extractor: None,
            matcher: None,
            worker: None,
            shared,
            options,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn mode(&self) -> Option<SessionMode> {
        self.mode
    }

    /// Samples captured so far, or held by the matcher once saved
    #[must_use]
    pub fn sample_count(&self) -> usize {
        match &self.matcher {
            Some(matcher) => matcher.len(),
            None => lock(&self.shared.library).len(),
        }
    }

    /// Whether a capture request is waiting for the frame loop
    #[must_use]
    pub fn capture_pending(&self) -> bool {
        self.shared.capture_requested.load(Ordering::Acquire)
    }

    /// Result of the most recent detection frame
    #[must_use]
    pub fn last_match(&self) -> Option<usize> {
        *lock(&self.shared.last_match)
    }

    /// Current tolerance radius
    #[must_use]
    pub fn tolerance(&self) -> u32 {
        self.shared.tolerance.load(Ordering::Acquire)
    }

    /// Whether a frame loop is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Apply a command
    ///
    /// Returns `Ok(false)` when the command has no effect in the current state.
    ///
    /// # Errors
    ///
    /// Returns an error if the extractor cannot be created, the frame loop
    /// cannot be started, or the frame loop panicked.
    pub fn handle(&mut self, command: Command) -> Result<bool> {
        if !self.state.accepts(&command) {
            debug!("Ignoring {command:?} in {:?}", self.state);
            return Ok(false);
        }

        match command {
            Command::SelectMode(mode) => self.select_mode(mode),
            Command::Start => self.start_capture(),
            Command::CaptureSample => Ok(self.request_capture()),
            Command::Delete => self.delete_last(),
            Command::Save => self.save(),
            Command::DetectToggle if self.state == SessionState::ReadyToDetect => self.start_detection(),
            Command::DetectToggle => self.stop_detection(),
            Command::SetTolerance(tolerance) => {
                self.shared.tolerance.store(tolerance.radius(), Ordering::Release);
                info!("Tolerance set to {tolerance:?}");
                Ok(true)
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        info!("Session {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn select_mode(&mut self, mode: SessionMode) -> Result<bool> {
        let extractor = self.factory.create(mode)?;
        debug_assert_eq!(extractor.mode(), mode);
        self.extractor = Some(extractor);
        self.mode = Some(mode);
        info!("Selected {mode} poses");
        self.transition(SessionState::ReadyToCapture);
        Ok(true)
    }

    fn start_capture(&mut self) -> Result<bool> {
        self.spawn_loop(LoopTask::Capture)?;
        self.transition(SessionState::Capturing);
        Ok(true)
    }

    fn request_capture(&self) -> bool {
        if lock(&self.shared.library).is_full() {
            debug!("All {MAX_POSES} slots taken");
            return false;
        }
        self.shared.capture_requested.store(true, Ordering::Release);
        true
    }

    fn delete_last(&mut self) -> Result<bool> {
        let mut library = lock(&self.shared.library);
        let Some(slot) = library.pop() else {
            return Ok(false);
        };
        lock(&self.shared.display).clear_thumbnail(slot)?;
        info!("Deleted pose {}", slot + 1);
        Ok(true)
    }

    fn save(&mut self) -> Result<bool> {
        self.stop_loop()?;

        let shapes = lock(&self.shared.library).take_shapes();
        {
            let mut display = lock(&self.shared.display);
            for (slot, label) in self.options.slot_labels.iter().enumerate().take(shapes.len()) {
                display.label_slot(slot, label)?;
            }
        }

        let mut matcher = PoseMatcher::with_metric(self.options.metric);
        info!("Saved {} poses", shapes.len());
        matcher.store_library(shapes);
        self.matcher = Some(Arc::new(matcher));

        self.transition(SessionState::ReadyToDetect);
        Ok(true)
    }

    fn start_detection(&mut self) -> Result<bool> {
        let matcher = self.matcher.clone().unwrap_or_default();
        info!("Detecting {} poses with the {:?} metric", matcher.len(), matcher.metric());
        *lock(&self.shared.last_match) = None;
        self.spawn_loop(LoopTask::Detect(matcher))?;
        self.transition(SessionState::Detecting);
        Ok(true)
    }

    fn stop_detection(&mut self) -> Result<bool> {
        // Reset even when the loop died
        if let Err(e) = self.stop_loop() {
            warn!("Frame loop did not stop cleanly: {e}");
        }

        lock(&self.shared.library).clear();
        *lock(&self.shared.last_match) = None;
        {
            let mut display = lock(&self.shared.display);
            for slot in 0..MAX_POSES {
                display.clear_thumbnail(slot)?;
            }
        }
        self.matcher = None;
        self.extractor = None;
        self.mode = None;

        self.transition(SessionState::SelectingMode);
        Ok(true)
    }

    fn spawn_loop(&mut self, task: LoopTask) -> Result<()> {
        let mode = self
            .mode
            .ok_or_else(|| Error::InvalidInput("No session mode selected".to_string()))?;
        let source = self
            .source
            .take()
            .ok_or_else(|| Error::InvalidInput("Video source is not available".to_string()))?;
        let Some(extractor) = self.extractor.take() else {
            self.source = Some(source);
            return Err(Error::InvalidInput("Landmark extractor is not available".to_string()));
        };

        self.shared.capture_requested.store(false, Ordering::Release);
        self.shared.running.store(true, Ordering::Release);

        let frame_loop = FrameLoop {
            source,
            extractor,
            shared: Arc::clone(&self.shared),
            task,
            mode,
            frame_size: self.options.frame_size,
            mirror: self.options.mirror,
            retry_delay: self.options.retry_delay,
            thumbnail_size: self.options.thumbnail_size,
        };

        let handle = thread::Builder::new()
            .name("frame-loop".to_string())
            .spawn(move || frame_loop.run())?;
        self.worker = Some(handle);
        Ok(())
    }

    /// Stop the frame loop after its current frame and take its resources back
    fn stop_loop(&mut self) -> Result<()> {
        self.shared.running.store(false, Ordering::Release);
        self.shared.capture_requested.store(false, Ordering::Release);

        if let Some(handle) = self.worker.take() {
            let resources = handle.join().map_err(|_| Error::WorkerPanicked)?;
            self.source = Some(resources.source);
            self.extractor = Some(resources.extractor);
        }
        Ok(())
    }

    /// Stop any running frame loop
    ///
    /// # Errors
    ///
    /// Returns an error if the frame loop panicked
    pub fn shutdown(&mut self) -> Result<()> {
        self.stop_loop()
    }
}

impl Drop for PoseSession {
    fn drop(&mut self) {
        if let Err(e) = self.stop_loop() {
            warn!("Frame loop did not stop cleanly: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATES: [SessionState; 5] = [
        SessionState::SelectingMode,
        SessionState::ReadyToCapture,
        SessionState::Capturing,
        SessionState::ReadyToDetect,
        SessionState::Detecting,
    ];

    fn hand(points: impl Fn(usize) -> (f64, f64)) -> Vec<Landmark> {
        (0..SessionMode::Hand.landmark_count()).map(|i| Landmark::from(points(i))).collect()
    }

    #[test]
    fn test_transition_table() {
        let expectations = [
            (Command::SelectMode(SessionMode::Hand), SessionState::SelectingMode),
            (Command::Start, SessionState::ReadyToCapture),
            (Command::CaptureSample, SessionState::Capturing),
            (Command::Delete, SessionState::Capturing),
            (Command::Save, SessionState::Capturing),
        ];

        for (command, legal_in) in expectations {
            for state in ALL_STATES {
                assert_eq!(state.accepts(&command), state == legal_in, "{command:?} in {state:?}");
            }
        }
    }

    #[test]
    fn test_detect_toggle_and_tolerance_states() {
        for state in ALL_STATES {
            let toggles = matches!(state, SessionState::ReadyToDetect | SessionState::Detecting);
            assert_eq!(state.accepts(&Command::DetectToggle), toggles);
            assert!(state.accepts(&Command::SetTolerance(Tolerance::Easy)));
        }
    }

    #[test]
    fn test_validate_sample_accepts_complete_hand() {
        let points = hand(|i| (0.2 + 0.03 * i as f64, 0.3 + 0.02 * (i % 4) as f64));
        let shape = validate_sample(&points, 21).unwrap();
        assert_eq!(shape.len(), 21);
    }

    #[test]
    fn test_validate_sample_rejections() {
        assert!(matches!(validate_sample(&[], 21), Err(Error::EmptySample)));

        let short = hand(|i| (0.1 * (i % 5) as f64, 0.05 * i as f64));
        assert!(matches!(
            validate_sample(&short[..10], 21),
            Err(Error::IncompleteSample { expected: 21, found: 10 })
        ));

        let mut outside = hand(|i| (0.2 + 0.03 * i as f64, 0.3 + 0.02 * (i % 4) as f64));
        outside[7].x = 1.2;
        assert!(matches!(
            validate_sample(&outside, 21),
            Err(Error::OutOfRangeSample { index: 7, .. })
        ));

        let flat = hand(|i| (0.2 + 0.03 * i as f64, 0.5));
        assert!(matches!(validate_sample(&flat, 21), Err(Error::DegenerateShape { .. })));
    }

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default();
        config.camera.mirror = false;
        config.matching.metric = MatchMetric::Legacy;
        config.matching.tolerance = Tolerance::Difficult;

        let options = SessionOptions::from_config(&config);
        assert!(!options.mirror);
        assert_eq!(options.metric, MatchMetric::Legacy);
        assert_eq!(options.tolerance, Tolerance::Difficult);
        assert_eq!(options.frame_size, Size::new(800, 600));
        assert_eq!(options.slot_labels.len(), MAX_POSES);
    }
}
