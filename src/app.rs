//! Main application module: windows, keyboard commands and the render loop.

use crate::{
    config::Config,
    display::{lock, DisplayBoard, SharedDisplay},
    error::Result,
    extractor::OnnxExtractorFactory,
    landmarks::SessionMode,
    matcher::Tolerance,
    session::{Command, PoseSession, SessionOptions, SessionState},
    video::CameraSource,
};
use log::{debug, info, warn};
use opencv::{
    core::{Mat, Point, Scalar, Size, CV_8UC3},
    highgui::{self, WINDOW_NORMAL},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const PREVIEW_WINDOW: &str = "Pose Catcher";
const GALLERY_WINDOW: &str = "Poses";

/// Delay between GUI refreshes, in milliseconds
const KEY_POLL_MS: i32 = 30;

/// Key bindings shown before the camera starts
const HELP_LINES: [&str; 8] = [
    "h: hand   u: half body   b: full body",
    "space: start catching",
    "c: catch pose   d: delete last",
    "s: save poses",
    "t: start / stop detecting",
    "1: difficult   2: medium   3: easy",
    "q / Esc: quit",
    "",
];

/// What a key press asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Forward a command to the session
    Command(Command),
    /// Leave the application
    Quit,
}

/// Map a `wait_key` code to an action
#[must_use]
pub fn key_action(key: i32) -> Option<KeyAction> {
    if key < 0 {
        return None;
    }

    let command = match u8::try_from(key & 0xFF).ok()? {
        27 | b'q' => return Some(KeyAction::Quit),
        b'h' => Command::SelectMode(SessionMode::Hand),
        b'u' => Command::SelectMode(SessionMode::HalfBody),
        b'b' => Command::SelectMode(SessionMode::FullBody),
        b' ' => Command::Start,
        b'c' => Command::CaptureSample,
        b'd' => Command::Delete,
        b's' => Command::Save,
        b't' => Command::DetectToggle,
        b'1' => Command::SetTolerance(Tolerance::Difficult),
        b'2' => Command::SetTolerance(Tolerance::Medium),
        b'3' => Command::SetTolerance(Tolerance::Easy),
        _ => return None,
    };
    Some(KeyAction::Command(command))
}

/// One line summary of the session shown on the preview
#[must_use]
pub fn status_line(state: SessionState, tolerance: u32, samples: usize, fps: f64) -> String {
    let state = match state {
        SessionState::SelectingMode => "select a mode",
        SessionState::ReadyToCapture => "ready to catch",
        SessionState::Capturing => "catching",
        SessionState::ReadyToDetect => "ready to detect",
        SessionState::Detecting => "detecting",
    };
    format!("{state} | poses {samples} | tolerance {tolerance} | FPS {fps:.1}")
}

/// Main application struct
pub struct PoseCatcherApp {
    session: PoseSession,
    board: Arc<Mutex<DisplayBoard>>,
    preview_size: Size,
}

impl PoseCatcherApp {
    /// Open the video source and create the GUI windows
    pub fn new(config: &Config) -> Result<Self> {
        info!("Initializing Pose Catcher application");

        let source = CameraSource::open(&config.camera)?;
        let factory = OnnxExtractorFactory::new(config.models.clone());

        let thumbnail_size = Size::new(config.display.thumbnail_width, config.display.thumbnail_height);
        let board = Arc::new(Mutex::new(DisplayBoard::new(thumbnail_size)));
        let display: SharedDisplay = board.clone();

        let session = PoseSession::new(
            Box::new(source),
            Box::new(factory),
            display,
            SessionOptions::from_config(config),
        );

        highgui::named_window(PREVIEW_WINDOW, WINDOW_NORMAL)?;
        highgui::named_window(GALLERY_WINDOW, WINDOW_NORMAL)?;

        Ok(Self {
            session,
            board,
            preview_size: Size::new(config.camera.preview_width, config.camera.preview_height),
        })
    }

    /// Run until the user quits
    pub fn run(&mut self) -> Result<()> {
        info!("Entering main loop");

        let mut fps = 0.0;
        let mut last_fps_update = Instant::now();
        let mut frames_at_update = 0;

        loop {
            let frames_shown = lock(&self.board).frames_shown();
            let elapsed = last_fps_update.elapsed();
            if elapsed >= Duration::from_secs(1) {
                fps = (frames_shown - frames_at_update) as f64 / elapsed.as_secs_f64();
                frames_at_update = frames_shown;
                last_fps_update = Instant::now();
            }

            self.render(fps)?;

            match key_action(highgui::wait_key(KEY_POLL_MS)?) {
                Some(KeyAction::Quit) => {
                    info!("Exit requested by user");
                    break;
                }
                Some(KeyAction::Command(command)) => self.dispatch(command),
                None => {}
            }
        }

        info!("Application shutting down");
        self.session.shutdown()?;
        highgui::destroy_all_windows()?;
        Ok(())
    }

    /// Hand a command to the session; failures are logged and the app keeps going
    fn dispatch(&mut self, command: Command) {
        match self.session.handle(command) {
            Ok(true) => {}
            Ok(false) => debug!("{command:?} has no effect in {:?}", self.session.state()),
            Err(e) => warn!("{command:?} failed: {e}"),
        }
    }

    /// Draw the preview and the pose gallery
    fn render(&self, fps: f64) -> Result<()> {
        let status = status_line(
            self.session.state(),
            self.session.tolerance(),
            self.session.sample_count(),
            fps,
        );

        let (mut frame, gallery) = {
            let board = lock(&self.board);
            let frame = match board.preview() {
                Some(preview) if self.session.is_running() => preview.try_clone()?,
                _ => self.help_screen()?,
            };
            (frame, board.gallery()?)
        };

        imgproc::put_text(
            &mut frame,
            &status,
            Point::new(10, 30),
            FONT_HERSHEY_SIMPLEX,
            0.7,
            Scalar::new(0.0, 255.0, 0.0, 0.0),
            2,
            LINE_8,
            false,
        )?;

        highgui::imshow(PREVIEW_WINDOW, &frame)?;
        highgui::imshow(GALLERY_WINDOW, &gallery)?;
        Ok(())
    }

    fn help_screen(&self) -> Result<Mat> {
        let mut screen = Mat::new_rows_cols_with_default(
            self.preview_size.height,
            self.preview_size.width,
            CV_8UC3,
            Scalar::all(32.0),
        )?;

        for (i, line) in HELP_LINES.iter().enumerate() {
            let y = 90 + 40 * i32::try_from(i).unwrap_or(0);
            imgproc::put_text(
                &mut screen,
                line,
                Point::new(20, y),
                FONT_HERSHEY_SIMPLEX,
                0.8,
                Scalar::new(236.0, 232.0, 221.0, 0.0),
                2,
                LINE_8,
                false,
            )?;
        }
        Ok(screen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bindings() {
        assert_eq!(key_action(-1), None);
        assert_eq!(key_action(i32::from(b'q')), Some(KeyAction::Quit));
        assert_eq!(key_action(27), Some(KeyAction::Quit));
        assert_eq!(
            key_action(i32::from(b'h')),
            Some(KeyAction::Command(Command::SelectMode(SessionMode::Hand)))
        );
        assert_eq!(key_action(i32::from(b' ')), Some(KeyAction::Command(Command::Start)));
        assert_eq!(
            key_action(i32::from(b'3')),
            Some(KeyAction::Command(Command::SetTolerance(Tolerance::Easy)))
        );
        assert_eq!(key_action(i32::from(b'x')), None);
    }

    #[test]
    fn test_key_with_modifier_bits() {
        // Some backends report modifier state above the low byte
        let key = 0x10_0000 | i32::from(b'c');
        assert_eq!(key_action(key), Some(KeyAction::Command(Command::CaptureSample)));
    }

    #[test]
    fn test_status_line() {
        let line = status_line(SessionState::Detecting, 40, 3, 29.96);
        assert_eq!(line, "detecting | poses 3 | tolerance 40 | FPS 30.0");
    }
}
