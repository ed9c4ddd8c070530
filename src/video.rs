//! Frame acquisition.

use crate::{config::CameraConfig, Error, Result};
use log::{debug, info};
use opencv::{
    core::{Mat, Size},
    imgproc::{self, InterpolationFlags},
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE, CAP_PROP_POS_FRAMES},
};

/// Delivers frames on demand
pub trait VideoSource: Send {
    /// Read the next frame
    ///
    /// `Ok(None)` means no frame was available this time; callers retry.
    fn read_frame(&mut self) -> Result<Option<Mat>>;
}

/// `OpenCV` capture from a webcam or a video file
pub struct CameraSource {
    capture: VideoCapture,
    rewind_on_end: bool,
}

impl CameraSource {
    /// Open the source described by the camera configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the device or file cannot be opened
    pub fn open(config: &CameraConfig) -> Result<Self> {
        let (capture, rewind_on_end) = if let Some(path) = &config.video_file {
            info!("Opening video file: {}", path.display());
            let path = path
                .to_str()
                .ok_or_else(|| Error::InvalidInput(format!("Video path is not UTF-8: {}", path.display())))?;
            (VideoCapture::from_file(path, videoio::CAP_ANY)?, true)
        } else {
            info!("Opening camera {}", config.index);
            let mut cap = VideoCapture::new(config.index, videoio::CAP_ANY)?;

            // Reduce buffer size for lower latency
            cap.set(CAP_PROP_BUFFERSIZE, 1.0)?;
            (cap, false)
        };

        if !capture.is_opened()? {
            return Err(Error::InvalidInput("Failed to open video source".to_string()));
        }

        Ok(Self { capture, rewind_on_end })
    }
}

impl VideoSource for CameraSource {
    fn read_frame(&mut self) -> Result<Option<Mat>> {
        let mut frame = Mat::default();
        if self.capture.read(&mut frame)? && !frame.empty() {
            return Ok(Some(frame));
        }

        // Video files play in a loop
        if self.rewind_on_end {
            debug!("End of video file, rewinding");
            self.capture.set(CAP_PROP_POS_FRAMES, 0.0)?;
        }
        Ok(None)
    }
}

/// Resize a frame to the preview size, optionally mirroring it
///
/// # Errors
///
/// Returns an error if the frame is empty or cannot be resized
pub fn prepare_frame(frame: &Mat, size: Size, mirror: bool) -> Result<Mat> {
    if frame.empty() {
        return Err(Error::InvalidInput("Empty frame".to_string()));
    }

    let mut resized = Mat::default();
    imgproc::resize(
        frame,
        &mut resized,
        size,
        0.0,
        0.0,
        InterpolationFlags::INTER_LINEAR as i32,
    )?;

    if !mirror {
        return Ok(resized);
    }

    let mut mirrored = Mat::default();
    opencv::core::flip(&resized, &mut mirrored, 1)?;
    Ok(mirrored)
}
