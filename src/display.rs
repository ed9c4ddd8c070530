//! Preview and thumbnail output.
//!
//! The frame loop and the command handler write to a [`DisplaySink`]. The
//! [`DisplayBoard`] sink keeps the latest images in memory so that the thread
//! owning the GUI can draw them.

use crate::{
    constants::{MATCH_LABEL_SCALE, MATCH_LABEL_THICKNESS, MATCH_LABEL_X, MATCH_LABEL_Y, MAX_POSES},
    Error, Result,
};
use opencv::{
    core::{Mat, Point, Scalar, Size, Vector, CV_8UC3},
    imgproc::{self, InterpolationFlags, FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Receives preview frames, slot thumbnails and slot labels
pub trait DisplaySink: Send {
    /// Show the latest preview frame
    fn show_frame(&mut self, image: &Mat) -> Result<()>;

    /// Show the thumbnail of a captured pose
    fn show_thumbnail(&mut self, slot: usize, image: &Mat) -> Result<()>;

    /// Remove the thumbnail and label of a slot
    fn clear_thumbnail(&mut self, slot: usize) -> Result<()>;

    /// Attach an action name to a slot
    fn label_slot(&mut self, slot: usize, label: &str) -> Result<()>;
}

/// Display sink shared between the frame loop and the command handler
pub type SharedDisplay = Arc<Mutex<dyn DisplaySink>>;

/// Lock a mutex, recovering the data if a previous holder panicked
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn check_slot(slot: usize) -> Result<()> {
    if slot < MAX_POSES {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("Slot {slot} out of range")))
    }
}

fn red() -> Scalar {
    Scalar::new(0.0, 0.0, 255.0, 0.0)
}

/// Render the thumbnail for a pose captured in `slot`
///
/// # Errors
///
/// Returns an error if drawing or resizing fails
pub fn render_thumbnail(frame: &Mat, slot: usize, size: Size) -> Result<Mat> {
    let mut labelled = frame.try_clone()?;
    imgproc::put_text(
        &mut labelled,
        &format!("pose {}", slot + 1),
        Point::new(50, 70),
        FONT_HERSHEY_SIMPLEX,
        2.0,
        red(),
        5,
        LINE_8,
        false,
    )?;

    let mut thumbnail = Mat::default();
    imgproc::resize(
        &labelled,
        &mut thumbnail,
        size,
        0.0,
        0.0,
        InterpolationFlags::INTER_AREA as i32,
    )?;
    Ok(thumbnail)
}

/// Write the detection result onto a preview frame
///
/// Nothing is drawn when no pose matched.
///
/// # Errors
///
/// Returns an error if drawing fails
pub fn overlay_match(frame: &mut Mat, matched: Option<usize>) -> Result<()> {
    if let Some(index) = matched {
        imgproc::put_text(
            frame,
            &format!("pose {}", index + 1),
            Point::new(MATCH_LABEL_X, MATCH_LABEL_Y),
            FONT_HERSHEY_SIMPLEX,
            MATCH_LABEL_SCALE,
            red(),
            MATCH_LABEL_THICKNESS,
            LINE_8,
            false,
        )?;
    }
    Ok(())
}

/// In-memory display state rendered by the GUI thread
pub struct DisplayBoard {
    preview: Option<Mat>,
    thumbnails: [Option<Mat>; MAX_POSES],
    labels: [Option<String>; MAX_POSES],
    thumbnail_size: Size,
    frames_shown: u64,
}

impl DisplayBoard {
    /// Create an empty board
    #[must_use]
    pub fn new(thumbnail_size: Size) -> Self {
        Self {
            preview: None,
            thumbnails: Default::default(),
            labels: Default::default(),
            thumbnail_size,
            frames_shown: 0,
        }
    }

    /// Latest preview frame
    #[must_use]
    pub fn preview(&self) -> Option<&Mat> {
        self.preview.as_ref()
    }

    /// Number of preview frames received so far
    #[must_use]
    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }

    #[must_use]
    pub fn thumbnail(&self, slot: usize) -> Option<&Mat> {
        self.thumbnails.get(slot).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn label(&self, slot: usize) -> Option<&str> {
        self.labels.get(slot).and_then(Option::as_deref)
    }

    /// Number of slots currently showing a thumbnail
    #[must_use]
    pub fn thumbnail_count(&self) -> usize {
        self.thumbnails.iter().flatten().count()
    }

    /// Compose all slots into a grid of two columns and three rows
    ///
    /// Empty slots are white, labels are written in the top left corner.
    ///
    /// # Errors
    ///
    /// Returns an error if composing the image fails
    pub fn gallery(&self) -> Result<Mat> {
        let size = self.thumbnail_size;
        let mut rows = Vector::<Mat>::new();

        for row in 0..MAX_POSES / 2 {
            let mut cells = Vector::<Mat>::new();
            for col in 0..2 {
                let slot = row * 2 + col;
                cells.push(self.render_cell(slot, size)?);
            }
            let mut joined = Mat::default();
            opencv::core::hconcat(&cells, &mut joined)?;
            rows.push(joined);
        }

        let mut gallery = Mat::default();
        opencv::core::vconcat(&rows, &mut gallery)?;
        Ok(gallery)
    }

    fn render_cell(&self, slot: usize, size: Size) -> Result<Mat> {
        let mut cell = match &self.thumbnails[slot] {
            Some(thumbnail) if thumbnail.size()? == size => thumbnail.try_clone()?,
            Some(thumbnail) => {
                let mut resized = Mat::default();
                imgproc::resize(thumbnail, &mut resized, size, 0.0, 0.0, InterpolationFlags::INTER_AREA as i32)?;
                resized
            }
            None => Mat::new_rows_cols_with_default(size.height, size.width, CV_8UC3, Scalar::all(255.0))?,
        };

        if let Some(label) = &self.labels[slot] {
            imgproc::put_text(
                &mut cell,
                label,
                Point::new(10, size.height - 10),
                FONT_HERSHEY_SIMPLEX,
                0.6,
                Scalar::new(0.0, 160.0, 0.0, 0.0),
                2,
                LINE_8,
                false,
            )?;
        }

        Ok(cell)
    }
}

impl DisplaySink for DisplayBoard {
    fn show_frame(&mut self, image: &Mat) -> Result<()> {
        self.preview = Some(image.try_clone()?);
        self.frames_shown += 1;
        Ok(())
    }

    fn show_thumbnail(&mut self, slot: usize, image: &Mat) -> Result<()> {
        check_slot(slot)?;
        self.thumbnails[slot] = Some(image.try_clone()?);
        Ok(())
    }

    fn clear_thumbnail(&mut self, slot: usize) -> Result<()> {
        check_slot(slot)?;
        self.thumbnails[slot] = None;
        self.labels[slot] = None;
        Ok(())
    }

    fn label_slot(&mut self, slot: usize, label: &str) -> Result<()> {
        check_slot(slot)?;
        self.labels[slot] = Some(label.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Mat {
        Mat::new_rows_cols_with_default(600, 800, CV_8UC3, Scalar::all(40.0)).unwrap()
    }

    #[test]
    fn test_render_thumbnail_size() {
        let thumbnail = render_thumbnail(&frame(), 0, Size::new(160, 120)).unwrap();
        assert_eq!(thumbnail.cols(), 160);
        assert_eq!(thumbnail.rows(), 120);
    }

    #[test]
    fn test_overlay_match_draws_only_on_match() {
        let mut untouched = frame();
        overlay_match(&mut untouched, None).unwrap();
        let pixel = *untouched.at_2d::<opencv::core::Vec3b>(440, 60).unwrap();
        assert_eq!(pixel[2], 40);

        let mut marked = frame();
        overlay_match(&mut marked, Some(1)).unwrap();
        let mut red_pixels = 0;
        for row in 350..460 {
            for col in 50..300 {
                if marked.at_2d::<opencv::core::Vec3b>(row, col).unwrap()[2] == 255 {
                    red_pixels += 1;
                }
            }
        }
        assert!(red_pixels > 0);
    }

    #[test]
    fn test_board_slots() {
        let mut board = DisplayBoard::new(Size::new(160, 120));
        let thumbnail = render_thumbnail(&frame(), 2, Size::new(160, 120)).unwrap();

        board.show_thumbnail(2, &thumbnail).unwrap();
        board.label_slot(2, "left").unwrap();
        assert_eq!(board.thumbnail_count(), 1);
        assert_eq!(board.label(2), Some("left"));

        board.clear_thumbnail(2).unwrap();
        assert_eq!(board.thumbnail_count(), 0);
        assert_eq!(board.label(2), None);

        assert!(board.show_thumbnail(MAX_POSES, &thumbnail).is_err());
        assert!(board.label_slot(9, "up").is_err());
    }

    #[test]
    fn test_board_preview() {
        let mut board = DisplayBoard::new(Size::new(160, 120));
        assert!(board.preview().is_none());
        board.show_frame(&frame()).unwrap();
        board.show_frame(&frame()).unwrap();
        assert_eq!(board.frames_shown(), 2);
        assert_eq!(board.preview().unwrap().cols(), 800);
    }

    #[test]
    fn test_gallery_layout() {
        let mut board = DisplayBoard::new(Size::new(160, 120));
        // A thumbnail of the wrong size is scaled into its cell
        let odd = Mat::new_rows_cols_with_default(50, 50, CV_8UC3, Scalar::all(0.0)).unwrap();
        board.show_thumbnail(5, &odd).unwrap();
        board.label_slot(0, "forward").unwrap();

        let gallery = board.gallery().unwrap();
        assert_eq!(gallery.cols(), 320);
        assert_eq!(gallery.rows(), 360);
    }
}
