//! Landmark extraction from camera frames.
//!
//! The session only sees the [`LandmarkExtractor`] trait. The shipped backend
//! runs a single-stage landmark model through ONNX Runtime on the whole frame
//! and draws the detected skeleton on a copy of it.

use crate::{
    config::{LandmarkModelConfig, ModelConfig},
    landmarks::{HandSide, Landmark, SessionMode, BODY_LANDMARK_COUNT, HAND_LANDMARK_COUNT, UPPER_BODY_RANGE},
    utils::{landmark_to_pixel, safe_cast::{i32_to_usize, usize_to_i32}},
    Error, Result,
};
use log::{debug, info};
use ndarray::{Array4, CowArray};
use opencv::core::{Mat, Scalar, Size, Vec3f, CV_32F};
use opencv::imgproc::{self, InterpolationFlags, LINE_8};
use opencv::prelude::*;
use ort::{Environment, Session, Value};
use std::sync::Arc;

/// Landmarks found in one frame, and the frame with the skeleton drawn on it
pub struct Extraction {
    /// Ordered landmarks, empty when nothing was detected
    pub landmarks: Vec<Landmark>,
    /// Copy of the input frame with annotations
    pub annotated: Mat,
}

/// Produces landmark lists from frames
pub trait LandmarkExtractor: Send {
    /// Extract landmarks from a frame
    fn extract(&mut self, frame: &Mat) -> Result<Extraction>;

    /// Mode this extractor was built for
    fn mode(&self) -> SessionMode;
}

/// Builds the extractor for a session mode
pub trait ExtractorFactory: Send {
    /// Create an extractor for `mode`
    fn create(&self, mode: SessionMode) -> Result<Box<dyn LandmarkExtractor>>;
}

/// Factory for [`OnnxLandmarkExtractor`]s
pub struct OnnxExtractorFactory {
    models: ModelConfig,
}

impl OnnxExtractorFactory {
    #[must_use]
    pub fn new(models: ModelConfig) -> Self {
        Self { models }
    }
}

impl ExtractorFactory for OnnxExtractorFactory {
    fn create(&self, mode: SessionMode) -> Result<Box<dyn LandmarkExtractor>> {
        let extractor = OnnxLandmarkExtractor::new(mode, self.models.for_mode(mode), self.models.hand_side)?;
        Ok(Box::new(extractor))
    }
}

/// Landmark extractor backed by an ONNX landmark model
pub struct OnnxLandmarkExtractor {
    session: Session,
    mode: SessionMode,
    input_size: i32,
    values_per_landmark: usize,
    presence_output: Option<usize>,
    handedness_output: Option<usize>,
    min_presence: f32,
    hand_side: HandSide,
}

impl OnnxLandmarkExtractor {
    /// Load the landmark model for `mode`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The ONNX model file cannot be loaded
    /// - The model has no inputs or outputs
    /// - The ONNX runtime environment cannot be created
    pub fn new(mode: SessionMode, model: &LandmarkModelConfig, hand_side: HandSide) -> Result<Self> {
        info!("Loading {} landmark model: {}", mode, model.path.display());
        let environment = Arc::new(
            Environment::builder()
                .with_name("landmark_extractor")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(&model.path)?;

        if session.inputs.is_empty() {
            return Err(Error::ModelError("Model has no inputs".to_string()));
        }
        if session.outputs.is_empty() {
            return Err(Error::ModelError("Model has no outputs".to_string()));
        }

        Ok(Self {
            session,
            mode,
            input_size: model.input_size,
            values_per_landmark: model.values_per_landmark,
            presence_output: model.presence_output,
            handedness_output: model.handedness_output,
            min_presence: model.min_presence,
            hand_side,
        })
    }

    /// Resize, convert to RGB and scale to [0, 1] in NHWC layout
    fn preprocess(&self, frame: &Mat) -> Result<Array4<f32>> {
        let size = i32_to_usize(self.input_size)?;
        let channels = 3;

        let mut resized = Mat::default();
        imgproc::resize(
            frame,
            &mut resized,
            Size::new(self.input_size, self.input_size),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let mut rgb_image = Mat::default();
        imgproc::cvt_color(&resized, &mut rgb_image, imgproc::COLOR_BGR2RGB, 0)?;

        let mut float_image = Mat::default();
        rgb_image.convert_to(&mut float_image, CV_32F, 1.0 / 255.0, 0.0)?;

        let mut data = Vec::with_capacity(size * size * channels);
        for row in 0..size {
            for col in 0..size {
                let pixel = float_image.at_2d::<Vec3f>(usize_to_i32(row)?, usize_to_i32(col)?)?;
                data.extend_from_slice(&[pixel[0], pixel[1], pixel[2]]);
            }
        }

        Array4::from_shape_vec((1, size, size, channels), data)
            .map_err(|e| Error::ModelOutputError(format!("Failed to create input array: {e}")))
    }

    /// Run the model and return every output flattened
    fn forward(&self, input: Array4<f32>) -> Result<Vec<Vec<f32>>> {
        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;

        let outputs = self.session.run(vec![input_tensor])?;

        outputs
            .iter()
            .map(|output| -> Result<Vec<f32>> {
                let tensor = output.try_extract::<f32>()?;
                let values: Vec<f32> = tensor.view().iter().copied().collect();
                Ok(values)
            })
            .collect()
    }

    /// Number of landmarks the model reports for this mode
    fn model_landmark_count(&self) -> usize {
        match self.mode {
            SessionMode::Hand => HAND_LANDMARK_COUNT,
            SessionMode::HalfBody | SessionMode::FullBody => BODY_LANDMARK_COUNT,
        }
    }

    /// Interpret raw model outputs
    fn postprocess(&self, outputs: &[Vec<f32>]) -> Result<Vec<Landmark>> {
        if let Some(index) = self.presence_output {
            let presence = scalar_output(outputs, index)?;
            if presence < self.min_presence {
                debug!("Presence {presence:.2} below threshold");
                return Ok(Vec::new());
            }
        }

        if let Some(index) = self.handedness_output {
            let side = HandSide::from_score(scalar_output(outputs, index)?);
            if side != self.hand_side {
                debug!("Ignoring {side:?} hand");
                return Ok(Vec::new());
            }
        }

        let values = outputs
            .first()
            .ok_or_else(|| Error::ModelOutputError("No output from model".to_string()))?;

        decode_landmarks(
            values,
            self.model_landmark_count(),
            self.values_per_landmark,
            self.input_size,
        )
    }
}

impl LandmarkExtractor for OnnxLandmarkExtractor {
    fn extract(&mut self, frame: &Mat) -> Result<Extraction> {
        let input = self.preprocess(frame)?;
        let outputs = self.forward(input)?;
        let landmarks = self.postprocess(&outputs)?;

        let mut annotated = frame.try_clone()?;
        draw_skeleton(&mut annotated, &landmarks, self.mode.connections())?;

        let landmarks = if self.mode == SessionMode::HalfBody && !landmarks.is_empty() {
            landmarks[UPPER_BODY_RANGE].to_vec()
        } else {
            landmarks
        };

        Ok(Extraction { landmarks, annotated })
    }

    fn mode(&self) -> SessionMode {
        self.mode
    }
}

/// First value of the output at `index`
fn scalar_output(outputs: &[Vec<f32>], index: usize) -> Result<f32> {
    outputs
        .get(index)
        .and_then(|values| values.first().copied())
        .ok_or_else(|| Error::ModelOutputError(format!("Missing scalar output {index}")))
}

/// Convert model-pixel landmark values into image fractions
///
/// # Errors
///
/// Returns an error if the output holds fewer values than `count` landmarks need
pub fn decode_landmarks(
    values: &[f32],
    count: usize,
    values_per_landmark: usize,
    input_size: i32,
) -> Result<Vec<Landmark>> {
    let needed = count * values_per_landmark;
    if values_per_landmark < 2 || values.len() < needed {
        return Err(Error::ModelOutputError(format!(
            "Expected {needed} landmark values, got {}",
            values.len()
        )));
    }

    let scale = f64::from(input_size);
    Ok(values[..needed]
        .chunks_exact(values_per_landmark)
        .map(|chunk| Landmark::new(f64::from(chunk[0]) / scale, f64::from(chunk[1]) / scale))
        .collect())
}

/// Draw bones and joints of a skeleton onto a frame
///
/// # Errors
///
/// Returns an error if drawing fails
pub fn draw_skeleton(frame: &mut Mat, landmarks: &[Landmark], connections: &[(usize, usize)]) -> Result<()> {
    if landmarks.is_empty() {
        return Ok(());
    }

    let (width, height) = (frame.cols(), frame.rows());

    for &(a, b) in connections {
        if let (Some(start), Some(end)) = (landmarks.get(a), landmarks.get(b)) {
            imgproc::line(
                frame,
                landmark_to_pixel(start, width, height),
                landmark_to_pixel(end, width, height),
                Scalar::new(224.0, 224.0, 224.0, 0.0),
                2,
                LINE_8,
                0,
            )?;
        }
    }

    for landmark in landmarks {
        imgproc::circle(
            frame,
            landmark_to_pixel(landmark, width, height),
            4,
            Scalar::new(0.0, 0.0, 255.0, 0.0),
            -1,
            LINE_8,
            0,
        )?;
    }

    Ok(())
}
