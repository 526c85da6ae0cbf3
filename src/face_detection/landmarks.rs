use super::Point;
use crate::constants::NUM_FACIAL_LANDMARKS;
use crate::utils::image_conversion::rgb_to_nhwc_f32;
use crate::{Error, Result};
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::CowArray;
use ort::{Environment, Session, Value};
use std::path::Path;
use std::sync::Arc;

/// Default landmark detector input size
const DEFAULT_LANDMARK_INPUT_SIZE: u32 = 128;

/// 68-point facial landmark regressor using `ONNX` Runtime
pub struct LandmarkDetector {
    session: Session,
    input_size: u32,
}

impl LandmarkDetector {
    /// Create a new landmark detector from an `ONNX` model file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The ONNX model file cannot be loaded
    /// - The ONNX runtime environment cannot be created
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        log::info!("Loading landmark model: {}", model_path.as_ref().display());
        let environment = Arc::new(
            Environment::builder()
                .with_name("mark_detector")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        if session.outputs.is_empty() {
            return Err(Error::ModelLoad("Landmark model has no outputs".to_string()));
        }

        Ok(Self {
            session,
            input_size: DEFAULT_LANDMARK_INPUT_SIZE,
        })
    }

    /// Detect 68 landmarks in a square face crop, in crop coordinates
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails or the output is too short
    pub fn detect(&self, face_image: &RgbImage) -> Result<Vec<Point>> {
        let resized = imageops::resize(face_image, self.input_size, self.input_size, FilterType::Triangle);
        let inputs = rgb_to_nhwc_f32(&resized, 255.0)?;

        let cow_array = CowArray::from(inputs.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let marks_output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| Error::ModelOutputError("No output from landmark model".to_string()))?;
        let marks_tensor = marks_output.try_extract::<f32>()?;
        let marks_view = marks_tensor.view();
        let marks = marks_view
            .as_slice()
            .ok_or_else(|| Error::ModelOutputError("Failed to get landmark data".to_string()))?;

        scale_marks(marks, self.input_size, face_image.width(), face_image.height())
    }
}

/// Map model-space marks to crop pixel coordinates
#[allow(clippy::cast_precision_loss)] // Precision loss acceptable for pixel coordinates
fn scale_marks(marks: &[f32], input_size: u32, face_width: u32, face_height: u32) -> Result<Vec<Point>> {
    if marks.len() < NUM_FACIAL_LANDMARKS * 2 {
        return Err(Error::ModelOutputError(format!(
            "Expected {} landmark values, got {}",
            NUM_FACIAL_LANDMARKS * 2,
            marks.len()
        )));
    }

    let sx = face_width as f32 / input_size as f32;
    let sy = face_height as f32 / input_size as f32;
    Ok(marks
        .chunks_exact(2)
        .take(NUM_FACIAL_LANDMARKS)
        .map(|xy| Point::new(xy[0] * sx, xy[1] * sy))
        .collect())
}
