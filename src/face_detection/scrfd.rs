use super::{non_max_suppression, FaceBox, FaceDetection};
use crate::constants::{IMAGE_NORMALIZATION_OFFSET, IMAGE_NORMALIZATION_SCALE};
use crate::utils::image_conversion::{letterbox_top_left, rgb_to_nchw_f32};
use crate::{Error, Result};
use image::RgbImage;
use ndarray::CowArray;
use ort::{Environment, Session, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Default SCRFD input size
const DEFAULT_INPUT_SIZE: u32 = 640;

/// SCRFD face detector using ONNX Runtime
pub struct ScrfdDetector {
    session: Session,
    input_size: (u32, u32),
    conf_threshold: f32,
    nms_threshold: f32,
    num_anchors: usize,
    strides: Vec<u32>,
    offset: usize,
    center_cache: HashMap<(u32, u32, u32), Vec<(f32, f32)>>,
}

impl ScrfdDetector {
    /// Create a new face detector from an ONNX model file
    ///
    /// # Errors
    ///
    /// Returns an error if the ONNX runtime environment cannot be created or
    /// the model file cannot be loaded
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new<P: AsRef<Path>>(model_path: P, conf_threshold: f32, nms_threshold: f32) -> Result<Self> {
        log::info!("Loading face detector: {}", model_path.as_ref().display());
        let environment = Arc::new(
            Environment::builder()
                .with_name("face_detector")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        let input_meta = session
            .inputs
            .first()
            .ok_or_else(|| Error::ModelLoad("Face detector has no inputs".to_string()))?;

        // Input shape is [batch, channels, height, width]; dynamic axes fall back to 640
        let dims = &input_meta.dimensions;
        let input_size = if dims.len() >= 4 {
            let height = dims[2].map_or(DEFAULT_INPUT_SIZE, |d| d as u32);
            let width = dims[3].map_or(DEFAULT_INPUT_SIZE, |d| d as u32);
            (width, height)
        } else {
            (DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE)
        };

        let (offset, strides, num_anchors) = match session.outputs.len() {
            6 | 9 => (3, vec![8, 16, 32], 2),
            10 | 15 => (5, vec![8, 16, 32, 64, 128], 1),
            n => {
                log::warn!("Unknown SCRFD configuration with {n} outputs, using defaults");
                (3, vec![8, 16, 32], 2)
            }
        };

        Ok(Self {
            session,
            input_size,
            conf_threshold,
            nms_threshold,
            num_anchors,
            strides,
            offset,
            center_cache: HashMap::new(),
        })
    }

    /// Detect faces, most confident first, in image coordinates
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails or the outputs have an unexpected shape
    pub fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceDetection>> {
        let (input_width, input_height) = self.input_size;
        let (canvas, det_scale) = letterbox_top_left(image, input_width, input_height);
        let inputs = rgb_to_nchw_f32(&canvas, IMAGE_NORMALIZATION_OFFSET, IMAGE_NORMALIZATION_SCALE)?;

        let candidates = self.forward(inputs)?;

        let scaled = candidates
            .into_iter()
            .map(|d| {
                let b = d.bbox;
                FaceDetection::new(
                    FaceBox::new(b.x / det_scale, b.y / det_scale, b.width / det_scale, b.height / det_scale),
                    d.confidence,
                )
            })
            .collect();

        Ok(non_max_suppression(scaled, self.nms_threshold))
    }

    /// Run the model and decode every anchor above the confidence threshold
    #[allow(clippy::cast_precision_loss)]
    fn forward(&mut self, inputs: ndarray::Array4<f32>) -> Result<Vec<FaceDetection>> {
        let (input_width, input_height) = self.input_size;

        let cow_array = CowArray::from(inputs.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let mut detections = Vec::new();
        for (idx, &stride) in self.strides.iter().enumerate() {
            let scores_output = outputs
                .get(idx)
                .ok_or_else(|| Error::ModelOutputError(format!("Missing score output {idx}")))?
                .try_extract::<f32>()?;
            let scores_view = scores_output.view();
            let scores = scores_view
                .as_slice()
                .ok_or_else(|| Error::ModelOutputError("Non-contiguous score output".to_string()))?;

            let bbox_output = outputs
                .get(idx + self.offset)
                .ok_or_else(|| Error::ModelOutputError(format!("Missing bbox output {idx}")))?
                .try_extract::<f32>()?;
            let bbox_view = bbox_output.view();
            let distances = bbox_view
                .as_slice()
                .ok_or_else(|| Error::ModelOutputError("Non-contiguous bbox output".to_string()))?;

            let key = (input_height / stride, input_width / stride, stride);
            let num_anchors = self.num_anchors;
            let centers = self
                .center_cache
                .entry(key)
                .or_insert_with(|| anchor_centers(key.0, key.1, stride, num_anchors));

            if distances.len() < centers.len() * 4 || scores.len() < centers.len() {
                return Err(Error::ModelOutputError(format!(
                    "Stride {stride}: {} anchors but {} scores and {} distances",
                    centers.len(),
                    scores.len(),
                    distances.len()
                )));
            }

            let scale = stride as f32;
            for (i, &(cx, cy)) in centers.iter().enumerate() {
                let score = scores[i];
                if score < self.conf_threshold {
                    continue;
                }
                let d = &distances[i * 4..i * 4 + 4];
                detections.push(FaceDetection::new(
                    distance_to_box(cx, cy, [d[0] * scale, d[1] * scale, d[2] * scale, d[3] * scale]),
                    score,
                ));
            }
        }

        Ok(detections)
    }
}

/// Anchor centers of one feature map, `num_anchors` per cell
#[allow(clippy::cast_precision_loss)]
fn anchor_centers(height: u32, width: u32, stride: u32, num_anchors: usize) -> Vec<(f32, f32)> {
    let mut centers = Vec::with_capacity((height * width) as usize * num_anchors.max(1));
    for y in 0..height {
        for x in 0..width {
            let center = ((x * stride) as f32, (y * stride) as f32);
            for _ in 0..num_anchors.max(1) {
                centers.push(center);
            }
        }
    }
    centers
}

/// Decode left/top/right/bottom distances from an anchor center
fn distance_to_box(cx: f32, cy: f32, distances: [f32; 4]) -> FaceBox {
    FaceBox::from_corners(
        cx - distances[0],
        cy - distances[1],
        cx + distances[2],
        cy + distances[3],
    )
}
