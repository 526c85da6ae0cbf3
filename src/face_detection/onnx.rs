use super::landmarks::LandmarkDetector;
use super::scrfd::ScrfdDetector;
use super::{FaceDetection, FaceDetector, Point};
use crate::config::DetectionConfig;
use crate::frame::VideoFrame;
use crate::utils::square_face_region;
use crate::Result;
use image::imageops;

/// Fraction of the face box added on each side before landmarking
const LANDMARK_BOX_SHIFT: f32 = 0.1;

/// SCRFD detection followed by 68-point landmarks
pub struct OnnxFaceDetector {
    faces: ScrfdDetector,
    marks: LandmarkDetector,
}

impl OnnxFaceDetector {
    /// Load both models
    ///
    /// # Errors
    ///
    /// Returns an error if either model cannot be loaded
    pub fn load(config: &DetectionConfig) -> Result<Self> {
        let faces = ScrfdDetector::new(&config.face_detector, config.confidence_threshold, config.nms_threshold)?;
        let marks = LandmarkDetector::new(&config.face_landmarks)?;
        Ok(Self { faces, marks })
    }

    #[allow(clippy::cast_precision_loss)]
    fn add_landmarks(&self, frame: &VideoFrame, detection: FaceDetection) -> Result<FaceDetection> {
        let Some(region) = square_face_region(&detection.bbox, frame.width(), frame.height(), LANDMARK_BOX_SHIFT)
        else {
            return Ok(detection);
        };

        let crop = imageops::crop_imm(frame.image(), region.x, region.y, region.width, region.height).to_image();
        let landmarks = self
            .marks
            .detect(&crop)?
            .into_iter()
            .map(|p| Point::new(p.x + region.x as f32, p.y + region.y as f32))
            .collect();

        Ok(detection.with_landmarks(landmarks))
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn detect_all(&mut self, frame: &VideoFrame) -> Result<Vec<FaceDetection>> {
        let detections = self.faces.detect(frame.image())?;
        log::trace!("{} face(s) detected", detections.len());
        detections
            .into_iter()
            .map(|d| self.add_landmarks(frame, d))
            .collect()
    }

    fn detect(&mut self, frame: &VideoFrame) -> Result<Option<FaceDetection>> {
        match self.faces.detect(frame.image())?.into_iter().next() {
            Some(best) => Ok(Some(self.add_landmarks(frame, best)?)),
            None => Ok(None),
        }
    }
}
