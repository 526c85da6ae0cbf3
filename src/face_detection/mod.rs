//! Face detection types and the detector abstraction.
//!
//! A detector reports the most confident face in a frame together with its
//! 68-point landmarks. The concrete ONNX backend lives behind the `onnx`
//! feature; tests and other backends implement [`FaceDetector`] directly.

/// Background model loading and readiness gating
pub mod gate;

/// SCRFD anchor-based face detector
#[cfg(feature = "onnx")]
pub mod scrfd;

/// 68-point landmark regressor
#[cfg(feature = "onnx")]
pub mod landmarks;

/// Combined detector + landmark pipeline
#[cfg(feature = "onnx")]
pub mod onnx;

pub use gate::{GatedDetector, ModelStatus};

use crate::{frame::VideoFrame, Result};

/// A 2-D point in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Horizontal position
    pub x: f32,
    /// Vertical position
    pub y: f32,
}

impl Point {
    /// Create a point
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned face rectangle in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FaceBox {
    /// Left edge
    pub x: f32,
    /// Top edge
    pub y: f32,
    /// Width
    pub width: f32,
    /// Height
    pub height: f32,
}

impl FaceBox {
    /// Create a box from its top-left corner and size
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Create a box from corner coordinates
    #[must_use]
    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
        }
    }

    /// Right edge
    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Box area, zero for degenerate boxes
    #[must_use]
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Whether the box has a positive, finite size
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }

    /// Intersection over union with another box
    #[must_use]
    pub fn iou(&self, other: &Self) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

/// One detected face: box, landmarks and confidence
#[derive(Debug, Clone, PartialEq)]
pub struct FaceDetection {
    /// Bounding box in frame coordinates
    pub bbox: FaceBox,
    /// 68 landmarks in frame coordinates, empty when unavailable
    pub landmarks: Vec<Point>,
    /// Detector confidence in [0, 1]
    pub confidence: f32,
}

impl FaceDetection {
    /// Detection with a box only
    #[must_use]
    pub fn new(bbox: FaceBox, confidence: f32) -> Self {
        Self {
            bbox,
            landmarks: Vec::new(),
            confidence,
        }
    }

    /// Attach landmarks
    #[must_use]
    pub fn with_landmarks(mut self, landmarks: Vec<Point>) -> Self {
        self.landmarks = landmarks;
        self
    }
}

/// Locates faces in video frames
pub trait FaceDetector: Send {
    /// All faces in the frame, most confident first
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails
    fn detect_all(&mut self, frame: &VideoFrame) -> Result<Vec<FaceDetection>>;

    /// The single most confident face, if any
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails
    fn detect(&mut self, frame: &VideoFrame) -> Result<Option<FaceDetection>> {
        Ok(self.detect_all(frame)?.into_iter().next())
    }
}

impl<D: FaceDetector + ?Sized> FaceDetector for Box<D> {
    fn detect_all(&mut self, frame: &VideoFrame) -> Result<Vec<FaceDetection>> {
        (**self).detect_all(frame)
    }

    fn detect(&mut self, frame: &VideoFrame) -> Result<Option<FaceDetection>> {
        (**self).detect(frame)
    }
}

/// Greedy non-maximum suppression over detections sorted by confidence
#[must_use]
pub fn non_max_suppression(mut detections: Vec<FaceDetection>, iou_threshold: f32) -> Vec<FaceDetection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<FaceDetection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        if keep.iter().all(|kept| kept.bbox.iou(&candidate.bbox) <= iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}
