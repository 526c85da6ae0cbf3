//! Helper functions and test doubles shared by the integration tests
#![allow(dead_code)]

use image::{Rgb, RgbImage};
use liveness_capture::camera::{CameraConstraints, CameraDevice, FrameSize};
use liveness_capture::config::{CaptureProfile, Config};
use liveness_capture::constants::{JAW_LEFT_INDEX, JAW_RIGHT_INDEX, NOSE_TIP_INDEX, NUM_FACIAL_LANDMARKS};
use liveness_capture::face_detection::{FaceBox, FaceDetection, FaceDetector, Point};
use liveness_capture::frame::VideoFrame;
use liveness_capture::{CameraError, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const FRAME_WIDTH: u32 = 640;
pub const FRAME_HEIGHT: u32 = 480;

/// Face box used by [`face_with_yaw`]
pub const FACE: FaceBox = FaceBox::new(260.0, 160.0, 120.0, 150.0);

/// Device lifecycle as seen by a [`RecordingCamera`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    Open,
    Release,
}

/// Camera double that logs every open and release
#[derive(Default)]
pub struct RecordingCamera {
    pub log: Arc<Mutex<Vec<DeviceEvent>>>,
    pub open_results: VecDeque<std::result::Result<FrameSize, CameraError>>,
    held: bool,
}

impl RecordingCamera {
    pub fn new() -> (Self, Arc<Mutex<Vec<DeviceEvent>>>) {
        let camera = Self::default();
        let log = Arc::clone(&camera.log);
        (camera, log)
    }

    pub fn failing(errors: Vec<CameraError>) -> (Self, Arc<Mutex<Vec<DeviceEvent>>>) {
        let (mut camera, log) = Self::new();
        camera.open_results = errors.into_iter().map(Err).collect();
        (camera, log)
    }
}

impl CameraDevice for RecordingCamera {
    fn open(&mut self, _constraints: &CameraConstraints) -> std::result::Result<FrameSize, CameraError> {
        assert!(!self.held, "device opened while still held");
        self.log.lock().unwrap().push(DeviceEvent::Open);
        let result = self
            .open_results
            .pop_front()
            .unwrap_or(Ok(FrameSize::new(FRAME_WIDTH, FRAME_HEIGHT)));
        self.held = result.is_ok();
        result
    }

    fn read_frame(&mut self) -> std::result::Result<Option<VideoFrame>, CameraError> {
        Ok(Some(test_frame(FRAME_WIDTH, FRAME_HEIGHT)))
    }

    fn release(&mut self) {
        if self.held {
            self.log.lock().unwrap().push(DeviceEvent::Release);
        }
        self.held = false;
    }
}

/// Detector that replays a script of yaw ratios, repeating the last entry
pub struct ScriptedDetector {
    script: VecDeque<Option<f64>>,
    last: Option<f64>,
}

impl ScriptedDetector {
    pub fn new(script: Vec<Option<f64>>) -> Self {
        Self {
            script: script.into(),
            last: None,
        }
    }

    /// Center, left, right, then center until captured
    pub fn full_challenge() -> Self {
        let mut script = Vec::new();
        script.extend(std::iter::repeat(Some(0.5)).take(10));
        script.extend(std::iter::repeat(Some(0.8)).take(5));
        script.extend(std::iter::repeat(Some(0.2)).take(5));
        script.push(Some(0.5));
        Self::new(script)
    }
}

impl FaceDetector for ScriptedDetector {
    fn detect_all(&mut self, _frame: &VideoFrame) -> Result<Vec<FaceDetection>> {
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        Ok(self.last.map(face_with_yaw).into_iter().collect())
    }
}

/// Detection at [`FACE`] whose landmarks give `ratio`
pub fn face_with_yaw(ratio: f64) -> FaceDetection {
    let mut landmarks = vec![Point::new(FACE.x + FACE.width / 2.0, FACE.y + FACE.height / 2.0); NUM_FACIAL_LANDMARKS];
    #[allow(clippy::cast_possible_truncation)]
    let nose_x = FACE.x + FACE.width * ratio as f32;
    landmarks[JAW_LEFT_INDEX] = Point::new(FACE.x, FACE.y + 60.0);
    landmarks[JAW_RIGHT_INDEX] = Point::new(FACE.right(), FACE.y + 60.0);
    landmarks[NOSE_TIP_INDEX] = Point::new(nose_x, FACE.y + 80.0);
    FaceDetection::new(FACE, 0.95).with_landmarks(landmarks)
}

/// Horizontal gradient frame so crops are distinguishable
pub fn test_frame(width: u32, height: u32) -> VideoFrame {
    #[allow(clippy::cast_possible_truncation)]
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 255 / width.max(1)) as u8, (y * 255 / height.max(1)) as u8, 128])
    });
    VideoFrame::new(image)
}

/// Config with fast cycles for session tests
pub fn fast_config(profile: CaptureProfile) -> Config {
    let mut config = Config::with_profile(profile);
    config.camera.frame_interval_ms = 1;
    config.camera.settle_delay_ms = 0;
    config
}
