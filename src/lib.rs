//! Liveness-gated face capture.
//!
//! This library drives a webcam through a short head-turn challenge and
//! produces a framed JPEG photo once the user has proven they are present:
//! - A camera session that always releases the device before reacquiring it
//! - Face detection (SCRFD) and 68-point landmarks through ONNX Runtime
//! - A yaw ratio computed from the nose tip and jaw line
//! - A consecutive-frame state machine: center, left, right, center
//! - A compositor that crops around the face and resizes to the profile size
//!
//! The pipeline runs per frame:
//! 1. Read a frame from the camera
//! 2. Detect the most confident face and its landmarks
//! 3. Classify the yaw ratio into center, left or right
//! 4. Advance the liveness state machine
//! 5. Compose and encode the photo when the final pose is held
//!
//! Camera (`opencv`) and model (`onnx`) backends are optional features. The
//! rest of the crate is pure Rust and works with any [`camera::CameraDevice`]
//! and [`face_detection::FaceDetector`].
//!
//! # Examples
//!
//! ## Liveness Challenge
//!
//! ```
//! use liveness_capture::config::LivenessConfig;
//! use liveness_capture::liveness::{LivenessMachine, LivenessState, Observation};
//! use std::time::Instant;
//!
//! # fn main() -> liveness_capture::Result<()> {
//! let mut machine = LivenessMachine::new(&LivenessConfig::default())?;
//! let now = Instant::now();
//! machine.start(now);
//!
//! for _ in 0..10 {
//!     machine.observe(Observation::Yaw(0.5), now);
//! }
//! assert_eq!(machine.state(), LivenessState::AwaitingLeft);
//! # Ok(())
//! # }
//! ```
//!
//! ## Composing a Photo
//!
//! ```
//! use liveness_capture::compositor::PhotoCompositor;
//! use liveness_capture::config::CaptureProfile;
//! use liveness_capture::face_detection::FaceBox;
//! use liveness_capture::frame::VideoFrame;
//!
//! # fn main() -> liveness_capture::Result<()> {
//! let frame = VideoFrame::new(image::RgbImage::new(640, 480));
//! let face = FaceBox::new(260.0, 160.0, 120.0, 150.0);
//!
//! let compositor = PhotoCompositor::new(CaptureProfile::id_card())?;
//! let photo = compositor.compose(&frame, Some(&face))?;
//! assert_eq!((photo.width, photo.height), (135, 189));
//! # Ok(())
//! # }
//! ```
//!
//! ## Capture Session
//!
//! ```no_run
//! # #[cfg(all(feature = "opencv", feature = "onnx"))]
//! # fn main() -> liveness_capture::Result<()> {
//! use liveness_capture::camera::opencv::OpencvCamera;
//! use liveness_capture::config::Config;
//! use liveness_capture::face_detection::{onnx::OnnxFaceDetector, GatedDetector};
//! use liveness_capture::session::{CaptureEvent, CaptureSession, RunOutcome};
//!
//! let config = Config::default();
//! let detection = config.detection.clone();
//! let detector = GatedDetector::spawn(move || OnnxFaceDetector::load(&detection));
//!
//! let mut session = CaptureSession::new(OpencvCamera::new(), detector, config)?;
//! session.on_event(|event| {
//!     if let CaptureEvent::Instruction(instruction) = event {
//!         println!("{instruction}");
//!     }
//! });
//!
//! session.start()?;
//! if let RunOutcome::Captured(photo) = session.run()? {
//!     photo.save("photo.jpg")?;
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(all(feature = "opencv", feature = "onnx")))]
//! # fn main() {}
//! ```

/// Camera acquisition with guaranteed release
pub mod camera;

/// Face cropping, resizing and JPEG encoding
pub mod compositor;

/// YAML configuration and capture profiles
pub mod config;

/// Constants used throughout the library
pub mod constants;

/// Error types and result aliases
pub mod error;

/// Face detection types, background model loading and ONNX detectors
pub mod face_detection;

/// Smoothing filters for the yaw ratio
pub mod filters;

/// Timestamped camera frames
pub mod frame;

/// Yaw ratio and band classification
pub mod head_pose;

/// Head-turn liveness state machine
pub mod liveness;

/// Detection overlay drawing
pub mod overlay;

/// Capture widget tying the pipeline together
pub mod session;

/// Utility functions for type conversions and image handling
pub mod utils;

pub use error::{CameraError, CameraErrorKind, Error, Result};
