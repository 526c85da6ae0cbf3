//! Constants used throughout the library

use std::time::Duration;

/// Number of facial landmarks in the reference landmark model
pub const NUM_FACIAL_LANDMARKS: usize = 68;

/// Landmark indices in the 68-point layout
pub const JAW_LEFT_INDEX: usize = 0;
pub const JAW_RIGHT_INDEX: usize = 16;
pub const NOSE_TIP_INDEX: usize = 30;

/// Yaw ratio band considered "facing forward" (inclusive)
pub const DEFAULT_CENTER_MIN: f64 = 0.4;
pub const DEFAULT_CENTER_MAX: f64 = 0.6;

/// Consecutive in-band frames required per liveness step
pub const DEFAULT_CENTER_FRAMES: u32 = 10;
pub const DEFAULT_TURN_FRAMES: u32 = 5;
pub const DEFAULT_FINAL_CENTER_FRAMES: u32 = 10;

/// How long a face may be missing before the user is told
pub const DEFAULT_NO_FACE_GRACE: Duration = Duration::from_millis(2000);

/// Delay between releasing and re-acquiring the camera on restart
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// One detection cycle per display refresh
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Preferred capture resolution
pub const DEFAULT_IDEAL_WIDTH: u32 = 640;
pub const DEFAULT_IDEAL_HEIGHT: u32 = 480;

/// ID-card capture profile
pub const ID_CARD_PADDING: f32 = 0.8;
pub const ID_CARD_WIDTH: u32 = 135;
pub const ID_CARD_HEIGHT: u32 = 189;

/// Portrait capture profile
pub const PORTRAIT_PADDING: f32 = 0.3;
pub const PORTRAIT_WIDTH: u32 = 300;
pub const PORTRAIT_HEIGHT: u32 = 400;

/// Encoding quality on a 0-1 scale
pub const DEFAULT_JPEG_QUALITY: f32 = 0.9;

/// Image normalization constants for face detection
pub const IMAGE_NORMALIZATION_OFFSET: f32 = 127.5;
pub const IMAGE_NORMALIZATION_SCALE: f32 = 128.0;

/// Default detector thresholds
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.4;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;
