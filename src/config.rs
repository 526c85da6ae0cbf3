//! Configuration management for capture sessions

use crate::{constants, filters, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Capture session configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera acquisition configuration
    pub camera: CameraConfig,

    /// Face detection configuration
    pub detection: DetectionConfig,

    /// Liveness challenge configuration
    pub liveness: LivenessConfig,

    /// Output photo profile
    pub profile: CaptureProfile,
}

/// Which way the camera should face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera, facing the user
    User,
    /// Rear camera
    Environment,
}

/// Camera acquisition parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Preferred facing mode
    pub facing_mode: FacingMode,

    /// Preferred frame width
    pub ideal_width: u32,

    /// Preferred frame height
    pub ideal_height: u32,

    /// Device index for backends that enumerate cameras
    pub device_index: i32,

    /// Wait between release and re-acquire on restart, in milliseconds
    pub settle_delay_ms: u64,

    /// Target time between detection cycles, in milliseconds
    pub frame_interval_ms: u64,
}

/// Face detector model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Path to the face detection ONNX model
    pub face_detector: PathBuf,

    /// Path to the 68-point landmark ONNX model
    pub face_landmarks: PathBuf,

    /// Confidence threshold for face detection (0.0-1.0)
    pub confidence_threshold: f32,

    /// IOU threshold for non-maximum suppression (0.0-1.0)
    pub nms_threshold: f32,
}

/// Liveness challenge tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    /// Consecutive centered frames before asking for the left turn
    pub center_frames: u32,

    /// Consecutive turned frames for each of the left and right turns
    pub turn_frames: u32,

    /// Consecutive centered frames before the photo is taken
    pub final_center_frames: u32,

    /// How long a face may be missing before "no face" is shown, in milliseconds
    pub no_face_grace_ms: u64,

    /// Lower bound of the centered yaw band (inclusive)
    pub center_min: f64,

    /// Upper bound of the centered yaw band (inclusive)
    pub center_max: f64,

    /// Yaw smoothing filter (`none`, `moving_average:N`, `median:N`, `exponential:A`)
    pub yaw_filter: String,
}

/// Output photo framing and encoding for one capture use case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureProfile {
    /// Fraction of the face box added around it before cropping
    pub padding: f32,

    /// Output width in pixels
    pub target_width: u32,

    /// Output height in pixels
    pub target_height: u32,

    /// JPEG quality on a 0-1 scale
    pub quality: f32,

    /// Whether the head-turn challenge gates the capture
    pub require_liveness: bool,
}

/// Named capture profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilePreset {
    /// 135x189 ID-card photo with wide padding and liveness
    IdCard,
    /// 300x400 portrait with compact padding, manual capture
    Portrait,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            facing_mode: FacingMode::User,
            ideal_width: constants::DEFAULT_IDEAL_WIDTH,
            ideal_height: constants::DEFAULT_IDEAL_HEIGHT,
            device_index: 0,
            settle_delay_ms: duration_ms(constants::DEFAULT_SETTLE_DELAY),
            frame_interval_ms: duration_ms(constants::DEFAULT_FRAME_INTERVAL),
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            face_detector: PathBuf::from("assets/face_detector.onnx"),
            face_landmarks: PathBuf::from("assets/face_landmarks.onnx"),
            confidence_threshold: constants::DEFAULT_CONFIDENCE_THRESHOLD,
            nms_threshold: constants::DEFAULT_NMS_THRESHOLD,
        }
    }
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            center_frames: constants::DEFAULT_CENTER_FRAMES,
            turn_frames: constants::DEFAULT_TURN_FRAMES,
            final_center_frames: constants::DEFAULT_FINAL_CENTER_FRAMES,
            no_face_grace_ms: duration_ms(constants::DEFAULT_NO_FACE_GRACE),
            center_min: constants::DEFAULT_CENTER_MIN,
            center_max: constants::DEFAULT_CENTER_MAX,
            yaw_filter: "none".to_string(),
        }
    }
}

impl Default for CaptureProfile {
    fn default() -> Self {
        Self::id_card()
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl CameraConfig {
    /// Restart settle delay
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Detection cycle interval
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl LivenessConfig {
    /// Grace window for missing faces
    #[must_use]
    pub fn no_face_grace(&self) -> Duration {
        Duration::from_millis(self.no_face_grace_ms)
    }

    /// Validate counts, band and filter
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` describing the first invalid field
    pub fn validate(&self) -> Result<()> {
        if self.center_frames == 0 || self.turn_frames == 0 || self.final_center_frames == 0 {
            return Err(Error::ConfigError(
                "Liveness frame counts must be at least 1".to_string(),
            ));
        }
        if self.no_face_grace_ms == 0 {
            return Err(Error::ConfigError(
                "No-face grace window must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.center_min)
            || !(0.0..=1.0).contains(&self.center_max)
            || self.center_min > self.center_max
        {
            return Err(Error::ConfigError(format!(
                "Center band must satisfy 0 <= min <= max <= 1, got [{}, {}]",
                self.center_min, self.center_max
            )));
        }
        filters::create_filter(&self.yaw_filter)
            .map_err(|e| Error::ConfigError(format!("Invalid yaw filter: {e}")))?;
        Ok(())
    }
}

impl CaptureProfile {
    /// 135x189 ID-card photo, padding 0.8, liveness required
    #[must_use]
    pub fn id_card() -> Self {
        Self {
            padding: constants::ID_CARD_PADDING,
            target_width: constants::ID_CARD_WIDTH,
            target_height: constants::ID_CARD_HEIGHT,
            quality: constants::DEFAULT_JPEG_QUALITY,
            require_liveness: true,
        }
    }

    /// 300x400 portrait, padding 0.3, manual capture
    #[must_use]
    pub fn portrait() -> Self {
        Self {
            padding: constants::PORTRAIT_PADDING,
            target_width: constants::PORTRAIT_WIDTH,
            target_height: constants::PORTRAIT_HEIGHT,
            quality: constants::DEFAULT_JPEG_QUALITY,
            require_liveness: false,
        }
    }

    /// Output width / height
    #[must_use]
    pub fn target_aspect(&self) -> f64 {
        f64::from(self.target_width) / f64::from(self.target_height)
    }

    /// Validate padding, dimensions and quality
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` describing the first invalid field
    pub fn validate(&self) -> Result<()> {
        if !self.padding.is_finite() || self.padding < 0.0 {
            return Err(Error::ConfigError(format!(
                "Padding must be a finite value >= 0, got {}",
                self.padding
            )));
        }
        if self.target_width == 0 || self.target_height == 0 {
            return Err(Error::ConfigError(
                "Target dimensions must be greater than 0".to_string(),
            ));
        }
        if !(self.quality > 0.0 && self.quality <= 1.0) {
            return Err(Error::ConfigError(format!(
                "Quality must be in (0.0, 1.0], got {}",
                self.quality
            )));
        }
        Ok(())
    }
}

impl ProfilePreset {
    /// Profile values for this preset
    #[must_use]
    pub fn profile(self) -> CaptureProfile {
        match self {
            Self::IdCard => CaptureProfile::id_card(),
            Self::Portrait => CaptureProfile::portrait(),
        }
    }
}

impl FromStr for ProfilePreset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "id-card" | "idcard" | "carnet" => Ok(Self::IdCard),
            "portrait" => Ok(Self::Portrait),
            other => Err(Error::ConfigError(format!("Unknown capture profile: {other}"))),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Configuration with the given profile and default tunables
    #[must_use]
    pub fn with_profile(profile: CaptureProfile) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` describing the first invalid field
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.detection.confidence_threshold) {
            return Err(Error::ConfigError(
                "Confidence threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.detection.nms_threshold) {
            return Err(Error::ConfigError(
                "NMS threshold must be between 0.0 and 1.0".to_string(),
            ));
        }

        if self.camera.frame_interval_ms == 0 {
            return Err(Error::ConfigError(
                "Frame interval must be greater than 0".to_string(),
            ));
        }
        if self.camera.ideal_width == 0 || self.camera.ideal_height == 0 {
            return Err(Error::ConfigError(
                "Ideal camera resolution must be greater than 0".to_string(),
            ));
        }

        self.liveness.validate()?;
        self.profile.validate()?;

        Ok(())
    }

    /// Check that the detector model files exist
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` naming the missing file
    pub fn validate_models(&self) -> Result<()> {
        if !self.detection.face_detector.exists() {
            return Err(Error::ConfigError(format!(
                "Face detector model not found: {}",
                self.detection.face_detector.display()
            )));
        }
        if !self.detection.face_landmarks.exists() {
            return Err(Error::ConfigError(format!(
                "Face landmarks model not found: {}",
                self.detection.face_landmarks.display()
            )));
        }
        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Liveness Capture Configuration

# Camera acquisition
camera:
  facing_mode: "user"
  ideal_width: 640
  ideal_height: 480
  device_index: 0
  settle_delay_ms: 500
  frame_interval_ms: 33

# Face detection models
detection:
  face_detector: "assets/face_detector.onnx"
  face_landmarks: "assets/face_landmarks.onnx"
  confidence_threshold: 0.5
  nms_threshold: 0.4

# Head-turn challenge
liveness:
  center_frames: 10
  turn_frames: 5
  final_center_frames: 10
  no_face_grace_ms: 2000
  center_min: 0.4
  center_max: 0.6
  yaw_filter: "none"

# Output photo (ID card: 0.8 / 135x189, portrait: 0.3 / 300x400)
profile:
  padding: 0.8
  target_width: 135
  target_height: 189
  quality: 0.9
  require_liveness: true
"#;
