//! Head yaw estimation from 2-D facial landmarks.
//!
//! The yaw ratio compares the horizontal distance from the nose tip to each
//! side of the jaw line:
//!
//! ```text
//! ratio = |nose.x - jaw_left.x| / (|nose.x - jaw_left.x| + |nose.x - jaw_right.x|)
//! ```
//!
//! A frontal face sits near 0.5. The ratio rises above the centered band when
//! the user turns to their left (as seen in a mirrored preview) and falls below
//! it when they turn right.

use crate::constants::{
    DEFAULT_CENTER_MAX, DEFAULT_CENTER_MIN, EPSILON, JAW_LEFT_INDEX, JAW_RIGHT_INDEX, NOSE_TIP_INDEX,
    NUM_FACIAL_LANDMARKS,
};
use crate::face_detection::Point;
use crate::{Error, Result};

/// Normalized horizontal nose position between the jaw extremes
///
/// Returns `None` when fewer than 68 landmarks are given or when both
/// distances are zero.
#[must_use]
pub fn yaw_ratio(landmarks: &[Point]) -> Option<f64> {
    if landmarks.len() < NUM_FACIAL_LANDMARKS {
        return None;
    }

    let nose = f64::from(landmarks[NOSE_TIP_INDEX].x);
    let jaw_left = f64::from(landmarks[JAW_LEFT_INDEX].x);
    let jaw_right = f64::from(landmarks[JAW_RIGHT_INDEX].x);

    let dist_left = (nose - jaw_left).abs();
    let dist_right = (nose - jaw_right).abs();
    let total = dist_left + dist_right;

    if !total.is_finite() || total < EPSILON {
        return None;
    }

    Some(dist_left / total)
}

/// Classification of a yaw ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum YawBand {
    /// Facing the camera
    Center,
    /// Turned to the user's left
    Left,
    /// Turned to the user's right
    Right,
}

impl YawBand {
    /// Classify `ratio` against `thresholds`
    #[must_use]
    pub fn classify(ratio: f64, thresholds: &YawThresholds) -> Self {
        thresholds.classify(ratio)
    }
}

/// Bounds of the centered band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YawThresholds {
    /// Lowest ratio still considered centered
    pub center_min: f64,
    /// Highest ratio still considered centered
    pub center_max: f64,
}

impl Default for YawThresholds {
    fn default() -> Self {
        Self {
            center_min: DEFAULT_CENTER_MIN,
            center_max: DEFAULT_CENTER_MAX,
        }
    }
}

impl YawThresholds {
    /// Create thresholds for the closed band `[center_min, center_max]`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` unless `0 <= center_min <= center_max <= 1`
    pub fn new(center_min: f64, center_max: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&center_min) || !(0.0..=1.0).contains(&center_max) || center_min > center_max {
            return Err(Error::InvalidInput(format!(
                "Invalid center band [{center_min}, {center_max}]"
            )));
        }
        Ok(Self { center_min, center_max })
    }

    /// Classify a ratio
    ///
    /// Both band edges count as centered.
    #[must_use]
    pub fn classify(&self, ratio: f64) -> YawBand {
        if ratio > self.center_max {
            YawBand::Left
        } else if ratio < self.center_min {
            YawBand::Right
        } else {
            YawBand::Center
        }
    }
}
