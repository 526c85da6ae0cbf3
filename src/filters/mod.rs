//! Smoothing filters for the per-frame yaw ratio.
//!
//! Landmark models jitter by a few pixels between frames, which moves the
//! yaw ratio around the band edges. A filter can be placed in front of the
//! liveness machine to steady it. The default is no filtering.

/// Moving average filter for simple smoothing
pub mod moving_average;

/// Median filter for outlier rejection
pub mod median;

/// Exponential filter for responsive smoothing
pub mod exponential;

use crate::{Error, Result};

/// Trait for all yaw ratio filters
pub trait YawFilter: Send {
    /// Feed one measurement and return the smoothed value
    fn apply(&mut self, value: f64) -> f64;

    /// Reset filter state
    fn reset(&mut self);

    /// Get filter name
    fn name(&self) -> &str;
}

/// No-op filter that passes through values unchanged
pub struct NoFilter;

impl YawFilter for NoFilter {
    fn apply(&mut self, value: f64) -> f64 {
        value
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "NoFilter"
    }
}

/// Create a yaw filter from a `name[:param]` spec
///
/// Accepted names are `none`, `moving_average[:window]`, `median[:window]`
/// and `exponential[:alpha]`.
///
/// # Errors
///
/// Returns `Error::ConfigError` for unknown names or out-of-range parameters
pub fn create_filter(spec: &str) -> Result<Box<dyn YawFilter>> {
    let spec = spec.trim().to_lowercase();
    let (name, param) = match spec.split_once(':') {
        Some((name, param)) => (name, Some(param)),
        None => (spec.as_str(), None),
    };

    let window = |default: usize| -> Result<usize> {
        match param {
            None => Ok(default),
            Some(p) => match p.parse::<usize>() {
                Ok(w) if w > 0 => Ok(w),
                _ => Err(Error::ConfigError(format!("Window must be a positive integer, got {p}"))),
            },
        }
    };

    match name {
        "none" | "nofilter" => Ok(Box::new(NoFilter)),
        "moving_average" | "movingaverage" => Ok(Box::new(moving_average::MovingAverageFilter::new(window(5)?))),
        "median" => Ok(Box::new(median::MedianFilter::new(window(5)?))),
        "exponential" => {
            let alpha = match param {
                None => 0.5,
                Some(p) => p
                    .parse::<f64>()
                    .map_err(|_| Error::ConfigError(format!("Alpha must be a number, got {p}")))?,
            };
            Ok(Box::new(exponential::ExponentialFilter::new(alpha)?))
        }
        _ => Err(Error::ConfigError(format!("Unknown filter type: {spec}"))),
    }
}
