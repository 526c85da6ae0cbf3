//! Safe casting utilities for pixel coordinates

use crate::{Error, Result};

/// Convert a non-negative i32 dimension to u32
///
/// # Errors
///
/// Returns an error if the value is negative
pub fn i32_to_u32(value: i32) -> Result<u32> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Value {value} cannot be a pixel dimension")))
}

/// Clamp and convert f64 to u32 for pixel coordinates
///
/// Non-finite values map to `min`.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Clamping ensures safe truncation
#[allow(clippy::cast_sign_loss)] // Clamped to a non-negative range
pub fn f64_to_u32_clamp(value: f64, min: u32, max: u32) -> u32 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };

    if !value.is_finite() {
        return min;
    }

    let clamped = value.clamp(f64::from(min), f64::from(max));
    (clamped as u32).clamp(min, max)
}

/// Clamp and convert f32 to u32 for pixel coordinates
#[must_use]
pub fn f32_to_u32_clamp(value: f32, min: u32, max: u32) -> u32 {
    f64_to_u32_clamp(f64::from(value), min, max)
}

/// Round to the nearest pixel, clamped
#[must_use]
pub fn round_to_u32_clamp(value: f64, min: u32, max: u32) -> u32 {
    f64_to_u32_clamp(value.round(), min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_i32_to_u32() {
        assert_eq!(i32_to_u32(480).unwrap(), 480);
        assert!(i32_to_u32(-1).is_err());
    }

    #[test]
    fn test_f64_to_u32_clamp() {
        assert_eq!(f64_to_u32_clamp(50.7, 0, 100), 50);
        assert_eq!(f64_to_u32_clamp(-10.0, 0, 100), 0);
        assert_eq!(f64_to_u32_clamp(150.0, 0, 100), 100);
        assert_eq!(f64_to_u32_clamp(f64::NAN, 0, 100), 0);
        assert_eq!(f64_to_u32_clamp(f64::INFINITY, 3, 100), 3);
        assert_eq!(f64_to_u32_clamp(50.0, 100, 0), 50);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round_to_u32_clamp(71.43, 0, 200), 71);
        assert_eq!(round_to_u32_clamp(64.5, 0, 200), 65);
        assert_eq!(f32_to_u32_clamp(0.9, 0, 10), 0);
    }

    proptest! {
        #[test]
        fn prop_f64_to_u32_clamp_always_within_bounds(
            value in any::<f64>(),
            min in any::<u32>(),
            max in any::<u32>()
        ) {
            let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
            let result = f64_to_u32_clamp(value, min, max);
            prop_assert!(result >= lo);
            prop_assert!(result <= hi);
        }

        #[test]
        fn prop_whole_values_preserved(value in 0u32..1_000_000) {
            prop_assert_eq!(f64_to_u32_clamp(f64::from(value), 0, u32::MAX), value);
            prop_assert_eq!(round_to_u32_clamp(f64::from(value) + 0.4, 0, u32::MAX), value);
        }
    }
}
