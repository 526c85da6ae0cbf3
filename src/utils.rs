//! Utility functions for image processing and coordinate transformations.

pub mod image_conversion;
pub mod safe_cast;

use crate::compositor::CropRect;
use crate::face_detection::FaceBox;
use safe_cast::f32_to_u32_clamp;

/// Square region around a face box for the landmark model
///
/// The box grows by `shift × size` on every side, is clipped to the frame,
/// made square on its longer side and shifted back inside the frame.
/// Returns `None` when nothing of the box lies inside the frame.
#[must_use]
#[allow(clippy::cast_precision_loss)] // Precision loss acceptable for box dimensions
pub fn square_face_region(bbox: &FaceBox, max_width: u32, max_height: u32, shift: f32) -> Option<CropRect> {
    if !bbox.is_valid() || max_width == 0 || max_height == 0 {
        return None;
    }

    let x_shift = bbox.width * shift;
    let y_shift = bbox.height * shift;

    // Expand the bounding box
    let x = f32_to_u32_clamp(bbox.x - x_shift, 0, max_width);
    let y = f32_to_u32_clamp(bbox.y - y_shift, 0, max_height);
    let right = f32_to_u32_clamp(bbox.right() + x_shift, x, max_width);
    let bottom = f32_to_u32_clamp(bbox.bottom() + y_shift, y, max_height);
    if right <= x || bottom <= y {
        return None;
    }

    // Make it square, never larger than the frame
    let side = (right - x).max(bottom - y).min(max_width).min(max_height);

    // Ensure it doesn't exceed image boundaries
    let x = x.min(max_width - side);
    let y = y.min(max_height - side);

    Some(CropRect {
        x,
        y,
        width: side,
        height: side,
    })
}
