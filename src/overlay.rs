//! Live overlay drawing: face boxes and landmarks on top of a frame.

use crate::face_detection::FaceDetection;
use crate::frame::VideoFrame;
use crate::utils::safe_cast::f32_to_u32_clamp;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

/// Box color
pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Landmark color
pub const MARK_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Draw every detection's box and landmarks in place
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn draw_detections(image: &mut RgbImage, detections: &[FaceDetection]) {
    let (width, height) = image.dimensions();

    for detection in detections {
        let b = detection.bbox;
        if !b.is_valid() {
            continue;
        }
        let x = f32_to_u32_clamp(b.x, 0, width.saturating_sub(1));
        let y = f32_to_u32_clamp(b.y, 0, height.saturating_sub(1));
        let right = f32_to_u32_clamp(b.right(), x + 1, width);
        let bottom = f32_to_u32_clamp(b.bottom(), y + 1, height);

        let rect = Rect::at(x as i32, y as i32).of_size(right - x, bottom - y);
        draw_hollow_rect_mut(image, rect, BOX_COLOR);

        for mark in &detection.landmarks {
            if mark.x.is_finite() && mark.y.is_finite() {
                draw_filled_circle_mut(image, (mark.x.round() as i32, mark.y.round() as i32), 1, MARK_COLOR);
            }
        }
    }
}

/// Copy of the frame with detections drawn on it
#[must_use]
pub fn annotate(frame: &VideoFrame, detections: &[FaceDetection]) -> RgbImage {
    let mut image = frame.image().clone();
    draw_detections(&mut image, detections);
    image
}
