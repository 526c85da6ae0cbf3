//! Image conversion utilities for OpenCV Mat, `image` buffers and ndarray tensors.

#[cfg(feature = "onnx")]
use ndarray::Array4;
use image::RgbImage;
#[cfg(feature = "opencv")]
use opencv::core::{Mat, MatTraitConst, Vec3b, CV_8UC3};

#[cfg(feature = "opencv")]
use crate::utils::safe_cast::i32_to_u32;
#[cfg(any(feature = "opencv", feature = "onnx"))]
use crate::{Error, Result};

/// Convert an 8-bit BGR OpenCV Mat to an RGB image buffer
///
/// # Errors
/// * Returns error if the Mat is empty or not `CV_8UC3`
/// * Returns error if Mat data cannot be accessed
#[cfg(feature = "opencv")]
pub fn bgr_mat_to_rgb_image(mat: &Mat) -> Result<RgbImage> {
    let rows = mat.rows();
    let cols = mat.cols();

    if rows <= 0 || cols <= 0 {
        return Err(Error::InvalidInput(format!("Invalid Mat dimensions: {rows}x{cols}")));
    }
    if mat.typ() != CV_8UC3 {
        return Err(Error::InvalidInput(format!(
            "Expected an 8-bit 3-channel Mat, got type {}",
            mat.typ()
        )));
    }

    let mut image = RgbImage::new(i32_to_u32(cols)?, i32_to_u32(rows)?);
    for row in 0..rows {
        for col in 0..cols {
            let pixel = mat.at_2d::<Vec3b>(row, col)?;
            image.put_pixel(
                i32_to_u32(col)?,
                i32_to_u32(row)?,
                image::Rgb([pixel[2], pixel[1], pixel[0]]),
            );
        }
    }

    Ok(image)
}

/// Pack an RGB image into a normalized NCHW tensor: `(value - offset) / scale`
///
/// # Errors
/// * Returns error if the tensor shape cannot be built
#[cfg(feature = "onnx")]
pub fn rgb_to_nchw_f32(image: &RgbImage, offset: f32, scale: f32) -> Result<Array4<f32>> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let plane = width * height;
    let mut data = vec![0.0f32; 3 * plane];

    for (x, y, pixel) in image.enumerate_pixels() {
        let idx = y as usize * width + x as usize;
        for ch in 0..3 {
            data[ch * plane + idx] = (f32::from(pixel[ch]) - offset) / scale;
        }
    }

    Array4::from_shape_vec((1, 3, height, width), data)
        .map_err(|e| Error::InvalidInput(format!("Failed to create NCHW array: {e}")))
}

/// Pack an RGB image into an NHWC tensor scaled by `1 / scale`
///
/// # Errors
/// * Returns error if the tensor shape cannot be built
#[cfg(feature = "onnx")]
pub fn rgb_to_nhwc_f32(image: &RgbImage, scale: f32) -> Result<Array4<f32>> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    let data: Vec<f32> = image.as_raw().iter().map(|&v| f32::from(v) / scale).collect();

    Array4::from_shape_vec((1, height, width, 3), data)
        .map_err(|e| Error::InvalidInput(format!("Failed to create NHWC array: {e}")))
}

/// Letterbox `image` into the top-left of a `width × height` black canvas
///
/// Returns the canvas and the scale applied to the source.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn letterbox_top_left(image: &RgbImage, width: u32, height: u32) -> (RgbImage, f32) {
    let (src_w, src_h) = (image.width().max(1) as f32, image.height().max(1) as f32);
    let scale = (width as f32 / src_w).min(height as f32 / src_h);
    let new_w = ((src_w * scale) as u32).clamp(1, width);
    let new_h = ((src_h * scale) as u32).clamp(1, height);

    let resized = image::imageops::resize(image, new_w, new_h, image::imageops::FilterType::Triangle);
    let mut canvas = RgbImage::new(width, height);
    image::imageops::replace(&mut canvas, &resized, 0, 0);

    (canvas, new_h as f32 / src_h)
}
