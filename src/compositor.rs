//! Photo composition: pad the face box, cover-fit to the profile size, encode.

use crate::config::CaptureProfile;
use crate::face_detection::FaceBox;
use crate::frame::VideoFrame;
use crate::utils::safe_cast::{f32_to_u32_clamp, round_to_u32_clamp};
use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, ImageFormat, RgbImage};
use std::path::Path;

/// Pixel rectangle inside an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Grow `face` by `padding` on each axis and clip it to the frame
///
/// The box grows symmetrically by `padding × size`. The top-left corner is
/// clamped at 0 and the far edges at the frame size, so the result always
/// lies inside the frame.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if the box is degenerate or lies outside the frame
pub fn expand_face_box(face: &FaceBox, padding: f32, frame_width: u32, frame_height: u32) -> Result<CropRect> {
    if !face.is_valid() {
        return Err(Error::InvalidInput(format!("Degenerate face box: {face:?}")));
    }
    if frame_width == 0 || frame_height == 0 {
        return Err(Error::InvalidInput("Empty frame".to_string()));
    }

    let scale = 1.0 + f64::from(padding.max(0.0));
    let width = f64::from(face.width) * scale;
    let height = f64::from(face.height) * scale;
    let left = f64::from(face.x) - (width - f64::from(face.width)) / 2.0;
    let top = f64::from(face.y) - (height - f64::from(face.height)) / 2.0;

    let x = round_to_u32_clamp(left, 0, frame_width);
    let y = round_to_u32_clamp(top, 0, frame_height);
    let right = round_to_u32_clamp(f64::from(x) + width, x, frame_width);
    let bottom = round_to_u32_clamp(f64::from(y) + height, y, frame_height);

    if right <= x || bottom <= y {
        return Err(Error::InvalidInput(format!(
            "Face box {face:?} lies outside the {frame_width}x{frame_height} frame"
        )));
    }

    Ok(CropRect {
        x,
        y,
        width: right - x,
        height: bottom - y,
    })
}

/// Centered slice of a `width × height` crop that matches `target_aspect`
///
/// A crop wider than the target keeps its full height and a horizontally
/// centered slice of `height × target_aspect`. A taller crop keeps its full
/// width and a vertically centered slice of `width / target_aspect`.
#[must_use]
pub fn cover_region(width: u32, height: u32, target_aspect: f64) -> CropRect {
    let (w, h) = (f64::from(width), f64::from(height));
    if width == 0 || height == 0 || !target_aspect.is_finite() || target_aspect <= 0.0 {
        return CropRect { x: 0, y: 0, width, height };
    }

    if w / h > target_aspect {
        let source_width = h * target_aspect;
        let slice = round_to_u32_clamp(source_width, 1, width);
        CropRect {
            x: round_to_u32_clamp((w - source_width) / 2.0, 0, width - slice),
            y: 0,
            width: slice,
            height,
        }
    } else {
        let source_height = w / target_aspect;
        let slice = round_to_u32_clamp(source_height, 1, height);
        CropRect {
            x: 0,
            y: round_to_u32_clamp((h - source_height) / 2.0, 0, height - slice),
            width,
            height: slice,
        }
    }
}

/// An encoded still photo
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedPhoto {
    /// JPEG bytes
    pub data: Vec<u8>,
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
    /// Encoding quality on a 0-1 scale
    pub quality: f32,
}

impl CapturedPhoto {
    /// Base64 of the JPEG bytes
    #[must_use]
    pub fn base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    /// `data:image/jpeg;base64,...` URI, the form accepted by the person registration `photo` field
    #[must_use]
    pub fn to_data_uri(&self) -> String {
        format!("data:image/jpeg;base64,{}", self.base64())
    }

    /// Decode back to pixels
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a valid JPEG
    pub fn decode(&self) -> Result<RgbImage> {
        Ok(image::load_from_memory_with_format(&self.data, ImageFormat::Jpeg)?.to_rgb8())
    }

    /// Write the JPEG bytes to `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }
}

/// Turns a frame and face box into the profile's photo
#[derive(Debug, Clone)]
pub struct PhotoCompositor {
    profile: CaptureProfile,
}

impl PhotoCompositor {
    /// Create a compositor for `profile`
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the profile is invalid
    pub fn new(profile: CaptureProfile) -> Result<Self> {
        profile.validate()?;
        Ok(Self { profile })
    }

    /// Active profile
    #[must_use]
    pub fn profile(&self) -> &CaptureProfile {
        &self.profile
    }

    /// Source region of `frame` that ends up in the photo
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the box does not overlap the frame
    pub fn source_region(&self, face: &FaceBox, frame_width: u32, frame_height: u32) -> Result<CropRect> {
        let padded = expand_face_box(face, self.profile.padding, frame_width, frame_height)?;
        let cover = cover_region(padded.width, padded.height, self.profile.target_aspect());
        Ok(CropRect {
            x: padded.x + cover.x,
            y: padded.y + cover.y,
            width: cover.width,
            height: cover.height,
        })
    }

    /// Crop, re-frame and encode the face in `frame`
    ///
    /// # Errors
    ///
    /// Returns `Error::NoFaceDetected` when `face` is `None`,
    /// `Error::InvalidInput` for an empty frame or unusable box, and
    /// `Error::Image` if encoding fails
    pub fn compose(&self, frame: &VideoFrame, face: Option<&FaceBox>) -> Result<CapturedPhoto> {
        let face = face.ok_or(Error::NoFaceDetected)?;
        if frame.is_empty() {
            return Err(Error::InvalidInput("Empty frame".to_string()));
        }

        let region = self.source_region(face, frame.width(), frame.height())?;
        let cropped = imageops::crop_imm(frame.image(), region.x, region.y, region.width, region.height).to_image();
        let resized = imageops::resize(
            &cropped,
            self.profile.target_width,
            self.profile.target_height,
            FilterType::Triangle,
        );

        let data = encode_jpeg(&resized, self.profile.quality)?;
        log::info!(
            "Composed {}x{} photo from {}x{} region ({} bytes)",
            resized.width(),
            resized.height(),
            region.width,
            region.height,
            data.len()
        );

        Ok(CapturedPhoto {
            data,
            width: resized.width(),
            height: resized.height(),
            quality: self.profile.quality,
        })
    }
}

/// Encode RGB pixels as JPEG at `quality` (0-1)
///
/// # Errors
///
/// Returns `Error::Image` if encoding fails
pub fn encode_jpeg(image: &RgbImage, quality: f32) -> Result<Vec<u8>> {
    let quality_percent = u8::try_from(f32_to_u32_clamp((quality * 100.0).round(), 1, 100)).unwrap_or(100);

    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality_percent);
    encoder.write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgb8)?;

    Ok(buffer)
}
