//! Video frames handed from the camera to the detection pipeline.

use image::RgbImage;
use std::time::Instant;

/// One camera image. Produced continuously while a session is active and never persisted.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    image: RgbImage,
    captured_at: Instant,
}

impl VideoFrame {
    /// Wrap an RGB image captured now
    #[must_use]
    pub fn new(image: RgbImage) -> Self {
        Self::captured_at(image, Instant::now())
    }

    /// Wrap an RGB image with an explicit capture time
    #[must_use]
    pub fn captured_at(image: RgbImage, captured_at: Instant) -> Self {
        Self { image, captured_at }
    }

    /// Pixel width
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Pixel height
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the pixels
    #[must_use]
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Take ownership of the pixels
    #[must_use]
    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// When the frame was read from the device
    #[must_use]
    pub fn timestamp(&self) -> Instant {
        self.captured_at
    }

    /// Whether the frame carries any pixels
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }
}

impl From<RgbImage> for VideoFrame {
    fn from(image: RgbImage) -> Self {
        Self::new(image)
    }
}
