use super::{CameraConstraints, CameraDevice, FrameSize};
use crate::config::FacingMode;
use crate::error::{CameraError, CameraErrorKind};
use crate::frame::VideoFrame;
use crate::utils::image_conversion::bgr_mat_to_rgb_image;
use crate::utils::safe_cast::f64_to_u32_clamp;
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH};

/// Webcam through OpenCV `videoio`
#[derive(Default)]
pub struct OpencvCamera {
    capture: Option<VideoCapture>,
}

impl OpencvCamera {
    /// Create a closed camera
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn classify(err: &opencv::Error) -> CameraError {
    let message = err.message.to_lowercase();
    let kind = if message.contains("permission") || message.contains("not authorized") {
        CameraErrorKind::PermissionDenied
    } else if message.contains("busy") || message.contains("in use") {
        CameraErrorKind::DeviceBusy
    } else if message.contains("no such device") || message.contains("can't open") {
        CameraErrorKind::NotFound
    } else {
        CameraErrorKind::Unknown
    };
    CameraError::with_detail(kind, &err.message)
}

impl CameraDevice for OpencvCamera {
    fn open(&mut self, constraints: &CameraConstraints) -> Result<FrameSize, CameraError> {
        self.release();

        if constraints.facing_mode == FacingMode::Environment {
            log::debug!("Facing mode is not selectable through videoio, using device {}", constraints.device_index);
        }

        let mut cap = VideoCapture::new(constraints.device_index, videoio::CAP_ANY).map_err(|e| classify(&e))?;
        if !cap.is_opened().map_err(|e| classify(&e))? {
            return Err(CameraError::new(CameraErrorKind::NotFound));
        }

        if let Some(size) = constraints.ideal_size {
            cap.set(CAP_PROP_FRAME_WIDTH, f64::from(size.width)).map_err(|e| classify(&e))?;
            cap.set(CAP_PROP_FRAME_HEIGHT, f64::from(size.height)).map_err(|e| classify(&e))?;
        }

        // Reduce buffer size for lower latency
        cap.set(CAP_PROP_BUFFERSIZE, 1.0).map_err(|e| classify(&e))?;

        // A device that opens but cannot deliver a frame is held elsewhere
        let mut probe = Mat::default();
        if !cap.read(&mut probe).map_err(|e| classify(&e))? || probe.empty() {
            let _ = cap.release();
            return Err(CameraError::new(CameraErrorKind::DeviceBusy));
        }

        let size = FrameSize::new(
            f64_to_u32_clamp(f64::from(probe.cols()), 0, u32::MAX),
            f64_to_u32_clamp(f64::from(probe.rows()), 0, u32::MAX),
        );
        self.capture = Some(cap);
        Ok(size)
    }

    fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        let cap = self
            .capture
            .as_mut()
            .ok_or_else(|| CameraError::new(CameraErrorKind::NotStarted))?;

        let mut mat = Mat::default();
        if !cap.read(&mut mat).map_err(|e| classify(&e))? || mat.empty() {
            return Ok(None);
        }

        let image = bgr_mat_to_rgb_image(&mat).map_err(|e| CameraError::with_detail(CameraErrorKind::Unknown, e))?;
        Ok(Some(VideoFrame::new(image)))
    }

    fn release(&mut self) {
        if let Some(mut cap) = self.capture.take() {
            if let Err(e) = cap.release() {
                log::warn!("Failed to release camera: {e}");
            }
        }
    }
}

impl Drop for OpencvCamera {
    fn drop(&mut self) {
        self.release();
    }
}
