//! Camera session management.
//!
//! A [`CameraSession`] owns one capture device and guarantees that it is
//! released before it is opened again and when the session is dropped.

/// OpenCV `videoio` camera backend
#[cfg(feature = "opencv")]
pub mod opencv;

use crate::config::{CameraConfig, FacingMode};
use crate::error::{CameraError, CameraErrorKind};
use crate::frame::VideoFrame;
use std::fmt;
use std::thread;
use std::time::Duration;

/// Frame dimensions reported by an open device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
}

impl FrameSize {
    /// Create a frame size
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// What to ask the device for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraConstraints {
    /// Preferred facing mode
    pub facing_mode: FacingMode,
    /// Preferred resolution, `None` to accept the device default
    pub ideal_size: Option<FrameSize>,
    /// Device index for backends that enumerate cameras
    pub device_index: i32,
}

impl CameraConstraints {
    /// Preferred constraints from configuration
    #[must_use]
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            facing_mode: config.facing_mode,
            ideal_size: Some(FrameSize::new(config.ideal_width, config.ideal_height)),
            device_index: config.device_index,
        }
    }

    /// The same device with no resolution hint
    #[must_use]
    pub fn basic(&self) -> Self {
        Self {
            ideal_size: None,
            ..*self
        }
    }
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

/// A video capture device
///
/// `release` must be safe to call at any time, including when nothing is open.
pub trait CameraDevice: Send {
    /// Acquire the device
    ///
    /// # Errors
    ///
    /// Returns a `CameraError` describing why the device could not be opened
    fn open(&mut self, constraints: &CameraConstraints) -> Result<FrameSize, CameraError>;

    /// Read the next frame; `Ok(None)` when no frame is available yet
    ///
    /// # Errors
    ///
    /// Returns a `CameraError` if the stream failed
    fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;

    /// Release the device
    fn release(&mut self);
}

impl<D: CameraDevice + ?Sized> CameraDevice for Box<D> {
    fn open(&mut self, constraints: &CameraConstraints) -> Result<FrameSize, CameraError> {
        (**self).open(constraints)
    }

    fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        (**self).read_frame()
    }

    fn release(&mut self) {
        (**self).release();
    }
}

/// Session status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraState {
    /// Nothing is held
    Stopped,
    /// Streaming at the given size
    Ready(FrameSize),
    /// The last start or read failed; call `restart` to recover
    Failed(CameraError),
}

/// Owns one camera device and its lifecycle
pub struct CameraSession<D: CameraDevice> {
    device: D,
    constraints: CameraConstraints,
    settle_delay: Duration,
    state: CameraState,
}

impl<D: CameraDevice> CameraSession<D> {
    /// Create a stopped session
    pub fn new(device: D, config: &CameraConfig) -> Self {
        Self {
            device,
            constraints: CameraConstraints::from_config(config),
            settle_delay: config.settle_delay(),
            state: CameraState::Stopped,
        }
    }

    /// Replace the preferred constraints used by the next `start`
    #[must_use]
    pub fn with_constraints(mut self, constraints: CameraConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Current status
    pub fn state(&self) -> &CameraState {
        &self.state
    }

    /// Whether frames can be read
    pub fn is_ready(&self) -> bool {
        matches!(self.state, CameraState::Ready(_))
    }

    /// Size of the open stream
    pub fn frame_size(&self) -> Option<FrameSize> {
        match self.state {
            CameraState::Ready(size) => Some(size),
            _ => None,
        }
    }

    /// Preferred constraints
    pub fn constraints(&self) -> &CameraConstraints {
        &self.constraints
    }

    /// Borrow the device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Acquire the device, releasing any stream held first
    ///
    /// When the preferred constraints fail for a reason other than
    /// permissions, transport security or platform support, the open is
    /// retried once without a resolution hint.
    ///
    /// # Errors
    ///
    /// Returns the `CameraError` of the last attempt; the session is then `Failed`
    pub fn start(&mut self) -> Result<FrameSize, CameraError> {
        self.stop();

        log::info!("Opening camera {}", self.constraints.device_index);
        let result = match self.device.open(&self.constraints) {
            Err(e) if e.is_recoverable() && self.constraints.ideal_size.is_some() => {
                log::warn!("Camera rejected preferred constraints ({e}), retrying with basic constraints");
                self.device.release();
                self.device.open(&self.constraints.basic())
            }
            other => other,
        };

        match result {
            Ok(size) => {
                log::info!("Camera ready at {size}");
                self.state = CameraState::Ready(size);
                Ok(size)
            }
            Err(e) => {
                log::error!("Camera failed to start ({}): {e}", e.kind);
                self.device.release();
                self.state = CameraState::Failed(e.clone());
                Err(e)
            }
        }
    }

    /// Release the device; safe to call at any time
    pub fn stop(&mut self) {
        if self.is_ready() {
            log::info!("Releasing camera");
        }
        self.device.release();
        self.state = CameraState::Stopped;
    }

    /// Stop, wait for the OS to free the device, start again
    ///
    /// # Errors
    ///
    /// Returns the `CameraError` from `start`
    pub fn restart(&mut self) -> Result<FrameSize, CameraError> {
        log::info!("Restarting camera");
        self.stop();
        if !self.settle_delay.is_zero() {
            thread::sleep(self.settle_delay);
        }
        self.start()
    }

    /// Read the next frame from a started session
    ///
    /// # Errors
    ///
    /// Returns `NotStarted` when the session is not ready, or the device's
    /// error, after which the session is `Failed` and the device released
    pub fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if !self.is_ready() {
            return Err(CameraError::new(CameraErrorKind::NotStarted));
        }

        match self.device.read_frame() {
            Ok(frame) => Ok(frame),
            Err(e) => {
                log::error!("Camera stream failed: {e}");
                self.device.release();
                self.state = CameraState::Failed(e.clone());
                Err(e)
            }
        }
    }
}

impl<D: CameraDevice> Drop for CameraSession<D> {
    fn drop(&mut self) {
        self.stop();
    }
}
