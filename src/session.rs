//! The reusable capture widget.
//!
//! A [`CaptureSession`] owns one camera session, one detector gate, one
//! liveness machine and one compositor. Nothing is shared between sessions,
//! so several can run side by side. Frames are processed one cycle at a time
//! by [`CaptureSession::step`]; [`CaptureSession::run`] loops it with a
//! cooperative sleep and checks a [`CancelToken`] before every cycle.

use crate::camera::{CameraDevice, CameraSession, CameraState, FrameSize};
use crate::compositor::{CapturedPhoto, PhotoCompositor};
use crate::config::Config;
use crate::error::{CameraError, CameraErrorKind};
use crate::face_detection::{FaceDetection, FaceDetector, GatedDetector, ModelStatus};
use crate::frame::VideoFrame;
use crate::head_pose::yaw_ratio;
use crate::liveness::{Instruction, LivenessMachine, LivenessState, LivenessUpdate, Observation};
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Cooperative stop flag shared with the host
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, uncancelled token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop before its next cycle
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn rearm(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Manual shutter for profiles without liveness
#[derive(Debug, Clone, Default)]
pub struct CaptureRequest(Arc<AtomicBool>);

impl CaptureRequest {
    /// Take a photo on the next cycle
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// Notifications for the host UI
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// The camera is streaming
    CameraReady(FrameSize),
    /// The camera could not be started or stopped streaming
    CameraFailed(CameraError),
    /// The prompt changed
    Instruction(Instruction),
    /// The liveness state changed
    StateChanged(LivenessState),
    /// Faces found in the latest frame, for the live overlay
    FacesDetected(Vec<FaceDetection>),
    /// A photo was produced
    PhotoCaptured(CapturedPhoto),
    /// Composition failed; the user should try again
    CaptureFailed(String),
    /// Detector models failed to load
    ModelsUnavailable(String),
}

/// Result of one detection cycle
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Keep going
    Continue,
    /// A photo was produced this cycle
    Captured(CapturedPhoto),
    /// Detection will never become available
    ModelsUnavailable(String),
    /// The camera failed; the host must restart
    CameraFailed(CameraError),
}

/// How [`CaptureSession::run`] ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// A photo was produced
    Captured(CapturedPhoto),
    /// The cancel token was triggered
    Cancelled,
    /// Detector models failed to load
    ModelsUnavailable(String),
    /// The camera failed
    CameraFailed(CameraError),
}

type Listener = Box<dyn FnMut(&CaptureEvent) + Send>;

/// Camera, detector, liveness and compositor for one capture widget
pub struct CaptureSession<C: CameraDevice, D: FaceDetector> {
    config: Config,
    camera: CameraSession<C>,
    detector: GatedDetector<D>,
    liveness: LivenessMachine,
    compositor: PhotoCompositor,
    cancel: CancelToken,
    shutter: CaptureRequest,
    listeners: Vec<Listener>,
    last_update: LivenessUpdate,
    liveness_started: bool,
    models_reported: bool,
    captured: Option<CapturedPhoto>,
    last_frame: Option<VideoFrame>,
    last_detections: Vec<FaceDetection>,
}

impl<C: CameraDevice, D: FaceDetector> CaptureSession<C, D> {
    /// Create a stopped session
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the configuration is invalid
    pub fn new(camera: C, detector: GatedDetector<D>, config: Config) -> Result<Self> {
        config.validate()?;
        let liveness = LivenessMachine::new(&config.liveness)?;
        let compositor = PhotoCompositor::new(config.profile.clone())?;
        let camera = CameraSession::new(camera, &config.camera);
        let last_update = liveness.snapshot();

        Ok(Self {
            config,
            camera,
            detector,
            liveness,
            compositor,
            cancel: CancelToken::new(),
            shutter: CaptureRequest::default(),
            listeners: Vec::new(),
            last_update,
            liveness_started: false,
            models_reported: false,
            captured: None,
            last_frame: None,
            last_detections: Vec::new(),
        })
    }

    /// Register an event callback
    pub fn on_event<F>(&mut self, listener: F)
    where
        F: FnMut(&CaptureEvent) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&mut self, event: CaptureEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Camera session
    pub fn camera(&self) -> &CameraSession<C> {
        &self.camera
    }

    /// Token that stops the running loop
    ///
    /// The same token serves every run of this session; `start` and
    /// `restart` re-arm it.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Shutter for manual capture during `run`
    pub fn capture_request(&self) -> CaptureRequest {
        self.shutter.clone()
    }

    /// Detector model readiness
    pub fn model_status(&self) -> ModelStatus {
        self.detector.status()
    }

    /// Current liveness state
    pub fn liveness_state(&self) -> LivenessState {
        self.liveness.state()
    }

    /// Current prompt
    pub fn instruction(&self) -> Instruction {
        self.liveness.instruction()
    }

    /// Photo produced by this run, if any
    pub fn captured_photo(&self) -> Option<&CapturedPhoto> {
        self.captured.as_ref()
    }

    /// Most recent frame
    pub fn last_frame(&self) -> Option<&VideoFrame> {
        self.last_frame.as_ref()
    }

    /// Faces found in the most recent frame
    pub fn last_detections(&self) -> &[FaceDetection] {
        &self.last_detections
    }

    fn reset_run(&mut self) {
        self.cancel.rearm();
        self.shutter.take();
        self.liveness.reset();
        self.liveness_started = false;
        self.models_reported = false;
        self.captured = None;
        self.last_frame = None;
        self.last_detections.clear();
        self.last_update = self.liveness.snapshot();
        self.emit(CaptureEvent::Instruction(Instruction::StartingCamera));
    }

    fn camera_started(&mut self, result: std::result::Result<FrameSize, CameraError>) -> Result<()> {
        match result {
            Ok(size) => {
                self.emit(CaptureEvent::CameraReady(size));
                Ok(())
            }
            Err(e) => {
                self.emit(CaptureEvent::CameraFailed(e.clone()));
                Err(e.into())
            }
        }
    }

    /// Reset liveness and acquire the camera
    ///
    /// # Errors
    ///
    /// Returns `Error::Camera` if the camera cannot be started
    pub fn start(&mut self) -> Result<()> {
        self.reset_run();
        let result = self.camera.start();
        self.camera_started(result)
    }

    /// Stop the loop and release the camera; no events fire afterwards
    pub fn stop(&mut self) {
        self.cancel.cancel();
        self.camera.stop();
        self.liveness.reset();
        self.liveness_started = false;
        self.last_update = self.liveness.snapshot();
    }

    /// Stop, wait for the device to settle, start again
    ///
    /// # Errors
    ///
    /// Returns `Error::Camera` if the camera cannot be started
    pub fn restart(&mut self) -> Result<()> {
        self.reset_run();
        let result = self.camera.restart();
        self.camera_started(result)
    }

    fn publish(&mut self, update: LivenessUpdate) {
        let previous = self.last_update;
        self.last_update = update;
        if update.state != previous.state {
            self.emit(CaptureEvent::StateChanged(update.state));
        }
        if update.instruction != previous.instruction {
            self.emit(CaptureEvent::Instruction(update.instruction));
        }
    }

    /// One detection cycle at time `now`
    ///
    /// # Errors
    ///
    /// Returns `Error::Camera` with `NotStarted` when the session is stopped
    pub fn step(&mut self, now: Instant) -> Result<StepOutcome> {
        match self.camera.state() {
            CameraState::Ready(_) => {}
            CameraState::Failed(e) => return Ok(StepOutcome::CameraFailed(e.clone())),
            CameraState::Stopped => return Err(CameraError::new(CameraErrorKind::NotStarted).into()),
        }

        let models = self.detector.status();
        if let ModelStatus::Failed(reason) = &models {
            if !self.models_reported {
                self.models_reported = true;
                self.emit(CaptureEvent::ModelsUnavailable(reason.clone()));
                self.emit(CaptureEvent::Instruction(Instruction::DetectionUnavailable));
            }
            return Ok(StepOutcome::ModelsUnavailable(reason.clone()));
        }

        let frame = match self.camera.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(StepOutcome::Continue),
            Err(e) => {
                self.emit(CaptureEvent::CameraFailed(e.clone()));
                return Ok(StepOutcome::CameraFailed(e));
            }
        };

        let outcome = if models != ModelStatus::Ready {
            StepOutcome::Continue
        } else if self.config.profile.require_liveness {
            self.liveness_cycle(&frame, now)
        } else {
            self.overlay_cycle(&frame)
        };

        self.last_frame = Some(frame);
        Ok(outcome)
    }

    fn liveness_cycle(&mut self, frame: &VideoFrame, now: Instant) -> StepOutcome {
        if !self.liveness_started {
            self.liveness_started = true;
            let update = self.liveness.start(now);
            self.publish(update);
        }
        if !self.liveness.state().is_awaiting() {
            return StepOutcome::Continue;
        }

        let detection = match self.detector.detect(frame) {
            Ok(detection) => detection,
            Err(e) => {
                log::warn!("Face detection failed, skipping frame: {e}");
                None
            }
        };

        let observation = match &detection {
            None => Observation::NoFace,
            Some(face) => yaw_ratio(&face.landmarks).map_or(Observation::FaceWithoutPose, Observation::Yaw),
        };
        log::debug!("{observation:?}");

        self.last_detections = detection.iter().cloned().collect();
        self.emit(CaptureEvent::FacesDetected(self.last_detections.clone()));

        let update = self.liveness.observe(observation, now);
        self.publish(update);
        if !update.capture_ready {
            return StepOutcome::Continue;
        }

        match self.compositor.compose(frame, detection.as_ref().map(|d| &d.bbox)) {
            Ok(photo) => {
                let update = self.liveness.confirm_capture();
                self.publish(update);
                self.captured = Some(photo.clone());
                self.emit(CaptureEvent::PhotoCaptured(photo.clone()));
                StepOutcome::Captured(photo)
            }
            Err(e) => {
                log::warn!("Photo composition failed: {e}");
                let update = self.liveness.capture_failed();
                self.publish(update);
                self.emit(CaptureEvent::CaptureFailed(e.to_string()));
                StepOutcome::Continue
            }
        }
    }

    fn overlay_cycle(&mut self, frame: &VideoFrame) -> StepOutcome {
        self.last_detections = match self.detector.detect_all(frame) {
            Ok(detections) => detections,
            Err(e) => {
                log::warn!("Face detection failed, skipping frame: {e}");
                Vec::new()
            }
        };
        self.emit(CaptureEvent::FacesDetected(self.last_detections.clone()));

        if !self.shutter.take() {
            return StepOutcome::Continue;
        }

        let best = self.last_detections.first().map(|d| d.bbox);
        match self.compositor.compose(frame, best.as_ref()) {
            Ok(photo) => {
                self.captured = Some(photo.clone());
                self.emit(CaptureEvent::PhotoCaptured(photo.clone()));
                StepOutcome::Captured(photo)
            }
            Err(e) => {
                log::warn!("Photo composition failed: {e}");
                self.emit(CaptureEvent::CaptureFailed(e.to_string()));
                StepOutcome::Continue
            }
        }
    }

    /// Loop `step` until a photo is taken, the token is cancelled or something fails
    ///
    /// The camera is released when the loop ends, except after a camera
    /// failure, which the session already released.
    ///
    /// # Errors
    ///
    /// Returns `Error::Camera` with `NotStarted` if the session was never started
    pub fn run(&mut self) -> Result<RunOutcome> {
        let interval = self.config.camera.frame_interval();
        let cancel = self.cancel.clone();

        loop {
            if cancel.is_cancelled() {
                log::info!("Capture cancelled");
                self.stop();
                return Ok(RunOutcome::Cancelled);
            }

            let cycle_start = Instant::now();
            match self.step(cycle_start)? {
                StepOutcome::Continue => {}
                StepOutcome::Captured(photo) => {
                    self.camera.stop();
                    return Ok(RunOutcome::Captured(photo));
                }
                StepOutcome::ModelsUnavailable(reason) => {
                    self.camera.stop();
                    return Ok(RunOutcome::ModelsUnavailable(reason));
                }
                StepOutcome::CameraFailed(e) => return Ok(RunOutcome::CameraFailed(e)),
            }

            if let Some(remaining) = interval.checked_sub(cycle_start.elapsed()) {
                thread::sleep(remaining);
            }
        }
    }

    /// Take the photo now
    ///
    /// With liveness required this returns the photo taken when the
    /// challenge completed. Without liveness a fresh frame is read and the
    /// most confident face is composed.
    ///
    /// # Errors
    ///
    /// - `Error::Camera` with `NotStarted` when the camera is not streaming
    /// - `Error::LivenessIncomplete` before the challenge finished
    /// - `Error::NoFaceDetected` when no face is found
    pub fn capture(&mut self) -> Result<CapturedPhoto> {
        if !self.camera.is_ready() {
            return Err(CameraError::new(CameraErrorKind::NotStarted).into());
        }

        if self.config.profile.require_liveness {
            return self.captured.clone().ok_or(Error::LivenessIncomplete);
        }

        let frame = match self.camera.read_frame()? {
            Some(frame) => frame,
            None => self
                .last_frame
                .clone()
                .ok_or_else(|| Error::InvalidInput("No frame available yet".to_string()))?,
        };

        let detection = self.detector.detect(&frame)?;
        let result = self.compositor.compose(&frame, detection.as_ref().map(|d| &d.bbox));
        self.last_frame = Some(frame);

        match result {
            Ok(photo) => {
                self.captured = Some(photo.clone());
                self.emit(CaptureEvent::PhotoCaptured(photo.clone()));
                Ok(photo)
            }
            Err(e) => {
                self.emit(CaptureEvent::CaptureFailed(e.to_string()));
                Err(e)
            }
        }
    }
}
