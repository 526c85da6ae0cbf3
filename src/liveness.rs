//! Head-turn liveness challenge.
//!
//! The machine walks the user through center, left, right and a final center
//! pose. Each step needs a run of consecutive frames in the target yaw band.
//! Time is always passed in by the caller so the machine stays deterministic.

use crate::config::LivenessConfig;
use crate::filters::{self, YawFilter};
use crate::head_pose::{YawBand, YawThresholds};
use crate::Result;
use std::fmt;
use std::time::{Duration, Instant};

/// Challenge progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LivenessState {
    /// Waiting for the camera
    Idle,
    /// Waiting for a frontal face
    AwaitingCenter,
    /// Waiting for a turn to the left
    AwaitingLeft,
    /// Waiting for a turn to the right
    AwaitingRight,
    /// Waiting for a frontal face before the photo
    AwaitingFinalCenter,
    /// Photo taken
    Complete,
}

impl LivenessState {
    /// Instruction shown on entering this state
    #[must_use]
    pub fn entry_instruction(self) -> Instruction {
        match self {
            Self::Idle => Instruction::StartingCamera,
            Self::AwaitingCenter => Instruction::LookStraight,
            Self::AwaitingLeft => Instruction::TurnLeft,
            Self::AwaitingRight => Instruction::TurnRight,
            Self::AwaitingFinalCenter => Instruction::LookStraightForPhoto,
            Self::Complete => Instruction::PhotoCaptured,
        }
    }

    /// Yaw band that advances this state
    #[must_use]
    pub fn target_band(self) -> Option<YawBand> {
        match self {
            Self::AwaitingCenter | Self::AwaitingFinalCenter => Some(YawBand::Center),
            Self::AwaitingLeft => Some(YawBand::Left),
            Self::AwaitingRight => Some(YawBand::Right),
            Self::Idle | Self::Complete => None,
        }
    }

    /// Whether frames are being counted in this state
    #[must_use]
    pub fn is_awaiting(self) -> bool {
        self.target_band().is_some()
    }

    fn next(self) -> Self {
        match self {
            Self::Idle => Self::AwaitingCenter,
            Self::AwaitingCenter => Self::AwaitingLeft,
            Self::AwaitingLeft => Self::AwaitingRight,
            Self::AwaitingRight => Self::AwaitingFinalCenter,
            Self::AwaitingFinalCenter | Self::Complete => Self::Complete,
        }
    }
}

impl fmt::Display for LivenessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::AwaitingCenter => "awaiting center",
            Self::AwaitingLeft => "awaiting left",
            Self::AwaitingRight => "awaiting right",
            Self::AwaitingFinalCenter => "awaiting final center",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// User-facing prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// Camera is being acquired
    StartingCamera,
    /// Look straight at the camera
    LookStraight,
    /// Turn the head to the left
    TurnLeft,
    /// Turn the head to the right
    TurnRight,
    /// Look straight at the camera for the photo
    LookStraightForPhoto,
    /// The photo has been taken
    PhotoCaptured,
    /// No face seen for longer than the grace window
    NoFace,
    /// Detector models could not be loaded
    DetectionUnavailable,
}

impl Instruction {
    /// Spanish text shown to the user
    #[must_use]
    pub fn text(self) -> &'static str {
        match self {
            Self::StartingCamera => "Iniciando cámara...",
            Self::LookStraight => "Mire al frente",
            Self::TurnLeft => "Gire suavemente a la IZQUIERDA",
            Self::TurnRight => "Gire suavemente a la DERECHA",
            Self::LookStraightForPhoto => "¡Perfecto! Mire al frente para la foto",
            Self::PhotoCaptured => "¡Foto Capturada!",
            Self::NoFace => "No se detecta rostro",
            Self::DetectionUnavailable => "Detección facial no disponible",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// What the detector saw in one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    /// A face with a usable yaw ratio
    Yaw(f64),
    /// A face whose landmarks gave no yaw ratio
    FaceWithoutPose,
    /// No face in the frame
    NoFace,
}

/// Machine snapshot after one observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LivenessUpdate {
    /// Current state
    pub state: LivenessState,
    /// Prompt to display
    pub instruction: Instruction,
    /// Consecutive in-band frames for the current step
    pub valid_frames: u32,
    /// The final pose was held long enough; the caller should take the photo
    pub capture_ready: bool,
}

/// Consecutive-frame liveness state machine
pub struct LivenessMachine {
    center_frames: u32,
    turn_frames: u32,
    final_center_frames: u32,
    grace: Duration,
    thresholds: YawThresholds,
    filter: Box<dyn YawFilter>,
    state: LivenessState,
    valid_frames: u32,
    last_face_seen: Option<Instant>,
    instruction: Instruction,
    capture_ready: bool,
}

impl fmt::Debug for LivenessMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LivenessMachine")
            .field("state", &self.state)
            .field("valid_frames", &self.valid_frames)
            .field("instruction", &self.instruction)
            .field("capture_ready", &self.capture_ready)
            .field("filter", &self.filter.name())
            .finish_non_exhaustive()
    }
}

impl LivenessMachine {
    /// Create an idle machine
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the configuration is invalid
    pub fn new(config: &LivenessConfig) -> Result<Self> {
        config.validate()?;
        let thresholds = YawThresholds::new(config.center_min, config.center_max)?;
        let filter = filters::create_filter(&config.yaw_filter)?;

        Ok(Self {
            center_frames: config.center_frames,
            turn_frames: config.turn_frames,
            final_center_frames: config.final_center_frames,
            grace: config.no_face_grace(),
            thresholds,
            filter,
            state: LivenessState::Idle,
            valid_frames: 0,
            last_face_seen: None,
            instruction: Instruction::StartingCamera,
            capture_ready: false,
        })
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> LivenessState {
        self.state
    }

    /// Consecutive in-band frames for the current step
    #[must_use]
    pub fn valid_frames(&self) -> u32 {
        self.valid_frames
    }

    /// Prompt to display
    #[must_use]
    pub fn instruction(&self) -> Instruction {
        self.instruction
    }

    /// When a face was last seen
    #[must_use]
    pub fn last_face_seen(&self) -> Option<Instant> {
        self.last_face_seen
    }

    /// Whether the machine is waiting for the caller to take the photo
    #[must_use]
    pub fn capture_ready(&self) -> bool {
        self.capture_ready
    }

    /// Whether the challenge finished and the photo was confirmed
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == LivenessState::Complete
    }

    /// Consecutive frames needed to leave `state`
    #[must_use]
    pub fn required_frames(&self, state: LivenessState) -> u32 {
        match state {
            LivenessState::AwaitingCenter => self.center_frames,
            LivenessState::AwaitingLeft | LivenessState::AwaitingRight => self.turn_frames,
            LivenessState::AwaitingFinalCenter => self.final_center_frames,
            LivenessState::Idle | LivenessState::Complete => 0,
        }
    }

    /// Snapshot of the current state
    #[must_use]
    pub fn snapshot(&self) -> LivenessUpdate {
        LivenessUpdate {
            state: self.state,
            instruction: self.instruction,
            valid_frames: self.valid_frames,
            capture_ready: self.capture_ready,
        }
    }

    /// Camera is ready: reset and begin waiting for a frontal face
    pub fn start(&mut self, now: Instant) -> LivenessUpdate {
        self.reset();
        self.last_face_seen = Some(now);
        self.enter(LivenessState::AwaitingCenter);
        self.snapshot()
    }

    /// Back to idle, dropping all progress
    pub fn reset(&mut self) {
        self.state = LivenessState::Idle;
        self.valid_frames = 0;
        self.last_face_seen = None;
        self.instruction = Instruction::StartingCamera;
        self.capture_ready = false;
        self.filter.reset();
    }

    /// Feed one frame's observation
    pub fn observe(&mut self, observation: Observation, now: Instant) -> LivenessUpdate {
        if !self.state.is_awaiting() {
            return self.snapshot();
        }

        match observation {
            Observation::NoFace => self.on_missing_face(now),
            Observation::FaceWithoutPose => {
                self.face_seen(now);
                self.valid_frames = 0;
            }
            Observation::Yaw(ratio) => {
                self.face_seen(now);
                if !self.capture_ready {
                    self.on_yaw(ratio);
                }
            }
        }

        self.snapshot()
    }

    /// The photo was composed: finish the challenge
    pub fn confirm_capture(&mut self) -> LivenessUpdate {
        if self.capture_ready {
            self.capture_ready = false;
            self.enter(LivenessState::Complete);
        }
        self.snapshot()
    }

    /// Composition failed: hold the final pose again
    pub fn capture_failed(&mut self) -> LivenessUpdate {
        if self.capture_ready {
            log::warn!("Capture failed, waiting for the final pose again");
            self.capture_ready = false;
            self.valid_frames = 0;
        }
        self.snapshot()
    }

    fn face_seen(&mut self, now: Instant) {
        self.last_face_seen = Some(now);
        self.instruction = self.state.entry_instruction();
    }

    fn on_missing_face(&mut self, now: Instant) {
        let since = self.last_face_seen.unwrap_or(now);
        if now.saturating_duration_since(since) <= self.grace {
            return;
        }

        if self.instruction != Instruction::NoFace {
            log::debug!(
                "No face for more than {:?} in state {}, progress dropped",
                self.grace,
                self.state
            );
            self.filter.reset();
        }
        self.valid_frames = 0;
        self.instruction = Instruction::NoFace;
    }

    fn on_yaw(&mut self, ratio: f64) {
        let smoothed = self.filter.apply(ratio);
        let band = self.thresholds.classify(smoothed);
        log::trace!("yaw ratio {ratio:.3} (smoothed {smoothed:.3}) -> {band:?}");

        if Some(band) != self.state.target_band() {
            self.valid_frames = 0;
            return;
        }

        self.valid_frames += 1;
        if self.valid_frames < self.required_frames(self.state) {
            return;
        }

        if self.state == LivenessState::AwaitingFinalCenter {
            log::info!("Final pose held for {} frames, ready to capture", self.valid_frames);
            self.capture_ready = true;
        } else {
            self.enter(self.state.next());
        }
    }

    fn enter(&mut self, next: LivenessState) {
        if next != self.state {
            log::info!("Liveness: {} -> {}", self.state, next);
        }
        self.state = next;
        self.valid_frames = 0;
        self.instruction = next.entry_instruction();
        self.filter.reset();
    }
}
