//! Liveness challenge scenarios driven through the public API

use liveness_capture::config::LivenessConfig;
use liveness_capture::head_pose::{yaw_ratio, YawBand, YawThresholds};
use liveness_capture::liveness::{Instruction, LivenessMachine, LivenessState, Observation};
use std::time::{Duration, Instant};

mod test_helpers;
use test_helpers::face_with_yaw;

const FRAME: Duration = Duration::from_millis(33);

struct Clock(Instant);

impl Clock {
    fn tick(&mut self) -> Instant {
        self.0 += FRAME;
        self.0
    }
}

fn run(machine: &mut LivenessMachine, clock: &mut Clock, ratios: &[f64]) {
    for &ratio in ratios {
        let observation = yaw_ratio(&face_with_yaw(ratio).landmarks).map_or(Observation::FaceWithoutPose, Observation::Yaw);
        machine.observe(observation, clock.tick());
    }
}

#[test]
fn test_landmark_geometry_matches_bands() {
    let thresholds = YawThresholds::default();
    let classify = |ratio| thresholds.classify(yaw_ratio(&face_with_yaw(ratio).landmarks).unwrap());
    assert_eq!(classify(0.5), YawBand::Center);
    assert_eq!(classify(0.8), YawBand::Left);
    assert_eq!(classify(0.2), YawBand::Right);
}

#[test]
fn test_challenge_from_landmarks() {
    let mut machine = LivenessMachine::new(&LivenessConfig::default()).unwrap();
    let mut clock = Clock(Instant::now());
    machine.start(clock.0);

    run(&mut machine, &mut clock, &[0.5; 10]);
    assert_eq!(machine.state(), LivenessState::AwaitingLeft);
    run(&mut machine, &mut clock, &[0.8; 5]);
    assert_eq!(machine.state(), LivenessState::AwaitingRight);
    run(&mut machine, &mut clock, &[0.2; 5]);
    assert_eq!(machine.state(), LivenessState::AwaitingFinalCenter);
    assert_eq!(machine.instruction(), Instruction::LookStraightForPhoto);
    run(&mut machine, &mut clock, &[0.5; 10]);
    assert!(machine.capture_ready());
}

#[test]
fn test_wrong_direction_does_not_advance() {
    let mut machine = LivenessMachine::new(&LivenessConfig::default()).unwrap();
    let mut clock = Clock(Instant::now());
    machine.start(clock.0);

    run(&mut machine, &mut clock, &[0.5; 10]);
    run(&mut machine, &mut clock, &[0.2; 20]);
    assert_eq!(machine.state(), LivenessState::AwaitingLeft);
    assert_eq!(machine.valid_frames(), 0);
}

#[test]
fn test_custom_counts() {
    let config = LivenessConfig {
        center_frames: 2,
        turn_frames: 1,
        final_center_frames: 3,
        ..LivenessConfig::default()
    };
    let mut machine = LivenessMachine::new(&config).unwrap();
    let mut clock = Clock(Instant::now());
    machine.start(clock.0);

    run(&mut machine, &mut clock, &[0.5, 0.5, 0.8, 0.2, 0.5, 0.5]);
    assert!(!machine.capture_ready());
    run(&mut machine, &mut clock, &[0.5]);
    assert!(machine.capture_ready());
}

#[test]
fn test_smoothing_restarts_with_each_step() {
    let config = LivenessConfig {
        yaw_filter: "moving_average:3".to_string(),
        ..LivenessConfig::default()
    };
    let mut machine = LivenessMachine::new(&config).unwrap();
    let mut clock = Clock(Instant::now());
    machine.start(clock.0);

    run(&mut machine, &mut clock, &[0.5; 10]);
    assert_eq!(machine.state(), LivenessState::AwaitingLeft);

    // center history is dropped on entering the turn, so every turn frame counts
    run(&mut machine, &mut clock, &[0.7; 4]);
    assert_eq!(machine.valid_frames(), 4);
    run(&mut machine, &mut clock, &[0.7]);
    assert_eq!(machine.state(), LivenessState::AwaitingRight);

    // within a step the filter still smooths: one stray frame is absorbed
    run(&mut machine, &mut clock, &[0.2, 0.2, 0.5]);
    assert_eq!(machine.valid_frames(), 3);
    assert_eq!(machine.state(), LivenessState::AwaitingRight);
}

#[test]
fn test_long_absence_prompts_without_losing_step() {
    let mut machine = LivenessMachine::new(&LivenessConfig::default()).unwrap();
    let mut clock = Clock(Instant::now());
    machine.start(clock.0);

    run(&mut machine, &mut clock, &[0.5; 10]);
    run(&mut machine, &mut clock, &[0.8; 2]);

    let mut update = machine.snapshot();
    for _ in 0..70 {
        update = machine.observe(Observation::NoFace, clock.tick());
    }
    assert_eq!(update.instruction, Instruction::NoFace);
    assert_eq!(update.state, LivenessState::AwaitingLeft);

    run(&mut machine, &mut clock, &[0.8; 5]);
    assert_eq!(machine.state(), LivenessState::AwaitingRight);
}

#[test]
fn test_invalid_config_rejected() {
    let config = LivenessConfig {
        center_min: 0.7,
        center_max: 0.3,
        ..LivenessConfig::default()
    };
    assert!(LivenessMachine::new(&config).is_err());

    let config = LivenessConfig {
        turn_frames: 0,
        ..LivenessConfig::default()
    };
    assert!(LivenessMachine::new(&config).is_err());
}
