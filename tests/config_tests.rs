//! Configuration file loading and saving

use liveness_capture::config::{CaptureProfile, Config, FacingMode, ProfilePreset, EXAMPLE_CONFIG};
use liveness_capture::Error;
use std::io::Write;

#[test]
fn test_round_trip_through_file() {
    let mut config = Config::with_profile(CaptureProfile::portrait());
    config.camera.facing_mode = FacingMode::Environment;
    config.camera.device_index = 2;
    config.liveness.yaw_filter = "median:3".to_string();
    config.liveness.no_face_grace_ms = 1500;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.yaml");
    config.to_file(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.camera.facing_mode, FacingMode::Environment);
    assert_eq!(loaded.camera.device_index, 2);
    assert_eq!(loaded.liveness.yaw_filter, "median:3");
    assert_eq!(loaded.liveness.no_face_grace_ms, 1500);
    assert_eq!(loaded.profile, CaptureProfile::portrait());
    assert!(loaded.validate().is_ok());
}

#[test]
fn test_example_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(EXAMPLE_CONFIG.as_bytes()).unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.profile, CaptureProfile::id_card());
    assert_eq!(config.liveness.center_min, 0.4);
    assert_eq!(config.liveness.center_max, 0.6);
}

#[test]
fn test_profile_override_from_preset() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "profile:\n  padding: 0.5\n  require_liveness: false").unwrap();

    let mut config = Config::from_file(file.path()).unwrap();
    assert!((config.profile.padding - 0.5).abs() < f32::EPSILON);
    assert_eq!(config.profile.target_width, 135);
    assert!(!config.profile.require_liveness);

    config.profile = "carnet".parse::<ProfilePreset>().unwrap().profile();
    assert_eq!(config.profile, CaptureProfile::id_card());
}

#[test]
fn test_missing_file() {
    let result = Config::from_file("/nonexistent/capture.yaml");
    assert!(matches!(result, Err(Error::Io(_))));
}

#[test]
fn test_malformed_yaml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "liveness: [this is not a map").unwrap();

    match Config::from_file(file.path()) {
        Err(Error::ConfigError(msg)) => assert!(msg.contains("Failed to parse config")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn test_unknown_facing_mode() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "camera:\n  facing_mode: sideways").unwrap();
    assert!(Config::from_file(file.path()).is_err());
}
