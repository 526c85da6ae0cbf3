//! End-to-end capture session tests with scripted camera and detector

mod test_helpers;

use liveness_capture::config::CaptureProfile;
use liveness_capture::face_detection::{GatedDetector, ModelStatus};
use liveness_capture::liveness::{Instruction, LivenessState};
use liveness_capture::session::{CaptureEvent, CaptureSession, RunOutcome, StepOutcome};
use liveness_capture::{CameraError, CameraErrorKind, Error};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use test_helpers::{fast_config, DeviceEvent, RecordingCamera, ScriptedDetector};

type Events = Arc<Mutex<Vec<CaptureEvent>>>;

fn record<C, D>(session: &mut CaptureSession<C, D>) -> Events
where
    C: liveness_capture::camera::CameraDevice,
    D: liveness_capture::face_detection::FaceDetector,
{
    let events: Events = Arc::default();
    let sink = Arc::clone(&events);
    session.on_event(move |event| sink.lock().unwrap().push(event.clone()));
    events
}

fn instructions(events: &Events) -> Vec<Instruction> {
    events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| match e {
            CaptureEvent::Instruction(i) => Some(*i),
            _ => None,
        })
        .collect()
}

#[test]
fn test_liveness_capture_end_to_end() {
    let (camera, log) = RecordingCamera::new();
    let detector = GatedDetector::ready(ScriptedDetector::full_challenge());
    let mut session = CaptureSession::new(camera, detector, fast_config(CaptureProfile::id_card())).unwrap();
    let events = record(&mut session);

    session.start().unwrap();
    let photo = match session.run().unwrap() {
        RunOutcome::Captured(photo) => photo,
        other => panic!("expected a photo, got {other:?}"),
    };

    assert_eq!((photo.width, photo.height), (135, 189));
    assert_eq!(session.liveness_state(), LivenessState::Complete);
    assert_eq!(session.captured_photo(), Some(&photo));
    assert_eq!(
        instructions(&events),
        vec![
            Instruction::StartingCamera,
            Instruction::LookStraight,
            Instruction::TurnLeft,
            Instruction::TurnRight,
            Instruction::LookStraightForPhoto,
            Instruction::PhotoCaptured,
        ]
    );
    assert!(events.lock().unwrap().contains(&CaptureEvent::PhotoCaptured(photo.clone())));

    // the camera is released once the photo is taken
    assert_eq!(*log.lock().unwrap(), vec![DeviceEvent::Open, DeviceEvent::Release]);
    assert!(!session.camera().is_ready());
}

#[test]
fn test_capture_after_completion_returns_same_photo() {
    let (camera, _log) = RecordingCamera::new();
    let detector = GatedDetector::ready(ScriptedDetector::full_challenge());
    let mut session = CaptureSession::new(camera, detector, fast_config(CaptureProfile::id_card())).unwrap();

    session.start().unwrap();
    let now = Instant::now();
    let mut captured = None;
    for _ in 0..40 {
        if let StepOutcome::Captured(photo) = session.step(now).unwrap() {
            captured = Some(photo);
            break;
        }
    }
    let captured = captured.unwrap();
    assert_eq!(session.capture().unwrap(), captured);
}

#[test]
fn test_capture_with_camera_stopped() {
    let (camera, _log) = RecordingCamera::new();
    let detector = GatedDetector::ready(ScriptedDetector::new(vec![Some(0.5)]));
    let mut session = CaptureSession::new(camera, detector, fast_config(CaptureProfile::portrait())).unwrap();

    let err = session.capture().unwrap_err();
    assert!(matches!(
        err,
        Error::Camera(CameraError {
            kind: CameraErrorKind::NotStarted,
            ..
        })
    ));
    assert!(err.to_string().contains("Cámara no activa"));
}

#[test]
fn test_manual_capture_composes_detected_face() {
    let (camera, _log) = RecordingCamera::new();
    let detector = GatedDetector::ready(ScriptedDetector::new(vec![Some(0.5)]));
    let mut session = CaptureSession::new(camera, detector, fast_config(CaptureProfile::portrait())).unwrap();

    session.start().unwrap();
    let photo = session.capture().unwrap();
    assert_eq!((photo.width, photo.height), (300, 400));
    assert_eq!(session.liveness_state(), LivenessState::Idle);
}

#[test]
fn test_capture_request_during_run() {
    let (camera, log) = RecordingCamera::new();
    let detector = GatedDetector::ready(ScriptedDetector::new(vec![Some(0.5)]));
    let mut session = CaptureSession::new(camera, detector, fast_config(CaptureProfile::portrait())).unwrap();
    let events = record(&mut session);

    session.start().unwrap();
    let shutter = session.capture_request();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        shutter.request();
    });

    let outcome = session.run().unwrap();
    handle.join().unwrap();

    assert!(matches!(outcome, RunOutcome::Captured(_)));
    assert!(!session.last_detections().is_empty());
    assert!(events
        .lock()
        .unwrap()
        .iter()
        .any(|e| matches!(e, CaptureEvent::FacesDetected(faces) if faces.len() == 1)));
    assert_eq!(*log.lock().unwrap(), vec![DeviceEvent::Open, DeviceEvent::Release]);
}

#[test]
fn test_cancel_from_another_thread() {
    let (camera, log) = RecordingCamera::new();
    let detector = GatedDetector::ready(ScriptedDetector::new(vec![None]));
    let mut session = CaptureSession::new(camera, detector, fast_config(CaptureProfile::id_card())).unwrap();
    let events = record(&mut session);

    session.start().unwrap();
    let token = session.cancel_token();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        token.cancel();
    });

    assert_eq!(session.run().unwrap(), RunOutcome::Cancelled);
    handle.join().unwrap();

    assert_eq!(*log.lock().unwrap(), vec![DeviceEvent::Open, DeviceEvent::Release]);
    assert_eq!(session.liveness_state(), LivenessState::Idle);

    // nothing fires after stop
    let seen = events.lock().unwrap().len();
    session.stop();
    assert_eq!(events.lock().unwrap().len(), seen);
}

#[test]
fn test_cancel_through_token_taken_before_start() {
    let (camera, log) = RecordingCamera::new();
    let detector = GatedDetector::ready(ScriptedDetector::new(vec![None]));
    let mut session = CaptureSession::new(camera, detector, fast_config(CaptureProfile::id_card())).unwrap();

    // a close handler wired at construction time
    let token = session.cancel_token();

    let (done_tx, done_rx) = mpsc::channel();
    let worker = thread::spawn(move || {
        session.start().unwrap();
        done_tx.send(session.run()).unwrap();
    });

    thread::sleep(Duration::from_millis(50));
    token.cancel();

    let outcome = done_rx.recv_timeout(Duration::from_secs(2)).expect("run did not stop after cancel");
    assert_eq!(outcome.unwrap(), RunOutcome::Cancelled);
    worker.join().unwrap();
    assert_eq!(*log.lock().unwrap(), vec![DeviceEvent::Open, DeviceEvent::Release]);
}

#[test]
fn test_models_failed_to_load() {
    let (camera, log) = RecordingCamera::new();
    let detector = GatedDetector::<ScriptedDetector>::failed("face_detector.onnx not found");
    let mut session = CaptureSession::new(camera, detector, fast_config(CaptureProfile::id_card())).unwrap();
    let events = record(&mut session);

    session.start().unwrap();
    let outcome = session.run().unwrap();

    assert_eq!(
        outcome,
        RunOutcome::ModelsUnavailable("face_detector.onnx not found".to_string())
    );
    assert_eq!(instructions(&events).last(), Some(&Instruction::DetectionUnavailable));
    assert_eq!(*log.lock().unwrap(), vec![DeviceEvent::Open, DeviceEvent::Release]);
}

#[test]
fn test_camera_streams_while_models_load() {
    let (camera, _log) = RecordingCamera::new();
    let (release, gate) = mpsc::channel::<()>();
    let detector = GatedDetector::spawn(move || {
        gate.recv().ok();
        Ok(ScriptedDetector::new(vec![Some(0.5)]))
    });
    let mut session = CaptureSession::new(camera, detector.clone(), fast_config(CaptureProfile::id_card())).unwrap();

    session.start().unwrap();
    for _ in 0..3 {
        assert_eq!(session.step(Instant::now()).unwrap(), StepOutcome::Continue);
    }
    assert_eq!(session.model_status(), ModelStatus::Loading);
    assert_eq!(session.liveness_state(), LivenessState::Idle);
    assert!(session.last_frame().is_some());

    release.send(()).unwrap();
    assert_eq!(detector.wait(Duration::from_secs(5)), ModelStatus::Ready);

    session.step(Instant::now()).unwrap();
    assert_eq!(session.liveness_state(), LivenessState::AwaitingCenter);
    assert_eq!(session.instruction(), Instruction::LookStraight);
}

#[test]
fn test_camera_failure_is_reported() {
    let (camera, _log) = RecordingCamera::failing(vec![CameraError::new(CameraErrorKind::PermissionDenied)]);
    let detector = GatedDetector::ready(ScriptedDetector::new(vec![Some(0.5)]));
    let mut session = CaptureSession::new(camera, detector, fast_config(CaptureProfile::id_card())).unwrap();
    let events = record(&mut session);

    let err = session.start().unwrap_err();
    assert!(matches!(err, Error::Camera(ref e) if e.kind == CameraErrorKind::PermissionDenied));
    assert!(events
        .lock()
        .unwrap()
        .iter()
        .any(|e| matches!(e, CaptureEvent::CameraFailed(e) if e.kind == CameraErrorKind::PermissionDenied)));

    assert!(matches!(session.run().unwrap(), RunOutcome::CameraFailed(_)));

    // a restart recovers once the device is available
    session.restart().unwrap();
    assert!(session.camera().is_ready());
}

#[test]
fn test_restart_resets_progress() {
    let (camera, log) = RecordingCamera::new();
    let detector = GatedDetector::ready(ScriptedDetector::new(vec![Some(0.5)]));
    let mut session = CaptureSession::new(camera, detector, fast_config(CaptureProfile::id_card())).unwrap();

    session.start().unwrap();
    for _ in 0..12 {
        session.step(Instant::now()).unwrap();
    }
    assert_eq!(session.liveness_state(), LivenessState::AwaitingLeft);

    session.restart().unwrap();
    assert_eq!(session.liveness_state(), LivenessState::Idle);
    assert!(session.captured_photo().is_none());
    assert_eq!(
        *log.lock().unwrap(),
        vec![DeviceEvent::Open, DeviceEvent::Release, DeviceEvent::Open]
    );
}
