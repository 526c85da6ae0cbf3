//! Liveness-gated face capture from a webcam.

use anyhow::{bail, Context, Result};
use clap::Parser;
use liveness_capture::camera::opencv::OpencvCamera;
use liveness_capture::config::{Config, ProfilePreset};
use liveness_capture::face_detection::{onnx::OnnxFaceDetector, GatedDetector};
use liveness_capture::overlay;
use liveness_capture::session::{CaptureEvent, CaptureSession, RunOutcome};
use log::info;
use std::io::BufRead;
use std::path::PathBuf;
use std::thread;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera index to use
    #[arg(long)]
    cam: Option<i32>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Capture profile (id-card, portrait); overrides the config file
    #[arg(short, long)]
    profile: Option<ProfilePreset>,

    /// Where to write the JPEG photo
    #[arg(short, long, default_value = "photo.jpg")]
    output: PathBuf,

    /// Also print the photo as a data URI
    #[arg(long)]
    data_uri: bool,

    /// Write the last frame with detection boxes and landmarks to this path
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            match Config::from_file(path) {
                Ok(cfg) => cfg,
                Err(e) => {
                    log::warn!("Failed to load config file: {e}. Using defaults.");
                    Config::default()
                }
            }
        }
        None => Config::default(),
    };

    if let Some(cam) = args.cam {
        config.camera.device_index = cam;
    }
    if let Some(preset) = args.profile {
        config.profile = preset.profile();
    }

    config.validate().context("invalid configuration")?;
    config.validate_models().context("detector models missing")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Liveness capture");
    let config = load_config(&args)?;
    let manual = !config.profile.require_liveness;

    let detection = config.detection.clone();
    let detector = GatedDetector::spawn(move || OnnxFaceDetector::load(&detection));

    let mut session = CaptureSession::new(OpencvCamera::new(), detector, config)?;
    session.on_event(|event| match event {
        CaptureEvent::Instruction(instruction) => println!(">> {instruction}"),
        CaptureEvent::CameraReady(size) => info!("Camera ready at {size}"),
        CaptureEvent::CameraFailed(e) => eprintln!("{e}"),
        CaptureEvent::StateChanged(state) => log::debug!("Liveness state: {state}"),
        CaptureEvent::FacesDetected(faces) => log::trace!("{} face(s)", faces.len()),
        CaptureEvent::PhotoCaptured(photo) => info!("Photo captured: {}x{}", photo.width, photo.height),
        CaptureEvent::CaptureFailed(reason) => eprintln!("{reason}"),
        CaptureEvent::ModelsUnavailable(reason) => eprintln!("Face detection unavailable: {reason}"),
    });

    if manual {
        let shutter = session.capture_request();
        thread::spawn(move || {
            println!(">> Presiona Enter para tomar la foto");
            let mut line = String::new();
            if std::io::stdin().lock().read_line(&mut line).is_ok() {
                shutter.request();
            }
        });
    }

    session.start()?;
    let outcome = session.run()?;

    if let Some(path) = &args.overlay {
        if let Some(frame) = session.last_frame() {
            overlay::annotate(frame, session.last_detections())
                .save(path)
                .with_context(|| format!("writing overlay to {}", path.display()))?;
            info!("Overlay written to {}", path.display());
        }
    }

    match outcome {
        RunOutcome::Captured(photo) => {
            photo.save(&args.output)?;
            info!("Photo written to {}", args.output.display());
            if args.data_uri {
                println!("{}", photo.to_data_uri());
            }
            Ok(())
        }
        RunOutcome::Cancelled => bail!("capture cancelled"),
        RunOutcome::ModelsUnavailable(reason) => bail!("face detection unavailable: {reason}"),
        RunOutcome::CameraFailed(e) => Err(e).context("camera failed"),
    }
}
