//! Error types for the liveness capture library.

use std::fmt;
use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// Camera acquisition or frame read failed
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    /// Composition was requested without a detected face
    #[error("No se detectó ningún rostro. Asegúrate de que tu rostro esté visible y bien iluminado.")]
    NoFaceDetected,

    /// Detector models failed to load; detection stays unavailable
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// A photo was requested before the liveness challenge finished
    #[error("La verificación de vida no ha terminado. Siga las instrucciones en pantalla.")]
    LivenessIncomplete,

    /// `OpenCV` operation failed
    #[cfg(feature = "opencv")]
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// `ONNX` Runtime inference failed
    #[cfg(feature = "onnx")]
    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(#[from] ort::OrtError),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image processing or encoding failed
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Model output did not have the expected shape
    #[error("Model output error: {0}")]
    ModelOutputError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Reason a camera could not be acquired or read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CameraErrorKind {
    /// The user or the OS refused camera access
    PermissionDenied,
    /// No capture device is present
    NotFound,
    /// The device is held by another application
    DeviceBusy,
    /// Camera access requires a secure (HTTPS) context
    InsecureContext,
    /// The platform offers no camera API
    Unsupported,
    /// Any other acquisition failure
    Unknown,
    /// The session was used while no stream is held
    NotStarted,
}

impl CameraErrorKind {
    /// Actionable guidance shown to the user for this kind.
    #[must_use]
    pub fn default_message(self) -> &'static str {
        match self {
            Self::PermissionDenied => {
                "Permiso denegado para acceder a la cámara. Por favor, permite el acceso en la configuración del sistema."
            }
            Self::NotFound => "No se encontró una cámara.",
            Self::DeviceBusy => "La cámara está siendo usada por otra aplicación.",
            Self::InsecureContext => {
                "La cámara requiere una conexión segura (HTTPS). Accede desde localhost o un sitio HTTPS."
            }
            Self::Unsupported => "Tu dispositivo no soporta acceso a la cámara.",
            Self::Unknown => "Error al acceder a la cámara.",
            Self::NotStarted => "Cámara no activa. Intenta reiniciar la cámara.",
        }
    }
}

impl fmt::Display for CameraErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PermissionDenied => "permission denied",
            Self::NotFound => "not found",
            Self::DeviceBusy => "device busy",
            Self::InsecureContext => "insecure context",
            Self::Unsupported => "unsupported",
            Self::Unknown => "unknown",
            Self::NotStarted => "not started",
        };
        f.write_str(name)
    }
}

/// Camera failure with a user-facing message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CameraError {
    /// Failure category
    pub kind: CameraErrorKind,
    /// Human-readable, actionable message
    pub message: String,
}

impl CameraError {
    /// Create an error carrying the default message for `kind`
    #[must_use]
    pub fn new(kind: CameraErrorKind) -> Self {
        Self {
            kind,
            message: kind.default_message().to_string(),
        }
    }

    /// Create an error whose message appends backend detail to the default text
    pub fn with_detail(kind: CameraErrorKind, detail: impl fmt::Display) -> Self {
        Self {
            kind,
            message: format!("{} ({detail})", kind.default_message()),
        }
    }

    /// Whether retrying with relaxed constraints can help
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self.kind,
            CameraErrorKind::PermissionDenied | CameraErrorKind::InsecureContext | CameraErrorKind::Unsupported
        )
    }
}
