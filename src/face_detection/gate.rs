//! Background model loading.
//!
//! Detector models can take seconds to load. [`GatedDetector`] loads them on
//! a worker thread and reports no faces until they are ready, so a capture
//! session can start the camera immediately.

use super::{FaceDetection, FaceDetector};
use crate::{frame::VideoFrame, Error, Result};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

/// Model readiness as seen by the capture loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    /// Models are still loading
    Loading,
    /// Detection is available
    Ready,
    /// Loading failed; detection stays unavailable
    Failed(String),
}

enum Slot<D> {
    Loading,
    Ready(D),
    Failed(String),
}

/// A detector whose models load in the background
pub struct GatedDetector<D> {
    slot: Arc<Mutex<Slot<D>>>,
}

impl<D> Clone for GatedDetector<D> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

impl<D: FaceDetector + 'static> GatedDetector<D> {
    /// Start loading on a worker thread
    pub fn spawn<F>(loader: F) -> Self
    where
        F: FnOnce() -> Result<D> + Send + 'static,
    {
        let slot = Arc::new(Mutex::new(Slot::Loading));
        let worker_slot = Arc::clone(&slot);

        let spawned = thread::Builder::new()
            .name("model-loader".to_string())
            .spawn(move || {
                let started = Instant::now();
                let loaded = match panic::catch_unwind(AssertUnwindSafe(loader)) {
                    Ok(Ok(detector)) => {
                        log::info!("Face detection models ready in {:?}", started.elapsed());
                        Slot::Ready(detector)
                    }
                    Ok(Err(e)) => {
                        log::error!("Failed to load face detection models: {e}");
                        Slot::Failed(e.to_string())
                    }
                    Err(payload) => {
                        let reason = format!("model loader panicked: {}", panic_message(payload.as_ref()));
                        log::error!("Failed to load face detection models: {reason}");
                        Slot::Failed(reason)
                    }
                };
                if let Ok(mut guard) = worker_slot.lock() {
                    *guard = loaded;
                }
            });

        if let Err(e) = spawned {
            log::error!("Failed to spawn model loader thread: {e}");
            if let Ok(mut guard) = slot.lock() {
                *guard = Slot::Failed(e.to_string());
            }
        }

        Self { slot }
    }
}

impl<D> GatedDetector<D> {
    /// Wrap an already loaded detector
    pub fn ready(detector: D) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::Ready(detector))),
        }
    }

    /// A gate whose models failed to load
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::Failed(reason.into()))),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Slot<D>>> {
        self.slot
            .lock()
            .map_err(|_| Error::ModelLoad("face detector panicked during inference".to_string()))
    }

    /// Current readiness
    #[must_use]
    pub fn status(&self) -> ModelStatus {
        match self.lock() {
            Ok(guard) => match &*guard {
                Slot::Loading => ModelStatus::Loading,
                Slot::Ready(_) => ModelStatus::Ready,
                Slot::Failed(reason) => ModelStatus::Failed(reason.clone()),
            },
            Err(e) => ModelStatus::Failed(e.to_string()),
        }
    }

    /// Whether detection is available
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status() == ModelStatus::Ready
    }

    /// Block until loading finishes or `timeout` elapses
    pub fn wait(&self, timeout: Duration) -> ModelStatus {
        let deadline = Instant::now() + timeout;
        loop {
            let status = self.status();
            if status != ModelStatus::Loading || Instant::now() >= deadline {
                return status;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl<D: FaceDetector> FaceDetector for GatedDetector<D> {
    fn detect_all(&mut self, frame: &VideoFrame) -> Result<Vec<FaceDetection>> {
        let mut guard = self.lock()?;
        match &mut *guard {
            Slot::Ready(detector) => detector.detect_all(frame),
            Slot::Loading | Slot::Failed(_) => Ok(Vec::new()),
        }
    }

    fn detect(&mut self, frame: &VideoFrame) -> Result<Option<FaceDetection>> {
        let mut guard = self.lock()?;
        match &mut *guard {
            Slot::Ready(detector) => detector.detect(frame),
            Slot::Loading | Slot::Failed(_) => Ok(None),
        }
    }
}
