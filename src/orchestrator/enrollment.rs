//! EnrollmentOrchestrator - collects reference photos and registers them.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

use crate::capture::MediaCapture;
use crate::model::{BatchError, EnrollOutcome, EnrollmentBatch};
use crate::recognition::Recognizer;

/// Message used when the service refuses a batch without a reason.
const REGISTRATION_FAILED: &str = "Registration failed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentPhase {
    /// Waiting for the next shutter press.
    Collecting,
    Capturing,
    Submitting,
    /// The service accepted the batch; the flow is finished.
    Completed,
    /// The last submission failed; the batch stays sealed.
    Failed(String),
}

/// Render-only progress of an enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentProgress {
    pub current: usize,
    pub max: usize,
    pub phase: EnrollmentPhase,
}

impl EnrollmentProgress {
    /// Counter text, e.g. `3/5`.
    pub fn counter(&self) -> String {
        format!("{}/{}", self.current, self.max)
    }
}

/// Result of one [`EnrollmentOrchestrator::submit`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Completed(EnrollOutcome),
    Failed(String),
    /// Not sealed yet, already in flight, or already completed.
    Ignored,
}

/// Result of one [`EnrollmentOrchestrator::capture_next`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureNextOutcome {
    /// An image was appended; the batch is not full yet.
    Appended { current: usize, max: usize },
    /// The final image was appended and the batch was submitted.
    Submitted(SubmitOutcome),
    /// The camera produced no frame; nothing changed.
    CaptureUnavailable,
    /// The batch is sealed or an operation is in flight.
    Ignored,
}

struct Inner {
    batch: EnrollmentBatch,
    phase: EnrollmentPhase,
}

/// Drives one employee's enrollment from first photo to registration.
pub struct EnrollmentOrchestrator {
    camera: Arc<dyn MediaCapture>,
    recognizer: Arc<dyn Recognizer>,
    inner: Mutex<Inner>,
    progress: watch::Sender<EnrollmentProgress>,
}

impl EnrollmentOrchestrator {
    pub fn new(
        batch: EnrollmentBatch,
        camera: Arc<dyn MediaCapture>,
        recognizer: Arc<dyn Recognizer>,
    ) -> Self {
        let (progress, _) = watch::channel(EnrollmentProgress {
            current: batch.len(),
            max: batch.max(),
            phase: EnrollmentPhase::Collecting,
        });
        Self {
            camera,
            recognizer,
            inner: Mutex::new(Inner {
                batch,
                phase: EnrollmentPhase::Collecting,
            }),
            progress,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, inner: &mut Inner, phase: EnrollmentPhase) {
        inner.phase = phase;
        self.progress.send_replace(EnrollmentProgress {
            current: inner.batch.len(),
            max: inner.batch.max(),
            phase: inner.phase.clone(),
        });
    }

    /// Capture one reference photo.
    ///
    /// Appending the `max`-th photo seals the batch and submits it within the
    /// same call. Further calls on a sealed batch are no-ops.
    pub async fn capture_next(&self) -> CaptureNextOutcome {
        {
            let mut inner = self.lock();
            if inner.batch.is_sealed() || inner.phase != EnrollmentPhase::Collecting {
                log::debug!("Ignoring capture while {:?}", inner.phase);
                return CaptureNextOutcome::Ignored;
            }
            self.set_phase(&mut inner, EnrollmentPhase::Capturing);
        }

        let image = self.camera.capture().await;

        let (current, max) = {
            let mut inner = self.lock();
            let Some(image) = image else {
                self.set_phase(&mut inner, EnrollmentPhase::Collecting);
                return CaptureNextOutcome::CaptureUnavailable;
            };
            let current = match inner.batch.push(image) {
                Ok(current) => current,
                Err(BatchError::Sealed { .. } | BatchError::EmptyBatch) => {
                    self.set_phase(&mut inner, EnrollmentPhase::Collecting);
                    return CaptureNextOutcome::Ignored;
                }
            };
            log::info!("Captured reference photo {}", inner.batch.counter());
            self.set_phase(&mut inner, EnrollmentPhase::Collecting);
            (current, inner.batch.max())
        };

        if current < max {
            return CaptureNextOutcome::Appended { current, max };
        }
        CaptureNextOutcome::Submitted(self.submit().await)
    }

    /// Submit the sealed batch.
    ///
    /// A no-op before the batch is sealed, while a submission is in flight,
    /// and after a successful submission. After a failure the batch stays
    /// sealed and this may be called again.
    pub async fn submit(&self) -> SubmitOutcome {
        let batch = {
            let mut inner = self.lock();
            let ready = inner.batch.is_sealed()
                && matches!(
                    inner.phase,
                    EnrollmentPhase::Collecting | EnrollmentPhase::Failed(_)
                );
            if !ready {
                log::debug!(
                    "Ignoring submit at {} while {:?}",
                    inner.batch.counter(),
                    inner.phase
                );
                return SubmitOutcome::Ignored;
            }
            self.set_phase(&mut inner, EnrollmentPhase::Submitting);
            inner.batch.clone()
        };

        let result = self.recognizer.enroll(&batch).await;

        let mut inner = self.lock();
        match result {
            Ok(outcome) if outcome.success => {
                log::info!("Employee {} registered", batch.employee_id());
                self.set_phase(&mut inner, EnrollmentPhase::Completed);
                SubmitOutcome::Completed(outcome)
            }
            Ok(outcome) => {
                let message = outcome
                    .error
                    .unwrap_or_else(|| REGISTRATION_FAILED.to_string());
                log::warn!("Registration of {} failed: {}", batch.employee_id(), message);
                self.set_phase(&mut inner, EnrollmentPhase::Failed(message.clone()));
                SubmitOutcome::Failed(message)
            }
            Err(e) => {
                let message = e.to_string();
                log::warn!("Registration of {} failed: {}", batch.employee_id(), message);
                self.set_phase(&mut inner, EnrollmentPhase::Failed(message.clone()));
                SubmitOutcome::Failed(message)
            }
        }
    }

    pub fn progress(&self) -> EnrollmentProgress {
        self.progress.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<EnrollmentProgress> {
        self.progress.subscribe()
    }

    /// Captured images so far, in order (thumbnails).
    pub fn images(&self) -> Vec<String> {
        self.lock().batch.images().to_vec()
    }
}
