//! CaptureOrchestrator - turns triggers into attendance punches.
//!
//! Every trigger goes through the same gate: it is accepted only while the
//! orchestrator is `Idle`, and dropped otherwise. An accepted trigger runs one
//! pipeline to completion on its own task:
//!
//! ```text
//! Idle -> Capturing -> AwaitingLocation -> Submitting -> Presenting -> CooldownLocked -> Idle
//!            |                 |                |
//!            +-> Idle          +----------------+-> CooldownLocked (alert)
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

use super::state::{Alert, OrchestratorState, Snapshot, Splash, SplashPhase, Timings};
use crate::capture::MediaCapture;
use crate::feedback::FeedbackPlayer;
use crate::location::LocationProvider;
use crate::model::{CaptureTrigger, Punch, RecognitionRequest, RecognitionResult};
use crate::recognition::{ClientError, Recognizer};
use crate::session::SessionContext;

/// Why an accepted attempt did not produce a punch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttemptError {
    /// No frame was produced. Recovered silently.
    #[error("no frame available")]
    CaptureUnavailable,

    #[error("Unable to fetch GPS location.")]
    LocationUnavailable,

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Protocol(String),

    /// The service answered with a structured failure.
    #[error("{0}")]
    ServiceRejected(String),
}

impl AttemptError {
    /// The alert shown for this failure, if any.
    pub fn alert(&self) -> Option<Alert> {
        match self {
            AttemptError::CaptureUnavailable => None,
            AttemptError::LocationUnavailable => Some(Alert::new("GPS Error", self.to_string())),
            AttemptError::Transport(_) | AttemptError::Protocol(_) => {
                Some(Alert::new("Error", self.to_string()))
            }
            AttemptError::ServiceRejected(_) => Some(Alert::new("Not Recognized", self.to_string())),
        }
    }
}

impl From<ClientError> for AttemptError {
    fn from(e: ClientError) -> Self {
        if e.is_transport() {
            AttemptError::Transport(e.to_string())
        } else {
            AttemptError::Protocol(e.to_string())
        }
    }
}

/// Terminal result of one pipeline run.
pub type AttemptOutcome = Result<Punch, AttemptError>;

struct Inner {
    state: OrchestratorState,
    alert: Option<Alert>,
    attempts: u64,
    submissions: u64,
}

struct Shared {
    session: SessionContext,
    camera: Arc<dyn MediaCapture>,
    location: Arc<dyn LocationProvider>,
    recognizer: Arc<dyn Recognizer>,
    feedback: Arc<dyn FeedbackPlayer>,
    timings: Timings,
    inner: Mutex<Inner>,
    snapshots: watch::Sender<Snapshot>,
}

/// Clone-safe handle to one capture session.
#[derive(Clone)]
pub struct CaptureOrchestrator {
    shared: Arc<Shared>,
}

impl CaptureOrchestrator {
    pub fn new(
        session: SessionContext,
        camera: Arc<dyn MediaCapture>,
        location: Arc<dyn LocationProvider>,
        recognizer: Arc<dyn Recognizer>,
        feedback: Arc<dyn FeedbackPlayer>,
        timings: Timings,
    ) -> Self {
        let (snapshots, _) = watch::channel(Snapshot::default());
        Self {
            shared: Arc::new(Shared {
                session,
                camera,
                location,
                recognizer,
                feedback,
                timings,
                inner: Mutex::new(Inner {
                    state: OrchestratorState::Idle,
                    alert: None,
                    attempts: 0,
                    submissions: 0,
                }),
                snapshots,
            }),
        }
    }

    /// Offer a trigger to the orchestrator.
    ///
    /// Returns the task running the accepted attempt, or `None` when the
    /// trigger was dropped because an attempt, splash or cooldown is active.
    /// Must be called from within a tokio runtime.
    pub fn trigger(&self, trigger: CaptureTrigger) -> Option<JoinHandle<AttemptOutcome>> {
        {
            let mut inner = self.shared.lock();
            if !inner.state.is_idle() {
                log::debug!(
                    "Dropping {} trigger while {:?}",
                    trigger,
                    inner.state.kind()
                );
                return None;
            }
            inner.state = OrchestratorState::Capturing;
            inner.alert = None;
            inner.attempts += 1;
            self.shared.publish(&inner);
        }

        log::info!("Accepted {} trigger", trigger);
        let shared = self.shared.clone();
        Some(tokio::spawn(async move { shared.run_attempt().await }))
    }

    /// Current state.
    pub fn state(&self) -> OrchestratorState {
        self.shared.lock().state.clone()
    }

    /// Current render snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.shared.snapshots.borrow().clone()
    }

    /// Subscribe to render snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.shared.snapshots.subscribe()
    }

    /// Acknowledge the current alert.
    pub fn dismiss_alert(&self) {
        let mut inner = self.shared.lock();
        if inner.alert.take().is_some() {
            self.shared.publish(&inner);
        }
    }

    pub fn timings(&self) -> Timings {
        self.shared.timings
    }

    pub fn session(&self) -> &SessionContext {
        &self.shared.session
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &Inner) {
        self.snapshots.send_replace(Snapshot {
            state: inner.state.kind(),
            splash: inner.state.splash().cloned(),
            alert: inner.alert.clone(),
            attempts: inner.attempts,
            submissions: inner.submissions,
        });
    }

    fn transition(&self, state: OrchestratorState) {
        let mut inner = self.lock();
        log::debug!("{:?} -> {:?}", inner.state.kind(), state.kind());
        inner.state = state;
        self.publish(&inner);
    }

    async fn run_attempt(self: Arc<Self>) -> AttemptOutcome {
        let mut guard = IdleOnUnwind {
            shared: self.clone(),
            armed: true,
        };
        let outcome = self.attempt().await;
        guard.armed = false;
        outcome
    }

    async fn attempt(&self) -> AttemptOutcome {
        let Some(image) = self.camera.capture().await else {
            // Silent: the next trigger simply tries again.
            self.transition(OrchestratorState::Idle);
            return Err(AttemptError::CaptureUnavailable);
        };

        self.transition(OrchestratorState::AwaitingLocation);
        let Some(fix) = self.location.locate().await else {
            return self.fail(AttemptError::LocationUnavailable).await;
        };

        let request = RecognitionRequest::new(
            self.session.site_id(),
            self.session.device_id(),
            image.clone(),
            fix,
        );
        {
            let mut inner = self.lock();
            inner.state = OrchestratorState::Submitting;
            inner.submissions += 1;
            self.publish(&inner);
        }

        match self.recognizer.recognize(&request).await {
            Ok(RecognitionResult::Success(punch)) => {
                self.feedback.play(punch.log_type);
                self.present(&punch, image).await;
                self.cool_down().await;
                Ok(punch)
            }
            Ok(RecognitionResult::Failure { reason }) => {
                self.fail(AttemptError::ServiceRejected(reason)).await
            }
            Err(e) => {
                log::warn!("Recognition request failed: {}", e);
                self.fail(AttemptError::from(e)).await
            }
        }
    }

    /// Hold the splash for the presentation window.
    async fn present(&self, punch: &Punch, selfie: String) {
        let started = Instant::now();
        let expires_at = started + self.timings.presentation;
        let splash = Splash::new(punch, selfie);
        log::info!(
            "{}: {} ({})",
            splash.title(),
            splash.employee_name,
            splash.employee_id
        );
        self.transition(OrchestratorState::Presenting {
            splash: splash.clone(),
            expires_at,
        });

        sleep_until(started + self.timings.fade_out_at()).await;
        self.transition(OrchestratorState::Presenting {
            splash: Splash {
                phase: SplashPhase::FadingOut,
                ..splash
            },
            expires_at,
        });

        sleep_until(expires_at).await;
    }

    async fn fail(&self, error: AttemptError) -> AttemptOutcome {
        if let Some(alert) = error.alert() {
            log::warn!("{}: {}", alert.title, alert.message);
            let mut inner = self.lock();
            inner.alert = Some(alert);
            self.publish(&inner);
        }
        self.cool_down().await;
        Err(error)
    }

    async fn cool_down(&self) {
        let until = Instant::now() + self.timings.cooldown;
        self.transition(OrchestratorState::CooldownLocked { until });
        sleep_until(until).await;
        self.transition(OrchestratorState::Idle);
    }
}

/// Puts the orchestrator back to Idle if an attempt task panics or is
/// aborted, so later triggers are not locked out.
struct IdleOnUnwind {
    shared: Arc<Shared>,
    armed: bool,
}

impl Drop for IdleOnUnwind {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut inner = self.shared.lock();
        log::error!(
            "Attempt ended abnormally while {:?}; returning to idle",
            inner.state.kind()
        );
        inner.state = OrchestratorState::Idle;
        self.shared.publish(&inner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_titles() {
        assert_eq!(AttemptError::CaptureUnavailable.alert(), None);
        assert_eq!(
            AttemptError::LocationUnavailable.alert(),
            Some(Alert::new("GPS Error", "Unable to fetch GPS location."))
        );
        assert_eq!(
            AttemptError::ServiceRejected("No match".to_string()).alert(),
            Some(Alert::new("Not Recognized", "No match"))
        );
        assert_eq!(
            AttemptError::Transport("timeout".to_string()).alert(),
            Some(Alert::new("Error", "timeout"))
        );
    }

    #[test]
    fn test_client_error_mapping() {
        let status = ClientError::Status {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert!(matches!(AttemptError::from(status), AttemptError::Transport(_)));
        let protocol = ClientError::Protocol("missing field".to_string());
        assert_eq!(
            AttemptError::from(protocol),
            AttemptError::Protocol("Unexpected response: missing field".to_string())
        );
    }
}
