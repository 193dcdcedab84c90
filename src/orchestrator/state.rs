//! Orchestrator state, timings and the render-only snapshot.

use std::time::Duration;
use tokio::time::Instant;

use crate::model::{LogType, Punch};

/// Timed windows of the capture pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Total splash window, fade-in and fade-out included.
    pub presentation: Duration,
    /// Length of each fade at the edges of the splash window.
    pub fade: Duration,
    /// Quiet period before the orchestrator accepts triggers again.
    pub cooldown: Duration,
}

impl Timings {
    pub const PRESENTATION: Duration = Duration::from_millis(2500);
    pub const FADE: Duration = Duration::from_millis(300);
    pub const COOLDOWN: Duration = Duration::from_millis(2000);

    /// Offset from splash start at which the fade-out begins.
    pub fn fade_out_at(&self) -> Duration {
        self.presentation.saturating_sub(self.fade)
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            presentation: Self::PRESENTATION,
            fade: Self::FADE,
            cooldown: Self::COOLDOWN,
        }
    }
}

/// Visible envelope of the splash panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplashPhase {
    /// Fading in from the start of the window, then held.
    FadingIn,
    /// Fading out over the last `fade` of the window.
    FadingOut,
}

/// Confirmation panel shown after a successful punch.
#[derive(Debug, Clone, PartialEq)]
pub struct Splash {
    pub log_type: LogType,
    pub employee_name: String,
    pub employee_id: String,
    /// The image captured for this attempt.
    pub selfie: String,
    pub phase: SplashPhase,
}

impl Splash {
    pub fn new(punch: &Punch, selfie: String) -> Self {
        Self {
            log_type: punch.log_type,
            employee_name: punch.employee_name.clone(),
            employee_id: punch.employee_id.clone(),
            selfie,
            phase: SplashPhase::FadingIn,
        }
    }

    pub fn title(&self) -> &'static str {
        self.log_type.headline()
    }
}

/// Blocking message surfaced to the user after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// State of one capture session. A new attempt starts only from `Idle`.
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorState {
    Idle,
    Capturing,
    AwaitingLocation,
    Submitting,
    Presenting { splash: Splash, expires_at: Instant },
    CooldownLocked { until: Instant },
}

impl OrchestratorState {
    pub fn kind(&self) -> StateKind {
        match self {
            OrchestratorState::Idle => StateKind::Idle,
            OrchestratorState::Capturing => StateKind::Capturing,
            OrchestratorState::AwaitingLocation => StateKind::AwaitingLocation,
            OrchestratorState::Submitting => StateKind::Submitting,
            OrchestratorState::Presenting { .. } => StateKind::Presenting,
            OrchestratorState::CooldownLocked { .. } => StateKind::CooldownLocked,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, OrchestratorState::Idle)
    }

    pub fn splash(&self) -> Option<&Splash> {
        match self {
            OrchestratorState::Presenting { splash, .. } => Some(splash),
            _ => None,
        }
    }
}

/// Payload-free tag of [`OrchestratorState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Idle,
    Capturing,
    AwaitingLocation,
    Submitting,
    Presenting,
    CooldownLocked,
}

impl StateKind {
    /// A capture, location or network call is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            StateKind::Capturing | StateKind::AwaitingLocation | StateKind::Submitting
        )
    }
}

/// What the UI renders. Published on every transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub state: StateKind,
    pub splash: Option<Splash>,
    pub alert: Option<Alert>,
    /// Accepted triggers so far.
    pub attempts: u64,
    /// Requests sent to the recognition service so far.
    pub submissions: u64,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            state: StateKind::Idle,
            splash: None,
            alert: None,
            attempts: 0,
            submissions: 0,
        }
    }
}
