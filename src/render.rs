//! Terminal rendering of orchestrator snapshots.

use crate::orchestrator::{
    Alert, EnrollmentPhase, EnrollmentProgress, Snapshot, Splash, SplashPhase, StateKind,
};

/// Status line for a state without splash or alert.
pub fn status_line(state: StateKind) -> &'static str {
    match state {
        StateKind::Idle => "Ready. Look at the camera or press the shutter.",
        StateKind::Capturing => "Capturing...",
        StateKind::AwaitingLocation => "Getting location...",
        StateKind::Submitting => "Recognizing...",
        StateKind::Presenting => "",
        StateKind::CooldownLocked => "Please wait...",
    }
}

/// Why a manual shutter press was not taken.
pub fn trigger_refused(state: StateKind) -> &'static str {
    if state.is_busy() {
        "Busy, please wait."
    } else {
        match state {
            StateKind::Presenting => "Showing the last punch, please wait.",
            _ => "Please wait...",
        }
    }
}

/// The confirmation panel.
pub fn splash(splash: &Splash) -> String {
    match splash.phase {
        SplashPhase::FadingIn => format!(
            "\n  ✔ {}\n    {}\n    {}\n",
            splash.title(),
            splash.employee_name,
            splash.employee_id
        ),
        // Shown once as the panel goes away.
        SplashPhase::FadingOut => String::new(),
    }
}

pub fn alert(alert: &Alert) -> String {
    format!("\n  ✖ {}\n    {}\n    (/dismiss to clear)\n", alert.title, alert.message)
}

/// Render a snapshot. Returns `None` when nothing needs to be printed.
pub fn snapshot(snapshot: &Snapshot) -> Option<String> {
    if let Some(panel) = &snapshot.splash {
        let text = splash(panel);
        return (!text.is_empty()).then_some(text);
    }
    let status = status_line(snapshot.state);
    match (&snapshot.alert, snapshot.state) {
        // The alert is printed once, when it is raised.
        (Some(raised), StateKind::CooldownLocked) => Some(format!("{}{}", alert(raised), status)),
        _ if status.is_empty() => None,
        _ => Some(status.to_string()),
    }
}

/// Progress line for an enrollment.
pub fn enrollment(progress: &EnrollmentProgress) -> String {
    match &progress.phase {
        EnrollmentPhase::Collecting => format!(
            "Photo {} captured. Press Enter for the next one.",
            progress.counter()
        ),
        EnrollmentPhase::Capturing => format!("Capturing photo {}...", progress.current + 1),
        EnrollmentPhase::Submitting => format!("Registering {} photos...", progress.current),
        EnrollmentPhase::Completed => "✔ Registration complete.".to_string(),
        EnrollmentPhase::Failed(message) => format!(
            "✖ Registration failed: {}\n  Type /submit to try again.",
            message
        ),
    }
}
