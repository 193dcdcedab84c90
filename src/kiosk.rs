//! Interactive attendance and enrollment sessions.
//!
//! Wires the configured leaves into an orchestrator and pumps trigger
//! sources, console commands and render snapshots until the session ends.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::capture::{FfmpegCamera, MediaCapture, WebcamStill};
use crate::config::{Config, SITE_ID_ENV};
use crate::erp::{ErpClient, ErpError};
use crate::feedback;
use crate::hotkeys::HotkeyManager;
use crate::location;
use crate::model::{CaptureTrigger, EnrollOutcome, EnrollmentBatch};
use crate::orchestrator::{
    CaptureNextOutcome, CaptureOrchestrator, EnrollmentOrchestrator, EnrollmentPhase, StateKind,
    SubmitOutcome,
};
use crate::recognition::RecognitionClient;
use crate::render;
use crate::session::{local_device_id, SessionContext};
use crate::signals;
use crate::triggers::{ConsoleCommand, ConsoleInput, DetectorFeed};

/// Options for [`run_attendance`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AttendOptions {
    pub hotkey: bool,
    pub detector: bool,
}

/// Resolve the session context from config.
pub fn session_from_config(config: &Config) -> Result<SessionContext, String> {
    let site_id = config.site_id().ok_or_else(|| {
        format!(
            "No site configured. Set [session] site_id or erp_url, or {}.",
            SITE_ID_ENV
        )
    })?;
    let device_id = config
        .session
        .device_id
        .clone()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(local_device_id);
    Ok(SessionContext::new(site_id, device_id))
}

/// Build the recognition client from `[server]`.
pub fn client_from_config(config: &Config) -> Result<RecognitionClient, String> {
    RecognitionClient::with_timeout(
        config.server.url.clone(),
        Duration::from_secs(config.server.timeout_secs),
    )
    .map_err(|e| e.to_string())
}

/// Build the ERP client from `[session]`. `None` when no `erp_url` is set.
pub fn erp_from_config(config: &Config) -> Result<Option<ErpClient>, String> {
    ErpClient::from_config(config)
        .transpose()
        .map_err(|e| e.to_string())
}

pub fn describe_erp_error(error: &ErpError) -> String {
    if error.is_unauthorized() {
        format!("ERP rejected the API key and secret ({})", error)
    } else {
        error.to_string()
    }
}

/// Resolve the display name to enroll under.
///
/// With an ERP backend the id must be on the employee roster, and the roster
/// name fills in a missing `employee_name`. Without one the name is required.
pub async fn resolve_employee(
    erp: Option<&ErpClient>,
    employee_id: &str,
    employee_name: Option<&str>,
) -> Result<String, String> {
    let given = employee_name.map(str::trim).filter(|n| !n.is_empty());
    let Some(erp) = erp else {
        return given.map(str::to_string).ok_or_else(|| {
            "--employee-name is required when no ERP backend is configured".to_string()
        });
    };

    let employee = erp
        .find_employee(employee_id)
        .await
        .map_err(|e| describe_erp_error(&e))?;
    Ok(given.unwrap_or(employee.display_name()).to_string())
}

/// Gate enrollment behind `[enrollment] admin_pin`, when one is set.
pub fn check_admin_pin(expected: Option<&str>, entered: Option<&str>) -> Result<(), String> {
    let Some(expected) = expected else {
        return Ok(());
    };
    if entered.map(str::trim) == Some(expected.trim()) {
        Ok(())
    } else {
        log::warn!("Enrollment refused: incorrect admin PIN");
        Err("Incorrect PIN".to_string())
    }
}

fn camera_from_config(config: &Config) -> Arc<dyn MediaCapture> {
    Arc::new(FfmpegCamera::new(WebcamStill::from(&config.camera)))
}

/// Run the attendance kiosk until `/quit`, EOF or Ctrl+C.
pub async fn run_attendance(config: &Config, options: AttendOptions) -> Result<(), String> {
    let session = session_from_config(config)?;
    let recognizer = Arc::new(client_from_config(config)?);
    log::info!("Recognition service: {}", recognizer.base_url());

    let orchestrator = CaptureOrchestrator::new(
        session,
        camera_from_config(config),
        location::from_config(&config.location),
        recognizer,
        feedback::from_config(&config.feedback),
        config.timing.to_timings(),
    );
    let timings = orchestrator.timings();
    log::info!(
        "Attendance session for site {} on device {} (splash {:?}, cooldown {:?})",
        orchestrator.session().site_id(),
        orchestrator.session().device_id(),
        timings.presentation,
        timings.cooldown
    );

    let (trigger_tx, mut trigger_rx) = mpsc::unbounded_channel();
    let (console_tx, mut console_rx) = mpsc::unbounded_channel();

    let mut hotkeys = HotkeyManager::new(trigger_tx.clone());
    if options.hotkey {
        if let Err(e) = hotkeys.start() {
            log::warn!("Hotkey unavailable: {}", e);
        }
    }
    let detector = if options.detector {
        DetectorFeed::from_config(&config.detection).map(|feed| feed.spawn(trigger_tx.clone()))
    } else {
        None
    };
    if detector.is_none() {
        log::info!("No face detector running; manual triggers only");
    }

    println!("{}", ConsoleInput::help_text());
    println!("{}", render::status_line(StateKind::Idle));
    ConsoleInput::spawn_listener(console_tx);

    let mut snapshots = orchestrator.subscribe();
    loop {
        tokio::select! {
            Some(trigger) = trigger_rx.recv() => {
                orchestrator.trigger(trigger);
            }
            command = console_rx.recv() => match command {
                Some(ConsoleCommand::Shutter) => {
                    if orchestrator.trigger(CaptureTrigger::Manual).is_none() {
                        println!("{}", render::trigger_refused(orchestrator.state().kind()));
                    }
                }
                Some(ConsoleCommand::Dismiss) => orchestrator.dismiss_alert(),
                Some(ConsoleCommand::Status) => {
                    let snapshot = orchestrator.snapshot();
                    println!(
                        "State: {:?}, attempts: {}, submissions: {}",
                        snapshot.state, snapshot.attempts, snapshot.submissions
                    );
                }
                Some(ConsoleCommand::Submit) => println!("Nothing to submit in attendance mode."),
                Some(ConsoleCommand::Help) => println!("{}", ConsoleInput::help_text()),
                Some(ConsoleCommand::Quit) | None => break,
            },
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if let Some(text) = render::snapshot(&snapshot) {
                    println!("{}", text);
                }
            }
            _ = signals::shutdown_requested() => break,
        }
    }

    hotkeys.stop();
    if let Some(task) = detector {
        task.abort();
    }
    let snapshot = orchestrator.snapshot();
    log::info!(
        "Attendance session ended after {} attempts ({} submitted)",
        snapshot.attempts,
        snapshot.submissions
    );
    Ok(())
}

/// Run an enrollment until the batch is registered, or the user quits.
///
/// Returns the server acknowledgement on success.
pub async fn run_enrollment(
    config: &Config,
    employee_id: &str,
    employee_name: &str,
    images: usize,
) -> Result<EnrollOutcome, String> {
    let session = session_from_config(config)?;
    let batch = EnrollmentBatch::new(session.site_id(), employee_id, employee_name, images)
        .map_err(|e| e.to_string())?;
    let recognizer = Arc::new(client_from_config(config)?);
    let orchestrator = EnrollmentOrchestrator::new(batch, camera_from_config(config), recognizer);

    println!(
        "Enrolling {} ({}): {} photos. Press Enter for each photo, /quit to abort.",
        employee_name, employee_id, images
    );
    let (console_tx, mut console_rx) = mpsc::unbounded_channel();
    ConsoleInput::spawn_listener(console_tx);

    loop {
        let command = tokio::select! {
            command = console_rx.recv() => command,
            _ = signals::shutdown_requested() => None,
        };

        let submitted = match command {
            Some(ConsoleCommand::Shutter) => match orchestrator.capture_next().await {
                CaptureNextOutcome::Appended { .. } => {
                    println!("{}", render::enrollment(&orchestrator.progress()));
                    None
                }
                CaptureNextOutcome::Submitted(outcome) => Some(outcome),
                CaptureNextOutcome::CaptureUnavailable => {
                    println!("Camera returned no image, try again.");
                    None
                }
                CaptureNextOutcome::Ignored => {
                    println!("All photos captured. Type /submit to register.");
                    None
                }
            },
            Some(ConsoleCommand::Submit) => Some(orchestrator.submit().await),
            Some(ConsoleCommand::Status) => {
                println!("{}", render::enrollment(&orchestrator.progress()));
                None
            }
            Some(ConsoleCommand::Dismiss) => None,
            Some(ConsoleCommand::Help) => {
                println!("{}", ConsoleInput::help_text());
                None
            }
            Some(ConsoleCommand::Quit) | None => {
                return Err(format!(
                    "Enrollment aborted at {}",
                    orchestrator.progress().counter()
                ));
            }
        };

        match submitted {
            Some(SubmitOutcome::Completed(outcome)) => {
                println!("{}", render::enrollment(&orchestrator.progress()));
                return Ok(outcome);
            }
            Some(SubmitOutcome::Failed(_)) => {
                println!("{}", render::enrollment(&orchestrator.progress()));
            }
            Some(SubmitOutcome::Ignored) => {
                if orchestrator.progress().phase != EnrollmentPhase::Completed {
                    println!(
                        "Capture all {} photos before submitting.",
                        orchestrator.progress().max
                    );
                }
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_requires_site() {
        let config = Config::default();
        assert!(session_from_config(&config).is_err());
    }

    #[test]
    fn test_session_derives_site_from_erp_url() {
        let config = Config::from_toml(
            r#"
[session]
erp_url = "https://erp.example.com/"
device_id = "KIOSK-LOBBY"
"#,
        )
        .unwrap();
        let session = session_from_config(&config).unwrap();
        assert_eq!(session.site_id(), "erp.example.com");
        assert_eq!(session.device_id(), "KIOSK-LOBBY");
    }

    #[test]
    fn test_session_falls_back_to_host_device_id() {
        let config = Config::from_toml("[session]\nsite_id = \"hq\"\n").unwrap();
        let session = session_from_config(&config).unwrap();
        assert!(session.device_id().starts_with("KIOSK-"));
    }

    #[test]
    fn test_admin_pin_gate() {
        assert!(check_admin_pin(None, None).is_ok());
        assert!(check_admin_pin(Some("2468"), Some("2468")).is_ok());
        assert!(check_admin_pin(Some("2468"), Some(" 2468\n")).is_ok());
        assert_eq!(
            check_admin_pin(Some("2468"), Some("1234")),
            Err("Incorrect PIN".to_string())
        );
        assert!(check_admin_pin(Some("2468"), None).is_err());
    }

    #[test]
    fn test_erp_client_is_optional() {
        assert!(erp_from_config(&Config::default()).unwrap().is_none());

        // A backend URL without credentials is a configuration error.
        let config =
            Config::from_toml("[session]\nerp_url = \"https://erp.example.com\"\n").unwrap();
        assert!(erp_from_config(&config).unwrap_err().contains("api_key"));
    }

    #[tokio::test]
    async fn test_name_required_without_erp() {
        assert_eq!(
            resolve_employee(None, "EMP01", Some(" Asha Rao ")).await,
            Ok("Asha Rao".to_string())
        );
        assert!(resolve_employee(None, "EMP01", None).await.is_err());
        assert!(resolve_employee(None, "EMP01", Some("  ")).await.is_err());
    }

    #[test]
    fn test_client_rejects_bad_url() {
        let mut config = Config::default();
        config.server.url = "not a url".to_string();
        assert!(client_from_config(&config).is_err());
    }
}
