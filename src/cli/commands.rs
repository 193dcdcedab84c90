//! Subcommand handlers.

use std::io::{self, BufRead, Write};
use std::path::Path;

use super::args::ConfigAction;
use crate::config::{default_path as get_config_path, Config, LocationMode};
use crate::kiosk::{self, AttendOptions};

const DEFAULT_CONFIG: &str = r#"# face-punch configuration

[server]
# Recognition service (FACE_PUNCH_API_URL overrides this)
url = "http://localhost:8000"
timeout_secs = 30

[session]
# Site identifier, or derive it from the attendance backend URL
# site_id = "erp.example.com"
# erp_url = "https://erp.example.com"
# ERPNext API credentials for the roster and credential check
# (FACE_PUNCH_ERP_KEY / FACE_PUNCH_ERP_SECRET override these)
# api_key = ""
# api_secret = ""
# Device id (default: derived from the host name)
# device_id = "KIOSK-LOBBY"

[camera]
# device = "/dev/video0"
# input_format = "v4l2"
mirror = true
# JPEG quality 0.0-1.0
quality = 0.7

[location]
# fixed, command or disabled
mode = "disabled"
# latitude = 12.9716
# longitude = 77.5946
# command = "locate-kiosk"

[feedback]
enabled = true
# player = "paplay"
# punch_in = "/usr/share/sounds/punch-in.wav"
# punch_out = "/usr/share/sounds/punch-out.wav"

[timing]
presentation_ms = 2500
fade_ms = 300
cooldown_ms = 2000

[enrollment]
images = 5
# PIN asked for before an enrollment starts
# admin_pin = "2468"

[detection]
# Face detector printing one face count per line
# command = "detect-faces"
# args = ["--camera", "0"]
"#;

/// Load config from `path` (or the default location) with env overrides.
pub fn load_config(path: Option<&Path>) -> Result<Config, String> {
    if let Some(path) = path {
        if !path.exists() {
            return Err(format!("Config file not found: {}", path.display()));
        }
    }
    let mut config = Config::load(path).map_err(|e| e.to_string())?;
    config.apply_env();
    Ok(config)
}

fn runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Runtime::new().map_err(|e| format!("Failed to create async runtime: {}", e))
}

/// Run the attendance kiosk.
pub fn run_attend(config: &Config, options: AttendOptions) -> Result<(), String> {
    runtime()?.block_on(kiosk::run_attendance(config, options))
}

fn prompt_pin() -> Result<String, String> {
    print!("Admin PIN: ");
    io::stdout()
        .flush()
        .map_err(|e| format!("Failed to write prompt: {}", e))?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| format!("Failed to read PIN: {}", e))?;
    Ok(line.trim().to_string())
}

/// Enroll one employee and print the server acknowledgement.
pub fn run_enroll(
    config: &Config,
    employee_id: &str,
    employee_name: Option<&str>,
    pin: Option<&str>,
    images: Option<usize>,
) -> Result<(), String> {
    let expected_pin = config.enrollment.admin_pin.as_deref();
    let entered = match (expected_pin, pin) {
        (Some(_), None) => Some(prompt_pin()?),
        (_, pin) => pin.map(str::to_string),
    };
    kiosk::check_admin_pin(expected_pin, entered.as_deref())?;

    let runtime = runtime()?;
    let erp = kiosk::erp_from_config(config)?;
    let employee_name =
        runtime.block_on(kiosk::resolve_employee(erp.as_ref(), employee_id, employee_name))?;

    let images = images.unwrap_or(config.enrollment.images);
    let outcome = runtime.block_on(kiosk::run_enrollment(
        config,
        employee_id,
        &employee_name,
        images,
    ))?;

    println!("Registered {} ({}).", employee_name, employee_id);
    if let (Some(saved), Some(failed)) = (outcome.saved, outcome.failed) {
        println!("  Photos saved: {}, rejected: {}", saved, failed);
    }
    Ok(())
}

/// Check the recognition service.
pub fn run_health(config: &Config) -> Result<(), String> {
    let client = kiosk::client_from_config(config)?;
    let health = runtime()?
        .block_on(client.health())
        .map_err(|e| format!("Recognition service unreachable at {}: {}", client.base_url(), e))?;

    println!("Recognition service: {}", client.base_url());
    println!("  Status: {}", health.status);
    if let Some(model) = &health.model {
        println!("  Model: {}", model);
    }
    if !health.is_ok() {
        return Err(format!("Service reported status '{}'", health.status));
    }

    if let Some(erp) = kiosk::erp_from_config(config)? {
        let user = runtime()?
            .block_on(erp.logged_user())
            .map_err(|e| {
                format!(
                    "ERP check failed at {}: {}",
                    erp.base_url(),
                    kiosk::describe_erp_error(&e)
                )
            })?;
        println!("ERP backend: {}", erp.base_url());
        println!("  Logged in as: {}", user);
    }
    Ok(())
}

/// List the ERP employee roster.
pub fn run_employees(config: &Config) -> Result<(), String> {
    let erp = kiosk::erp_from_config(config)?.ok_or_else(|| {
        "No ERP backend configured. Set [session] erp_url, api_key and api_secret.".to_string()
    })?;
    let employees = runtime()?
        .block_on(erp.employees())
        .map_err(|e| kiosk::describe_erp_error(&e))?;

    if employees.is_empty() {
        println!("No employees found on {}.", erp.base_url());
        return Ok(());
    }
    println!("{} employees on {}:", employees.len(), erp.base_url());
    for employee in &employees {
        println!("  {:<20} {}", employee.id, employee.display_name());
    }
    Ok(())
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction, path: Option<&Path>) -> Result<(), String> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
    match action {
        ConfigAction::Path => {
            println!("{}", config_path.display());
        }
        ConfigAction::Show => {
            let config = load_config(path)?;
            print_config(&config);
            println!();
            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
        }
        ConfigAction::Init => {
            if config_path.exists() {
                return Err(format!(
                    "Config file already exists: {}\nUse 'face-punch config show' to view current settings.",
                    config_path.display()
                ));
            }
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| format!("Error creating config directory: {}", e))?;
            }
            std::fs::write(&config_path, DEFAULT_CONFIG)
                .map_err(|e| format!("Error writing config file: {}", e))?;
            println!("Created config file: {}", config_path.display());
        }
    }
    Ok(())
}

fn print_config(config: &Config) {
    let unset = || "(unset)".to_string();
    println!("Current configuration:");
    println!("  Server: {} (timeout {}s)", config.server.url, config.server.timeout_secs);
    println!("  Site: {}", config.site_id().unwrap_or_else(unset));
    println!(
        "  ERP: {} (credentials: {})",
        config.session.erp_url.clone().unwrap_or_else(unset),
        if config.session.api_key.is_some() && config.session.api_secret.is_some() {
            "set"
        } else {
            "unset"
        }
    );
    println!(
        "  Device: {}",
        config
            .session
            .device_id
            .clone()
            .unwrap_or_else(crate::session::local_device_id)
    );
    println!(
        "  Camera: {} via {} (mirror: {}, quality: {})",
        config.camera.device, config.camera.input_format, config.camera.mirror, config.camera.quality
    );
    let location = match config.location.mode {
        LocationMode::Fixed => format!(
            "fixed {:?},{:?}",
            config.location.latitude, config.location.longitude
        ),
        LocationMode::Command => format!(
            "command {}",
            config.location.command.clone().unwrap_or_else(unset)
        ),
        LocationMode::Disabled => "disabled".to_string(),
    };
    println!("  Location: {}", location);
    println!(
        "  Feedback: {}",
        if config.feedback.enabled { "on" } else { "off" }
    );
    println!(
        "  Timing: presentation {}ms, fade {}ms, cooldown {}ms",
        config.timing.presentation_ms, config.timing.fade_ms, config.timing.cooldown_ms
    );
    println!(
        "  Enrollment photos: {} (admin PIN: {})",
        config.enrollment.images,
        if config.enrollment.admin_pin.is_some() { "on" } else { "off" }
    );
    println!(
        "  Detector: {}",
        config.detection.command.clone().unwrap_or_else(unset)
    );
}
