//! Configuration file handling for face-punch.
//!
//! Loads configuration from `~/.config/face-punch/config.toml` or a custom path.
//! A handful of settings can be overridden from the environment (and `.env`).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::DEFAULT_ENROLLMENT_SIZE;
use crate::orchestrator::Timings;

/// Environment override for `server.url`.
pub const API_URL_ENV: &str = "FACE_PUNCH_API_URL";

/// Environment override for `session.site_id`.
pub const SITE_ID_ENV: &str = "FACE_PUNCH_SITE_ID";

/// Environment overrides for the ERPNext API credentials.
pub const ERP_KEY_ENV: &str = "FACE_PUNCH_ERP_KEY";
pub const ERP_SECRET_ENV: &str = "FACE_PUNCH_ERP_SECRET";

/// Configuration file structure for face-punch.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub enrollment: EnrollmentConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_server_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SessionConfig {
    /// Explicit site id. Takes precedence over `erp_url`.
    pub site_id: Option<String>,
    /// Attendance backend URL the site id is derived from.
    pub erp_url: Option<String>,
    /// Explicit device id. Derived from the host name when absent.
    pub device_id: Option<String>,
    /// ERPNext API key, used for the credential check and employee roster.
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    #[serde(default = "default_camera_device")]
    pub device: String,
    #[serde(default = "default_input_format")]
    pub input_format: String,
    #[serde(default = "default_true")]
    pub mirror: bool,
    /// JPEG quality between 0.0 and 1.0.
    #[serde(default = "default_quality")]
    pub quality: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: default_camera_device(),
            input_format: default_input_format(),
            mirror: true,
            quality: default_quality(),
        }
    }
}

/// How the kiosk obtains its coordinates.
#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LocationMode {
    /// Fixed kiosk coordinates from this file.
    Fixed,
    /// Run `command` and parse its output.
    Command,
    /// Location is unavailable; every attempt reports a GPS error.
    #[default]
    Disabled,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct LocationConfig {
    #[serde(default)]
    pub mode: LocationMode,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedbackConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Audio player program; platform default when absent.
    pub player: Option<String>,
    pub punch_in: Option<PathBuf>,
    pub punch_out: Option<PathBuf>,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            player: None,
            punch_in: None,
            punch_out: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    #[serde(default = "default_presentation_ms")]
    pub presentation_ms: u64,
    #[serde(default = "default_fade_ms")]
    pub fade_ms: u64,
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            presentation_ms: default_presentation_ms(),
            fade_ms: default_fade_ms(),
            cooldown_ms: default_cooldown_ms(),
        }
    }
}

impl TimingConfig {
    pub fn to_timings(&self) -> Timings {
        Timings {
            presentation: Duration::from_millis(self.presentation_ms),
            fade: Duration::from_millis(self.fade_ms),
            cooldown: Duration::from_millis(self.cooldown_ms),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EnrollmentConfig {
    #[serde(default = "default_enrollment_images")]
    pub images: usize,
    /// PIN required before an enrollment starts. No gate when absent.
    pub admin_pin: Option<String>,
}

impl Default for EnrollmentConfig {
    fn default() -> Self {
        Self {
            images: default_enrollment_images(),
            admin_pin: None,
        }
    }
}

/// External face detector whose output drives automatic triggers.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct DetectionConfig {
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn default_true() -> bool {
    true
}

fn default_server_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_quality() -> f32 {
    0.7
}

fn default_presentation_ms() -> u64 {
    2500
}

fn default_fade_ms() -> u64 {
    300
}

fn default_cooldown_ms() -> u64 {
    2000
}

fn default_enrollment_images() -> usize {
    DEFAULT_ENROLLMENT_SIZE
}

#[cfg(target_os = "macos")]
fn default_camera_device() -> String {
    "0".to_string()
}

#[cfg(not(target_os = "macos"))]
fn default_camera_device() -> String {
    "/dev/video0".to_string()
}

#[cfg(target_os = "macos")]
fn default_input_format() -> String {
    "avfoundation".to_string()
}

#[cfg(not(target_os = "macos"))]
fn default_input_format() -> String {
    "v4l2".to_string()
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed or is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        let config = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
                path: path.clone(),
                source: e,
            })?;
            Self::from_toml(&content).map_err(|e| match e {
                ConfigError::ParseError { source, .. } => ConfigError::ParseError {
                    path: path.clone(),
                    source,
                },
                other => other,
            })?
        } else {
            Config::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text without touching the filesystem.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            source: e,
        })
    }

    /// Apply environment overrides (`FACE_PUNCH_*`). Blank values are ignored.
    pub fn apply_env(&mut self) {
        if let Some(url) = env_value(API_URL_ENV) {
            self.server.url = url;
        }
        if let Some(site) = env_value(SITE_ID_ENV) {
            self.session.site_id = Some(site);
        }
        if let Some(key) = env_value(ERP_KEY_ENV) {
            self.session.api_key = Some(key);
        }
        if let Some(secret) = env_value(ERP_SECRET_ENV) {
            self.session.api_secret = Some(secret);
        }
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.camera.quality) {
            return Err(ConfigError::invalid(format!(
                "camera.quality must be between 0.0 and 1.0, got {}",
                self.camera.quality
            )));
        }
        if self.timing.fade_ms * 2 > self.timing.presentation_ms {
            return Err(ConfigError::invalid(format!(
                "timing.fade_ms ({}) leaves no room for fade-in and fade-out within timing.presentation_ms ({})",
                self.timing.fade_ms, self.timing.presentation_ms
            )));
        }
        if self.enrollment.images == 0 {
            return Err(ConfigError::invalid("enrollment.images must be at least 1"));
        }
        if let Some(pin) = &self.enrollment.admin_pin {
            if pin.trim().is_empty() {
                return Err(ConfigError::invalid("enrollment.admin_pin must not be empty"));
            }
        }
        match self.location.mode {
            LocationMode::Fixed => {
                if self.location.latitude.is_none() || self.location.longitude.is_none() {
                    return Err(ConfigError::invalid(
                        "location.latitude and location.longitude are required in fixed mode",
                    ));
                }
            }
            LocationMode::Command => {
                if self.location.command.is_none() {
                    return Err(ConfigError::invalid(
                        "location.command is required in command mode",
                    ));
                }
            }
            LocationMode::Disabled => {}
        }
        Ok(())
    }

    /// Resolve the site id: explicit value first, then the ERP URL.
    pub fn site_id(&self) -> Option<String> {
        self.session
            .site_id
            .clone()
            .or_else(|| self.session.erp_url.as_deref().map(crate::session::site_id_from_url))
            .filter(|s| !s.is_empty())
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    Invalid {
        message: String,
    },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Invalid { message } => write!(f, "Invalid configuration: {}", message),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::Invalid { .. } => None,
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("face-punch").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/face-punch/config.toml")
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_contract_timings() {
        let config = Config::default();
        let timings = config.timing.to_timings();
        assert_eq!(timings.presentation, Duration::from_millis(2500));
        assert_eq!(timings.fade, Duration::from_millis(300));
        assert_eq!(timings.cooldown, Duration::from_millis(2000));
        assert_eq!(config.enrollment.images, 5);
        assert!(config.camera.mirror);
        assert!((config.camera.quality - 0.7).abs() < f32::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fade_longer_than_window_rejected() {
        let config = Config::from_toml(
            "[timing]\npresentation_ms = 500\nfade_ms = 300\n",
        )
        .unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timing.fade_ms"));
    }

    #[test]
    fn test_fixed_mode_requires_coordinates() {
        let config = Config::from_toml("[location]\nmode = \"fixed\"\nlatitude = 1.0\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_site_id_prefers_explicit_value() {
        let config = Config::from_toml(
            "[session]\nsite_id = \"hq\"\nerp_url = \"https://erp.example.com/\"\n",
        )
        .unwrap();
        assert_eq!(config.site_id().as_deref(), Some("hq"));

        let derived = Config::from_toml("[session]\nerp_url = \"https://erp.example.com/\"\n").unwrap();
        assert_eq!(derived.site_id().as_deref(), Some("erp.example.com"));

        assert_eq!(Config::default().site_id(), None);
    }

    #[test]
    fn test_parse_error_display() {
        let err = Config::from_toml("[server\nurl = 1").unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
