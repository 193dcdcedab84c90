//! Kiosk geolocation.
//!
//! A [`LocationProvider`] yields a best-effort [`GeoFix`] or `None` when the
//! fix is unavailable or location access is turned off. Failures are logged
//! here and never propagate.

use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

use crate::config::{LocationConfig, LocationMode};
use crate::model::GeoFix;

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn locate(&self) -> Option<GeoFix>;
}

/// Fixed kiosk coordinates.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation {
    fix: GeoFix,
}

impl FixedLocation {
    pub fn new(fix: GeoFix) -> Self {
        Self { fix }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn locate(&self) -> Option<GeoFix> {
        Some(self.fix)
    }
}

/// Location access is off; every lookup reports absence.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeniedLocation;

#[async_trait]
impl LocationProvider for DeniedLocation {
    async fn locate(&self) -> Option<GeoFix> {
        log::warn!("GPS error: location access is disabled");
        None
    }
}

/// Runs an external locator and parses its stdout.
///
/// Accepted output: `lat,lon` on the first line, or a JSON object with
/// `latitude` and `longitude` fields. A non-zero exit is treated as a
/// permission or fix failure.
#[derive(Debug, Clone)]
pub struct CommandLocation {
    program: String,
    args: Vec<String>,
}

impl CommandLocation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl LocationProvider for CommandLocation {
    async fn locate(&self) -> Option<GeoFix> {
        let output = match Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                log::warn!("GPS error: failed to run '{}': {}", self.program, e);
                return None;
            }
        };

        if !output.status.success() {
            log::warn!(
                "GPS error: '{}' exited with {:?}: {}",
                self.program,
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return None;
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let fix = parse_fix(&text);
        if fix.is_none() {
            log::warn!("GPS error: unrecognised locator output: {:?}", text.trim());
        }
        fix
    }
}

#[derive(Deserialize)]
struct JsonFix {
    latitude: f64,
    longitude: f64,
}

/// Parse locator output into a fix.
pub fn parse_fix(text: &str) -> Option<GeoFix> {
    let trimmed = text.trim();
    if trimmed.starts_with('{') {
        let json: JsonFix = serde_json::from_str(trimmed).ok()?;
        return GeoFix::new(json.latitude, json.longitude);
    }

    let line = trimmed.lines().next()?;
    let (lat, lon) = line.split_once(',')?;
    let latitude = lat.trim().parse().ok()?;
    let longitude = lon.trim().parse().ok()?;
    GeoFix::new(latitude, longitude)
}

/// Build the provider selected by configuration.
pub fn from_config(config: &LocationConfig) -> Arc<dyn LocationProvider> {
    match config.mode {
        LocationMode::Fixed => {
            match config
                .latitude
                .zip(config.longitude)
                .and_then(|(lat, lon)| GeoFix::new(lat, lon))
            {
                Some(fix) => Arc::new(FixedLocation::new(fix)),
                None => {
                    log::warn!("Fixed location is missing or out of range; location disabled");
                    Arc::new(DeniedLocation)
                }
            }
        }
        LocationMode::Command => match &config.command {
            Some(program) => Arc::new(CommandLocation::new(program.clone(), config.args.clone())),
            None => Arc::new(DeniedLocation),
        },
        LocationMode::Disabled => Arc::new(DeniedLocation),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_comma_pair() {
        assert_eq!(parse_fix("12.9, 77.6\n"), GeoFix::new(12.9, 77.6));
    }

    #[test]
    fn test_parse_json_object() {
        let fix = parse_fix(r#"{"latitude": 12.9, "longitude": 77.6, "accuracy": 20}"#);
        assert_eq!(fix, GeoFix::new(12.9, 77.6));
    }

    #[test]
    fn test_parse_rejects_garbage_and_range() {
        assert_eq!(parse_fix(""), None);
        assert_eq!(parse_fix("permission denied"), None);
        assert_eq!(parse_fix("123.0,10.0"), None);
        assert_eq!(parse_fix("{\"latitude\": 1.0}"), None);
    }

    #[tokio::test]
    async fn test_fixed_and_denied() {
        let fix = GeoFix::new(1.5, 2.5).unwrap();
        assert_eq!(FixedLocation::new(fix).locate().await, Some(fix));
        assert_eq!(DeniedLocation.locate().await, None);
    }

    #[tokio::test]
    async fn test_missing_locator_is_absence() {
        let provider = CommandLocation::new("locator-definitely-not-installed-xyz", vec![]);
        assert_eq!(provider.locate().await, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_output_parsed() {
        let provider = CommandLocation::new(
            "sh",
            vec!["-c".to_string(), "echo 12.9,77.6".to_string()],
        );
        assert_eq!(provider.locate().await, GeoFix::new(12.9, 77.6));

        let failing = CommandLocation::new("sh", vec!["-c".to_string(), "exit 3".to_string()]);
        assert_eq!(failing.locate().await, None);
    }

    #[tokio::test]
    async fn test_from_config_disabled_by_default() {
        let provider = from_config(&LocationConfig::default());
        assert_eq!(provider.locate().await, None);
    }
}
