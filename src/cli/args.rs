//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Face attendance kiosk: capture, recognize, punch in or out
#[derive(Parser, Debug)]
#[command(name = "face-punch")]
#[command(version, about = "Face attendance kiosk client", long_about = None)]
#[command(after_help = "EXAMPLES:
    face-punch attend                          Run the attendance kiosk
    face-punch attend --no-detector            Manual shutter only
    face-punch enroll --employee-id EMP01 --employee-name \"Asha Rao\"
    face-punch enroll --employee-id HR-EMP-00001  Name taken from the ERP roster
    face-punch employees                       List the ERP employee roster
    face-punch health                          Check the recognition service and ERP
    face-punch config init                     Write a default config file

ENVIRONMENT:
    FACE_PUNCH_API_URL    Recognition service URL (overrides [server] url)
    FACE_PUNCH_SITE_ID    Site identifier (overrides [session] site_id)
    FACE_PUNCH_ERP_KEY    ERP API key (overrides [session] api_key)
    FACE_PUNCH_ERP_SECRET ERP API secret (overrides [session] api_secret)
    RUST_LOG              Log filter, e.g. face_punch=debug")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the attendance kiosk
    Attend {
        /// Do not listen for the global space-bar shutter
        #[arg(long)]
        no_hotkey: bool,

        /// Ignore the configured face detector (manual triggers only)
        #[arg(long)]
        no_detector: bool,
    },
    /// Enroll a new employee from a batch of reference photos
    Enroll {
        /// Employee identifier on the attendance backend
        #[arg(long)]
        employee_id: String,

        /// Display name (default: the name on the ERP roster)
        #[arg(long)]
        employee_name: Option<String>,

        /// Admin PIN, when [enrollment] admin_pin is set (prompted if omitted)
        #[arg(long)]
        pin: Option<String>,

        /// Number of photos to collect (default: [enrollment] images)
        #[arg(long, value_parser = parse_image_count)]
        images: Option<usize>,
    },
    /// List the employees on the ERP backend
    Employees,
    /// Check that the recognition service is reachable and the ERP credentials work
    Health,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print the default config file path
    Path,
    /// Create default config file
    Init,
}

/// Parse and validate the enrollment photo count (1-20)
fn parse_image_count(s: &str) -> Result<usize, String> {
    let count: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if !(1..=20).contains(&count) {
        return Err(format!("Photo count must be between 1 and 20, got {}", count));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attend_defaults() {
        let args = Args::parse_from(["face-punch", "attend"]);
        match args.command {
            Command::Attend {
                no_hotkey,
                no_detector,
            } => {
                assert!(!no_hotkey);
                assert!(!no_detector);
            }
            other => panic!("Expected attend, got {:?}", other),
        }
        assert!(args.config.is_none());
    }

    #[test]
    fn test_enroll_arguments() {
        let args = Args::parse_from([
            "face-punch",
            "enroll",
            "--employee-id",
            "EMP01",
            "--employee-name",
            "Asha Rao",
            "--images",
            "3",
            "--pin",
            "2468",
        ]);
        match args.command {
            Command::Enroll {
                employee_id,
                employee_name,
                pin,
                images,
            } => {
                assert_eq!(employee_id, "EMP01");
                assert_eq!(employee_name.as_deref(), Some("Asha Rao"));
                assert_eq!(pin.as_deref(), Some("2468"));
                assert_eq!(images, Some(3));
            }
            other => panic!("Expected enroll, got {:?}", other),
        }
    }

    #[test]
    fn test_enroll_name_is_optional() {
        let args = Args::parse_from(["face-punch", "enroll", "--employee-id", "HR-EMP-00001"]);
        match args.command {
            Command::Enroll {
                employee_name, pin, ..
            } => {
                assert!(employee_name.is_none());
                assert!(pin.is_none());
            }
            other => panic!("Expected enroll, got {:?}", other),
        }
    }

    #[test]
    fn test_enroll_requires_employee_id() {
        assert!(Args::try_parse_from(["face-punch", "enroll", "--employee-name", "Asha"]).is_err());
    }

    #[test]
    fn test_employees_command() {
        let args = Args::parse_from(["face-punch", "employees"]);
        assert!(matches!(args.command, Command::Employees));
    }

    #[test]
    fn test_image_count_range() {
        assert_eq!(parse_image_count("5"), Ok(5));
        assert!(parse_image_count("0").is_err());
        assert!(parse_image_count("21").is_err());
        assert!(parse_image_count("five").is_err());
    }

    #[test]
    fn test_config_option_is_global() {
        let args = Args::parse_from(["face-punch", "health", "--config", "/tmp/kiosk.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/kiosk.toml")));

        let args = Args::parse_from(["face-punch", "-c", "/tmp/test.toml", "config", "show"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/test.toml")));
        assert!(matches!(
            args.command,
            Command::Config {
                action: ConfigAction::Show
            }
        ));
    }
}
