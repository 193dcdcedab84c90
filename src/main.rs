use clap::Parser;
use tracing_subscriber::EnvFilter;

use face_punch::cli::{self, Args, Command};
use face_punch::kiosk::AttendOptions;
use face_punch::signals::setup_ctrlc_handler;

/// Install the log subscriber. `RUST_LOG` overrides the default `info` level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: Args) -> Result<(), String> {
    let config_path = args.config.as_deref();
    match args.command {
        Command::Config { action } => cli::handle_config_action(action, config_path),
        Command::Health => cli::run_health(&cli::load_config(config_path)?),
        Command::Employees => cli::run_employees(&cli::load_config(config_path)?),
        Command::Attend {
            no_hotkey,
            no_detector,
        } => {
            let config = cli::load_config(config_path)?;
            setup_ctrlc_handler().map_err(|e| format!("Failed to set Ctrl+C handler: {}", e))?;
            cli::run_attend(
                &config,
                AttendOptions {
                    hotkey: !no_hotkey,
                    detector: !no_detector,
                },
            )
        }
        Command::Enroll {
            employee_id,
            employee_name,
            pin,
            images,
        } => {
            let config = cli::load_config(config_path)?;
            setup_ctrlc_handler().map_err(|e| format!("Failed to set Ctrl+C handler: {}", e))?;
            cli::run_enroll(
                &config,
                &employee_id,
                employee_name.as_deref(),
                pin.as_deref(),
                images,
            )
        }
    }
}

fn main() {
    // .env is optional; existing variables win.
    let _ = dotenv::dotenv();
    init_logging();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
