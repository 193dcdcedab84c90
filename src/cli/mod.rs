//! Command-line interface definitions and subcommand handlers.

mod args;
mod commands;

pub use args::{Args, Command, ConfigAction};
pub use commands::{
    handle_config_action, load_config, run_attend, run_employees, run_enroll, run_health,
};
