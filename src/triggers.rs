//! Trigger sources: console input and the face-detector feed.
//!
//! The global hotkey lives in [`crate::hotkeys`]. Every source only produces
//! events; deciding whether a trigger is accepted is the orchestrator's job.

use std::io::{self, BufRead, Write};
use std::process::Stdio;
use std::thread;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::config::DetectionConfig;
use crate::model::CaptureTrigger;

/// Commands typed on the console while a session runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Empty line: press the shutter.
    Shutter,
    /// Acknowledge the current alert.
    Dismiss,
    /// Resubmit a sealed enrollment batch.
    Submit,
    /// Print the current state.
    Status,
    Help,
    Quit,
}

/// Reads console lines on a background thread.
pub struct ConsoleInput;

impl ConsoleInput {
    /// Start reading stdin, sending parsed commands through `tx`.
    ///
    /// The thread ends on EOF, on a read error, or once the receiver is gone.
    pub fn spawn_listener(tx: UnboundedSender<ConsoleCommand>) {
        thread::spawn(move || {
            let stdin = io::stdin();
            let handle = stdin.lock();

            Self::print_prompt();
            for line in handle.lines() {
                let Ok(input) = line else { break };
                if let Some(cmd) = Self::parse_input(&input) {
                    if tx.send(cmd).is_err() {
                        break;
                    }
                }
                Self::print_prompt();
            }
            // EOF behaves like /quit so the session can wind down.
            let _ = tx.send(ConsoleCommand::Quit);
        });
    }

    /// Parse one line of input.
    ///
    /// An empty line is the shutter. Slash commands are matched case
    /// insensitively; anything else is reported and ignored.
    pub fn parse_input(input: &str) -> Option<ConsoleCommand> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Some(ConsoleCommand::Shutter);
        }

        match trimmed.to_lowercase().as_str() {
            "/dismiss" | "/ok" => Some(ConsoleCommand::Dismiss),
            "/submit" => Some(ConsoleCommand::Submit),
            "/status" => Some(ConsoleCommand::Status),
            "/help" | "?" => Some(ConsoleCommand::Help),
            "/quit" | "/exit" | "q" => Some(ConsoleCommand::Quit),
            _ => {
                println!("Unknown command: {}", trimmed);
                println!("{}", Self::help_text());
                None
            }
        }
    }

    pub fn help_text() -> &'static str {
        "Press Enter to capture. Commands: /dismiss, /submit, /status, /help, /quit"
    }

    fn print_prompt() {
        print!("> ");
        let _ = io::stdout().flush();
    }
}

/// One line of detector output in JSON form.
#[derive(Debug, Deserialize)]
struct DetectorLine {
    faces: usize,
}

/// Parse a detector line into a face count.
///
/// Accepts a bare integer (`1`) or JSON (`{"faces": 1}`).
pub fn parse_face_count(line: &str) -> Option<usize> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if let Ok(count) = line.parse::<usize>() {
        return Some(count);
    }
    serde_json::from_str::<DetectorLine>(line)
        .ok()
        .map(|parsed| parsed.faces)
}

/// Automatic triggers from an external face-detector process.
///
/// The detector prints one line per analysed frame. Every line reporting at
/// least one face becomes an `Automatic` trigger, so a face held in view
/// produces a continuous stream that the orchestrator gates.
pub struct DetectorFeed {
    program: String,
    args: Vec<String>,
}

impl DetectorFeed {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build a feed from config, if a detector command is configured.
    pub fn from_config(config: &DetectionConfig) -> Option<Self> {
        config
            .command
            .as_ref()
            .filter(|c| !c.trim().is_empty())
            .map(|c| Self::new(c.clone(), config.args.clone()))
    }

    /// Run the detector, forwarding triggers until it exits or `tx` closes.
    pub fn spawn(self, tx: UnboundedSender<CaptureTrigger>) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run(tx).await {
                log::warn!("Face detector '{}' failed: {}", self.program, e);
            }
        })
    }

    async fn run(&self, tx: UnboundedSender<CaptureTrigger>) -> io::Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;
        log::info!("Face detector '{}' started", self.program);

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "detector stdout not captured"))?;
        let mut lines = BufReader::new(stdout).lines();

        while let Some(line) = lines.next_line().await? {
            match parse_face_count(&line) {
                Some(count) if count > 0 => {
                    if tx.send(CaptureTrigger::Automatic).is_err() {
                        break;
                    }
                }
                Some(_) => {}
                None => log::debug!("Ignoring detector output: {}", line),
            }
        }

        let status = child.wait().await?;
        log::info!("Face detector exited with {}", status);
        Ok(())
    }
}
