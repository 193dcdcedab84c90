//! Audio cue played after a successful punch.
//!
//! Playback is fire-and-forget: [`FeedbackPlayer::play`] returns immediately
//! and any failure is logged at this boundary only.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

use crate::config::FeedbackConfig;
use crate::model::LogType;

/// Plays a cue keyed by punch direction without blocking the caller.
pub trait FeedbackPlayer: Send + Sync {
    fn play(&self, cue: LogType);
}

/// Silent player used when feedback is turned off.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedback;

impl FeedbackPlayer for NoFeedback {
    fn play(&self, cue: LogType) {
        log::debug!("Feedback disabled, skipping {} cue", cue);
    }
}

#[cfg(target_os = "macos")]
fn default_player() -> String {
    "afplay".to_string()
}

#[cfg(not(target_os = "macos"))]
fn default_player() -> String {
    "paplay".to_string()
}

/// Spawns a system audio player on a fixed asset per punch direction.
#[derive(Debug, Clone)]
pub struct SoundPlayer {
    player: String,
    punch_in: Option<PathBuf>,
    punch_out: Option<PathBuf>,
}

impl SoundPlayer {
    pub fn new(player: impl Into<String>, punch_in: Option<PathBuf>, punch_out: Option<PathBuf>) -> Self {
        Self {
            player: player.into(),
            punch_in,
            punch_out,
        }
    }

    pub fn asset_for(&self, cue: LogType) -> Option<&PathBuf> {
        match cue {
            LogType::In => self.punch_in.as_ref(),
            LogType::Out => self.punch_out.as_ref(),
        }
    }
}

impl FeedbackPlayer for SoundPlayer {
    fn play(&self, cue: LogType) {
        let Some(asset) = self.asset_for(cue).cloned() else {
            log::warn!("Audio error: no sound configured for {} punches", cue);
            return;
        };
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            log::warn!("Audio error: no async runtime to play {}", asset.display());
            return;
        };

        let player = self.player.clone();
        // Detached: the child is reaped here once playback finishes.
        handle.spawn(async move {
            let result = Command::new(&player)
                .arg(&asset)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;
            match result {
                Ok(status) if status.success() => {
                    log::debug!("Played {}", asset.display());
                }
                Ok(status) => {
                    log::warn!(
                        "Audio error: {} exited with {:?} for {}",
                        player,
                        status.code(),
                        asset.display()
                    );
                }
                Err(e) => log::warn!("Audio error: {}: {}", player, e),
            }
        });
    }
}

/// Build the player selected by configuration.
pub fn from_config(config: &FeedbackConfig) -> Arc<dyn FeedbackPlayer> {
    if !config.enabled {
        return Arc::new(NoFeedback);
    }
    Arc::new(SoundPlayer::new(
        config.player.clone().unwrap_or_else(default_player),
        config.punch_in.clone(),
        config.punch_out.clone(),
    ))
}
