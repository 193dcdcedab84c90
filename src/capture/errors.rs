//! Error types for still capture.

/// Errors that can occur while grabbing a still frame.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("FFmpeg not found. Please install it (e.g. `brew install ffmpeg` or `apt install ffmpeg`)")]
    FfmpegNotFound,

    #[error("Failed to spawn FFmpeg: {0}")]
    SpawnFailed(std::io::Error),

    #[error("FFmpeg exited with code {exit_code:?}: {stderr}")]
    ProcessFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Camera '{device}' produced no frame")]
    EmptyFrame { device: String },
}

impl From<std::io::Error> for CaptureError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            CaptureError::FfmpegNotFound
        } else {
            CaptureError::SpawnFailed(e)
        }
    }
}
