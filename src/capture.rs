//! Still capture from the front-facing camera.
//!
//! [`MediaCapture`] is the seam the orchestrators capture through. The
//! production implementation, [`FfmpegCamera`], grabs a single mirrored JPEG
//! frame through FFmpeg and hands it back as a base64 data URI.

mod errors;
mod ffmpeg;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};

pub use errors::CaptureError;
pub use ffmpeg::{quality_to_qscale, FfmpegCamera, WebcamStill};

/// Prefix of every image handed out by a [`MediaCapture`].
pub const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Produces an encoded still image on demand.
///
/// Implementations report absence with `None` and log the cause themselves;
/// no error crosses this boundary.
#[async_trait]
pub trait MediaCapture: Send + Sync {
    async fn capture(&self) -> Option<String>;
}

/// Encode JPEG bytes as a `data:image/jpeg;base64,...` URI.
pub fn jpeg_data_uri(bytes: &[u8]) -> String {
    format!("{}{}", JPEG_DATA_URI_PREFIX, STANDARD.encode(bytes))
}
