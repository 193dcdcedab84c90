//! Single-frame webcam capture through an FFmpeg child process.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

use super::{jpeg_data_uri, CaptureError, MediaCapture};
use crate::config::CameraConfig;

/// Best (lowest) FFmpeg JPEG qscale.
const QSCALE_BEST: f32 = 2.0;

/// Worst (highest) FFmpeg JPEG qscale.
const QSCALE_WORST: f32 = 31.0;

/// Map a 0.0-1.0 quality onto FFmpeg's 2-31 JPEG qscale (lower is better).
pub fn quality_to_qscale(quality: f32) -> u32 {
    let quality = quality.clamp(0.0, 1.0);
    (QSCALE_BEST + (1.0 - quality) * (QSCALE_WORST - QSCALE_BEST)).round() as u32
}

/// Settings for grabbing one still from a webcam.
#[derive(Debug, Clone)]
pub struct WebcamStill {
    /// FFmpeg input device (`0` for avfoundation, `/dev/video0` for v4l2)
    pub device: String,
    /// FFmpeg input format (`avfoundation`, `v4l2`, `dshow`)
    pub input_format: String,
    /// Capture framerate requested from the device
    pub framerate: u32,
    /// Mirror (horizontal flip) the still, as a front camera preview shows it
    pub mirror: bool,
    /// JPEG quality between 0.0 and 1.0
    pub quality: f32,
}

impl Default for WebcamStill {
    fn default() -> Self {
        let camera = CameraConfig::default();
        Self {
            device: camera.device,
            input_format: camera.input_format,
            framerate: 30,
            mirror: true,
            quality: camera.quality,
        }
    }
}

impl From<&CameraConfig> for WebcamStill {
    fn from(config: &CameraConfig) -> Self {
        Self {
            device: config.device.clone(),
            input_format: config.input_format.clone(),
            mirror: config.mirror,
            quality: config.quality,
            ..Default::default()
        }
    }
}

impl WebcamStill {
    /// Generate FFmpeg filter for the still (includes mirror if enabled)
    pub fn to_filter(&self) -> Option<String> {
        if self.mirror {
            Some("hflip".to_string())
        } else {
            None
        }
    }

    /// Generate the full FFmpeg argument list; the JPEG is written to stdout.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-f".to_string(),
            self.input_format.clone(),
            "-framerate".to_string(),
            self.framerate.to_string(),
            "-i".to_string(),
            self.device.clone(),
            "-frames:v".to_string(),
            "1".to_string(),
        ];
        if let Some(filter) = self.to_filter() {
            args.push("-vf".to_string());
            args.push(filter);
        }
        args.extend([
            "-q:v".to_string(),
            quality_to_qscale(self.quality).to_string(),
            "-f".to_string(),
            "mjpeg".to_string(),
            "pipe:1".to_string(),
        ]);
        args
    }
}

/// [`MediaCapture`] backed by the `ffmpeg` executable.
pub struct FfmpegCamera {
    settings: WebcamStill,
    program: String,
}

impl FfmpegCamera {
    pub fn new(settings: WebcamStill) -> Self {
        Self {
            settings,
            program: "ffmpeg".to_string(),
        }
    }

    /// Use a different FFmpeg binary (e.g. a bundled build).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Grab one JPEG frame.
    pub async fn grab_jpeg(&self) -> Result<Vec<u8>, CaptureError> {
        let output = Command::new(&self.program)
            .args(self.settings.to_ffmpeg_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            return Err(CaptureError::ProcessFailed {
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if output.stdout.is_empty() {
            return Err(CaptureError::EmptyFrame {
                device: self.settings.device.clone(),
            });
        }
        Ok(output.stdout)
    }
}

#[async_trait]
impl MediaCapture for FfmpegCamera {
    async fn capture(&self) -> Option<String> {
        match self.grab_jpeg().await {
            Ok(bytes) => {
                log::debug!(
                    "Captured {} byte still from {}",
                    bytes.len(),
                    self.settings.device
                );
                Some(jpeg_data_uri(&bytes))
            }
            Err(e) => {
                log::warn!("Camera error: {}", e);
                None
            }
        }
    }
}
