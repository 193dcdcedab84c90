//! RecognitionClient - handles communication with the recognition service.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::Recognizer;
use crate::model::{
    EnrollOutcome, EnrollmentBatch, LogType, Punch, RecognitionRequest, RecognitionResult,
};

/// Default timeout for HTTP requests (30 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Reason reported when the service rejects a face without saying why.
const UNKNOWN_REJECTION: &str = "Face not recognized";

/// Response body of `POST /recognize`.
#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    success: bool,
    #[serde(default)]
    log_type: Option<LogType>,
    #[serde(default)]
    employee_name: Option<String>,
    #[serde(default)]
    employee_id: Option<String>,
    #[serde(default)]
    checkin_name: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

/// Response body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub model: Option<String>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

/// Client for the recognition service.
pub struct RecognitionClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl RecognitionClient {
    /// Create a client for the service at `base_url` with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidBaseUrl(base_url));
        }

        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .build()?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Submit one capture for recognition.
    ///
    /// A structured `success: false` answer is a [`RecognitionResult::Failure`],
    /// not an error. The returned punch carries the submitted image as its selfie.
    ///
    /// # Errors
    ///
    /// `ClientError::Transport` if the request fails, `ClientError::Status` for a
    /// non-2xx answer, `ClientError::Protocol` if the body has the wrong shape.
    pub async fn recognize(&self, request: &RecognitionRequest) -> Result<RecognitionResult, ClientError> {
        let response = self
            .http_client
            .post(self.url("recognize"))
            .json(request)
            .send()
            .await?;
        let body: RecognizeResponse = read_json(response).await?;

        if !body.success {
            let reason = body
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_REJECTION.to_string());
            log::info!("Recognition rejected: {}", reason);
            return Ok(RecognitionResult::Failure { reason });
        }

        let (Some(log_type), Some(employee_id)) = (body.log_type, body.employee_id) else {
            return Err(ClientError::Protocol(
                "successful recognition without log_type or employee_id".to_string(),
            ));
        };
        // The service falls back to the id when it has no display name.
        let employee_name = body.employee_name.unwrap_or_else(|| employee_id.clone());

        log::info!(
            "Recognized {} ({}), punch {}",
            employee_name,
            employee_id,
            log_type
        );
        Ok(RecognitionResult::Success(Punch {
            log_type,
            employee_name,
            employee_id,
            selfie: request.image().to_string(),
            checkin_name: body.checkin_name,
            confidence: body.confidence,
        }))
    }

    /// Submit a sealed enrollment batch.
    ///
    /// # Errors
    ///
    /// Same failure kinds as [`RecognitionClient::recognize`].
    pub async fn enroll(&self, batch: &EnrollmentBatch) -> Result<EnrollOutcome, ClientError> {
        log::info!(
            "Registering {} ({}) with {} images",
            batch.employee_name(),
            batch.employee_id(),
            batch.len()
        );
        let response = self
            .http_client
            .post(self.url("register_multiple"))
            .json(batch)
            .send()
            .await?;
        let outcome: EnrollOutcome = read_json(response).await?;

        if outcome.success {
            log::info!(
                "Registration accepted: saved={:?} failed={:?}",
                outcome.saved,
                outcome.failed
            );
        } else {
            log::warn!("Registration rejected: {:?}", outcome.error);
        }
        Ok(outcome)
    }

    /// Check that the service is up.
    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let response = self.http_client.get(self.url("health")).send().await?;
        read_json(response).await
    }
}

#[async_trait]
impl Recognizer for RecognitionClient {
    async fn recognize(&self, request: &RecognitionRequest) -> Result<RecognitionResult, ClientError> {
        RecognitionClient::recognize(self, request).await
    }

    async fn enroll(&self, batch: &EnrollmentBatch) -> Result<EnrollOutcome, ClientError> {
        RecognitionClient::enroll(self, batch).await
    }
}

/// Check the status and decode the body, separating transport from shape errors.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| ClientError::Protocol(e.to_string()))
}

/// Errors that can occur while talking to the recognition service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid service URL: {0}")]
    InvalidBaseUrl(String),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Request failed with status code {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, as sent by the server
        body: String,
    },

    #[error("Unexpected response: {0}")]
    Protocol(String),
}

impl ClientError {
    /// Whether the failure happened before a well-formed answer was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Status { .. })
    }
}
