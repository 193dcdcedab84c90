//! Remote recognition and registration service.
//!
//! The orchestrators talk to the service through the [`Recognizer`] trait;
//! [`RecognitionClient`] is the HTTP implementation.

mod client;

use async_trait::async_trait;

use crate::model::{EnrollOutcome, EnrollmentBatch, RecognitionRequest, RecognitionResult};

pub use client::{
    ClientError, HealthStatus, RecognitionClient, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT,
};

/// Network submission of recognition and enrollment requests.
///
/// Implementations perform no retries; a failure is terminal for the attempt.
#[async_trait]
pub trait Recognizer: Send + Sync {
    async fn recognize(&self, request: &RecognitionRequest) -> Result<RecognitionResult, ClientError>;

    async fn enroll(&self, batch: &EnrollmentBatch) -> Result<EnrollOutcome, ClientError>;
}
