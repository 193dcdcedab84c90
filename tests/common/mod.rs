//! Scripted leaves for driving the orchestrators without devices or network.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use face_punch::capture::MediaCapture;
use face_punch::feedback::FeedbackPlayer;
use face_punch::location::LocationProvider;
use face_punch::model::{
    EnrollOutcome, EnrollmentBatch, GeoFix, LogType, Punch, RecognitionRequest, RecognitionResult,
};
use face_punch::recognition::{ClientError, Recognizer};

pub struct FakeCamera {
    working: bool,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeCamera {
    pub fn working() -> Arc<Self> {
        Self::build(true, Duration::ZERO)
    }

    pub fn broken() -> Arc<Self> {
        Self::build(false, Duration::ZERO)
    }

    /// Working camera that takes `delay` to return each frame.
    pub fn slow(delay: Duration) -> Arc<Self> {
        Self::build(true, delay)
    }

    fn build(working: bool, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            working,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaCapture for FakeCamera {
    async fn capture(&self) -> Option<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.working
            .then(|| format!("data:image/jpeg;base64,frame{}", n))
    }
}

pub struct FakeLocation(pub Option<GeoFix>);

impl FakeLocation {
    pub fn at_office() -> Arc<Self> {
        Arc::new(Self(GeoFix::new(12.9716, 77.5946)))
    }

    pub fn denied() -> Arc<Self> {
        Arc::new(Self(None))
    }
}

#[async_trait]
impl LocationProvider for FakeLocation {
    async fn locate(&self) -> Option<GeoFix> {
        self.0
    }
}

/// How the fake service answers `/recognize`.
#[derive(Debug, Clone)]
pub enum Reply {
    Punch(LogType),
    Reject(String),
    /// Non-2xx answer (transport class).
    Down(u16),
    Malformed,
    /// The recognizer itself panics mid-request.
    Panic,
}

/// How the fake service answers `/register_multiple`.
#[derive(Debug, Clone)]
pub enum EnrollReply {
    Accept,
    Reject(String),
    Down(u16),
}

pub struct FakeRecognizer {
    reply: Reply,
    enroll_replies: Mutex<VecDeque<EnrollReply>>,
    delay: Duration,
    requests: Mutex<Vec<RecognitionRequest>>,
    batches: Mutex<Vec<EnrollmentBatch>>,
}

impl FakeRecognizer {
    pub fn replying(reply: Reply) -> Arc<Self> {
        Self::build(reply, Vec::new(), Duration::ZERO)
    }

    pub fn slow(reply: Reply, delay: Duration) -> Arc<Self> {
        Self::build(reply, Vec::new(), delay)
    }

    /// Enrollment replies are used in order; `Accept` once they run out.
    pub fn enrolling(replies: Vec<EnrollReply>, delay: Duration) -> Arc<Self> {
        Self::build(Reply::Reject("unused".to_string()), replies, delay)
    }

    fn build(reply: Reply, enroll_replies: Vec<EnrollReply>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply,
            enroll_replies: Mutex::new(enroll_replies.into()),
            delay,
            requests: Mutex::new(Vec::new()),
            batches: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<RecognitionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn batches(&self) -> Vec<EnrollmentBatch> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Recognizer for FakeRecognizer {
    async fn recognize(
        &self,
        request: &RecognitionRequest,
    ) -> Result<RecognitionResult, ClientError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.reply {
            Reply::Punch(log_type) => Ok(RecognitionResult::Success(Punch {
                log_type: *log_type,
                employee_name: "Asha Rao".to_string(),
                employee_id: "EMP01".to_string(),
                selfie: request.image().to_string(),
                checkin_name: None,
                confidence: Some(0.91),
            })),
            Reply::Reject(reason) => Ok(RecognitionResult::Failure {
                reason: reason.clone(),
            }),
            Reply::Down(status) => Err(ClientError::Status {
                status: *status,
                body: "Service Unavailable".to_string(),
            }),
            Reply::Malformed => Err(ClientError::Protocol("expected value".to_string())),
            Reply::Panic => panic!("recognizer crashed"),
        }
    }

    async fn enroll(&self, batch: &EnrollmentBatch) -> Result<EnrollOutcome, ClientError> {
        self.batches.lock().unwrap().push(batch.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = self
            .enroll_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(EnrollReply::Accept);
        match reply {
            EnrollReply::Accept => Ok(EnrollOutcome {
                success: true,
                error: None,
                saved: Some(batch.len() as u32),
                failed: Some(0),
            }),
            EnrollReply::Reject(error) => Ok(EnrollOutcome {
                success: false,
                error: Some(error),
                saved: None,
                failed: None,
            }),
            EnrollReply::Down(status) => Err(ClientError::Status {
                status,
                body: "Bad Gateway".to_string(),
            }),
        }
    }
}

#[derive(Default)]
pub struct RecordingFeedback {
    cues: Mutex<Vec<LogType>>,
}

impl RecordingFeedback {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn cues(&self) -> Vec<LogType> {
        self.cues.lock().unwrap().clone()
    }
}

impl FeedbackPlayer for RecordingFeedback {
    fn play(&self, cue: LogType) {
        self.cues.lock().unwrap().push(cue);
    }
}
