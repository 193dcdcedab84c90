//! Capture-and-recognize orchestration.
//!
//! [`CaptureOrchestrator`] runs the attendance kiosk: one pipeline at a time,
//! a splash on success, an alert on failure and a cooldown in both cases.
//! [`EnrollmentOrchestrator`] collects a fixed number of reference photos for
//! one employee and submits them as a single batch.

mod capture;
mod enrollment;
mod state;

pub use capture::{AttemptError, AttemptOutcome, CaptureOrchestrator};
pub use enrollment::{
    CaptureNextOutcome, EnrollmentOrchestrator, EnrollmentPhase, EnrollmentProgress, SubmitOutcome,
};
pub use state::{Alert, OrchestratorState, Snapshot, Splash, SplashPhase, StateKind, Timings};
