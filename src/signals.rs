//! Ctrl+C handling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Global flag for handling Ctrl+C across the application
static CTRLC_RECEIVED: AtomicBool = AtomicBool::new(false);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Check if Ctrl+C has been received.
pub fn ctrlc_received() -> bool {
    CTRLC_RECEIVED.load(Ordering::SeqCst)
}

/// Set up the Ctrl+C handler.
///
/// This should be called once at program startup.
pub fn setup_ctrlc_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        CTRLC_RECEIVED.store(true, Ordering::SeqCst);
        eprintln!("\nReceived Ctrl+C, shutting down...");
    })
}

/// Resolve once Ctrl+C has been received.
pub async fn shutdown_requested() {
    let mut tick = tokio::time::interval(POLL_INTERVAL);
    while !ctrlc_received() {
        tick.tick().await;
    }
}
