//! Global hotkey for the manual capture trigger.
//!
//! Uses rdev for global key listening, so the kiosk can be operated while the
//! terminal is not focused. On macOS this requires Accessibility permissions.

use rdev::{listen, Event, EventType, Key};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc::UnboundedSender;

use crate::model::CaptureTrigger;

/// Forwards shutter key presses as manual triggers.
pub struct HotkeyManager {
    tx: UnboundedSender<CaptureTrigger>,
    /// Flag to stop forwarding events
    stop_flag: Arc<AtomicBool>,
    listener_thread: Option<JoinHandle<()>>,
}

impl HotkeyManager {
    pub fn new(tx: UnboundedSender<CaptureTrigger>) -> Self {
        HotkeyManager {
            tx,
            stop_flag: Arc::new(AtomicBool::new(false)),
            listener_thread: None,
        }
    }

    /// Start listening for the shutter key on a background thread.
    ///
    /// Returns an error if the listener is already running.
    pub fn start(&mut self) -> Result<(), String> {
        if self.listener_thread.is_some() {
            return Err("Hotkey listener already running".to_string());
        }

        let tx = self.tx.clone();
        let stop_flag = self.stop_flag.clone();

        let handle = thread::spawn(move || {
            let callback = move |event: Event| {
                if stop_flag.load(Ordering::SeqCst) {
                    return;
                }
                if let Some(trigger) = trigger_for(&event.event_type) {
                    // Receiver gone means the session ended.
                    let _ = tx.send(trigger);
                }
            };

            // Blocks until error; there is no clean way to stop rdev.
            if let Err(e) = listen(callback) {
                log::warn!("Hotkey listener error: {:?}", e);
            }
        });

        self.listener_thread = Some(handle);
        Ok(())
    }

    /// Stop forwarding key presses.
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        // The thread itself lives until the process exits.
        self.listener_thread = None;
    }

    pub fn is_running(&self) -> bool {
        self.listener_thread.is_some() && !self.stop_flag.load(Ordering::SeqCst)
    }
}

impl Drop for HotkeyManager {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Map a raw key event to a trigger. Only presses of the space bar count.
fn trigger_for(event: &EventType) -> Option<CaptureTrigger> {
    match event {
        EventType::KeyPress(Key::Space) => Some(CaptureTrigger::Manual),
        _ => None,
    }
}
