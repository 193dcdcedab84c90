//! face-punch library crate.
//!
//! A face attendance kiosk client: triggers become camera stills, stills plus
//! a location become recognition requests, and results become punches shown
//! on screen. The orchestration lives in [`orchestrator`]; everything it
//! talks to sits behind a trait in its own module.

pub mod capture;
pub mod cli;
pub mod config;
pub mod erp;
pub mod feedback;
pub mod hotkeys;
pub mod kiosk;
pub mod location;
pub mod model;
pub mod orchestrator;
pub mod recognition;
pub mod render;
pub mod session;
pub mod signals;
pub mod triggers;
