//! Scan session management
//!
//! This module provides the `ScanController` that owns a scan session and:
//! - Gates startup on camera permission, sharing one prompt between callers
//! - Starts and stops the recognition source in a single, ordered place
//! - Filters decode events into one authoritative result
//! - Publishes state changes to subscribers

mod config;
mod controller;
pub mod debounce;
mod state;
mod stats;

pub use config::{DebouncePolicy, SessionConfig};
pub use controller::{IgnoreReason, IntentOutcome, ScanController};
pub use state::{FailureReason, ScanResult, ScanSession, SessionSnapshot, SessionState};
pub use stats::SessionStats;
