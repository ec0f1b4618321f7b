//! Decode event admission
//!
//! Decides which incoming decode events become the session result. Events are
//! only considered while the session is running and only when they belong to
//! the current run of the recognition source.

use super::config::{DebouncePolicy, SessionConfig};
use super::state::{ScanSession, SessionState};
use crate::recognition::DecodeEvent;

/// Why an event was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Session is not running
    NotRunning,
    /// Event was produced by an earlier run of the source
    StaleRun,
    EmptyText,
    /// Symbology not enabled for this session
    Symbology,
    /// Same text as the current result (continuous mode)
    Duplicate,
}

/// Outcome of offering an event to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Record the event; `stop` says whether the session ends with it
    Accept { stop: bool },
    Discard(DiscardReason),
}

/// Classify an incoming event
pub fn admit(
    session: &ScanSession,
    config: &SessionConfig,
    current_run: bool,
    event: &DecodeEvent,
) -> Admission {
    if *session.state() != SessionState::Running {
        return Admission::Discard(DiscardReason::NotRunning);
    }
    if !current_run {
        return Admission::Discard(DiscardReason::StaleRun);
    }
    if event.raw_text.is_empty() {
        return Admission::Discard(DiscardReason::EmptyText);
    }
    if !config.accepts(event.symbology) {
        return Admission::Discard(DiscardReason::Symbology);
    }

    match config.debounce {
        DebouncePolicy::StopOnFirstMatch => Admission::Accept { stop: true },
        DebouncePolicy::Continuous => {
            let duplicate = session
                .last_result()
                .is_some_and(|current| current.text == event.raw_text);
            if duplicate {
                Admission::Discard(DiscardReason::Duplicate)
            } else {
                Admission::Accept { stop: false }
            }
        }
    }
}
