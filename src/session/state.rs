use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DeviceError;
use crate::recognition::{DecodeEvent, Symbology};

/// Why a session ended up in [`SessionState::Failed`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FailureReason {
    PermissionDenied,
    PermissionTimedOut,
    DeviceUnavailable,
    StartFailed(String),
}

impl From<&DeviceError> for FailureReason {
    fn from(err: &DeviceError) -> Self {
        match err {
            DeviceError::Unavailable(_) => FailureReason::DeviceUnavailable,
            other => FailureReason::StartFailed(other.to_string()),
        }
    }
}

/// Lifecycle state of a scan session
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingPermission,
    Running,
    Paused,
    Stopped,
    Failed(FailureReason),
}

impl SessionState {
    /// States `request_start` may leave
    pub fn can_start(&self) -> bool {
        matches!(
            self,
            SessionState::Idle | SessionState::Stopped | SessionState::Failed(_)
        )
    }

    /// States in which a result may be held
    pub fn holds_result(&self) -> bool {
        matches!(
            self,
            SessionState::Running | SessionState::Paused | SessionState::Stopped
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => f.write_str("idle"),
            SessionState::AwaitingPermission => f.write_str("awaiting permission"),
            SessionState::Running => f.write_str("running"),
            SessionState::Paused => f.write_str("paused"),
            SessionState::Stopped => f.write_str("stopped"),
            SessionState::Failed(reason) => write!(f, "failed ({:?})", reason),
        }
    }
}

/// The accepted value of a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub text: String,
    pub symbology: Symbology,
    pub scanned_at: DateTime<Utc>,
}

impl From<DecodeEvent> for ScanResult {
    fn from(event: DecodeEvent) -> Self {
        Self {
            text: event.raw_text,
            symbology: event.symbology,
            scanned_at: event.timestamp,
        }
    }
}

/// Session state owned by the controller
#[derive(Debug, Clone, Default)]
pub struct ScanSession {
    state: SessionState,
    last_result: Option<ScanResult>,
}

impl ScanSession {
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn last_result(&self) -> Option<&ScanResult> {
        self.last_result.as_ref()
    }

    /// Move to `state`, dropping the result when the new state cannot hold one
    pub fn enter(&mut self, state: SessionState) {
        if !state.holds_result() {
            self.last_result = None;
        }
        self.state = state;
    }

    /// Record an accepted result; only valid while running
    pub fn record(&mut self, result: ScanResult) {
        debug_assert_eq!(self.state, SessionState::Running);
        self.last_result = Some(result);
    }
}

/// Read-only view of a session published to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    #[serde(flatten)]
    pub state: SessionState,
    pub last_result: Option<ScanResult>,
}

impl SessionSnapshot {
    pub fn last_text(&self) -> Option<&str> {
        self.last_result.as_ref().map(|r| r.text.as_str())
    }
}
