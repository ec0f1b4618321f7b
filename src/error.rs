//! Error types for the scan session controller and its collaborators.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to callers of the controller handle.
///
/// Scanning failures themselves (denied permission, missing camera) are not
/// errors here: they are reported through [`SessionState::Failed`](crate::SessionState).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// The controller task has exited (shut down or all handles dropped)
    #[error("scan controller is no longer running")]
    ControllerClosed,

    /// The configured recognition source does not accept injected events
    #[error("recognition source does not accept injected events")]
    NotInjectable,
}

/// Errors reported by a recognition source.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// No capture device is present or it cannot be opened
    #[error("capture device unavailable: {0}")]
    Unavailable(String),

    /// `start` was called on a source that is already producing events
    #[error("recognition source is already running")]
    AlreadyRunning,

    /// The source could not be started for another reason
    #[error("failed to start recognition source: {0}")]
    StartFailed(String),

    /// A replay script could not be read
    #[error("failed to read replay script '{path}': {source}")]
    ScriptRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A replay script line is not a valid entry
    #[error("invalid replay entry at {path}:{line}: {source}")]
    ScriptParse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}
