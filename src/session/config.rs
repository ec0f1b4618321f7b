use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::recognition::Symbology;

/// What happens once a code has been recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebouncePolicy {
    /// Keep the first result and stop the session
    #[default]
    StopOnFirstMatch,
    /// Keep scanning; the result follows the latest distinct code
    Continuous,
}

/// Configuration for a scan session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "scan-2b1f...")
    pub session_id: String,

    /// Result policy after a match
    /// Default: stop on first match
    pub debounce: DebouncePolicy,

    /// Codes outside this set are ignored
    pub symbologies: Vec<Symbology>,

    /// Give up on an unanswered permission prompt after this long
    /// Default: wait indefinitely
    pub permission_timeout: Option<Duration>,
}

impl SessionConfig {
    pub fn accepts(&self, symbology: Symbology) -> bool {
        self.symbologies.contains(&symbology)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("scan-{}", uuid::Uuid::new_v4()),
            debounce: DebouncePolicy::StopOnFirstMatch,
            symbologies: Symbology::ALL.to_vec(),
            permission_timeout: None,
        }
    }
}
