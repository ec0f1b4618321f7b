use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::SessionState;

/// Statistics about a scan session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Session identifier
    pub session_id: String,

    /// Current lifecycle state
    pub state: SessionState,

    /// When the controller was created
    pub created_at: DateTime<Utc>,

    /// Number of times the recognition source was started
    pub runs_started: usize,

    /// Number of permission prompts issued
    pub permission_requests: usize,

    /// Decode events that changed the result
    pub events_accepted: usize,

    /// Decode events that were dropped
    pub events_discarded: usize,
}
