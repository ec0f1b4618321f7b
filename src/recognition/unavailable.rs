// Placeholder source for hosts without a capture device

use tokio::sync::mpsc;
use tracing::warn;

use super::backend::{DecodeEvent, RecognitionSource};
use crate::error::DeviceError;

/// Recognition source whose start always fails
///
/// Stands in for a platform recognizer when no camera is present.
pub struct UnavailableSource {
    reason: String,
}

impl UnavailableSource {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for UnavailableSource {
    fn default() -> Self {
        Self::new("no video capture device found")
    }
}

#[async_trait::async_trait]
impl RecognitionSource for UnavailableSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<DecodeEvent>, DeviceError> {
        warn!("Recognition source unavailable: {}", self.reason);
        Err(DeviceError::Unavailable(self.reason.clone()))
    }

    async fn stop(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    fn is_running(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}
