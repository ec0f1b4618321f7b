use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tokio::sync::mpsc;

use super::manual::{DecodeInjector, ManualSource};
use super::replay::ReplaySource;
use super::unavailable::UnavailableSource;
use crate::error::DeviceError;

/// Machine-readable code formats the platform recognizer is asked to report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Symbology {
    Ean8,
    Ean13,
    Pdf417,
    Qr,
    Code128,
}

impl Symbology {
    pub const ALL: [Symbology; 5] = [
        Symbology::Ean8,
        Symbology::Ean13,
        Symbology::Pdf417,
        Symbology::Qr,
        Symbology::Code128,
    ];
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Symbology::Ean8 => "ean8",
            Symbology::Ean13 => "ean13",
            Symbology::Pdf417 => "pdf417",
            Symbology::Qr => "qr",
            Symbology::Code128 => "code128",
        };
        f.write_str(name)
    }
}

/// One recognized code instance, as reported by a recognition source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeEvent {
    /// Decoded payload
    pub raw_text: String,
    /// Format the code was recognized as
    pub symbology: Symbology,
    /// When the source reported it
    pub timestamp: DateTime<Utc>,
}

impl DecodeEvent {
    pub fn new(raw_text: impl Into<String>, symbology: Symbology) -> Self {
        Self {
            raw_text: raw_text.into(),
            symbology,
            timestamp: Utc::now(),
        }
    }
}

/// Recognition source trait
///
/// Implementations wrap whatever actually decodes codes from a video feed.
/// Once started, a source pushes events into the returned channel from its
/// own execution context until it is stopped.
#[async_trait::async_trait]
pub trait RecognitionSource: Send + Sync {
    /// Start producing decode events
    ///
    /// Returns a channel receiver that will receive decode events
    async fn start(&mut self) -> Result<mpsc::Receiver<DecodeEvent>, DeviceError>;

    /// Stop producing decode events
    ///
    /// No event is sent into the channel returned by `start` after this returns.
    async fn stop(&mut self) -> Result<(), DeviceError>;

    /// Check if source is currently producing events
    fn is_running(&self) -> bool;

    /// Get source name for logging
    fn name(&self) -> &str;
}

/// Recognition source selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Events are injected through a [`DecodeInjector`]
    #[default]
    Manual,
    /// Events are replayed from a JSON-lines script
    Replay,
    /// No capture device on this host
    Unavailable,
}

/// Configuration for recognition sources
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    /// Script read by the replay source
    pub replay_path: Option<PathBuf>,
    /// Restart the script from the top when it runs out
    pub replay_loop: bool,
    /// Capacity of the event channel handed to the controller
    pub buffer: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Manual,
            replay_path: None,
            replay_loop: false,
            buffer: 32,
        }
    }
}

/// Recognition source factory
pub struct SourceFactory;

impl SourceFactory {
    /// Create a recognition source from configuration
    ///
    /// The injector is only returned for the manual source.
    pub fn create(
        config: &SourceConfig,
    ) -> Result<(Box<dyn RecognitionSource>, Option<DecodeInjector>), DeviceError> {
        match config.kind {
            SourceKind::Manual => {
                let (source, injector) = ManualSource::new(config.buffer);
                Ok((Box::new(source), Some(injector)))
            }

            SourceKind::Replay => {
                let path = config.replay_path.as_ref().ok_or_else(|| {
                    DeviceError::StartFailed("replay source requires replay_path".to_string())
                })?;
                let source = ReplaySource::open(path)?
                    .with_buffer(config.buffer)
                    .looping(config.replay_loop);
                Ok((Box::new(source), None))
            }

            SourceKind::Unavailable => Ok((Box::new(UnavailableSource::default()), None)),
        }
    }
}
