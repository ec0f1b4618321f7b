// Replay recognition source
//
// Plays back a recorded sequence of decode results. Each line of the script is
// a JSON object: {"text": "...", "symbology": "qr", "delay_ms": 250}

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::backend::{DecodeEvent, RecognitionSource, Symbology};
use crate::error::DeviceError;

/// One scripted decode result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayEntry {
    pub text: String,
    pub symbology: Symbology,
    /// Pause before this entry is emitted
    #[serde(default)]
    pub delay_ms: u64,
}

/// Recognition source that replays a script of decode results
pub struct ReplaySource {
    path: PathBuf,
    entries: Vec<ReplayEntry>,
    buffer: usize,
    looping: bool,
    task: Option<JoinHandle<()>>,
}

impl ReplaySource {
    /// Load a JSON-lines replay script
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DeviceError> {
        let path = path.as_ref().to_path_buf();
        let contents = fs::read_to_string(&path).map_err(|source| DeviceError::ScriptRead {
            path: path.clone(),
            source,
        })?;

        let mut entries = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let entry = serde_json::from_str::<ReplayEntry>(line).map_err(|source| {
                DeviceError::ScriptParse {
                    path: path.clone(),
                    line: idx + 1,
                    source,
                }
            })?;
            entries.push(entry);
        }

        info!("Loaded replay script {:?} ({} entries)", path, entries.len());

        Ok(Self::from_entries(entries).with_path(path))
    }

    /// Build a replay source from in-memory entries
    pub fn from_entries(entries: Vec<ReplayEntry>) -> Self {
        Self {
            path: PathBuf::from("<memory>"),
            entries,
            buffer: 32,
            looping: false,
            task: None,
        }
    }

    fn with_path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    /// Restart from the first entry once the script runs out
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn entries(&self) -> &[ReplayEntry] {
        &self.entries
    }
}

#[async_trait::async_trait]
impl RecognitionSource for ReplaySource {
    async fn start(&mut self) -> Result<mpsc::Receiver<DecodeEvent>, DeviceError> {
        if self.is_running() {
            return Err(DeviceError::AlreadyRunning);
        }

        let (tx, rx) = mpsc::channel(self.buffer);
        let entries = self.entries.clone();
        let looping = self.looping && !entries.is_empty();

        info!("Starting replay of {:?}", self.path);

        let task = tokio::spawn(async move {
            loop {
                for entry in &entries {
                    if entry.delay_ms > 0 {
                        tokio::time::sleep(Duration::from_millis(entry.delay_ms)).await;
                    }

                    let event = DecodeEvent::new(entry.text.clone(), entry.symbology);
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }

                if !looping {
                    break;
                }
            }

            info!("Replay script finished");
        });

        self.task = Some(task);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), DeviceError> {
        if let Some(task) = self.task.take() {
            task.abort();
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!("Replay task panicked: {}", e);
                }
            }
            info!("Replay of {:?} stopped", self.path);
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn name(&self) -> &str {
        "replay"
    }
}
