// Manually fed recognition source
//
// Events are pushed by application code (or the HTTP API) through a
// `DecodeInjector`. Useful where the actual recognizer lives outside this
// process and only forwards decoded strings.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use super::backend::{DecodeEvent, RecognitionSource};
use crate::error::DeviceError;

type SharedSender = Arc<Mutex<Option<mpsc::Sender<DecodeEvent>>>>;

/// Recognition source driven by a [`DecodeInjector`]
pub struct ManualSource {
    buffer: usize,
    sender: SharedSender,
}

/// Handle used to feed events into a [`ManualSource`]
#[derive(Clone)]
pub struct DecodeInjector {
    sender: SharedSender,
}

impl ManualSource {
    /// Create a source and the injector that feeds it
    pub fn new(buffer: usize) -> (Self, DecodeInjector) {
        let sender: SharedSender = Arc::new(Mutex::new(None));
        let source = Self {
            buffer: buffer.max(1),
            sender: Arc::clone(&sender),
        };
        (source, DecodeInjector { sender })
    }
}

#[async_trait::async_trait]
impl RecognitionSource for ManualSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<DecodeEvent>, DeviceError> {
        let mut slot = self.sender.lock().await;
        if slot.is_some() {
            return Err(DeviceError::AlreadyRunning);
        }

        let (tx, rx) = mpsc::channel(self.buffer);
        *slot = Some(tx);

        info!("Manual recognition source started");
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), DeviceError> {
        if self.sender.lock().await.take().is_some() {
            info!("Manual recognition source stopped");
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.sender
            .try_lock()
            .map(|slot| slot.is_some())
            .unwrap_or(true)
    }

    fn name(&self) -> &str {
        "manual"
    }
}

impl DecodeInjector {
    /// Deliver an event to the source
    ///
    /// Returns `false` when the source is not running or its buffer is full;
    /// the event is dropped in that case.
    pub async fn inject(&self, event: DecodeEvent) -> bool {
        let slot = self.sender.lock().await;
        match slot.as_ref() {
            Some(tx) => match tx.try_send(event) {
                Ok(()) => true,
                Err(e) => {
                    debug!("Dropping injected event: {}", e);
                    false
                }
            },
            None => {
                debug!("Dropping injected event: source not running");
                false
            }
        }
    }
}
