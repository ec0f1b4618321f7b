// Shared fixtures for the integration tests

#![allow(dead_code)]

use anyhow::Result;
use barcode_reader::{
    DecodeEvent, DecodeInjector, DeviceError, ManualSource, PermissionProvider,
    PermissionStatus, RecognitionSource, ScanController, SessionConfig, SessionSnapshot,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

/// Permission provider whose prompt only resolves when the test releases it
pub struct GatedPermissions {
    status: Mutex<PermissionStatus>,
    answer: PermissionStatus,
    gate: Notify,
    requests: AtomicUsize,
}

impl GatedPermissions {
    pub fn new(answer: PermissionStatus) -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(PermissionStatus::NotDetermined),
            answer,
            gate: Notify::new(),
            requests: AtomicUsize::new(0),
        })
    }

    /// Let one pending (or the next) prompt resolve
    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PermissionProvider for GatedPermissions {
    fn check_status(&self) -> PermissionStatus {
        *self.status.lock().unwrap()
    }

    async fn request_access(&self) -> PermissionStatus {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        *self.status.lock().unwrap() = self.answer;
        self.answer
    }
}

/// Source whose events are already queued when `start` returns
pub struct PreloadedSource {
    events: Vec<DecodeEvent>,
    tx: Option<mpsc::Sender<DecodeEvent>>,
}

impl PreloadedSource {
    pub fn new(events: Vec<DecodeEvent>) -> Self {
        Self { events, tx: None }
    }
}

#[async_trait::async_trait]
impl RecognitionSource for PreloadedSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<DecodeEvent>, DeviceError> {
        if self.tx.is_some() {
            return Err(DeviceError::AlreadyRunning);
        }

        let (tx, rx) = mpsc::channel(self.events.len().max(1));
        for event in &self.events {
            tx.try_send(event.clone())
                .map_err(|e| DeviceError::StartFailed(e.to_string()))?;
        }
        // Holding the sender keeps the stream open after the queued events
        self.tx = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), DeviceError> {
        self.tx = None;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.tx.is_some()
    }

    fn name(&self) -> &str {
        "preloaded"
    }
}

/// Controller backed by a manual source
pub fn manual_controller(
    permissions: Arc<dyn PermissionProvider>,
    config: SessionConfig,
) -> (ScanController, DecodeInjector) {
    let (source, injector) = ManualSource::new(16);
    let controller = ScanController::spawn(config, permissions, Box::new(source));
    (controller, injector)
}

/// Wait for a snapshot matching `predicate`, failing after two seconds
pub async fn settle<F>(controller: &ScanController, predicate: F) -> Result<SessionSnapshot>
where
    F: FnMut(&SessionSnapshot) -> bool,
{
    let snapshot =
        tokio::time::timeout(Duration::from_secs(2), controller.wait_for(predicate)).await??;
    Ok(snapshot)
}
