use super::config::SessionConfig;
use super::debounce::{self, Admission};
use super::state::{FailureReason, ScanResult, ScanSession, SessionSnapshot, SessionState};
use super::stats::SessionStats;
use crate::error::ScanError;
use crate::permission::{PermissionProvider, PermissionStatus};
use crate::recognition::{DecodeEvent, RecognitionSource};
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Why an intent did not change anything
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// Session is already starting or running
    AlreadyActive,
    /// Nothing to stop or pause
    NotActive,
    /// A pending start was overtaken by stop or reset
    Superseded,
}

/// Result of an intent sent to the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IntentOutcome {
    Applied {
        state: SessionState,
    },
    Ignored {
        state: SessionState,
        reason: IgnoreReason,
    },
}

impl IntentOutcome {
    /// State of the session once the intent was handled
    pub fn state(&self) -> &SessionState {
        match self {
            IntentOutcome::Applied { state } | IntentOutcome::Ignored { state, .. } => state,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, IntentOutcome::Applied { .. })
    }
}

type Reply = oneshot::Sender<IntentOutcome>;

enum Intent {
    Start(Reply),
    Stop(Reply),
    Toggle(Reply),
    Reset(Reply),
    Pause(Reply),
    Resume(Reply),
    Stats(oneshot::Sender<SessionStats>),
    Shutdown(oneshot::Sender<()>),
}

enum PermissionAnswer {
    Status(PermissionStatus),
    TimedOut,
}

/// Messages produced by tasks the controller spawned
enum Internal {
    Decode { run: u64, event: DecodeEvent },
    SourceEnded { run: u64 },
    PermissionSettled { request: u64, answer: PermissionAnswer },
}

/// Handle to a scan session controller
///
/// The session itself lives on a dedicated task; this handle only sends
/// intents and observes published snapshots. Handles are cheap to clone.
/// When the last handle is dropped the controller stops the recognition
/// source and exits.
#[derive(Clone)]
pub struct ScanController {
    intents: mpsc::UnboundedSender<Intent>,
    snapshots: watch::Receiver<SessionSnapshot>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ScanController {
    /// Spawn a controller for a new session
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        config: SessionConfig,
        permissions: Arc<dyn PermissionProvider>,
        source: Box<dyn RecognitionSource>,
    ) -> Self {
        info!(
            "Creating scan session: {} (source: {}, debounce: {:?})",
            config.session_id,
            source.name(),
            config.debounce
        );

        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot {
            session_id: config.session_id.clone(),
            state: SessionState::Idle,
            last_result: None,
        });

        let actor = SessionActor {
            config,
            session: ScanSession::default(),
            created_at: Utc::now(),
            counters: Counters::default(),
            permissions,
            source,
            snapshots: snapshot_tx,
            internal_tx,
            run: 0,
            pump: None,
            next_request: 0,
            inflight: None,
            awaiting: None,
            waiters: Vec::new(),
        };

        let task = tokio::spawn(actor.run(intent_rx, internal_rx));

        Self {
            intents: intent_tx,
            snapshots: snapshot_rx,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    /// Start scanning once camera access is confirmed
    ///
    /// Resolves after the permission question is settled. Calls made while a
    /// permission prompt is pending share that prompt.
    pub async fn request_start(&self) -> Result<IntentOutcome, ScanError> {
        self.send(Intent::Start).await
    }

    /// Stop scanning, keeping the last result
    pub async fn stop(&self) -> Result<IntentOutcome, ScanError> {
        self.send(Intent::Stop).await
    }

    /// Stop if running, resume if paused, start otherwise
    pub async fn toggle(&self) -> Result<IntentOutcome, ScanError> {
        self.send(Intent::Toggle).await
    }

    /// Return to idle and forget the last result
    pub async fn reset(&self) -> Result<IntentOutcome, ScanError> {
        self.send(Intent::Reset).await
    }

    /// Suspend a running session without ending it
    pub async fn pause(&self) -> Result<IntentOutcome, ScanError> {
        self.send(Intent::Pause).await
    }

    /// Continue a paused session
    pub async fn resume(&self) -> Result<IntentOutcome, ScanError> {
        self.send(Intent::Resume).await
    }

    /// Get current session statistics
    pub async fn stats(&self) -> Result<SessionStats, ScanError> {
        let (tx, rx) = oneshot::channel();
        self.intents
            .send(Intent::Stats(tx))
            .map_err(|_| ScanError::ControllerClosed)?;
        rx.await.map_err(|_| ScanError::ControllerClosed)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.snapshots.borrow().state.clone()
    }

    pub fn last_result(&self) -> Option<ScanResult> {
        self.snapshots.borrow().last_result.clone()
    }

    /// Receiver notified on every published change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Stream of snapshots, starting with the current one
    ///
    /// Intermediate snapshots may be skipped when the consumer is slow; the
    /// latest one is always delivered. Ends when the controller exits.
    pub fn updates(&self) -> impl Stream<Item = SessionSnapshot> + Send + 'static {
        let rx = self.snapshots.clone();
        stream::unfold((rx, true), |(mut rx, first)| async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let snapshot = rx.borrow_and_update().clone();
            Some((snapshot, (rx, false)))
        })
    }

    /// Wait until a published snapshot satisfies `predicate`
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<SessionSnapshot, ScanError>
    where
        F: FnMut(&SessionSnapshot) -> bool,
    {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(|snapshot| predicate(snapshot))
            .await
            .map_err(|_| ScanError::ControllerClosed)?;
        Ok(snapshot.clone())
    }

    /// Stop the recognition source and end the controller task
    ///
    /// Other handles report [`ScanError::ControllerClosed`] afterwards.
    /// Calling this more than once is harmless.
    pub async fn shutdown(&self) -> Result<(), ScanError> {
        let (tx, rx) = oneshot::channel();
        if self.intents.send(Intent::Shutdown(tx)).is_ok() {
            // The task may exit before replying if it is already shutting down
            let _ = rx.await;
        }

        let mut handle = self.task.lock().await;
        if let Some(task) = handle.take() {
            if let Err(e) = task.await {
                error!("Scan controller task panicked: {}", e);
            }
        }

        Ok(())
    }

    async fn send<F>(&self, intent: F) -> Result<IntentOutcome, ScanError>
    where
        F: FnOnce(Reply) -> Intent,
    {
        let (tx, rx) = oneshot::channel();
        self.intents
            .send(intent(tx))
            .map_err(|_| ScanError::ControllerClosed)?;
        rx.await.map_err(|_| ScanError::ControllerClosed)
    }
}

#[derive(Debug, Default)]
struct Counters {
    runs_started: usize,
    permission_requests: usize,
    events_accepted: usize,
    events_discarded: usize,
}

/// Single owner of the session, the source and all pending work
struct SessionActor {
    config: SessionConfig,
    session: ScanSession,
    created_at: DateTime<Utc>,
    counters: Counters,
    permissions: Arc<dyn PermissionProvider>,
    source: Box<dyn RecognitionSource>,
    snapshots: watch::Sender<SessionSnapshot>,
    internal_tx: mpsc::UnboundedSender<Internal>,

    /// Generation of the current source run; events carry the run they came from
    run: u64,
    /// Task forwarding source events into the internal queue
    pump: Option<JoinHandle<()>>,

    next_request: u64,
    /// Permission prompt still outstanding, if any
    inflight: Option<u64>,
    /// Prompt the session is currently waiting on
    awaiting: Option<u64>,
    /// Start intents to answer once the prompt settles
    waiters: Vec<Reply>,
}

impl SessionActor {
    async fn run(
        mut self,
        mut intents: mpsc::UnboundedReceiver<Intent>,
        mut internal: mpsc::UnboundedReceiver<Internal>,
    ) {
        info!("Scan controller started: {}", self.config.session_id);

        loop {
            tokio::select! {
                biased;

                intent = intents.recv() => match intent {
                    Some(intent) => {
                        if !self.handle_intent(intent).await {
                            break;
                        }
                    }
                    None => {
                        self.shutdown().await;
                        break;
                    }
                },

                Some(message) = internal.recv() => self.handle_internal(message).await,
            }
        }

        info!("Scan controller stopped: {}", self.config.session_id);
    }

    /// Returns `false` once the controller should exit
    async fn handle_intent(&mut self, intent: Intent) -> bool {
        match intent {
            Intent::Start(reply) => self.request_start(reply).await,
            Intent::Stop(reply) => {
                let outcome = self.stop().await;
                let _ = reply.send(outcome);
            }
            Intent::Toggle(reply) => match self.session.state().clone() {
                SessionState::Running => {
                    let outcome = self.stop().await;
                    let _ = reply.send(outcome);
                }
                SessionState::Paused => self.resume(reply).await,
                _ => self.request_start(reply).await,
            },
            Intent::Reset(reply) => {
                let outcome = self.reset().await;
                let _ = reply.send(outcome);
            }
            Intent::Pause(reply) => {
                let outcome = self.pause().await;
                let _ = reply.send(outcome);
            }
            Intent::Resume(reply) => self.resume(reply).await,
            Intent::Stats(reply) => {
                let _ = reply.send(self.stats());
            }
            Intent::Shutdown(reply) => {
                self.shutdown().await;
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    async fn handle_internal(&mut self, message: Internal) {
        match message {
            Internal::Decode { run, event } => self.on_decode_event(run, event).await,
            Internal::SourceEnded { run } => self.on_source_ended(run).await,
            Internal::PermissionSettled { request, answer } => {
                self.on_permission_settled(request, answer).await
            }
        }
    }

    async fn request_start(&mut self, reply: Reply) {
        if self.session.state().can_start() {
            self.begin_start(reply).await;
        } else if *self.session.state() == SessionState::AwaitingPermission {
            debug!("Start requested while awaiting permission; joining pending request");
            self.waiters.push(reply);
        } else {
            warn!("Scan session already active");
            let _ = reply.send(self.ignored(IgnoreReason::AlreadyActive));
        }
    }

    /// Enter `AwaitingPermission` and settle it as far as possible right away
    async fn begin_start(&mut self, reply: Reply) {
        info!("Starting scan session: {}", self.config.session_id);

        self.transition(SessionState::AwaitingPermission);

        match self.permissions.check_status() {
            PermissionStatus::Authorized => {
                self.start_source().await;
                let _ = reply.send(self.applied());
            }
            PermissionStatus::Denied => {
                warn!("Camera access denied");
                self.transition(SessionState::Failed(FailureReason::PermissionDenied));
                let _ = reply.send(self.applied());
            }
            PermissionStatus::NotDetermined => {
                self.waiters.push(reply);
                self.await_permission();
            }
        }
    }

    /// Wait on the outstanding permission prompt, issuing one if none is in flight
    fn await_permission(&mut self) {
        if let Some(request) = self.inflight {
            debug!("Reusing in-flight permission request {}", request);
            self.awaiting = Some(request);
            return;
        }

        let request = self.next_request;
        self.next_request += 1;
        self.inflight = Some(request);
        self.awaiting = Some(request);
        self.counters.permission_requests += 1;

        let permissions = Arc::clone(&self.permissions);
        let timeout = self.config.permission_timeout;
        let internal_tx = self.internal_tx.clone();

        tokio::spawn(async move {
            let answer = match timeout {
                Some(limit) => tokio::time::timeout(limit, permissions.request_access())
                    .await
                    .map_or(PermissionAnswer::TimedOut, PermissionAnswer::Status),
                None => PermissionAnswer::Status(permissions.request_access().await),
            };

            // The controller may have exited in the meantime
            let _ = internal_tx.send(Internal::PermissionSettled { request, answer });
        });
    }

    async fn on_permission_settled(&mut self, request: u64, answer: PermissionAnswer) {
        if self.inflight == Some(request) {
            self.inflight = None;
        }

        if self.awaiting != Some(request)
            || *self.session.state() != SessionState::AwaitingPermission
        {
            warn!("Discarding stale permission answer for request {}", request);
            return;
        }
        self.awaiting = None;

        match answer {
            PermissionAnswer::Status(PermissionStatus::Authorized) => self.start_source().await,
            PermissionAnswer::Status(status) => {
                warn!("Camera access not granted: {:?}", status);
                self.transition(SessionState::Failed(FailureReason::PermissionDenied));
            }
            PermissionAnswer::TimedOut => {
                warn!("Camera permission prompt timed out");
                self.transition(SessionState::Failed(FailureReason::PermissionTimedOut));
            }
        }

        let outcome = self.applied();
        self.answer_waiters(outcome);
    }

    async fn stop(&mut self) -> IntentOutcome {
        match self.session.state().clone() {
            SessionState::Idle | SessionState::Stopped | SessionState::Failed(_) => {
                return self.ignored(IgnoreReason::NotActive);
            }
            SessionState::Running => self.stop_source().await,
            SessionState::Paused => {}
            SessionState::AwaitingPermission => {
                self.awaiting = None;
            }
        }

        info!("Stopping scan session: {}", self.config.session_id);
        self.transition(SessionState::Stopped);

        let superseded = self.ignored(IgnoreReason::Superseded);
        self.answer_waiters(superseded);

        self.applied()
    }

    async fn reset(&mut self) -> IntentOutcome {
        if *self.session.state() == SessionState::Running {
            self.stop_source().await;
        }
        self.awaiting = None;

        info!("Resetting scan session: {}", self.config.session_id);
        self.transition(SessionState::Idle);

        let superseded = self.ignored(IgnoreReason::Superseded);
        self.answer_waiters(superseded);

        self.applied()
    }

    async fn pause(&mut self) -> IntentOutcome {
        if *self.session.state() != SessionState::Running {
            return self.ignored(IgnoreReason::NotActive);
        }

        self.stop_source().await;
        self.transition(SessionState::Paused);
        info!("Scan session paused");
        self.applied()
    }

    async fn resume(&mut self, reply: Reply) {
        match self.session.state().clone() {
            SessionState::Paused => {}
            SessionState::Running | SessionState::AwaitingPermission => {
                let _ = reply.send(self.ignored(IgnoreReason::AlreadyActive));
                return;
            }
            _ => {
                let _ = reply.send(self.ignored(IgnoreReason::NotActive));
                return;
            }
        }

        if self.permissions.check_status() == PermissionStatus::Authorized {
            info!("Resuming scan session");
            self.start_source().await;
            let _ = reply.send(self.applied());
        } else {
            // Access was revoked while paused
            self.begin_start(reply).await;
        }
    }

    async fn on_decode_event(&mut self, run: u64, event: DecodeEvent) {
        let current_run = run == self.run;

        match debounce::admit(&self.session, &self.config, current_run, &event) {
            Admission::Discard(reason) => {
                self.counters.events_discarded += 1;
                debug!(
                    "Discarding {} event {:?}: {:?}",
                    event.symbology, event.raw_text, reason
                );
            }
            Admission::Accept { stop } => {
                self.counters.events_accepted += 1;
                info!("Scanned {} code: {}", event.symbology, event.raw_text);

                self.session.record(ScanResult::from(event));

                if stop {
                    self.stop_source().await;
                    self.transition(SessionState::Stopped);
                } else {
                    self.publish();
                }
            }
        }
    }

    async fn on_source_ended(&mut self, run: u64) {
        if run != self.run || *self.session.state() != SessionState::Running {
            return;
        }

        warn!("Recognition source '{}' stopped delivering events", self.source.name());
        self.stop_source().await;
        self.transition(SessionState::Stopped);
    }

    async fn start_source(&mut self) {
        match self.source.start().await {
            Ok(rx) => {
                self.run += 1;
                self.counters.runs_started += 1;
                self.spawn_pump(rx);
                self.transition(SessionState::Running);
                info!(
                    "Recognition source '{}' started (run {})",
                    self.source.name(),
                    self.run
                );
            }
            Err(e) => {
                error!("Failed to start recognition source: {}", e);
                self.transition(SessionState::Failed(FailureReason::from(&e)));
            }
        }
    }

    async fn stop_source(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }

        if let Err(e) = self.source.stop().await {
            error!("Failed to stop recognition source: {}", e);
        }
    }

    fn spawn_pump(&mut self, mut rx: mpsc::Receiver<DecodeEvent>) {
        let run = self.run;
        let internal_tx = self.internal_tx.clone();

        self.pump = Some(tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if internal_tx.send(Internal::Decode { run, event }).is_err() {
                    return;
                }
            }
            let _ = internal_tx.send(Internal::SourceEnded { run });
        }));
    }

    async fn shutdown(&mut self) {
        if *self.session.state() == SessionState::Running {
            self.stop_source().await;
        }
        self.awaiting = None;

        let superseded = self.ignored(IgnoreReason::Superseded);
        self.answer_waiters(superseded);
    }

    fn transition(&mut self, state: SessionState) {
        debug!("Scan session {} -> {}", self.session.state(), state);
        self.session.enter(state);
        self.publish();
    }

    fn publish(&self) {
        let snapshot = SessionSnapshot {
            session_id: self.config.session_id.clone(),
            state: self.session.state().clone(),
            last_result: self.session.last_result().cloned(),
        };

        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    fn answer_waiters(&mut self, outcome: IntentOutcome) {
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(outcome.clone());
        }
    }

    fn applied(&self) -> IntentOutcome {
        IntentOutcome::Applied {
            state: self.session.state().clone(),
        }
    }

    fn ignored(&self, reason: IgnoreReason) -> IntentOutcome {
        IntentOutcome::Ignored {
            state: self.session.state().clone(),
            reason,
        }
    }

    fn stats(&self) -> SessionStats {
        SessionStats {
            session_id: self.config.session_id.clone(),
            state: self.session.state().clone(),
            created_at: self.created_at,
            runs_started: self.counters.runs_started,
            permission_requests: self.counters.permission_requests,
            events_accepted: self.counters.events_accepted,
            events_discarded: self.counters.events_discarded,
        }
    }
}
