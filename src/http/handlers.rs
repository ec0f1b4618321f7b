use super::state::AppState;
use crate::error::ScanError;
use crate::recognition::{DecodeEvent, Symbology};
use crate::session::IntentOutcome;
use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct DecodeRequest {
    /// Decoded text
    pub text: String,

    /// Code format (default: qr)
    pub symbology: Option<Symbology>,
}

#[derive(Debug, Serialize)]
pub struct DecodeResponse {
    pub delivered: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

fn scan_error_response(err: ScanError) -> Response {
    let status = match err {
        ScanError::ControllerClosed => StatusCode::SERVICE_UNAVAILABLE,
        ScanError::NotInjectable => StatusCode::CONFLICT,
    };
    error!("Scanner request failed: {}", err);
    error_response(status, err)
}

fn intent_response(intent: &str, result: Result<IntentOutcome, ScanError>) -> Response {
    match result {
        Ok(outcome) => {
            info!("Intent {} -> {:?}", intent, outcome);
            (StatusCode::OK, Json(outcome)).into_response()
        }
        Err(e) => scan_error_response(e),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /scanner
/// Current session snapshot
pub async fn get_snapshot(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.controller.snapshot()))
}

/// GET /scanner/stats
/// Session statistics
pub async fn get_stats(State(state): State<AppState>) -> Response {
    match state.controller.stats().await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => scan_error_response(e),
    }
}

/// GET /scanner/events
/// Server-sent events carrying session snapshots
pub async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = state
        .controller
        .updates()
        .map(|snapshot| Event::default().event("snapshot").json_data(snapshot));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// POST /scanner/start
pub async fn start(State(state): State<AppState>) -> Response {
    intent_response("start", state.controller.request_start().await)
}

/// POST /scanner/stop
pub async fn stop(State(state): State<AppState>) -> Response {
    intent_response("stop", state.controller.stop().await)
}

/// POST /scanner/toggle
pub async fn toggle(State(state): State<AppState>) -> Response {
    intent_response("toggle", state.controller.toggle().await)
}

/// POST /scanner/reset
pub async fn reset(State(state): State<AppState>) -> Response {
    intent_response("reset", state.controller.reset().await)
}

/// POST /scanner/pause
pub async fn pause(State(state): State<AppState>) -> Response {
    intent_response("pause", state.controller.pause().await)
}

/// POST /scanner/resume
pub async fn resume(State(state): State<AppState>) -> Response {
    intent_response("resume", state.controller.resume().await)
}

/// POST /scanner/decode
/// Feed a decode event to the manual recognition source
pub async fn inject_decode(
    State(state): State<AppState>,
    Json(req): Json<DecodeRequest>,
) -> Response {
    let Some(injector) = state.injector.as_ref() else {
        return scan_error_response(ScanError::NotInjectable);
    };

    let event = DecodeEvent::new(req.text, req.symbology.unwrap_or(Symbology::Qr));
    if injector.inject(event).await {
        (StatusCode::ACCEPTED, Json(DecodeResponse { delivered: true })).into_response()
    } else {
        warn!("Decode event not delivered: recognition source is not running");
        error_response(StatusCode::CONFLICT, "recognition source is not running")
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
