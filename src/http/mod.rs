//! HTTP API for observing and driving the scan session
//!
//! This module provides a REST API for a UI layer:
//! - GET /scanner - Current session snapshot
//! - GET /scanner/stats - Session statistics
//! - GET /scanner/events - Server-sent snapshot stream
//! - POST /scanner/{start,stop,toggle,reset,pause,resume} - Session intents
//! - POST /scanner/decode - Inject a decode event (manual source only)
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use handlers::DecodeRequest;
pub use routes::create_router;
pub use state::AppState;
