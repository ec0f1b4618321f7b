use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session queries
        .route("/scanner", get(handlers::get_snapshot))
        .route("/scanner/stats", get(handlers::get_stats))
        .route("/scanner/events", get(handlers::stream_events))
        // Session intents
        .route("/scanner/start", post(handlers::start))
        .route("/scanner/stop", post(handlers::stop))
        .route("/scanner/toggle", post(handlers::toggle))
        .route("/scanner/reset", post(handlers::reset))
        .route("/scanner/pause", post(handlers::pause))
        .route("/scanner/resume", post(handlers::resume))
        // Event injection for the manual source
        .route("/scanner/decode", post(handlers::inject_decode))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        // Browser UIs are served from elsewhere
        .layer(CorsLayer::permissive())
        .with_state(state)
}
