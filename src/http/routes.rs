use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Connection control
        .route("/voice/connect", post(handlers::connect_session))
        .route("/voice/disconnect", post(handlers::disconnect_session))
        // Recording control
        .route("/voice/record/start", post(handlers::start_recording))
        .route("/voice/record/stop", post(handlers::stop_recording))
        // Session queries
        .route("/voice/status", get(handlers::get_status))
        .route(
            "/voice/transcript",
            get(handlers::get_transcript).post(handlers::log_message),
        )
        // Feedback
        .route("/voice/feedback", post(handlers::request_feedback))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
