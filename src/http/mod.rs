//! HTTP API server for external control (the training app's browser shell)
//!
//! This module provides a REST API for driving the one voice session:
//! - POST /voice/connect, /voice/disconnect: connection lifecycle
//! - POST /voice/record/start, /voice/record/stop: recording control
//! - GET /voice/status, /voice/transcript: session queries
//! - POST /voice/feedback: transcript feedback

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
