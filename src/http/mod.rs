//! HTTP API server for external control
//!
//! This module provides a REST API for the recording controller:
//! - POST /recording/start - Start a recording (optional config overrides)
//! - POST /recording/stop - Stop and finalize the recording
//! - GET /recording/status - Query session status
//! - PUT /recording/config - Update the default recording config
//! - GET /devices - List audio devices

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
