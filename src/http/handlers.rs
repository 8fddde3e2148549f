use super::state::AppState;
use crate::audio::{self, DeviceKind};
use crate::error::RecorderError;
use crate::session::{RecordingOverrides, StartResponse, StopResponse};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DevicesQuery {
    /// `capture` or `playback`; both when absent
    pub kind: Option<DeviceKind>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn status_for(error: &RecorderError) -> StatusCode {
    match error {
        RecorderError::AlreadyRecording | RecorderError::NotRecording => StatusCode::CONFLICT,
        RecorderError::Config(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /recording/start
/// Start a recording; body fields override the stored config for this session
pub async fn start_recording(
    State(state): State<AppState>,
    overrides: Result<Json<RecordingOverrides>, JsonRejection>,
) -> impl IntoResponse {
    let base = state.controller.config();
    let config = match overrides {
        Ok(Json(overrides)) => overrides.apply(&base),
        // No body at all means "use the stored config"
        Err(JsonRejection::MissingJsonContentType(_)) => base,
        Err(rejection) => {
            error!("Rejected start request body: {}", rejection.body_text());
            let response = StartResponse {
                success: false,
                message: rejection.body_text(),
            };
            return (rejection.status(), Json(response)).into_response();
        }
    };

    info!(
        "Start requested (microphone={:?}, system_audio={})",
        config.microphone_id, config.system_audio_enabled
    );

    let result = state.controller.start(config).await;
    let code = match &result {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            error!("Failed to start recording: {}", e);
            status_for(e)
        }
    };

    (code, Json(StartResponse::from_result(&result))).into_response()
}

/// POST /recording/stop
/// Stop the recording and wait for the final file
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    info!("Stop requested");

    let result = state.controller.stop().await;
    let code = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            error!("Failed to stop recording: {}", e);
            status_for(e)
        }
    };

    (code, Json(StopResponse::from_result(&result))).into_response()
}

/// GET /recording/status
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.controller.status()))
}

/// PUT /recording/config
/// Update the defaults used by the next start
pub async fn update_config(
    State(state): State<AppState>,
    Json(overrides): Json<RecordingOverrides>,
) -> impl IntoResponse {
    let config = overrides.apply(&state.controller.config());

    match state.controller.update_config(config.clone()) {
        Ok(()) => (StatusCode::OK, Json(config)).into_response(),
        Err(e) => (
            status_for(&e),
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

/// GET /devices
/// Enumerate audio devices from the native host
pub async fn list_devices(Query(query): Query<DevicesQuery>) -> impl IntoResponse {
    let result = tokio::task::spawn_blocking(move || audio::list_devices(query.kind)).await;

    match result {
        Ok(Ok(devices)) => (StatusCode::OK, Json(devices)).into_response(),
        Ok(Err(e)) => {
            error!("Failed to list devices: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}
