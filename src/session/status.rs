use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::state::SessionState;
use crate::error::RecorderResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub success: bool,
    pub message: String,
}

impl StartResponse {
    pub fn from_result(result: &RecorderResult<()>) -> Self {
        match result {
            Ok(()) => Self {
                success: true,
                message: "Recording started".to_string(),
            },
            Err(e) => Self {
                success: false,
                message: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopResponse {
    pub success: bool,
    pub message: String,
    pub file_path: Option<PathBuf>,
}

impl StopResponse {
    pub fn from_result(result: &RecorderResult<PathBuf>) -> Self {
        match result {
            Ok(path) => Self {
                success: true,
                message: format!("Recording saved to {}", path.display()),
                file_path: Some(path.clone()),
            },
            Err(e) => Self {
                success: false,
                message: e.to_string(),
                file_path: None,
            },
        }
    }
}

/// Snapshot returned by `status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingStatus {
    pub state: SessionState,
    pub duration_seconds: f64,
    pub file_path: Option<PathBuf>,
    pub error: Option<String>,
}
