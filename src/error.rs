use serde::Serialize;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the recording engine
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("recording already in progress")]
    AlreadyRecording,

    #[error("no recording in progress")]
    NotRecording,

    #[error("failed to open audio device '{device}': {reason}")]
    DeviceOpenFailed { device: String, reason: String },

    #[error("failed to launch screen encoder: {0}")]
    ProcessLaunchFailed(String),

    #[error("screen encoder did not exit within {0:?}")]
    ProcessExitTimeout(Duration),

    #[error("failed to combine recording: {0}")]
    MuxFailed(String),

    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    FinalizeRetryExhausted {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("background task failed: {0}")]
    Worker(String),
}

impl RecorderError {
    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub fn device(device: impl Into<String>, reason: impl ToString) -> Self {
        Self::DeviceOpenFailed {
            device: device.into(),
            reason: reason.to_string(),
        }
    }
}

// Errors cross the control API as their display string
impl Serialize for RecorderError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<tokio::task::JoinError> for RecorderError {
    fn from(e: tokio::task::JoinError) -> Self {
        RecorderError::Worker(e.to_string())
    }
}

pub type RecorderResult<T> = Result<T, RecorderError>;
