//! Recording session management
//!
//! This module provides the [`RecordingController`] that:
//! - Admits one session at a time
//! - Launches screen capture and the configured audio engines
//! - Stops everything in order and hands the temp files to finalization
//! - Reports live status

mod config;
mod controller;
mod state;
mod status;

pub use config::{
    default_output_dir, default_temp_dir, RecordingConfig, RecordingOverrides, APP_DIR,
};
pub use controller::{ControllerSettings, RecorderComponents, RecordingController};
pub use state::{output_path, temp_parts, timestamp, Session, SessionState, TIMESTAMP_FORMAT};
pub use status::{RecordingStatus, StartResponse, StopResponse};
