use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::status::RecordingStatus;
use crate::mux::CaptureParts;

/// Sortable to the second, e.g. `20250114_093012`
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Recording,
    Processing,
    Error,
}

impl SessionState {
    /// Whether a session is live and a new one must be refused
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionState::Recording | SessionState::Processing)
    }
}

pub fn timestamp(at: DateTime<Local>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Temp file layout for a session started at `stamp`
pub fn temp_parts(
    temp_dir: &Path,
    stamp: &str,
    with_microphone: bool,
    with_system_audio: bool,
) -> CaptureParts {
    CaptureParts {
        video: temp_dir.join(format!("video_{}.mp4", stamp)),
        microphone: with_microphone.then(|| temp_dir.join(format!("audio_{}.wav", stamp))),
        system_audio: with_system_audio
            .then(|| temp_dir.join(format!("system_audio_{}.wav", stamp))),
        mixed_audio: temp_dir.join(format!("mixed_audio_{}.wav", stamp)),
    }
}

/// Final deliverable path for a session stopped at `stamp`. A non-zero
/// `suffix` separates sessions stopped within the same second.
pub fn output_path(output_dir: &Path, stamp: &str, suffix: u32) -> PathBuf {
    if suffix == 0 {
        output_dir.join(format!("recording_{}.mp4", stamp))
    } else {
        output_dir.join(format!("recording_{}_{}.mp4", stamp, suffix))
    }
}

/// One recording attempt. Mutated only by the controller under its lock.
#[derive(Debug, Clone)]
pub struct Session {
    id: Option<Uuid>,
    state: SessionState,
    started_at: Option<Instant>,
    start_timestamp: Option<DateTime<Local>>,
    /// Set when recording ends so status stops counting
    recorded: Option<Duration>,
    parts: Option<CaptureParts>,
    final_output_path: Option<PathBuf>,
    last_error: Option<String>,
}

impl Session {
    pub fn idle() -> Self {
        Self {
            id: None,
            state: SessionState::Idle,
            started_at: None,
            start_timestamp: None,
            recorded: None,
            parts: None,
            final_output_path: None,
            last_error: None,
        }
    }

    pub fn recording(parts: CaptureParts, started_at: Instant, wall: DateTime<Local>) -> Self {
        Self {
            id: Some(Uuid::new_v4()),
            state: SessionState::Recording,
            started_at: Some(started_at),
            start_timestamp: Some(wall),
            recorded: None,
            parts: Some(parts),
            final_output_path: None,
            last_error: None,
        }
    }

    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn start_timestamp(&self) -> Option<DateTime<Local>> {
        self.start_timestamp
    }

    pub fn parts(&self) -> Option<&CaptureParts> {
        self.parts.as_ref()
    }

    pub fn final_output_path(&self) -> Option<&Path> {
        self.final_output_path.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Live while recording, frozen afterwards
    pub fn duration(&self) -> Duration {
        match (self.state, self.recorded, self.started_at) {
            (SessionState::Recording, _, Some(started)) => started.elapsed(),
            (_, Some(recorded), _) => recorded,
            _ => Duration::ZERO,
        }
    }

    pub fn begin_processing(&mut self) {
        self.recorded = Some(self.duration());
        self.state = SessionState::Processing;
    }

    /// Processing -> Idle: temp files are gone, the deliverable exists
    pub fn complete(&mut self, output: PathBuf) {
        self.state = SessionState::Idle;
        self.parts = None;
        self.final_output_path = Some(output);
        self.last_error = None;
    }

    /// Processing -> Error: temp paths are kept for inspection
    pub fn fail(&mut self, error: impl Into<String>) {
        if self.recorded.is_none() {
            self.recorded = Some(self.duration());
        }
        self.state = SessionState::Error;
        self.last_error = Some(error.into());
    }

    pub fn status(&self) -> RecordingStatus {
        RecordingStatus {
            state: self.state,
            duration_seconds: self.duration().as_secs_f64(),
            file_path: self.final_output_path.clone(),
            error: self.last_error.clone(),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::idle()
    }
}
