use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{RecorderError, RecorderResult};

/// Directory name used under the documents and temp folders
pub const APP_DIR: &str = "screen-recorder";

/// Per-session recording input
///
/// Supplied before each `start`; the controller keeps the latest one only as
/// the default for the next session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingConfig {
    /// Capture device id; empty means no microphone
    #[serde(default, alias = "microphoneID")]
    pub microphone_id: String,

    #[serde(default)]
    pub system_audio_enabled: bool,

    pub output_dir: PathBuf,

    pub temp_dir: PathBuf,
}

impl RecordingConfig {
    pub fn wants_microphone(&self) -> bool {
        !self.microphone_id.trim().is_empty()
    }

    pub fn validate(&self) -> RecorderResult<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(RecorderError::Config("output directory is empty".to_string()));
        }
        if self.temp_dir.as_os_str().is_empty() {
            return Err(RecorderError::Config("temp directory is empty".to_string()));
        }
        Ok(())
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            microphone_id: String::new(),
            system_audio_enabled: false,
            output_dir: default_output_dir(),
            temp_dir: default_temp_dir(),
        }
    }
}

/// `~/Documents/screen-recorder`
pub fn default_output_dir() -> PathBuf {
    PathBuf::from(shellexpand::tilde(&format!("~/Documents/{}", APP_DIR)).into_owned())
}

/// `<os temp>/screen-recorder`
pub fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join(APP_DIR)
}

/// Partial update of a [`RecordingConfig`]; absent fields keep their value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingOverrides {
    #[serde(default, alias = "microphoneID")]
    pub microphone_id: Option<String>,
    #[serde(default)]
    pub system_audio_enabled: Option<bool>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

impl RecordingOverrides {
    pub fn apply(self, base: &RecordingConfig) -> RecordingConfig {
        RecordingConfig {
            microphone_id: self
                .microphone_id
                .unwrap_or_else(|| base.microphone_id.clone()),
            system_audio_enabled: self
                .system_audio_enabled
                .unwrap_or(base.system_audio_enabled),
            output_dir: self.output_dir.unwrap_or_else(|| base.output_dir.clone()),
            temp_dir: self.temp_dir.unwrap_or_else(|| base.temp_dir.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_microphone_means_none() {
        let mut config = RecordingConfig::default();
        assert!(!config.wants_microphone());
        config.microphone_id = "  ".to_string();
        assert!(!config.wants_microphone());
        config.microphone_id = "USB Mic".to_string();
        assert!(config.wants_microphone());
    }

    #[test]
    fn test_accepts_upper_case_id_alias() {
        let config: RecordingConfig = serde_json::from_str(
            r#"{"microphoneID": "mic", "systemAudioEnabled": true, "outputDir": "/o", "tempDir": "/t"}"#,
        )
        .unwrap();
        assert_eq!(config.microphone_id, "mic");
        assert!(config.system_audio_enabled);
    }

    #[test]
    fn test_overrides_keep_unset_fields() {
        let base = RecordingConfig {
            microphone_id: "mic".to_string(),
            system_audio_enabled: true,
            output_dir: PathBuf::from("/out"),
            temp_dir: PathBuf::from("/tmp/rec"),
        };
        let overrides: RecordingOverrides =
            serde_json::from_str(r#"{"systemAudioEnabled": false}"#).unwrap();
        let merged = overrides.apply(&base);

        assert_eq!(merged.microphone_id, "mic");
        assert!(!merged.system_audio_enabled);
        assert_eq!(merged.output_dir, PathBuf::from("/out"));
    }

    #[test]
    fn test_empty_dirs_are_rejected() {
        let config = RecordingConfig {
            output_dir: PathBuf::new(),
            ..RecordingConfig::default()
        };
        assert!(matches!(config.validate(), Err(RecorderError::Config(_))));
    }
}
