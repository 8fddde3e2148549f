use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::audio::AudioBackendFactory;
use crate::mux::{FfmpegMuxer, RetryPolicy};
use crate::session::{
    default_output_dir, default_temp_dir, ControllerSettings, RecorderComponents,
    RecordingConfig,
};
use crate::video::{CapturePlatform, EncoderSettings, FfmpegVideoBackend};

/// Default config file, resolved relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/screen-recorder";

/// Environment variable prefix, e.g. `SCREEN_RECORDER__ENCODER__FRAMERATE=60`
pub const ENV_PREFIX: &str = "SCREEN_RECORDER";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub recording: RecordingSection,
    pub encoder: EncoderSection,
    pub finalize: FinalizeSection,
    pub audio: AudioSection,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordingSection {
    pub output_dir: String,
    pub temp_dir: String,
    pub microphone_id: String,
    pub system_audio_enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncoderSection {
    pub program: String,
    pub framerate: u32,
    pub preset: String,
    pub pixel_format: String,
    /// Overrides the compile-target platform when set
    pub platform: Option<CapturePlatform>,
    pub display: String,
    pub startup_probe_ms: u64,
    pub exit_timeout_ms: u64,
    pub grace_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FinalizeSection {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioSection {
    pub readiness_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Config {
    /// Defaults, then the optional file at `path`, then environment variables
    pub fn load(path: &str) -> Result<Self> {
        let settings = Self::builder()?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| format!("Failed to load configuration from {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Built-in defaults only
    pub fn defaults() -> Result<Self> {
        Ok(Self::builder()?.build()?.try_deserialize()?)
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        let encoder = EncoderSettings::default();
        let retry = RetryPolicy::default();

        Ok(config::Config::builder()
            .set_default(
                "recording.output_dir",
                default_output_dir().to_string_lossy().to_string(),
            )?
            .set_default(
                "recording.temp_dir",
                default_temp_dir().to_string_lossy().to_string(),
            )?
            .set_default("recording.microphone_id", "")?
            .set_default("recording.system_audio_enabled", false)?
            .set_default("encoder.program", "ffmpeg")?
            .set_default("encoder.framerate", encoder.framerate as i64)?
            .set_default("encoder.preset", encoder.preset)?
            .set_default("encoder.pixel_format", encoder.pixel_format)?
            .set_default("encoder.display", encoder.display)?
            .set_default("encoder.startup_probe_ms", 250)?
            .set_default("encoder.exit_timeout_ms", 10_000)?
            .set_default("encoder.grace_delay_ms", 500)?
            .set_default("finalize.max_attempts", retry.max_attempts as i64)?
            .set_default("finalize.initial_delay_ms", 100)?
            .set_default("audio.readiness_timeout_ms", 2_000)?
            .set_default("http.bind", "127.0.0.1")?
            .set_default("http.port", 8080)?)
    }

    pub fn platform(&self) -> CapturePlatform {
        self.encoder.platform.unwrap_or_else(CapturePlatform::current)
    }

    pub fn encoder_settings(&self) -> EncoderSettings {
        EncoderSettings {
            program: expand_path(&self.encoder.program),
            framerate: self.encoder.framerate,
            preset: self.encoder.preset.clone(),
            pixel_format: self.encoder.pixel_format.clone(),
            display: self.encoder.display.clone(),
            startup_probe: Duration::from_millis(self.encoder.startup_probe_ms),
            exit_timeout: Duration::from_millis(self.encoder.exit_timeout_ms),
            grace_delay: Duration::from_millis(self.encoder.grace_delay_ms),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.finalize.max_attempts,
            Duration::from_millis(self.finalize.initial_delay_ms),
        )
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            readiness_timeout: Duration::from_millis(self.audio.readiness_timeout_ms),
            retry: self.retry_policy(),
        }
    }

    /// Default per-session config, with `~` expanded
    pub fn recording_config(&self) -> RecordingConfig {
        RecordingConfig {
            microphone_id: self.recording.microphone_id.clone(),
            system_audio_enabled: self.recording.system_audio_enabled,
            output_dir: expand_path(&self.recording.output_dir),
            temp_dir: expand_path(&self.recording.temp_dir),
        }
    }

    /// Native audio host, ffmpeg screen capture and ffmpeg muxer
    pub fn components(&self) -> RecorderComponents {
        let encoder = self.encoder_settings();
        let muxer = FfmpegMuxer::new(encoder.program.clone());
        RecorderComponents {
            audio: AudioBackendFactory::native(),
            video: Arc::new(FfmpegVideoBackend::new(self.platform(), encoder)),
            muxer: Arc::new(muxer),
        }
    }
}

fn expand_path(value: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(value).into_owned())
}
