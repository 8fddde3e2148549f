//! Recording state machine
//!
//! `Idle -> Recording -> Processing -> Idle`, or `Processing -> Error` when
//! stopping or finalizing fails. `Error` is not terminal: the next `start`
//! begins a fresh session.
//!
//! Two locks are involved:
//! - `inner` holds the [`Session`] and the live capture components. It is only
//!   held for the duration of a transition and never across an await.
//! - `gate` admits one `start` or `stop` at a time. It is taken with
//!   `try_lock`, so a call that races another transition is refused instead
//!   of queued.

use chrono::Local;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::config::RecordingConfig;
use super::state::{output_path, temp_parts, timestamp, Session, SessionState};
use super::status::RecordingStatus;
use crate::audio::{AudioBackend, AudioCaptureEngine, AudioSource, CaptureSummary};
use crate::error::{RecorderError, RecorderResult};
use crate::mux::{CaptureParts, MediaMuxer, MuxMixPipeline, RetryPolicy};
use crate::video::{ScreenCapture, VideoBackend};

/// Backends the controller drives
#[derive(Clone)]
pub struct RecorderComponents {
    pub audio: Arc<dyn AudioBackend>,
    pub video: Arc<dyn VideoBackend>,
    pub muxer: Arc<dyn MediaMuxer>,
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerSettings {
    /// How long `start` waits for the loopback stream's first frame
    pub readiness_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            readiness_timeout: Duration::from_secs(2),
            retry: RetryPolicy::default(),
        }
    }
}

/// Capture components of the live session
struct ActiveCapture {
    video: Box<dyn ScreenCapture>,
    microphone: Option<AudioCaptureEngine>,
    system_audio: Option<AudioCaptureEngine>,
    /// Fixed at start; later config updates do not move a live session
    output_dir: PathBuf,
}

struct Inner {
    session: Session,
    active: Option<ActiveCapture>,
    config: RecordingConfig,
}

pub struct RecordingController {
    inner: Mutex<Inner>,
    gate: tokio::sync::Mutex<()>,
    components: RecorderComponents,
    pipeline: MuxMixPipeline,
    settings: ControllerSettings,
}

impl RecordingController {
    pub fn new(
        components: RecorderComponents,
        settings: ControllerSettings,
        config: RecordingConfig,
    ) -> Self {
        let pipeline = MuxMixPipeline::new(Arc::clone(&components.muxer), settings.retry);
        Self {
            inner: Mutex::new(Inner {
                session: Session::idle(),
                active: None,
                config,
            }),
            gate: tokio::sync::Mutex::new(()),
            components,
            pipeline,
            settings,
        }
    }

    /// Replace the finalization pipeline (e.g. to inject a file mover)
    pub fn with_pipeline(mut self, pipeline: MuxMixPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Default config for the next `start`
    pub fn config(&self) -> RecordingConfig {
        self.inner.lock().config.clone()
    }

    /// Store `config` as the default for later sessions. A running session
    /// keeps the config it was started with.
    pub fn update_config(&self, config: RecordingConfig) -> RecorderResult<()> {
        config.validate()?;
        info!(
            "Recording config updated: microphone={:?}, system_audio={}, output={}",
            config.microphone_id,
            config.system_audio_enabled,
            config.output_dir.display()
        );
        self.inner.lock().config = config;
        Ok(())
    }

    pub fn status(&self) -> RecordingStatus {
        self.inner.lock().session.status()
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().session.state()
    }

    /// Start a session with the stored config
    pub async fn start_default(&self) -> RecorderResult<()> {
        let config = self.config();
        self.start(config).await
    }

    /// Launch screen capture and the configured audio engines.
    ///
    /// Any component failure tears down what was already launched and
    /// leaves the controller idle.
    pub async fn start(&self, config: RecordingConfig) -> RecorderResult<()> {
        let _gate = self
            .gate
            .try_lock()
            .map_err(|_| RecorderError::AlreadyRecording)?;

        if self.inner.lock().session.state().is_busy() {
            return Err(RecorderError::AlreadyRecording);
        }

        config.validate()?;

        let wall = Local::now();
        let stamp = timestamp(wall);
        let parts = temp_parts(
            &config.temp_dir,
            &stamp,
            config.wants_microphone(),
            config.system_audio_enabled,
        );

        match self.launch(&config, &parts).await {
            Ok(active) => {
                let mut inner = self.inner.lock();
                inner.session = Session::recording(parts, Instant::now(), wall);
                inner.active = Some(active);
                info!(
                    "Recording session {} started: video={}, microphone={:?}, system_audio={:?}",
                    inner.session.id().map(|id| id.to_string()).unwrap_or_default(),
                    inner.session.parts().map(|p| p.video.display().to_string()).unwrap_or_default(),
                    inner.session.parts().and_then(|p| p.microphone.clone()),
                    inner.session.parts().and_then(|p| p.system_audio.clone()),
                );
                Ok(())
            }
            Err(e) => {
                error!("Failed to start recording: {}", e);
                self.inner.lock().session = Session::idle();
                remove_temp_files(&parts).await;
                Err(e)
            }
        }
    }

    async fn launch(
        &self,
        config: &RecordingConfig,
        parts: &CaptureParts,
    ) -> RecorderResult<ActiveCapture> {
        tokio::fs::create_dir_all(&config.temp_dir)
            .await
            .map_err(|e| RecorderError::filesystem(&config.temp_dir, e))?;

        let mut video = self.components.video.create();
        video.start(&parts.video).await?;
        info!("Screen capture started via {}", video.name());

        let microphone = match &parts.microphone {
            Some(path) => {
                let source = AudioSource::Microphone(config.microphone_id.clone());
                match self.launch_engine(source, path).await {
                    Ok(engine) => Some(engine),
                    Err(e) => {
                        abort_video(video.as_mut()).await;
                        return Err(e);
                    }
                }
            }
            None => None,
        };

        let system_audio = match &parts.system_audio {
            Some(path) => match self.launch_engine(AudioSource::SystemLoopback, path).await {
                Ok(engine) => Some(engine),
                Err(e) => {
                    if let Some(mut engine) = microphone {
                        engine.abort();
                    }
                    abort_video(video.as_mut()).await;
                    return Err(e);
                }
            },
            None => None,
        };

        if let Some(engine) = &system_audio {
            let timeout = self.settings.readiness_timeout;
            if engine.readiness().wait(timeout).await {
                debug!("System audio stream is delivering frames");
            } else {
                warn!(
                    "No system audio frames within {:?}, recording continues",
                    timeout
                );
            }
        }

        Ok(ActiveCapture {
            video,
            microphone,
            system_audio,
            output_dir: config.output_dir.clone(),
        })
    }

    async fn launch_engine(
        &self,
        source: AudioSource,
        path: &Path,
    ) -> RecorderResult<AudioCaptureEngine> {
        let mut engine =
            AudioCaptureEngine::new(Arc::clone(&self.components.audio), source, path.to_path_buf());

        // Opening a device blocks until the host reports the stream running
        tokio::task::spawn_blocking(move || engine.start().map(|()| engine)).await?
    }

    /// Stop every component, then combine the temp files.
    ///
    /// Returns the path of the finished recording. Blocks until the encoder
    /// has exited (bounded by its exit timeout) and finalization is done.
    pub async fn stop(&self) -> RecorderResult<PathBuf> {
        let _gate = self
            .gate
            .try_lock()
            .map_err(|_| RecorderError::NotRecording)?;

        let (mut active, parts) = {
            let mut inner = self.inner.lock();
            if inner.session.state() != SessionState::Recording {
                return Err(RecorderError::NotRecording);
            }
            let active = inner.active.take().ok_or(RecorderError::NotRecording)?;
            let parts = inner
                .session
                .parts()
                .cloned()
                .ok_or(RecorderError::NotRecording)?;
            inner.session.begin_processing();
            (active, parts)
        };

        let mut guard = ProcessingGuard::new(&self.inner);

        info!(
            "Stopping recording ({:.1}s captured)",
            self.inner.lock().session.duration().as_secs_f64()
        );

        let output_dir = std::mem::take(&mut active.output_dir);
        let result = match self.quiesce(active).await {
            Ok(()) => match free_output_path(&output_dir, &timestamp(Local::now())).await {
                Ok(output) => self.pipeline.finalize(&parts, &output).await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        let mut inner = self.inner.lock();
        guard.disarm();
        match &result {
            Ok(path) => {
                info!("Recording complete: {}", path.display());
                inner.session.complete(path.clone());
            }
            Err(e) => {
                error!("Recording failed, temp files kept: {}", e);
                inner.session.fail(e.to_string());
            }
        }

        result
    }

    /// Video is signaled first, then the audio engines flush. Every component
    /// is stopped even if an earlier one failed.
    async fn quiesce(&self, active: ActiveCapture) -> RecorderResult<()> {
        let ActiveCapture {
            mut video,
            microphone,
            system_audio,
            ..
        } = active;

        let video_result = video.stop().await;
        if let Err(e) = &video_result {
            warn!("Screen capture did not stop cleanly: {}", e);
        }

        let (microphone, system_audio) =
            futures::future::join(stop_engine(microphone), stop_engine(system_audio)).await;

        video_result?;
        for summary in [microphone, system_audio].into_iter().flatten() {
            let summary = summary?;
            debug!(
                "{} frames ({:.2}s) in {}",
                summary.frames,
                summary.duration_seconds,
                summary.path.display()
            );
        }

        Ok(())
    }
}

async fn stop_engine(engine: Option<AudioCaptureEngine>) -> Option<RecorderResult<CaptureSummary>> {
    let mut engine = engine?;
    let label = engine.source().label();

    let result = match tokio::task::spawn_blocking(move || engine.stop()).await {
        Ok(result) => result,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = &result {
        warn!("Failed to stop {} capture: {}", label, e);
    }
    Some(result)
}

/// First `recording_<stamp>[_n].mp4` not already in `output_dir`
async fn free_output_path(output_dir: &Path, stamp: &str) -> RecorderResult<PathBuf> {
    for suffix in 0u32.. {
        let candidate = output_path(output_dir, stamp, suffix);
        let taken = tokio::fs::try_exists(&candidate)
            .await
            .map_err(|e| RecorderError::filesystem(&candidate, e))?;
        if !taken {
            return Ok(candidate);
        }
        debug!("{} exists, trying the next suffix", candidate.display());
    }
    Err(RecorderError::filesystem(
        output_dir,
        std::io::Error::new(std::io::ErrorKind::AlreadyExists, "no free output name"),
    ))
}

async fn abort_video(video: &mut dyn ScreenCapture) {
    if let Err(e) = video.stop().await {
        warn!("Failed to stop screen capture during rollback: {}", e);
    }
}

async fn remove_temp_files(parts: &CaptureParts) {
    for path in parts.temp_files() {
        match tokio::fs::remove_file(path).await {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
}

/// Moves the session to `Error` if a stop is abandoned mid-way (its future
/// dropped), so the controller never stays stuck in `Processing`.
struct ProcessingGuard<'a> {
    inner: &'a Mutex<Inner>,
    armed: bool,
}

impl<'a> ProcessingGuard<'a> {
    fn new(inner: &'a Mutex<Inner>) -> Self {
        Self { inner, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("Stop was interrupted before finalization finished");
            self.inner.lock().session.fail("stop was interrupted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_output_name_skips_existing_files() {
        let dir = TempDir::new().unwrap();
        let stamp = "20250114_093012";

        let first = free_output_path(dir.path(), stamp).await.unwrap();
        assert_eq!(first, dir.path().join("recording_20250114_093012.mp4"));

        std::fs::write(&first, b"first").unwrap();
        let second = free_output_path(dir.path(), stamp).await.unwrap();
        assert_eq!(second, dir.path().join("recording_20250114_093012_1.mp4"));

        std::fs::write(&second, b"second").unwrap();
        let third = free_output_path(dir.path(), stamp).await.unwrap();
        assert_eq!(third, dir.path().join("recording_20250114_093012_2.mp4"));
    }
}
