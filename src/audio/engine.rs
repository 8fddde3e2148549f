use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use super::backend::{ActiveStream, AudioBackend, AudioSource, AudioStreamSpec};
use super::buffer::{CaptureBuffer, FrameSink};
use super::file::write_pcm_wav;
use crate::error::{RecorderError, RecorderResult};

/// What a finished capture left on disk
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSummary {
    pub path: PathBuf,
    pub frames: u64,
    pub duration_seconds: f64,
}

/// Handle for waiting on an engine's first frame
#[derive(Debug, Clone)]
pub struct Readiness(watch::Receiver<bool>);

impl Readiness {
    pub fn is_ready(&self) -> bool {
        *self.0.borrow()
    }

    /// Wait until the first frame arrives, up to `timeout`
    pub async fn wait(mut self, timeout: Duration) -> bool {
        matches!(
            tokio::time::timeout(timeout, self.0.wait_for(|ready| *ready)).await,
            Ok(Ok(_))
        )
    }
}

/// Captures one audio device into memory and serializes it to WAV on stop
///
/// The device stream (and the host context it was opened with) lives only
/// between `start` and `stop`.
pub struct AudioCaptureEngine {
    source: AudioSource,
    output_path: PathBuf,
    backend: Arc<dyn AudioBackend>,
    buffer: Arc<CaptureBuffer>,
    ready_tx: Arc<watch::Sender<bool>>,
    ready_rx: watch::Receiver<bool>,
    stream: Option<Box<dyn ActiveStream>>,
}

impl AudioCaptureEngine {
    pub fn new(backend: Arc<dyn AudioBackend>, source: AudioSource, output_path: PathBuf) -> Self {
        let (ready_tx, ready_rx) = watch::channel(false);
        Self {
            source,
            output_path,
            backend,
            buffer: Arc::new(CaptureBuffer::new(AudioStreamSpec::CAPTURE)),
            ready_tx: Arc::new(ready_tx),
            ready_rx,
            stream: None,
        }
    }

    pub fn source(&self) -> &AudioSource {
        &self.source
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn is_capturing(&self) -> bool {
        self.stream.is_some()
    }

    /// Frames accumulated so far
    pub fn captured_frames(&self) -> usize {
        self.buffer.frame_count()
    }

    /// Open the device and start capturing.
    ///
    /// For system audio this also fires the trigger tone; playback runs in
    /// the background.
    pub fn start(&mut self) -> RecorderResult<()> {
        if self.stream.is_some() {
            return Err(RecorderError::AlreadyRecording);
        }

        self.buffer.clear();
        self.ready_tx.send_replace(false);

        info!(
            "Starting {} capture via {} ({}Hz, {} channels)",
            self.source.label(),
            self.backend.name(),
            self.buffer.spec().sample_rate,
            self.buffer.spec().channels
        );

        let sink = FrameSink::new(Arc::clone(&self.buffer), Arc::clone(&self.ready_tx));
        let stream = self.backend.open(&self.source, self.buffer.spec(), sink)?;
        self.stream = Some(stream);

        if self.source.is_loopback() {
            if let Err(e) = self.backend.play_trigger_tone() {
                warn!("Trigger tone failed, loopback may start late: {}", e);
            }
        }

        Ok(())
    }

    /// Readiness signal: flips to true once the first frame lands
    pub fn readiness(&self) -> Readiness {
        Readiness(self.ready_rx.clone())
    }

    /// Stop the device and write the accumulated audio to the output path.
    ///
    /// A second call returns `NotRecording` without touching anything.
    pub fn stop(&mut self) -> RecorderResult<CaptureSummary> {
        let stream = self.stream.take().ok_or(RecorderError::NotRecording)?;

        let released = stream.stop();
        let pcm = self.buffer.drain();

        if let Err(e) = &released {
            warn!("Failed to release {} device cleanly: {}", self.source.label(), e);
        }

        let spec = self.buffer.spec();
        let frames = write_pcm_wav(&self.output_path, spec, &pcm)?;

        info!(
            "{} capture stopped: {} frames written to {}",
            self.source.label(),
            frames,
            self.output_path.display()
        );

        Ok(CaptureSummary {
            path: self.output_path.clone(),
            frames,
            duration_seconds: frames as f64 / spec.sample_rate as f64,
        })
    }

    /// Release the device and discard captured audio without writing a file
    pub fn abort(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.stop() {
                warn!("Failed to release {} device: {}", self.source.label(), e);
            }
        }
        self.buffer.clear();
    }
}

impl Drop for AudioCaptureEngine {
    fn drop(&mut self) {
        if self.stream.is_some() {
            warn!("{} engine dropped while capturing", self.source.label());
            self.abort();
        }
    }
}
