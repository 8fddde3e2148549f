// Test doubles for the capture, encoder and muxer seams
//
// They let the controller and pipeline run end to end without audio
// hardware or an encoder binary.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use screen_recorder::audio::{ActiveStream, AudioBackend, AudioSource, AudioStreamSpec, FrameSink};
use screen_recorder::mux::MediaMuxer;
use screen_recorder::session::{ControllerSettings, RecorderComponents, RecordingConfig};
use screen_recorder::video::{ScreenCapture, VideoBackend};
use screen_recorder::{RecorderError, RecorderResult, RecordingController, RetryPolicy};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tempfile::TempDir;

pub const FAKE_VIDEO: &[u8] = b"fake video container";

// ============================================================================
// Audio
// ============================================================================

/// Pushes 10ms of a constant sample every 10ms while open
#[derive(Default)]
pub struct FakeAudioBackend {
    pub fail_microphone: bool,
    pub fail_loopback: bool,
    pub opened: AtomicUsize,
    pub released: Arc<AtomicUsize>,
    pub tones: AtomicUsize,
}

impl FakeAudioBackend {
    pub fn failing_microphone() -> Self {
        Self {
            fail_microphone: true,
            ..Self::default()
        }
    }

    pub fn failing_loopback() -> Self {
        Self {
            fail_loopback: true,
            ..Self::default()
        }
    }

    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn release_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

struct FakeStream {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    released: Arc<AtomicUsize>,
}

impl ActiveStream for FakeStream {
    fn stop(mut self: Box<Self>) -> RecorderResult<()> {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| RecorderError::Worker("fake stream panicked".to_string()))?;
        }
        self.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl AudioBackend for FakeAudioBackend {
    fn open(
        &self,
        source: &AudioSource,
        spec: AudioStreamSpec,
        sink: FrameSink,
    ) -> RecorderResult<Box<dyn ActiveStream>> {
        let fail = match source {
            AudioSource::Microphone(_) => self.fail_microphone,
            AudioSource::SystemLoopback => self.fail_loopback,
        };
        if fail {
            return Err(RecorderError::device(source.label(), "device unplugged"));
        }

        self.opened.fetch_add(1, Ordering::SeqCst);

        let level: i16 = if source.is_loopback() { 3000 } else { 1000 };
        let frames = spec.sample_rate as usize / 100;
        let chunk = vec![level; frames * spec.channels as usize];

        sink.push_i16(&chunk);

        let stop = Arc::new(AtomicBool::new(false));
        let worker = {
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    std::thread::sleep(Duration::from_millis(10));
                    sink.push_i16(&chunk);
                }
            })
        };

        Ok(Box::new(FakeStream {
            stop,
            worker: Some(worker),
            released: Arc::clone(&self.released),
        }))
    }

    fn play_trigger_tone(&self) -> RecorderResult<()> {
        self.tones.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

// ============================================================================
// Video
// ============================================================================

#[derive(Default)]
pub struct VideoLog {
    pub events: Mutex<Vec<String>>,
    pub running: AtomicBool,
}

impl VideoLog {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Writes [`FAKE_VIDEO`] to its output path when stopped
#[derive(Default)]
pub struct FakeVideoBackend {
    pub log: Arc<VideoLog>,
    pub fail_start: bool,
    pub fail_stop: bool,
}

struct FakeScreenCapture {
    log: Arc<VideoLog>,
    fail_start: bool,
    fail_stop: bool,
    output: Option<PathBuf>,
}

#[async_trait]
impl ScreenCapture for FakeScreenCapture {
    async fn start(&mut self, output_path: &Path) -> RecorderResult<()> {
        self.log.events.lock().push("video:start".to_string());
        if self.fail_start {
            return Err(RecorderError::ProcessLaunchFailed("no encoder".to_string()));
        }
        self.output = Some(output_path.to_path_buf());
        self.log.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) -> RecorderResult<()> {
        self.log.events.lock().push("video:stop".to_string());
        let output = self.output.take().ok_or(RecorderError::NotRecording)?;
        self.log.running.store(false, Ordering::SeqCst);

        if self.fail_stop {
            return Err(RecorderError::ProcessExitTimeout(Duration::from_millis(1)));
        }

        tokio::fs::write(&output, FAKE_VIDEO)
            .await
            .map_err(|e| RecorderError::filesystem(&output, e))
    }

    fn is_running(&mut self) -> bool {
        self.log.is_running()
    }

    fn name(&self) -> &str {
        "fake-video"
    }
}

impl VideoBackend for FakeVideoBackend {
    fn create(&self) -> Box<dyn ScreenCapture> {
        Box::new(FakeScreenCapture {
            log: Arc::clone(&self.log),
            fail_start: self.fail_start,
            fail_stop: self.fail_stop,
            output: None,
        })
    }
}

// ============================================================================
// Muxer
// ============================================================================

/// Writes the video bytes followed by the audio file name
#[derive(Default)]
pub struct FakeMuxer {
    pub fail: bool,
    pub calls: Mutex<Vec<(PathBuf, PathBuf, PathBuf)>>,
}

impl FakeMuxer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(PathBuf, PathBuf, PathBuf)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl MediaMuxer for FakeMuxer {
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> RecorderResult<()> {
        self.calls
            .lock()
            .push((video.to_path_buf(), audio.to_path_buf(), output.to_path_buf()));

        if self.fail {
            return Err(RecorderError::MuxFailed("synthetic mux failure".to_string()));
        }

        let mut bytes = tokio::fs::read(video)
            .await
            .map_err(|e| RecorderError::filesystem(video, e))?;
        if !audio.exists() {
            return Err(RecorderError::MuxFailed(format!("{} missing", audio.display())));
        }
        bytes.extend_from_slice(audio.to_string_lossy().as_bytes());

        tokio::fs::write(output, bytes)
            .await
            .map_err(|e| RecorderError::filesystem(output, e))
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub dir: TempDir,
    pub audio: Arc<FakeAudioBackend>,
    pub video: Arc<FakeVideoBackend>,
    pub muxer: Arc<FakeMuxer>,
    pub controller: Arc<RecordingController>,
}

impl Harness {
    pub fn new(audio: FakeAudioBackend, video: FakeVideoBackend, muxer: FakeMuxer) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let audio = Arc::new(audio);
        let video = Arc::new(video);
        let muxer = Arc::new(muxer);

        let components = RecorderComponents {
            audio: audio.clone(),
            video: video.clone(),
            muxer: muxer.clone(),
        };
        let settings = ControllerSettings {
            readiness_timeout: Duration::from_millis(500),
            retry: RetryPolicy::new(3, Duration::from_millis(1)),
        };
        let config = RecordingConfig {
            microphone_id: String::new(),
            system_audio_enabled: false,
            output_dir: dir.path().join("out"),
            temp_dir: dir.path().join("tmp"),
        };

        let controller = Arc::new(RecordingController::new(components, settings, config));

        Self {
            dir,
            audio,
            video,
            muxer,
            controller,
        }
    }

    pub fn default_fakes() -> Self {
        Self::new(
            FakeAudioBackend::default(),
            FakeVideoBackend::default(),
            FakeMuxer::default(),
        )
    }

    pub fn config(&self, microphone: &str, system_audio: bool) -> RecordingConfig {
        RecordingConfig {
            microphone_id: microphone.to_string(),
            system_audio_enabled: system_audio,
            ..self.controller.config()
        }
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.dir.path().join("tmp")
    }

    pub fn temp_files(&self) -> Vec<PathBuf> {
        list_files(&self.temp_dir())
    }
}

pub fn list_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok()).map(|e| e.path()).collect())
        .unwrap_or_default();
    files.sort();
    files
}

/// Write a WAV of constant `level` in the capture format
pub fn write_constant_wav(path: &Path, seconds: f64, level: i16) -> anyhow::Result<()> {
    let spec = AudioStreamSpec::CAPTURE;
    let mut writer = hound::WavWriter::create(path, spec.wav_spec())?;
    let frames = (seconds * spec.sample_rate as f64).round() as usize;
    for _ in 0..frames * spec.channels as usize {
        writer.write_sample(level)?;
    }
    writer.finalize()?;
    Ok(())
}
