// Integration tests for the audio capture engine
//
// These tests verify the engine lifecycle against a fake audio host:
// start/stop guards, readiness and the WAV written on stop.

mod common;

use anyhow::Result;
use common::FakeAudioBackend;
use screen_recorder::audio::{AudioCaptureEngine, AudioFile, AudioSource};
use screen_recorder::RecorderError;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn engine(backend: &Arc<FakeAudioBackend>, source: AudioSource, dir: &TempDir) -> AudioCaptureEngine {
    AudioCaptureEngine::new(backend.clone(), source, dir.path().join("audio.wav"))
}

#[tokio::test]
async fn test_stop_writes_canonical_wav() -> Result<()> {
    let dir = TempDir::new()?;
    let backend = Arc::new(FakeAudioBackend::default());
    let mut engine = engine(&backend, AudioSource::Microphone("mic".into()), &dir);

    engine.start()?;
    assert!(engine.is_capturing());
    tokio::time::sleep(Duration::from_millis(50)).await;

    let summary = engine.stop()?;
    assert!(!engine.is_capturing());
    assert_eq!(backend.release_count(), 1);

    let audio = AudioFile::open(&summary.path)?;
    assert_eq!(audio.sample_rate, 44_100);
    assert_eq!(audio.channels, 2);
    assert_eq!(audio.frames as u64, summary.frames);
    assert!(summary.frames >= 441, "at least the first 10ms block");

    let mut reader = hound::WavReader::open(&summary.path)?;
    assert_eq!(reader.spec().bits_per_sample, 16);
    let first: i16 = reader.samples::<i16>().next().transpose()?.unwrap_or_default();
    assert_eq!(first, 1000);

    Ok(())
}

#[tokio::test]
async fn test_double_stop_is_an_error_not_a_crash() -> Result<()> {
    let dir = TempDir::new()?;
    let backend = Arc::new(FakeAudioBackend::default());
    let mut engine = engine(&backend, AudioSource::Microphone("mic".into()), &dir);

    engine.start()?;
    engine.stop()?;

    let err = engine.stop().unwrap_err();
    assert!(matches!(err, RecorderError::NotRecording));
    assert_eq!(backend.release_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_double_start_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let backend = Arc::new(FakeAudioBackend::default());
    let mut engine = engine(&backend, AudioSource::Microphone("mic".into()), &dir);

    engine.start()?;
    let err = engine.start().unwrap_err();
    assert!(matches!(err, RecorderError::AlreadyRecording));
    assert_eq!(backend.open_count(), 1);

    engine.abort();
    Ok(())
}

#[tokio::test]
async fn test_device_open_failure_leaves_engine_idle() -> Result<()> {
    let dir = TempDir::new()?;
    let backend = Arc::new(FakeAudioBackend::failing_microphone());
    let mut engine = engine(&backend, AudioSource::Microphone("mic".into()), &dir);

    let err = engine.start().unwrap_err();
    assert!(matches!(err, RecorderError::DeviceOpenFailed { .. }));
    assert!(!engine.is_capturing());
    assert!(!dir.path().join("audio.wav").exists());
    Ok(())
}

#[tokio::test]
async fn test_loopback_fires_tone_and_signals_readiness() -> Result<()> {
    let dir = TempDir::new()?;
    let backend = Arc::new(FakeAudioBackend::default());
    let mut engine = engine(&backend, AudioSource::SystemLoopback, &dir);

    let readiness = engine.readiness();
    assert!(!readiness.is_ready());

    engine.start()?;
    assert_eq!(backend.tones.load(Ordering::SeqCst), 1);
    assert!(engine.readiness().wait(Duration::from_millis(500)).await);

    engine.stop()?;
    Ok(())
}

#[tokio::test]
async fn test_dropping_a_capturing_engine_releases_the_device() -> Result<()> {
    let dir = TempDir::new()?;
    let backend = Arc::new(FakeAudioBackend::default());

    {
        let mut engine = engine(&backend, AudioSource::Microphone("mic".into()), &dir);
        engine.start()?;
    }

    assert_eq!(backend.release_count(), 1);
    assert!(!dir.path().join("audio.wav").exists());
    Ok(())
}
