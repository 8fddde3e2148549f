// Integration tests for the screen encoder process lifecycle
//
// Small shell scripts stand in for the encoder. They receive the real
// argument list, so the last argument is the output path.

#![cfg(unix)]

use anyhow::Result;
use screen_recorder::video::{CapturePlatform, EncoderSettings, ScreenCapture, VideoCaptureProcess};
use screen_recorder::RecorderError;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Waits for `q` on stdin, then writes the output file and exits
const GRACEFUL: &str = "#!/bin/sh\nfor last; do :; done\nread -r cmd\nprintf 'video' > \"$last\"\n";

/// Ignores every shutdown request
const STUBBORN: &str = "#!/bin/sh\nexec sleep 30\n";

// Scripts are written once, before any test spawns a child, so no child
// inherits a script's write handle
fn scripts() -> &'static Path {
    static DIR: OnceLock<TempDir> = OnceLock::new();
    DIR.get_or_init(|| {
        let dir = TempDir::new().expect("script dir");
        for (name, body) in [("graceful.sh", GRACEFUL), ("stubborn.sh", STUBBORN)] {
            let path = dir.path().join(name);
            std::fs::write(&path, body).expect("write script");
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .expect("chmod script");
        }
        dir
    })
    .path()
}

fn settings(program: PathBuf) -> EncoderSettings {
    EncoderSettings {
        program,
        startup_probe: Duration::from_millis(150),
        exit_timeout: Duration::from_millis(500),
        grace_delay: Duration::from_millis(10),
        ..EncoderSettings::default()
    }
}

#[tokio::test]
async fn test_graceful_stop_lets_encoder_finish_file() -> Result<()> {
    let program = scripts().join("graceful.sh");
    let out = TempDir::new()?;
    let output = out.path().join("video.mp4");

    let mut process = VideoCaptureProcess::new(CapturePlatform::Generic, settings(program));
    process.start(&output).await?;
    assert!(process.is_running());

    process.stop().await?;

    assert!(!process.is_running());
    assert_eq!(std::fs::read_to_string(&output)?, "video");
    Ok(())
}

#[tokio::test]
async fn test_stop_is_bounded_and_kills_stuck_encoder() -> Result<()> {
    let program = scripts().join("stubborn.sh");
    let out = TempDir::new()?;

    let mut process = VideoCaptureProcess::new(CapturePlatform::Generic, settings(program));
    process.start(&out.path().join("video.mp4")).await?;

    let started = Instant::now();
    let err = process.stop().await.unwrap_err();

    assert!(matches!(err, RecorderError::ProcessExitTimeout(_)));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(!process.is_running());
    Ok(())
}

#[tokio::test]
async fn test_encoder_exiting_at_startup_fails_start() -> Result<()> {
    scripts();
    let out = TempDir::new()?;

    let mut process =
        VideoCaptureProcess::new(CapturePlatform::Generic, settings(PathBuf::from("false")));
    let err = process.start(&out.path().join("video.mp4")).await.unwrap_err();

    assert!(matches!(err, RecorderError::ProcessLaunchFailed(_)));
    assert!(!process.is_running());
    Ok(())
}

#[tokio::test]
async fn test_missing_encoder_binary_fails_start() -> Result<()> {
    scripts();
    let out = TempDir::new()?;

    let mut process = VideoCaptureProcess::new(
        CapturePlatform::Generic,
        settings(PathBuf::from("/nonexistent/encoder")),
    );
    let err = process.start(&out.path().join("video.mp4")).await.unwrap_err();

    assert!(matches!(err, RecorderError::ProcessLaunchFailed(_)));
    Ok(())
}

#[tokio::test]
async fn test_stop_without_start_is_not_recording() -> Result<()> {
    let mut process =
        VideoCaptureProcess::new(CapturePlatform::Generic, settings(PathBuf::from("ffmpeg")));
    let err = process.stop().await.unwrap_err();
    assert!(matches!(err, RecorderError::NotRecording));
    Ok(())
}
