//! Screen capture
//!
//! - [`ScreenCapture`]: one running screen recording for a session
//! - [`VideoBackend`]: creates a fresh capture per session
//! - [`FfmpegVideoBackend`]: external ffmpeg encoder per platform

pub mod command;
pub mod process;

use async_trait::async_trait;
use std::path::Path;

use crate::error::RecorderResult;

pub use command::{CapturePlatform, EncoderSettings, ScreenCaptureCommand, ShutdownSignal};
pub use process::VideoCaptureProcess;

/// A screen recording in progress
#[async_trait]
pub trait ScreenCapture: Send {
    /// Launch the capture writing to `output_path`; returns once it is running
    async fn start(&mut self, output_path: &Path) -> RecorderResult<()>;

    /// Finish the recording. Blocks until the output file is safe to read,
    /// bounded by the implementation's exit timeout.
    async fn stop(&mut self) -> RecorderResult<()>;

    /// Whether the capture is still alive
    fn is_running(&mut self) -> bool;

    fn name(&self) -> &str;
}

/// Factory for per-session screen captures
pub trait VideoBackend: Send + Sync {
    fn create(&self) -> Box<dyn ScreenCapture>;
}

pub struct FfmpegVideoBackend {
    platform: CapturePlatform,
    settings: EncoderSettings,
}

impl FfmpegVideoBackend {
    pub fn new(platform: CapturePlatform, settings: EncoderSettings) -> Self {
        Self { platform, settings }
    }
}

impl VideoBackend for FfmpegVideoBackend {
    fn create(&self) -> Box<dyn ScreenCapture> {
        Box::new(VideoCaptureProcess::new(self.platform, self.settings.clone()))
    }
}
