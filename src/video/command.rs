use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How the encoder is asked to finish its container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Write `q` to the encoder's stdin
    StdinCommand,
    /// Deliver an OS interrupt to the process
    Interrupt,
}

/// Capability-tagged platform variant for screen capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapturePlatform {
    Macos,
    Windows,
    Generic,
}

impl CapturePlatform {
    /// Variant for the platform this binary was built for
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            CapturePlatform::Macos
        } else if cfg!(target_os = "windows") {
            CapturePlatform::Windows
        } else {
            CapturePlatform::Generic
        }
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        match self {
            CapturePlatform::Macos => ShutdownSignal::Interrupt,
            CapturePlatform::Windows | CapturePlatform::Generic => ShutdownSignal::StdinCommand,
        }
    }

    /// ffmpeg input device used to grab the full desktop
    pub fn grab_format(&self) -> &'static str {
        match self {
            CapturePlatform::Macos => "avfoundation",
            CapturePlatform::Windows => "gdigrab",
            CapturePlatform::Generic => "x11grab",
        }
    }
}

/// Encoder settings shared by every session
#[derive(Debug, Clone)]
pub struct EncoderSettings {
    pub program: PathBuf,
    pub framerate: u32,
    pub preset: String,
    pub pixel_format: String,
    /// x11grab display for the generic backend
    pub display: String,
    /// Window after spawn during which an exit counts as a launch failure
    pub startup_probe: Duration,
    /// Upper bound on waiting for the encoder to exit after shutdown
    pub exit_timeout: Duration,
    /// Delay after exit before the temp file is touched
    pub grace_delay: Duration,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            framerate: 30,
            preset: "ultrafast".to_string(),
            pixel_format: "yuv420p".to_string(),
            display: ":0.0".to_string(),
            startup_probe: Duration::from_millis(250),
            exit_timeout: Duration::from_secs(10),
            grace_delay: Duration::from_millis(500),
        }
    }
}

/// Builds the capture-and-encode argument list for one platform
#[derive(Debug, Clone)]
pub struct ScreenCaptureCommand {
    platform: CapturePlatform,
    framerate: u32,
    preset: String,
    pixel_format: String,
    display: String,
    output_path: PathBuf,
}

impl ScreenCaptureCommand {
    pub fn new(platform: CapturePlatform, settings: &EncoderSettings, output_path: &Path) -> Self {
        Self {
            platform,
            framerate: settings.framerate,
            preset: settings.preset.clone(),
            pixel_format: settings.pixel_format.clone(),
            display: settings.display.clone(),
            output_path: output_path.to_path_buf(),
        }
    }

    pub fn with_framerate(mut self, framerate: u32) -> Self {
        self.framerate = framerate;
        self
    }

    pub fn build(&self) -> Vec<String> {
        let mut args = vec!["-f".to_string(), self.platform.grab_format().to_string()];

        match self.platform {
            CapturePlatform::Macos => {
                args.extend(["-capture_cursor".to_string(), "1".to_string()]);
                args.extend(["-framerate".to_string(), self.framerate.to_string()]);
                args.extend(["-i".to_string(), "Capture screen 0:none".to_string()]);
            }
            CapturePlatform::Windows => {
                args.extend(["-framerate".to_string(), self.framerate.to_string()]);
                args.extend(["-i".to_string(), "desktop".to_string()]);
            }
            CapturePlatform::Generic => {
                args.extend(["-framerate".to_string(), self.framerate.to_string()]);
                args.extend(["-i".to_string(), self.display.clone()]);
            }
        }

        args.extend(vec![
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            self.preset.clone(),
            "-pix_fmt".to_string(),
            self.pixel_format.clone(),
            "-y".to_string(),
            self.output_path.to_string_lossy().to_string(),
        ]);

        args
    }
}
