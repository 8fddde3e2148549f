pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod mux;
pub mod session;
pub mod video;

pub use audio::{
    AudioBackend, AudioBackendFactory, AudioCaptureEngine, AudioDevice, AudioFile, AudioMixer,
    AudioSource, AudioStreamSpec, DeviceKind,
};
pub use config::Config;
pub use error::{RecorderError, RecorderResult};
pub use http::{create_router, AppState};
pub use mux::{CaptureParts, FfmpegMuxer, MediaMuxer, MuxMixPipeline, RetryPolicy};
pub use session::{
    ControllerSettings, RecorderComponents, RecordingConfig, RecordingController,
    RecordingStatus, SessionState, StartResponse, StopResponse,
};
pub use video::{CapturePlatform, EncoderSettings, FfmpegVideoBackend, ScreenCapture, VideoBackend};
