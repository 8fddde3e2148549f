pub mod backend;
pub mod buffer;
pub mod devices;
pub mod engine;
pub mod file;
pub mod mixer;
pub mod native;
pub mod tone;

pub use backend::{ActiveStream, AudioBackend, AudioBackendFactory, AudioSource, AudioStreamSpec};
pub use buffer::{CaptureBuffer, FrameSink};
pub use devices::{list_devices, AudioDevice, DeviceKind};
pub use engine::{AudioCaptureEngine, CaptureSummary, Readiness};
pub use file::AudioFile;
pub use mixer::{AudioMixer, MixSummary};
pub use tone::TriggerTone;
