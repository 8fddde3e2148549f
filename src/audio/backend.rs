use std::sync::Arc;

use super::buffer::FrameSink;
use crate::error::RecorderResult;

/// Audio source captured by one engine
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AudioSource {
    /// Microphone input, identified by the host's device identifier
    Microphone(String),
    /// Whatever the default output device is currently playing
    SystemLoopback,
}

impl AudioSource {
    pub fn is_loopback(&self) -> bool {
        matches!(self, AudioSource::SystemLoopback)
    }

    /// Short label used in logs and thread names
    pub fn label(&self) -> &'static str {
        match self {
            AudioSource::Microphone(_) => "microphone",
            AudioSource::SystemLoopback => "system-audio",
        }
    }
}

/// Fixed PCM format shared by every engine in a session
///
/// Both temp tracks use the same layout, so mixing never needs resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioStreamSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl AudioStreamSpec {
    pub const CAPTURE: AudioStreamSpec = AudioStreamSpec {
        sample_rate: 44_100,
        channels: 2,
        bits_per_sample: 16,
    };

    /// Bytes in one interleaved frame (one sample per channel)
    pub fn block_align(&self) -> usize {
        self.channels as usize * (self.bits_per_sample as usize / 8)
    }

    pub fn byte_rate(&self) -> u64 {
        self.sample_rate as u64 * self.block_align() as u64
    }

    pub fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            sample_format: hound::SampleFormat::Int,
        }
    }
}

impl Default for AudioStreamSpec {
    fn default() -> Self {
        Self::CAPTURE
    }
}

/// A running device stream. Dropping or stopping it releases the device.
pub trait ActiveStream: Send {
    /// Stop the device and release the host context it was opened with
    fn stop(self: Box<Self>) -> RecorderResult<()>;
}

/// Audio host abstraction
///
/// Implementations:
/// - `NativeAudioBackend`: cpal host (WASAPI, CoreAudio, ALSA)
/// - test fakes that push synthetic frames into the sink
pub trait AudioBackend: Send + Sync {
    /// Open `source` with `spec` and start delivering frames into `sink`.
    ///
    /// Returns once the device has started; frames keep arriving on a
    /// driver-owned thread until the returned stream is stopped.
    fn open(
        &self,
        source: &AudioSource,
        spec: AudioStreamSpec,
        sink: FrameSink,
    ) -> RecorderResult<Box<dyn ActiveStream>>;

    /// Play a short, quiet reference tone on the default output device without
    /// blocking the caller. Used to wake loopback capture.
    fn play_trigger_tone(&self) -> RecorderResult<()> {
        Ok(())
    }

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Audio backend factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Backend for the platform's native audio host
    pub fn native() -> Arc<dyn AudioBackend> {
        Arc::new(super::native::NativeAudioBackend::new())
    }
}
