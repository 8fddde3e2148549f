use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

use super::backend::AudioStreamSpec;

/// Append-only PCM accumulator owned by one capture engine
///
/// Written from the driver callback thread, drained by the engine on stop.
/// Appends happen under the lock one whole frame batch at a time, so a drain
/// never observes a partial interleaved frame.
#[derive(Debug)]
pub struct CaptureBuffer {
    spec: AudioStreamSpec,
    bytes: Mutex<Vec<u8>>,
}

impl CaptureBuffer {
    pub fn new(spec: AudioStreamSpec) -> Self {
        Self {
            spec,
            bytes: Mutex::new(Vec::new()),
        }
    }

    pub fn spec(&self) -> AudioStreamSpec {
        self.spec
    }

    /// Append interleaved i16 samples, keeping only whole frames.
    ///
    /// Returns the number of frames appended.
    pub fn append_samples(&self, samples: &[i16]) -> usize {
        let channels = self.spec.channels as usize;
        let whole = samples.len() - samples.len() % channels;
        if whole == 0 {
            return 0;
        }

        let mut encoded = Vec::with_capacity(whole * 2);
        for sample in &samples[..whole] {
            encoded.extend_from_slice(&sample.to_le_bytes());
        }

        self.bytes.lock().extend_from_slice(&encoded);
        whole / channels
    }

    /// Take everything accumulated so far, leaving the buffer empty
    pub fn drain(&self) -> Vec<u8> {
        std::mem::take(&mut *self.bytes.lock())
    }

    pub fn clear(&self) {
        self.bytes.lock().clear();
    }

    pub fn frame_count(&self) -> usize {
        self.bytes.lock().len() / self.spec.block_align()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frame_count() as f64 / self.spec.sample_rate as f64
    }
}

/// Handle given to a device callback for delivering frames
///
/// Flips the engine's readiness signal on the first non-empty delivery.
#[derive(Debug, Clone)]
pub struct FrameSink {
    buffer: Arc<CaptureBuffer>,
    ready: Arc<watch::Sender<bool>>,
}

impl FrameSink {
    pub fn new(buffer: Arc<CaptureBuffer>, ready: Arc<watch::Sender<bool>>) -> Self {
        Self { buffer, ready }
    }

    pub fn spec(&self) -> AudioStreamSpec {
        self.buffer.spec()
    }

    pub fn push_i16(&self, samples: &[i16]) {
        if self.buffer.append_samples(samples) > 0 {
            self.mark_ready();
        }
    }

    pub fn push_f32(&self, samples: &[f32]) {
        let converted: Vec<i16> = samples
            .iter()
            .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            .collect();
        self.push_i16(&converted);
    }

    pub fn push_u16(&self, samples: &[u16]) {
        let converted: Vec<i16> = samples
            .iter()
            .map(|&s| (s as i32 - 32_768) as i16)
            .collect();
        self.push_i16(&converted);
    }

    fn mark_ready(&self) {
        self.ready.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        });
    }
}
