use std::time::Duration;

/// Short reference tone played on the output device when loopback capture
/// starts. Some loopback implementations deliver no frames until something
/// is actually playing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerTone {
    pub frequency_hz: f32,
    pub duration: Duration,
    /// Linear gain, 0.1 is roughly -20 dB
    pub amplitude: f32,
}

impl Default for TriggerTone {
    fn default() -> Self {
        Self {
            frequency_hz: 880.0,
            duration: Duration::from_millis(300),
            amplitude: 0.1,
        }
    }
}

impl TriggerTone {
    pub fn generator(&self, sample_rate: u32, channels: u16) -> ToneGenerator {
        let total_frames = (self.duration.as_secs_f64() * sample_rate as f64).round() as u64;
        ToneGenerator {
            phase: 0.0,
            step: self.frequency_hz / sample_rate as f32,
            amplitude: self.amplitude,
            channels: channels.max(1) as usize,
            remaining_frames: total_frames,
        }
    }
}

/// Sine generator that writes interleaved frames and then silence
#[derive(Debug, Clone)]
pub struct ToneGenerator {
    phase: f32,
    step: f32,
    amplitude: f32,
    channels: usize,
    remaining_frames: u64,
}

impl ToneGenerator {
    pub fn is_finished(&self) -> bool {
        self.remaining_frames == 0
    }

    /// Fill an interleaved output buffer
    pub fn fill(&mut self, out: &mut [f32]) {
        for frame in out.chunks_mut(self.channels) {
            let value = if self.remaining_frames > 0 {
                self.remaining_frames -= 1;
                let v = (self.phase * std::f32::consts::TAU).sin() * self.amplitude;
                self.phase = (self.phase + self.step).fract();
                v
            } else {
                0.0
            };

            for sample in frame.iter_mut() {
                *sample = value;
            }
        }
    }
}
