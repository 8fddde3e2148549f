// Audio mixer for combining the microphone and system-audio tracks
//
// Both inputs are WAV files captured with the shared session format. The mixer
// streams them sample by sample into one output track:
// - while both tracks have data, each contributes with equal weight
// - once the shorter track ends it is treated as silence and the longer one
//   carries on at full level, so the output lasts as long as the longest input

use hound::{WavReader, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

use super::backend::AudioStreamSpec;
use super::file::wav_error;
use crate::error::{RecorderError, RecorderResult};

/// Result of mixing two tracks
#[derive(Debug, Clone, PartialEq)]
pub struct MixSummary {
    /// Frames written to the output
    pub frames: u32,
    /// Output duration in seconds
    pub duration_seconds: f64,
}

/// Offline mixer for finished capture tracks
#[derive(Debug, Clone)]
pub struct AudioMixer {
    spec: AudioStreamSpec,
}

impl AudioMixer {
    pub fn new(spec: AudioStreamSpec) -> Self {
        Self { spec }
    }

    /// Overlay `first` and `second` into `output`.
    ///
    /// Both inputs must use the mixer's stream spec.
    pub fn mix_files(&self, first: &Path, second: &Path, output: &Path) -> RecorderResult<MixSummary> {
        let first_reader = self.open_input(first)?;
        let second_reader = self.open_input(second)?;

        info!(
            "Mixing {} ({} frames) with {} ({} frames)",
            first.display(),
            first_reader.duration(),
            second.display(),
            second_reader.duration()
        );

        let file = File::create(output).map_err(|e| RecorderError::filesystem(output, e))?;
        let mut writer = WavWriter::new(BufWriter::new(file), self.spec.wav_spec())
            .map_err(|e| wav_error(output, e))?;

        let mut first_samples = first_reader.into_samples::<i16>();
        let mut second_samples = second_reader.into_samples::<i16>();
        let mut written: u64 = 0;

        loop {
            let a = first_samples.next().transpose().map_err(|e| wav_error(first, e))?;
            let b = second_samples.next().transpose().map_err(|e| wav_error(second, e))?;

            let mixed = match (a, b) {
                (None, None) => break,
                (Some(a), Some(b)) => mix_samples(&[a, b]),
                (Some(only), None) | (None, Some(only)) => only,
            };

            writer.write_sample(mixed).map_err(|e| wav_error(output, e))?;
            written += 1;
        }

        writer.finalize().map_err(|e| wav_error(output, e))?;

        let frames = (written / self.spec.channels as u64) as u32;
        let summary = MixSummary {
            frames,
            duration_seconds: frames as f64 / self.spec.sample_rate as f64,
        };

        info!(
            "Audio mixing complete: {} ({:.2}s)",
            output.display(),
            summary.duration_seconds
        );

        Ok(summary)
    }

    fn open_input(&self, path: &Path) -> RecorderResult<WavReader<std::io::BufReader<File>>> {
        let reader = WavReader::open(path).map_err(|e| wav_error(path, e))?;
        let spec = reader.spec();

        if spec.sample_rate != self.spec.sample_rate
            || spec.channels != self.spec.channels
            || spec.bits_per_sample != self.spec.bits_per_sample
            || spec.sample_format != hound::SampleFormat::Int
        {
            return Err(RecorderError::MuxFailed(format!(
                "{} is {}Hz/{}ch/{}-bit, expected {}Hz/{}ch/{}-bit",
                path.display(),
                spec.sample_rate,
                spec.channels,
                spec.bits_per_sample,
                self.spec.sample_rate,
                self.spec.channels,
                self.spec.bits_per_sample
            )));
        }

        Ok(reader)
    }
}

impl Default for AudioMixer {
    fn default() -> Self {
        Self::new(AudioStreamSpec::CAPTURE)
    }
}

/// Equal-weight mix of simultaneous samples
fn mix_samples(samples: &[i16]) -> i16 {
    if samples.is_empty() {
        return 0;
    }

    let sum: i32 = samples.iter().map(|&s| s as i32).sum();
    let mixed = sum / samples.len() as i32;

    mixed.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}
