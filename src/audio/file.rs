use hound::{WavReader, WavWriter};
use std::fs::{File, OpenOptions};
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, info};

use super::backend::AudioStreamSpec;
use crate::error::{RecorderError, RecorderResult};

/// Header-level facts about a WAV file on disk
#[derive(Debug, Clone)]
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: u32,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> RecorderResult<Self> {
        let path = path.as_ref();

        let reader = WavReader::open(path).map_err(|e| wav_error(path, e))?;
        let spec = reader.spec();
        let frames = reader.duration();

        let duration_seconds = frames as f64 / spec.sample_rate as f64;

        debug!(
            "Audio file {}: {:.2}s, {}Hz, {} channels",
            path.display(),
            duration_seconds,
            spec.sample_rate,
            spec.channels
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            frames,
        })
    }
}

/// Serialize little-endian interleaved PCM bytes as a canonical WAV file.
///
/// The file is finalized and synced before returning.
pub fn write_pcm_wav(path: &Path, spec: AudioStreamSpec, pcm: &[u8]) -> RecorderResult<u64> {
    let file = File::create(path).map_err(|e| RecorderError::filesystem(path, e))?;
    let mut writer =
        WavWriter::new(BufWriter::new(file), spec.wav_spec()).map_err(|e| wav_error(path, e))?;

    for pair in pcm.chunks_exact(2) {
        writer
            .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
            .map_err(|e| wav_error(path, e))?;
    }

    writer.finalize().map_err(|e| wav_error(path, e))?;

    OpenOptions::new()
        .write(true)
        .open(path)
        .and_then(|f| f.sync_all())
        .map_err(|e| RecorderError::filesystem(path, e))?;

    let frames = (pcm.len() / spec.block_align()) as u64;
    info!(
        "Wrote {} ({} frames, {:.1}s)",
        path.display(),
        frames,
        frames as f64 / spec.sample_rate as f64
    );

    Ok(frames)
}

pub(crate) fn wav_error(path: &Path, e: hound::Error) -> RecorderError {
    match e {
        hound::Error::IoError(io) => RecorderError::filesystem(path, io),
        other => RecorderError::filesystem(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidData, other.to_string()),
        ),
    }
}
