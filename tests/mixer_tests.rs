// Integration tests for mixing the microphone and system-audio tracks

mod common;

use anyhow::Result;
use common::write_constant_wav;
use screen_recorder::audio::{AudioFile, AudioMixer};
use screen_recorder::RecorderError;
use tempfile::TempDir;

#[test]
fn test_mixed_duration_is_the_longest_input() -> Result<()> {
    let dir = TempDir::new()?;
    let short = dir.path().join("short.wav");
    let long = dir.path().join("long.wav");
    let mixed = dir.path().join("mixed.wav");

    write_constant_wav(&short, 5.0, 0)?;
    write_constant_wav(&long, 8.0, 0)?;

    let summary = AudioMixer::default().mix_files(&short, &long, &mixed)?;

    let audio = AudioFile::open(&mixed)?;
    assert!((audio.duration_seconds - 8.0).abs() < 1e-6);
    assert_eq!(summary.frames, audio.frames);
    assert_eq!(audio.sample_rate, 44_100);
    assert_eq!(audio.channels, 2);

    // Argument order does not change the length
    AudioMixer::default().mix_files(&long, &short, &mixed)?;
    assert!((AudioFile::open(&mixed)?.duration_seconds - 8.0).abs() < 1e-6);

    Ok(())
}

#[test]
fn test_overlap_is_equal_weight_and_tail_passes_through() -> Result<()> {
    let dir = TempDir::new()?;
    let mic = dir.path().join("mic.wav");
    let system = dir.path().join("system.wav");
    let mixed = dir.path().join("mixed.wav");

    write_constant_wav(&mic, 0.5, 1000)?;
    write_constant_wav(&system, 1.0, 3000)?;

    AudioMixer::default().mix_files(&mic, &system, &mixed)?;

    let samples: Vec<i16> = hound::WavReader::open(&mixed)?
        .into_samples::<i16>()
        .collect::<Result<_, _>>()?;

    let half = samples.len() / 2;
    assert!(samples[..half].iter().all(|&s| s == 2000));
    assert!(samples[half..].iter().all(|&s| s == 3000));

    Ok(())
}

#[test]
fn test_mismatched_format_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let good = dir.path().join("good.wav");
    let mono = dir.path().join("mono.wav");

    write_constant_wav(&good, 0.1, 0)?;

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&mono, spec)?;
    writer.write_sample(0i16)?;
    writer.finalize()?;

    let err = AudioMixer::default()
        .mix_files(&good, &mono, &dir.path().join("mixed.wav"))
        .unwrap_err();
    assert!(matches!(err, RecorderError::MuxFailed(_)));
    Ok(())
}

#[test]
fn test_missing_input_is_a_filesystem_error() -> Result<()> {
    let dir = TempDir::new()?;
    let good = dir.path().join("good.wav");
    write_constant_wav(&good, 0.1, 0)?;

    let err = AudioMixer::default()
        .mix_files(&good, &dir.path().join("absent.wav"), &dir.path().join("mixed.wav"))
        .unwrap_err();
    assert!(matches!(err, RecorderError::Filesystem { .. }));
    Ok(())
}
