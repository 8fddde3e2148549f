//! Post-capture finalization
//!
//! Turns the temp files of one session into a single output file:
//! - video only: the video is moved into place
//! - one audio track: video and audio are muxed
//! - two audio tracks: they are mixed first, then muxed with the video
//!
//! Steps that touch files the encoder just released go through
//! [`RetryPolicy`]. Temp files are removed only after a successful run;
//! on failure they stay on disk for manual recovery.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::muxer::{FileMover, FsMover, MediaMuxer};
use super::retry::RetryPolicy;
use crate::audio::AudioMixer;
use crate::error::{RecorderError, RecorderResult};

/// Temp files produced by one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureParts {
    pub video: PathBuf,
    pub microphone: Option<PathBuf>,
    pub system_audio: Option<PathBuf>,
    /// Where the mixed track goes when both audio sources were captured
    pub mixed_audio: PathBuf,
}

impl CaptureParts {
    pub fn strategy(&self) -> FinalizeStrategy<'_> {
        match (self.microphone.as_deref(), self.system_audio.as_deref()) {
            (None, None) => FinalizeStrategy::VideoOnly,
            (Some(audio), None) | (None, Some(audio)) => FinalizeStrategy::SingleAudio(audio),
            (Some(microphone), Some(system_audio)) => FinalizeStrategy::MixedAudio {
                microphone,
                system_audio,
            },
        }
    }

    /// Every temp path that may exist on disk after this session
    pub fn temp_files(&self) -> Vec<&Path> {
        let mut files = vec![self.video.as_path()];
        files.extend(self.microphone.as_deref());
        files.extend(self.system_audio.as_deref());
        if self.microphone.is_some() && self.system_audio.is_some() {
            files.push(self.mixed_audio.as_path());
        }
        files
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeStrategy<'a> {
    VideoOnly,
    SingleAudio(&'a Path),
    MixedAudio {
        microphone: &'a Path,
        system_audio: &'a Path,
    },
}

pub struct MuxMixPipeline {
    muxer: Arc<dyn MediaMuxer>,
    mover: Arc<dyn FileMover>,
    mixer: AudioMixer,
    retry: RetryPolicy,
}

impl MuxMixPipeline {
    pub fn new(muxer: Arc<dyn MediaMuxer>, retry: RetryPolicy) -> Self {
        Self {
            muxer,
            mover: Arc::new(FsMover),
            mixer: AudioMixer::default(),
            retry,
        }
    }

    pub fn with_mover(mut self, mover: Arc<dyn FileMover>) -> Self {
        self.mover = mover;
        self
    }

    pub fn with_mixer(mut self, mixer: AudioMixer) -> Self {
        self.mixer = mixer;
        self
    }

    /// Produce `output` from `parts`, returning the final path
    pub async fn finalize(&self, parts: &CaptureParts, output: &Path) -> RecorderResult<PathBuf> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| RecorderError::filesystem(parent, e))?;
            }
        }

        match parts.strategy() {
            FinalizeStrategy::VideoOnly => {
                info!("No audio captured, moving video to {}", output.display());
                self.move_with_retry(&parts.video, output).await?;
            }
            FinalizeStrategy::SingleAudio(audio) => {
                info!("Muxing video with {}", audio.display());
                self.mux_with_retry(&parts.video, audio, output).await?;
            }
            FinalizeStrategy::MixedAudio {
                microphone,
                system_audio,
            } => {
                self.mix(microphone, system_audio, &parts.mixed_audio).await?;
                info!("Muxing video with mixed audio");
                self.mux_with_retry(&parts.video, &parts.mixed_audio, output)
                    .await?;
            }
        }

        info!("Recording finalized: {}", output.display());
        self.cleanup(parts, output).await;

        Ok(output.to_path_buf())
    }

    async fn mix(&self, microphone: &Path, system_audio: &Path, mixed: &Path) -> RecorderResult<()> {
        info!(
            "Mixing {} with {}",
            microphone.display(),
            system_audio.display()
        );

        let mixer = self.mixer.clone();
        let (microphone, system_audio, mixed) = (
            microphone.to_path_buf(),
            system_audio.to_path_buf(),
            mixed.to_path_buf(),
        );

        let summary = tokio::task::spawn_blocking(move || {
            mixer.mix_files(&microphone, &system_audio, &mixed)
        })
        .await??;

        debug!("Mixed track is {:.2}s", summary.duration_seconds);
        Ok(())
    }

    async fn mux_with_retry(&self, video: &Path, audio: &Path, output: &Path) -> RecorderResult<()> {
        let muxer = Arc::clone(&self.muxer);
        let (video, audio, output) = (video.to_path_buf(), audio.to_path_buf(), output.to_path_buf());

        self.retry
            .run("mux", move |_| {
                let muxer = Arc::clone(&muxer);
                let (video, audio, output) = (video.clone(), audio.clone(), output.clone());
                async move { muxer.mux(&video, &audio, &output).await }
            })
            .await
    }

    async fn move_with_retry(&self, src: &Path, dst: &Path) -> RecorderResult<()> {
        let mover = Arc::clone(&self.mover);
        let (src, dst) = (src.to_path_buf(), dst.to_path_buf());

        self.retry
            .run("move", move |_| {
                let mover = Arc::clone(&mover);
                let (src, dst) = (src.clone(), dst.clone());
                async move { mover.move_file(&src, &dst).await }
            })
            .await
    }

    async fn cleanup(&self, parts: &CaptureParts, output: &Path) {
        for path in parts.temp_files() {
            if path == output {
                continue;
            }
            match tokio::fs::remove_file(path).await {
                Ok(()) => debug!("Removed temp file {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove temp file {}: {}", path.display(), e),
            }
        }
    }
}
