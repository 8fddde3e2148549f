use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{RecorderError, RecorderResult};

/// Combines a finished video file with one audio track
#[async_trait]
pub trait MediaMuxer: Send + Sync {
    /// Write `output` with the video stream copied as-is and the audio encoded
    /// to a compressed format, cut to the shorter of the two streams.
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> RecorderResult<()>;
}

/// Muxer backed by the ffmpeg binary
pub struct FfmpegMuxer {
    program: PathBuf,
}

impl FfmpegMuxer {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn args(video: &Path, audio: &Path, output: &Path) -> Vec<String> {
        vec![
            "-i".to_string(),
            video.to_string_lossy().to_string(),
            "-i".to_string(),
            audio.to_string_lossy().to_string(),
            "-c:v".to_string(),
            "copy".to_string(),
            "-c:a".to_string(),
            "aac".to_string(),
            "-shortest".to_string(),
            "-y".to_string(),
            output.to_string_lossy().to_string(),
        ]
    }
}

impl Default for FfmpegMuxer {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl MediaMuxer for FfmpegMuxer {
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> RecorderResult<()> {
        let args = Self::args(video, audio, output);
        debug!("Running {} {:?}", self.program.display(), args);

        let result = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                RecorderError::MuxFailed(format!("{}: {}", self.program.display(), e))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let detail = stderr.lines().last().unwrap_or("").trim().to_string();
            warn!("ffmpeg mux failed: {}", stderr.trim());
            return Err(RecorderError::MuxFailed(format!(
                "ffmpeg exited with {}: {}",
                result.status, detail
            )));
        }

        Ok(())
    }
}

/// Moves the finished video into place when no audio needs combining
#[async_trait]
pub trait FileMover: Send + Sync {
    async fn move_file(&self, src: &Path, dst: &Path) -> io::Result<()>;
}

/// Rename, falling back to copy + delete when a rename is impossible
/// (e.g. temp and output directories on different filesystems)
pub struct FsMover;

#[async_trait]
impl FileMover for FsMover {
    async fn move_file(&self, src: &Path, dst: &Path) -> io::Result<()> {
        let rename_err = match tokio::fs::rename(src, dst).await {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(e),
            Err(e) => e,
        };

        debug!(
            "Rename {} -> {} failed ({}), copying instead",
            src.display(),
            dst.display(),
            rename_err
        );

        if tokio::fs::copy(src, dst).await.is_err() {
            return Err(rename_err);
        }

        if let Err(e) = tokio::fs::remove_file(src).await {
            warn!("Copied {} but could not remove it: {}", src.display(), e);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mux_args_copy_video_and_cut_shortest() {
        let args = FfmpegMuxer::args(Path::new("v.mp4"), Path::new("a.wav"), Path::new("out.mp4"));
        let joined = args.join(" ");
        assert_eq!(
            joined,
            "-i v.mp4 -i a.wav -c:v copy -c:a aac -shortest -y out.mp4"
        );
    }
}
