//! Screen encoder child process
//!
//! Owns exactly one external encoder per session. Handles:
//! 1. Spawning with arguments from [`ScreenCaptureCommand`].
//! 2. A short startup probe so an encoder that dies immediately fails `start`.
//! 3. Graceful shutdown (stdin `q` or interrupt), bounded by a timeout with a
//!    forced kill as the last resort.
//! 4. A grace delay after exit before the output file is handed on.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, info, warn};

use super::command::{CapturePlatform, EncoderSettings, ScreenCaptureCommand, ShutdownSignal};
use super::ScreenCapture;
use crate::error::{RecorderError, RecorderResult};

pub struct VideoCaptureProcess {
    platform: CapturePlatform,
    settings: EncoderSettings,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    output_path: Option<PathBuf>,
}

impl VideoCaptureProcess {
    pub fn new(platform: CapturePlatform, settings: EncoderSettings) -> Self {
        Self {
            platform,
            settings,
            child: None,
            stdin: None,
            output_path: None,
        }
    }

    pub fn platform(&self) -> CapturePlatform {
        self.platform
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.id())
    }

    async fn send_shutdown(&mut self, child: &mut Child) {
        match self.platform.shutdown_signal() {
            ShutdownSignal::StdinCommand => match self.stdin.take() {
                Some(mut stdin) => {
                    debug!("Sending 'q' to screen encoder");
                    if let Err(e) = stdin.write_all(b"q").await {
                        warn!("Failed to send 'q' to screen encoder: {}", e);
                    }
                    let _ = stdin.flush().await;
                    // Dropping stdin closes the pipe, which ffmpeg also treats as EOF
                }
                None => warn!("Screen encoder has no command channel"),
            },
            ShutdownSignal::Interrupt => {
                if let Err(e) = interrupt(child).await {
                    warn!("Failed to interrupt screen encoder: {}", e);
                }
            }
        }
    }
}

#[cfg(unix)]
async fn interrupt(child: &mut Child) -> std::io::Result<()> {
    let Some(pid) = child.id() else {
        return Ok(());
    };

    let status = Command::new("kill")
        .args(["-s", "INT", &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;

    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("kill exited with {}", status),
        ))
    }
}

#[cfg(not(unix))]
async fn interrupt(child: &mut Child) -> std::io::Result<()> {
    // No console interrupt for detached children here; terminate instead
    child.start_kill()
}

#[async_trait]
impl ScreenCapture for VideoCaptureProcess {
    async fn start(&mut self, output_path: &Path) -> RecorderResult<()> {
        if self.child.is_some() {
            return Err(RecorderError::AlreadyRecording);
        }

        let args = ScreenCaptureCommand::new(self.platform, &self.settings, output_path).build();
        info!(
            "Spawning screen encoder ({:?}): {} {:?}",
            self.platform,
            self.settings.program.display(),
            args
        );

        let stdin = match self.platform.shutdown_signal() {
            ShutdownSignal::StdinCommand => Stdio::piped(),
            ShutdownSignal::Interrupt => Stdio::null(),
        };

        let mut child = Command::new(&self.settings.program)
            .args(&args)
            .stdin(stdin)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                RecorderError::ProcessLaunchFailed(format!(
                    "{}: {}",
                    self.settings.program.display(),
                    e
                ))
            })?;

        self.stdin = child.stdin.take();

        // An encoder that cannot open its grab device exits almost immediately
        match tokio::time::timeout(self.settings.startup_probe, child.wait()).await {
            Ok(Ok(status)) => {
                self.stdin = None;
                return Err(RecorderError::ProcessLaunchFailed(format!(
                    "encoder exited during startup with {}",
                    status
                )));
            }
            Ok(Err(e)) => {
                self.stdin = None;
                let _ = child.kill().await;
                return Err(RecorderError::ProcessLaunchFailed(e.to_string()));
            }
            Err(_) => {}
        }

        info!("Screen encoder running (pid {:?})", child.id());
        self.child = Some(child);
        self.output_path = Some(output_path.to_path_buf());
        Ok(())
    }

    async fn stop(&mut self) -> RecorderResult<()> {
        let mut child = self.child.take().ok_or(RecorderError::NotRecording)?;

        info!("Stopping screen encoder (pid {:?})", child.id());
        self.send_shutdown(&mut child).await;
        self.stdin = None;

        let exit_timeout = self.settings.exit_timeout;
        let result = match tokio::time::timeout(exit_timeout, child.wait()).await {
            Ok(Ok(status)) => {
                info!("Screen encoder exited with {}", status);
                Ok(())
            }
            Ok(Err(e)) => {
                warn!("Failed waiting on screen encoder: {}", e);
                Err(RecorderError::Worker(e.to_string()))
            }
            Err(_) => {
                warn!(
                    "Screen encoder did not exit within {:?}, killing it",
                    exit_timeout
                );
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill screen encoder: {}", e);
                }
                Err(RecorderError::ProcessExitTimeout(exit_timeout))
            }
        };

        // Some platforms keep the output handle open briefly after exit
        tokio::time::sleep(self.settings.grace_delay).await;

        if let Some(path) = self.output_path.take() {
            debug!("Screen recording temp file: {}", path.display());
        }

        result
    }

    fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}
