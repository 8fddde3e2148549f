use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{RecorderError, RecorderResult};

/// Exponential backoff for finalization steps that can trip over a file
/// handle still held by a just-exited encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay after the first failure; doubles after each further failure
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
        }
    }

    /// Run `op` until it succeeds or attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> RecorderResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let attempts = self.max_attempts.max(1);
        let mut delay = self.initial_delay;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        info!("{} succeeded on attempt {}", operation, attempt);
                    }
                    return Ok(value);
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!(
                        "{} failed (attempt {}/{}): {}",
                        operation, attempt, attempts, last_error
                    );
                    if attempt < attempts {
                        tokio::time::sleep(delay).await;
                        delay = backoff(delay);
                    }
                }
            }
        }

        Err(RecorderError::FinalizeRetryExhausted {
            operation: operation.to_string(),
            attempts,
            last_error,
        })
    }
}

/// Next delay; large attempt counts saturate at `Duration::MAX`
fn backoff(delay: Duration) -> Duration {
    delay.saturating_mul(2)
}
