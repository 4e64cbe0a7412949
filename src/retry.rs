use std::future::Future;
use std::time::Duration;

use crate::error::AppError;

const MAX_BACKOFF: Duration = Duration::from_secs(4);

/// Bounded exponential backoff for calls to external services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (0-based): base, 2*base, 4*base... capped.
    pub fn delay(&self, attempt: u32) -> Duration {
        let multiplier = 1_u32 << attempt.min(8);
        self.base_delay.saturating_mul(multiplier).min(MAX_BACKOFF)
    }

    /// Runs `op` until it succeeds, fails permanently, or it runs out of retries.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(error) if attempt < self.max_retries && error.is_transient() => {
                    let delay = self.delay(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "transient failure; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
