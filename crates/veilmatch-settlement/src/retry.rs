//! Per-attempt timeout and bounded exponential backoff.
//!
//! Only transient failures (`is_retryable()`) and timeouts are retried.
//! Anything else, including `AlreadySettled`, is returned on the attempt
//! that produced it so the caller can classify it.

use std::future::Future;
use std::time::Duration;

use tracing::warn;
use veilmatch_types::{RelayConfig, Result, VeilError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    timeout: Duration,
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(
        timeout: Duration,
        max_attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
    ) -> Self {
        Self {
            timeout,
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff,
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sleep before retry number `retry` (1-based): `initial · 2^(retry-1)`,
    /// capped at the maximum.
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |d| d.min(self.max_backoff))
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last = None;
        for attempt in 1..=self.max_attempts {
            let error = match tokio::time::timeout(self.timeout, op()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) if e.is_retryable() => e,
                Ok(Err(e)) => return Err(e),
                Err(_) => VeilError::Timeout {
                    after_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                },
            };
            warn!(
                op = label,
                attempt,
                max_attempts = self.max_attempts,
                error = %error,
                "Transient failure"
            );
            last = Some(error);
            if attempt < self.max_attempts {
                tokio::time::sleep(self.backoff(attempt)).await;
            }
        }
        Err(VeilError::RetriesExhausted {
            attempts: self.max_attempts,
            last: last.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}

impl From<&RelayConfig> for RetryPolicy {
    fn from(config: &RelayConfig) -> Self {
        Self::new(
            config.submit_timeout(),
            config.max_attempts,
            Duration::from_millis(config.initial_backoff_ms),
            Duration::from_millis(config.max_backoff_ms),
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RelayConfig::default())
    }
}
