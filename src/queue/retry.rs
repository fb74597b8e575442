//! Timeout and retry wrapper around a single agent call.

use crate::error::AgentError;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Timeout and backoff settings for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Additional attempts after the first
    pub retry_attempts: u32,
    pub backoff_base: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Delay before the retry that follows zero-based `attempt`: `base * 2^attempt`, capped
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.backoff_base
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    pub fn max_attempts(&self) -> u32 {
        self.retry_attempts.saturating_add(1)
    }
}

/// Final result plus the number of calls made
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T, AgentError>,
    pub attempts: u32,
}

/// Run `call` with a timeout per attempt, retrying retryable errors with exponential backoff.
///
/// Each attempt gets a child token of `shutdown`. The token is cancelled when the attempt
/// ends, so work the attempt spawned is told to stop after a timeout; whatever the timed-out
/// attempt would have returned is discarded. Cancelling `shutdown` ends the current attempt
/// or backoff sleep with [`AgentError::Cancelled`].
pub async fn call_with_retry<T, F, Fut>(
    agent_id: &str,
    policy: &RetryPolicy,
    shutdown: &CancellationToken,
    mut call: F,
) -> RetryOutcome<T>
where
    F: FnMut(u32, CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, AgentError>>,
{
    let mut attempts = 0u32;
    loop {
        let attempt = attempts;
        attempts += 1;

        let token = shutdown.child_token();
        let result = tokio::select! {
            biased;
            _ = shutdown.cancelled() => Err(AgentError::Cancelled),
            outcome = timeout(policy.timeout, call(attempt, token.clone())) => match outcome {
                Ok(result) => result,
                Err(_) => Err(AgentError::AgentTimeout {
                    agent_id: agent_id.to_string(),
                    timeout_ms: policy.timeout.as_millis() as u64,
                }),
            },
        };
        token.cancel();

        let error = match result {
            Ok(value) => return RetryOutcome { result: Ok(value), attempts },
            Err(error) => error,
        };

        if !error.is_retryable() || attempt >= policy.retry_attempts {
            return RetryOutcome {
                result: Err(error),
                attempts,
            };
        }

        let delay = policy.backoff_for(attempt);
        warn!(
            agent_id,
            attempt = attempts,
            max_attempts = policy.max_attempts(),
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Retrying agent invocation after error"
        );

        tokio::select! {
            _ = shutdown.cancelled() => {
                return RetryOutcome {
                    result: Err(AgentError::Cancelled),
                    attempts,
                };
            }
            _ = sleep(delay) => {}
        }
    }
}
