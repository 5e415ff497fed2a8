//! One retry loop for every collaborator call: bounded attempts, a timeout
//! per attempt, linear backoff, and a degraded value once attempts run out.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::error::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub per_attempt_timeout: Duration,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, per_attempt_timeout: Duration, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            per_attempt_timeout,
            backoff,
        }
    }

    /// A single attempt bounded by `per_attempt_timeout`.
    pub fn once(per_attempt_timeout: Duration) -> Self {
        Self::new(1, per_attempt_timeout, Duration::ZERO)
    }

    fn delay_before(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt.saturating_sub(1))
    }
}

/// Result of a guarded call: the collaborator's answer, or the degraded
/// substitute together with the error that forced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Fresh(T),
    Degraded { value: T, error: ServiceError },
}

impl<T> Outcome<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Fresh(value) | Self::Degraded { value, .. } => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Fresh(value) | Self::Degraded { value, .. } => value,
        }
    }
}

/// Runs `call` until it succeeds, fails with a non-retryable error, or
/// `max_attempts` is reached. Elapsed attempts count as `Timeout`.
pub async fn call_with_retry<T, F, Fut>(
    label: &'static str,
    policy: &RetryPolicy,
    mut call: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let result = match timeout(policy.per_attempt_timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(ServiceError::Timeout(policy.per_attempt_timeout)),
        };

        match result {
            Ok(value) => {
                if attempt > 1 {
                    debug!(call = label, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) if error.is_retryable() && attempt < attempts => {
                attempt += 1;
                let delay = policy.delay_before(attempt);
                warn!(
                    call = label,
                    attempt,
                    max_attempts = attempts,
                    backoff_ms = delay.as_millis() as u64,
                    error = %error,
                    "retrying after transient error"
                );
                sleep(delay).await;
            }
            Err(error) => return Err(error),
        }
    }
}

/// `call_with_retry`, with any final failure replaced by `degraded(&error)`.
pub async fn retry_or_degrade<T, F, Fut, D>(
    label: &'static str,
    policy: &RetryPolicy,
    call: F,
    degraded: D,
) -> Outcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
    D: FnOnce(&ServiceError) -> T,
{
    match call_with_retry(label, policy, call).await {
        Ok(value) => Outcome::Fresh(value),
        Err(error) => {
            warn!(call = label, error = %error, "degraded after failure");
            Outcome::Degraded {
                value: degraded(&error),
                error,
            }
        }
    }
}
