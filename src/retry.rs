//! Bounded retry with exponential backoff.
//!
//! The operation is a closure that builds a fresh attempt every time it is
//! called, so resources consumed by a failed attempt (an open file, a request
//! body) are never reused.

use std::future::Future;

use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::cli::RetryConfig;
use crate::error::{ReleaseError, RemoteError, Result};

/// Outcome of one failed attempt
#[derive(Debug)]
pub struct AttemptFailure {
    /// What went wrong
    pub error: ReleaseError,
    /// Whether another attempt may succeed
    pub retryable: bool,
}

impl AttemptFailure {
    /// A failure worth another attempt
    pub fn retryable(error: impl Into<ReleaseError>) -> Self {
        Self {
            error: error.into(),
            retryable: true,
        }
    }

    /// A failure that ends the retry loop
    pub fn fatal(error: impl Into<ReleaseError>) -> Self {
        Self {
            error: error.into(),
            retryable: false,
        }
    }
}

impl From<ReleaseError> for AttemptFailure {
    fn from(error: ReleaseError) -> Self {
        let retryable = error.is_temporary();
        Self { error, retryable }
    }
}

impl RetryConfig {
    /// Delay before the attempt following attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Run `operation` until it succeeds, fails fatally, or the attempt budget is spent.
///
/// Both the attempt and the wait between attempts are abandoned as soon as
/// `cancel` fires, in which case [`ReleaseError::Cancelled`] is returned.
pub async fn retry_with_backoff<F, Fut, T>(
    mut operation: F,
    config: &RetryConfig,
    operation_name: &str,
    cancel: &CancellationToken,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, AttemptFailure>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReleaseError::Cancelled),
            outcome = operation() => outcome,
        };

        let failure = match outcome {
            Ok(value) => {
                if attempts > 1 {
                    log::info!("{operation_name} succeeded after {attempts} attempt(s)");
                }
                return Ok(value);
            }
            Err(failure) => failure,
        };

        if !failure.retryable {
            log::debug!("{operation_name} failed with unrecoverable error");
            return Err(failure.error);
        }

        if attempts >= max_attempts {
            return Err(RemoteError::RetriesExhausted {
                operation: operation_name.to_string(),
                attempts,
                last: Box::new(failure.error),
            }
            .into());
        }

        let wait = config.delay_after(attempts);
        log::warn!(
            "{operation_name} failed (attempt {attempts}/{max_attempts}): {}; retrying in {:.1}s",
            failure.error,
            wait.as_secs_f64()
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ReleaseError::Cancelled),
            _ = tokio::time::sleep(wait) => {}
        }
    }
}
