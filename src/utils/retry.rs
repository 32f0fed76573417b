//! Retry utilities with exponential backoff for resilient arXiv calls.

use std::future::Future;
use std::time::Duration;

use crate::sources::SourceError;
use crate::ui::Diagnostics;
use crate::utils::Sleeper;

/// Default number of attempts (the first try included)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Substrings that mark an opaque error message as transient
const RETRYABLE_MARKERS: [&str; 4] = ["503", "502", "504", "timeout"];

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles after each further failure
    pub initial_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    /// Default delays with a custom attempt budget
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Default::default()
        }
    }

    /// Backoff before retrying after the failure of `attempt` (0-based):
    /// 1s, 2s, 4s, ... with the default initial delay
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Whether a failure on `attempt` (0-based) should be retried
    pub fn should_retry(&self, attempt: u32, error: &SourceError) -> bool {
        attempt + 1 < self.max_attempts && is_retryable(error)
    }
}

/// Whether an error is worth retrying.
///
/// Structured errors are judged by kind: gateway/availability statuses (502,
/// 503, 504) and timeouts are transient, every other HTTP status and every
/// parse failure is permanent. Errors that only carry a message fall back to
/// [`is_retryable_message`].
pub fn is_retryable(error: &SourceError) -> bool {
    match error {
        SourceError::Status { status, .. } => matches!(*status, 502..=504),
        SourceError::Timeout(_) => true,
        SourceError::Parse(_) => false,
        SourceError::Network(_) | SourceError::Io(_) => is_retryable_message(&error.to_string()),
    }
}

/// Case-insensitive check for `503`, `502`, `504` or `timeout` in a message
pub fn is_retryable_message(message: &str) -> bool {
    let message = message.to_lowercase();
    RETRYABLE_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

/// Run `operation` until it succeeds, fails permanently or runs out of attempts.
///
/// Retries are announced on `diag` as
/// `"<label> (attempt n/N), retrying in Xs... (Ctrl+C to cancel)"`. Any
/// terminal failure prints a single `Error: ...` line and yields `None`; the
/// error itself never reaches the caller. A wait cut short by Ctrl+C also
/// yields `None`.
pub async fn retry_with_backoff<T, F, Fut>(
    config: &RetryConfig,
    sleeper: &dyn Sleeper,
    diag: &Diagnostics,
    label: &str,
    mut operation: F,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    for attempt in 0..config.max_attempts {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::debug!("{} succeeded on attempt {}", label, attempt + 1);
                }
                return Some(value);
            }
            Err(error) if config.should_retry(attempt, &error) => {
                let wait = config.delay_for(attempt);
                tracing::debug!(
                    "Transient error on attempt {}: {}, retrying in {:?}",
                    attempt + 1,
                    error,
                    wait
                );
                writeln!(
                    diag,
                    "{} (attempt {}/{}), retrying in {}s... (Ctrl+C to cancel)",
                    label,
                    attempt + 1,
                    config.max_attempts,
                    wait.as_secs()
                );

                if sleeper.sleep(wait).await.is_err() {
                    writeln!(diag, "\nCancelled.");
                    return None;
                }
            }
            Err(error) => {
                tracing::warn!("{} gave up after {} attempt(s): {}", label, attempt + 1, error);
                writeln!(diag, "Error: {}", error);
                return None;
            }
        }
    }

    None
}
