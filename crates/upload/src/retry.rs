//! Bounded retry with exponential backoff.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::TransportError;
use crate::transport::TransportFuture;

/// Retry budget for a single remote call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. `1` disables retry.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Maximum delay between attempts (backoff cap).
    pub max_delay: Duration,
    /// Multiplier for each subsequent attempt.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            backoff_factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff before the attempt following failed attempt `attempt`
    /// (1-based): `initial_delay * backoff_factor^(attempt-1)`, capped at
    /// `max_delay`, then spread by up to 25% either way.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let base = (self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent))
            .min(self.max_delay.as_secs_f64());
        let spread = base * JITTER_FRACTION * (2.0 * unit_noise() - 1.0);
        Duration::from_secs_f64((base + spread).max(MIN_DELAY_SECS))
    }
}

/// Largest relative deviation jitter applies to a backoff delay.
const JITTER_FRACTION: f64 = 0.25;

/// Floor of any backoff delay.
const MIN_DELAY_SECS: f64 = 0.01;

/// Pseudo-random value in `[0, 1)` from the sub-second clock.
fn unit_noise() -> f64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    f64::from(nanos) / 1_000_000_000.0
}

/// Why a retried call gave up.
#[derive(Debug)]
pub(crate) enum RetryFailure {
    /// The last attempt failed; `attempts` counts every attempt made.
    Failed { error: TransportError, attempts: u32 },
    /// Cancellation fired while waiting between attempts.
    Cancelled,
}

/// Runs `op` until it succeeds, fails non-transiently, or the policy is
/// exhausted. `on_retry` receives the number of the next attempt and the
/// delay before it.
pub(crate) async fn run<'a, T>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut on_retry: impl FnMut(u32, Duration),
    mut op: impl FnMut() -> TransportFuture<'a, T>,
) -> Result<T, RetryFailure> {
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_for_attempt(attempt);
                debug!(attempt, error = %error, ?delay, "transient failure, backing off");
                attempt += 1;
                on_retry(attempt, delay);

                tokio::select! {
                    _ = cancel.cancelled() => return Err(RetryFailure::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(error) => {
                return Err(RetryFailure::Failed {
                    error,
                    attempts: attempt,
                });
            }
        }
    }
}
