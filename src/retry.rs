//! Bounded exponential backoff for provider calls.
//!
//! Every outbound call to search, the reasoning engine, or the CMS goes
//! through [`RetryPolicy::run`]. The scraper is the exception: it reports
//! failure per URL instead of erroring.
//!
//! # Backoff Strategy
//!
//! ```text
//! delay(1) = initial_delay
//! delay(n) = delay(n-1) * base        (optionally capped at max_delay)
//! ```
//!
//! With the defaults (3 attempts, 1s, base 2) a call that always fails sleeps
//! 1s, then 2s, then returns the third error unchanged. There is no jitter.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, warn};

use crate::error::ProviderError;

/// Errors that know whether another attempt could succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for ProviderError {
    fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Transient { .. })
    }
}

/// How many times to try a call and how long to wait in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each failed attempt.
    pub base: u32,
    /// Upper bound for a single delay. `None` keeps the pure sequence.
    pub max_delay: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            base: 2,
            max_delay: None,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// The delays slept between attempts of an always-failing call.
    pub fn delays(&self) -> Vec<Duration> {
        let mut delays = Vec::new();
        let mut delay = self.initial_delay;
        for _ in 1..self.max_attempts {
            let capped = match self.max_delay {
                Some(max) if delay > max => max,
                _ => delay,
            };
            delays.push(capped);
            delay = delay.saturating_mul(self.base);
        }
        delays
    }

    /// Run `call` until it succeeds, fails with a non-retryable error, or the
    /// attempts run out. The last error is returned unchanged.
    ///
    /// # Arguments
    ///
    /// * `operation` - Name used in the retry logs
    /// * `call` - Builds a fresh attempt each time it is invoked
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        let total_t0 = Instant::now();
        let mut delays = self.delays().into_iter();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let attempt_t0 = Instant::now();
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if !e.is_retryable() {
                        warn!(
                            operation,
                            attempt,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            error = %e,
                            "non-retryable failure"
                        );
                        return Err(e);
                    }

                    let Some(delay) = delays.next() else {
                        error!(
                            operation,
                            attempt,
                            max = self.max_attempts,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "exhausted retries"
                        );
                        return Err(e);
                    };

                    warn!(
                        operation,
                        attempt,
                        max = self.max_attempts,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}
