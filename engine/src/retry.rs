//! Bounded retry for remote calls
//!
//! Both provider adapters (completion and geocoding) run every HTTP request
//! through a [`RetryPolicy`]: each attempt gets its own timeout, failures
//! that the error type marks retryable are retried with exponential backoff,
//! and the last failure is returned as a typed error once the budget is spent.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Classifies errors for the retry loop
pub trait Retryable {
    /// Whether another attempt could succeed
    fn is_retryable(&self) -> bool;

    /// Error reported when a single attempt exceeds its timeout
    fn timed_out() -> Self;
}

/// Attempt budget and backoff schedule for one remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub max_retries: u32,

    /// Timeout applied to each attempt
    pub attempt_timeout: Duration,

    /// Delay before the first retry; doubled after each retry
    pub initial_backoff: Duration,

    /// Upper bound on any single delay
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Policy with the default backoff schedule (250ms doubling, capped at 5s)
    pub fn new(max_retries: u32, attempt_timeout: Duration) -> Self {
        Self {
            max_retries,
            attempt_timeout,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(5),
        }
    }

    /// Override the backoff schedule
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Upper bound on the wall-clock time [`RetryPolicy::run`] can take.
    ///
    /// Saturates at [`Duration::MAX`] for budgets too large to represent.
    pub fn deadline(&self) -> Duration {
        let attempts = self.max_retries.saturating_add(1);
        let mut total = self.attempt_timeout.saturating_mul(attempts);
        for retry in 0..self.max_retries {
            let delay = self.backoff_for(retry);
            // Every later delay is the same
            if delay == self.max_backoff || retry >= u32::BITS {
                let remaining = self.max_retries - retry;
                return total.saturating_add(delay.saturating_mul(remaining));
            }
            total = total.saturating_add(delay);
        }
        total
    }

    fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `operation` until it succeeds, fails permanently, or the budget runs out
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let mut retry = 0;
        loop {
            let outcome = match tokio::time::timeout(self.attempt_timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(E::timed_out()),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && retry < self.max_retries => {
                    let delay = self.backoff_for(retry);
                    retry += 1;
                    warn!(
                        "{} failed ({}), retrying in {}ms ({}/{})",
                        label,
                        e,
                        delay.as_millis(),
                        retry,
                        self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    debug!("{} gave up after {} retries: {}", label, retry, e);
                    return Err(e);
                }
            }
        }
    }
}
