//! Retry policy for registry lookups.
//!
//! Owned by the resolution client; each logical call builds its own backoff
//! state, so nothing here is shared between workers.

use backoff::{backoff::Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RetryConfig;

/// Predicate deciding whether an HTTP status is transient
pub type StatusPredicate = Arc<dyn Fn(u16) -> bool + Send + Sync>;

/// 429 and every 5xx
pub fn default_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

#[derive(Clone)]
pub struct RetryPolicy {
    /// Total attempts per logical call, including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Whether connection errors and timeouts are retried like 5xx
    pub retry_transport_errors: bool,
    retryable_status: StatusPredicate,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("multiplier", &self.multiplier)
            .field("retry_transport_errors", &self.retry_transport_errors)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            multiplier: config.multiplier,
            retry_transport_errors: true,
            retryable_status: Arc::new(default_retryable_status),
        }
    }

    /// A policy that performs exactly one attempt
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_retry_transport_errors(mut self, retry: bool) -> Self {
        self.retry_transport_errors = retry;
        self
    }

    pub fn with_retryable_status<F>(mut self, predicate: F) -> Self
    where
        F: Fn(u16) -> bool + Send + Sync + 'static,
    {
        self.retryable_status = Arc::new(predicate);
        self
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        (self.retryable_status)(status)
    }

    /// Fresh backoff state for one logical call. Jitter is disabled so the
    /// schedule is base, base*m, base*m^2... capped at `max_delay`.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.base_delay)
            .with_max_interval(self.max_delay)
            .with_multiplier(self.multiplier)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None)
            .build()
    }

    /// The waits that separate the attempts of one call
    #[cfg(test)]
    pub fn delays(&self) -> Vec<Duration> {
        let mut backoff = self.backoff();
        (1..self.max_attempts)
            .map(|_| backoff.next_backoff().unwrap_or(self.max_delay))
            .collect()
    }
}
