//! Retry policy and request concurrency limiting
//!
//! This module handles:
//! - How many attempts a URL gets and how long to pause between them
//! - A global cap on simultaneously open requests via a semaphore
//!
//! Every listing page and product is issued as its own future at once; the
//! limiter is what keeps the number of live connections bounded.

use crate::config::HttpConfig;
use std::time::Duration;
use tokio::sync::{AcquireError, Semaphore, SemaphorePermit};

/// Bounded retry with a fixed pause between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per URL, including the first
    pub max_attempts: u32,

    /// Pause after a failed attempt; None retries immediately
    pub delay: Option<Duration>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Option<Duration>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &HttpConfig) -> Self {
        Self::new(config.max_retries, config.retry_delay())
    }

    /// Returns true if another attempt is allowed after `attempts` failures
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Pause to take after failed attempt number `attempts`
    ///
    /// No pause follows the final attempt.
    pub fn delay_after(&self, attempts: u32) -> Option<Duration> {
        if self.should_retry(attempts) {
            self.delay
        } else {
            None
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}

/// Global limit on in-flight HTTP requests
#[derive(Debug)]
pub struct RequestLimiter {
    semaphore: Semaphore,
    max_concurrent: usize,
}

impl RequestLimiter {
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Semaphore::new(max_concurrent),
            max_concurrent,
        }
    }

    /// Waits for a free request slot
    ///
    /// The slot is returned when the permit is dropped.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>, AcquireError> {
        self.semaphore.acquire().await
    }

    /// Number of requests currently holding a slot
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.semaphore.available_permits()
    }
}
