//! Retry state for a single request.

use crate::config::RetryConfig;
use std::time::Duration;

/// What to do after a retryable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStep {
    /// Sleep `delay`, then make attempt number `attempt`.
    Retry { attempt: u32, delay: Duration },
    /// No attempts left; `attempts` were made.
    Exhausted { attempts: u32 },
}

/// `{attempt, next_delay}` advanced by [`RetryConfig::delay_for_attempt`].
#[derive(Debug, Clone)]
pub struct Backoff<'a> {
    config: &'a RetryConfig,
    attempt: u32,
    next_delay: Duration,
}

impl<'a> Backoff<'a> {
    pub fn new(config: &'a RetryConfig) -> Self {
        Self {
            config,
            attempt: 0,
            next_delay: Duration::ZERO,
        }
    }

    /// Record the start of another attempt and return its 1-based number.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempt += 1;
        self.attempt
    }

    /// Attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn next_delay(&self) -> Duration {
        self.next_delay
    }

    /// Advance after a retryable failure. A server-supplied `retry_after`
    /// raises the delay, still bounded by `max_delay_ms`.
    pub fn on_retryable_failure(&mut self, retry_after: Option<Duration>) -> BackoffStep {
        if self.attempt >= self.config.max_attempts() {
            return BackoffStep::Exhausted {
                attempts: self.attempt,
            };
        }

        let mut delay = self.config.delay_for_attempt(self.attempt);
        if let Some(requested) = retry_after {
            delay = delay.max(requested.min(self.config.max_delay()));
        }
        self.next_delay = delay;

        BackoffStep::Retry {
            attempt: self.attempt + 1,
            delay,
        }
    }
}
