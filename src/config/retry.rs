//! Retry configuration for outbound fetches.
//!
//! Transient failures worth retrying:
//!
//! - Transport errors (connection reset, timeout, DNS hiccup)
//! - Throttling responses (HTTP 429)
//! - Server overload or faults (HTTP 5xx)
//!
//! # Configuration Example
//!
//! ```toml
//! [retry]
//! max_retries = 3
//! base_delay_ms = 2000
//! strategy = "exponential"
//! max_delay_ms = 60000
//! jitter_factor = 0.0
//! ```
//!
//! # Retry Strategies
//!
//! - **Constant**: Same delay between each retry
//! - **Linear**: Delay increases linearly (base * attempt)
//! - **Exponential**: Delay doubles each attempt (base * 2^(attempt-1))
//! - **Fibonacci**: Delay follows fibonacci sequence

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry configuration for outbound requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt (default: 3). Zero disables retrying.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between retries in milliseconds (default: 2000)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Retry strategy (default: exponential)
    #[serde(default)]
    pub strategy: RetryStrategy,

    /// Ceiling for any single delay in milliseconds (default: 60000)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Jitter factor added to delays (default: 0.0)
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            strategy: RetryStrategy::default(),
            max_delay_ms: default_max_delay_ms(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

impl RetryConfig {
    /// A config that never retries.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Total attempts permitted for one request, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Calculate the delay before a specific retry.
    ///
    /// The attempt number is 1-indexed (first retry is attempt 1).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay_ms as f64;
        let attempt = attempt.max(1);

        let delay_ms = match self.strategy {
            RetryStrategy::Constant => base_ms,
            RetryStrategy::Linear => base_ms * (attempt as f64),
            RetryStrategy::Exponential => base_ms * 2.0_f64.powi(attempt.min(62) as i32 - 1),
            RetryStrategy::Fibonacci => base_ms * (fibonacci(attempt) as f64),
        };

        let jittered_ms = if self.jitter_factor > 0.0 {
            apply_jitter(delay_ms, self.jitter_factor)
        } else {
            delay_ms
        };

        let final_ms = jittered_ms.min(self.max_delay_ms as f64);
        Duration::from_millis(final_ms as u64).min(self.base_delay() * 100) // Cap single delay at 100x base
    }
}

/// Retry delay strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RetryStrategy {
    /// Same delay between each retry.
    Constant,
    /// Delay increases linearly: base * attempt.
    Linear,
    /// Delay doubles each attempt: base * 2^(attempt-1).
    #[default]
    Exponential,
    /// Delay follows fibonacci sequence: base * fib(attempt).
    Fibonacci,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    2000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_jitter_factor() -> f64 {
    0.0
}

/// Compute the nth fibonacci number (1-indexed).
fn fibonacci(n: u32) -> u64 {
    match n {
        0 => 0,
        1 | 2 => 1,
        _ => {
            let mut a = 1u64;
            let mut b = 1u64;
            for _ in 2..n {
                let c = a.saturating_add(b);
                a = b;
                b = c;
            }
            b
        }
    }
}

/// Deterministic jitter: adds half of `delay * factor`.
fn apply_jitter(delay_ms: f64, factor: f64) -> f64 {
    let jitter_range = delay_ms * factor;
    delay_ms + (jitter_range * 0.5)
}
