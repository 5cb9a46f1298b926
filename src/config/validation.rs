//! Configuration validation with error accumulation.
//!
//! Every rule is checked so a user sees all configuration problems in one
//! run, each tagged with the dotted path of the offending field.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

use super::PipelineConfig;

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid configuration: {}", join_errors(.errors))]
    Invalid { errors: Vec<FieldError> },
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Check every rule, collecting all failures.
pub fn validate_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    match Url::parse(&config.base_url) {
        Ok(url) if url.cannot_be_a_base() => errors.push(FieldError {
            field: "base_url",
            message: format!("'{}' cannot be used to resolve links", config.base_url),
        }),
        Ok(_) => {}
        Err(e) => errors.push(FieldError {
            field: "base_url",
            message: format!("'{}' is not a valid URL ({})", config.base_url, e),
        }),
    }

    if config.request_timeout_secs == 0 {
        errors.push(FieldError {
            field: "request_timeout_secs",
            message: "must be greater than zero".into(),
        });
    }

    if config.runner.abort_after_consecutive_failures == 0 {
        errors.push(FieldError {
            field: "runner.abort_after_consecutive_failures",
            message: "must be at least 1".into(),
        });
    }

    if config.retry.max_delay_ms < config.retry.base_delay_ms {
        errors.push(FieldError {
            field: "retry.max_delay_ms",
            message: format!(
                "must not be below retry.base_delay_ms ({} < {})",
                config.retry.max_delay_ms, config.retry.base_delay_ms
            ),
        });
    }

    if !(0.0..=1.0).contains(&config.retry.jitter_factor) {
        errors.push(FieldError {
            field: "retry.jitter_factor",
            message: format!(
                "out of range (expected: 0.0-1.0, got: {})",
                config.retry.jitter_factor
            ),
        });
    }

    if config.user_agent.trim().is_empty() {
        errors.push(FieldError {
            field: "user_agent",
            message: "must not be empty".into(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid { errors })
    }
}
