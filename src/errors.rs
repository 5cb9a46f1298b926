//! Error taxonomy for the acquisition pipeline.
//!
//! Each failure class has its own type so the stage runner can decide how far
//! it propagates:
//!
//! - [`CacheWriteError`]: best-effort cache persistence failed; the fetched
//!   document is still returned to the caller.
//! - [`FetchError`]: retries exhausted (or a non-retryable status); fatal to one
//!   work unit only.
//! - [`ExtractionWarning`]: the document did not have the expected shape; the
//!   unit is skipped and the stage continues.
//! - [`StorageWriteError`]: a natural-key upsert failed; treated exactly like a
//!   fetch failure for the unit that produced the record.
//! - [`StageAbortedError`]: too many consecutive unit failures (or a run-level
//!   cancellation); terminates the current stage but not the run.

use crate::pipeline::StageId;
use crate::signature::RequestSignature;
use thiserror::Error;

/// A cache write that did not persist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cache write failed for {signature} in partition '{partition}': {message}")]
pub struct CacheWriteError {
    pub partition: String,
    pub signature: RequestSignature,
    pub message: String,
}

/// A cache read fault. Callers treat this as a miss.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cache read failed in partition '{partition}': {message}")]
pub struct CacheError {
    pub partition: String,
    pub message: String,
}

/// Outbound request failed after all permitted attempts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fetch of {signature} failed after {attempts} attempt(s): {reason}")]
pub struct FetchError {
    pub signature: RequestSignature,
    /// Status of the last response received, if any response arrived at all.
    pub last_status: Option<u16>,
    pub attempts: u32,
    pub reason: String,
}

impl FetchError {
    /// True when the server answered but with a status that is never retried.
    pub fn is_permanent(&self) -> bool {
        matches!(self.last_status, Some(status) if !is_retryable_status(status) && !(200..300).contains(&status))
    }
}

/// Statuses that indicate throttling or a transient server fault.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

/// Non-fatal note from an extractor about a document it could not fully read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} extraction warning for {url}: {message}")]
pub struct ExtractionWarning {
    pub stage: StageId,
    pub url: String,
    pub message: String,
}

impl ExtractionWarning {
    pub fn new(stage: StageId, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage,
            url: url.into(),
            message: message.into(),
        }
    }
}

/// Natural-key upsert into the record store failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to upsert {table} record '{key}': {message}")]
pub struct StorageWriteError {
    pub table: String,
    pub key: String,
    pub message: String,
}

/// Filtered read from the record store failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to query {table}: {message}")]
pub struct StorageError {
    pub table: String,
    pub message: String,
}

/// Why a stage stopped before draining its work units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// `count` consecutive unit failures reached the configured threshold.
    ConsecutiveFailures { count: u32, threshold: u32 },
    /// The run-level cancellation signal was observed at a unit boundary.
    Cancelled,
    /// The stage's input set could not be read from the record store.
    InputSelection(String),
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConsecutiveFailures { count, threshold } => write!(
                f,
                "{} consecutive failures (threshold {})",
                count, threshold
            ),
            Self::Cancelled => write!(f, "cancelled"),
            Self::InputSelection(message) => write!(f, "input selection failed: {}", message),
        }
    }
}

/// The stage terminated early; records it already upserted remain valid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stage {stage} aborted: {reason}")]
pub struct StageAbortedError {
    pub stage: StageId,
    pub reason: AbortReason,
}

impl StageAbortedError {
    pub fn consecutive_failures(stage: StageId, count: u32, threshold: u32) -> Self {
        Self {
            stage,
            reason: AbortReason::ConsecutiveFailures { count, threshold },
        }
    }

    pub fn cancelled(stage: StageId) -> Self {
        Self {
            stage,
            reason: AbortReason::Cancelled,
        }
    }

    pub fn input_selection(stage: StageId, error: &StorageError) -> Self {
        Self {
            stage,
            reason: AbortReason::InputSelection(error.to_string()),
        }
    }
}

/// A work unit that did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Storage(#[from] StorageWriteError),
}
