//! Progress sink trait definitions.
//!
//! # Thread Safety
//!
//! All `ProgressSink` implementations must be `Send + Sync`; the fetcher and
//! record store are shareable across threads and a sink may be shared with
//! them.
//!
//! # Example
//!
//! ```rust
//! use pitchcrawl::pipeline::StageId;
//! use pitchcrawl::progress::ProgressSink;
//!
//! struct LoggingProgressSink;
//!
//! impl ProgressSink for LoggingProgressSink {
//!     fn start_stage(&self, stage: StageId, total: usize) {
//!         log::info!("{}: {} units", stage, total);
//!     }
//!
//!     fn report(&self, stage: StageId, current: usize, total: usize) {
//!         log::debug!("{}: {}/{}", stage, current, total);
//!     }
//!
//!     fn complete_stage(&self, stage: StageId, summary: &str) {
//!         log::info!("{} finished: {}", stage, summary);
//!     }
//!
//!     fn warn(&self, message: &str) {
//!         log::warn!("{}", message);
//!     }
//! }
//! ```

use crate::pipeline::StageId;

/// Progress sink abstraction - receives progress updates.
///
/// Methods should be cheap and must not panic on odd input (e.g. `current >
/// total` when a stage enqueues its own follow-up units).
pub trait ProgressSink: Send + Sync {
    /// A stage is starting with `total` initial work units.
    fn start_stage(&self, stage: StageId, total: usize);

    /// `current` units (1-based) of `total` have been handled.
    fn report(&self, stage: StageId, current: usize, total: usize);

    /// A stage reached a terminal state. `summary` is a one-line description.
    fn complete_stage(&self, stage: StageId, summary: &str);

    /// Report a warning without interrupting progress.
    fn warn(&self, message: &str);
}
