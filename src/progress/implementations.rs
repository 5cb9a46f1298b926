//! Progress sink implementations for different output modes.
//!
//! | Use Case | Implementation |
//! |----------|----------------|
//! | Unit tests | [`SilentProgressSink`] or [`RecordingProgressSink`] |
//! | CLI tool | [`CliProgressSink`] |
//!
//! # Example: Using RecordingProgressSink in Tests
//!
//! ```rust
//! use pitchcrawl::pipeline::StageId;
//! use pitchcrawl::progress::{ProgressEvent, ProgressSink, RecordingProgressSink};
//!
//! let recorder = RecordingProgressSink::new();
//!
//! recorder.start_stage(StageId::Season, 2);
//! recorder.report(StageId::Season, 1, 2);
//! recorder.complete_stage(StageId::Season, "2 succeeded");
//!
//! assert_eq!(recorder.started(), vec![StageId::Season]);
//! assert!(matches!(recorder.events()[1], ProgressEvent::Report { current: 1, .. }));
//! ```

use super::traits::ProgressSink;
use crate::pipeline::StageId;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;

/// No-op sink.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentProgressSink;

impl ProgressSink for SilentProgressSink {
    #[inline]
    fn start_stage(&self, _stage: StageId, _total: usize) {}

    #[inline]
    fn report(&self, _stage: StageId, _current: usize, _total: usize) {}

    #[inline]
    fn complete_stage(&self, _stage: StageId, _summary: &str) {}

    #[inline]
    fn warn(&self, _message: &str) {}
}

/// Simple stderr output; the unit counter overwrites a single line.
///
/// ```text
/// season: 3 units
/// season: 3/3
/// season completed: 3 succeeded, 0 failed, 0 skipped
/// ```
///
/// When `quiet` is set only warnings are written.
#[derive(Clone, Debug, Default)]
pub struct CliProgressSink {
    quiet: bool,
}

impl CliProgressSink {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl ProgressSink for CliProgressSink {
    fn start_stage(&self, stage: StageId, total: usize) {
        if !self.quiet {
            eprintln!("{}: {} units", stage, total);
        }
    }

    fn report(&self, stage: StageId, current: usize, total: usize) {
        if !self.quiet {
            eprint!("\r{}: {}/{}", stage, current, total.max(current));
            let _ = std::io::stderr().flush();
        }
    }

    fn complete_stage(&self, stage: StageId, summary: &str) {
        if !self.quiet {
            eprintln!("\r{} {}", stage, summary);
        }
    }

    fn warn(&self, message: &str) {
        eprintln!("\nWarning: {}", message);
    }
}

/// Progress event recorded by [`RecordingProgressSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    StartStage { stage: StageId, total: usize },
    Report { stage: StageId, current: usize, total: usize },
    CompleteStage { stage: StageId, summary: String },
    Warn { message: String },
}

/// Captures events for assertions in tests.
#[derive(Clone, Debug, Default)]
pub struct RecordingProgressSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl RecordingProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().clone()
    }

    /// Stages that were started, in order.
    pub fn started(&self) -> Vec<StageId> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::StartStage { stage, .. } => Some(*stage),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::Warn { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingProgressSink {
    fn start_stage(&self, stage: StageId, total: usize) {
        self.events
            .lock()
            .push(ProgressEvent::StartStage { stage, total });
    }

    fn report(&self, stage: StageId, current: usize, total: usize) {
        self.events.lock().push(ProgressEvent::Report {
            stage,
            current,
            total,
        });
    }

    fn complete_stage(&self, stage: StageId, summary: &str) {
        self.events.lock().push(ProgressEvent::CompleteStage {
            stage,
            summary: summary.to_string(),
        });
    }

    fn warn(&self, message: &str) {
        self.events.lock().push(ProgressEvent::Warn {
            message: message.to_string(),
        });
    }
}
