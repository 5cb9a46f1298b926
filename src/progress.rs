//! Progress reporting for pipeline runs.
//!
//! The orchestrator and stage runner report through a [`ProgressSink`] so the
//! same run can drive a terminal display, plain log lines, or nothing at all:
//!
//! - [`traits::ProgressSink`]: the receiver interface
//! - [`implementations`]: silent, CLI and recording sinks

pub mod implementations;
pub mod traits;

pub use implementations::{CliProgressSink, ProgressEvent, RecordingProgressSink, SilentProgressSink};
pub use traits::ProgressSink;
