//! pitchcrawl: a rate-limited, cache-backed crawler for football data.
//!
//! Data is acquired in dependent stages (competitions, seasons, score tables
//! and fixtures, match reports). Each stage reads its work from records the
//! previous stages stored, fetches pages through one shared throttle and
//! durable request cache, and upserts what it extracts by natural key.

// Export modules for library usage
pub mod cache;
pub mod cli;
pub mod commands;
pub mod config;
pub mod errors;
pub mod extract;
pub mod fetch;
pub mod formatting;
pub mod pipeline;
pub mod progress;
pub mod signature;
pub mod storage;
#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

// Re-export commonly used types
pub use crate::cache::{CacheEntry, CacheLocation, RequestCache};
pub use crate::config::{load_config, PipelineConfig, RefreshMode, RefreshPolicy, ScopeFilter};
pub use crate::errors::{
    CacheWriteError, ExtractionWarning, FetchError, StageAbortedError, StorageWriteError,
};
pub use crate::extract::{ExtractContext, ExtractionResult, Extractor};
pub use crate::fetch::{FetchOutcome, FetchStats, Fetcher};
pub use crate::pipeline::{
    CancellationToken, Orchestrator, RunRequest, RunSummary, StageId, StageRunResult, StageState,
    WorkUnit,
};
pub use crate::signature::RequestSignature;
pub use crate::storage::{NaturalKey, Record, RecordStore};
