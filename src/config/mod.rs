//! Pipeline configuration.
//!
//! Loaded from `pitchcrawl.toml` (searched upward from the working directory)
//! or an explicit `--config` path; every field has a default so an empty or
//! missing file is valid.

mod core;
mod loader;
pub mod refresh;
pub mod retry;
pub mod scope;
pub mod validation;

pub use core::{
    CacheConfig, PipelineConfig, RunnerConfig, StorageConfig, ThrottleConfig, DEFAULT_BASE_URL,
    DEFAULT_DATABASE_PATH,
};
pub use loader::{
    directory_ancestors, load_config, load_config_from, parse_and_validate_config, LoadedConfig,
    CONFIG_FILE_NAME,
};
pub use refresh::{RefreshMode, RefreshPolicy};
pub use retry::{RetryConfig, RetryStrategy};
pub use scope::{season_start_year, ScopeFilter};
pub use validation::{validate_config, ConfigError, FieldError};
