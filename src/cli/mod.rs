//! CLI module for pitchcrawl
//!
//! - Argument parsing (`args`)
//! - Merging flags into the loaded configuration (`config_builder`)
//! - Runtime setup: logging and Ctrl-C (`setup`)

pub mod args;
pub mod config_builder;
pub mod setup;

pub use args::{CacheAction, Cli, ColorArg, Commands, RunArgs};
pub use config_builder::{apply_run_overrides, build_run_request};
pub use setup::{init_logging, install_interrupt_handler, log_filter};

/// Parse CLI arguments using Clap
pub fn parse_args() -> Cli {
    args::parse_args()
}
