//! CLI command implementations.
//!
//! - **run**: run pipeline stages and print the summary
//! - **cache**: request cache stats, listing and clearing
//! - **query**: print stored records as JSON lines
//! - **init**: write a default `pitchcrawl.toml`

pub mod cache;
pub mod init;
pub mod query;
pub mod run;

pub use cache::handle_cache;
pub use init::init_config;
pub use query::{handle_query, write_records};
pub use run::{exit_code, handle_run};
