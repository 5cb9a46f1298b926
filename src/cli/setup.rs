//! Setup and initialization functions for CLI
//!
//! Logging and the Ctrl-C handler are installed once, before any command
//! runs.

use crate::pipeline::CancellationToken;
use anyhow::{Context, Result};

/// Default filter for a verbosity count; `RUST_LOG` wins when set.
pub fn log_filter(verbosity: u8, quiet: bool) -> &'static str {
    if quiet {
        return "warn";
    }
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

pub fn init_logging(verbosity: u8, quiet: bool) {
    let env = env_logger::Env::default().default_filter_or(log_filter(verbosity, quiet));
    // A second init (e.g. in tests) keeps the first logger.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp_secs()
        .try_init();
}

/// Cancel `token` on the first Ctrl-C. The pipeline notices at its next
/// work-unit boundary. A second Ctrl-C exits immediately.
pub fn install_interrupt_handler(token: CancellationToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start signal runtime")?;

    std::thread::Builder::new()
        .name("pitchcrawl-signal".into())
        .spawn(move || {
            runtime.block_on(async {
                if tokio::signal::ctrl_c().await.is_err() {
                    return;
                }
                eprintln!("\nInterrupted; finishing the current unit...");
                token.cancel();
                if tokio::signal::ctrl_c().await.is_ok() {
                    std::process::exit(130);
                }
            });
        })
        .context("Failed to spawn signal thread")?;
    Ok(())
}
