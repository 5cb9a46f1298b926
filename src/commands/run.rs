use crate::cache::{CacheLocation, MemoryRequestCache, RequestCache, SqliteRequestCache};
use crate::cli::{apply_run_overrides, build_run_request, install_interrupt_handler, RunArgs};
use crate::config::PipelineConfig;
use crate::fetch::Fetcher;
use crate::formatting::{render_run_summary, ColorMode, ColoredFormatter};
use crate::pipeline::{CancellationToken, Orchestrator, RunSummary};
use crate::progress::CliProgressSink;
use crate::storage::SqliteRecordStore;
use anyhow::{Context, Result};
use serde_json::json;
use std::sync::Arc;
use url::Url;

/// Process exit status for a finished run: 2 when any stage aborted.
pub fn exit_code(summary: &RunSummary) -> i32 {
    if summary.any_aborted() {
        2
    } else {
        0
    }
}

fn open_cache(config: &PipelineConfig, args: &RunArgs) -> Result<Arc<dyn RequestCache>> {
    if args.no_cache {
        log::info!("Request cache disabled; pages are kept in memory for this run only");
        return Ok(Arc::new(MemoryRequestCache::new()));
    }
    let location = CacheLocation::resolve(
        args.cache_dir.as_deref(),
        config.cache.directory.as_deref(),
    );
    location.ensure_directories()?;
    Ok(Arc::new(SqliteRequestCache::open(location.get_cache_path())?))
}

/// Run the requested stages and print the summary. Returns the exit status.
pub fn handle_run(
    config: PipelineConfig,
    args: &RunArgs,
    color: ColorMode,
    quiet: bool,
) -> Result<i32> {
    let config = apply_run_overrides(config, args)?;
    let request = build_run_request(&config, args);
    let base_url = Url::parse(&config.base_url)
        .with_context(|| format!("Invalid base_url '{}'", config.base_url))?;

    let cache = open_cache(&config, args)?;
    let store = SqliteRecordStore::open(&config.database_path())?;
    let fetcher = Fetcher::from_config(&config, cache).context("Failed to build HTTP client")?;

    let token = CancellationToken::new();
    install_interrupt_handler(token.clone())?;

    let progress = CliProgressSink::new(quiet);
    let orchestrator = Orchestrator::new(
        &fetcher,
        &store,
        &progress,
        base_url,
        config.runner.abort_after_consecutive_failures,
    )
    .with_cancellation(token);

    log::info!(
        "Running {} stage(s) against {}",
        request.ordered_stages().len(),
        config.database_path().display()
    );
    let summary = orchestrator.run(&request);

    if args.json {
        let report = json!({
            "stages": summary.counts(),
            "fetch": summary.fetch,
            "duration_secs": summary.duration.as_secs_f64(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let formatter = ColoredFormatter::new(color);
        print!("{}", render_run_summary(&summary, &formatter));
    }

    Ok(exit_code(&summary))
}
