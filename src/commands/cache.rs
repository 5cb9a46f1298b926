use crate::cache::{CacheLocation, RequestCache, SqliteRequestCache};
use crate::cli::CacheAction;
use crate::config::PipelineConfig;
use crate::formatting::render_cache_stats;
use crate::pipeline::StageId;
use anyhow::Result;
use std::io::Write;
use std::path::Path;

fn partitions(stage: Option<StageId>) -> Vec<&'static str> {
    match stage {
        Some(stage) => vec![stage.cache_partition()],
        None => StageId::ALL.iter().map(|s| s.cache_partition()).collect(),
    }
}

/// Run one cache action against `cache`, writing human-readable output.
pub fn run_cache_action(
    cache: &dyn RequestCache,
    action: &CacheAction,
    out: &mut dyn Write,
) -> Result<()> {
    match action {
        CacheAction::Stats { stage } => {
            let stats = partitions(*stage)
                .into_iter()
                .map(|partition| cache.stats(partition))
                .collect::<Result<Vec<_>, _>>()?;
            writeln!(out, "{}", render_cache_stats(&stats))?;
        }
        CacheAction::List { stage } => {
            let listing = cache.list(stage.cache_partition())?;
            for entry in &listing {
                writeln!(
                    out,
                    "{}  {}  {:>8}  {}",
                    entry.fetched_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.status,
                    entry.body_bytes,
                    entry.url
                )?;
            }
            log::info!("{}: {} cached page(s)", stage, listing.len());
        }
        CacheAction::Clear {
            stage,
            older_than_days,
        } => {
            let older_than = older_than_days.map(|days| chrono::Duration::days(i64::from(days)));
            for partition in partitions(*stage) {
                let removed = cache.clear(partition, older_than)?;
                writeln!(out, "Removed {} entries from {}", removed, partition)?;
            }
        }
    }
    Ok(())
}

pub fn handle_cache(
    config: &PipelineConfig,
    action: &CacheAction,
    cache_dir: Option<&Path>,
) -> Result<()> {
    let location = CacheLocation::resolve(cache_dir, config.cache.directory.as_deref());
    let cache = SqliteRequestCache::open(location.get_cache_path())?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_cache_action(&cache, action, &mut out)
}
