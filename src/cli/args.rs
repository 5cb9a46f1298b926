use crate::config::RefreshMode;
use crate::pipeline::{CompetitionType, StageId};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorArg {
    Auto,
    Always,
    Never,
}

#[derive(Parser, Debug)]
#[command(name = "pitchcrawl")]
#[command(about = "Rate-limited, cache-backed football data crawler", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Only log warnings and errors
    #[arg(short = 'q', long = "quiet", global = true, conflicts_with = "verbosity")]
    pub quiet: bool,

    /// Colored output
    #[arg(long, value_enum, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Config file (defaults to the nearest pitchcrawl.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run pipeline stages
    Run(RunArgs),

    /// Inspect or wipe the request cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,

        /// Request cache directory
        #[arg(long = "cache-dir")]
        cache_dir: Option<PathBuf>,
    },

    /// Print stored records as JSON lines
    Query {
        /// Table to read (competition, season, score_table, fixture, match)
        table: StageId,

        /// Field filter, repeatable (e.g. --where competition_id=9)
        #[arg(long = "where", value_parser = parse_key_value)]
        filters: Vec<(String, String)>,

        /// Record store database
        #[arg(long)]
        database: Option<PathBuf>,

        /// Stop after this many records
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Write a default pitchcrawl.toml to the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Stage to run, repeatable; all stages when omitted
    #[arg(long = "stage")]
    pub stages: Vec<StageId>,

    /// Restrict to a competition id, repeatable
    #[arg(long = "competition-id")]
    pub competition_ids: Vec<u32>,

    /// Restrict to a competition type, repeatable
    #[arg(long = "competition-type")]
    pub competition_types: Vec<CompetitionType>,

    /// Only seasons starting within this many years
    #[arg(long = "years-back")]
    pub years_back: Option<u32>,

    /// Season label treated as in progress, repeatable
    #[arg(long = "current-season")]
    pub current_seasons: Vec<String>,

    /// Refresh mode override, e.g. fixture=force_refresh; repeatable
    #[arg(long = "refresh", value_parser = parse_refresh)]
    pub refresh: Vec<(StageId, RefreshMode)>,

    /// Record store database
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Request cache directory
    #[arg(long = "cache-dir")]
    pub cache_dir: Option<PathBuf>,

    /// Keep fetched pages in memory only for this run
    #[arg(long = "no-cache")]
    pub no_cache: bool,

    /// Minimum milliseconds between outbound requests
    #[arg(long = "min-interval-ms")]
    pub min_interval_ms: Option<u64>,

    /// Print the run summary as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CacheAction {
    /// Entry counts, age range and size per partition
    Stats {
        #[arg(long)]
        stage: Option<StageId>,
    },
    /// Cached URLs, newest first
    List {
        #[arg(long)]
        stage: StageId,
    },
    /// Remove cached documents
    Clear {
        #[arg(long)]
        stage: Option<StageId>,

        /// Only entries fetched more than N days ago
        #[arg(long = "older-than-days")]
        older_than_days: Option<u32>,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn parse_refresh(s: &str) -> Result<(StageId, RefreshMode), String> {
    let (stage, mode) = parse_key_value(s)?;
    Ok((stage.parse()?, mode.parse()?))
}

/// Parse CLI arguments using Clap
pub fn parse_args() -> Cli {
    Cli::parse()
}
