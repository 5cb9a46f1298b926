use anyhow::Result;
use pitchcrawl::cli::{self, ColorArg, Commands};
use pitchcrawl::commands;
use pitchcrawl::config::{load_config, PipelineConfig};
use pitchcrawl::formatting::ColorMode;
use std::path::Path;

fn color_mode(arg: ColorArg) -> ColorMode {
    match arg {
        ColorArg::Always => ColorMode::Always,
        ColorArg::Never => ColorMode::Never,
        ColorArg::Auto => ColorMode::from_env(),
    }
}

fn pipeline_config(explicit: Option<&Path>) -> Result<PipelineConfig> {
    let loaded = load_config(explicit)?;
    match &loaded.source {
        Some(path) => log::debug!("Using config {}", path.display()),
        None => log::debug!("No pitchcrawl.toml found; using defaults"),
    }
    Ok(loaded.config)
}

fn run(cli: cli::Cli) -> Result<i32> {
    let config_path = cli.config.as_deref();

    match &cli.command {
        Commands::Run(args) => commands::handle_run(
            pipeline_config(config_path)?,
            args,
            color_mode(cli.color),
            cli.quiet,
        ),
        Commands::Cache { action, cache_dir } => {
            commands::handle_cache(&pipeline_config(config_path)?, action, cache_dir.as_deref())?;
            Ok(0)
        }
        Commands::Query {
            table,
            filters,
            database,
            limit,
        } => {
            commands::handle_query(
                &pipeline_config(config_path)?,
                *table,
                filters,
                database.as_deref(),
                *limit,
            )?;
            Ok(0)
        }
        Commands::Init { force } => {
            commands::init_config(*force)?;
            Ok(0)
        }
    }
}

fn main() {
    let cli = cli::parse_args();
    cli::init_logging(cli.verbosity, cli.quiet);

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}
