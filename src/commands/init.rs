use crate::config::CONFIG_FILE_NAME;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG: &str = r#"# pitchcrawl configuration

base_url = "https://fbref.com"
request_timeout_secs = 30

[throttle]
# Minimum spacing between outbound requests, measured from the end of the
# previous request.
min_interval_ms = 3000

[retry]
max_retries = 3
base_delay_ms = 2000
strategy = "exponential"
max_delay_ms = 60000
jitter_factor = 0.0

[runner]
abort_after_consecutive_failures = 5

[refresh]
# trust_cache | force_refresh | refresh_current
default = "refresh_current"

[refresh.stages]
competition = "trust_cache"

[scope]
competition_ids = []
competition_types = []
# years_back = 5
current_seasons = []

[storage]
database_path = "pitchcrawl.db"

[cache]
# directory = "/var/cache/pitchcrawl"
"#;

/// Write the default config into `dir`. Returns the written path.
pub fn init_config_in(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!("Configuration file already exists. Use --force to overwrite.");
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    Ok(config_path)
}

pub fn init_config(force: bool) -> Result<()> {
    let path = init_config_in(Path::new("."), force)?;
    println!("Created {} configuration file", path.display());
    Ok(())
}
