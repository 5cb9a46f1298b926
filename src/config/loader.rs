use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::core::PipelineConfig;
use super::validation::{validate_config, ConfigError};

pub const CONFIG_FILE_NAME: &str = "pitchcrawl.toml";

const MAX_TRAVERSAL_DEPTH: usize = 10;

/// Read a config file's contents
pub(crate) fn read_config_file(path: &Path) -> Result<String, std::io::Error> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Parse and validate config from a TOML string
pub fn parse_and_validate_config(
    contents: &str,
    origin: &Path,
) -> Result<PipelineConfig, ConfigError> {
    let config = toml::from_str::<PipelineConfig>(contents).map_err(|e| ConfigError::Parse {
        path: origin.to_path_buf(),
        message: e.to_string(),
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Load config from a specific path. A missing file is `Ok(None)`.
pub(crate) fn try_load_config_from_path(
    config_path: &Path,
) -> Result<Option<PipelineConfig>, ConfigError> {
    let contents = match read_config_file(config_path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: config_path.to_path_buf(),
                source,
            })
        }
    };

    let config = parse_and_validate_config(&contents, config_path)?;
    log::debug!("Loaded config from {}", config_path.display());
    Ok(Some(config))
}

/// Generate directory ancestors up to a depth limit
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Configuration plus the file it came from, if any.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: PipelineConfig,
    pub source: Option<PathBuf>,
}

/// Load configuration.
///
/// An explicit path must exist. Otherwise `pitchcrawl.toml` is searched for
/// from `start` upward; finding none yields defaults.
pub fn load_config_from(
    explicit: Option<&Path>,
    start: PathBuf,
) -> Result<LoadedConfig, ConfigError> {
    if let Some(path) = explicit {
        return match try_load_config_from_path(path)? {
            Some(config) => Ok(LoadedConfig {
                config,
                source: Some(path.to_path_buf()),
            }),
            None => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            }),
        };
    }

    for dir in directory_ancestors(start, MAX_TRAVERSAL_DEPTH) {
        let path = dir.join(CONFIG_FILE_NAME);
        if let Some(config) = try_load_config_from_path(&path)? {
            return Ok(LoadedConfig {
                config,
                source: Some(path),
            });
        }
    }

    log::debug!(
        "No config found after checking {} directories. Using default config.",
        MAX_TRAVERSAL_DEPTH
    );
    Ok(LoadedConfig {
        config: PipelineConfig::default(),
        source: None,
    })
}

/// [`load_config_from`] starting at the current directory.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let current = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            log::warn!("Failed to get current directory: {}. Using default config.", e);
            return match explicit {
                Some(path) => load_config_from(Some(path), PathBuf::from(".")),
                None => Ok(LoadedConfig {
                    config: PipelineConfig::default(),
                    source: None,
                }),
            };
        }
    };
    load_config_from(explicit, current)
}
