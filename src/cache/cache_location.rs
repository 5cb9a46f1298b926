use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding the cache directory.
pub const CACHE_DIR_ENV: &str = "PITCHCRAWL_CACHE_DIR";

/// Strategy for cache storage location
#[derive(Debug, Clone, PartialEq)]
pub enum CacheStrategy {
    /// Store cache in the platform's shared cache directory (default)
    Shared,
    /// Store cache in a user-specified location
    Custom(PathBuf),
}

/// Where the request cache lives on disk
#[derive(Debug, Clone)]
pub struct CacheLocation {
    pub strategy: CacheStrategy,
    pub base_path: PathBuf,
}

impl CacheLocation {
    /// Resolve the cache location.
    ///
    /// Precedence: explicit flag, `PITCHCRAWL_CACHE_DIR`, the config file's
    /// `[cache] directory`, then the platform cache directory.
    pub fn resolve(cli_dir: Option<&Path>, config_dir: Option<&Path>) -> Self {
        let strategy = if let Some(dir) = cli_dir {
            CacheStrategy::Custom(dir.to_path_buf())
        } else if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
            CacheStrategy::Custom(PathBuf::from(dir))
        } else if let Some(dir) = config_dir {
            CacheStrategy::Custom(dir.to_path_buf())
        } else {
            CacheStrategy::Shared
        };

        let base_path = match &strategy {
            CacheStrategy::Shared => Self::get_shared_cache_dir(),
            CacheStrategy::Custom(path) => path.clone(),
        };

        Self {
            strategy,
            base_path,
        }
    }

    /// Get platform-specific shared cache directory
    fn get_shared_cache_dir() -> PathBuf {
        // Try XDG_CACHE_HOME first
        if let Some(xdg_cache) = std::env::var_os("XDG_CACHE_HOME").filter(|v| !v.is_empty()) {
            return PathBuf::from(xdg_cache).join("pitchcrawl");
        }

        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("pitchcrawl");
        }

        // Fallback to temp directory
        std::env::temp_dir().join("pitchcrawl_cache")
    }

    pub fn get_cache_path(&self) -> &Path {
        &self.base_path
    }

    /// Create the cache directory
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.base_path).with_context(|| {
            format!("Failed to create cache directory: {:?}", self.base_path)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cli_dir_wins() {
        let cli = TempDir::new().unwrap();
        let config = TempDir::new().unwrap();
        let location = CacheLocation::resolve(Some(cli.path()), Some(config.path()));
        assert_eq!(location.strategy, CacheStrategy::Custom(cli.path().to_path_buf()));
        assert_eq!(location.get_cache_path(), cli.path());
    }

    #[test]
    fn test_ensure_directories_creates_nested_path() {
        let root = TempDir::new().unwrap();
        let nested = root.path().join("a").join("b");
        let location = CacheLocation::resolve(Some(&nested), None);
        location.ensure_directories().unwrap();
        assert!(nested.is_dir());
    }
}
