//! Configuration management for omni.
//!
//! Configuration is read from `~/.config/omni/config.toml` at startup.
//! If the file doesn't exist, a default configuration with comments is created.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::library::LibrarySort;
use crate::source::DEFAULT_WORKERS;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub library: LibraryConfig,
    pub reader: ReaderConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Database file. Defaults to `<data dir>/omni/omni.db`.
    pub database_path: Option<PathBuf>,

    /// Sort order for `omni library` (default: title-asc)
    pub default_sort: LibrarySort,

    /// Maximum concurrent source requests for bulk updates and searches (default: 10)
    pub update_workers: usize,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            default_sort: LibrarySort::default(),
            update_workers: DEFAULT_WORKERS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Quiet period before a progress report is saved, in milliseconds (default: 1000)
    pub progress_debounce_ms: u64,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            progress_debounce_ms: 1000,
        }
    }
}

impl ReaderConfig {
    pub fn progress_debounce(&self) -> Duration {
        Duration::from_millis(self.progress_debounce_ms)
    }
}

/// How long a remote answer stays fresh, per kind of request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub search_secs: u64,
    pub details_secs: u64,
    pub chapters_secs: u64,
    pub popular_secs: u64,
    pub latest_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            search_secs: 300,
            details_secs: 600,
            chapters_secs: 300,
            popular_secs: 600,
            latest_secs: 120,
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/omni/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("omni").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        r##"# omni configuration

[library]
# Database file (default: <data dir>/omni/omni.db)
# database_path = "/path/to/omni.db"

# Sort order for `omni library`:
# title-asc, title-desc, last-read, unread-count, date-added
default_sort = "title-asc"

# Maximum concurrent source requests during `omni update` and `omni search`
update_workers = 10

[reader]
# Progress is saved once a chapter has been quiet this long (milliseconds)
progress_debounce_ms = 1000

[cache]
# How long remote answers are reused before asking the source again (seconds)
search_secs = 300
details_secs = 600
chapters_secs = 300
popular_secs = 600
latest_secs = 120
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_deserializes() {
        let content = Config::default_config_content();
        let config: Config = toml::from_str(&content).expect("Default config should be valid TOML");

        assert_eq!(config.library.default_sort, LibrarySort::TitleAsc);
        assert_eq!(config.library.update_workers, 10);
        assert_eq!(config.reader.progress_debounce(), Duration::from_secs(1));
        assert_eq!(config.cache.latest_secs, 120);
    }

    #[test]
    fn test_partial_config() {
        let content = r##"
[library]
default_sort = "unread-count"

[cache]
search_secs = 5
"##;
        let config: Config = toml::from_str(content).expect("Partial config should work");

        // Custom values
        assert_eq!(config.library.default_sort, LibrarySort::UnreadCount);
        assert_eq!(config.cache.search_secs, 5);
        // Default values
        assert_eq!(config.library.update_workers, 10);
        assert_eq!(config.cache.details_secs, 600);
        assert!(config.library.database_path.is_none());
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").expect("Empty config should work");

        assert_eq!(config.library.default_sort, LibrarySort::TitleAsc);
        assert_eq!(config.reader.progress_debounce_ms, 1000);
    }

    #[test]
    fn test_invalid_sort_is_rejected() {
        let content = "[library]\ndefault_sort = \"sideways\"\n";
        assert!(toml::from_str::<Config>(content).is_err());
    }

    #[test]
    fn test_load_from_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[reader\n").unwrap();

        match Config::load_from(&path) {
            Err(ConfigError::Parse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
