//! Configuration for bedrock-kv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{KvError, Result};

/// Main configuration for a database handle
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Directory holding the database file.
    /// Internal structure:
    ///   {data_dir}/
    ///     └── {name}.db
    pub data_dir: PathBuf,

    /// Database name, used for the file name and in log output
    pub name: String,

    /// Engine page cache size (in bytes)
    pub cache_size: usize,

    // -------------------------------------------------------------------------
    // Diagnostics Configuration
    // -------------------------------------------------------------------------
    /// How often the background reporter logs engine stats
    pub stats_interval: Duration,

    /// Whether to start the background stats reporter on open
    pub report_stats: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./bedrock_data"),
            name: "bedrock".to_string(),
            cache_size: 64 * 1024 * 1024, // 64 MB
            stats_interval: Duration::from_secs(60),
            report_stats: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Full path of the database file: `{data_dir}/{name}.db`
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.db", self.name))
    }

    /// Reject configurations the engine cannot be opened with
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(KvError::Config("database name cannot be empty".to_string()));
        }
        if self.report_stats && self.stats_interval.is_zero() {
            return Err(KvError::Config("stats interval must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the database name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the engine page cache size (in bytes)
    pub fn cache_size(mut self, bytes: usize) -> Self {
        self.config.cache_size = bytes;
        self
    }

    /// Set the stats reporting interval
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.config.stats_interval = interval;
        self
    }

    /// Enable or disable the background stats reporter
    pub fn report_stats(mut self, enabled: bool) -> Self {
        self.config.report_stats = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
