//! Configuration management for repodock
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (REPODOCK_*)
//! 3. Config file (~/.config/repodock/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Where repositories, logs and the queue database live
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one subdirectory per repository
    pub repos_root: PathBuf,

    /// Directory holding the operation logs
    pub log_dir: PathBuf,

    /// SQLite file backing the job queue and catalog
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = data_dir();
        Self {
            repos_root: base.join("repos"),
            log_dir: base.join("logs"),
            database_path: base.join("repodock.db"),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Worker runner configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// How long an idle runner sleeps between claims
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Claimed jobs older than this are handed out again
    #[serde(with = "humantime_serde")]
    pub lease_timeout: Duration,

    /// Jobs a single runner executes concurrently
    pub max_parallel_jobs: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            lease_timeout: Duration::from_secs(30 * 60),
            max_parallel_jobs: 2,
        }
    }
}

/// Activity reporter limits
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReporterConfig {
    /// Pending clone jobs shown by the activity listing
    pub peek_limit: usize,

    /// Log lines included in the repository overview
    pub overview_tail_lines: usize,

    /// Log lines returned by a log tail request
    pub log_tail_lines: usize,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            peek_limit: 25,
            overview_tail_lines: 20,
            log_tail_lines: 500,
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub worker: WorkerConfig,
    pub reporter: ReporterConfig,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub repos_root: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub bind_addr: Option<String>,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/repodock/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("repodock").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - REPODOCK_REPOS_ROOT
    /// - REPODOCK_LOG_DIR
    /// - REPODOCK_DATABASE_PATH
    /// - REPODOCK_BIND_ADDR
    /// - REPODOCK_POLL_INTERVAL (humantime, e.g. `5s`)
    /// - REPODOCK_MAX_PARALLEL_JOBS
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(root) = var("REPODOCK_REPOS_ROOT") {
            self.storage.repos_root = root.into();
        }
        if let Some(dir) = var("REPODOCK_LOG_DIR") {
            self.storage.log_dir = dir.into();
        }
        if let Some(path) = var("REPODOCK_DATABASE_PATH") {
            self.storage.database_path = path.into();
        }
        if let Some(addr) = var("REPODOCK_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
        if let Some(interval) = var("REPODOCK_POLL_INTERVAL") {
            self.worker.poll_interval = humantime_serde::re::humantime::parse_duration(&interval)
                .map_err(|e| Error::Config(format!("REPODOCK_POLL_INTERVAL: {}", e)))?;
        }
        if let Some(jobs) = var("REPODOCK_MAX_PARALLEL_JOBS") {
            self.worker.max_parallel_jobs = jobs
                .parse()
                .map_err(|e| Error::Config(format!("REPODOCK_MAX_PARALLEL_JOBS: {}", e)))?;
        }

        Ok(self)
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(root) = overrides.repos_root {
            self.storage.repos_root = root;
        }
        if let Some(dir) = overrides.log_dir {
            self.storage.log_dir = dir;
        }
        if let Some(path) = overrides.database_path {
            self.storage.database_path = path;
        }
        if let Some(addr) = overrides.bind_addr {
            self.server.bind_addr = addr;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(
        config_file: Option<&Path>,
        overrides: ConfigOverrides,
    ) -> Result<Self> {
        let base = match config_file {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load()?,
        };

        Ok(base.with_env_overrides()?.with_cli_overrides(overrides))
    }

    /// Reject settings no component can run with
    pub fn validate(&self) -> Result<()> {
        if self.worker.max_parallel_jobs == 0 {
            return Err(Error::Config(
                "worker.max_parallel_jobs must be at least 1".to_string(),
            ));
        }
        if self.worker.poll_interval.is_zero() {
            return Err(Error::Config(
                "worker.poll_interval must be greater than zero".to_string(),
            ));
        }
        if self.reporter.peek_limit == 0 {
            return Err(Error::Config(
                "reporter.peek_limit must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }
}

/// `~/.local/share/repodock` on Unix
fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("repodock")
}
