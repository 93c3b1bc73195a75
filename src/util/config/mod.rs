//! Platform configuration
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high → low):
//! 1. CLI arguments
//! 2. Environment variables (YAOXIANG_PLATFORM_THREADS, YAOXIANG_PLATFORM_LOG)
//! 3. Config file (yaoxiang-platform.toml)
//! 4. Default values
//! ```
//!
//! # Usage
//!
//! ```rust
//! use yaoxiang_platform::util::config::PlatformConfig;
//!
//! let config = PlatformConfig::default().with_env().unwrap();
//! assert!(config.thread_pool_size >= 0);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::runtime::scheduler::WorkerOptions;
use crate::util::logger::LogLevel;

/// Environment variable overriding the pool size
pub const ENV_THREADS: &str = "YAOXIANG_PLATFORM_THREADS";

/// Environment variable overriding the log level
pub const ENV_LOG: &str = "YAOXIANG_PLATFORM_LOG";

/// Default config file name
pub const CONFIG_FILE_NAME: &str = "yaoxiang-platform.toml";

/// Platform configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Requested worker count; 0 picks one less than the hardware parallelism
    pub thread_pool_size: i32,
    /// Worker thread name prefix
    pub thread_name_prefix: String,
    /// Worker stack size in bytes
    pub stack_size: Option<usize>,
    /// Log level used by the CLI
    pub log_level: LogLevel,
    /// Trace categories enabled on the built-in tracing controller
    pub trace_categories: Vec<String>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            thread_pool_size: 0,
            thread_name_prefix: "yx-platform-worker".to_string(),
            stack_size: None,
            log_level: LogLevel::Info,
            trace_categories: Vec::new(),
        }
    }
}

impl PlatformConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PlatformConfig = toml::from_str(content)?;
        config.validate()
    }

    /// Load a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply environment overrides.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_overrides(
            std::env::var(ENV_THREADS).ok().as_deref(),
            std::env::var(ENV_LOG).ok().as_deref(),
        )
    }

    /// Apply overrides given as raw strings, as read from the environment.
    pub fn with_overrides(
        mut self,
        threads: Option<&str>,
        log: Option<&str>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = threads {
            self.thread_pool_size = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue {
                    key: ENV_THREADS,
                    value: raw.to_string(),
                })?;
        }
        if let Some(raw) = log {
            self.log_level = raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_LOG,
                value: raw.to_string(),
            })?;
        }
        self.validate()
    }

    /// Reject values the platform would treat as misuse.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.thread_pool_size < 0 {
            return Err(ConfigError::InvalidThreads(self.thread_pool_size));
        }
        Ok(self)
    }

    /// Worker spawn options derived from this config.
    pub fn worker_options(&self) -> WorkerOptions {
        WorkerOptions {
            thread_name_prefix: self.thread_name_prefix.clone(),
            stack_size: self.stack_size,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`PlatformConfig`]
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Negative worker count
    #[error("thread_pool_size must be >= 0, got {0}")]
    InvalidThreads(i32),

    /// An override could not be parsed
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}
