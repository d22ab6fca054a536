//! Configuration management for tabhook
//!
//! This module handles loading, parsing, and managing configuration from various sources:
//! - Configuration files (TOML format)
//! - Environment variables
//! - Command-line arguments (run mode only)
//!
//! Configuration precedence (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values
//!
//! The shell invokes the program in completion mode with a fixed argument
//! layout, so the config file location there can only be changed through
//! `TABHOOK_CONFIG`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result, TabhookError};

/// Environment variable overriding the configuration file location
pub const CONFIG_ENV: &str = "TABHOOK_CONFIG";

/// Environment variable overriding `completion.program`
pub const PROGRAM_ENV: &str = "TABHOOK_PROGRAM";

/// Environment variable overriding `completion.reply_timeout_ms`
pub const REPLY_TIMEOUT_ENV: &str = "TABHOOK_REPLY_TIMEOUT_MS";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Completion engine configuration
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Completion tree for the program, as nested tables and string arrays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree: Option<toml::Table>,
}

/// Completion engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Program names, optionally with `|`-separated aliases (e.g. `git|g`)
    #[serde(default = "default_program")]
    pub program: String,

    /// Maximum time to wait for deferred replies in milliseconds (0 waits forever)
    #[serde(default)]
    pub reply_timeout_ms: u64,

    /// Drop deferred replies unless a handler was registered with `on_async`
    #[serde(default)]
    pub legacy_async_gate: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// Path to log file (None for stderr)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    /// Enable timestamps in logs
    #[serde(default = "default_log_timestamps")]
    pub timestamps: bool,
}

/// Log level options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

// Default value functions
fn default_program() -> String {
    "tabhook".to_string()
}

fn default_log_level() -> LogLevel {
    LogLevel::Warn
}

fn default_log_timestamps() -> bool {
    true
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            reply_timeout_ms: 0,
            legacy_async_gate: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_path: None,
            timestamps: default_log_timestamps(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a file
    ///
    /// When `path` is `None`, the location is taken from `TABHOOK_CONFIG` or
    /// falls back to [`Config::default_config_path`]. A missing implicit file
    /// yields the default configuration; a missing explicit file is an error.
    /// Environment overrides are applied on top of the file contents.
    ///
    /// # Arguments
    /// * `path` - Explicit path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Result<Config>` - Loaded configuration or error
    pub fn load_from_file(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match explicit {
            Some(path) if !path.exists() => {
                return Err(ConfigError::FileNotFound(path.display().to_string()).into());
            }
            Some(path) => Self::from_file(&path)?,
            None => {
                let path = Self::default_config_path();
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load and validate configuration, substituting defaults on failure
    ///
    /// Used where a broken configuration must not stop the program, such as
    /// while answering a completion request.
    ///
    /// # Arguments
    /// * `path` - Explicit path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `(Config, Option<TabhookError>)` - Usable configuration, and the
    ///   reason defaults were substituted if they were
    pub fn load_or_default(path: Option<&Path>) -> (Self, Option<TabhookError>) {
        match Self::load_from_file(path).and_then(|config| config.validate().map(|_| config)) {
            Ok(config) => (config, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }

    /// Parse a configuration file without applying environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply environment overrides
    ///
    /// # Arguments
    /// * `lookup` - Resolves an environment variable name to its value
    ///
    /// # Returns
    /// * `Result<()>` - Error if an override has an unparsable value
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(program) = lookup(PROGRAM_ENV) {
            self.completion.program = program;
        }

        if let Some(raw) = lookup(REPLY_TIMEOUT_ENV) {
            self.completion.reply_timeout_ms =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        field: "completion.reply_timeout_ms".to_string(),
                        value: raw.clone(),
                    })?;
        }

        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// # Returns
    /// * `PathBuf` - `~/.tabhook/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tabhook")
            .join("config.toml")
    }

    /// Validate the configuration
    ///
    /// # Returns
    /// * `Result<()>` - Ok if valid, error otherwise
    pub fn validate(&self) -> Result<()> {
        if self.completion.program.trim().is_empty() {
            return Err(ConfigError::MissingField("completion.program".to_string()).into());
        }

        if self
            .completion
            .program
            .split('|')
            .any(|segment| segment.trim().is_empty())
        {
            return Err(ConfigError::InvalidValue {
                field: "completion.program".to_string(),
                value: self.completion.program.clone(),
            }
            .into());
        }

        Ok(())
    }

    /// Serialize the effective configuration back to TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the deferred reply timeout, if any
    pub fn reply_timeout(&self) -> Option<Duration> {
        match self.completion.reply_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}
