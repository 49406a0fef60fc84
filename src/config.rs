//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Only the `[serial]` section is mandatory, and within it `port` and
//! `baud_rate` have no defaults: a link without them is a deployment
//! mistake, not something to guess around.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{GimbalLinkError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub serial: SerialConfig,

    #[serde(default)]
    pub link: LinkConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    pub port: String,

    pub baud_rate: u32,

    /// Read timeout; bounds how long shutdown waits on an in-flight read
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Receiver loop and reconnection tuning
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Consecutive bad reads/frames tolerated before reconnecting
    #[serde(default = "default_error_threshold")]
    pub error_threshold: u32,

    /// Reopen attempts per reconnect sequence
    #[serde(default = "default_max_retry_count")]
    pub max_retry_count: u32,

    /// Pause after a failed read
    #[serde(default = "default_read_error_backoff_us")]
    pub read_error_backoff_us: u64,

    /// Pause between closing and reopening the port
    #[serde(default = "default_reconnect_close_delay_ms")]
    pub reconnect_close_delay_ms: u64,

    /// Pause after a failed reopen
    #[serde(default = "default_reconnect_retry_delay_ms")]
    pub reconnect_retry_delay_ms: u64,

    /// How often the application reports mode and link statistics
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily rolling log files; stdout only when unset
    #[serde(default)]
    pub dir: Option<String>,
}

// Default value functions
fn default_timeout_ms() -> u64 { 20 }

fn default_error_threshold() -> u32 { 5000 }
fn default_max_retry_count() -> u32 { 10 }
fn default_read_error_backoff_us() -> u64 { 10 }
fn default_reconnect_close_delay_ms() -> u64 { 500 }
fn default_reconnect_retry_delay_ms() -> u64 { 1000 }
fn default_status_interval_ms() -> u64 { 1000 }

fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_format() -> String { "jsonl".to_string() }

fn default_log_level() -> String { "info".to_string() }

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            error_threshold: default_error_threshold(),
            max_retry_count: default_max_retry_count(),
            read_error_backoff_us: default_read_error_backoff_us(),
            reconnect_close_delay_ms: default_reconnect_close_delay_ms(),
            reconnect_retry_delay_ms: default_reconnect_retry_delay_ms(),
            status_interval_ms: default_status_interval_ms(),
        }
    }
}

impl LinkConfig {
    pub fn read_error_backoff(&self) -> Duration {
        Duration::from_micros(self.read_error_backoff_us)
    }

    pub fn reconnect_close_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_close_delay_ms)
    }

    pub fn reconnect_retry_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_retry_delay_ms)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            format: default_log_format(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> GimbalLinkError {
    GimbalLinkError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails (including a missing port or baud rate)
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gimbal_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.trim().is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if self.serial.baud_rate == 0 {
            return Err(invalid("baud_rate must be greater than 0"));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 10000 {
            return Err(invalid("timeout_ms must be between 1 and 10000"));
        }

        if self.link.error_threshold == 0 {
            return Err(invalid("error_threshold must be greater than 0"));
        }

        if self.link.max_retry_count == 0 || self.link.max_retry_count > 1000 {
            return Err(invalid("max_retry_count must be between 1 and 1000"));
        }

        if self.link.read_error_backoff_us > 1_000_000 {
            return Err(invalid("read_error_backoff_us must not exceed 1000000"));
        }

        if self.link.reconnect_close_delay_ms > 60000 {
            return Err(invalid("reconnect_close_delay_ms must not exceed 60000"));
        }

        if self.link.reconnect_retry_delay_ms == 0 || self.link.reconnect_retry_delay_ms > 60000 {
            return Err(invalid("reconnect_retry_delay_ms must be between 1 and 60000"));
        }

        if self.link.status_interval_ms == 0 || self.link.status_interval_ms > 60000 {
            return Err(invalid("status_interval_ms must be between 1 and 60000"));
        }

        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if self.telemetry.format != "jsonl" {
            return Err(invalid("log format must be 'jsonl' (only supported format)"));
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("logging level must be one of: trace, debug, info, warn, error"));
        }

        if matches!(self.logging.dir.as_deref(), Some(dir) if dir.is_empty()) {
            return Err(invalid("logging dir cannot be empty when set"));
        }

        Ok(())
    }
}
