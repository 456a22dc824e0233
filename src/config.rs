//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field is optional; an empty document yields
//! [`Config::default`].

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::controller::TargetKind;
use crate::error::{Result, TargetError};
use crate::transport::DeviceIds;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub target: TargetConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Emulated target configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TargetConfig {
    #[serde(default)]
    pub kind: TargetKind,

    /// Overrides the kind's vendor ID
    #[serde(default)]
    pub vendor_id: Option<u16>,

    /// Overrides the kind's product ID
    #[serde(default)]
    pub product_id: Option<u16>,

    #[serde(default = "default_auto_submit")]
    pub auto_submit: bool,
}

/// Output report configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct OutputConfig {
    /// 0 waits indefinitely
    #[serde(default)]
    pub await_timeout_ms: u64,

    #[serde(default = "default_report_rate_hz")]
    pub report_rate_hz: u32,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_auto_submit() -> bool { true }

fn default_report_rate_hz() -> u32 { 60 }

fn default_log_level() -> String { "info".to_string() }

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            kind: TargetKind::default(),
            vendor_id: None,
            product_id: None,
            auto_submit: default_auto_submit(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            await_timeout_ms: 0,
            report_rate_hz: default_report_rate_hz(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level() }
    }
}

impl TargetConfig {
    /// USB identity of the kind with any overrides applied.
    pub fn device_ids(&self) -> DeviceIds {
        let base = self.kind.device_ids();
        DeviceIds {
            vendor_id: self.vendor_id.unwrap_or(base.vendor_id),
            product_id: self.product_id.unwrap_or(base.product_id),
        }
    }
}

impl OutputConfig {
    /// Await bound, or `None` to wait indefinitely.
    pub fn await_timeout(&self) -> Option<Duration> {
        match self.await_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Period of the demo report loop.
    pub fn report_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.report_rate_hz.max(1)))
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use dualsense_bus::config::Config;
    ///
    /// let config = Config::load("dualsense.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a TOML string
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.output.await_timeout_ms > 60000 {
            return Err(TargetError::Config(
                toml::de::Error::custom("await_timeout_ms must be 0 or between 1 and 60000")
            ));
        }

        if self.output.report_rate_hz == 0 || self.output.report_rate_hz > 1000 {
            return Err(TargetError::Config(
                toml::de::Error::custom("report_rate_hz must be between 1 and 1000")
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(TargetError::Config(
                toml::de::Error::custom(format!(
                    "logging level '{}' must be one of: {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ))
            ));
        }

        if self.target.vendor_id == Some(0) || self.target.product_id == Some(0) {
            return Err(TargetError::Config(
                toml::de::Error::custom("vendor_id and product_id must be non-zero")
            ));
        }

        Ok(())
    }
}
