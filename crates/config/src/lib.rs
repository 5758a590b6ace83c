//! Aircap Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use aircap_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[capture]\nbin_paths = [\"/opt/capture\"]").unwrap();
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [api]
//! port = 2501
//!
//! [capture]
//! bin_paths = ["/usr/local/libexec/aircap"]
//! retry_interval = "10s"
//! sources = ["wlan0:type=wifi_mon"]
//!
//! [[capture.driver]]
//! type = "wifi_mon"
//! description = "Linux monitor-mode wifi capture"
//! binary = "cap_wifi_mon"
//! ```

mod api;
mod capture;
mod error;
mod logging;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use api::ApiConfig;
pub use capture::{CaptureConfig, DriverConfig};
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// HTTP API configuration
    pub api: ApiConfig,

    /// Capture subsystem (drivers, allow-list, retry timing)
    pub capture: CaptureConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Checks for:
    /// - Unique driver type tags
    /// - Non-empty driver tags and binaries
    /// - Sensible timing and queue values
    fn validate(&self) -> Result<()> {
        let mut seen = Vec::new();
        for driver in &self.capture.drivers {
            let tag = driver.type_tag.to_ascii_lowercase();
            if tag.is_empty() {
                return Err(ConfigError::invalid_value(
                    "capture",
                    "driver.type",
                    "type tag must not be empty",
                ));
            }
            if driver.binary.is_empty() {
                return Err(ConfigError::invalid_value(
                    "capture",
                    "driver.binary",
                    format!("driver '{tag}' has no capture binary"),
                ));
            }
            if seen.contains(&tag) {
                return Err(ConfigError::DuplicateDriver(tag));
            }
            seen.push(tag);
        }

        if self.capture.chain_depth == 0 {
            return Err(ConfigError::invalid_value(
                "capture",
                "chain_depth",
                "must be greater than zero",
            ));
        }
        if self.capture.retry_interval.is_zero() {
            return Err(ConfigError::invalid_value(
                "capture",
                "retry_interval",
                "must be greater than zero",
            ));
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::time::Duration;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.api.port, 2501);
        assert_eq!(config.capture.retry_interval, Duration::from_secs(10));
        assert!(config.capture.drivers.is_empty());
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[log]
level = "debug"

[api]
address = "0.0.0.0"
port = 2501

[capture]
bin_paths = ["/opt/capture"]
retry_interval = "5s"
probe_timeout = "30s"
chain_depth = 1024
sources = ["wlan0:type=wifi_mon", "hci0:type=bt"]

[[capture.driver]]
type = "wifi_mon"
description = "Monitor mode wifi"
binary = "cap_wifi_mon"

[[capture.driver]]
type = "bt"
description = "Bluetooth baseband"
binary = "cap_bt"
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.capture.drivers.len(), 2);
        assert_eq!(config.capture.sources.len(), 2);
        assert_eq!(config.capture.chain_depth, 1024);
        assert_eq!(config.capture.probe_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_duplicate_driver_rejected() {
        let toml = r#"
[[capture.driver]]
type = "wifi_mon"
binary = "cap_a"

[[capture.driver]]
type = "WIFI_MON"
binary = "cap_b"
"#;
        let err = Config::from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateDriver(t) if t == "wifi_mon"));
    }

    #[test]
    fn test_empty_driver_binary_rejected() {
        let toml = r#"
[[capture.driver]]
type = "wifi_mon"
binary = ""
"#;
        let err = Config::from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_zero_chain_depth_rejected() {
        let toml = r#"
[capture]
chain_depth = 0
"#;
        let err = Config::from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_str("invalid { toml");
        assert!(result.is_err());
    }
}
