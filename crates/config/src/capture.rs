//! Capture configuration
//!
//! Settings for the data source manager: the binary launch allow-list,
//! retry and probe timing, driver descriptors, and sources to open at boot.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// One registered capture driver
///
/// # Example
///
/// ```toml
/// [[capture.driver]]
/// type = "wifi_mon"
/// description = "Linux monitor-mode wifi capture"
/// binary = "cap_wifi_mon"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DriverConfig {
    /// Unique driver type tag (case-insensitive)
    #[serde(rename = "type")]
    pub type_tag: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Capture binary launched for this driver's sources
    pub binary: String,
}

/// Capture subsystem configuration
///
/// # Example
///
/// ```toml
/// [capture]
/// bin_paths = ["/usr/local/libexec/aircap", "/usr/libexec/aircap"]
/// retry_interval = "10s"
/// probe_timeout = "15s"
/// sources = ["wlan0:type=wifi_mon"]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Ordered directories capture binaries may be launched from.
    /// Launches outside these paths are refused.
    pub bin_paths: Vec<PathBuf>,

    /// Interval between retry attempts for failed sources
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub retry_interval: Duration,

    /// Deadline for driver auto-detection probes
    /// Default: 15s
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,

    /// Packet chain queue depth
    /// Default: 4096
    pub chain_depth: usize,

    /// Registered capture drivers
    #[serde(rename = "driver")]
    pub drivers: Vec<DriverConfig>,

    /// Source definitions opened at startup
    pub sources: Vec<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            bin_paths: vec![
                PathBuf::from("/usr/local/libexec/aircap"),
                PathBuf::from("/usr/libexec/aircap"),
            ],
            retry_interval: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(15),
            chain_depth: 4096,
            drivers: Vec::new(),
            sources: Vec::new(),
        }
    }
}
