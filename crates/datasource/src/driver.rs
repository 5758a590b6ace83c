//! Source drivers
//!
//! A driver is an immutable descriptor for one kind of capture source: a
//! unique type tag, a human description, and the capture binary its children
//! run. Drivers act as prototypes - they can mint fresh [`DataSource`]
//! instances either in probe mode (no packet delivery) or as full sources
//! bound to the packet chain.

use std::path::PathBuf;
use std::sync::Arc;

use aircap_pipeline::PacketChain;
use serde::Serialize;

use crate::error::SourceError;
use crate::source::DataSource;

/// Immutable descriptor of a registered source driver
#[derive(Debug)]
pub struct SourceDriver {
    type_tag: String,
    description: String,
    ipc_binary: String,
}

impl SourceDriver {
    /// Create a driver descriptor
    ///
    /// The type tag is lowercased; lookups are case-insensitive.
    pub fn new(
        type_tag: impl Into<String>,
        description: impl Into<String>,
        ipc_binary: impl Into<String>,
    ) -> Self {
        Self {
            type_tag: type_tag.into().to_ascii_lowercase(),
            description: description.into(),
            ipc_binary: ipc_binary.into(),
        }
    }

    /// The driver's unique, lowercase type tag
    #[inline]
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    /// Human-readable description
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Name of the capture binary this driver's children run
    #[inline]
    pub fn ipc_binary(&self) -> &str {
        &self.ipc_binary
    }

    /// Mint a prototype instance for probing
    ///
    /// Prototypes can answer probe requests but never deliver packets.
    pub fn build_prototype(self: &Arc<Self>, bin_paths: Vec<PathBuf>) -> Arc<DataSource> {
        DataSource::new(self.type_tag.clone(), self.ipc_binary.clone(), None, bin_paths)
    }

    /// Mint a full source instance bound to the packet chain
    pub fn build_source(
        self: &Arc<Self>,
        chain: PacketChain,
        bin_paths: Vec<PathBuf>,
    ) -> Arc<DataSource> {
        DataSource::new(
            self.type_tag.clone(),
            self.ipc_binary.clone(),
            Some(chain),
            bin_paths,
        )
    }
}

/// Serializable driver summary for the HTTP surface
#[derive(Debug, Clone, Serialize)]
pub struct DriverInfo {
    /// Driver type tag
    #[serde(rename = "type")]
    pub type_tag: String,

    /// Human-readable description
    pub description: String,
}

/// Registered drivers in insertion order with unique type tags
///
/// Registration order matters: probe races start prototypes in this order,
/// so earlier registrations take precedence on simultaneous success.
#[derive(Debug, Default)]
pub struct DriverRegistry {
    drivers: Vec<Arc<SourceDriver>>,
}

impl DriverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver, rejecting duplicate type tags
    pub fn register(&mut self, driver: SourceDriver) -> Result<(), SourceError> {
        if self.find(driver.type_tag()).is_some() {
            return Err(SourceError::DuplicateType(driver.type_tag().to_string()));
        }
        tracing::debug!(
            source_type = driver.type_tag(),
            binary = driver.ipc_binary(),
            "registered source driver"
        );
        self.drivers.push(Arc::new(driver));
        Ok(())
    }

    /// Case-insensitive lookup by type tag
    pub fn find(&self, type_tag: &str) -> Option<Arc<SourceDriver>> {
        let needle = type_tag.to_ascii_lowercase();
        self.drivers
            .iter()
            .find(|d| d.type_tag() == needle)
            .cloned()
    }

    /// All drivers in registration order
    pub fn all(&self) -> Vec<Arc<SourceDriver>> {
        self.drivers.clone()
    }

    /// Serializable summaries in registration order
    pub fn infos(&self) -> Vec<DriverInfo> {
        self.drivers
            .iter()
            .map(|d| DriverInfo {
                type_tag: d.type_tag().to_string(),
                description: d.description().to_string(),
            })
            .collect()
    }

    /// Number of registered drivers
    #[inline]
    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    /// Whether no drivers are registered
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}
