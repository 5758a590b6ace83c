//! Data Source Manager - discovery, supervision, and multiplexing of
//! capture sources
//!
//! A capture source is an external child process producing frames and
//! metadata from a physical or virtual interface. This crate owns the
//! parent side of that relationship end to end:
//!
//! - [`DataSource`] - one live source: lifecycle state machine, completion
//!   callbacks, pending command queue, and its child transport
//! - [`ProbeRace`] - fan-out auto-detection of the driver for a definition
//! - [`DataSourceTracker`] - the supervisor: driver registry, active and
//!   failed source lists, retry scheduling, and the surface consumed by the
//!   HTTP layer
//!
//! Decoded packets are handed to the shared [`aircap_pipeline::PacketChain`];
//! this crate never inspects packet contents.

mod definition;
mod driver;
mod error;
mod probe;
mod source;
mod tracker;

pub use definition::{SourceDefinition, TYPE_AUTO};
pub use driver::{DriverInfo, DriverRegistry, SourceDriver};
pub use error::SourceError;
pub use probe::{ProbeRace, RaceCompletion};
pub use source::{
    CompletionCallback, DataSource, ErrorCallback, Lifecycle, SourceStatus,
};
pub use tracker::{
    DataSourceTracker, OpenHandle, SourceVisitor, TrackerConfig, DEFAULT_PROBE_TIMEOUT,
    DEFAULT_RETRY_INTERVAL,
};

/// Result type for data source operations
pub type Result<T> = std::result::Result<T, SourceError>;

#[cfg(test)]
mod source_test;
#[cfg(test)]
mod testutil;
