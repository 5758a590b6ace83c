//! Data source error types
//!
//! The kinds that cross component boundaries. Framing and launch errors are
//! wrapped transparently from the protocol and transport crates.

use thiserror::Error;

/// Errors surfaced by the data source manager
#[derive(Debug, Error)]
pub enum SourceError {
    /// The user-supplied definition string could not be parsed
    #[error("malformed source definition '{definition}': {reason}")]
    DefinitionParse { definition: String, reason: String },

    /// A probe race finished without any driver claiming the definition
    #[error("no registered driver matched source '{0}'")]
    NoDriverMatched(String),

    /// The definition named a type no driver is registered for
    #[error("unknown source type '{0}'")]
    UnknownType(String),

    /// A driver with this type tag is already registered
    #[error("a driver with type '{0}' is already registered")]
    DuplicateType(String),

    /// The operation requires a running source
    #[error("source is not running")]
    SourceClosed,

    /// Child transport failure
    #[error(transparent)]
    Transport(#[from] aircap_transport::TransportError),

    /// Wire protocol failure
    #[error(transparent)]
    Protocol(#[from] aircap_protocol::ProtocolError),
}

impl SourceError {
    /// Create a definition parse error
    pub fn parse(definition: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DefinitionParse {
            definition: definition.into(),
            reason: reason.into(),
        }
    }
}
