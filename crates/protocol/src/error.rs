//! Protocol error types
//!
//! Errors that can occur when framing, parsing, or interpreting capture
//! protocol messages.

use thiserror::Error;

/// Errors that can occur during protocol operations
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Stream signature mismatch - the byte stream is desynchronized
    #[error("protocol desync: expected signature {expected:#010x}, got {actual:#010x}")]
    Desync { expected: u32, actual: u32 },

    /// Frame checksum did not match the frame contents
    #[error("checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { expected: u32, computed: u32 },

    /// A KV record's declared size runs past the end of the frame
    #[error("truncated kv record '{key}': needs {needed} bytes, {available} remain in frame")]
    TruncatedKv {
        key: String,
        needed: usize,
        available: usize,
    },

    /// Declared frame size is impossible (smaller than a header or oversized)
    #[error("invalid frame size {size}: must be {min}..={max}")]
    InvalidFrameSize { size: usize, min: usize, max: usize },

    /// A KV object exceeds the representable size
    #[error("kv object '{key}' too large: {size} bytes")]
    ObjectTooLarge { key: String, size: usize },

    /// Known frame type but a payload object failed to decode
    #[error("schema error in '{key}': {reason}")]
    Schema { key: &'static str, reason: String },

    /// A required payload object was absent from the frame
    #[error("missing required kv object '{key}'")]
    MissingObject { key: &'static str },
}

impl ProtocolError {
    /// Create a schema error for the given payload key
    #[inline]
    pub fn schema(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Schema {
            key,
            reason: reason.into(),
        }
    }

    /// Create a truncated-record error
    #[inline]
    pub fn truncated(key: impl Into<String>, needed: usize, available: usize) -> Self {
        Self::TruncatedKv {
            key: key.into(),
            needed,
            available,
        }
    }

    /// Whether this error poisons the byte stream
    ///
    /// Fatal errors mean the framing layer has lost sync with the child and
    /// the transport must be closed. Schema errors are scoped to a single
    /// payload object; the stream remains usable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Desync { .. }
                | Self::ChecksumMismatch { .. }
                | Self::TruncatedKv { .. }
                | Self::InvalidFrameSize { .. }
        )
    }
}
