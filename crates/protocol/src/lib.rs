//! Capture Protocol - Wire framing and payload schema for capture children
//!
//! Every capture child speaks a length-prefixed, checksummed binary framing
//! protocol over its stdio pipe. A frame carries a 16-byte ASCII type tag and
//! a set of named key/value objects; the objects themselves are either raw
//! bytes (`definition`, `chanset`, `success`) or MessagePack maps (`message`,
//! `channels`, `chanhop`, `packet`, `signal`, `gps`).
//!
//! # Design
//!
//! - **Incremental decode**: `decode_frame` works against a `BytesMut`
//!   accumulation buffer and returns `Ok(None)` until a complete frame is
//!   buffered, so callers can feed it straight from `read_buf` loops.
//! - **Zero-copy payloads**: decoded KV objects are `bytes::Bytes` slices of
//!   the frame buffer; no per-object allocation beyond the map entry.
//! - **Fatal vs recoverable**: framing-level errors (bad signature, bad
//!   checksum, truncated records) poison the stream and require the caller
//!   to close the transport; schema-level errors affect only one object.

mod error;
mod fixed;
mod frame;
mod kv;

pub use error::ProtocolError;
pub use fixed::FixedAscii;
pub use frame::{
    decode_frame, encode_frame, DecodedFrame, FRAME_HEADER_SIZE, FRAME_SIGNATURE, KV_HEADER_SIZE,
    MAX_FRAME_SIZE, TAG_LEN,
};
pub use kv::{
    decode_channels, decode_gps, decode_message, decode_packet, decode_signal, decode_success,
    encode_chanhop, encode_success, ChanHopPayload, ChannelsReport, GpsReport, MessageReport,
    PacketReport, SignalReport, SignalType, MSG_ERROR, MSG_FATAL, MSG_INFO,
};

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Frame type: command instructing the child to open its capture device
pub const FRAME_OPENDEVICE: &str = "OPENDEVICE";

/// Frame type: command carrying channel configuration (`chanset`/`chanhop`)
pub const FRAME_CONFIGURE: &str = "CONFIGURE";

/// Frame type: child readiness / status report
pub const FRAME_STATUS: &str = "status";

/// Frame type: child response to an auto-detection probe
pub const FRAME_PROBERESP: &str = "proberesp";

/// Frame type: child response to an open command
pub const FRAME_OPENRESP: &str = "openresp";

/// Frame type: fatal error report from the child
pub const FRAME_ERROR: &str = "error";

/// Frame type: informational message from the child
pub const FRAME_MESSAGE: &str = "message";

/// Frame type: captured packet report
pub const FRAME_DATA: &str = "data";

#[cfg(test)]
mod kv_test;
