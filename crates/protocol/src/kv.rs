//! KV payload schema - typed views of well-known payload objects
//!
//! Payload objects are MessagePack maps with string keys, except `success`
//! (a single byte) and `definition`/`chanset` (raw UTF-8). Decoders ignore
//! unknown fields; missing required fields produce a [`ProtocolError::Schema`]
//! scoped to the offending key.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::Result;

/// Decode the `success` object: exactly one byte, nonzero = true
pub fn decode_success(object: &[u8]) -> Result<bool> {
    if object.len() != 1 {
        return Err(ProtocolError::schema(
            "success",
            format!("expected 1 byte, got {}", object.len()),
        ));
    }
    Ok(object[0] != 0)
}

/// Encode a `success` object
#[inline]
pub fn encode_success(success: bool) -> [u8; 1] {
    [u8::from(success)]
}

/// `message` object: a log line plus the child's severity flags
#[derive(Debug, Clone, Deserialize)]
pub struct MessageReport {
    /// Message text
    pub msg: String,

    /// Severity bits as defined by the capture child
    pub flags: u32,
}

/// Severity flag: informational
pub const MSG_INFO: u32 = 1;
/// Severity flag: error
pub const MSG_ERROR: u32 = 2;
/// Severity flag: fatal, child is about to exit
pub const MSG_FATAL: u32 = 8;

/// Decode a `message` object
pub fn decode_message(object: &[u8]) -> Result<MessageReport> {
    rmp_serde::from_slice(object).map_err(|e| ProtocolError::schema("message", e.to_string()))
}

/// `channels` object: the channels a source reports as usable
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelsReport {
    /// Channel names, phy-specific strings
    pub channels: Vec<String>,
}

/// Decode a `channels` object
pub fn decode_channels(object: &[u8]) -> Result<ChannelsReport> {
    rmp_serde::from_slice(object).map_err(|e| ProtocolError::schema("channels", e.to_string()))
}

/// `chanhop` object sent with a CONFIGURE command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChanHopPayload {
    /// Hop rate in hops/second
    pub rate: f64,

    /// Ordered channel sequence to hop across
    pub channels: Vec<String>,
}

/// Encode a `chanhop` object
pub fn encode_chanhop(rate: f64, channels: &[String]) -> Result<Vec<u8>> {
    let payload = ChanHopPayload {
        rate,
        channels: channels.to_vec(),
    };
    rmp_serde::to_vec_named(&payload).map_err(|e| ProtocolError::schema("chanhop", e.to_string()))
}

/// `packet` object: one captured frame with its link type and timestamp
///
/// All fields are required; `size` must match the payload length.
#[derive(Debug, Clone, Deserialize)]
pub struct PacketReport {
    /// Capture timestamp, seconds
    pub tv_sec: u64,

    /// Capture timestamp, microseconds
    pub tv_usec: u64,

    /// Data link type of the payload
    pub dlt: u64,

    /// Declared payload size
    pub size: u64,

    /// Raw captured bytes
    #[serde(with = "serde_bytes")]
    pub packet: Vec<u8>,
}

/// Decode a `packet` object, validating the declared size
pub fn decode_packet(object: &[u8]) -> Result<PacketReport> {
    let report: PacketReport =
        rmp_serde::from_slice(object).map_err(|e| ProtocolError::schema("packet", e.to_string()))?;

    if report.size as usize != report.packet.len() {
        return Err(ProtocolError::schema(
            "packet",
            format!(
                "declared size {} does not match payload length {}",
                report.size,
                report.packet.len()
            ),
        ));
    }

    Ok(report)
}

/// Which measurement family a signal report is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalType {
    /// Calibrated dBm readings
    Dbm,
    /// Uncalibrated RSSI readings
    Rssi,
}

/// `signal` object: radio-layer measurements attached to a packet
///
/// Every field is optional; dBm and RSSI families may both be populated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignalReport {
    pub signal_dbm: Option<i32>,
    pub noise_dbm: Option<i32>,
    pub signal_rssi: Option<i32>,
    pub noise_rssi: Option<i32>,
    pub freq_khz: Option<f64>,
    pub channel: Option<String>,
    pub datarate: Option<f64>,
}

impl SignalReport {
    /// The measurement family to treat as authoritative
    ///
    /// RSSI wins when both families are present.
    pub fn signal_type(&self) -> Option<SignalType> {
        if self.signal_rssi.is_some() || self.noise_rssi.is_some() {
            Some(SignalType::Rssi)
        } else if self.signal_dbm.is_some() || self.noise_dbm.is_some() {
            Some(SignalType::Dbm)
        } else {
            None
        }
    }
}

/// Decode a `signal` object
pub fn decode_signal(object: &[u8]) -> Result<SignalReport> {
    rmp_serde::from_slice(object).map_err(|e| ProtocolError::schema("signal", e.to_string()))
}

/// `gps` object: position fix attached to a packet
///
/// Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GpsReport {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub alt: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub precision: Option<f64>,
    pub fix: Option<i32>,
    pub time: Option<u64>,
    pub name: Option<String>,
}

/// Decode a `gps` object
pub fn decode_gps(object: &[u8]) -> Result<GpsReport> {
    rmp_serde::from_slice(object).map_err(|e| ProtocolError::schema("gps", e.to_string()))
}
