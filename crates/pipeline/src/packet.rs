//! Captured packet container

use std::time::Duration;

use aircap_protocol::{GpsReport, PacketReport, SignalReport};
use bytes::Bytes;

/// One captured packet with its radio-layer and position components
///
/// The payload is `bytes::Bytes`, so cloning a packet for fan-out is O(1).
#[derive(Debug, Clone)]
pub struct CapturePacket {
    /// Capture timestamp, seconds since the epoch
    pub tv_sec: u64,

    /// Capture timestamp, microsecond component
    pub tv_usec: u64,

    /// Data link type of the payload
    pub dlt: u64,

    /// Raw link-layer bytes
    pub data: Bytes,

    /// Radio measurements reported alongside the packet, if any
    pub signal: Option<SignalReport>,

    /// Position fix reported alongside the packet, if any
    pub gps: Option<GpsReport>,
}

impl CapturePacket {
    /// Build a packet from a decoded `packet` report
    pub fn from_report(report: PacketReport) -> Self {
        Self {
            tv_sec: report.tv_sec,
            tv_usec: report.tv_usec,
            dlt: report.dlt,
            data: Bytes::from(report.packet),
            signal: None,
            gps: None,
        }
    }

    /// Attach a radio signal component
    pub fn with_signal(mut self, signal: SignalReport) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Attach a GPS component
    pub fn with_gps(mut self, gps: GpsReport) -> Self {
        self.gps = Some(gps);
        self
    }

    /// Capture timestamp as a duration since the epoch
    #[inline]
    pub fn timestamp(&self) -> Duration {
        Duration::new(self.tv_sec, (self.tv_usec as u32).saturating_mul(1000))
    }

    /// Payload length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
