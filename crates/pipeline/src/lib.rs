//! Packet Chain - hand-off point between capture sources and processing
//!
//! Every data source submits its decoded packets into a single shared
//! [`PacketChain`]. The chain is a bounded channel with a clonable,
//! thread-safe submit handle; downstream processing (link-layer decoders,
//! loggers, trackers) drains the receiving end. Submission is non-blocking:
//! when downstream falls behind, packets are dropped and counted rather than
//! stalling capture children.

mod chain;
mod packet;

pub use chain::{ChainMetrics, ChainMetricsHandle, ChainMetricsSnapshot, PacketChain, PacketReceiver};
pub use packet::CapturePacket;

/// Default submit queue depth
pub const DEFAULT_CHAIN_DEPTH: usize = 4096;
