//! Packet chain - bounded fan-in channel with drop accounting
//!
//! # Design
//!
//! - Clonable submit handle; every source holds its own clone
//! - Non-blocking `try_send` so a stalled consumer never blocks capture
//! - Dropped packets are counted, not silently discarded
//! - Metrics use relaxed atomics with a point-in-time snapshot view

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::packet::CapturePacket;

/// Counters shared by all submit handles of one chain
#[derive(Debug, Default)]
pub struct ChainMetrics {
    /// Packets accepted into the queue
    pub packets_submitted: AtomicU64,

    /// Packets dropped because the queue was full
    pub packets_dropped: AtomicU64,

    /// Total payload bytes accepted
    pub bytes_submitted: AtomicU64,
}

impl ChainMetrics {
    /// Create a zeroed metrics instance
    pub const fn new() -> Self {
        Self {
            packets_submitted: AtomicU64::new(0),
            packets_dropped: AtomicU64::new(0),
            bytes_submitted: AtomicU64::new(0),
        }
    }

    /// Record an accepted packet
    #[inline]
    pub fn submitted(&self, bytes: u64) {
        self.packets_submitted.fetch_add(1, Ordering::Relaxed);
        self.bytes_submitted.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a dropped packet
    #[inline]
    pub fn dropped(&self) {
        self.packets_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters
    pub fn snapshot(&self) -> ChainMetricsSnapshot {
        ChainMetricsSnapshot {
            packets_submitted: self.packets_submitted.load(Ordering::Relaxed),
            packets_dropped: self.packets_dropped.load(Ordering::Relaxed),
            bytes_submitted: self.bytes_submitted.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of chain counters
#[derive(Debug, Clone, Copy)]
pub struct ChainMetricsSnapshot {
    pub packets_submitted: u64,
    pub packets_dropped: u64,
    pub bytes_submitted: u64,
}

/// Handle for reading chain metrics externally
///
/// Remains valid after the receiving end has been handed to the consumer.
#[derive(Clone)]
pub struct ChainMetricsHandle {
    metrics: Arc<ChainMetrics>,
}

impl ChainMetricsHandle {
    /// Get a snapshot of the chain counters
    pub fn snapshot(&self) -> ChainMetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Receiving end of the packet chain
///
/// Held by the downstream consumer; yields packets in submission order per
/// source.
pub struct PacketReceiver {
    rx: mpsc::Receiver<CapturePacket>,
}

impl PacketReceiver {
    /// Receive the next packet, or `None` once every submit handle is gone
    pub async fn recv(&mut self) -> Option<CapturePacket> {
        self.rx.recv().await
    }

    /// Non-blocking receive; `None` when the queue is currently empty
    pub fn try_recv(&mut self) -> Option<CapturePacket> {
        self.rx.try_recv().ok()
    }
}

/// Clonable, thread-safe packet submission handle
#[derive(Clone)]
pub struct PacketChain {
    tx: mpsc::Sender<CapturePacket>,
    metrics: Arc<ChainMetrics>,
}

impl PacketChain {
    /// Create a chain with the given queue depth
    ///
    /// Returns the submit handle and the consumer's receiving end.
    pub fn new(depth: usize) -> (Self, PacketReceiver) {
        let (tx, rx) = mpsc::channel(depth);
        let chain = Self {
            tx,
            metrics: Arc::new(ChainMetrics::new()),
        };
        (chain, PacketReceiver { rx })
    }

    /// Submit a packet without blocking
    ///
    /// Returns `true` if the packet was queued. A full or closed queue drops
    /// the packet and records the drop.
    pub fn submit(&self, packet: CapturePacket) -> bool {
        let bytes = packet.len() as u64;
        match self.tx.try_send(packet) {
            Ok(()) => {
                self.metrics.submitted(bytes);
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.metrics.dropped();
                tracing::trace!("packet chain full, dropping packet");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.metrics.dropped();
                tracing::debug!("packet chain closed, dropping packet");
                false
            }
        }
    }

    /// Get a metrics handle for reporting
    pub fn metrics_handle(&self) -> ChainMetricsHandle {
        ChainMetricsHandle {
            metrics: Arc::clone(&self.metrics),
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn packet(data: &'static [u8]) -> CapturePacket {
        CapturePacket {
            tv_sec: 1,
            tv_usec: 0,
            dlt: 127,
            data: Bytes::from_static(data),
            signal: None,
            gps: None,
        }
    }

    #[tokio::test]
    async fn test_submit_and_receive_in_order() {
        let (chain, mut rx) = PacketChain::new(8);

        assert!(chain.submit(packet(b"one")));
        assert!(chain.submit(packet(b"two")));

        assert_eq!(rx.recv().await.unwrap().data.as_ref(), b"one");
        assert_eq!(rx.recv().await.unwrap().data.as_ref(), b"two");

        let snapshot = chain.metrics_handle().snapshot();
        assert_eq!(snapshot.packets_submitted, 2);
        assert_eq!(snapshot.bytes_submitted, 6);
        assert_eq!(snapshot.packets_dropped, 0);
    }

    #[tokio::test]
    async fn test_full_queue_drops() {
        let (chain, _rx) = PacketChain::new(1);

        assert!(chain.submit(packet(b"kept")));
        assert!(!chain.submit(packet(b"dropped")));

        let snapshot = chain.metrics_handle().snapshot();
        assert_eq!(snapshot.packets_submitted, 1);
        assert_eq!(snapshot.packets_dropped, 1);
    }

    #[tokio::test]
    async fn test_closed_receiver_drops() {
        let (chain, rx) = PacketChain::new(4);
        drop(rx);

        assert!(!chain.submit(packet(b"late")));
        assert_eq!(chain.metrics_handle().snapshot().packets_dropped, 1);
    }
}
