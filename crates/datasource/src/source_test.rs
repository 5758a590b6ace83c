//! Tests for data source instances
//!
//! Child-facing behavior runs against real fake children (shell scripts in
//! a tempdir allow-list); frame handling that needs precise control injects
//! decoded frames directly.

#![cfg(unix)]

use std::time::Duration;

use aircap_pipeline::PacketChain;
use aircap_protocol::{decode_frame, Bytes, BytesMut, DecodedFrame};
use bytes::BufMut;

use crate::definition::SourceDefinition;
use crate::error::SourceError;
use crate::source::{DataSource, Lifecycle};
use crate::testutil::{
    data_frame, openresp_frame, proberesp_frame, status_frame, wait_for, FakeChildren,
};

fn definition(raw: &str) -> SourceDefinition {
    SourceDefinition::parse(raw).unwrap()
}

fn decoded(frame: &Bytes) -> DecodedFrame {
    let mut buf = BytesMut::from(&frame[..]);
    decode_frame(&mut buf).unwrap().unwrap()
}

async fn completion(
    rx: tokio::sync::oneshot::Receiver<bool>,
) -> bool {
    tokio::time::timeout(Duration::from_secs(5), rx)
        .await
        .expect("timed out waiting for completion")
        .expect("completion dropped without firing")
}

// =============================================================================
// Launch failures
// =============================================================================

#[tokio::test]
async fn test_open_with_missing_binary_fails() {
    let fake = FakeChildren::new();
    let source = DataSource::new(
        "wifi_mon".into(),
        "no-such-binary".into(),
        None,
        vec![fake.bin_paths()[0].clone()],
    );

    let (tx, rx) = tokio::sync::oneshot::channel();
    source.open(
        &definition("wlan0:type=wifi_mon"),
        Box::new(move |_, success| {
            let _ = tx.send(success);
        }),
    );

    assert!(!completion(rx).await);
    assert_eq!(source.lifecycle(), Lifecycle::Failed);
    assert_eq!(source.pid(), None);
}

#[tokio::test]
async fn test_probe_with_missing_binary_fails() {
    let fake = FakeChildren::new();
    let source = DataSource::new(
        "wifi_mon".into(),
        "no-such-binary".into(),
        None,
        vec![fake.bin_paths()[0].clone()],
    );

    let (tx, rx) = tokio::sync::oneshot::channel();
    source.probe(
        &definition("wlan0"),
        Box::new(move |_, success| {
            let _ = tx.send(success);
        }),
    );

    assert!(!completion(rx).await);
    assert_eq!(source.lifecycle(), Lifecycle::Failed);
}

// =============================================================================
// Open / probe against fake children
// =============================================================================

#[tokio::test]
async fn test_open_success_stores_channels() {
    let fake = FakeChildren::new();
    fake.responder(
        "cap_wifi",
        &[status_frame(), openresp_frame(true, &["1", "6", "11"])],
    );

    let source = DataSource::new("wifi_mon".into(), "cap_wifi".into(), None, fake.bin_paths());

    let (tx, rx) = tokio::sync::oneshot::channel();
    source.open(
        &definition("wlan0:type=wifi_mon"),
        Box::new(move |_, success| {
            let _ = tx.send(success);
        }),
    );

    assert!(completion(rx).await);
    assert_eq!(source.lifecycle(), Lifecycle::Running);
    assert!(source.is_running());
    assert_eq!(source.channels(), vec!["1", "6", "11"]);
    assert_eq!(source.name(), "wlan0");
}

#[tokio::test]
async fn test_open_refused_by_child() {
    let fake = FakeChildren::new();
    fake.responder("cap_wifi", &[status_frame(), openresp_frame(false, &[])]);

    let source = DataSource::new("wifi_mon".into(), "cap_wifi".into(), None, fake.bin_paths());

    let (tx, rx) = tokio::sync::oneshot::channel();
    source.open(
        &definition("wlan0:type=wifi_mon"),
        Box::new(move |_, success| {
            let _ = tx.send(success);
        }),
    );

    assert!(!completion(rx).await);
    assert_eq!(source.lifecycle(), Lifecycle::Failed);
}

#[tokio::test]
async fn test_probe_success_ends_prototype() {
    let fake = FakeChildren::new();
    fake.one_shot("cap_wifi", &[proberesp_frame(true)]);

    let source = DataSource::new("wifi_mon".into(), "cap_wifi".into(), None, fake.bin_paths());

    let (tx, rx) = tokio::sync::oneshot::channel();
    source.probe(
        &definition("wlan0"),
        Box::new(move |_, success| {
            let _ = tx.send(success);
        }),
    );

    assert!(completion(rx).await);
    assert_eq!(source.lifecycle(), Lifecycle::ProbedOk);
    // The prototype's child is gone once the probe resolves
    wait_for(|| source.pid().is_none(), "probe child teardown").await;
}

#[tokio::test]
async fn test_child_exit_before_response_fails_open() {
    let fake = FakeChildren::new();
    fake.one_shot("cap_dead", &[]);

    let source = DataSource::new("wifi_mon".into(), "cap_dead".into(), None, fake.bin_paths());

    let (tx, rx) = tokio::sync::oneshot::channel();
    source.open(
        &definition("wlan0:type=wifi_mon"),
        Box::new(move |_, success| {
            let _ = tx.send(success);
        }),
    );

    assert!(!completion(rx).await);
    assert_eq!(source.lifecycle(), Lifecycle::Failed);
    // Transport closure is not a protocol error
    assert_eq!(source.ipc_errors(), 0);
}

#[tokio::test]
async fn test_corrupt_stream_fails_open_and_counts() {
    let fake = FakeChildren::new();
    let mut corrupted = openresp_frame(true, &[]).to_vec();
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0x01;
    fake.responder("cap_bad", &[status_frame(), Bytes::from(corrupted)]);

    let source = DataSource::new("wifi_mon".into(), "cap_bad".into(), None, fake.bin_paths());

    let (tx, rx) = tokio::sync::oneshot::channel();
    source.open(
        &definition("wlan0:type=wifi_mon"),
        Box::new(move |_, success| {
            let _ = tx.send(success);
        }),
    );

    assert!(!completion(rx).await);
    assert_eq!(source.lifecycle(), Lifecycle::Failed);
    assert_eq!(source.ipc_errors(), 1);
}

// =============================================================================
// Callback discipline
// =============================================================================

#[tokio::test]
async fn test_second_probe_displaces_first_with_failure() {
    let fake = FakeChildren::new();

    // `cat` never answers, so the first probe stays outstanding
    let source = DataSource::new("wifi_mon".into(), "cat".into(), None, fake.bin_paths());

    let (tx1, rx1) = tokio::sync::oneshot::channel();
    source.probe(
        &definition("wlan0"),
        Box::new(move |_, success| {
            let _ = tx1.send(success);
        }),
    );

    let (tx2, rx2) = tokio::sync::oneshot::channel();
    source.probe(
        &definition("wlan0"),
        Box::new(move |_, success| {
            let _ = tx2.send(success);
        }),
    );

    // The displaced callback fails before the replacement sees anything
    assert!(!completion(rx1).await);

    // The replacement still completes (with failure) on teardown
    source.close(true);
    assert!(!completion(rx2).await);
    assert_eq!(source.lifecycle(), Lifecycle::Terminated);
}

#[tokio::test]
async fn test_close_fails_outstanding_open_exactly_once() {
    let fake = FakeChildren::new();
    let source = DataSource::new("wifi_mon".into(), "cat".into(), None, fake.bin_paths());

    let (tx, rx) = tokio::sync::oneshot::channel();
    source.open(
        &definition("wlan0:type=wifi_mon"),
        Box::new(move |_, success| {
            let _ = tx.send(success);
        }),
    );

    source.close(false);
    assert!(!completion(rx).await);
    assert_eq!(source.lifecycle(), Lifecycle::Failed);

    // A second close is a quiet no-op; the callback is already consumed
    source.close(true);
    assert_eq!(source.lifecycle(), Lifecycle::Terminated);
}

// =============================================================================
// Command queue
// =============================================================================

#[tokio::test]
async fn test_commands_queue_fifo_until_ready() {
    let fake = FakeChildren::new();
    let source = DataSource::new("wifi_mon".into(), "cat".into(), None, fake.bin_paths());

    let (tx, _rx) = tokio::sync::oneshot::channel();
    source.open(
        &definition("wlan0:type=wifi_mon"),
        Box::new(move |_, success| {
            let _ = tx.send(success);
        }),
    );

    source.queue_command("CMD-A", make_frame("CMD-A"));
    source.queue_command("CMD-B", make_frame("CMD-B"));

    // Nothing is written before readiness; FIFO order is preserved
    assert_eq!(
        source.pending_commands(),
        vec!["OPENDEVICE", "CMD-A", "CMD-B"]
    );

    // First status frame releases the queue
    source.handle_frame(decoded(&status_frame()));
    assert!(source.pending_commands().is_empty());

    source.close(true);
}

#[tokio::test]
async fn test_drain_without_transport_requeues_at_head() {
    let source = DataSource::new("wifi_mon".into(), "cap".into(), None, Vec::new());

    source.queue_command("CMD-A", make_frame("CMD-A"));
    source.queue_command("CMD-B", make_frame("CMD-B"));

    // Readiness with no transport: the head command fails to write and is
    // requeued, leaving the order intact
    source.handle_frame(decoded(&status_frame()));
    assert_eq!(source.pending_commands(), vec!["CMD-A", "CMD-B"]);
}

#[tokio::test]
async fn test_set_channel_requires_running() {
    let source = DataSource::new("wifi_mon".into(), "cap".into(), None, Vec::new());

    assert!(matches!(
        source.set_channel("6"),
        Err(SourceError::SourceClosed)
    ));
    assert!(matches!(
        source.set_channel_hop(&["1".into(), "6".into()], 5.0),
        Err(SourceError::SourceClosed)
    ));
}

// =============================================================================
// Data frames
// =============================================================================

#[tokio::test]
async fn test_data_frame_reaches_packet_chain() {
    let (chain, mut rx) = PacketChain::new(16);
    let source = DataSource::new("wifi_mon".into(), "cap".into(), Some(chain), Vec::new());

    source.handle_frame(decoded(&data_frame(b"\xde\xad\xbe\xef")));

    let packet = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(packet.data.as_ref(), b"\xde\xad\xbe\xef");
    assert_eq!(packet.dlt, 127);
    assert_eq!(source.num_reports(), 1);
}

#[tokio::test]
async fn test_prototype_discards_data_frames() {
    let source = DataSource::new("wifi_mon".into(), "cap".into(), None, Vec::new());

    // No chain, no panic; the report is still counted
    source.handle_frame(decoded(&data_frame(b"x")));
    assert_eq!(source.num_reports(), 1);
}

#[tokio::test]
async fn test_malformed_packet_object_counts_schema_error() {
    let (chain, mut rx) = PacketChain::new(4);
    let source = DataSource::new("wifi_mon".into(), "cap".into(), Some(chain), Vec::new());

    let mut buf = BytesMut::new();
    buf.put_slice(b"\xc1not-msgpack");
    let frame =
        aircap_protocol::encode_frame("data", &[("packet", &buf[..])]).unwrap();
    source.handle_frame(decoded(&frame));

    assert_eq!(source.ipc_errors(), 1);
    assert_eq!(source.num_reports(), 0);
    assert!(rx.try_recv().is_none());
}

#[tokio::test]
async fn test_unsolicited_frame_type_counts() {
    let source = DataSource::new("wifi_mon".into(), "cap".into(), None, Vec::new());

    let frame = aircap_protocol::encode_frame("mystery", &[]).unwrap();
    source.handle_frame(decoded(&frame));
    assert_eq!(source.ipc_errors(), 1);
    assert_eq!(source.lifecycle(), Lifecycle::Idle);
}

fn make_frame(tag: &str) -> Bytes {
    aircap_protocol::encode_frame(tag, &[]).unwrap()
}
