//! Tests for the child transport
//!
//! These use common unix utilities as stand-in capture children: `cat`
//! echoes written frames straight back, `true` exits immediately, and `sh`
//! lets us emit arbitrary bytes on stdout.

#![cfg(unix)]

use std::path::PathBuf;
use std::time::Duration;

use aircap_protocol::{encode_frame, ProtocolError};

use crate::child::{ChildTransport, TransportEvent};
use crate::error::TransportError;

fn system_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("/bin"), PathBuf::from("/usr/bin")]
}

async fn next_event(
    rx: &mut tokio::sync::mpsc::Receiver<TransportEvent>,
) -> Option<TransportEvent> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for transport event")
}

#[tokio::test]
async fn test_echo_child_roundtrips_frames() {
    let (transport, mut rx) = ChildTransport::spawn("cat", &[], &system_paths()).unwrap();
    assert!(transport.pid() > 0);

    let frame = encode_frame("status", &[("message", b"ready")]).unwrap();
    transport.write(frame).unwrap();

    match next_event(&mut rx).await {
        Some(TransportEvent::Frame(decoded)) => {
            assert_eq!(decoded.frame_type, "status");
            assert_eq!(decoded.get("message").unwrap().as_ref(), b"ready");
        }
        other => panic!("expected frame event, got {other:?}"),
    }

    transport.soft_kill();
    loop {
        match next_event(&mut rx).await {
            Some(TransportEvent::Closed) | None => break,
            Some(TransportEvent::Frame(_)) => continue,
            Some(other) => panic!("unexpected event during shutdown: {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_frames_arrive_in_write_order() {
    let (transport, mut rx) = ChildTransport::spawn("cat", &[], &system_paths()).unwrap();

    for i in 0..5u8 {
        let frame = encode_frame("data", &[("packet", &[i][..])]).unwrap();
        transport.write(frame).unwrap();
    }

    for i in 0..5u8 {
        match next_event(&mut rx).await {
            Some(TransportEvent::Frame(decoded)) => {
                assert_eq!(decoded.get("packet").unwrap().as_ref(), &[i]);
            }
            other => panic!("expected frame {i}, got {other:?}"),
        }
    }

    transport.close();
}

#[tokio::test]
async fn test_immediate_exit_reports_closed() {
    let (_transport, mut rx) = ChildTransport::spawn("true", &[], &system_paths()).unwrap();

    match next_event(&mut rx).await {
        Some(TransportEvent::Closed) => {}
        other => panic!("expected closed event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_garbage_output_is_protocol_error() {
    let args = vec![
        "-c".to_string(),
        // 16 bytes of junk: enough for the decoder to see a bad signature
        "printf 'XXXXXXXXXXXXXXXX'".to_string(),
    ];
    let (_transport, mut rx) = ChildTransport::spawn("sh", &args, &system_paths()).unwrap();

    match next_event(&mut rx).await {
        Some(TransportEvent::ProtocolError(ProtocolError::Desync { .. })) => {}
        other => panic!("expected desync event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_write_after_close_is_rejected() {
    let (transport, _rx) = ChildTransport::spawn("cat", &[], &system_paths()).unwrap();

    transport.close();
    transport.close(); // idempotent

    let frame = encode_frame("status", &[]).unwrap();
    assert!(matches!(
        transport.write(frame),
        Err(TransportError::Closed)
    ));
}

#[tokio::test]
async fn test_unknown_binary_fails_to_spawn() {
    let err = ChildTransport::spawn("no-such-capture-binary", &[], &system_paths()).unwrap_err();
    assert!(matches!(err, TransportError::BinaryNotFound { .. }));
}
