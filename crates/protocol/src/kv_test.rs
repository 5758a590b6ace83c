//! Tests for the typed KV payload decoders

use serde::Serialize;

use crate::error::ProtocolError;
use crate::kv::{
    decode_channels, decode_gps, decode_message, decode_packet, decode_signal, decode_success,
    encode_chanhop, encode_success, ChanHopPayload, SignalType,
};

// =============================================================================
// success
// =============================================================================

#[test]
fn test_success_byte() {
    assert!(decode_success(&[1]).unwrap());
    assert!(decode_success(&[0xff]).unwrap());
    assert!(!decode_success(&[0]).unwrap());
}

#[test]
fn test_success_wrong_length() {
    assert!(matches!(
        decode_success(&[]).unwrap_err(),
        ProtocolError::Schema { key: "success", .. }
    ));
    assert!(matches!(
        decode_success(&[1, 0]).unwrap_err(),
        ProtocolError::Schema { key: "success", .. }
    ));
}

#[test]
fn test_success_encode() {
    assert_eq!(encode_success(true), [1]);
    assert_eq!(encode_success(false), [0]);
}

// =============================================================================
// message / channels
// =============================================================================

#[derive(Serialize)]
struct RawMessage<'a> {
    msg: &'a str,
    flags: u32,
}

#[test]
fn test_message_decode() {
    let raw = rmp_serde::to_vec_named(&RawMessage {
        msg: "interface went away",
        flags: 2,
    })
    .unwrap();

    let report = decode_message(&raw).unwrap();
    assert_eq!(report.msg, "interface went away");
    assert_eq!(report.flags, 2);
}

#[test]
fn test_message_missing_flags_is_schema_error() {
    #[derive(Serialize)]
    struct MsgOnly<'a> {
        msg: &'a str,
    }
    let raw = rmp_serde::to_vec_named(&MsgOnly { msg: "hello" }).unwrap();
    assert!(matches!(
        decode_message(&raw).unwrap_err(),
        ProtocolError::Schema { key: "message", .. }
    ));
}

#[test]
fn test_message_garbage_is_schema_error() {
    assert!(matches!(
        decode_message(b"\xc1\xc1\xc1").unwrap_err(),
        ProtocolError::Schema { key: "message", .. }
    ));
}

#[test]
fn test_channels_decode() {
    #[derive(Serialize)]
    struct RawChannels {
        channels: Vec<String>,
    }
    let raw = rmp_serde::to_vec_named(&RawChannels {
        channels: vec!["1".into(), "6".into(), "11".into()],
    })
    .unwrap();

    let report = decode_channels(&raw).unwrap();
    assert_eq!(report.channels, vec!["1", "6", "11"]);
}

// =============================================================================
// chanhop
// =============================================================================

#[test]
fn test_chanhop_roundtrip() {
    let channels = vec!["1".to_string(), "6".to_string(), "11".to_string()];
    let raw = encode_chanhop(5.0, &channels).unwrap();

    let decoded: ChanHopPayload = rmp_serde::from_slice(&raw).unwrap();
    assert_eq!(decoded.rate, 5.0);
    assert_eq!(decoded.channels, channels);
}

// =============================================================================
// packet
// =============================================================================

#[derive(Serialize)]
struct RawPacket {
    tv_sec: u64,
    tv_usec: u64,
    dlt: u64,
    size: u64,
    #[serde(with = "serde_bytes")]
    packet: Vec<u8>,
}

#[test]
fn test_packet_decode() {
    let raw = rmp_serde::to_vec_named(&RawPacket {
        tv_sec: 1_500_000_000,
        tv_usec: 250_000,
        dlt: 127,
        size: 4,
        packet: vec![0xde, 0xad, 0xbe, 0xef],
    })
    .unwrap();

    let report = decode_packet(&raw).unwrap();
    assert_eq!(report.tv_sec, 1_500_000_000);
    assert_eq!(report.tv_usec, 250_000);
    assert_eq!(report.dlt, 127);
    assert_eq!(report.packet, vec![0xde, 0xad, 0xbe, 0xef]);
}

#[test]
fn test_packet_missing_dlt_is_schema_error() {
    #[derive(Serialize)]
    struct NoDlt {
        tv_sec: u64,
        tv_usec: u64,
        size: u64,
        #[serde(with = "serde_bytes")]
        packet: Vec<u8>,
    }
    let raw = rmp_serde::to_vec_named(&NoDlt {
        tv_sec: 1,
        tv_usec: 2,
        size: 1,
        packet: vec![0],
    })
    .unwrap();

    assert!(matches!(
        decode_packet(&raw).unwrap_err(),
        ProtocolError::Schema { key: "packet", .. }
    ));
}

#[test]
fn test_packet_size_mismatch_is_schema_error() {
    let raw = rmp_serde::to_vec_named(&RawPacket {
        tv_sec: 1,
        tv_usec: 2,
        dlt: 127,
        size: 10,
        packet: vec![0xaa, 0xbb],
    })
    .unwrap();

    let err = decode_packet(&raw).unwrap_err();
    assert!(matches!(err, ProtocolError::Schema { key: "packet", .. }));
    assert!(!err.is_fatal());
}

#[test]
fn test_packet_extra_fields_ignored() {
    #[derive(Serialize)]
    struct WithExtra {
        tv_sec: u64,
        tv_usec: u64,
        dlt: u64,
        size: u64,
        #[serde(with = "serde_bytes")]
        packet: Vec<u8>,
        future_field: &'static str,
    }
    let raw = rmp_serde::to_vec_named(&WithExtra {
        tv_sec: 1,
        tv_usec: 2,
        dlt: 127,
        size: 1,
        packet: vec![0x42],
        future_field: "ignored",
    })
    .unwrap();

    let report = decode_packet(&raw).unwrap();
    assert_eq!(report.packet, vec![0x42]);
}

// =============================================================================
// signal
// =============================================================================

#[derive(Default, Serialize)]
struct RawSignal {
    #[serde(skip_serializing_if = "Option::is_none")]
    signal_dbm: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    noise_dbm: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    signal_rssi: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    freq_khz: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
}

#[test]
fn test_signal_dbm_fields() {
    let raw = rmp_serde::to_vec_named(&RawSignal {
        signal_dbm: Some(-40),
        noise_dbm: Some(-95),
        freq_khz: Some(2_437_000.0),
        channel: Some("6".into()),
        ..Default::default()
    })
    .unwrap();

    let report = decode_signal(&raw).unwrap();
    assert_eq!(report.signal_dbm, Some(-40));
    assert_eq!(report.noise_dbm, Some(-95));
    assert_eq!(report.freq_khz, Some(2_437_000.0));
    assert_eq!(report.channel.as_deref(), Some("6"));
    assert_eq!(report.signal_type(), Some(SignalType::Dbm));
}

#[test]
fn test_signal_rssi_wins_over_dbm() {
    let raw = rmp_serde::to_vec_named(&RawSignal {
        signal_dbm: Some(-40),
        signal_rssi: Some(180),
        ..Default::default()
    })
    .unwrap();

    let report = decode_signal(&raw).unwrap();
    assert_eq!(report.signal_type(), Some(SignalType::Rssi));
    // Both families stay populated independently
    assert_eq!(report.signal_dbm, Some(-40));
    assert_eq!(report.signal_rssi, Some(180));
}

#[test]
fn test_signal_empty_has_no_type() {
    let raw = rmp_serde::to_vec_named(&RawSignal::default()).unwrap();
    let report = decode_signal(&raw).unwrap();
    assert_eq!(report.signal_type(), None);
}

// =============================================================================
// gps
// =============================================================================

#[test]
fn test_gps_decode_partial() {
    #[derive(Serialize)]
    struct RawGps {
        lat: f64,
        lon: f64,
        fix: i32,
        name: &'static str,
    }
    let raw = rmp_serde::to_vec_named(&RawGps {
        lat: 44.04,
        lon: -121.31,
        fix: 3,
        name: "rooftop",
    })
    .unwrap();

    let report = decode_gps(&raw).unwrap();
    assert_eq!(report.lat, Some(44.04));
    assert_eq!(report.lon, Some(-121.31));
    assert_eq!(report.fix, Some(3));
    assert_eq!(report.name.as_deref(), Some("rooftop"));
    assert_eq!(report.precision, None);
    assert_eq!(report.alt, None);
}
