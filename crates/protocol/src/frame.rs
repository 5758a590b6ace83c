//! Frame codec - length-prefixed, checksummed capture frames
//!
//! Wire format (all integers network byte order):
//!
//! ```text
//!  offset  size  field
//!    0      4   signature (0xDECAFBAD)
//!    4      4   checksum  (Adler-32 over the frame with this field zeroed)
//!    8      4   total frame size in bytes
//!   12     16   type tag (ASCII, NUL-padded)
//!   28      4   number of kv records
//!   32      …   kv records: 16-byte key, 4-byte object size, object bytes
//! ```
//!
//! Decoding is incremental: the codec peeks the first 12 bytes to learn the
//! frame size and yields nothing until the whole frame is buffered, then
//! validates signature and checksum before walking the records.

use std::collections::HashMap;

use adler::Adler32;
use bytes::{BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::fixed::FixedAscii;
use crate::Result;

/// Frame signature, first four wire bytes of every frame
pub const FRAME_SIGNATURE: u32 = 0xDECA_FBAD;

/// Width of the type tag and of each KV key
pub const TAG_LEN: usize = 16;

/// Fixed header: signature + checksum + size + type tag + record count
pub const FRAME_HEADER_SIZE: usize = 32;

/// Fixed per-record header: key + object size
pub const KV_HEADER_SIZE: usize = TAG_LEN + 4;

/// Maximum accepted frame size (16MB) - guards against hostile size fields
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Bytes needed before the frame size is known
const SIZE_PREFIX: usize = 12;

/// Byte offset of the checksum field
const CHECKSUM_OFFSET: usize = 4;

/// A fully decoded frame
///
/// Keys are lowercased on decode; when a frame repeats a key the last record
/// wins. Values are zero-copy slices of the frame buffer.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// Trimmed type tag as sent by the peer
    pub frame_type: String,

    /// Lowercased key -> opaque object bytes
    pub kv: HashMap<String, Bytes>,
}

impl DecodedFrame {
    /// Look up an object by its (lowercase) key
    #[inline]
    pub fn get(&self, key: &str) -> Option<&Bytes> {
        self.kv.get(key)
    }

    /// Whether the frame carries an object under `key`
    #[inline]
    pub fn has(&self, key: &str) -> bool {
        self.kv.contains_key(key)
    }
}

/// Encode a frame from a type tag and ordered key/value pairs
///
/// Records are emitted in the order given. The type tag and keys are
/// truncated/NUL-padded to 16 bytes. The checksum is computed over the
/// assembled buffer with the checksum field zeroed, then patched in.
pub fn encode_frame(frame_type: &str, pairs: &[(&str, &[u8])]) -> Result<Bytes> {
    let mut body_len = 0usize;
    for (key, object) in pairs {
        if object.len() > u32::MAX as usize {
            return Err(ProtocolError::ObjectTooLarge {
                key: (*key).to_string(),
                size: object.len(),
            });
        }
        body_len += KV_HEADER_SIZE + object.len();
    }

    let total = FRAME_HEADER_SIZE + body_len;
    if total > u32::MAX as usize {
        return Err(ProtocolError::InvalidFrameSize {
            size: total,
            min: FRAME_HEADER_SIZE,
            max: u32::MAX as usize,
        });
    }
    let mut buf = BytesMut::with_capacity(total);

    buf.put_u32(FRAME_SIGNATURE);
    buf.put_u32(0); // checksum patched below
    buf.put_u32(total as u32);
    buf.put_slice(FixedAscii::<TAG_LEN>::new(frame_type).padded());
    buf.put_u32(pairs.len() as u32);

    for (key, object) in pairs {
        buf.put_slice(FixedAscii::<TAG_LEN>::new(key).padded());
        buf.put_u32(object.len() as u32);
        buf.put_slice(object);
    }

    let checksum = checksum_with_zeroed_field(&buf);
    buf[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 4].copy_from_slice(&checksum.to_be_bytes());

    Ok(buf.freeze())
}

/// Decode one frame from an accumulation buffer
///
/// Returns `Ok(None)` while the buffer holds less than a complete frame.
/// On success exactly the frame's bytes are consumed from `src`.
///
/// # Errors
///
/// Framing-level failures (`Desync`, `InvalidFrameSize`, `ChecksumMismatch`,
/// `TruncatedKv`) mean the stream can no longer be trusted; the caller must
/// close the transport.
pub fn decode_frame(src: &mut BytesMut) -> Result<Option<DecodedFrame>> {
    if src.len() < SIZE_PREFIX {
        return Ok(None);
    }

    let signature = read_u32(src, 0);
    if signature != FRAME_SIGNATURE {
        return Err(ProtocolError::Desync {
            expected: FRAME_SIGNATURE,
            actual: signature,
        });
    }

    let total = read_u32(src, 8) as usize;
    if total < FRAME_HEADER_SIZE || total > MAX_FRAME_SIZE {
        return Err(ProtocolError::InvalidFrameSize {
            size: total,
            min: FRAME_HEADER_SIZE,
            max: MAX_FRAME_SIZE,
        });
    }

    if src.len() < total {
        return Ok(None); // Need more data
    }

    let expected = read_u32(src, CHECKSUM_OFFSET);
    let computed = checksum_with_zeroed_checksum_field(&src[..total]);
    if expected != computed {
        return Err(ProtocolError::ChecksumMismatch { expected, computed });
    }

    let num_kv = read_u32(src, 28) as usize;

    // Consume the frame before walking records so payload slices are
    // zero-copy views of the detached buffer.
    let frame = src.split_to(total).freeze();

    let mut kv = HashMap::with_capacity(num_kv);
    let mut offset = FRAME_HEADER_SIZE;

    for _ in 0..num_kv {
        let remaining = total - offset;
        if remaining < KV_HEADER_SIZE {
            return Err(ProtocolError::truncated("", KV_HEADER_SIZE, remaining));
        }

        let mut key_raw = [0u8; TAG_LEN];
        key_raw.copy_from_slice(&frame[offset..offset + TAG_LEN]);
        let key = FixedAscii::from_wire(key_raw);

        let object_size = read_u32(&frame, offset + TAG_LEN) as usize;
        let object_start = offset + KV_HEADER_SIZE;

        if object_size > total - object_start {
            return Err(ProtocolError::truncated(
                key.as_str(),
                object_size,
                total - object_start,
            ));
        }

        // Last writer wins on key collision
        kv.insert(
            key.to_lowercase(),
            frame.slice(object_start..object_start + object_size),
        );

        offset = object_start + object_size;
    }

    let mut tag_raw = [0u8; TAG_LEN];
    tag_raw.copy_from_slice(&frame[12..12 + TAG_LEN]);
    let frame_type = FixedAscii::from_wire(tag_raw).as_str().to_string();

    Ok(Some(DecodedFrame { frame_type, kv }))
}

/// Adler-32 over a buffer whose checksum field is already zero
fn checksum_with_zeroed_field(buf: &[u8]) -> u32 {
    let mut hasher = Adler32::new();
    hasher.write_slice(buf);
    hasher.checksum()
}

/// Adler-32 over a received frame, substituting zeros for the checksum field
fn checksum_with_zeroed_checksum_field(frame: &[u8]) -> u32 {
    let mut hasher = Adler32::new();
    hasher.write_slice(&frame[..CHECKSUM_OFFSET]);
    hasher.write_slice(&[0u8; 4]);
    hasher.write_slice(&frame[CHECKSUM_OFFSET + 4..]);
    hasher.checksum()
}

#[inline]
fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}
