use std::collections::BTreeMap;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::cobs;
use crate::crc::crc16;
use crate::error::{DecodeError, Result};
use crate::message_type::MessageType;

/// Header: message type (1) + sequence number (8) + timestamp (8) = 17 bytes.
pub const HEADER_SIZE: usize = 17;

/// Trailing CRC16, big-endian.
pub const CRC_SIZE: usize = 2;

/// Smallest valid pre-COBS body.
pub const MIN_RAW_SIZE: usize = HEADER_SIZE + CRC_SIZE;

/// Default ceiling on bytes buffered while waiting for a delimiter: 64 KiB.
pub const DEFAULT_MAX_FRAME: usize = 64 * 1024;

/// Frame envelope before stuffing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub message_type: MessageType,
    /// Device-local monotonic counter; wrapping is the device's concern.
    pub sequence_number: u64,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(
        message_type: MessageType,
        sequence_number: u64,
        timestamp_ms: u64,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            message_type,
            sequence_number,
            timestamp_ms,
            payload: payload.into(),
        }
    }

    /// Encode into the delimited wire format.
    pub fn encode(&self) -> Bytes {
        let mut dst = BytesMut::new();
        self.encode_into(&mut dst);
        dst.freeze()
    }

    /// Encode and append to `dst`.
    pub fn encode_into(&self, dst: &mut BytesMut) {
        let mut raw = BytesMut::with_capacity(MIN_RAW_SIZE + self.payload.len());
        raw.put_u8(self.message_type.as_byte());
        raw.put_u64(self.sequence_number);
        raw.put_u64(self.timestamp_ms);
        raw.put_slice(&self.payload);
        let crc = crc16(&raw);
        raw.put_u16(crc);

        cobs::encode_into(&raw, dst);
    }
}

/// Encode a frame into the wire format.
///
/// Wire format (before COBS):
/// ```text
/// ┌──────────┬──────────────┬──────────────┬───────────┬──────────┐
/// │ Type (1B)│ Seq (8B BE)  │ Ts ms (8B BE)│ Payload   │ CRC16    │
/// │          │              │              │ (N bytes) │ (2B BE)  │
/// └──────────┴──────────────┴──────────────┴───────────┴──────────┘
/// ```
/// The whole body is COBS-stuffed and terminated with a single `0x00`.
pub fn encode_frame(
    message_type: MessageType,
    sequence_number: u64,
    timestamp_ms: u64,
    payload: &[u8],
) -> Bytes {
    Frame::new(
        message_type,
        sequence_number,
        timestamp_ms,
        Bytes::copy_from_slice(payload),
    )
    .encode()
}

/// A frame that passed COBS, length, and CRC validation.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    pub message_type: MessageType,
    pub sequence_number: u64,
    pub timestamp_ms: u64,
    pub payload: Bytes,
    pub crc: u16,
    /// Set only by [`decode_frame`] after the CRC matched.
    pub crc_valid: bool,
}

/// A single telemetry value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Bool(bool),
    Number(f64),
}

impl DecodedMessage {
    /// Parse the payload as JSON. An empty payload is an empty object.
    pub fn payload_json(&self) -> Result<serde_json::Value> {
        if self.payload.is_empty() {
            return Ok(serde_json::Value::Object(serde_json::Map::new()));
        }
        Ok(serde_json::from_slice(&self.payload)?)
    }

    /// Numeric and boolean readings keyed by reading name.
    ///
    /// Entries of any other JSON shape are skipped; a payload that is not a
    /// JSON object yields no readings.
    pub fn readings(&self) -> Result<BTreeMap<String, Reading>> {
        let serde_json::Value::Object(map) = self.payload_json()? else {
            return Ok(BTreeMap::new());
        };

        Ok(map
            .into_iter()
            .filter_map(|(key, value)| match value {
                serde_json::Value::Bool(flag) => Some((key, Reading::Bool(flag))),
                serde_json::Value::Number(number) => {
                    number.as_f64().map(|value| (key, Reading::Number(value)))
                }
                _ => None,
            })
            .collect())
    }

    /// Return the envelope this message was decoded from.
    pub fn to_frame(&self) -> Frame {
        Frame::new(
            self.message_type,
            self.sequence_number,
            self.timestamp_ms,
            self.payload.clone(),
        )
    }
}

/// Decode one zero-terminated frame.
///
/// Errors are always returned, never panicked: framing, length, and CRC
/// are checked in that order, and the header is parsed only once the CRC
/// matched.
pub fn decode_frame(frame: &[u8]) -> Result<DecodedMessage> {
    let raw = cobs::decode(frame)?;
    if raw.len() < MIN_RAW_SIZE {
        return Err(DecodeError::TooShort { len: raw.len() });
    }

    let (body, trailer) = raw.split_at(raw.len() - CRC_SIZE);
    let expected = u16::from_be_bytes([trailer[0], trailer[1]]);
    let actual = crc16(body);
    if actual != expected {
        return Err(DecodeError::CrcMismatch { expected, actual });
    }

    let mut header = &body[..HEADER_SIZE];
    let message_type = MessageType::try_from(header.get_u8())?;
    let sequence_number = header.get_u64();
    let timestamp_ms = header.get_u64();

    Ok(DecodedMessage {
        message_type,
        sequence_number,
        timestamp_ms,
        payload: Bytes::copy_from_slice(&body[HEADER_SIZE..]),
        crc: expected,
        crc_valid: true,
    })
}

/// Configuration for the frame stream helpers.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum bytes buffered without a delimiter. Default: 64 KiB.
    pub max_frame_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME,
        }
    }
}
