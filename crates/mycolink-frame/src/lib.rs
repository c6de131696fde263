//! Byte-level framing for low-bandwidth device telemetry links.
//!
//! Every frame is a fixed header, an opaque payload, and a CRC16 trailer:
//! - 1-byte message type
//! - 8-byte big-endian sequence number
//! - 8-byte big-endian millisecond timestamp
//! - payload bytes
//! - 2-byte big-endian CRC16-CCITT over header and payload
//!
//! The body is COBS-stuffed so a single `0x00` terminates it on any byte
//! stream (serial, radio, pipe). Decoding never panics on bad input.

pub mod accumulator;
pub mod cobs;
pub mod codec;
pub mod command;
pub mod crc;
pub mod error;
pub mod message_type;
pub mod ndjson;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

pub use accumulator::FrameAccumulator;
pub use codec::{
    decode_frame, encode_frame, DecodedMessage, Frame, FrameConfig, Reading, CRC_SIZE,
    DEFAULT_MAX_FRAME, HEADER_SIZE, MIN_RAW_SIZE,
};
pub use command::{Command, Side};
pub use crc::crc16;
pub use error::{DecodeError, FramingError, Result, StreamError};
pub use message_type::MessageType;
pub use ndjson::{parse_ndjson_telemetry, GatewayTelemetry};
pub use reader::FrameReader;
pub use writer::FrameWriter;

#[cfg(feature = "async")]
pub use async_codec::MdpCodec;
