/// Malformed COBS input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    /// Nothing to decode.
    #[error("empty frame")]
    Empty,

    /// The frame does not end with the 0x00 delimiter.
    #[error("frame is not zero-terminated")]
    MissingTerminator,

    /// A COBS code byte points past the end of the frame.
    #[error("COBS code {code:#04x} at offset {position} overruns frame of {len} bytes")]
    Overrun {
        position: usize,
        code: u8,
        len: usize,
    },
}

/// Errors that can occur while decoding a frame.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The COBS layer could not be undone.
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    /// The decoded body is shorter than header + CRC.
    #[error("frame too short ({len} bytes, need at least {min})", min = crate::codec::MIN_RAW_SIZE)]
    TooShort { len: usize },

    /// The transmitted CRC does not match the body.
    #[error("CRC mismatch (expected {expected:#06x}, computed {actual:#06x})")]
    CrcMismatch { expected: u16, actual: u16 },

    /// The header carries a message type this protocol does not define.
    #[error("unknown message type {0:#04x}")]
    UnknownMessageType(u8),

    /// Too many bytes accumulated without a frame delimiter.
    #[error("frame too large ({size} bytes, max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The payload is not the JSON shape the message type implies.
    #[error("payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Errors from the blocking stream reader/writer.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended before another frame delimiter arrived.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,

    /// A complete frame was read but failed validation.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

pub type Result<T> = std::result::Result<T, DecodeError>;
