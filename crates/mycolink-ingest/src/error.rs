use mycolink_frame::{DecodeError, MessageType};

/// Device identity resolution failures. Both are hard rejections.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("unknown device: {serial}")]
    UnknownDevice { serial: String },

    #[error("credential mismatch for device {serial}")]
    CredentialMismatch { serial: String },
}

/// Failures reported by an event store backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Reasons a frame was not ingested.
///
/// A duplicate is not an error; see [`crate::GateDecision::Duplicate`].
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The message did not come through a CRC-checked decode.
    #[error("frame {sequence_number} has no verified CRC")]
    IntegrityUnverified { sequence_number: u64 },

    /// The gate only records device telemetry and events.
    #[error("message type {0} is not ingested")]
    UnsupportedMessageType(MessageType),

    /// A gateway line named a message type this protocol does not define.
    #[error("unrecognized message type: {0}")]
    UnrecognizedMessageType(String),

    /// A gateway line carried no timestamp that could key it.
    #[error("gateway line for {serial} has no usable timestamp")]
    MissingTimestamp { serial: String },
}

pub type Result<T> = std::result::Result<T, IngestError>;
