/// Errors from the router's fallible operations.
///
/// The core pub/sub operations never fail: publishing to an unknown channel
/// delivers to nobody, and subscription changes report a boolean.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// No channel is registered under this name.
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    /// The channel's payload schema could not be compiled.
    #[error("failed to compile schema for channel {channel}: {message}")]
    SchemaCompile { channel: String, message: String },

    /// The payload failed the channel's schema.
    #[error("validation failed on channel {channel}: {message}")]
    ValidationFailed { channel: String, message: String },

    /// The input is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The JSON is well-formed but not a valid message.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

pub type Result<T> = std::result::Result<T, RouterError>;
