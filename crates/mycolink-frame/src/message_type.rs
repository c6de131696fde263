//! Wire message type identifiers (first header byte).

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Sensor readings (device → server).
pub const TELEMETRY: u8 = 0x01;

/// Actuation or configuration request (server → device).
pub const COMMAND: u8 = 0x02;

/// Discrete occurrence reported by a device (device → server).
pub const EVENT: u8 = 0x03;

/// Positive acknowledgement (bidirectional).
pub const ACK: u8 = 0x04;

/// Negative acknowledgement (bidirectional).
pub const NACK: u8 = 0x05;

/// Liveness beacon (device → server).
pub const HEARTBEAT: u8 = 0x06;

/// Capability announcement (device → server).
pub const DISCOVERY: u8 = 0x07;

/// Typed view of the header's message type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum MessageType {
    Telemetry = TELEMETRY,
    Command = COMMAND,
    Event = EVENT,
    Ack = ACK,
    Nack = NACK,
    Heartbeat = HEARTBEAT,
    Discovery = DISCOVERY,
}

impl MessageType {
    /// The byte written to the header.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Upper-case protocol name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Telemetry => "TELEMETRY",
            Self::Command => "COMMAND",
            Self::Event => "EVENT",
            Self::Ack => "ACK",
            Self::Nack => "NACK",
            Self::Heartbeat => "HEARTBEAT",
            Self::Discovery => "DISCOVERY",
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            TELEMETRY => Ok(Self::Telemetry),
            COMMAND => Ok(Self::Command),
            EVENT => Ok(Self::Event),
            ACK => Ok(Self::Ack),
            NACK => Ok(Self::Nack),
            HEARTBEAT => Ok(Self::Heartbeat),
            DISCOVERY => Ok(Self::Discovery),
            other => Err(DecodeError::UnknownMessageType(other)),
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TELEMETRY" => Ok(Self::Telemetry),
            "COMMAND" => Ok(Self::Command),
            "EVENT" => Ok(Self::Event),
            "ACK" => Ok(Self::Ack),
            "NACK" => Ok(Self::Nack),
            "HEARTBEAT" => Ok(Self::Heartbeat),
            "DISCOVERY" => Ok(Self::Discovery),
            _ => Err(format!("unknown message type: {s}")),
        }
    }
}
