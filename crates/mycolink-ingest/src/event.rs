use mycolink_frame::MessageType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Deduplication key: two frames with equal keys are one transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IngestionKey {
    pub device_id: Uuid,
    pub sequence_number: u64,
    pub timestamp_ms: u64,
}

impl std::fmt::Display for IngestionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}@{}",
            self.device_id, self.sequence_number, self.timestamp_ms
        )
    }
}

/// A first-seen telemetry or event frame, ready to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub key: IngestionKey,
    pub device_serial: String,
    pub message_type: MessageType,
    pub payload: Map<String, Value>,
    /// Milliseconds since the Unix epoch at which the gate accepted it.
    pub received_at: u64,
}

impl TelemetryEvent {
    /// Lower-case type label used on pub/sub messages.
    pub fn type_label(&self) -> String {
        self.message_type.name().to_ascii_lowercase()
    }
}
