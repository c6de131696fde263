use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{Result, RouterError};

/// Default message lifetime, in seconds.
pub const DEFAULT_TTL_SECONDS: u64 = 3600;

/// Application-level pub/sub envelope.
///
/// Independent of the wire frame: `message_type` is a free-form label such
/// as `telemetry`, `event`, `command`, or `insight`.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub channel: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub source_type: String,
    pub source_id: Option<String>,
    pub device_serial: Option<String>,
    pub message_type: String,
    pub payload: Map<String, Value>,
    pub correlation_id: Option<Uuid>,
    pub reply_to: Option<String>,
    pub ttl_seconds: u64,
}

impl Message {
    /// A telemetry message from the local service, stamped now.
    pub fn new(channel: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.into(),
            timestamp: now_millis(),
            source_type: "mindex".to_owned(),
            source_id: None,
            device_serial: None,
            message_type: "telemetry".to_owned(),
            payload,
            correlation_id: None,
            reply_to: None,
            ttl_seconds: DEFAULT_TTL_SECONDS,
        }
    }

    pub fn with_source(
        mut self,
        source_type: impl Into<String>,
        source_id: Option<String>,
        device_serial: Option<String>,
    ) -> Self {
        self.source_type = source_type.into();
        self.source_id = source_id;
        self.device_serial = device_serial;
        self
    }

    pub fn with_message_type(mut self, message_type: impl Into<String>) -> Self {
        self.message_type = message_type.into();
        self
    }

    pub fn with_reply(mut self, correlation_id: Uuid, reply_to: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id);
        self.reply_to = Some(reply_to.into());
        self
    }

    /// Single-line JSON form.
    pub fn to_ndjson(&self) -> String {
        let wire = WireMessage {
            id: Some(self.id.to_string()),
            channel: self.channel.clone(),
            ts: Some(self.timestamp),
            source: WireSource {
                kind: Some(self.source_type.clone()),
                id: self.source_id.clone(),
                device: self.device_serial.clone(),
            },
            msg_type: Some(self.message_type.clone()),
            payload: self.payload.clone(),
            meta: WireMeta {
                correlation_id: self.correlation_id.map(|id| id.to_string()),
                reply_to: self.reply_to.clone(),
                ttl: Some(self.ttl_seconds),
            },
        };
        // Maps with string keys always serialize.
        serde_json::to_string(&wire).unwrap_or_default()
    }

    /// Parse the single-line JSON form; absent fields take their defaults.
    pub fn from_ndjson(line: &str) -> Result<Self> {
        let wire: WireMessage = serde_json::from_str(line.trim())?;

        Ok(Self {
            id: match wire.id {
                Some(id) => parse_uuid("id", &id)?,
                None => Uuid::new_v4(),
            },
            channel: wire.channel,
            timestamp: wire.ts.unwrap_or_else(now_millis),
            source_type: wire.source.kind.unwrap_or_else(|| "unknown".to_owned()),
            source_id: wire.source.id,
            device_serial: wire.source.device,
            message_type: wire.msg_type.unwrap_or_else(|| "telemetry".to_owned()),
            payload: wire.payload,
            correlation_id: wire
                .meta
                .correlation_id
                .as_deref()
                .map(|id| parse_uuid("correlation_id", id))
                .transpose()?,
            reply_to: wire.meta.reply_to,
            ttl_seconds: wire.meta.ttl.unwrap_or(DEFAULT_TTL_SECONDS),
        })
    }
}

fn parse_uuid(field: &str, value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|err| RouterError::InvalidMessage(format!("{field} is not a UUID: {err}")))
}

/// Current time in milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    channel: String,
    #[serde(default)]
    ts: Option<u64>,
    #[serde(default)]
    source: WireSource,
    #[serde(default)]
    msg_type: Option<String>,
    #[serde(default)]
    payload: Map<String, Value>,
    #[serde(default)]
    meta: WireMeta,
}

#[derive(Serialize, Deserialize, Default)]
struct WireSource {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    device: Option<String>,
}

#[derive(Serialize, Deserialize, Default)]
struct WireMeta {
    #[serde(default)]
    correlation_id: Option<String>,
    #[serde(default)]
    reply_to: Option<String>,
    #[serde(default)]
    ttl: Option<u64>,
}
