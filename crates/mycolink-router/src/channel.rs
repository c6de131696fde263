//! Channel definitions and the factories for the three channel shapes.
//!
//! Names follow a dotted convention:
//! - `device.<serial>` for one device's telemetry
//! - `aggregate.<sensor_type>` for readings combined across devices
//! - `insight.<insight_type>` for computed or predicted values

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ring capacity used when a channel does not ask for another.
pub const DEFAULT_BUFFER_SIZE: usize = 100;

/// What a channel carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Direct telemetry from bound devices.
    Device,
    /// Data combined from many devices.
    Aggregate,
    /// Derived insights and predictions.
    Computed,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Device => "device",
            Self::Aggregate => "aggregate",
            Self::Computed => "computed",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialization consumers should expect on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    #[default]
    Ndjson,
    Cbor,
    Protobuf,
}

/// A named pub/sub destination.
///
/// `message_count` and `last_message_at` are maintained by the router;
/// values set by the caller are ignored once the channel is registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    #[serde(default)]
    pub description: String,
    /// Bound devices; meaningful for [`ChannelKind::Device`] only.
    #[serde(default)]
    pub device_ids: BTreeSet<Uuid>,
    /// Source matching rule; meaningful for [`ChannelKind::Aggregate`] only.
    /// The router stores it but does not evaluate it.
    #[serde(default)]
    pub stream_pattern: Option<String>,
    #[serde(default)]
    pub format: MessageFormat,
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// JSON Schema applied by validated publishes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_schema: Option<serde_json::Value>,
    #[serde(default)]
    pub message_count: u64,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub last_message_at: Option<u64>,
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

impl Channel {
    /// Create a channel with defaults for everything but name and kind.
    pub fn new(name: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            device_ids: BTreeSet::new(),
            stream_pattern: None,
            format: MessageFormat::default(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            payload_schema: None,
            message_count: 0,
            last_message_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_payload_schema(mut self, schema: serde_json::Value) -> Self {
        self.payload_schema = Some(schema);
        self
    }

    pub fn with_format(mut self, format: MessageFormat) -> Self {
        self.format = format;
        self
    }
}

/// Channel for one device's telemetry: `device.<serial>`.
pub fn create_device_channel(
    device_serial: &str,
    device_id: Uuid,
    description: Option<&str>,
) -> Channel {
    let mut channel = Channel::new(format!("device.{device_serial}"), ChannelKind::Device)
        .with_description(describe(description, || {
            format!("Telemetry from device {device_serial}")
        }));
    channel.device_ids.insert(device_id);
    channel
}

/// Channel aggregating one sensor type across devices: `aggregate.<sensor_type>`.
pub fn create_sensor_aggregate_channel(sensor_type: &str, description: Option<&str>) -> Channel {
    let mut channel = Channel::new(format!("aggregate.{sensor_type}"), ChannelKind::Aggregate)
        .with_description(describe(description, || {
            format!("Aggregated {sensor_type} readings")
        }));
    channel.stream_pattern = Some(format!(r".*\.{sensor_type}$"));
    channel
}

/// Channel carrying computed insights: `insight.<insight_type>`.
pub fn create_insight_channel(insight_type: &str, description: Option<&str>) -> Channel {
    Channel::new(format!("insight.{insight_type}"), ChannelKind::Computed).with_description(
        describe(description, || format!("AI-computed {insight_type} insights")),
    )
}

fn describe(description: Option<&str>, fallback: impl FnOnce() -> String) -> String {
    match description {
        Some(text) if !text.is_empty() => text.to_owned(),
        _ => fallback(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_defaults() {
        let channel = Channel::new("test.channel", ChannelKind::Device);
        assert_eq!(channel.format, MessageFormat::Ndjson);
        assert_eq!(channel.buffer_size, 100);
        assert_eq!(channel.message_count, 0);
        assert!(channel.last_message_at.is_none());
    }

    #[test]
    fn device_factory_binds_device() {
        let id = Uuid::new_v4();
        let channel = create_device_channel("MCB-001", id, None);

        assert_eq!(channel.name, "device.MCB-001");
        assert_eq!(channel.kind, ChannelKind::Device);
        assert_eq!(channel.description, "Telemetry from device MCB-001");
        assert!(channel.device_ids.contains(&id));
    }

    #[test]
    fn aggregate_factory_sets_pattern() {
        let channel = create_sensor_aggregate_channel("humidity", Some("All RH sensors"));

        assert_eq!(channel.name, "aggregate.humidity");
        assert_eq!(channel.kind, ChannelKind::Aggregate);
        assert_eq!(channel.description, "All RH sensors");
        assert_eq!(channel.stream_pattern.as_deref(), Some(r".*\.humidity$"));
    }

    #[test]
    fn insight_factory_is_computed() {
        let channel = create_insight_channel("yield", Some(""));

        assert_eq!(channel.name, "insight.yield");
        assert_eq!(channel.kind, ChannelKind::Computed);
        assert_eq!(channel.description, "AI-computed yield insights");
    }

    #[test]
    fn json_form_uses_type_key() {
        let value = serde_json::to_value(
            Channel::new("aggregate.environmental", ChannelKind::Aggregate)
                .with_description("All environmental sensors"),
        )
        .unwrap();

        assert_eq!(value["name"], "aggregate.environmental");
        assert_eq!(value["type"], "aggregate");
        assert_eq!(value["format"], "ndjson");
        assert!(value.get("payload_schema").is_none());
    }

    #[test]
    fn parses_minimal_json() {
        let channel: Channel =
            serde_json::from_str(r#"{"name":"insight.x","type":"computed"}"#).unwrap();
        assert_eq!(channel.kind, ChannelKind::Computed);
        assert_eq!(channel.buffer_size, DEFAULT_BUFFER_SIZE);
    }
}
