//! Newline-delimited JSON telemetry as emitted by gateway firmware.
//!
//! Gateways that bridge radio links to USB forward readings as one JSON
//! object per line instead of binary frames, with loosely named keys.

use chrono::DateTime;
use serde::Serialize;
use serde_json::{Map, Value};

const TIMESTAMP_KEYS: [&str; 3] = ["ts", "timestamp_ms", "timestamp"];
const DEVICE_KEYS: [&str; 3] = ["dev", "device", "serial"];
const TYPE_KEYS: [&str; 2] = ["type", "msg_type"];
const SEQUENCE_KEYS: [&str; 2] = ["seq", "sequence"];
const PAYLOAD_KEYS: [&str; 2] = ["data", "payload"];

/// A normalized gateway telemetry line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayTelemetry {
    /// `None` when the line carries no timestamp this parser understands.
    pub timestamp_ms: Option<u64>,
    pub device_serial: Option<String>,
    pub message_type: String,
    pub sequence_number: u64,
    pub payload: Map<String, Value>,
}

/// Parse one NDJSON line. Blank lines, invalid JSON, and non-objects yield `None`.
pub fn parse_ndjson_telemetry(line: &str) -> Option<GatewayTelemetry> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let Value::Object(mut fields) = serde_json::from_str::<Value>(line).ok()? else {
        return None;
    };

    let timestamp_ms = first_present(&fields, &TIMESTAMP_KEYS).and_then(timestamp_millis);
    let device_serial = first_present(&fields, &DEVICE_KEYS)
        .and_then(Value::as_str)
        .map(str::to_owned);
    let message_type = first_present(&fields, &TYPE_KEYS)
        .and_then(Value::as_str)
        .unwrap_or("telemetry")
        .to_owned();
    let sequence_number = first_present(&fields, &SEQUENCE_KEYS)
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let mut payload = match first_present(&fields, &PAYLOAD_KEYS).cloned() {
        Some(Value::Object(map)) => map,
        Some(other) => {
            let mut map = Map::new();
            map.insert("raw".to_owned(), other);
            map
        }
        None => Map::new(),
    };

    let reserved = TIMESTAMP_KEYS
        .iter()
        .chain(&DEVICE_KEYS)
        .chain(&TYPE_KEYS)
        .chain(&SEQUENCE_KEYS)
        .chain(&PAYLOAD_KEYS);
    for key in reserved {
        fields.remove(*key);
    }
    payload.extend(fields);

    Some(GatewayTelemetry {
        timestamp_ms,
        device_serial,
        message_type,
        sequence_number,
        payload,
    })
}

/// Milliseconds since the epoch from an integer, a float (truncated), a
/// string of digits, or an RFC 3339 string.
fn timestamp_millis(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|ms| ms.is_finite() && *ms >= 0.0)
                .map(|ms| ms as u64)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>().ok().or_else(|| {
                DateTime::parse_from_rfc3339(s)
                    .ok()
                    .and_then(|at| u64::try_from(at.timestamp_millis()).ok())
            })
        }
        _ => None,
    }
}

/// First non-falsy value among `keys`.
fn first_present<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find(|value| !is_falsy(value))
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_canonical_gateway_line() {
        let line = r#"{"ts":1734567890123,"dev":"ABC123","type":"telemetry","seq":7,"data":{"temp":21.5}}"#;
        let parsed = parse_ndjson_telemetry(line).unwrap();

        assert_eq!(parsed.timestamp_ms, Some(1_734_567_890_123));
        assert_eq!(parsed.device_serial.as_deref(), Some("ABC123"));
        assert_eq!(parsed.message_type, "telemetry");
        assert_eq!(parsed.sequence_number, 7);
        assert_eq!(Value::Object(parsed.payload), json!({"temp": 21.5}));
    }

    #[test]
    fn accepts_alternate_key_names_and_defaults() {
        let line = r#"{"timestamp_ms":5,"serial":"X1","payload":{"rh":40}}"#;
        let parsed = parse_ndjson_telemetry(line).unwrap();

        assert_eq!(parsed.timestamp_ms, Some(5));
        assert_eq!(parsed.device_serial.as_deref(), Some("X1"));
        assert_eq!(parsed.message_type, "telemetry");
        assert_eq!(parsed.sequence_number, 0);
    }

    #[test]
    fn wraps_scalar_payload_and_merges_extras() {
        let line = r#"{"dev":"X1","data":3.3,"rssi":-70}"#;
        let parsed = parse_ndjson_telemetry(line).unwrap();

        assert_eq!(
            Value::Object(parsed.payload),
            json!({"raw": 3.3, "rssi": -70})
        );
    }

    #[test]
    fn fractional_timestamps_are_truncated() {
        let parsed = parse_ndjson_telemetry(r#"{"ts":1734567890123.7,"dev":"X1"}"#).unwrap();
        assert_eq!(parsed.timestamp_ms, Some(1_734_567_890_123));

        let negative = parse_ndjson_telemetry(r#"{"ts":-5.0,"dev":"X1"}"#).unwrap();
        assert_eq!(negative.timestamp_ms, None);
    }

    #[test]
    fn string_timestamps_are_parsed() {
        let iso = parse_ndjson_telemetry(r#"{"timestamp":"2024-12-15T12:00:00Z","dev":"X1"}"#)
            .unwrap();
        assert_eq!(iso.timestamp_ms, Some(1_734_264_000_000));

        let offset =
            parse_ndjson_telemetry(r#"{"timestamp":"2024-12-15T14:00:00.250+02:00","dev":"X1"}"#)
                .unwrap();
        assert_eq!(offset.timestamp_ms, Some(1_734_264_000_250));

        let digits = parse_ndjson_telemetry(r#"{"ts":"1700000000000","dev":"X1"}"#).unwrap();
        assert_eq!(digits.timestamp_ms, Some(1_700_000_000_000));
    }

    #[test]
    fn unusable_timestamps_are_absent() {
        for line in [
            r#"{"dev":"X1","data":{"t":1}}"#,
            r#"{"ts":"yesterday","dev":"X1"}"#,
            r#"{"ts":[1],"dev":"X1"}"#,
        ] {
            assert_eq!(parse_ndjson_telemetry(line).unwrap().timestamp_ms, None, "{line}");
        }
    }

    #[test]
    fn rejects_blank_invalid_and_non_object_lines() {
        assert!(parse_ndjson_telemetry("   ").is_none());
        assert!(parse_ndjson_telemetry("{not json").is_none());
        assert!(parse_ndjson_telemetry("[1,2,3]").is_none());
    }
}
