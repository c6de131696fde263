#![cfg(all(unix, feature = "cli"))]

use std::io::Write;
use std::process::{Command, Output, Stdio};

use mycolink::frame::{cobs, decode_frame, MessageType, HEADER_SIZE};

fn mycolink(args: &[&str], stdin: Option<&[u8]>) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_mycolink"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("mycolink should start");

    {
        let mut pipe = child.stdin.take().expect("stdin should be piped");
        if let Some(bytes) = stdin {
            pipe.write_all(bytes).expect("stdin should be writable");
        }
    }
    child.wait_with_output().expect("mycolink should exit")
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line should be JSON"))
        .collect()
}

#[test]
fn encode_prints_decodable_hex() {
    let output = mycolink(
        &[
            "--format", "json", "encode", "--seq", "42", "--ts", "1700000000000", "--json",
            r#"{"temperature":24.5}"#,
        ],
        None,
    );
    assert!(output.status.success());

    let lines = json_lines(&output);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["message_type"], "TELEMETRY");
    assert_eq!(lines[0]["sequence_number"], 42);

    let bytes = hex::decode(lines[0]["hex"].as_str().unwrap()).unwrap();
    let decoded = decode_frame(&bytes).unwrap();
    assert_eq!(decoded.message_type, MessageType::Telemetry);
    assert_eq!(decoded.sequence_number, 42);
    assert_eq!(decoded.timestamp_ms, 1_700_000_000_000);
    assert_eq!(&decoded.payload[..], br#"{"temperature":24.5}"#);
}

#[test]
fn raw_encode_pipes_into_decode() {
    let encoded = mycolink(
        &["--format", "raw", "encode", "--type", "event", "--seq", "7", "--ts", "5", "--data", "hi"],
        None,
    );
    assert!(encoded.status.success());
    assert_eq!(encoded.stdout.last(), Some(&0x00));

    let decoded = mycolink(&["--format", "json", "decode"], Some(encoded.stdout.as_slice()));
    assert!(decoded.status.success());
    let lines = json_lines(&decoded);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["message_type"], "EVENT");
    assert_eq!(lines[0]["sequence_number"], 7);
    assert_eq!(lines[0]["payload"], "hi");
}

#[test]
fn decode_reports_corrupt_frames_with_data_invalid() {
    let good = mycolink::frame::encode_frame(MessageType::Telemetry, 1, 1, b"{}");
    let mut raw = cobs::decode(&good).unwrap();
    raw[HEADER_SIZE] ^= 0x01;
    let mut capture = good.to_vec();
    capture.extend_from_slice(&cobs::encode(&raw));
    let hex_capture = hex::encode(&capture);

    let output = mycolink(&["--format", "json", "decode", "--hex"], Some(hex_capture.as_bytes()));
    assert_eq!(output.status.code(), Some(60));

    let lines = json_lines(&output);
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["sequence_number"], 1);
    assert!(lines[1]["error"].as_str().unwrap().contains("CRC mismatch"));
}

#[test]
fn decode_flags_trailing_partial_frame() {
    let output = mycolink(&["--format", "json", "decode"], Some(&[0x03u8, 0x11, 0x22][..]));
    assert_eq!(output.status.code(), Some(60));
    let lines = json_lines(&output);
    assert!(lines[0]["error"].as_str().unwrap().contains("trailing bytes"));
}

#[test]
fn invalid_json_payload_is_usage_error() {
    let output = mycolink(&["encode", "--json", "{nope"], None);
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--json is not valid JSON"));
}

#[test]
fn command_frames_carry_descriptor() {
    let output = mycolink(
        &["--format", "json", "command", "--seq", "3", "--ts", "10", "mosfet", "2", "on"],
        None,
    );
    assert!(output.status.success());

    let lines = json_lines(&output);
    assert_eq!(lines[0]["message_type"], "COMMAND");
    assert_eq!(lines[0]["command"]["cmd"], "mosfet");
    assert_eq!(lines[0]["command"]["target"], "M2");
    assert_eq!(lines[0]["command"]["state"], true);

    let bytes = hex::decode(lines[0]["hex"].as_str().unwrap()).unwrap();
    let decoded = decode_frame(&bytes).unwrap();
    assert_eq!(decoded.message_type, MessageType::Command);
    assert_eq!(decoded.payload_json().unwrap()["cmd"], "mosfet");
}

#[test]
fn interval_command_is_clamped() {
    let output = mycolink(&["--format", "json", "command", "interval", "10"], None);
    assert!(output.status.success());
    assert_eq!(json_lines(&output)[0]["command"]["interval_ms"], 100);
}

#[test]
fn channels_lists_default_topology() {
    let output = mycolink(&["--format", "json", "channels"], None);
    assert!(output.status.success());

    let lines = json_lines(&output);
    let names: Vec<&str> = lines[0]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "aggregate.environmental",
            "aggregate.substrate",
            "insight.contamination_risk",
            "insight.growth_prediction",
            "system.alerts",
            "system.device_status",
        ]
    );
}

#[test]
fn version_prints_package_version() {
    let output = mycolink(&["version"], None);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("mycolink {}", env!("CARGO_PKG_VERSION"))
    );
}
