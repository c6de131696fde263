use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use mycolink_frame::DecodedMessage;
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct DecodedOutput<'a> {
    index: usize,
    message_type: &'a str,
    sequence_number: u64,
    timestamp_ms: u64,
    payload_size: usize,
    payload: serde_json::Value,
    crc: String,
}

#[derive(Serialize)]
struct DecodeFailureOutput<'a> {
    index: usize,
    error: &'a str,
}

/// Print one decoded frame.
pub fn print_decoded(index: usize, message: &DecodedMessage, format: OutputFormat) {
    let type_name = message.message_type.name();
    match format {
        OutputFormat::Json => {
            let out = DecodedOutput {
                index,
                message_type: type_name,
                sequence_number: message.sequence_number,
                timestamp_ms: message.timestamp_ms,
                payload_size: message.payload.len(),
                payload: message
                    .payload_json()
                    .unwrap_or_else(|_| payload_preview(&message.payload).into()),
                crc: format!("{:#06x}", message.crc),
            };
            print_json_line(&out);
        }
        OutputFormat::Table => {
            print_table(
                &["#", "TYPE", "SEQ", "TS_MS", "SIZE", "PAYLOAD"],
                vec![vec![
                    index.to_string(),
                    type_name.to_string(),
                    message.sequence_number.to_string(),
                    message.timestamp_ms.to_string(),
                    message.payload.len().to_string(),
                    payload_preview(&message.payload),
                ]],
            );
        }
        OutputFormat::Pretty => {
            println!(
                "#{index} type={type_name} seq={} ts={} size={} payload={}",
                message.sequence_number,
                message.timestamp_ms,
                message.payload.len(),
                payload_preview(&message.payload)
            );
        }
        OutputFormat::Raw => print_raw(&message.payload),
    }
}

/// Print a frame that failed to decode. Raw output skips failures.
pub fn print_decode_failure(index: usize, error: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json_line(&DecodeFailureOutput { index, error }),
        OutputFormat::Table => print_table(&["#", "ERROR"], vec![vec![index.to_string(), error.to_string()]]),
        OutputFormat::Pretty => println!("#{index} error={error}"),
        OutputFormat::Raw => {}
    }
}

pub fn print_json_line<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_table(header: &[&str], rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.to_vec());
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_marks_binary_payloads() {
        assert_eq!(payload_preview(br#"{"a":1}"#), r#"{"a":1}"#);
        assert_eq!(payload_preview(&[0xff, 0xfe]), "<binary 2 bytes>");
    }
}
