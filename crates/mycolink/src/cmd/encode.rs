use mycolink_frame::{Command, Frame};
use mycolink_router::now_millis;
use serde::Serialize;

use crate::cmd::{resolve_payload, EncodeArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{payload_preview, print_json_line, print_raw, print_table, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(
        args.json.as_deref(),
        args.data.as_deref(),
        args.file.as_deref(),
    )?;
    let frame = Frame::new(
        args.message_type,
        args.seq,
        args.ts.unwrap_or_else(now_millis),
        payload,
    );

    print_encoded(&frame, None, format);
    Ok(SUCCESS)
}

#[derive(Serialize)]
struct EncodedOutput<'a> {
    message_type: &'a str,
    sequence_number: u64,
    timestamp_ms: u64,
    payload_size: usize,
    encoded_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<&'a Command>,
    hex: String,
}

/// Print an encoded frame. `command` is the descriptor it carries, if any.
pub(crate) fn print_encoded(frame: &Frame, command: Option<&Command>, format: OutputFormat) {
    let encoded = frame.encode();
    let hex = hex::encode(&encoded);

    match format {
        OutputFormat::Json => print_json_line(&EncodedOutput {
            message_type: frame.message_type.name(),
            sequence_number: frame.sequence_number,
            timestamp_ms: frame.timestamp_ms,
            payload_size: frame.payload.len(),
            encoded_size: encoded.len(),
            command,
            hex,
        }),
        OutputFormat::Table => print_table(
            &["TYPE", "SEQ", "TS_MS", "SIZE", "PAYLOAD", "HEX"],
            vec![vec![
                frame.message_type.name().to_string(),
                frame.sequence_number.to_string(),
                frame.timestamp_ms.to_string(),
                encoded.len().to_string(),
                payload_preview(&frame.payload),
                hex,
            ]],
        ),
        OutputFormat::Pretty => println!("{hex}"),
        OutputFormat::Raw => print_raw(&encoded),
    }
}
