use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand, ValueEnum};
use mycolink_frame::{MessageType, Side};

use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, USAGE};
use crate::output::OutputFormat;

pub mod channels;
pub mod command;
pub mod decode;
pub mod encode;
pub mod replay;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build one frame and print it.
    Encode(EncodeArgs),
    /// Decode zero-delimited frames from a file or stdin.
    Decode(DecodeArgs),
    /// Build a device command frame.
    Command(CommandArgs),
    /// List the default channel topology.
    Channels(ChannelsArgs),
    /// Run a capture through the ingest pipeline.
    Replay(ReplayArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Command(args) => command::run(args, format),
        Command::Channels(args) => channels::run(args, format),
        Command::Replay(args) => replay::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Message type name (telemetry, command, event, ack, nack, heartbeat, discovery).
    #[arg(long = "type", short = 't', default_value = "telemetry", value_parser = parse_message_type)]
    pub message_type: MessageType,
    /// Sequence number.
    #[arg(long, short = 's', default_value = "0")]
    pub seq: u64,
    /// Timestamp in milliseconds since the Unix epoch. Default: now.
    #[arg(long)]
    pub ts: Option<u64>,
    /// JSON payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture file. Default: stdin.
    pub input: Option<PathBuf>,
    /// Input is hex text rather than raw bytes.
    #[arg(long)]
    pub hex: bool,
}

#[derive(Args, Debug)]
pub struct CommandArgs {
    /// Sequence number.
    #[arg(long, short = 's', default_value = "0", global = true)]
    pub seq: u64,
    /// Timestamp in milliseconds since the Unix epoch. Default: now.
    #[arg(long, global = true)]
    pub ts: Option<u64>,
    #[command(subcommand)]
    pub action: CommandAction,
}

#[derive(Subcommand, Debug)]
pub enum CommandAction {
    /// Switch a MOSFET output.
    Mosfet {
        /// Output number (1-based).
        number: u8,
        state: SwitchState,
    },
    /// Set the telemetry reporting interval.
    Interval {
        /// Interval in milliseconds; clamped to the supported range.
        interval_ms: u64,
    },
    /// Ask the device to scan its I2C bus.
    I2cScan,
    /// Reboot one side of the device.
    Reboot {
        #[arg(long, default_value = "a", value_parser = parse_side)]
        side: Side,
    },
    /// Start a firmware update.
    Ota {
        url: String,
        #[arg(long, default_value = "a", value_parser = parse_side)]
        side: Side,
    },
    /// Reconfigure the LoRa radio.
    Lora {
        frequency_mhz: f64,
        /// Spreading factor.
        #[arg(long)]
        sf: Option<u8>,
        /// Bandwidth in kHz.
        #[arg(long)]
        bw: Option<f64>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum SwitchState {
    On,
    Off,
}

#[derive(Args, Debug, Default)]
pub struct ChannelsArgs {}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Capture file. Default: stdin.
    pub input: Option<PathBuf>,
    /// Registered device serials, as SERIAL or SERIAL=SECRET (repeatable).
    #[arg(long = "device", short = 'd', value_name = "SERIAL[=SECRET]", required = true)]
    pub devices: Vec<String>,
    /// Device the binary capture came from. Default: the first --device.
    #[arg(long, value_name = "SERIAL")]
    pub source: Option<String>,
    /// Credential presented with every frame.
    #[arg(long, env = "MYCOLINK_DEVICE_SECRET", hide_env_values = true)]
    pub credential: Option<String>,
    /// Capture is hex text rather than raw bytes.
    #[arg(long, conflicts_with = "ndjson")]
    pub hex: bool,
    /// Capture is gateway NDJSON telemetry lines.
    #[arg(long)]
    pub ndjson: bool,
    /// Number of recent messages to show per channel.
    #[arg(long, default_value = "10")]
    pub history: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_message_type(input: &str) -> Result<MessageType, String> {
    input.parse().map_err(|_| {
        format!("unknown message type '{input}' (expected telemetry, command, event, ack, nack, heartbeat, or discovery)")
    })
}

fn parse_side(input: &str) -> Result<Side, String> {
    input
        .parse()
        .map_err(|_| format!("unknown side '{input}' (expected a or b)"))
}

/// Read a capture from `path`, or stdin when absent.
pub(crate) fn read_input(path: Option<&Path>) -> CliResult<Vec<u8>> {
    match path {
        Some(path) => fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err)),
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|err| io_error("failed reading stdin", err))?;
            Ok(buf)
        }
    }
}

/// Parse hex text, ignoring whitespace.
pub(crate) fn parse_hex(input: &[u8]) -> CliResult<Vec<u8>> {
    let digits: Vec<u8> = input
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    hex::decode(digits).map_err(|err| CliError::new(DATA_INVALID, format!("invalid hex input: {err}")))
}

/// Payload bytes from `--json`, `--data`, or `--file`; empty when none is given.
pub(crate) fn resolve_payload(
    json: Option<&str>,
    data: Option<&str>,
    file: Option<&Path>,
) -> CliResult<Vec<u8>> {
    if let Some(json) = json {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return serde_json::to_vec(&value)
            .map_err(|err| crate::exit::json_error("failed encoding payload", err));
    }
    if let Some(data) = data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_input_ignores_whitespace() {
        assert_eq!(parse_hex(b"0a 0B\n00").unwrap(), vec![0x0a, 0x0b, 0x00]);
        assert_eq!(parse_hex(b"abc").unwrap_err().code, DATA_INVALID);
    }

    #[test]
    fn json_payload_is_compacted() {
        let payload = resolve_payload(Some(r#"{ "temp" : 21.5 }"#), None, None).unwrap();
        assert_eq!(payload, br#"{"temp":21.5}"#);
        assert_eq!(
            resolve_payload(Some("{nope"), None, None).unwrap_err().code,
            USAGE
        );
        assert!(resolve_payload(None, None, None).unwrap().is_empty());
    }

    #[test]
    fn message_types_parse_case_insensitively() {
        assert_eq!(parse_message_type("EVENT").unwrap(), MessageType::Event);
        assert!(parse_message_type("status").is_err());
    }
}
