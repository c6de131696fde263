mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "mycolink", version, about = "Device telemetry framing and routing CLI")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::CommandAction;

    #[test]
    fn parses_encode_subcommand() {
        let cli = Cli::try_parse_from([
            "mycolink", "encode", "--type", "event", "--seq", "9", "--json", "{\"x\":1}",
        ])
        .expect("encode args should parse");

        let Command::Encode(args) = cli.command else {
            panic!("expected encode");
        };
        assert_eq!(args.message_type, mycolink_frame::MessageType::Event);
        assert_eq!(args.seq, 9);
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "mycolink", "encode", "--json", "{\"x\":1}", "--data", "hello",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_unknown_message_type() {
        let err = Cli::try_parse_from(["mycolink", "encode", "--type", "status"])
            .expect_err("unknown type should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_nested_command_action() {
        let cli = Cli::try_parse_from([
            "mycolink", "command", "--seq", "3", "reboot", "--side", "B",
        ])
        .expect("command args should parse");

        let Command::Command(args) = cli.command else {
            panic!("expected command");
        };
        assert_eq!(args.seq, 3);
        assert!(matches!(
            args.action,
            CommandAction::Reboot {
                side: mycolink_frame::Side::B
            }
        ));
    }

    #[test]
    fn replay_requires_a_device() {
        let err = Cli::try_parse_from(["mycolink", "replay", "capture.bin"])
            .expect_err("missing --device should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
