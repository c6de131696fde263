use mycolink_frame::Command;
use mycolink_router::now_millis;

use crate::cmd::encode::print_encoded;
use crate::cmd::{CommandAction, CommandArgs, SwitchState};
use crate::exit::{json_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: CommandArgs, format: OutputFormat) -> CliResult<i32> {
    let command = descriptor(args.action);
    let frame = command
        .to_frame(args.seq, args.ts.unwrap_or_else(now_millis))
        .map_err(|err| json_error("failed encoding command", err))?;

    print_encoded(&frame, Some(&command), format);
    Ok(SUCCESS)
}

fn descriptor(action: CommandAction) -> Command {
    match action {
        CommandAction::Mosfet { number, state } => {
            Command::set_mosfet(number, state == SwitchState::On)
        }
        CommandAction::Interval { interval_ms } => Command::set_telemetry_interval(interval_ms),
        CommandAction::I2cScan => Command::request_i2c_scan(),
        CommandAction::Reboot { side } => Command::reboot(side),
        CommandAction::Ota { url, side } => Command::firmware_update(url, side),
        CommandAction::Lora {
            frequency_mhz,
            sf,
            bw,
        } => Command::set_lora_config(frequency_mhz, sf, bw),
    }
}
