use mycolink_frame::{FrameAccumulator, DEFAULT_MAX_FRAME};

use crate::cmd::{parse_hex, read_input, DecodeArgs};
use crate::exit::{CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_decode_failure, print_decoded, OutputFormat};

/// Decode every frame in the input. Exits with `DATA_INVALID` if any frame
/// failed or the input ends mid-frame.
pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut input = read_input(args.input.as_deref())?;
    if args.hex {
        input = parse_hex(&input)?;
    }

    let mut accumulator = FrameAccumulator::with_max_frame_size(DEFAULT_MAX_FRAME);
    accumulator.extend(&input);

    let mut failures = 0usize;
    let mut index = 0usize;
    while let Some(next) = accumulator.next_message() {
        match next {
            Ok(message) => print_decoded(index, &message, format),
            Err(err) => {
                failures += 1;
                tracing::warn!(frame = index, error = %err, "frame failed to decode");
                print_decode_failure(index, &err.to_string(), format);
            }
        }
        index += 1;
    }

    if accumulator.pending() > 0 {
        failures += 1;
        let error = format!("{} trailing bytes without a frame delimiter", accumulator.pending());
        tracing::warn!(frame = index, "{error}");
        print_decode_failure(index, &error, format);
    }

    tracing::debug!(frames = index, failures, "decode finished");
    Ok(if failures == 0 { SUCCESS } else { DATA_INVALID })
}
