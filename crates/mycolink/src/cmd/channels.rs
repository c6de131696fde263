use mycolink_router::{default_channels, Channel};

use crate::cmd::ChannelsArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_json_line, print_table, OutputFormat};

pub fn run(_args: ChannelsArgs, format: OutputFormat) -> CliResult<i32> {
    let mut channels = default_channels();
    channels.sort_by(|a, b| a.name.cmp(&b.name));
    print_channels(&channels, format);
    Ok(SUCCESS)
}

pub(crate) fn print_channels(channels: &[Channel], format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json_line(&channels),
        OutputFormat::Table => print_table(
            &["NAME", "TYPE", "BUFFER", "MESSAGES", "DESCRIPTION"],
            channels
                .iter()
                .map(|c| {
                    vec![
                        c.name.clone(),
                        c.kind.to_string(),
                        c.buffer_size.to_string(),
                        c.message_count.to_string(),
                        c.description.clone(),
                    ]
                })
                .collect(),
        ),
        OutputFormat::Pretty => {
            for c in channels {
                println!(
                    "{} type={} buffer={} messages={} {}",
                    c.name, c.kind, c.buffer_size, c.message_count, c.description
                );
            }
        }
    }
}
