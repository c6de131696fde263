use std::sync::Arc;

use mycolink_frame::FrameAccumulator;
use mycolink_ingest::{
    DeviceClaim, FrameOutcome, IdempotencyGate, InMemoryDeviceDirectory, InMemoryEventStore,
    IngestPipeline,
};
use mycolink_router::Router;
use serde::Serialize;
use serde_json::Value;

use crate::cmd::channels::print_channels;
use crate::cmd::{parse_hex, read_input, ReplayArgs};
use crate::exit::{CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_json_line, print_table, OutputFormat};

type Pipeline = IngestPipeline<InMemoryDeviceDirectory, Arc<InMemoryEventStore>>;

pub fn run(args: ReplayArgs, format: OutputFormat) -> CliResult<i32> {
    let directory = InMemoryDeviceDirectory::new();
    let mut first_serial = None;
    for spec in &args.devices {
        let (serial, secret) = parse_device_spec(spec)?;
        first_serial.get_or_insert_with(|| serial.clone());
        directory.register(serial, secret);
    }

    let store = Arc::new(InMemoryEventStore::new());
    let router = Arc::new(Router::with_default_channels());
    let pipeline = IngestPipeline::new(
        IdempotencyGate::new(directory, Arc::clone(&store)),
        Arc::clone(&router),
    );

    let input = read_input(args.input.as_deref())?;
    let outcomes = if args.ndjson {
        replay_lines(&pipeline, &input, args.credential.as_deref())
    } else {
        let input = if args.hex { parse_hex(&input)? } else { input };
        let serial = args
            .source
            .clone()
            .or(first_serial)
            .ok_or_else(|| CliError::new(USAGE, "no source device given"))?;
        let mut claim = DeviceClaim::new(serial);
        claim.credential = args.credential.clone();
        replay_stream(&pipeline, &input, &claim)
    };

    let summary = Summary::from_outcomes(&outcomes, store.len());
    print_outcomes(&outcomes, format);

    let mut active: Vec<_> = router
        .list_channels()
        .into_iter()
        .filter(|channel| channel.message_count > 0)
        .collect();
    active.sort_by(|a, b| a.name.cmp(&b.name));

    tracing::info!(
        accepted = summary.accepted,
        duplicates = summary.duplicates,
        rejected = summary.rejected,
        "replay finished"
    );

    match format {
        OutputFormat::Json | OutputFormat::Raw => {
            let channels = active
                .iter()
                .map(|channel| ChannelHistory {
                    name: &channel.name,
                    message_count: channel.message_count,
                    recent: router
                        .get_recent_messages(&channel.name, args.history)
                        .iter()
                        .map(|message| {
                            serde_json::from_str(&message.to_ndjson()).unwrap_or(Value::Null)
                        })
                        .collect(),
                })
                .collect();
            print_json_line(&ReplayReport { summary, channels });
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            print_channels(&active, format);
            println!(
                "accepted={} duplicate={} rejected={} stored={}",
                summary.accepted, summary.duplicates, summary.rejected, summary.stored
            );
        }
    }

    Ok(if summary.rejected == 0 { SUCCESS } else { DATA_INVALID })
}

fn replay_stream(pipeline: &Pipeline, input: &[u8], claim: &DeviceClaim) -> Vec<FrameOutcome> {
    let mut accumulator = FrameAccumulator::new();
    let outcomes = pipeline.ingest_stream(&mut accumulator, input, claim);
    if accumulator.pending() > 0 {
        tracing::warn!(
            bytes = accumulator.pending(),
            "capture ends with an incomplete frame"
        );
    }
    outcomes
}

fn replay_lines(pipeline: &Pipeline, input: &[u8], credential: Option<&str>) -> Vec<FrameOutcome> {
    String::from_utf8_lossy(input)
        .lines()
        .filter_map(|line| {
            let outcome = pipeline.ingest_gateway_line(line, credential);
            if outcome.is_none() && !line.trim().is_empty() {
                tracing::warn!(line, "skipping unparsable gateway line");
            }
            outcome
        })
        .collect()
}

/// Split `SERIAL` or `SERIAL=SECRET`.
fn parse_device_spec(spec: &str) -> CliResult<(String, Option<String>)> {
    let (serial, secret) = match spec.split_once('=') {
        Some((serial, secret)) => (serial.trim(), Some(secret.to_owned())),
        None => (spec.trim(), None),
    };
    if serial.is_empty() {
        return Err(CliError::new(
            USAGE,
            format!("invalid --device '{spec}': serial must not be empty"),
        ));
    }
    Ok((serial.to_owned(), secret))
}

#[derive(Serialize, Default, Debug, Clone, Copy, PartialEq, Eq)]
struct Summary {
    accepted: usize,
    duplicates: usize,
    rejected: usize,
    stored: usize,
}

impl Summary {
    fn from_outcomes(outcomes: &[FrameOutcome], stored: usize) -> Self {
        let mut summary = Self {
            stored,
            ..Self::default()
        };
        for outcome in outcomes {
            match outcome {
                FrameOutcome::Accepted { .. } => summary.accepted += 1,
                FrameOutcome::Duplicate(_) => summary.duplicates += 1,
                FrameOutcome::Rejected(_) => summary.rejected += 1,
            }
        }
        summary
    }
}

#[derive(Serialize)]
struct ChannelHistory<'a> {
    name: &'a str,
    message_count: u64,
    recent: Vec<Value>,
}

#[derive(Serialize)]
struct ReplayReport<'a> {
    summary: Summary,
    channels: Vec<ChannelHistory<'a>>,
}

#[derive(Serialize)]
struct OutcomeOutput<'a> {
    index: usize,
    outcome: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sequence_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recipients: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> OutcomeOutput<'a> {
    fn new(index: usize, outcome: &'a FrameOutcome) -> Self {
        let mut out = Self {
            index,
            outcome: outcome.label(),
            sequence_number: None,
            timestamp_ms: None,
            channel: None,
            recipients: None,
            error: None,
        };
        match outcome {
            FrameOutcome::Accepted {
                key,
                channel,
                recipients,
            } => {
                out.sequence_number = Some(key.sequence_number);
                out.timestamp_ms = Some(key.timestamp_ms);
                out.channel = Some(channel);
                out.recipients = Some(*recipients);
            }
            FrameOutcome::Duplicate(key) => {
                out.sequence_number = Some(key.sequence_number);
                out.timestamp_ms = Some(key.timestamp_ms);
            }
            FrameOutcome::Rejected(err) => out.error = Some(err.to_string()),
        }
        out
    }
}

fn print_outcomes(outcomes: &[FrameOutcome], format: OutputFormat) {
    let rows: Vec<OutcomeOutput<'_>> = outcomes
        .iter()
        .enumerate()
        .map(|(index, outcome)| OutcomeOutput::new(index, outcome))
        .collect();

    match format {
        OutputFormat::Json | OutputFormat::Raw => rows.iter().for_each(print_json_line),
        OutputFormat::Table => print_table(
            &["#", "OUTCOME", "SEQ", "TS_MS", "CHANNEL", "DETAIL"],
            rows.iter()
                .map(|row| {
                    vec![
                        row.index.to_string(),
                        row.outcome.to_string(),
                        display(row.sequence_number),
                        display(row.timestamp_ms),
                        row.channel.unwrap_or_default().to_string(),
                        row.error
                            .clone()
                            .or_else(|| row.recipients.map(|n| format!("{n} recipients")))
                            .unwrap_or_default(),
                    ]
                })
                .collect(),
        ),
        OutputFormat::Pretty => {
            for row in &rows {
                let mut line = format!("#{} {}", row.index, row.outcome);
                if let Some(seq) = row.sequence_number {
                    line.push_str(&format!(" seq={seq}"));
                }
                if let Some(channel) = row.channel {
                    line.push_str(&format!(" channel={channel}"));
                }
                if let Some(error) = &row.error {
                    line.push_str(&format!(" error={error}"));
                }
                println!("{line}");
            }
        }
    }
}

fn display<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use mycolink_frame::{encode_frame, MessageType};
    use mycolink_ingest::IngestionKey;

    use super::*;

    #[test]
    fn device_specs_parse() {
        assert_eq!(
            parse_device_spec("MCB-001").unwrap(),
            ("MCB-001".to_owned(), None)
        );
        assert_eq!(
            parse_device_spec("MCB-002=k=v").unwrap(),
            ("MCB-002".to_owned(), Some("k=v".to_owned()))
        );
        assert_eq!(parse_device_spec("=secret").unwrap_err().code, USAGE);
    }

    #[test]
    fn summary_counts_outcomes() {
        let key = IngestionKey {
            device_id: "00000000-0000-0000-0000-000000000000".parse().unwrap(),
            sequence_number: 1,
            timestamp_ms: 1,
        };
        let outcomes = vec![
            FrameOutcome::Accepted {
                key,
                channel: "device.X".to_owned(),
                recipients: 0,
            },
            FrameOutcome::Duplicate(key),
        ];
        assert_eq!(
            Summary::from_outcomes(&outcomes, 1),
            Summary {
                accepted: 1,
                duplicates: 1,
                rejected: 0,
                stored: 1
            }
        );
    }

    #[test]
    fn report_embeds_summary_by_value() {
        let summary = Summary {
            accepted: 2,
            duplicates: 1,
            rejected: 0,
            stored: 2,
        };
        let report = ReplayReport {
            summary,
            channels: vec![ChannelHistory {
                name: "device.MCB-001",
                message_count: 2,
                recent: Vec::new(),
            }],
        };

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["summary"]["accepted"], 2);
        assert_eq!(value["channels"][0]["name"], "device.MCB-001");
        assert_eq!(summary.rejected, 0);
    }

    #[test]
    fn stream_replay_dedups() {
        let directory = InMemoryDeviceDirectory::new();
        directory.register("MCB-001", None);
        let store = Arc::new(InMemoryEventStore::new());
        let pipeline = IngestPipeline::new(
            IdempotencyGate::new(directory, Arc::clone(&store)),
            Arc::new(Router::with_default_channels()),
        );

        let frame = encode_frame(MessageType::Telemetry, 1, 2, br#"{"t":1}"#);
        let mut capture = frame.to_vec();
        capture.extend_from_slice(&frame);

        let outcomes = replay_stream(&pipeline, &capture, &DeviceClaim::new("MCB-001"));
        assert_eq!(Summary::from_outcomes(&outcomes, store.len()).duplicates, 1);
        assert_eq!(store.len(), 1);
    }
}
