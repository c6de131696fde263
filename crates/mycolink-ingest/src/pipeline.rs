//! Bytes in, persisted and published events out.

use std::sync::Arc;

use mycolink_frame::{
    decode_frame, parse_ndjson_telemetry, DecodedMessage, Frame, FrameAccumulator, MessageType,
};
use mycolink_router::{create_device_channel, Message, Router};

use crate::device::{DeviceClaim, DeviceDirectory};
use crate::error::{DeviceError, IngestError};
use crate::event::{IngestionKey, TelemetryEvent};
use crate::gate::{GateDecision, IdempotencyGate};
use crate::store::{EventStore, RecordOutcome};

/// What happened to one frame.
#[derive(Debug)]
pub enum FrameOutcome {
    /// Recorded and published to `recipients` subscribers.
    Accepted {
        key: IngestionKey,
        channel: String,
        recipients: usize,
    },
    Duplicate(IngestionKey),
    Rejected(IngestError),
}

impl FrameOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }

    /// Short label for reports: `accepted`, `duplicate`, or `rejected`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accepted { .. } => "accepted",
            Self::Duplicate(_) => "duplicate",
            Self::Rejected(_) => "rejected",
        }
    }
}

/// Composes decoding, the idempotency gate, persistence, and fan-out.
///
/// Accepted events are recorded before they are published, so a store
/// failure never produces a pub/sub message. Each device publishes to
/// `device.<serial>`, which is registered on first use.
pub struct IngestPipeline<D, S> {
    gate: IdempotencyGate<D, S>,
    router: Arc<Router>,
}

impl<D: DeviceDirectory, S: EventStore> IngestPipeline<D, S> {
    pub fn new(gate: IdempotencyGate<D, S>, router: Arc<Router>) -> Self {
        Self { gate, router }
    }

    pub fn gate(&self) -> &IdempotencyGate<D, S> {
        &self.gate
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Ingest one already-decoded message.
    pub fn ingest_message(&self, message: &DecodedMessage, claim: &DeviceClaim) -> FrameOutcome {
        let outcome = match self.gate.ingest(message, claim) {
            Ok(GateDecision::Accepted(event)) => self.commit(event),
            Ok(GateDecision::Duplicate(key)) => FrameOutcome::Duplicate(key),
            Err(err) => FrameOutcome::Rejected(err),
        };

        if let FrameOutcome::Rejected(err) = &outcome {
            tracing::warn!(
                device = %claim.serial,
                sequence_number = message.sequence_number,
                error = %err,
                "dropped frame"
            );
        }
        outcome
    }

    /// Decode and ingest one zero-terminated frame.
    pub fn ingest_frame(&self, frame: &[u8], claim: &DeviceClaim) -> FrameOutcome {
        match decode_frame(frame) {
            Ok(message) => self.ingest_message(&message, claim),
            Err(err) => {
                tracing::warn!(device = %claim.serial, error = %err, "dropped undecodable frame");
                FrameOutcome::Rejected(err.into())
            }
        }
    }

    /// Feed a chunk of a device byte stream and ingest every frame it
    /// completes. Partial frames stay in `accumulator` for the next chunk.
    pub fn ingest_stream(
        &self,
        accumulator: &mut FrameAccumulator,
        chunk: &[u8],
        claim: &DeviceClaim,
    ) -> Vec<FrameOutcome> {
        accumulator.extend(chunk);

        let mut outcomes = Vec::new();
        while let Some(next) = accumulator.next_message() {
            outcomes.push(match next {
                Ok(message) => self.ingest_message(&message, claim),
                Err(err) => {
                    tracing::warn!(device = %claim.serial, error = %err, "dropped undecodable frame");
                    FrameOutcome::Rejected(err.into())
                }
            });
        }
        outcomes
    }

    /// Ingest one gateway NDJSON line. Blank or unparsable lines yield `None`.
    ///
    /// The device serial comes from the line itself. A line without a
    /// usable timestamp is rejected, since it cannot be told apart from
    /// other readings of the same device.
    pub fn ingest_gateway_line(&self, line: &str, credential: Option<&str>) -> Option<FrameOutcome> {
        let telemetry = parse_ndjson_telemetry(line)?;

        let claim = DeviceClaim {
            serial: telemetry.device_serial.clone().unwrap_or_default(),
            credential: credential.map(str::to_owned),
        };
        if claim.serial.is_empty() {
            return Some(FrameOutcome::Rejected(
                DeviceError::UnknownDevice {
                    serial: String::new(),
                }
                .into(),
            ));
        }

        let message_type = match telemetry.message_type.parse::<MessageType>() {
            Ok(message_type) => message_type,
            Err(_) => {
                return Some(FrameOutcome::Rejected(
                    IngestError::UnrecognizedMessageType(telemetry.message_type),
                ))
            }
        };

        let Some(timestamp_ms) = telemetry.timestamp_ms else {
            tracing::warn!(device = %claim.serial, "dropped gateway line without timestamp");
            return Some(FrameOutcome::Rejected(IngestError::MissingTimestamp {
                serial: claim.serial,
            }));
        };

        let payload = match serde_json::to_vec(&telemetry.payload) {
            Ok(payload) => payload,
            Err(err) => return Some(FrameOutcome::Rejected(IngestError::Decode(err.into()))),
        };
        let frame = Frame::new(
            message_type,
            telemetry.sequence_number,
            timestamp_ms,
            payload,
        );

        Some(self.ingest_frame(&frame.encode(), &claim))
    }

    fn commit(&self, event: TelemetryEvent) -> FrameOutcome {
        match self.gate.record(&event) {
            Ok(RecordOutcome::Inserted) => {}
            Ok(RecordOutcome::AlreadyRecorded) => return FrameOutcome::Duplicate(event.key),
            Err(err) => return FrameOutcome::Rejected(err),
        }

        let channel = format!("device.{}", event.device_serial);
        self.router.register_if_absent(create_device_channel(
            &event.device_serial,
            event.key.device_id,
            None,
        ));

        let message_type = event.type_label();
        let key = event.key;
        let message = Message::new(channel.clone(), event.payload)
            .with_source(
                "device",
                Some(key.device_id.to_string()),
                Some(event.device_serial),
            )
            .with_message_type(message_type);
        let recipients = self.router.publish(message);

        FrameOutcome::Accepted {
            key,
            channel,
            recipients,
        }
    }
}
