//! Duplicate suppression for retransmitted frames.
//!
//! Each `(device_id, sequence_number, timestamp)` key moves from unseen to
//! recorded exactly once. The gate's own checks (a bounded cache of recent
//! keys, then [`EventStore::contains`]) only short-circuit obvious
//! retransmissions. Under concurrent delivery of one key both callers may
//! be accepted; the store's atomic `record` then decides which one wins,
//! and the loser is reported as a duplicate.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use mycolink_frame::{DecodedMessage, MessageType};
use mycolink_router::now_millis;
use serde_json::{Map, Value};

use crate::device::{DeviceClaim, DeviceDirectory, DeviceIdentity};
use crate::error::{IngestError, Result};
use crate::event::{IngestionKey, TelemetryEvent};
use crate::store::{EventStore, RecordOutcome};

/// Default number of recently recorded keys remembered in-process.
pub const DEFAULT_RECENT_KEY_CAPACITY: usize = 1024;

/// Controls gate behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    /// Size of the recent-key cache; 0 disables it.
    pub recent_key_capacity: usize,
    /// Ingest `EVENT` frames alongside `TELEMETRY`.
    pub accept_events: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            recent_key_capacity: DEFAULT_RECENT_KEY_CAPACITY,
            accept_events: true,
        }
    }
}

/// Outcome of passing a message through the gate.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// First sighting; the caller should persist the event.
    Accepted(TelemetryEvent),
    /// This key was already recorded.
    Duplicate(IngestionKey),
}

/// FIFO set of recently seen keys.
#[derive(Debug)]
struct RecentKeys {
    order: VecDeque<IngestionKey>,
    members: HashSet<IngestionKey>,
    capacity: usize,
}

impl RecentKeys {
    fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity.min(DEFAULT_RECENT_KEY_CAPACITY)),
            members: HashSet::with_capacity(capacity.min(DEFAULT_RECENT_KEY_CAPACITY)),
            capacity,
        }
    }

    fn contains(&self, key: &IngestionKey) -> bool {
        self.members.contains(key)
    }

    fn insert(&mut self, key: IngestionKey) {
        if self.capacity == 0 || !self.members.insert(key) {
            return;
        }
        self.order.push_back(key);
        if self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.members.remove(&evicted);
            }
        }
    }
}

/// Decides whether a decoded message is new.
pub struct IdempotencyGate<D, S> {
    directory: D,
    store: S,
    config: GateConfig,
    recent: Mutex<RecentKeys>,
}

impl<D: DeviceDirectory, S: EventStore> IdempotencyGate<D, S> {
    pub fn new(directory: D, store: S) -> Self {
        Self::with_config(directory, store, GateConfig::default())
    }

    pub fn with_config(directory: D, store: S, config: GateConfig) -> Self {
        Self {
            directory,
            store,
            recent: Mutex::new(RecentKeys::new(config.recent_key_capacity)),
            config,
        }
    }

    /// Check `message` from the device named by `claim`.
    ///
    /// Fails closed: an unresolvable device, a message without a verified
    /// CRC, an unsupported type, or a store error is an `Err`, never an
    /// acceptance.
    pub fn ingest(&self, message: &DecodedMessage, claim: &DeviceClaim) -> Result<GateDecision> {
        let device = self.directory.resolve(claim)?;
        if !message.crc_valid {
            return Err(IngestError::IntegrityUnverified {
                sequence_number: message.sequence_number,
            });
        }
        self.check_type(message.message_type)?;

        let key = IngestionKey {
            device_id: device.id,
            sequence_number: message.sequence_number,
            timestamp_ms: message.timestamp_ms,
        };

        if self.recent().contains(&key) {
            tracing::trace!(%key, "duplicate frame (recent)");
            return Ok(GateDecision::Duplicate(key));
        }
        if self.store.contains(&key)? {
            self.recent().insert(key);
            tracing::trace!(%key, "duplicate frame (store)");
            return Ok(GateDecision::Duplicate(key));
        }

        let event = build_event(key, device, message)?;
        tracing::debug!(%key, message_type = %message.message_type, "accepted frame");
        Ok(GateDecision::Accepted(event))
    }

    /// Persist an accepted event and mark its key recorded.
    ///
    /// [`RecordOutcome::AlreadyRecorded`] means a concurrent delivery won
    /// the race; treat the event as a duplicate.
    pub fn record(&self, event: &TelemetryEvent) -> Result<RecordOutcome> {
        let outcome = self.store.record(event)?;
        self.recent().insert(event.key);
        if outcome == RecordOutcome::AlreadyRecorded {
            tracing::trace!(key = %event.key, "duplicate frame (record race)");
        }
        Ok(outcome)
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    fn check_type(&self, message_type: MessageType) -> Result<()> {
        match message_type {
            MessageType::Telemetry => Ok(()),
            MessageType::Event if self.config.accept_events => Ok(()),
            other => Err(IngestError::UnsupportedMessageType(other)),
        }
    }

    fn recent(&self) -> MutexGuard<'_, RecentKeys> {
        self.recent.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn build_event(
    key: IngestionKey,
    device: DeviceIdentity,
    message: &DecodedMessage,
) -> Result<TelemetryEvent> {
    let payload = match message.payload_json()? {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("raw".to_owned(), other);
            map
        }
    };

    Ok(TelemetryEvent {
        key,
        device_serial: device.serial,
        message_type: message.message_type,
        payload,
        received_at: now_millis(),
    })
}
