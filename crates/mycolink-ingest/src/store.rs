use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::error::StoreError;
use crate::event::{IngestionKey, TelemetryEvent};

/// Result of recording an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Inserted,
    /// Another writer recorded this key first.
    AlreadyRecorded,
}

/// Persistence for accepted events.
///
/// `record` must be atomic per key: of any number of concurrent calls for
/// one key, exactly one reports [`RecordOutcome::Inserted`].
pub trait EventStore: Send + Sync {
    fn contains(&self, key: &IngestionKey) -> Result<bool, StoreError>;

    fn record(&self, event: &TelemetryEvent) -> Result<RecordOutcome, StoreError>;
}

impl<T: EventStore + ?Sized> EventStore for Arc<T> {
    fn contains(&self, key: &IngestionKey) -> Result<bool, StoreError> {
        (**self).contains(key)
    }

    fn record(&self, event: &TelemetryEvent) -> Result<RecordOutcome, StoreError> {
        (**self).record(event)
    }
}

/// Map-backed store. Events are ordered by device, then sequence number.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: Mutex<BTreeMap<IngestionKey, TelemetryEvent>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn get(&self, key: &IngestionKey) -> Option<TelemetryEvent> {
        self.lock().get(key).cloned()
    }

    /// All events for one device, oldest sequence number first.
    pub fn events_for(&self, device_id: Uuid) -> Vec<TelemetryEvent> {
        self.lock()
            .values()
            .filter(|event| event.key.device_id == device_id)
            .cloned()
            .collect()
    }

    /// Highest sequence number recorded for a device.
    pub fn last_sequence_number(&self, device_id: Uuid) -> Option<u64> {
        self.lock()
            .keys()
            .filter(|key| key.device_id == device_id)
            .map(|key| key.sequence_number)
            .max()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<IngestionKey, TelemetryEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventStore for InMemoryEventStore {
    fn contains(&self, key: &IngestionKey) -> Result<bool, StoreError> {
        Ok(self.lock().contains_key(key))
    }

    fn record(&self, event: &TelemetryEvent) -> Result<RecordOutcome, StoreError> {
        let mut events = self.lock();
        if events.contains_key(&event.key) {
            return Ok(RecordOutcome::AlreadyRecorded);
        }
        events.insert(event.key, event.clone());
        Ok(RecordOutcome::Inserted)
    }
}

#[cfg(test)]
mod tests {
    use mycolink_frame::MessageType;
    use serde_json::Map;

    use super::*;

    fn event(device_id: Uuid, sequence_number: u64) -> TelemetryEvent {
        TelemetryEvent {
            key: IngestionKey {
                device_id,
                sequence_number,
                timestamp_ms: 1_000 + sequence_number,
            },
            device_serial: "MCB-001".to_owned(),
            message_type: MessageType::Telemetry,
            payload: Map::new(),
            received_at: 0,
        }
    }

    #[test]
    fn record_is_unique_per_key() {
        let store = InMemoryEventStore::new();
        let first = event(Uuid::new_v4(), 1);

        assert!(!store.contains(&first.key).unwrap());
        assert_eq!(store.record(&first).unwrap(), RecordOutcome::Inserted);
        assert_eq!(store.record(&first).unwrap(), RecordOutcome::AlreadyRecorded);
        assert!(store.contains(&first.key).unwrap());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn same_sequence_different_timestamp_is_distinct() {
        let store = InMemoryEventStore::new();
        let first = event(Uuid::new_v4(), 1);
        let mut reboot = first.clone();
        reboot.key.timestamp_ms = 5;

        store.record(&first).unwrap();
        assert_eq!(store.record(&reboot).unwrap(), RecordOutcome::Inserted);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn per_device_queries() {
        let store = InMemoryEventStore::new();
        let device = Uuid::new_v4();
        let other = Uuid::new_v4();
        for seq in [3, 1, 2] {
            store.record(&event(device, seq)).unwrap();
        }
        store.record(&event(other, 9)).unwrap();

        let seqs: Vec<u64> = store
            .events_for(device)
            .iter()
            .map(|e| e.key.sequence_number)
            .collect();
        assert_eq!(seqs, vec![1, 2, 3]);
        assert_eq!(store.last_sequence_number(device), Some(3));
        assert_eq!(store.last_sequence_number(Uuid::new_v4()), None);
    }

    #[test]
    fn concurrent_record_inserts_once() {
        let store = Arc::new(InMemoryEventStore::new());
        let shared = event(Uuid::new_v4(), 42);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let event = shared.clone();
                std::thread::spawn(move || store.record(&event).unwrap())
            })
            .collect();

        let inserted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|outcome| *outcome == RecordOutcome::Inserted)
            .count();
        assert_eq!(inserted, 1);
    }
}
