//! Idempotent ingestion of decoded device frames.
//!
//! Device identity and persistence are collaborators behind the
//! [`DeviceDirectory`] and [`EventStore`] traits; in-memory versions of
//! both are provided for tests and tooling. The [`IdempotencyGate`] turns a
//! retransmitted frame into [`GateDecision::Duplicate`] instead of a second
//! event, and [`IngestPipeline`] wires decode, gate, store, and router
//! together.

pub mod device;
pub mod error;
pub mod event;
pub mod gate;
pub mod pipeline;
pub mod store;

pub use device::{DeviceClaim, DeviceDirectory, DeviceIdentity, InMemoryDeviceDirectory};
pub use error::{DeviceError, IngestError, Result, StoreError};
pub use event::{IngestionKey, TelemetryEvent};
pub use gate::{GateConfig, GateDecision, IdempotencyGate, DEFAULT_RECENT_KEY_CAPACITY};
pub use pipeline::{FrameOutcome, IngestPipeline};
pub use store::{EventStore, InMemoryEventStore, RecordOutcome};
