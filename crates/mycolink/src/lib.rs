//! Framed device telemetry, idempotent ingestion, and channel pub/sub.
//!
//! # Crate Structure
//!
//! - [`frame`]: COBS/CRC16 frame envelope, stream reassembly, command payloads
//! - [`router`]: Channel registry and synchronous pub/sub fan-out
//! - [`ingest`]: Idempotency gate and the decode → store → publish pipeline

/// Re-export frame types.
pub mod frame {
    pub use mycolink_frame::*;
}

/// Re-export router types.
pub mod router {
    pub use mycolink_router::*;
}

/// Re-export ingest types.
pub mod ingest {
    pub use mycolink_ingest::*;
}
