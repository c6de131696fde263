//! In-process pub/sub routing of device telemetry to named channels.
//!
//! A [`Router`] owns a registry of [`Channel`]s. Each channel keeps an
//! ordered subscriber list and a bounded history of recent [`Message`]s.
//! Publishing fans a message out synchronously to every subscriber; a
//! failing subscriber is logged and never affects the others.

pub mod channel;
pub mod config;
pub mod error;
pub mod message;
pub mod router;
pub mod topology;
mod validator;

pub use channel::{
    create_device_channel, create_insight_channel, create_sensor_aggregate_channel, Channel,
    ChannelKind, MessageFormat, DEFAULT_BUFFER_SIZE,
};
pub use config::{RouterConfig, DEFAULT_MAX_BUFFER_SIZE};
pub use error::{Result, RouterError};
pub use message::{now_millis, Message, DEFAULT_TTL_SECONDS};
pub use router::{subscriber, Router, Subscriber, SubscriberResult};
pub use topology::{default_channels, register_default_channels};
