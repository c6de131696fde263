//! The standard channel topology.

use crate::channel::{Channel, ChannelKind};
use crate::config::RouterConfig;
use crate::router::Router;

pub const ENVIRONMENTAL: &str = "aggregate.environmental";
pub const SUBSTRATE: &str = "aggregate.substrate";
pub const DEVICE_STATUS: &str = "system.device_status";
pub const ALERTS: &str = "system.alerts";
pub const GROWTH_PREDICTION: &str = "insight.growth_prediction";
pub const CONTAMINATION_RISK: &str = "insight.contamination_risk";

/// Definitions of the six default channels.
pub fn default_channels() -> Vec<Channel> {
    vec![
        Channel::new(ENVIRONMENTAL, ChannelKind::Aggregate).with_description(
            "All environmental sensor readings (temperature, humidity, pressure)",
        ),
        Channel::new(SUBSTRATE, ChannelKind::Aggregate)
            .with_description("Substrate and growing medium sensor readings"),
        Channel::new(DEVICE_STATUS, ChannelKind::Device)
            .with_description("Device online/offline status changes"),
        Channel::new(ALERTS, ChannelKind::Computed)
            .with_description("System alerts and threshold violations"),
        Channel::new(GROWTH_PREDICTION, ChannelKind::Computed)
            .with_description("ML-based growth rate predictions"),
        Channel::new(CONTAMINATION_RISK, ChannelKind::Computed)
            .with_description("Contamination risk assessments"),
    ]
}

/// Register the default channels on `router`.
///
/// Registration is an upsert, so repeated calls do not reset history.
pub fn register_default_channels(router: &Router) {
    for channel in default_channels() {
        router.register_channel(channel);
    }
    tracing::debug!("registered default channel topology");
}

impl Router {
    /// Router with default config and the default channels registered.
    pub fn with_default_channels() -> Self {
        Self::with_default_channels_and_config(RouterConfig::default())
    }

    /// Router with explicit config and the default channels registered.
    pub fn with_default_channels_and_config(config: RouterConfig) -> Self {
        let router = Self::with_config(config);
        register_default_channels(&router);
        router
    }
}
