//! Outbound command descriptors carried in `COMMAND` frame payloads.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::codec::Frame;
use crate::message_type::MessageType;

/// Lower bound for the telemetry interval, in milliseconds.
pub const MIN_INTERVAL_MS: u64 = 100;

/// Upper bound for the telemetry interval, in milliseconds (one hour).
pub const MAX_INTERVAL_MS: u64 = 3_600_000;

/// Default radio spreading factor.
pub const DEFAULT_SPREADING_FACTOR: u8 = 7;

/// Default radio bandwidth in kHz.
pub const DEFAULT_BANDWIDTH_KHZ: f64 = 125.0;

/// Firmware slot on a dual-image device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Side {
    #[default]
    A,
    B,
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            _ => Err(format!("unknown side: {s} (expected A or B)")),
        }
    }
}

/// A command payload, serialized as a JSON object tagged by `cmd`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Drive a named actuator on or off.
    Mosfet { target: String, state: bool },
    /// Change how often telemetry is emitted.
    SetInterval { interval_ms: u64 },
    /// Ask the device to enumerate its sensor bus.
    I2cScan,
    /// Restart one firmware side.
    Reboot { side: Side },
    /// Fetch and apply a firmware image.
    OtaUpdate { url: String, side: Side },
    /// Reconfigure the radio.
    LoraConfig {
        frequency_mhz: f64,
        sf: u8,
        bw_khz: f64,
    },
}

impl Command {
    /// Set a named actuator to a boolean state.
    pub fn set_actuator(target: impl Into<String>, state: bool) -> Self {
        Self::Mosfet {
            target: target.into(),
            state,
        }
    }

    /// Set a numbered MOSFET output (`M1`, `M2`, ...).
    pub fn set_mosfet(number: u8, state: bool) -> Self {
        Self::set_actuator(format!("M{number}"), state)
    }

    /// Set the telemetry interval, clamped to `[MIN_INTERVAL_MS, MAX_INTERVAL_MS]`.
    pub fn set_telemetry_interval(interval_ms: u64) -> Self {
        Self::SetInterval {
            interval_ms: interval_ms.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS),
        }
    }

    pub fn request_i2c_scan() -> Self {
        Self::I2cScan
    }

    pub fn reboot(side: Side) -> Self {
        Self::Reboot { side }
    }

    pub fn firmware_update(url: impl Into<String>, side: Side) -> Self {
        Self::OtaUpdate {
            url: url.into(),
            side,
        }
    }

    /// Radio configuration with optional spreading factor and bandwidth.
    pub fn set_lora_config(
        frequency_mhz: f64,
        spreading_factor: Option<u8>,
        bandwidth_khz: Option<f64>,
    ) -> Self {
        Self::LoraConfig {
            frequency_mhz,
            sf: spreading_factor.unwrap_or(DEFAULT_SPREADING_FACTOR),
            bw_khz: bandwidth_khz.unwrap_or(DEFAULT_BANDWIDTH_KHZ),
        }
    }

    /// Compact JSON encoding of this command.
    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Wrap this command in a `COMMAND` frame envelope.
    pub fn to_frame(&self, sequence_number: u64, timestamp_ms: u64) -> serde_json::Result<Frame> {
        Ok(Frame::new(
            MessageType::Command,
            sequence_number,
            timestamp_ms,
            Bytes::from(self.to_payload()?),
        ))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::codec::decode_frame;

    fn as_json(command: &Command) -> serde_json::Value {
        serde_json::to_value(command).unwrap()
    }

    #[test]
    fn actuator_shape() {
        assert_eq!(
            as_json(&Command::set_mosfet(2, true)),
            json!({"cmd": "mosfet", "target": "M2", "state": true})
        );
    }

    #[test]
    fn interval_is_clamped() {
        assert_eq!(
            Command::set_telemetry_interval(5),
            Command::SetInterval { interval_ms: 100 }
        );
        assert_eq!(
            Command::set_telemetry_interval(10_000_000),
            Command::SetInterval {
                interval_ms: 3_600_000
            }
        );
        assert_eq!(
            as_json(&Command::set_telemetry_interval(5000)),
            json!({"cmd": "set_interval", "interval_ms": 5000})
        );
    }

    #[test]
    fn scan_reboot_and_ota_shapes() {
        assert_eq!(
            as_json(&Command::request_i2c_scan()),
            json!({"cmd": "i2c_scan"})
        );
        assert_eq!(
            as_json(&Command::reboot(Side::B)),
            json!({"cmd": "reboot", "side": "B"})
        );
        assert_eq!(
            as_json(&Command::firmware_update("https://fw.example/a.bin", Side::A)),
            json!({"cmd": "ota_update", "url": "https://fw.example/a.bin", "side": "A"})
        );
    }

    #[test]
    fn lora_defaults() {
        assert_eq!(
            as_json(&Command::set_lora_config(915.0, None, None)),
            json!({"cmd": "lora_config", "frequency_mhz": 915.0, "sf": 7, "bw_khz": 125.0})
        );
    }

    #[test]
    fn side_parses_case_insensitively() {
        assert_eq!("b".parse::<Side>(), Ok(Side::B));
        assert_eq!(" A ".parse::<Side>(), Ok(Side::A));
        assert!("c".parse::<Side>().is_err());
    }

    #[test]
    fn command_frames_like_telemetry() {
        let frame = Command::reboot(Side::A).to_frame(11, 22).unwrap();
        let decoded = decode_frame(&frame.encode()).unwrap();
        assert_eq!(decoded.message_type, MessageType::Command);
        let back: Command = serde_json::from_slice(&decoded.payload).unwrap();
        assert_eq!(back, Command::reboot(Side::A));
    }
}
