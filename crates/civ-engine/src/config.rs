//! Engine and serial link configuration

use std::time::Duration;

use civ_protocol::{RadioModel, CONTROLLER_ADDR};
use serde::{Deserialize, Serialize};

fn default_controller_address() -> u8 {
    CONTROLLER_ADDR
}

fn default_response_timeout_ms() -> u64 {
    500
}

/// Protocol engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Address the engine sends from and expects replies to
    #[serde(default = "default_controller_address")]
    pub controller_address: u8,

    /// How long to wait for each reply frame
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,

    /// Radio address, overriding the model's factory default
    pub address: Option<u8>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            controller_address: default_controller_address(),
            response_timeout_ms: default_response_timeout_ms(),
            address: None,
        }
    }
}

impl EngineConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    /// Radio address to use for `model`
    pub fn radio_address(&self, model: RadioModel) -> u8 {
        self.address.unwrap_or(model.info().default_address)
    }
}

/// Serial port settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Serial port path (e.g. "/dev/ttyUSB0" or "COM3")
    pub port: String,
    pub baud_rate: u32,
}

impl SerialConfig {
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
        }
    }

    /// Port settings using the model's factory default baud rate
    pub fn for_model(port: impl Into<String>, model: RadioModel) -> Self {
        Self::new(port, model.info().default_baud_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.controller_address, 0xE0);
        assert_eq!(config.response_timeout(), Duration::from_millis(500));
        assert_eq!(config.radio_address(RadioModel::Ic7300), 0x94);
    }

    #[test]
    fn address_override() {
        let config = EngineConfig {
            address: Some(0x76),
            ..Default::default()
        };
        assert_eq!(config.radio_address(RadioModel::Ic7300), 0x76);
    }

    #[test]
    fn deserialize_partial() {
        let config: EngineConfig = serde_json::from_str(r#"{"response_timeout_ms": 200}"#).unwrap();
        assert_eq!(config.response_timeout_ms, 200);
        assert_eq!(config.controller_address, 0xE0);
        assert_eq!(config.address, None);
    }

    #[test]
    fn serial_config_round_trip() {
        let config = SerialConfig::for_model("/dev/ttyUSB0", RadioModel::Ic7000);
        assert_eq!(config.baud_rate, 9600);

        let json = serde_json::to_string(&config).unwrap();
        let parsed: SerialConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
