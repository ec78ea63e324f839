//! Host configuration loaded from JSON.
//!
//! Every field is optional; anything missing falls back to the device
//! defaults from `relay::config`.
//!
//! ```json
//! {
//!   "station": { "ssid": "lab-ap", "passphrase": "correct horse" },
//!   "relay": { "usb_max_attempts": 32 },
//!   "simulation": { "run_for_ms": 5000 }
//! }
//! ```

use std::fs;
use std::path::Path;

use log::info;
use relay::config::StationConfig;
use relay::{MacAddress, NetworkConfig, RelayConfig};
use serde::{Deserialize, Serialize};

use crate::error::HostResult;

/// Knobs for the simulated collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Address the simulated radio reports; `None` exercises the
    /// placeholder fallback
    pub radio_address: Option<MacAddress>,
    /// Sleep between loop passes on each core thread
    pub poll_interval_us: u64,
    /// Stop after this long; run until Ctrl-C when absent
    pub run_for_ms: Option<u64>,
    /// Send diagnostics beacons over UDP
    pub beacon_enabled: bool,
    /// Local address for the beacon socket
    pub beacon_bind: String,
    /// Reflect every uplink frame back through the radio
    pub echo_access_point: bool,
    /// Period of the probe frames sent by the simulated USB host
    pub host_frame_interval_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            radio_address: Some(MacAddress::new([0x28, 0xCD, 0xC1, 0x00, 0x00, 0x01])),
            poll_interval_us: 200,
            run_for_ms: None,
            beacon_enabled: true,
            beacon_bind: "0.0.0.0:0".to_string(),
            echo_access_point: true,
            host_frame_interval_ms: 500,
        }
    }
}

/// Complete host configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub network: NetworkConfig,
    pub station: StationConfig,
    pub relay: RelayConfig,
    pub simulation: SimulationConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        let mut station = StationConfig::default();
        // Fixed literals well inside the string capacities
        let _ = station.ssid.push_str("relay-sim");
        let _ = station.passphrase.push_str("simulated-psk");

        Self {
            network: NetworkConfig::default(),
            station,
            relay: RelayConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl HostConfig {
    /// Read and validate a JSON config file
    pub fn load(path: &Path) -> HostResult<Self> {
        let text = fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> HostResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> HostResult<()> {
        self.network.validate()?;
        self.station.validate()?;
        self.relay.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostError;
    use relay::RelayError;

    #[test]
    fn test_default_config_is_valid() {
        let config = HostConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.station.ssid.as_str(), "relay-sim");
        assert_eq!(config.relay.reconnect_interval_ms, 10_000);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = HostConfig::from_json(
            r#"{
                "station": { "ssid": "lab-ap", "passphrase": "correct horse" },
                "relay": { "usb_max_attempts": 32 },
                "simulation": { "run_for_ms": 1500, "radio_address": null }
            }"#,
        )
        .unwrap();

        assert_eq!(config.station.ssid.as_str(), "lab-ap");
        assert_eq!(config.relay.usb_max_attempts, 32);
        assert_eq!(config.relay.beacon_interval_ms, 1_000);
        assert_eq!(config.simulation.run_for_ms, Some(1500));
        assert_eq!(config.simulation.radio_address, None);
        assert_eq!(config.network, NetworkConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = HostConfig::from_json(r#"{ "relay": { "usb_max_attempts": 0 } }"#);
        assert!(matches!(
            result,
            Err(HostError::Relay(RelayError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            HostConfig::from_json("{ not json"),
            Err(HostError::Json(_))
        ));
    }
}
