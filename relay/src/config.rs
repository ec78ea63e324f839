//! Static device configuration.
//!
//! Everything here is fixed at build time on the device; hosted builds can
//! override it from a JSON file (see the `relay-host` crate). Defaults
//! match the shipped firmware.

use core::fmt;

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, RelayResult};
use crate::relay::RetryPolicy;

/// Maximum number of DHCP leases offered to the USB host
pub const MAX_LEASES: usize = 8;

/// An IPv4 address in network byte order
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ipv4Address(pub [u8; 4]);

impl Ipv4Address {
    pub const UNSPECIFIED: Ipv4Address = Ipv4Address([0; 4]);
    pub const BROADCAST: Ipv4Address = Ipv4Address([255; 4]);

    pub const fn new(a: u8, b: u8, c: u8, d: u8) -> Self {
        Self([a, b, c, d])
    }

    pub const fn to_bits(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    /// Both addresses fall inside the network selected by `mask`
    pub const fn same_subnet(self, other: Ipv4Address, mask: Ipv4Address) -> bool {
        self.to_bits() & mask.to_bits() == other.to_bits() & mask.to_bits()
    }
}

impl fmt::Display for Ipv4Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

impl fmt::Debug for Ipv4Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// One address the DHCP server may hand to the USB host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DhcpLease {
    pub address: Ipv4Address,
    /// Lease duration in seconds
    pub lease_secs: u32,
}

/// DHCP server settings for the USB-side network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct DhcpConfig {
    pub port: u16,
    /// Advertised router, unspecified for none
    pub router: Ipv4Address,
    /// Advertised DNS server, unspecified for none
    pub dns: Ipv4Address,
    pub leases: Vec<DhcpLease, MAX_LEASES>,
}

impl Default for DhcpConfig {
    fn default() -> Self {
        let mut leases = Vec::new();
        for host in 2..=4 {
            // Capacity is MAX_LEASES, three always fit
            let _ = leases.push(DhcpLease {
                address: Ipv4Address::new(192, 168, 7, host),
                lease_secs: 24 * 60 * 60,
            });
        }
        Self {
            port: 67,
            router: Ipv4Address::UNSPECIFIED,
            dns: Ipv4Address::UNSPECIFIED,
            leases,
        }
    }
}

/// Addressing of the device on the USB-side network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct NetworkConfig {
    pub address: Ipv4Address,
    pub netmask: Ipv4Address,
    pub gateway: Ipv4Address,
    pub dhcp: DhcpConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            address: Ipv4Address::new(192, 168, 7, 1),
            netmask: Ipv4Address::new(255, 255, 255, 0),
            gateway: Ipv4Address::UNSPECIFIED,
            dhcp: DhcpConfig::default(),
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> RelayResult<()> {
        let mask = self.netmask.to_bits();
        if mask.leading_ones() + mask.trailing_zeros() != 32 {
            return Err(RelayError::InvalidConfig("netmask is not contiguous"));
        }
        if self.dhcp.leases.is_empty() {
            return Err(RelayError::InvalidConfig("no DHCP leases configured"));
        }
        for lease in &self.dhcp.leases {
            if lease.address == self.address {
                return Err(RelayError::InvalidConfig("lease collides with device address"));
            }
            if !lease.address.same_subnet(self.address, self.netmask) {
                return Err(RelayError::InvalidConfig("lease outside device subnet"));
            }
            if lease.lease_secs == 0 {
                return Err(RelayError::InvalidConfig("zero lease duration"));
            }
        }
        Ok(())
    }
}

/// Wi-Fi authentication mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AuthMode {
    Open,
    #[default]
    Wpa2AesPsk,
    Wpa3Sae,
}

/// Station credentials handed to the radio on every connect attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct StationConfig {
    pub ssid: String<32>,
    pub passphrase: String<64>,
    pub auth: AuthMode,
    /// ISO 3166 alpha-2 regulatory domain
    pub country: [u8; 2],
}

impl Default for StationConfig {
    fn default() -> Self {
        Self {
            ssid: String::new(),
            passphrase: String::new(),
            auth: AuthMode::default(),
            country: *b"IN",
        }
    }
}

impl StationConfig {
    pub fn validate(&self) -> RelayResult<()> {
        if self.ssid.is_empty() {
            return Err(RelayError::InvalidConfig("empty SSID"));
        }
        let len = self.passphrase.len();
        match self.auth {
            AuthMode::Open if len != 0 => {
                Err(RelayError::InvalidConfig("open network with passphrase"))
            }
            AuthMode::Wpa2AesPsk | AuthMode::Wpa3Sae if !(8..=63).contains(&len) => {
                Err(RelayError::InvalidConfig("passphrase must be 8..=63 characters"))
            }
            _ => Ok(()),
        }
    }
}

/// Relay timing and retry knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct RelayConfig {
    /// USB readiness checks per inbound drain or link-output call
    pub usb_max_attempts: u32,
    /// Delay between association attempts while the link is down
    pub reconnect_interval_ms: u32,
    /// Diagnostics beacon period
    pub beacon_interval_ms: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            usb_max_attempts: RetryPolicy::DEFAULT_MAX_ATTEMPTS,
            reconnect_interval_ms: 10_000,
            beacon_interval_ms: 1_000,
        }
    }
}

impl RelayConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.usb_max_attempts)
    }

    pub fn validate(&self) -> RelayResult<()> {
        if self.usb_max_attempts == 0 {
            return Err(RelayError::InvalidConfig("usb_max_attempts must be positive"));
        }
        if self.reconnect_interval_ms == 0 || self.beacon_interval_ms == 0 {
            return Err(RelayError::InvalidConfig("intervals must be positive"));
        }
        // Deadlines compare by signed distance
        if self.reconnect_interval_ms > i32::MAX as u32 || self.beacon_interval_ms > i32::MAX as u32
        {
            return Err(RelayError::InvalidConfig("interval exceeds clock range"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_defaults() {
        let net = NetworkConfig::default();
        assert_eq!(net.address, Ipv4Address::new(192, 168, 7, 1));
        assert_eq!(net.netmask, Ipv4Address::new(255, 255, 255, 0));
        assert_eq!(net.dhcp.port, 67);
        assert_eq!(net.dhcp.leases.len(), 3);
        assert_eq!(net.dhcp.leases[0].lease_secs, 86_400);
        assert!(net.validate().is_ok());
    }

    #[test]
    fn test_network_rejects_foreign_lease() {
        let mut net = NetworkConfig::default();
        net.dhcp.leases[1].address = Ipv4Address::new(10, 0, 0, 2);
        assert!(matches!(net.validate(), Err(RelayError::InvalidConfig(_))));
    }

    #[test]
    fn test_network_rejects_split_mask() {
        let net = NetworkConfig {
            netmask: Ipv4Address::new(255, 0, 255, 0),
            ..Default::default()
        };
        assert!(net.validate().is_err());
    }

    #[test]
    fn test_station_validation() {
        let mut station = StationConfig::default();
        assert!(station.validate().is_err());

        station.ssid = String::try_from("lab-ap").unwrap();
        station.passphrase = String::try_from("short").unwrap();
        assert!(station.validate().is_err());

        station.passphrase = String::try_from("correct horse").unwrap();
        assert!(station.validate().is_ok());
    }

    #[test]
    fn test_relay_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.reconnect_interval_ms, 10_000);
        assert_eq!(config.beacon_interval_ms, 1_000);
        assert_eq!(config.retry_policy().max_attempts, RetryPolicy::DEFAULT_MAX_ATTEMPTS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ipv4_display() {
        assert_eq!(std::format!("{}", Ipv4Address::new(192, 168, 7, 1)), "192.168.7.1");
    }
}
