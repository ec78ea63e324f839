//! Address bootstrapping for the USB/IP side.
//!
//! Both consumers of the hardware address, the IP stack interface and the
//! USB MAC string descriptor, build from the same [`MacAddress`] obtained
//! through the Wi-Fi-ready gate.

use heapless::Vec;

use crate::config::{Ipv4Address, NetworkConfig};
use crate::frame::{MacAddress, MAC_LEN};
use crate::MTU;

/// String descriptor index the host queries for the adapter's MAC
pub const MAC_STRING_INDEX: u8 = 5;

/// USB descriptor type code for strings
const DESC_TYPE_STRING: u16 = 0x03;

/// Header word plus two UTF-16 hex digits per address byte
pub const MAC_DESCRIPTOR_WORDS: usize = 1 + 2 * MAC_LEN;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Interface capability flags registered with the IP stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterfaceFlags {
    pub broadcast: bool,
    pub etharp: bool,
    pub link_up: bool,
    pub up: bool,
}

impl InterfaceFlags {
    /// Flags for the USB Ethernet interface: the host side is always
    /// considered connected once enumerated
    pub const USB_ETHERNET: InterfaceFlags = InterfaceFlags {
        broadcast: true,
        etharp: true,
        link_up: true,
        up: true,
    };
}

/// Everything the IP stack needs to register the USB interface
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterfaceConfig {
    pub name: [u8; 2],
    pub hwaddr: MacAddress,
    pub mtu: u16,
    pub flags: InterfaceFlags,
    pub address: Ipv4Address,
    pub netmask: Ipv4Address,
    pub gateway: Ipv4Address,
}

impl InterfaceConfig {
    pub fn new(hwaddr: MacAddress, network: &NetworkConfig) -> Self {
        Self {
            name: *b"EX",
            hwaddr,
            mtu: MTU as u16,
            flags: InterfaceFlags::USB_ETHERNET,
            address: network.address,
            netmask: network.netmask,
            gateway: network.gateway,
        }
    }

    pub fn is_up(&self) -> bool {
        self.flags.up && self.flags.link_up
    }
}

/// Encode `mac` as the USB string descriptor returned for
/// [`MAC_STRING_INDEX`].
///
/// The first word packs the descriptor type (high byte) and total length
/// in bytes (low byte); the rest are upper-case hex digits as UTF-16.
pub fn mac_string_descriptor(mac: MacAddress) -> Vec<u16, MAC_DESCRIPTOR_WORDS> {
    let mut words = Vec::new();
    let byte_len = (2 * MAC_DESCRIPTOR_WORDS) as u16;

    // Capacity is exact; pushes cannot fail
    let _ = words.push((DESC_TYPE_STRING << 8) | byte_len);
    for byte in mac.octets() {
        let _ = words.push(HEX_DIGITS[(byte >> 4) as usize] as u16);
        let _ = words.push(HEX_DIGITS[(byte & 0x0F) as usize] as u16);
    }
    words
}
