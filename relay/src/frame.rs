//! # Ethernet Frames and Hardware Addresses
//!
//! A [`Frame`] is a bounds-checked copy of a single Ethernet frame, stored
//! inline in a fixed-capacity buffer so a relay slot never allocates.
//!
//! ```text
//! ┌───────────────┬───────────────┬───────────┬─────────────────────┐
//! │  Destination  │    Source     │ EtherType │       Payload       │
//! │    6 bytes    │    6 bytes    │  2 bytes  │   up to MTU total   │
//! └───────────────┴───────────────┴───────────┴─────────────────────┘
//! ```

use core::fmt;

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, RelayResult};
use crate::MTU;

/// Length of an Ethernet hardware address
pub const MAC_LEN: usize = 6;

/// A 6-byte Ethernet hardware address
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MacAddress([u8; MAC_LEN]);

impl MacAddress {
    /// Fallback used when the radio cannot report its permanent address.
    /// The first byte `0x02` marks it as locally administered.
    pub const LINK_LOCAL_PLACEHOLDER: MacAddress =
        MacAddress([0x02, 0x02, 0x84, 0x6A, 0x96, 0x00]);

    /// All-ones broadcast address
    pub const BROADCAST: MacAddress = MacAddress([0xFF; MAC_LEN]);

    pub const fn new(octets: [u8; MAC_LEN]) -> Self {
        Self(octets)
    }

    pub const fn octets(&self) -> [u8; MAC_LEN] {
        self.0
    }

    /// Group bit set: multicast or broadcast destination
    pub const fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    pub const fn is_locally_administered(&self) -> bool {
        self.0[0] & 0x02 != 0
    }
}

impl From<[u8; MAC_LEN]> for MacAddress {
    fn from(octets: [u8; MAC_LEN]) -> Self {
        Self(octets)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddress({self})")
    }
}

/// A single Ethernet frame of 1..=MTU bytes
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8, MTU>,
}

impl Frame {
    /// Copy `src` into a new frame.
    ///
    /// The length is checked before any byte is copied, so an oversized
    /// source never touches the buffer.
    pub fn copy_from(src: &[u8]) -> RelayResult<Self> {
        if src.is_empty() {
            return Err(RelayError::EmptyFrame);
        }
        if src.len() > MTU {
            return Err(RelayError::Oversized {
                len: src.len(),
                mtu: MTU,
            });
        }

        let mut bytes = Vec::new();
        bytes
            .extend_from_slice(src)
            .map_err(|_| RelayError::Oversized {
                len: src.len(),
                mtu: MTU,
            })?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the frame holds no bytes. `copy_from` never builds one.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Destination address, if the frame carries a full header
    pub fn destination(&self) -> Option<MacAddress> {
        let dst: [u8; MAC_LEN] = self.bytes.get(..MAC_LEN)?.try_into().ok()?;
        Some(MacAddress(dst))
    }

    /// Source address, if the frame carries a full header
    pub fn source(&self) -> Option<MacAddress> {
        let src: [u8; MAC_LEN] = self.bytes.get(MAC_LEN..2 * MAC_LEN)?.try_into().ok()?;
        Some(MacAddress(src))
    }

    /// Whether the radio should send this as a group-addressed frame
    pub fn is_broadcast(&self) -> bool {
        self.destination().is_some_and(|dst| dst.is_multicast())
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("len", &self.len())
            .field("destination", &self.destination())
            .finish()
    }
}
