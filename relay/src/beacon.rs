//! # Diagnostics Beacon
//!
//! A small status datagram broadcast periodically so the device can be
//! located and checked without a debug probe. Messages are serialized with
//! `postcard` and must fit a single 127-byte payload.
//!
//! ## Wire Format
//!
//! ```text
//! ┌──────────┬───────────┬─────────┬─────────┬────────────────────┐
//! │ sequence │ uptime_ms │ link_up │ hwaddr  │    RelayStats      │
//! │ varint   │ varint    │ 1 byte  │ 6 bytes │ 12 varints         │
//! └──────────┴───────────┴─────────┴─────────┴────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::clock::Millis;
use crate::config::Ipv4Address;
use crate::error::{RelayError, RelayResult};
use crate::frame::MacAddress;
use crate::relay::RelayStats;

/// UDP port the beacon is sent to
pub const BEACON_PORT: u16 = 4444;

/// Largest encoded beacon
pub const BEACON_MAX_LEN: usize = 127;

/// Beacons go to the limited broadcast address
pub const BEACON_TARGET: Ipv4Address = Ipv4Address::BROADCAST;

/// One status report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Beacon {
    pub sequence: u32,
    pub uptime_ms: u32,
    pub link_up: bool,
    pub hwaddr: MacAddress,
    pub stats: RelayStats,
}

impl Beacon {
    /// Serialize into `buffer`, returning the used prefix
    pub fn encode<'a>(&self, buffer: &'a mut [u8; BEACON_MAX_LEN]) -> RelayResult<&'a [u8]> {
        let used: &'a [u8] =
            postcard::to_slice(self, buffer).map_err(|_| RelayError::Encoding)?;
        Ok(used)
    }

    pub fn decode(data: &[u8]) -> RelayResult<Self> {
        postcard::from_bytes(data).map_err(|_| RelayError::Encoding)
    }
}

/// Decides when the next beacon is due and numbers them
#[derive(Debug, Clone)]
pub struct BeaconScheduler {
    interval_ms: u32,
    next_due: Option<Millis>,
    sequence: u32,
}

impl BeaconScheduler {
    pub const fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            next_due: None,
            sequence: 0,
        }
    }

    /// Build a beacon if one is due at `now`. The first poll always
    /// produces one.
    pub fn poll(
        &mut self,
        now: Millis,
        link_up: bool,
        hwaddr: MacAddress,
        stats: RelayStats,
    ) -> Option<Beacon> {
        if let Some(due) = self.next_due {
            if !now.reached(due) {
                return None;
            }
        }
        // Next deadline follows the schedule, not the poll time; resync
        // after a whole missed period
        let next = match self.next_due {
            Some(due) => due.offset(self.interval_ms),
            None => now.offset(self.interval_ms),
        };
        self.next_due = Some(if now.reached(next) {
            now.offset(self.interval_ms)
        } else {
            next
        });

        let beacon = Beacon {
            sequence: self.sequence,
            uptime_ms: now.0,
            link_up,
            hwaddr,
            stats,
        };
        self.sequence = self.sequence.wrapping_add(1);
        Some(beacon)
    }
}
