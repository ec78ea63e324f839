//! The state shared between the two cores.
//!
//! Firmware places one `Bridge` in a `static`; each core then builds its
//! own context around a shared reference:
//!
//! ```ignore
//! static BRIDGE: Bridge = Bridge::new(RetryPolicy::new(64));
//!
//! // Core B
//! let mut wifi = WifiContext::boot(&BRIDGE, radio, led, clock, station, &config)?;
//! // Core A
//! let mut usb = UsbContext::start(&BRIDGE, usb_class, &network);
//! ```

use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::link::LinkState;
use crate::relay::{FrameRelay, RelayStats, RetryPolicy};
use crate::sync::DefaultRawMutex;

/// Link state and frame relay, owned together for the device lifetime
pub struct Bridge<M: RawMutex = DefaultRawMutex> {
    pub link: LinkState<M>,
    pub relay: FrameRelay<M>,
}

impl<M: RawMutex> Bridge<M> {
    pub const fn new(retry: RetryPolicy) -> Self {
        Self {
            link: LinkState::new(),
            relay: FrameRelay::new(retry),
        }
    }

    pub fn stats(&self) -> RelayStats {
        self.relay.stats()
    }
}

impl<M: RawMutex> Default for Bridge<M> {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
