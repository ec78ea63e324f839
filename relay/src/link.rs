//! Link state tracking.
//!
//! The up/down flag is written only from the Wi-Fi context and read from
//! both. Transitions are idempotent: a repeated identical event changes
//! nothing and reports no transition, so observers such as the status LED
//! fire once per real change.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use log::info;

use crate::error::RelayResult;
use crate::frame::MacAddress;
use crate::sync::{AddressGate, DefaultRawMutex};

/// Observer for link transitions (typically the on-board LED)
pub trait LinkIndicator {
    fn show(&mut self, up: bool);
}

impl LinkIndicator for () {
    fn show(&mut self, _up: bool) {}
}

impl<T: LinkIndicator + ?Sized> LinkIndicator for &mut T {
    fn show(&mut self, up: bool) {
        (**self).show(up)
    }
}

/// Radio link state plus the device hardware address
pub struct LinkState<M: RawMutex = DefaultRawMutex> {
    up: Mutex<M, Cell<bool>>,
    address: AddressGate,
}

impl<M: RawMutex> LinkState<M> {
    pub const fn new() -> Self {
        Self {
            up: Mutex::new(Cell::new(false)),
            address: AddressGate::new(),
        }
    }

    /// Mark the link up. Returns true only if it was down.
    pub fn set_link_up(&self) -> bool {
        self.transition(true)
    }

    /// Mark the link down. Returns true only if it was up.
    pub fn set_link_down(&self) -> bool {
        self.transition(false)
    }

    fn transition(&self, up: bool) -> bool {
        self.up.lock(|state| {
            if state.get() == up {
                false
            } else {
                state.set(up);
                true
            }
        })
    }

    pub fn is_up(&self) -> bool {
        self.up.lock(|state| state.get())
    }

    /// Publish the boot-time hardware address (Wi-Fi context, once)
    pub fn publish_address(&self, mac: MacAddress) -> RelayResult<()> {
        self.address.publish(mac)?;
        info!("hardware address {} published", mac);
        Ok(())
    }

    /// The published address, or `None` before boot completes
    pub fn hardware_address(&self) -> Option<MacAddress> {
        self.address.try_get()
    }

    /// Block until the Wi-Fi context has published the address
    pub fn wait_for_address(&self) -> MacAddress {
        self.address.wait()
    }

    /// Block until the address is published or `cancelled` returns true
    pub fn wait_for_address_or_cancel(
        &self,
        cancelled: impl FnMut() -> bool,
    ) -> Option<MacAddress> {
        self.address.wait_or_cancel(cancelled)
    }
}

impl<M: RawMutex> Default for LinkState<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_down() {
        let link: LinkState = LinkState::new();
        assert!(!link.is_up());
        assert_eq!(link.hardware_address(), None);
    }

    #[test]
    fn test_transitions_are_idempotent() {
        let link: LinkState = LinkState::new();
        assert!(link.set_link_up());
        assert!(!link.set_link_up());
        assert!(link.is_up());

        assert!(link.set_link_down());
        assert!(!link.set_link_down());
        assert!(!link.is_up());
    }

    #[test]
    fn test_address_is_stable() {
        let link: LinkState = LinkState::new();
        let mac = MacAddress::new([0x28, 0xCD, 0xC1, 0x00, 0x12, 0x34]);
        link.publish_address(mac).unwrap();
        assert!(link.publish_address(MacAddress::BROADCAST).is_err());

        assert_eq!(link.hardware_address(), Some(mac));
        assert_eq!(link.wait_for_address(), mac);
    }
}
