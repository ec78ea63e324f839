//! # Link and Radio Transport Abstractions
//!
//! The relay sits between two vendor stacks that call into it and expose
//! transmit primitives. These traits capture exactly what the relay uses:
//!
//! - [`LinkTransport`]: the USB network class (RNDIS/ECM) on Core A
//! - [`RadioTransport`] / [`RadioControl`]: the Wi-Fi driver on Core B
//!
//! ## Design Rationale
//!
//! 1. **Testability**: fakes drive the relay deterministically
//! 2. **Asymmetry**: USB transmit is cooperative (caller may service the
//!    stack and retry), radio transmit is a single opportunistic attempt

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::StationConfig;
use crate::frame::MacAddress;

/// Radio interface a frame belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Interface {
    /// Station link towards the access point; the only relayed interface
    Station,
    /// Soft-AP interface; frames seen here are not relayed
    AccessPoint,
}

/// Errors reported by the radio driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioError {
    /// No association with an access point
    #[error("not associated")]
    NotAssociated,
    /// Radio busy; no transmit buffer available
    #[error("radio busy")]
    Busy,
    /// Driver-specific status code
    #[error("driver status {0}")]
    Driver(i32),
}

/// USB network class boundary
pub trait LinkTransport {
    /// The device is enumerated and configured by the host
    fn is_ready(&self) -> bool;

    /// The class driver can accept a frame of `len` bytes right now
    fn can_transmit(&mut self, len: usize) -> bool;

    /// Queue a frame towards the host. Only valid after `can_transmit`
    /// returned true for the same length.
    fn transmit(&mut self, frame: &[u8]);

    /// Run pending USB work (the stack's task-service entry point)
    fn service(&mut self);

    /// Re-arm reception after a delivery was refused
    fn renew_receive(&mut self);
}

/// Wi-Fi raw frame transmit boundary
pub trait RadioTransport {
    /// Single non-blocking send attempt
    fn send(
        &mut self,
        interface: Interface,
        frame: &[u8],
        broadcast: bool,
    ) -> Result<(), RadioError>;
}

/// Wi-Fi bring-up and association requests issued by the Wi-Fi context
pub trait RadioControl {
    /// Factory-programmed address, if the radio exposes one
    fn permanent_address(&mut self) -> Option<MacAddress>;

    /// Start an asynchronous association; completion is reported through
    /// the link-up callback
    fn connect(&mut self, station: &StationConfig) -> Result<(), RadioError>;
}

impl<T: LinkTransport + ?Sized> LinkTransport for &mut T {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn can_transmit(&mut self, len: usize) -> bool {
        (**self).can_transmit(len)
    }

    fn transmit(&mut self, frame: &[u8]) {
        (**self).transmit(frame)
    }

    fn service(&mut self) {
        (**self).service()
    }

    fn renew_receive(&mut self) {
        (**self).renew_receive()
    }
}

impl<T: RadioTransport + ?Sized> RadioTransport for &mut T {
    fn send(
        &mut self,
        interface: Interface,
        frame: &[u8],
        broadcast: bool,
    ) -> Result<(), RadioError> {
        (**self).send(interface, frame, broadcast)
    }
}
