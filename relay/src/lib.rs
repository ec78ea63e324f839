//! # USB ⇄ Wi-Fi Relay Core
//!
//! This crate provides the hand-off machinery for a dual-core USB network
//! adapter that forwards Ethernet frames between a USB host and a Wi-Fi
//! station link:
//!
//! - **Frame Relay**: one-frame-deep slot per direction with back-pressure
//! - **Link State**: radio up/down tracking and the canonical MAC address
//! - **Synchronization**: one-shot address rendezvous, slot locks, ms clock
//! - **Bootstrap**: interface registration and the USB MAC string descriptor
//!
//! ## Architecture
//!
//! ```text
//!            Core A (USB + IP stack)              Core B (Wi-Fi)
//!
//! USB OUT ──► deliver_from_usb ──► [outbound] ──► drain_outbound ──► radio
//!                                                                      │
//! USB IN  ◄── drain_inbound    ◄── [inbound]  ◄── deliver_from_wifi ◄──┘
//!
//!             wait_for_address ◄── AddressGate ◄── publish_address
//! ```
//!
//! ## Locking Discipline
//!
//! 1. The address gate is used once at startup and never again
//! 2. Each slot has its own blocking lock, held only to check, copy, hand off
//!    and clear
//! 3. The gate and the slot locks are never held at the same time
//! 4. Waiting on USB readiness happens outside the slot lock, bounded by a
//!    [`RetryPolicy`]

#![cfg_attr(not(feature = "std"), no_std)]

pub mod beacon;
pub mod bootstrap;
pub mod bridge;
pub mod clock;
pub mod config;
pub mod error;
pub mod frame;
pub mod link;
pub mod relay;
pub mod slot;
pub mod sync;
pub mod transport;
pub mod usb;
pub mod wifi;

// Re-export main types for convenience
pub use beacon::{Beacon, BeaconScheduler};
pub use bootstrap::{mac_string_descriptor, InterfaceConfig};
pub use bridge::Bridge;
pub use clock::{Clock, Millis, ReconnectTimer};
pub use config::{NetworkConfig, RelayConfig, StationConfig};
pub use error::RelayError;
pub use frame::{Frame, MacAddress};
pub use link::{LinkIndicator, LinkState};
pub use relay::{Admission, DrainOutcome, FrameRelay, LinkOutput, RelayStats, RetryPolicy};
pub use slot::RelaySlot;
pub use sync::{AddressGate, DefaultRawMutex, SharedSlot};
pub use transport::{Interface, LinkTransport, RadioControl, RadioError, RadioTransport};
pub use usb::UsbContext;
pub use wifi::WifiContext;

/// Library version reported in diagnostics beacons
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum Ethernet frame length accepted in either direction
pub const MTU: usize = 1500;
