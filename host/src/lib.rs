//! # Relay Host Simulator
//!
//! Runs the relay core on a workstation:
//!
//! - Two OS threads play Core A (USB + IP stack) and Core B (Wi-Fi)
//! - [`sim::SimUsb`] and [`sim::SimRadio`] stand in for the vendor stacks
//! - Diagnostics beacons go out over a real UDP socket
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────────────────────────────┐   ┌──────────────┐
//! │  HostPort    │   │               Device                  │   │     Air      │
//! │ (USB host)   │◄─►│  core-a-usb ◄─► Bridge ◄─► core-b-wifi │◄─►│ (AP / echo)  │
//! └──────────────┘   └───────────────────────────────────────┘   └──────────────┘
//!                                     │
//!                                     ▼
//!                             beacon (tokio UDP)
//! ```

pub mod beacon;
pub mod config;
pub mod device;
pub mod error;
pub mod sim;

pub use config::{HostConfig, SimulationConfig};
pub use device::Device;
pub use error::{HostError, HostResult};
