//! Simulated USB class driver and Wi-Fi radio.
//!
//! Both ends are wired to unbounded tokio channels so tests and the demo
//! binary can play the USB host PC and the access point:
//!
//! ```text
//!   HostPort.to_device ──► SimUsb ──► (Core A) ──► SimRadio ──► Air.uplink
//! HostPort.from_device ◄── SimUsb ◄── (Core A) ◄── SimRadio ◄── Air.downlink
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, trace};
use relay::config::StationConfig;
use relay::frame::MAC_LEN;
use relay::{
    Interface, LinkIndicator, LinkTransport, MacAddress, RadioControl, RadioError,
    RadioTransport, MTU,
};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

/// MAC used by the simulated USB host
pub const HOST_MAC: MacAddress = MacAddress::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);

/// EtherType for local experiments (IEEE 802 local use)
const PROBE_ETHERTYPE: [u8; 2] = [0x88, 0xB5];

/// The USB host PC's end of the simulated cable
pub struct HostPort {
    pub to_device: UnboundedSender<Vec<u8>>,
    pub from_device: UnboundedReceiver<Vec<u8>>,
    /// Host has enumerated and configured the device
    pub configured: Arc<AtomicBool>,
}

/// Simulated USB network class driver
pub struct SimUsb {
    from_host: UnboundedReceiver<Vec<u8>>,
    to_host: UnboundedSender<Vec<u8>>,
    configured: Arc<AtomicBool>,
    /// Frame refused by the relay, redelivered once reception is renewed
    held: Option<Vec<u8>>,
    receive_paused: bool,
    /// Transfer queued but not yet completed by `service`
    in_flight: Option<Vec<u8>>,
}

impl SimUsb {
    /// A configured USB link and the host side of it
    pub fn pair() -> (SimUsb, HostPort) {
        let (to_device, from_host) = unbounded_channel();
        let (to_host, from_device) = unbounded_channel();
        let configured = Arc::new(AtomicBool::new(true));

        let usb = SimUsb {
            from_host,
            to_host,
            configured: Arc::clone(&configured),
            held: None,
            receive_paused: false,
            in_flight: None,
        };
        let port = HostPort {
            to_device,
            from_device,
            configured,
        };
        (usb, port)
    }

    /// Next frame from the host, unless reception is paused
    pub fn next_host_frame(&mut self) -> Option<Vec<u8>> {
        if self.receive_paused {
            return None;
        }
        self.held.take().or_else(|| self.from_host.try_recv().ok())
    }

    /// Keep a refused frame and pause reception until renewed
    pub fn hold(&mut self, frame: Vec<u8>) {
        self.held = Some(frame);
        self.receive_paused = true;
    }
}

impl LinkTransport for SimUsb {
    fn is_ready(&self) -> bool {
        self.configured.load(Ordering::Acquire)
    }

    fn can_transmit(&mut self, len: usize) -> bool {
        self.in_flight.is_none() && len <= MTU
    }

    fn transmit(&mut self, frame: &[u8]) {
        self.in_flight = Some(frame.to_vec());
    }

    fn service(&mut self) {
        if let Some(frame) = self.in_flight.take() {
            // Host gone: nothing left to deliver to
            let _ = self.to_host.send(frame);
        }
    }

    fn renew_receive(&mut self) {
        trace!("usb reception renewed");
        self.receive_paused = false;
    }
}

/// Events the radio driver raises towards the Wi-Fi context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioEvent {
    LinkUp,
    LinkDown,
    Frame(Interface, Vec<u8>),
}

/// The access point's end of the simulated air interface
pub struct Air {
    /// Frames the device transmitted
    pub uplink: UnboundedReceiver<Vec<u8>>,
    /// Frames to be received by the device
    pub downlink: UnboundedSender<Vec<u8>>,
    /// The access point is reachable; clearing it drops association
    pub in_range: Arc<AtomicBool>,
}

/// Simulated Wi-Fi radio
pub struct SimRadio {
    address: Option<MacAddress>,
    associated: bool,
    events: VecDeque<RadioEvent>,
    uplink: UnboundedSender<Vec<u8>>,
    downlink: UnboundedReceiver<Vec<u8>>,
    in_range: Arc<AtomicBool>,
}

impl SimRadio {
    pub fn new(address: Option<MacAddress>) -> (SimRadio, Air) {
        let (uplink_tx, uplink_rx) = unbounded_channel();
        let (downlink_tx, downlink_rx) = unbounded_channel();
        let in_range = Arc::new(AtomicBool::new(true));

        let radio = SimRadio {
            address,
            associated: false,
            events: VecDeque::new(),
            uplink: uplink_tx,
            downlink: downlink_rx,
            in_range: Arc::clone(&in_range),
        };
        let air = Air {
            uplink: uplink_rx,
            downlink: downlink_tx,
            in_range,
        };
        (radio, air)
    }

    pub fn is_associated(&self) -> bool {
        self.associated
    }

    /// Next driver event, as the real driver would deliver by callback
    pub fn next_event(&mut self) -> Option<RadioEvent> {
        if self.associated && !self.in_range.load(Ordering::Acquire) {
            self.associated = false;
            self.events.push_back(RadioEvent::LinkDown);
        }
        if let Some(event) = self.events.pop_front() {
            return Some(event);
        }
        if !self.associated {
            return None;
        }
        self.downlink
            .try_recv()
            .ok()
            .map(|frame| RadioEvent::Frame(Interface::Station, frame))
    }
}

impl RadioTransport for SimRadio {
    fn send(&mut self, interface: Interface, frame: &[u8], broadcast: bool) -> Result<(), RadioError> {
        if interface != Interface::Station || !self.associated {
            return Err(RadioError::NotAssociated);
        }
        trace!("radio tx {} bytes (broadcast: {})", frame.len(), broadcast);
        self.uplink
            .send(frame.to_vec())
            .map_err(|_| RadioError::Driver(-1))
    }
}

impl RadioControl for SimRadio {
    fn permanent_address(&mut self) -> Option<MacAddress> {
        self.address
    }

    fn connect(&mut self, station: &StationConfig) -> Result<(), RadioError> {
        if self.associated {
            return Ok(());
        }
        if self.in_range.load(Ordering::Acquire) {
            debug!("associated with {}", station.ssid);
            self.associated = true;
            self.events.push_back(RadioEvent::LinkUp);
        } else {
            debug!("{} not in range", station.ssid);
        }
        Ok(())
    }
}

/// Stand-in for the on-board LED
#[derive(Debug, Default)]
pub struct LogIndicator {
    pub lit: bool,
}

impl LinkIndicator for LogIndicator {
    fn show(&mut self, up: bool) {
        self.lit = up;
        info!("link LED {}", if up { "on" } else { "off" });
    }
}

/// Broadcast probe from the simulated host carrying a sequence number
pub fn probe_frame(sequence: u32) -> Vec<u8> {
    let mut frame = Vec::with_capacity(64);
    frame.extend_from_slice(&MacAddress::BROADCAST.octets());
    frame.extend_from_slice(&HOST_MAC.octets());
    frame.extend_from_slice(&PROBE_ETHERTYPE);
    frame.extend_from_slice(&sequence.to_be_bytes());
    frame.resize(64, 0);
    frame
}

/// Sequence number of a probe built by [`probe_frame`]
pub fn probe_sequence(frame: &[u8]) -> Option<u32> {
    let body = frame.get(2 * MAC_LEN + 2..2 * MAC_LEN + 6)?;
    Some(u32::from_be_bytes(body.try_into().ok()?))
}

/// Swap source and destination so a frame can be sent back where it
/// came from
pub fn reflect(frame: &mut [u8]) {
    if frame.len() >= 2 * MAC_LEN {
        let (dst, rest) = frame.split_at_mut(MAC_LEN);
        dst.swap_with_slice(&mut rest[..MAC_LEN]);
    }
}
