//! Core A: the USB / IP-stack context.
//!
//! Start-up blocks on the Wi-Fi-ready gate so the interface and the USB
//! descriptors are built from the final hardware address. After that the
//! context services the USB class driver, accepts frames from the host and
//! drains the inbound slot towards it.

use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::Vec;
use log::{debug, info};

use crate::bootstrap::{mac_string_descriptor, InterfaceConfig, MAC_DESCRIPTOR_WORDS};
use crate::bridge::Bridge;
use crate::config::NetworkConfig;
use crate::frame::MacAddress;
use crate::relay::{Admission, DrainOutcome, LinkOutput};
use crate::sync::DefaultRawMutex;
use crate::transport::LinkTransport;

/// USB side of the relay
pub struct UsbContext<'a, L, M: RawMutex = DefaultRawMutex> {
    bridge: &'a Bridge<M>,
    usb: L,
    interface: InterfaceConfig,
    /// A host frame was refused and reception is paused
    receive_paused: bool,
}

impl<'a, L, M> UsbContext<'a, L, M>
where
    L: LinkTransport,
    M: RawMutex,
{
    /// Wait for the Wi-Fi context to publish the hardware address, then
    /// register the interface.
    pub fn start(bridge: &'a Bridge<M>, usb: L, network: &NetworkConfig) -> Self {
        let mac = bridge.link.wait_for_address();
        Self::with_address(bridge, usb, network, mac)
    }

    /// [`start`](Self::start) for hosts that must be able to abandon the
    /// wait; `None` if `cancelled` fired before the address was published.
    pub fn start_or_cancel(
        bridge: &'a Bridge<M>,
        usb: L,
        network: &NetworkConfig,
        cancelled: impl FnMut() -> bool,
    ) -> Option<Self> {
        let mac = bridge.link.wait_for_address_or_cancel(cancelled)?;
        Some(Self::with_address(bridge, usb, network, mac))
    }

    fn with_address(
        bridge: &'a Bridge<M>,
        usb: L,
        network: &NetworkConfig,
        mac: MacAddress,
    ) -> Self {
        let interface = InterfaceConfig::new(mac, network);
        info!(
            "usb interface {}{} up: {} / {} hwaddr {}",
            interface.name[0] as char,
            interface.name[1] as char,
            interface.address,
            interface.netmask,
            interface.hwaddr
        );

        Self {
            bridge,
            usb,
            interface,
            receive_paused: false,
        }
    }

    pub fn interface(&self) -> &InterfaceConfig {
        &self.interface
    }

    /// Contents of the MAC string descriptor
    pub fn mac_descriptor(&self) -> Vec<u16, MAC_DESCRIPTOR_WORDS> {
        mac_string_descriptor(self.interface.hwaddr)
    }

    /// USB class receive callback; false asks the driver to hold the frame
    pub fn on_receive(&mut self, frame: &[u8]) -> bool {
        match self.bridge.relay.deliver_from_usb(frame) {
            Admission::Accepted => true,
            Admission::Deferred => {
                self.receive_paused = true;
                false
            }
        }
    }

    /// USB class (re-)initialization callback
    pub fn on_network_init(&mut self) {
        let dropped = self.bridge.relay.reset();
        if dropped > 0 {
            debug!("network re-init dropped {} frame(s)", dropped);
        }
        // The outbound slot is now empty, so a paused receiver can resume
        if self.receive_paused {
            self.receive_paused = false;
            self.usb.renew_receive();
        }
    }

    /// Link-output hook for the local IP stack
    pub fn link_output(&mut self, frame: &[u8]) -> LinkOutput {
        self.bridge.relay.link_output(&mut self.usb, frame)
    }

    /// One pass of the USB loop
    pub fn poll(&mut self) -> DrainOutcome {
        self.usb.service();

        if self.receive_paused && !self.bridge.relay.outbound_pending() {
            self.receive_paused = false;
            self.usb.renew_receive();
        }

        self.bridge.relay.drain_inbound(&mut self.usb)
    }

    pub fn usb(&self) -> &L {
        &self.usb
    }

    pub fn usb_mut(&mut self) -> &mut L {
        &mut self.usb
    }

    pub fn bridge(&self) -> &'a Bridge<M> {
        self.bridge
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::RetryPolicy;
    use crate::transport::{Interface, RadioError, RadioTransport};
    use std::vec::Vec as StdVec;

    #[derive(Default)]
    struct FakeUsb {
        busy_checks: u32,
        services: u32,
        renewed: u32,
        transmitted: StdVec<StdVec<u8>>,
    }

    impl LinkTransport for FakeUsb {
        fn is_ready(&self) -> bool {
            true
        }

        fn can_transmit(&mut self, _len: usize) -> bool {
            if self.busy_checks > 0 {
                self.busy_checks -= 1;
                false
            } else {
                true
            }
        }

        fn transmit(&mut self, frame: &[u8]) {
            self.transmitted.push(frame.to_vec());
        }

        fn service(&mut self) {
            self.services += 1;
        }

        fn renew_receive(&mut self) {
            self.renewed += 1;
        }
    }

    struct NullRadio;

    impl RadioTransport for NullRadio {
        fn send(&mut self, _: Interface, _: &[u8], _: bool) -> Result<(), RadioError> {
            Ok(())
        }
    }

    fn started(bridge: &Bridge) -> UsbContext<'_, FakeUsb> {
        bridge
            .link
            .publish_address(MacAddress::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]))
            .unwrap();
        UsbContext::start(bridge, FakeUsb::default(), &NetworkConfig::default())
    }

    #[test]
    fn test_start_uses_published_address() {
        let bridge: Bridge = Bridge::new(RetryPolicy::new(4));
        let ctx = started(&bridge);

        assert_eq!(
            ctx.interface().hwaddr,
            MacAddress::new([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF])
        );
        assert_eq!(ctx.mac_descriptor()[1..].len(), 12);
    }

    #[test]
    fn test_receive_pauses_and_renews() {
        let bridge: Bridge = Bridge::new(RetryPolicy::new(4));
        let mut ctx = started(&bridge);

        assert!(ctx.on_receive(&[0x01; 60]));
        assert!(!ctx.on_receive(&[0x02; 60]));

        ctx.poll();
        assert_eq!(ctx.usb().renewed, 0);

        bridge.relay.drain_outbound(&mut NullRadio);
        ctx.poll();
        assert_eq!(ctx.usb().renewed, 1);

        ctx.poll();
        assert_eq!(ctx.usb().renewed, 1);
    }

    #[test]
    fn test_poll_delivers_inbound_frame() {
        let bridge: Bridge = Bridge::new(RetryPolicy::new(4));
        let mut ctx = started(&bridge);
        ctx.usb_mut().busy_checks = 2;

        bridge.relay.deliver_from_wifi(&[0x33; 120]);
        assert_eq!(ctx.poll(), DrainOutcome::Sent { len: 120 });
        assert_eq!(ctx.usb().transmitted, std::vec![std::vec![0x33; 120]]);
        // One service from the poll itself, two from the retries
        assert_eq!(ctx.usb().services, 3);
    }

    #[test]
    fn test_network_init_discards_stale_frames() {
        let bridge: Bridge = Bridge::new(RetryPolicy::new(4));
        let mut ctx = started(&bridge);

        assert!(ctx.on_receive(&[0x01; 60]));
        assert!(!ctx.on_receive(&[0x03; 60]));
        bridge.relay.deliver_from_wifi(&[0x02; 60]);
        ctx.on_network_init();

        assert!(!bridge.relay.outbound_pending());
        assert!(!bridge.relay.inbound_pending());
        assert_eq!(bridge.stats().stale_discarded, 2);
        assert_eq!(ctx.usb().renewed, 1);

        // Reception is live again and not renewed a second time
        assert!(ctx.on_receive(&[0x03; 60]));
        ctx.poll();
        assert_eq!(ctx.usb().renewed, 1);
    }

    #[test]
    fn test_start_or_cancel() {
        let bridge: Bridge = Bridge::default();
        let network = NetworkConfig::default();
        let abandoned = UsbContext::start_or_cancel(&bridge, FakeUsb::default(), &network, || true);
        assert!(abandoned.is_none());

        let mac = MacAddress::new([0x02, 0x11, 0x22, 0x33, 0x44, 0x55]);
        bridge.link.publish_address(mac).unwrap();
        let ctx = UsbContext::start_or_cancel(&bridge, FakeUsb::default(), &network, || true)
            .unwrap();
        assert_eq!(ctx.interface().hwaddr, mac);
    }

    #[test]
    fn test_network_init_without_pause_does_not_renew() {
        let bridge: Bridge = Bridge::new(RetryPolicy::new(4));
        let mut ctx = started(&bridge);

        ctx.on_network_init();
        assert_eq!(ctx.usb().renewed, 0);
    }

    #[test]
    fn test_link_output_reaches_usb() {
        let bridge: Bridge = Bridge::new(RetryPolicy::new(4));
        let mut ctx = started(&bridge);

        assert_eq!(ctx.link_output(&[0x45; 342]), LinkOutput::Sent);
        assert_eq!(ctx.usb().transmitted.len(), 1);
        assert_eq!(bridge.stats().link_output_frames, 1);
    }
}
