//! Core B: the Wi-Fi context.
//!
//! Owns the radio, the status indicator and the reconnect timer. The radio
//! driver's callbacks land on [`WifiContext::on_link_up`],
//! [`WifiContext::on_link_down`] and [`WifiContext::on_frame`]; the main
//! loop calls [`WifiContext::poll`] as often as it can.

use embassy_sync::blocking_mutex::raw::RawMutex;
use log::{debug, info, warn};

use crate::bridge::Bridge;
use crate::clock::{Clock, ReconnectTimer};
use crate::config::{RelayConfig, StationConfig};
use crate::error::RelayResult;
use crate::frame::MacAddress;
use crate::link::LinkIndicator;
use crate::relay::DrainOutcome;
use crate::sync::DefaultRawMutex;
use crate::transport::{Interface, RadioControl, RadioTransport};

/// Wi-Fi side of the relay
pub struct WifiContext<'a, R, I, C, M: RawMutex = DefaultRawMutex> {
    bridge: &'a Bridge<M>,
    radio: R,
    indicator: I,
    clock: C,
    station: StationConfig,
    reconnect: ReconnectTimer,
}

impl<'a, R, I, C, M> WifiContext<'a, R, I, C, M>
where
    R: RadioTransport + RadioControl,
    I: LinkIndicator,
    C: Clock,
    M: RawMutex,
{
    /// Bring the radio side up and open the Wi-Fi-ready gate.
    ///
    /// Uses the radio's permanent address, falling back to
    /// [`MacAddress::LINK_LOCAL_PLACEHOLDER`]. Fails only if an address was
    /// already published.
    pub fn boot(
        bridge: &'a Bridge<M>,
        mut radio: R,
        mut indicator: I,
        clock: C,
        station: StationConfig,
        config: &RelayConfig,
    ) -> RelayResult<Self> {
        let mac = radio.permanent_address().unwrap_or_else(|| {
            warn!("radio has no permanent address, using placeholder");
            MacAddress::LINK_LOCAL_PLACEHOLDER
        });
        bridge.link.publish_address(mac)?;
        indicator.show(bridge.link.is_up());

        Ok(Self {
            bridge,
            radio,
            indicator,
            clock,
            station,
            reconnect: ReconnectTimer::new(config.reconnect_interval_ms),
        })
    }

    /// Association completed
    pub fn on_link_up(&mut self) {
        if self.bridge.link.set_link_up() {
            info!("wifi link up");
            self.indicator.show(true);
        }
    }

    /// Association lost
    pub fn on_link_down(&mut self) {
        if self.bridge.link.set_link_down() {
            info!("wifi link down");
            self.indicator.show(false);
        }
    }

    /// Raw frame received by the radio
    pub fn on_frame(&self, interface: Interface, frame: &[u8]) {
        if interface != Interface::Station {
            debug!("ignoring {} byte frame on {:?}", frame.len(), interface);
            return;
        }
        self.bridge.relay.deliver_from_wifi(frame);
    }

    /// One pass of the Wi-Fi loop: reconnect if due, then push the
    /// outbound frame to the radio
    pub fn poll(&mut self) -> DrainOutcome {
        let now = self.clock.now();
        if self.reconnect.poll(now, self.bridge.link.is_up()) {
            match self.radio.connect(&self.station) {
                Ok(()) => debug!("association attempt started"),
                Err(e) => warn!("association attempt failed: {}", e),
            }
        }
        self.bridge.relay.drain_outbound(&mut self.radio)
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn bridge(&self) -> &'a Bridge<M> {
        self.bridge
    }
}
