//! The simulated dual-core device.
//!
//! Each core is an OS thread running its context loop against the shared
//! [`Bridge`]. The USB thread blocks on the address rendezvous exactly as
//! Core A does on hardware.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info};
use relay::clock::StdClock;
use relay::{Bridge, RelayStats, UsbContext, WifiContext};

use crate::config::HostConfig;
use crate::error::{HostError, HostResult};
use crate::sim::{LogIndicator, RadioEvent, SimRadio, SimUsb};

const WIFI_CORE: &str = "core-b-wifi";
const USB_CORE: &str = "core-a-usb";

/// Handle to the running core threads
pub struct Device {
    bridge: Arc<Bridge>,
    shutdown: Arc<AtomicBool>,
    cores: Vec<(&'static str, JoinHandle<HostResult<()>>)>,
}

impl Device {
    /// Start both cores
    pub fn spawn(config: &HostConfig, usb: SimUsb, radio: SimRadio) -> HostResult<Self> {
        let bridge: Arc<Bridge> = Arc::new(Bridge::new(config.relay.retry_policy()));
        let shutdown = Arc::new(AtomicBool::new(false));
        let pause = Duration::from_micros(config.simulation.poll_interval_us);

        let wifi = {
            let bridge = Arc::clone(&bridge);
            let shutdown = Arc::clone(&shutdown);
            let station = config.station.clone();
            let relay_config = config.relay;
            thread::Builder::new().name(WIFI_CORE.into()).spawn(move || -> HostResult<()> {
                let clock = StdClock::new();
                let mut ctx = WifiContext::boot(
                    &*bridge,
                    radio,
                    LogIndicator::default(),
                    clock,
                    station,
                    &relay_config,
                )?;

                while !shutdown.load(Ordering::Acquire) {
                    while let Some(event) = ctx.radio_mut().next_event() {
                        match event {
                            RadioEvent::LinkUp => ctx.on_link_up(),
                            RadioEvent::LinkDown => ctx.on_link_down(),
                            RadioEvent::Frame(itf, frame) => ctx.on_frame(itf, &frame),
                        }
                    }
                    ctx.poll();
                    thread::sleep(pause);
                }
                Ok(())
            })?
        };

        let usb_core = {
            let bridge = Arc::clone(&bridge);
            let shutdown = Arc::clone(&shutdown);
            let network = config.network.clone();
            thread::Builder::new().name(USB_CORE.into()).spawn(move || -> HostResult<()> {
                // Cancellable so a Wi-Fi core that never booted cannot hang
                // shutdown; on hardware the wait is unconditional
                let Some(mut ctx) = UsbContext::start_or_cancel(&*bridge, usb, &network, || {
                    shutdown.load(Ordering::Acquire)
                }) else {
                    return Ok(());
                };

                while !shutdown.load(Ordering::Acquire) {
                    ctx.poll();
                    while let Some(frame) = ctx.usb_mut().next_host_frame() {
                        if !ctx.on_receive(&frame) {
                            ctx.usb_mut().hold(frame);
                            break;
                        }
                    }
                    thread::sleep(pause);
                }
                Ok(())
            })
        };
        let usb_core = match usb_core {
            Ok(handle) => handle,
            Err(e) => {
                shutdown.store(true, Ordering::Release);
                if wifi.join().is_err() {
                    error!("{} panicked while stopping", WIFI_CORE);
                }
                return Err(e.into());
            }
        };

        info!("device started");
        Ok(Self {
            bridge,
            shutdown,
            cores: vec![(WIFI_CORE, wifi), (USB_CORE, usb_core)],
        })
    }

    pub fn bridge(&self) -> &Arc<Bridge> {
        &self.bridge
    }

    /// Stop both cores and return the final counters.
    ///
    /// Every core is joined; the first error or panic is reported.
    pub fn shutdown(self) -> HostResult<RelayStats> {
        self.shutdown.store(true, Ordering::Release);

        let mut first_error = None;
        for (name, core) in self.cores {
            let result = core
                .join()
                .unwrap_or_else(|_| Err(HostError::CorePanicked(name)));
            if let Err(e) = result {
                error!("{} stopped with error: {}", name, e);
                first_error.get_or_insert(e);
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        let stats = self.bridge.stats();
        info!("device stopped");
        Ok(stats)
    }
}
