//! UDP sender for the diagnostics beacon.

use std::net::{SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use relay::beacon::{BEACON_MAX_LEN, BEACON_PORT, BEACON_TARGET};
use relay::clock::{Clock, StdClock};
use relay::{BeaconScheduler, Bridge};
use tokio::net::UdpSocket;

use crate::error::HostResult;

/// Broadcast target derived from the device constants
pub fn default_target() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(BEACON_TARGET.0.into(), BEACON_PORT))
}

/// Send a beacon every `interval_ms` until the task is dropped.
///
/// Nothing is sent before the hardware address is published. Send
/// failures are logged and skipped; only socket setup errors end the task.
pub async fn run(
    bridge: Arc<Bridge>,
    bind: &str,
    target: SocketAddr,
    interval_ms: u32,
) -> HostResult<()> {
    let socket = UdpSocket::bind(bind).await?;
    socket.set_broadcast(true)?;

    let clock = StdClock::new();
    let mut scheduler = BeaconScheduler::new(interval_ms);
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.into()));

    loop {
        ticker.tick().await;

        let Some(hwaddr) = bridge.link.hardware_address() else {
            continue;
        };
        let Some(beacon) =
            scheduler.poll(clock.now(), bridge.link.is_up(), hwaddr, bridge.stats())
        else {
            continue;
        };

        let mut buffer = [0u8; BEACON_MAX_LEN];
        let payload = beacon.encode(&mut buffer)?;
        match socket.send_to(payload, target).await {
            Ok(_) => debug!("beacon #{} sent ({} bytes)", beacon.sequence, payload.len()),
            Err(e) => warn!("beacon #{} not sent: {}", beacon.sequence, e),
        }
    }
}
