//! `relay-sim`: run the relay with a simulated USB host and access point.
//!
//! Usage: `relay-sim [config.json]`. Log level comes from `RUST_LOG`
//! (default `info`). Final counters are printed as JSON on exit.

use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use log::{error, info, warn};
use relay_host::sim::{self, Air, HostPort, SimRadio, SimUsb};
use relay_host::{beacon, Device, HostConfig, HostError, HostResult};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> HostResult<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => HostConfig::load(Path::new(&path))?,
        None => HostConfig::default(),
    };
    info!("relay-sim {}", relay::VERSION);

    let (usb, host) = SimUsb::pair();
    let (radio, air) = SimRadio::new(config.simulation.radio_address);
    let device = Device::spawn(&config, usb, radio)?;

    let mut tasks = Vec::new();
    if config.simulation.beacon_enabled {
        let bridge = device.bridge().clone();
        let bind = config.simulation.beacon_bind.clone();
        let interval = config.relay.beacon_interval_ms;
        tasks.push(tokio::spawn(async move {
            if let Err(e) = beacon::run(bridge, &bind, beacon::default_target(), interval).await {
                warn!("beacon stopped: {}", e);
            }
        }));
    }
    tasks.push(tokio::spawn(access_point(air, config.simulation.echo_access_point)));
    tasks.push(tokio::spawn(usb_host(
        host,
        config.simulation.host_frame_interval_ms,
    )));

    match config.simulation.run_for_ms {
        Some(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
        None => {
            tokio::signal::ctrl_c().await?;
            info!("interrupted");
        }
    }

    for task in &tasks {
        task.abort();
    }
    let stats = tokio::task::spawn_blocking(move || device.shutdown())
        .await
        .map_err(|_| HostError::CorePanicked("shutdown"))??;

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

/// Simulated access point: log uplink traffic and optionally reflect it
async fn access_point(mut air: Air, echo: bool) {
    while let Some(mut frame) = air.uplink.recv().await {
        info!(
            "air: {} bytes from device (probe {:?})",
            frame.len(),
            sim::probe_sequence(&frame)
        );
        if echo {
            sim::reflect(&mut frame);
            if air.downlink.send(frame).is_err() {
                break;
            }
        }
    }
}

/// Simulated USB host: send numbered probes and log what comes back
async fn usb_host(mut host: HostPort, interval_ms: u64) {
    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
    let mut sequence = 0u32;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if host.to_device.send(sim::probe_frame(sequence)).is_err() {
                    break;
                }
                sequence = sequence.wrapping_add(1);
            }
            received = host.from_device.recv() => match received {
                Some(frame) => info!(
                    "host: {} bytes from device (probe {:?})",
                    frame.len(),
                    sim::probe_sequence(&frame)
                ),
                None => break,
            },
        }
    }
}
