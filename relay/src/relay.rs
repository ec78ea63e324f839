//! # Frame Relay
//!
//! Moves single Ethernet frames between the USB network class and the
//! Wi-Fi radio through one slot per direction.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          FrameRelay                             │
//! │                                                                 │
//! │  USB rx ──► deliver_from_usb ──► [ outbound ] ──► drain_outbound│──► radio
//! │             (Deferred if full)                   (drop on error)│
//! │                                                                 │
//! │  USB tx ◄── drain_inbound    ◄── [ inbound  ] ◄── deliver_from_ │◄── radio
//! │             (bounded retry,       (newest wins)   wifi          │
//! │              never drops)                                       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Delivery Policy
//!
//! - USB → Wi-Fi: back-pressure while the slot is full; a failed radio
//!   send drops the frame after one attempt
//! - Wi-Fi → USB: oversized frames are discarded; a waiting frame is
//!   replaced by a newer one; USB transmit is retried, never dropped

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::frame::Frame;
use crate::sync::{DefaultRawMutex, SharedSlot};
use crate::transport::{Interface, LinkTransport, RadioError, RadioTransport};
use crate::MTU;

/// Answer to the USB receive callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[must_use]
pub enum Admission {
    /// The frame was consumed (stored, or dropped by policy)
    Accepted,
    /// The outbound slot is full; the USB stack must hold the frame
    Deferred,
}

impl Admission {
    pub fn is_accepted(self) -> bool {
        matches!(self, Admission::Accepted)
    }
}

/// Result of one drain pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DrainOutcome {
    /// Nothing was waiting
    Idle,
    /// Frame handed to the destination transmit primitive
    Sent { len: usize },
    /// Radio refused the frame; it was discarded
    Dropped { len: usize, reason: RadioError },
    /// USB stayed busy for the whole attempt budget; frame kept
    Deferred { attempts: u32 },
}

/// Status returned to the IP stack's link-output hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkOutput {
    Sent,
    /// Transient; the IP stack should retry later
    TryLater,
    /// USB not configured by the host
    Unavailable,
    /// Frame longer than the MTU
    Oversized,
}

/// Bounded retry budget for USB-bound transmits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RetryPolicy {
    /// Readiness checks before giving up for this pass (at least 1)
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 64;

    pub const fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS)
    }
}

/// Relay counters. All counters wrap.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RelayStats {
    /// Frames accepted from USB into the outbound slot
    pub usb_rx_frames: u32,
    /// Frames handed to the radio
    pub wifi_tx_frames: u32,
    /// Frames the radio refused (dropped)
    pub wifi_tx_dropped: u32,
    /// Frames received from the radio into the inbound slot
    pub wifi_rx_frames: u32,
    /// Frames handed to USB from the inbound slot
    pub usb_tx_frames: u32,
    /// Frames discarded for exceeding the MTU (either direction)
    pub oversized_dropped: u32,
    /// Inbound frames replaced by a newer one before USB took them
    pub inbound_replaced: u32,
    /// USB deliveries refused because the outbound slot was full
    pub usb_backpressure: u32,
    /// Inbound drain passes that ran out of attempts
    pub usb_deferred: u32,
    /// Inbound drain passes skipped because USB was not configured
    pub usb_not_ready: u32,
    /// Frames discarded on USB network re-initialization
    pub stale_discarded: u32,
    /// Frames sent to USB by the local IP stack
    pub link_output_frames: u32,
}

impl RelayStats {
    pub const fn new() -> Self {
        Self {
            usb_rx_frames: 0,
            wifi_tx_frames: 0,
            wifi_tx_dropped: 0,
            wifi_rx_frames: 0,
            usb_tx_frames: 0,
            oversized_dropped: 0,
            inbound_replaced: 0,
            usb_backpressure: 0,
            usb_deferred: 0,
            usb_not_ready: 0,
            stale_discarded: 0,
            link_output_frames: 0,
        }
    }
}

#[inline]
fn bump(counter: &mut u32) {
    *counter = counter.wrapping_add(1);
}

/// Single-frame relay between USB and Wi-Fi
pub struct FrameRelay<M: RawMutex = DefaultRawMutex> {
    /// USB → Wi-Fi
    outbound: SharedSlot<M>,
    /// Wi-Fi → USB
    inbound: SharedSlot<M>,
    stats: Mutex<M, Cell<RelayStats>>,
    retry: RetryPolicy,
}

impl<M: RawMutex> FrameRelay<M> {
    pub const fn new(retry: RetryPolicy) -> Self {
        Self {
            outbound: SharedSlot::new(),
            inbound: SharedSlot::new(),
            stats: Mutex::new(Cell::new(RelayStats::new())),
            retry,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Snapshot of the counters
    pub fn stats(&self) -> RelayStats {
        self.stats.lock(|s| s.get())
    }

    fn record(&self, f: impl FnOnce(&mut RelayStats)) {
        self.stats.lock(|cell| {
            let mut stats = cell.get();
            f(&mut stats);
            cell.set(stats);
        });
    }

    pub fn outbound_pending(&self) -> bool {
        self.outbound.is_occupied()
    }

    pub fn inbound_pending(&self) -> bool {
        self.inbound.is_occupied()
    }

    /// USB receive callback.
    ///
    /// Returns [`Admission::Deferred`] while the outbound slot is full so
    /// the USB stack withholds the next frame. Empty and oversized
    /// deliveries are consumed without being stored.
    pub fn deliver_from_usb(&self, bytes: &[u8]) -> Admission {
        if bytes.is_empty() {
            return Admission::Accepted;
        }
        if bytes.len() > MTU {
            debug!("dropping oversized USB frame ({} bytes)", bytes.len());
            self.record(|s| bump(&mut s.oversized_dropped));
            return Admission::Accepted;
        }

        let admission = self.outbound.with(|slot| {
            if slot.is_occupied() {
                return Admission::Deferred;
            }
            match Frame::copy_from(bytes) {
                Ok(frame) => {
                    // Checked empty above; cannot fail
                    let _ = slot.fill(frame);
                    Admission::Accepted
                }
                Err(_) => Admission::Accepted,
            }
        });

        match admission {
            Admission::Accepted => self.record(|s| bump(&mut s.usb_rx_frames)),
            Admission::Deferred => self.record(|s| bump(&mut s.usb_backpressure)),
        }
        admission
    }

    /// Hand the outbound frame to the radio, then clear the slot.
    ///
    /// The send is a single attempt made under the slot lock; `radio`
    /// must not block. Call from the Wi-Fi context.
    pub fn drain_outbound<R: RadioTransport>(&self, radio: &mut R) -> DrainOutcome {
        let outcome = self.outbound.with(|slot| {
            let outcome = match slot.peek() {
                None => return DrainOutcome::Idle,
                Some(frame) => {
                    let len = frame.len();
                    match radio.send(Interface::Station, frame.as_bytes(), frame.is_broadcast()) {
                        Ok(()) => DrainOutcome::Sent { len },
                        Err(reason) => DrainOutcome::Dropped { len, reason },
                    }
                }
            };
            slot.clear();
            outcome
        });

        match outcome {
            DrainOutcome::Sent { .. } => self.record(|s| bump(&mut s.wifi_tx_frames)),
            DrainOutcome::Dropped { len, reason } => {
                debug!("radio dropped {} byte frame: {}", len, reason);
                self.record(|s| bump(&mut s.wifi_tx_dropped));
            }
            DrainOutcome::Idle | DrainOutcome::Deferred { .. } => {}
        }
        outcome
    }

    /// Wi-Fi frame-received callback.
    ///
    /// Oversized frames are discarded. A frame still waiting for USB is
    /// replaced by this one.
    pub fn deliver_from_wifi(&self, bytes: &[u8]) {
        let frame = match Frame::copy_from(bytes) {
            Ok(frame) => frame,
            Err(crate::RelayError::Oversized { len, .. }) => {
                debug!("dropping oversized radio frame ({} bytes)", len);
                self.record(|s| bump(&mut s.oversized_dropped));
                return;
            }
            Err(_) => return,
        };

        let replaced = self.inbound.with(|slot| slot.replace(frame)).is_some();
        self.record(|s| {
            bump(&mut s.wifi_rx_frames);
            if replaced {
                bump(&mut s.inbound_replaced);
            }
        });
    }

    /// Hand the inbound frame to USB.
    ///
    /// Readiness is polled outside the slot lock; between polls the USB
    /// stack is serviced so it can complete the previous transfer. If USB
    /// stays busy for the whole [`RetryPolicy`] budget the frame is kept
    /// for the next pass.
    pub fn drain_inbound<L: LinkTransport>(&self, usb: &mut L) -> DrainOutcome {
        if self.inbound.pending_len().is_none() {
            return DrainOutcome::Idle;
        }
        if !usb.is_ready() {
            self.record(|s| bump(&mut s.usb_not_ready));
            return DrainOutcome::Deferred { attempts: 0 };
        }

        for _ in 0..self.retry.max_attempts {
            // The Wi-Fi context may have replaced the frame meanwhile
            let Some(len) = self.inbound.pending_len() else {
                return DrainOutcome::Idle;
            };

            if usb.can_transmit(len) {
                let sent = self.inbound.with(|slot| {
                    if slot.len() != Some(len) {
                        return false;
                    }
                    match slot.take() {
                        Some(frame) => {
                            usb.transmit(frame.as_bytes());
                            true
                        }
                        None => false,
                    }
                });
                if sent {
                    self.record(|s| bump(&mut s.usb_tx_frames));
                    return DrainOutcome::Sent { len };
                }
                continue;
            }

            usb.service();
        }

        let attempts = self.retry.max_attempts;
        warn!("USB busy after {} attempts, keeping inbound frame", attempts);
        self.record(|s| bump(&mut s.usb_deferred));
        DrainOutcome::Deferred { attempts }
    }

    /// Link-output hook for frames originated by the local IP stack
    /// (DHCP replies and the like). Bypasses the slots.
    pub fn link_output<L: LinkTransport>(&self, usb: &mut L, frame: &[u8]) -> LinkOutput {
        if frame.len() > MTU {
            self.record(|s| bump(&mut s.oversized_dropped));
            return LinkOutput::Oversized;
        }
        if !usb.is_ready() {
            return LinkOutput::Unavailable;
        }

        for _ in 0..self.retry.max_attempts {
            if usb.can_transmit(frame.len()) {
                usb.transmit(frame);
                self.record(|s| bump(&mut s.link_output_frames));
                return LinkOutput::Sent;
            }
            usb.service();
        }
        LinkOutput::TryLater
    }

    /// Discard anything buffered in either direction.
    ///
    /// Called when the USB network class re-initializes; returns how many
    /// frames were dropped.
    pub fn reset(&self) -> u32 {
        let dropped = self.outbound.with(|slot| slot.clear()) as u32
            + self.inbound.with(|slot| slot.clear()) as u32;
        if dropped > 0 {
            debug!("discarded {} stale frame(s) on re-init", dropped);
            self.record(|s| s.stale_discarded = s.stale_discarded.wrapping_add(dropped));
        }
        dropped
    }
}

impl<M: RawMutex> Default for FrameRelay<M> {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    #[derive(Default)]
    struct FakeRadio {
        sent: Vec<(Vec<u8>, bool)>,
        fail_with: Option<RadioError>,
    }

    impl RadioTransport for FakeRadio {
        fn send(
            &mut self,
            interface: Interface,
            frame: &[u8],
            broadcast: bool,
        ) -> Result<(), RadioError> {
            assert_eq!(interface, Interface::Station);
            if let Some(err) = self.fail_with {
                return Err(err);
            }
            self.sent.push((frame.to_vec(), broadcast));
            Ok(())
        }
    }

    /// USB fake that reports busy for a scripted number of checks
    #[derive(Default)]
    struct FakeUsb {
        not_ready: bool,
        busy_checks: u32,
        checks: u32,
        services: u32,
        transmitted: Vec<Vec<u8>>,
        renewed: u32,
    }

    impl LinkTransport for FakeUsb {
        fn is_ready(&self) -> bool {
            !self.not_ready
        }

        fn can_transmit(&mut self, _len: usize) -> bool {
            self.checks += 1;
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

    fn relay() -> FrameRelay {
        FrameRelay::new(RetryPolicy::new(8))
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_usb_to_wifi_exact_bytes() {
        for len in [1, 14, 60, 512, MTU] {
            let relay = relay();
            let mut radio = FakeRadio::default();
            let raw = pattern(len);

            assert_eq!(relay.deliver_from_usb(&raw), Admission::Accepted);
            assert_eq!(relay.drain_outbound(&mut radio), DrainOutcome::Sent { len });

            assert_eq!(radio.sent.len(), 1);
            assert_eq!(radio.sent[0].0, raw);
            assert!(!relay.outbound_pending());
        }
    }

    #[test]
    fn test_usb_backpressure_keeps_first_frame() {
        let relay = relay();
        let mut radio = FakeRadio::default();
        let first = pattern(100);

        assert_eq!(relay.deliver_from_usb(&first), Admission::Accepted);
        assert_eq!(relay.deliver_from_usb(&[0xEE; 200]), Admission::Deferred);

        relay.drain_outbound(&mut radio);
        assert_eq!(radio.sent[0].0, first);
        assert_eq!(relay.stats().usb_backpressure, 1);

        assert_eq!(relay.deliver_from_usb(&[0xEE; 200]), Admission::Accepted);
    }

    #[test]
    fn test_drop_on_radio_failure() {
        let relay = relay();
        let mut radio = FakeRadio {
            fail_with: Some(RadioError::NotAssociated),
            ..Default::default()
        };

        assert!(relay.deliver_from_usb(&pattern(MTU)).is_accepted());
        assert_eq!(
            relay.drain_outbound(&mut radio),
            DrainOutcome::Dropped {
                len: MTU,
                reason: RadioError::NotAssociated
            }
        );
        assert_eq!(relay.stats().wifi_tx_dropped, 1);
        assert!(!relay.outbound_pending());
        assert!(radio.sent.is_empty());
    }

    #[test]
    fn test_broadcast_flag_follows_destination() {
        let relay = relay();
        let mut radio = FakeRadio::default();
        let mut raw = pattern(60);
        raw[..6].copy_from_slice(&[0xFF; 6]);

        assert!(relay.deliver_from_usb(&raw).is_accepted());
        relay.drain_outbound(&mut radio);
        assert!(radio.sent[0].1);
    }

    #[test]
    fn test_oversized_wifi_frame_never_reaches_usb() {
        let relay = relay();
        let mut usb = FakeUsb::default();

        relay.deliver_from_wifi(&pattern(MTU + 1));
        assert!(!relay.inbound_pending());
        assert_eq!(relay.drain_inbound(&mut usb), DrainOutcome::Idle);
        assert!(usb.transmitted.is_empty());
        assert_eq!(relay.stats().oversized_dropped, 1);
    }

    #[test]
    fn test_oversized_usb_delivery_is_consumed() {
        let relay = relay();
        assert_eq!(relay.deliver_from_usb(&pattern(MTU + 1)), Admission::Accepted);
        assert!(!relay.outbound_pending());
        assert_eq!(relay.stats().oversized_dropped, 1);
    }

    #[test]
    fn test_empty_usb_delivery_is_accepted() {
        let relay = relay();
        assert_eq!(relay.deliver_from_usb(&[]), Admission::Accepted);
        assert!(!relay.outbound_pending());
        assert_eq!(relay.stats().usb_rx_frames, 0);
    }

    #[test]
    fn test_inbound_retries_until_usb_ready() {
        let relay = relay();
        let mut usb = FakeUsb {
            busy_checks: 3,
            ..Default::default()
        };
        let raw = pattern(300);

        relay.deliver_from_wifi(&raw);
        assert_eq!(relay.drain_inbound(&mut usb), DrainOutcome::Sent { len: 300 });

        assert_eq!(usb.checks, 4);
        assert_eq!(usb.services, 3);
        assert_eq!(usb.transmitted, std::vec![raw]);
        assert!(!relay.inbound_pending());
    }

    #[test]
    fn test_inbound_kept_when_budget_exhausted() {
        let relay = relay();
        let mut usb = FakeUsb {
            busy_checks: 100,
            ..Default::default()
        };

        relay.deliver_from_wifi(&pattern(64));
        assert_eq!(
            relay.drain_inbound(&mut usb),
            DrainOutcome::Deferred { attempts: 8 }
        );
        assert!(relay.inbound_pending());
        assert_eq!(usb.checks, 8);

        usb.busy_checks = 0;
        assert_eq!(relay.drain_inbound(&mut usb), DrainOutcome::Sent { len: 64 });
        assert_eq!(relay.stats().usb_deferred, 1);
    }

    #[test]
    fn test_inbound_deferred_while_usb_unconfigured() {
        let relay = relay();
        let mut usb = FakeUsb {
            not_ready: true,
            ..Default::default()
        };

        relay.deliver_from_wifi(&pattern(64));
        assert_eq!(
            relay.drain_inbound(&mut usb),
            DrainOutcome::Deferred { attempts: 0 }
        );
        assert_eq!(usb.checks, 0);
        assert!(relay.inbound_pending());

        for _ in 0..10 {
            relay.drain_inbound(&mut usb);
        }
        let stats = relay.stats();
        assert_eq!(stats.usb_not_ready, 11);
        assert_eq!(stats.usb_deferred, 0);
    }

    #[test]
    fn test_newest_wifi_frame_wins() {
        let relay = relay();
        let mut usb = FakeUsb::default();

        relay.deliver_from_wifi(&[0x01; 60]);
        relay.deliver_from_wifi(&[0x02; 70]);
        relay.drain_inbound(&mut usb);

        assert_eq!(usb.transmitted, std::vec![std::vec![0x02; 70]]);
        let stats = relay.stats();
        assert_eq!(stats.wifi_rx_frames, 2);
        assert_eq!(stats.inbound_replaced, 1);
        assert_eq!(stats.usb_tx_frames, 1);
    }

    #[test]
    fn test_link_output_statuses() {
        let relay = relay();

        let mut usb = FakeUsb::default();
        assert_eq!(relay.link_output(&mut usb, &pattern(342)), LinkOutput::Sent);
        assert_eq!(usb.transmitted.len(), 1);

        let mut busy = FakeUsb {
            busy_checks: u32::MAX,
            ..Default::default()
        };
        assert_eq!(relay.link_output(&mut busy, &pattern(342)), LinkOutput::TryLater);
        assert_eq!(busy.services, 8);

        let mut down = FakeUsb {
            not_ready: true,
            ..Default::default()
        };
        assert_eq!(relay.link_output(&mut down, &pattern(342)), LinkOutput::Unavailable);
        assert_eq!(relay.link_output(&mut usb, &pattern(MTU + 1)), LinkOutput::Oversized);
    }

    #[test]
    fn test_reset_discards_stale_frames() {
        let relay = relay();
        assert!(relay.deliver_from_usb(&pattern(60)).is_accepted());
        relay.deliver_from_wifi(&pattern(60));

        assert_eq!(relay.reset(), 2);
        assert!(!relay.outbound_pending());
        assert!(!relay.inbound_pending());
        assert_eq!(relay.stats().stale_discarded, 2);
        assert_eq!(relay.reset(), 0);
    }

    #[test]
    fn test_drain_idle_when_empty() {
        let relay = relay();
        let mut radio = FakeRadio::default();
        let mut usb = FakeUsb::default();
        assert_eq!(relay.drain_outbound(&mut radio), DrainOutcome::Idle);
        assert_eq!(relay.drain_inbound(&mut usb), DrainOutcome::Idle);
        assert_eq!(usb.checks, 0);
    }
}
