//! # Cross-Core Synchronization
//!
//! Two shared resources, each with a single writer class:
//!
//! - [`AddressGate`]: one-shot rendezvous. Core B publishes the hardware
//!   address once at boot; Core A blocks until it can read it. After that
//!   handoff the gate is never contended again.
//! - [`SharedSlot`]: blocking mutex around one [`RelaySlot`]. Critical
//!   sections are limited to check / copy / hand-off / clear.
//!
//! ## Memory Layout
//!
//! ```text
//! AddressGate
//! ┌──────────────┬────────────────────────┐
//! │ state (u8)   │ address ([u8; 6])      │
//! │ VACANT ──► WRITING ──► PUBLISHED       │
//! └──────────────┴────────────────────────┘
//! ```
//!
//! Only atomic loads and stores are used on the gate state, so the gate
//! also works on cores without compare-and-swap (Cortex-M0+). Exclusive
//! publication is arbitrated by a critical section instead.

use core::cell::{RefCell, UnsafeCell};
use core::sync::atomic::{AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_sync::blocking_mutex::Mutex;

use crate::error::{RelayError, RelayResult};
use crate::frame::{MacAddress, MAC_LEN};
use crate::slot::RelaySlot;

/// Raw mutex used when both cores touch the same state
pub type DefaultRawMutex = CriticalSectionRawMutex;

const VACANT: u8 = 0;
const WRITING: u8 = 1;
const PUBLISHED: u8 = 2;

/// Single-use barrier carrying the device hardware address
pub struct AddressGate {
    state: AtomicU8,
    address: UnsafeCell<[u8; MAC_LEN]>,
}

// SAFETY: `address` is written exactly once, inside a critical section,
// before `state` is released as PUBLISHED. Readers only touch it after
// observing PUBLISHED with Acquire ordering.
unsafe impl Sync for AddressGate {}

impl AddressGate {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(VACANT),
            address: UnsafeCell::new([0; MAC_LEN]),
        }
    }

    /// Publish the address and open the gate.
    ///
    /// Fails if an address was already published; the first value stays.
    pub fn publish(&self, mac: MacAddress) -> RelayResult<()> {
        critical_section::with(|_| {
            if self.state.load(Ordering::Acquire) != VACANT {
                return Err(RelayError::AddressAlreadyPublished);
            }
            self.state.store(WRITING, Ordering::Relaxed);

            // SAFETY: state was VACANT and we hold the critical section,
            // so no other writer exists and no reader passes the PUBLISHED
            // check until the store below.
            unsafe { *self.address.get() = mac.octets() };

            self.state.store(PUBLISHED, Ordering::Release);
            Ok(())
        })
    }

    /// The published address, or `None` while the gate is closed
    pub fn try_get(&self) -> Option<MacAddress> {
        if self.state.load(Ordering::Acquire) != PUBLISHED {
            return None;
        }
        // SAFETY: PUBLISHED is terminal and the address is never written
        // again after it is stored.
        Some(MacAddress::new(unsafe { *self.address.get() }))
    }

    /// Block the calling core until the address is published
    pub fn wait(&self) -> MacAddress {
        loop {
            if let Some(mac) = self.try_get() {
                return mac;
            }
            core::hint::spin_loop();
        }
    }

    /// Like [`wait`](Self::wait), but gives up with `None` once `cancelled`
    /// returns true. The address wins if both are ready.
    pub fn wait_or_cancel(&self, mut cancelled: impl FnMut() -> bool) -> Option<MacAddress> {
        loop {
            if let Some(mac) = self.try_get() {
                return Some(mac);
            }
            if cancelled() {
                return None;
            }
            core::hint::spin_loop();
        }
    }

    #[inline]
    pub fn is_published(&self) -> bool {
        self.state.load(Ordering::Acquire) == PUBLISHED
    }
}

impl Default for AddressGate {
    fn default() -> Self {
        Self::new()
    }
}

/// A relay slot behind a blocking mutex
pub struct SharedSlot<M: RawMutex = DefaultRawMutex> {
    inner: Mutex<M, RefCell<RelaySlot>>,
}

impl<M: RawMutex> SharedSlot<M> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(RelaySlot::new())),
        }
    }

    /// Run `f` with exclusive access to the slot.
    ///
    /// `f` must not block and must not re-enter the same slot.
    pub fn with<R>(&self, f: impl FnOnce(&mut RelaySlot) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    pub fn is_occupied(&self) -> bool {
        self.with(|slot| slot.is_occupied())
    }

    /// Length of the held frame, if any
    pub fn pending_len(&self) -> Option<usize> {
        self.with(|slot| slot.len())
    }
}

impl<M: RawMutex> Default for SharedSlot<M> {
    fn default() -> Self {
        Self::new()
    }
}
