//! Millisecond time source and wrap-safe deadlines.
//!
//! Ticks are `u32` milliseconds and wrap after ~49.7 days. Comparisons
//! use the signed distance between two ticks, which stays correct as long
//! as the compared instants are less than ~24.8 days apart.

use core::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// A point on the wrapping millisecond timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Millis(pub u32);

impl Millis {
    #[inline]
    pub const fn offset(self, ms: u32) -> Self {
        Self(self.0.wrapping_add(ms))
    }

    /// Milliseconds elapsed from `earlier` to `self`
    #[inline]
    pub const fn since(self, earlier: Millis) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// `self` is not before `other`
    #[inline]
    pub const fn reached(self, other: Millis) -> bool {
        (self.0.wrapping_sub(other.0) as i32) >= 0
    }
}

/// Monotonic millisecond source shared by the IP stack timers and the
/// reconnect deadline
pub trait Clock {
    fn now(&self) -> Millis;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Millis {
        (**self).now()
    }
}

/// Clock advanced by hand; used by tests and simulations
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU32,
}

impl ManualClock {
    pub const fn new(start: u32) -> Self {
        Self {
            now: AtomicU32::new(start),
        }
    }

    /// Move time forward. Single writer only.
    pub fn advance(&self, ms: u32) {
        let next = self.now.load(Ordering::Acquire).wrapping_add(ms);
        self.now.store(next, Ordering::Release);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millis {
        Millis(self.now.load(Ordering::Acquire))
    }
}

/// Wall clock for hosted builds, counting from construction
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now(&self) -> Millis {
        // Truncation is the wrap
        Millis(self.origin.elapsed().as_millis() as u32)
    }
}

/// Throttles association attempts while the link is down.
///
/// Owned and polled by the Wi-Fi context only. The first poll with the
/// link down fires immediately; later ones wait for the interval.
#[derive(Debug, Clone)]
pub struct ReconnectTimer {
    interval_ms: u32,
    next_attempt: Option<Millis>,
}

impl ReconnectTimer {
    pub const fn new(interval_ms: u32) -> Self {
        Self {
            interval_ms,
            next_attempt: None,
        }
    }

    /// Returns true when an attempt should be made now, and arms the
    /// next deadline
    pub fn poll(&mut self, now: Millis, link_up: bool) -> bool {
        if link_up {
            return false;
        }
        match self.next_attempt {
            Some(deadline) if !now.reached(deadline) => false,
            _ => {
                self.next_attempt = Some(now.offset(self.interval_ms));
                true
            }
        }
    }

    pub fn next_attempt(&self) -> Option<Millis> {
        self.next_attempt
    }

    /// Forget the pending deadline so the next poll fires immediately
    pub fn reset(&mut self) {
        self.next_attempt = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reached_across_wrap() {
        let before = Millis(u32::MAX - 5);
        let after = before.offset(10);
        assert_eq!(after, Millis(4));
        assert!(after.reached(before));
        assert!(!before.reached(after));
        assert_eq!(after.since(before), 10);
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(100);
        clock.advance(250);
        assert_eq!(clock.now(), Millis(350));
    }

    #[test]
    fn test_reconnect_first_attempt_immediate() {
        let mut timer = ReconnectTimer::new(10_000);
        assert!(timer.poll(Millis(0), false));
        assert_eq!(timer.next_attempt(), Some(Millis(10_000)));
    }

    #[test]
    fn test_reconnect_throttled() {
        let mut timer = ReconnectTimer::new(10_000);
        assert!(timer.poll(Millis(1_000), false));
        assert!(!timer.poll(Millis(5_000), false));
        assert!(!timer.poll(Millis(10_999), false));
        assert!(timer.poll(Millis(11_000), false));
    }

    #[test]
    fn test_reconnect_idle_while_up() {
        let mut timer = ReconnectTimer::new(10_000);
        assert!(!timer.poll(Millis(0), true));
        assert_eq!(timer.next_attempt(), None);
    }

    #[test]
    fn test_reconnect_deadline_wraps() {
        let mut timer = ReconnectTimer::new(10_000);
        assert!(timer.poll(Millis(u32::MAX - 1_000), false));
        assert!(!timer.poll(Millis(u32::MAX), false));
        assert!(!timer.poll(Millis(8_000), false));
        assert!(timer.poll(Millis(9_000), false));
    }
}
