//! Single-frame relay slot.
//!
//! ```text
//!          fill / replace                 take / clear
//!  EMPTY ─────────────────► OCCUPIED ─────────────────► EMPTY
//! ```
//!
//! The slot itself is not synchronized; see [`crate::sync::SharedSlot`].

use crate::frame::Frame;

/// One-frame-deep buffer for a single relay direction
#[derive(Debug, Default)]
pub enum RelaySlot {
    #[default]
    Empty,
    Occupied(Frame),
}

impl RelaySlot {
    pub const fn new() -> Self {
        Self::Empty
    }

    #[inline]
    pub fn is_occupied(&self) -> bool {
        matches!(self, Self::Occupied(_))
    }

    /// Store `frame` if the slot is empty, otherwise hand it back
    pub fn fill(&mut self, frame: Frame) -> Result<(), Frame> {
        match self {
            Self::Empty => {
                *self = Self::Occupied(frame);
                Ok(())
            }
            Self::Occupied(_) => Err(frame),
        }
    }

    /// Store `frame` unconditionally, returning whatever it displaced
    pub fn replace(&mut self, frame: Frame) -> Option<Frame> {
        match core::mem::replace(self, Self::Occupied(frame)) {
            Self::Empty => None,
            Self::Occupied(old) => Some(old),
        }
    }

    pub fn peek(&self) -> Option<&Frame> {
        match self {
            Self::Empty => None,
            Self::Occupied(frame) => Some(frame),
        }
    }

    pub fn take(&mut self) -> Option<Frame> {
        match core::mem::take(self) {
            Self::Empty => None,
            Self::Occupied(frame) => Some(frame),
        }
    }

    /// Drop any held frame; returns whether one was held
    pub fn clear(&mut self) -> bool {
        self.take().is_some()
    }

    /// Length of the held frame
    pub fn len(&self) -> Option<usize> {
        self.peek().map(Frame::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(fill: u8, len: usize) -> Frame {
        Frame::copy_from(&std::vec![fill; len]).unwrap()
    }

    #[test]
    fn test_new_slot_is_empty() {
        let slot = RelaySlot::new();
        assert!(!slot.is_occupied());
        assert!(slot.peek().is_none());
        assert_eq!(slot.len(), None);
    }

    #[test]
    fn test_fill_rejects_second_frame() {
        let mut slot = RelaySlot::new();
        assert!(slot.fill(frame(0x11, 60)).is_ok());

        let rejected = slot.fill(frame(0x22, 70)).unwrap_err();
        assert_eq!(rejected.len(), 70);
        assert_eq!(slot.peek().unwrap().as_bytes(), &[0x11; 60][..]);
    }

    #[test]
    fn test_replace_keeps_most_recent() {
        let mut slot = RelaySlot::new();
        assert!(slot.replace(frame(0x11, 60)).is_none());

        let displaced = slot.replace(frame(0x22, 80)).unwrap();
        assert_eq!(displaced.as_bytes()[0], 0x11);
        assert_eq!(slot.len(), Some(80));
    }

    #[test]
    fn test_take_and_clear_empty_the_slot() {
        let mut slot = RelaySlot::new();
        slot.fill(frame(0x33, 42)).unwrap();
        assert_eq!(slot.take().map(|f| f.len()), Some(42));
        assert!(!slot.is_occupied());

        slot.fill(frame(0x44, 42)).unwrap();
        assert!(slot.clear());
        assert!(!slot.clear());
    }
}
