//! Error types for the relay core.
//!
//! Per-frame problems (back-pressure, drops) are not errors; they are
//! reported through [`crate::relay::Admission`] and
//! [`crate::relay::DrainOutcome`] and counted in the relay statistics.
//! `RelayError` covers the conditions a caller has to act on.

use thiserror::Error;

use crate::transport::RadioError;

/// Errors raised by the relay core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RelayError {
    /// Frame longer than the interface MTU
    #[error("frame of {len} bytes exceeds MTU of {mtu}")]
    Oversized { len: usize, mtu: usize },
    /// Zero-length frame
    #[error("empty frame")]
    EmptyFrame,
    /// The hardware address can only be published once per boot
    #[error("hardware address already published")]
    AddressAlreadyPublished,
    /// The radio driver rejected a request
    #[error("radio error: {0}")]
    Radio(#[from] RadioError),
    /// A diagnostics beacon did not fit its datagram
    #[error("beacon encoding failed")]
    Encoding,
    /// A configuration value is out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Result type alias for relay operations
pub type RelayResult<T> = Result<T, RelayError>;
