use thiserror::Error;

use relay::RelayError;

/// Errors raised by the host simulator
#[derive(Error, Debug)]
pub enum HostError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),
    #[error("{0} thread panicked")]
    CorePanicked(&'static str),
}

pub type HostResult<T> = Result<T, HostError>;
