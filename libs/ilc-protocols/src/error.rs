//! ILC communication error types
//!
//! Errors model structural failures only (buffer overflow, transport faults,
//! malformed configuration). Protocol-level faults seen on the wire (bad
//! CRC, unknown addresses, exception responses) are classified as warning
//! events by the decoder and never surface as `IlcError`.

use thiserror::Error;

/// Result type for ilc-protocols operations
pub type Result<T> = std::result::Result<T, IlcError>;

/// ILC communication stack errors
#[derive(Debug, Error, Clone)]
pub enum IlcError {
    /// Protocol-level errors
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Wire buffer capacity exceeded
    #[error("Wire buffer full: {0}")]
    BufferFull(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(String),

    /// Timeout waiting on the transport
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid data
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl From<std::io::Error> for IlcError {
    fn from(err: std::io::Error) -> Self {
        IlcError::Io(err.to_string())
    }
}

// Helper methods for creating errors
impl IlcError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        IlcError::Protocol(msg.into())
    }

    pub fn buffer_full(msg: impl Into<String>) -> Self {
        IlcError::BufferFull(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        IlcError::Timeout(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        IlcError::Config(msg.into())
    }

    pub fn invalid_data(msg: impl Into<String>) -> Self {
        IlcError::InvalidData(msg.into())
    }

    /// True when the error is a transport timeout (non-responsive subnet).
    pub fn is_timeout(&self) -> bool {
        matches!(self, IlcError::Timeout(_))
    }
}
