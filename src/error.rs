//! # Error Types
//!
//! Custom error types for DualSense Bus using `thiserror`.
//!
//! Every bus status code is mapped to exactly one variant here (see
//! [`crate::transport::BusStatus::into_result`]); nothing is retried or
//! swallowed inside the library.

use thiserror::Error;

/// Main error type for DualSense Bus
#[derive(Debug, Error)]
pub enum TargetError {
    /// The virtual bus driver is not installed or not reachable
    #[error("virtual bus not found")]
    BusNotFound,

    /// The bus does not recognise this target
    #[error("invalid target")]
    InvalidTarget,

    /// The bus connection handle is stale or closed
    #[error("invalid bus handle")]
    BusInvalidHandle,

    /// A notification callback is already registered for this target
    #[error("notification callback already registered")]
    CallbackAlreadyRegistered,

    /// The bus does not support the requested operation
    #[error("operation not supported by the bus")]
    NotSupported,

    /// The bus rejected a parameter
    #[error("invalid parameter")]
    InvalidParameter,

    /// The bus is tearing down
    #[error("bus is disposing")]
    IsDisposing,

    /// No output report arrived within the requested bound
    #[error("timed out waiting for output report")]
    TimedOut,

    /// A raw input report exceeded the driver limit
    #[error("raw report of {len} bytes exceeds maximum of {max}")]
    OutOfRange { len: usize, max: usize },

    /// Unmapped status, carrying the last OS error code
    #[error("platform error (os code {code})")]
    Platform { code: i32 },

    /// Index-based accessor used an index past the catalog
    #[error("{family} index {index} out of range (count {count})")]
    IndexOutOfRange {
        family: &'static str,
        index: usize,
        count: usize,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking await task was cancelled or panicked
    #[error("await task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Result type alias for DualSense Bus
pub type Result<T> = std::result::Result<T, TargetError>;
