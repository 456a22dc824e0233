//! # Transport Module
//!
//! Boundary with the virtual bus driver.
//!
//! This module handles:
//! - The [`BusTransport`] trait the controller talks to
//! - Bus status codes and their mapping onto [`TargetError`]
//! - An in-process [`LoopbackBus`] implementation
//!
//! Status mapping is a single total function used by every operation, so a
//! given code always surfaces as the same error regardless of which call
//! produced it.

use std::fmt;

use crate::error::{Result, TargetError};

pub mod bus_trait;
pub mod loopback;

pub use bus_trait::BusTransport;
pub use loopback::LoopbackBus;

/// Size of the output report buffer filled by the bus on every await.
pub const OUTPUT_REPORT_SIZE: usize = 64;

/// Output report as delivered by the bus.
pub type OutputBuffer = [u8; OUTPUT_REPORT_SIZE];

/// Identifies one emulated controller on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetHandle(pub u64);

impl fmt::Display for TargetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

/// USB identity the bus presents for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIds {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl fmt::Display for DeviceIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

/// Raw status code: success.
pub const STATUS_NONE: u32 = 0x2000_0000;
/// Raw status code: bus driver not found.
pub const STATUS_BUS_NOT_FOUND: u32 = 0xE000_0001;
/// Raw status code: target unknown to the bus.
pub const STATUS_INVALID_TARGET: u32 = 0xE000_0003;
/// Raw status code: target already plugged in.
pub const STATUS_ALREADY_CONNECTED: u32 = 0xE000_0005;
/// Raw status code: notification callback already registered.
pub const STATUS_CALLBACK_ALREADY_REGISTERED: u32 = 0xE000_0010;
/// Raw status code: stale bus handle.
pub const STATUS_BUS_INVALID_HANDLE: u32 = 0xE000_0013;
/// Raw status code: invalid parameter.
pub const STATUS_INVALID_PARAMETER: u32 = 0xE000_0015;
/// Raw status code: operation not supported.
pub const STATUS_NOT_SUPPORTED: u32 = 0xE000_0016;
/// Raw status code: wait timed out.
pub const STATUS_TIMED_OUT: u32 = 0xE000_0018;
/// Raw status code: bus is disposing.
pub const STATUS_IS_DISPOSING: u32 = 0xE000_0019;

/// Status returned by every bus call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusStatus {
    Success,
    BusNotFound,
    InvalidTarget,
    BusInvalidHandle,
    CallbackAlreadyRegistered,
    NotSupported,
    InvalidParameter,
    IsDisposing,
    TimedOut,
    /// Any code without a dedicated variant
    Other(u32),
}

impl BusStatus {
    /// Decodes a raw driver status code.
    pub fn from_code(code: u32) -> Self {
        match code {
            STATUS_NONE => Self::Success,
            STATUS_BUS_NOT_FOUND => Self::BusNotFound,
            STATUS_INVALID_TARGET => Self::InvalidTarget,
            STATUS_BUS_INVALID_HANDLE => Self::BusInvalidHandle,
            STATUS_CALLBACK_ALREADY_REGISTERED => Self::CallbackAlreadyRegistered,
            STATUS_NOT_SUPPORTED => Self::NotSupported,
            STATUS_INVALID_PARAMETER => Self::InvalidParameter,
            STATUS_IS_DISPOSING => Self::IsDisposing,
            STATUS_TIMED_OUT => Self::TimedOut,
            other => Self::Other(other),
        }
    }

    /// Raw driver status code.
    pub fn code(self) -> u32 {
        match self {
            Self::Success => STATUS_NONE,
            Self::BusNotFound => STATUS_BUS_NOT_FOUND,
            Self::InvalidTarget => STATUS_INVALID_TARGET,
            Self::BusInvalidHandle => STATUS_BUS_INVALID_HANDLE,
            Self::CallbackAlreadyRegistered => STATUS_CALLBACK_ALREADY_REGISTERED,
            Self::NotSupported => STATUS_NOT_SUPPORTED,
            Self::InvalidParameter => STATUS_INVALID_PARAMETER,
            Self::IsDisposing => STATUS_IS_DISPOSING,
            Self::TimedOut => STATUS_TIMED_OUT,
            Self::Other(code) => code,
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// Maps the status onto the error taxonomy.
    ///
    /// `last_os_error` is only consulted for [`BusStatus::Other`], which
    /// becomes [`TargetError::Platform`].
    ///
    /// # Errors
    ///
    /// Every status except [`BusStatus::Success`] is an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use dualsense_bus::error::TargetError;
    /// use dualsense_bus::transport::BusStatus;
    ///
    /// assert!(BusStatus::Success.into_result(|| 0).is_ok());
    /// assert!(matches!(
    ///     BusStatus::Other(0xE000_0002).into_result(|| 5),
    ///     Err(TargetError::Platform { code: 5 })
    /// ));
    /// ```
    pub fn into_result(self, last_os_error: impl FnOnce() -> i32) -> Result<()> {
        match self {
            Self::Success => Ok(()),
            Self::BusNotFound => Err(TargetError::BusNotFound),
            Self::InvalidTarget => Err(TargetError::InvalidTarget),
            Self::BusInvalidHandle => Err(TargetError::BusInvalidHandle),
            Self::CallbackAlreadyRegistered => Err(TargetError::CallbackAlreadyRegistered),
            Self::NotSupported => Err(TargetError::NotSupported),
            Self::InvalidParameter => Err(TargetError::InvalidParameter),
            Self::IsDisposing => Err(TargetError::IsDisposing),
            Self::TimedOut => Err(TargetError::TimedOut),
            Self::Other(_) => Err(TargetError::Platform {
                code: last_os_error(),
            }),
        }
    }
}

impl fmt::Display for BusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (0x{:08X})", self, self.code())
    }
}
