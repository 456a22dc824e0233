//! # Controller Module
//!
//! Emulated DualSense controllers on a virtual bus.
//!
//! This module handles:
//! - Target kinds and their USB identities
//! - Translating control edits into input report changes
//! - Auto-submitting reports to the bus
//! - Host feedback subscriptions and output report retrieval

use serde::Deserialize;

use crate::transport::DeviceIds;

pub mod dualsense;

pub use dualsense::DualSenseController;

/// Sony vendor ID
pub const SONY_VENDOR_ID: u16 = 0x054C;

/// DualSense product ID
pub const DUALSENSE_PRODUCT_ID: u16 = 0x0CE6;

/// DualSense Edge product ID
pub const DUALSENSE_EDGE_PRODUCT_ID: u16 = 0x0DF2;

/// Controller model to present on the bus. Both share the same report layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum TargetKind {
    #[default]
    #[serde(rename = "dualsense")]
    DualSense,
    #[serde(rename = "dualsense-edge")]
    DualSenseEdge,
}

impl TargetKind {
    /// Default USB identity for this model.
    ///
    /// # Examples
    ///
    /// ```
    /// use dualsense_bus::controller::TargetKind;
    ///
    /// let ids = TargetKind::DualSenseEdge.device_ids();
    /// assert_eq!(ids.product_id, 0x0DF2);
    /// ```
    pub const fn device_ids(self) -> DeviceIds {
        match self {
            Self::DualSense => DeviceIds {
                vendor_id: SONY_VENDOR_ID,
                product_id: DUALSENSE_PRODUCT_ID,
            },
            Self::DualSenseEdge => DeviceIds {
                vendor_id: SONY_VENDOR_ID,
                product_id: DUALSENSE_EDGE_PRODUCT_ID,
            },
        }
    }
}
