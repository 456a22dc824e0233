//! # Report Module
//!
//! DualSense input report model.
//!
//! This module handles:
//! - The catalog of addressable controls and their wire values
//! - The mutable input report and its resting state
//! - Signed 16-bit to 8-bit axis rescaling

pub mod catalog;
pub mod input;
pub mod scaling;
