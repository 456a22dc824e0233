//! # DualSense Bus Library
//!
//! Emulate a Sony DualSense controller on a virtual gamepad bus.
//!
//! This library provides the input report model (buttons, d-pad, sticks,
//! triggers), the bus transport seam the report is submitted through, and
//! fan-out of host feedback (rumble motors and lightbar color) to
//! subscribers.

pub mod config;
pub mod controller;
pub mod error;
pub mod feedback;
pub mod report;
pub mod transport;
