//! Trait abstraction for the virtual bus driver to enable testing

use std::sync::Arc;
use std::time::Duration;

use super::{BusStatus, DeviceIds, OutputBuffer, TargetHandle};
use crate::feedback::FeedbackSink;
use crate::report::input::InputReport;

/// Operations the controller needs from the bus driver.
///
/// One implementor stands for one open client connection. All methods take
/// `&self` and may be called from several threads; the blocking await calls
/// in particular run on a worker thread while submissions continue.
#[cfg_attr(test, mockall::automock)]
pub trait BusTransport: Send + Sync {
    /// Reserve a new target handle.
    fn allocate_target(&self) -> TargetHandle;

    /// Plug the target into the bus with the given USB identity.
    fn add_target(&self, target: TargetHandle, ids: DeviceIds) -> BusStatus;

    /// Unplug the target.
    fn remove_target(&self, target: TargetHandle) -> BusStatus;

    /// Release the handle and everything the bus keeps for it. The handle
    /// is invalid afterwards.
    fn free_target(&self, target: TargetHandle);

    /// Register the sink that receives host feedback for `target`.
    fn register_notification(&self, target: TargetHandle, sink: Arc<dyn FeedbackSink>) -> BusStatus;

    /// Drop the registered sink, if any.
    fn unregister_notification(&self, target: TargetHandle);

    /// Send a structured input report.
    fn update_report(&self, target: TargetHandle, report: &InputReport) -> BusStatus;

    /// Send a caller-built input report.
    fn update_raw_report(&self, target: TargetHandle, buffer: &[u8]) -> BusStatus;

    /// Block until an output report is pending and copy it into `buffer`.
    fn await_output_report(&self, target: TargetHandle, buffer: &mut OutputBuffer) -> BusStatus;

    /// Like [`BusTransport::await_output_report`] but gives up after `timeout`.
    fn await_output_report_timeout(
        &self,
        target: TargetHandle,
        timeout: Duration,
        buffer: &mut OutputBuffer,
    ) -> BusStatus;

    /// OS error code reported alongside an unmapped status.
    fn last_os_error(&self) -> i32;
}
