//! # DualSense Target
//!
//! One emulated DualSense controller plugged into a [`BusTransport`].
//!
//! ## Report Protocol
//!
//! Every mutator edits the in-memory [`InputReport`] first and then, when
//! auto-submit is on (the default), hands the whole report to the bus. With
//! auto-submit off, edits accumulate until [`DualSenseController::submit_report`].
//! A failed submission leaves the edit in place; the caller decides whether
//! to resubmit.
//!
//! ## Threading
//!
//! The controller is a single-writer object: mutators take `&mut self`.
//! Feedback listeners run on the bus's notification thread, and the blocking
//! awaits occupy the calling thread (or a blocking-pool worker for the async
//! variants) until the bus answers.
//!
//! Dropping an async await does not stop its worker. The worker stays in
//! flight, and a report it receives is parked on the controller and handed
//! to the next await, sync or async.
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use dualsense_bus::controller::{DualSenseController, TargetKind};
//! use dualsense_bus::report::catalog::{Button, DPadDirection};
//! use dualsense_bus::transport::LoopbackBus;
//!
//! let bus = Arc::new(LoopbackBus::new());
//! let mut pad = DualSenseController::new(Arc::clone(&bus), TargetKind::DualSense);
//! pad.connect()?;
//!
//! pad.set_auto_submit(false);
//! pad.set_button_state(Button::Cross, true)?;
//! pad.set_dpad_direction(DPadDirection::North)?;
//! pad.submit_report()?;
//!
//! assert_eq!(bus.submitted_reports(pad.target()).len(), 1);
//! # Ok::<(), dualsense_bus::error::TargetError>(())
//! ```

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::TargetKind;
use crate::config::TargetConfig;
use crate::error::{Result, TargetError};
use crate::feedback::{FeedbackHub, FeedbackListener, SubscriptionId};
use crate::report::catalog::{AnyButton, Axis, ControlFamily, DPadDirection, Slider};
use crate::report::input::{InputReport, MAX_RAW_INPUT_REPORT_SIZE};
use crate::report::scaling::axis_to_byte;
use crate::transport::{BusStatus, BusTransport, DeviceIds, OutputBuffer, TargetHandle, OUTPUT_REPORT_SIZE};

/// Emulated DualSense controller.
pub struct DualSenseController<B: BusTransport + ?Sized> {
    bus: Arc<B>,
    target: TargetHandle,
    ids: DeviceIds,
    report: InputReport,
    auto_submit: bool,
    connected: bool,
    feedback: Arc<FeedbackHub>,
    output: OutputBuffer,
    handoff: Arc<OutputHandoff>,
    worker: Option<JoinHandle<Result<()>>>,
}

/// Output report handoff between blocking-pool workers and the controller.
#[derive(Default)]
struct OutputHandoff {
    state: Mutex<HandoffState>,
    settled: Condvar,
}

#[derive(Default)]
struct HandoffState {
    in_flight: bool,
    parked: Option<OutputBuffer>,
}

enum Settled {
    Report(OutputBuffer),
    Idle(Option<Duration>),
}

impl OutputHandoff {
    fn lock(&self) -> MutexGuard<'_, HandoffState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) {
        self.lock().in_flight = true;
    }

    fn finish(&self, report: Option<OutputBuffer>) {
        let mut state = self.lock();
        state.in_flight = false;
        if report.is_some() {
            state.parked = report;
        }
        drop(state);
        self.settled.notify_all();
    }

    fn take_parked(&self) -> Option<OutputBuffer> {
        self.lock().parked.take()
    }

    /// Waits out an in-flight worker. Returns its report, or the part of
    /// `timeout` left for a direct bus call.
    fn settle(&self, timeout: Option<Duration>) -> Result<Settled> {
        let started = Instant::now();
        let state = self.lock();
        if !state.in_flight {
            let mut state = state;
            return Ok(match state.parked.take() {
                Some(report) => Settled::Report(report),
                None => Settled::Idle(timeout),
            });
        }

        let mut state = match timeout {
            Some(timeout) => {
                let (state, wait) = self
                    .settled
                    .wait_timeout_while(state, timeout, |state| state.in_flight)
                    .unwrap_or_else(PoisonError::into_inner);
                if wait.timed_out() {
                    return Err(TargetError::TimedOut);
                }
                state
            }
            None => self
                .settled
                .wait_while(state, |state| state.in_flight)
                .unwrap_or_else(PoisonError::into_inner),
        };

        Ok(match state.parked.take() {
            Some(report) => Settled::Report(report),
            None => Settled::Idle(timeout.map(|timeout| timeout.saturating_sub(started.elapsed()))),
        })
    }
}

impl<B: BusTransport + ?Sized> std::fmt::Debug for DualSenseController<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualSenseController")
            .field("target", &self.target)
            .field("ids", &self.ids)
            .field("report", &self.report)
            .field("auto_submit", &self.auto_submit)
            .field("connected", &self.connected)
            .finish_non_exhaustive()
    }
}

impl<B: BusTransport + ?Sized> DualSenseController<B> {
    /// Allocate a target of the given kind on `bus`. The target is not
    /// plugged in until [`DualSenseController::connect`].
    pub fn new(bus: Arc<B>, kind: TargetKind) -> Self {
        Self::with_ids(bus, kind.device_ids())
    }

    /// Allocate a target presenting custom vendor and product IDs.
    pub fn with_ids(bus: Arc<B>, ids: DeviceIds) -> Self {
        let target = bus.allocate_target();
        debug!("Allocated {} ({})", target, ids);
        Self {
            bus,
            target,
            ids,
            report: InputReport::RESTING,
            auto_submit: true,
            connected: false,
            feedback: Arc::new(FeedbackHub::new()),
            output: [0u8; OUTPUT_REPORT_SIZE],
            handoff: Arc::new(OutputHandoff::default()),
            worker: None,
        }
    }

    /// Allocate a target as described by the `[target]` config section.
    pub fn from_config(bus: Arc<B>, config: &TargetConfig) -> Self {
        let mut controller = Self::with_ids(bus, config.device_ids());
        controller.auto_submit = config.auto_submit;
        controller
    }

    pub fn target(&self) -> TargetHandle {
        self.target
    }

    pub fn device_ids(&self) -> DeviceIds {
        self.ids
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Plug the target into the bus and register for host feedback.
    ///
    /// # Errors
    ///
    /// Returns the mapped bus status if plugging in or registration fails.
    /// A failed registration unplugs the target again.
    pub fn connect(&mut self) -> Result<()> {
        self.check(self.bus.add_target(self.target, self.ids))?;

        let sink = Arc::clone(&self.feedback);
        let status = self.bus.register_notification(self.target, sink);
        if let Err(e) = self.check(status) {
            let rollback = self.bus.remove_target(self.target);
            if !rollback.is_success() {
                warn!("Failed to unplug {} after registration error: {}", self.target, rollback);
            }
            return Err(e);
        }

        self.connected = true;
        info!("Connected {} as {}", self.target, self.ids);
        Ok(())
    }

    /// Tear down the feedback registration, then unplug the target.
    ///
    /// # Errors
    ///
    /// Returns the mapped bus status if unplugging fails. The controller
    /// then still counts as connected, so dropping it tries again.
    pub fn disconnect(&mut self) -> Result<()> {
        self.bus.unregister_notification(self.target);
        self.check(self.bus.remove_target(self.target))?;
        self.connected = false;
        info!("Disconnected {}", self.target);
        Ok(())
    }

    pub fn auto_submit(&self) -> bool {
        self.auto_submit
    }

    /// Enable or disable submitting after every mutation.
    pub fn set_auto_submit(&mut self, enabled: bool) {
        self.auto_submit = enabled;
    }

    /// Current local report, including edits not yet submitted.
    pub fn report(&self) -> &InputReport {
        &self.report
    }

    /// Restore the resting report. Nothing is submitted.
    pub fn reset_report(&mut self) {
        self.report.reset();
    }

    /// Number of buttons addressable by index (standard and special).
    pub fn button_count(&self) -> usize {
        AnyButton::ALL.len()
    }

    pub fn axis_count(&self) -> usize {
        Axis::ALL.len()
    }

    pub fn slider_count(&self) -> usize {
        Slider::ALL.len()
    }

    /// Press or release a button.
    ///
    /// # Errors
    ///
    /// Returns the submission error when auto-submit is on.
    pub fn set_button_state(&mut self, button: impl Into<AnyButton>, pressed: bool) -> Result<()> {
        let button = button.into();
        self.apply(|report| report.set_button(button, pressed))
    }

    /// Press or release the button at `index` of [`AnyButton::ALL`].
    ///
    /// # Errors
    ///
    /// [`TargetError::IndexOutOfRange`] for an unknown index (nothing is
    /// edited or submitted), otherwise as [`Self::set_button_state`].
    pub fn set_button_state_at(&mut self, index: usize, pressed: bool) -> Result<()> {
        let button = resolve(&AnyButton::ALL, ControlFamily::Button, index)?;
        self.set_button_state(button, pressed)
    }

    /// Set the d-pad to exactly one direction.
    ///
    /// # Errors
    ///
    /// Returns the submission error when auto-submit is on.
    pub fn set_dpad_direction(&mut self, direction: DPadDirection) -> Result<()> {
        self.apply(|report| report.set_dpad(direction))
    }

    /// Set a stick axis to a raw report value (`0x80` = center).
    ///
    /// # Errors
    ///
    /// Returns the submission error when auto-submit is on.
    pub fn set_axis_value(&mut self, axis: Axis, value: u8) -> Result<()> {
        self.apply(|report| report.set_axis(axis, value))
    }

    /// Set the axis at `index` from a signed 16-bit value, rescaled with
    /// [`axis_to_byte`].
    ///
    /// # Errors
    ///
    /// [`TargetError::IndexOutOfRange`] for an unknown index, otherwise as
    /// [`Self::set_axis_value`].
    pub fn set_axis_value_at(&mut self, index: usize, value: i16) -> Result<()> {
        let axis = resolve(&Axis::ALL, ControlFamily::Axis, index)?;
        self.set_axis_value(axis, axis_to_byte(value))
    }

    /// Set a trigger value.
    ///
    /// # Errors
    ///
    /// Returns the submission error when auto-submit is on.
    pub fn set_slider_value(&mut self, slider: Slider, value: u8) -> Result<()> {
        self.apply(|report| report.set_slider(slider, value))
    }

    /// # Errors
    ///
    /// [`TargetError::IndexOutOfRange`] for an unknown index, otherwise as
    /// [`Self::set_slider_value`].
    pub fn set_slider_value_at(&mut self, index: usize, value: u8) -> Result<()> {
        let slider = resolve(&Slider::ALL, ControlFamily::Slider, index)?;
        self.set_slider_value(slider, value)
    }

    /// Overwrite the whole buttons mask, d-pad nibble included.
    ///
    /// # Errors
    ///
    /// Returns the submission error when auto-submit is on.
    pub fn set_buttons_full(&mut self, buttons: u16) -> Result<()> {
        self.apply(|report| report.set_buttons_full(buttons))
    }

    /// Overwrite the whole special buttons mask.
    ///
    /// # Errors
    ///
    /// Returns the submission error when auto-submit is on.
    pub fn set_special_buttons_full(&mut self, buttons: u8) -> Result<()> {
        self.apply(|report| report.set_special_buttons_full(buttons))
    }

    /// Send the current report regardless of the auto-submit setting.
    ///
    /// # Errors
    ///
    /// Returns the mapped bus status on failure.
    pub fn submit_report(&mut self) -> Result<()> {
        let status = self.bus.update_report(self.target, &self.report);
        self.check(status)?;
        debug!("Submitted input report to {}", self.target);
        Ok(())
    }

    /// Send a caller-built report, bypassing the structured model.
    ///
    /// # Errors
    ///
    /// [`TargetError::OutOfRange`] if `buffer` is longer than
    /// [`MAX_RAW_INPUT_REPORT_SIZE`]; the bus is not called in that case.
    /// Otherwise the mapped bus status.
    pub fn submit_raw_report(&mut self, buffer: &[u8]) -> Result<()> {
        if buffer.len() > MAX_RAW_INPUT_REPORT_SIZE {
            return Err(TargetError::OutOfRange {
                len: buffer.len(),
                max: MAX_RAW_INPUT_REPORT_SIZE,
            });
        }
        let status = self.bus.update_raw_report(self.target, buffer);
        self.check(status)?;
        debug!("Submitted raw report ({} bytes) to {}", buffer.len(), self.target);
        Ok(())
    }

    /// Add a feedback listener. Listeners run in subscription order on the
    /// bus's notification thread.
    pub fn subscribe(&self, listener: impl FeedbackListener + 'static) -> SubscriptionId {
        self.feedback.subscribe(listener)
    }

    /// Remove a feedback listener. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.feedback.unsubscribe(id)
    }

    /// Block until the host sends an output report.
    ///
    /// The returned slice borrows the controller's buffer, which the next
    /// successful await overwrites.
    ///
    /// # Errors
    ///
    /// Returns the mapped bus status on failure.
    pub fn await_output_report(&mut self) -> Result<&[u8]> {
        self.await_blocking(None)
    }

    /// Block until the host sends an output report or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// [`TargetError::TimedOut`] when nothing arrives in time, otherwise the
    /// mapped bus status.
    pub fn await_output_report_timeout(&mut self, timeout: Duration) -> Result<&[u8]> {
        self.await_blocking(Some(timeout))
    }

    /// Last output report received by a successful await.
    pub fn last_output_report(&self) -> &[u8] {
        &self.output
    }

    fn apply(&mut self, edit: impl FnOnce(&mut InputReport)) -> Result<()> {
        edit(&mut self.report);
        if self.auto_submit {
            self.submit_report()
        } else {
            Ok(())
        }
    }

    fn check(&self, status: BusStatus) -> Result<()> {
        status.into_result(|| self.bus.last_os_error())
    }

    fn store(&mut self, buffer: OutputBuffer) -> &[u8] {
        self.output = buffer;
        &self.output
    }

    fn await_blocking(&mut self, timeout: Option<Duration>) -> Result<&[u8]> {
        // A worker left behind by a dropped async await owns the bus wait
        let settled = self.handoff.settle(timeout)?;
        self.worker = None;
        let timeout = match settled {
            Settled::Report(buffer) => return Ok(self.store(buffer)),
            Settled::Idle(remaining) => remaining,
        };

        let mut buffer = [0u8; OUTPUT_REPORT_SIZE];
        let status = match timeout {
            Some(timeout) => self
                .bus
                .await_output_report_timeout(self.target, timeout, &mut buffer),
            None => self.bus.await_output_report(self.target, &mut buffer),
        };
        self.check(status)?;
        Ok(self.store(buffer))
    }
}

impl<B: BusTransport + ?Sized + 'static> DualSenseController<B> {
    /// Async form of [`Self::await_output_report`]. The blocking bus call
    /// runs on the runtime's blocking pool.
    ///
    /// Cancel-safe: if this future is dropped, a report that arrives later
    /// is returned by the next await.
    ///
    /// # Errors
    ///
    /// As [`Self::await_output_report`], plus [`TargetError::Join`] if the
    /// worker task fails.
    pub async fn await_output_report_async(&mut self) -> Result<&[u8]> {
        self.await_on_worker(None).await
    }

    /// Async form of [`Self::await_output_report_timeout`]. The timeout
    /// bounds this call only; the worker keeps waiting for the next await.
    ///
    /// # Errors
    ///
    /// As [`Self::await_output_report_timeout`], plus [`TargetError::Join`].
    pub async fn await_output_report_timeout_async(&mut self, timeout: Duration) -> Result<&[u8]> {
        self.await_on_worker(Some(timeout)).await
    }

    async fn await_on_worker(&mut self, timeout: Option<Duration>) -> Result<&[u8]> {
        if let Some(buffer) = self.handoff.take_parked() {
            return Ok(self.store(buffer));
        }

        let bus = Arc::clone(&self.bus);
        let handoff = Arc::clone(&self.handoff);
        let target = self.target;
        let worker = self
            .worker
            .get_or_insert_with(move || spawn_worker(bus, target, handoff));

        let joined = match timeout {
            Some(timeout) => match tokio::time::timeout(timeout, &mut *worker).await {
                Ok(joined) => joined,
                Err(_) => return Err(TargetError::TimedOut),
            },
            None => worker.await,
        };
        self.worker = None;

        match joined {
            Ok(result) => result?,
            Err(e) => {
                self.handoff.finish(None);
                return Err(e.into());
            }
        }

        // Parked by the worker before it returned
        let buffer = self.handoff.take_parked().ok_or(TargetError::TimedOut)?;
        Ok(self.store(buffer))
    }
}

fn spawn_worker<B: BusTransport + ?Sized + 'static>(
    bus: Arc<B>,
    target: TargetHandle,
    handoff: Arc<OutputHandoff>,
) -> JoinHandle<Result<()>> {
    handoff.begin();
    tokio::task::spawn_blocking(move || {
        let mut buffer = [0u8; OUTPUT_REPORT_SIZE];
        let status = bus.await_output_report(target, &mut buffer);
        let result = status.into_result(|| bus.last_os_error());
        handoff.finish(result.is_ok().then_some(buffer));
        result
    })
}

impl<B: BusTransport + ?Sized> Drop for DualSenseController<B> {
    fn drop(&mut self) {
        if self.connected {
            if let Err(e) = self.disconnect() {
                warn!("Failed to disconnect {} on drop: {}", self.target, e);
            }
        }
        self.bus.free_target(self.target);
    }
}

fn resolve<T: Copy>(table: &[T], family: ControlFamily, index: usize) -> Result<T> {
    table
        .get(index)
        .copied()
        .ok_or(TargetError::IndexOutOfRange {
            family: family.name(),
            index,
            count: table.len(),
        })
}
