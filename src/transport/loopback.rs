//! # Loopback Bus
//!
//! In-process [`BusTransport`] with no driver behind it. Input reports are
//! recorded instead of being delivered to a host, and the host side is
//! driven by hand through [`LoopbackBus::push_output_report`] and
//! [`LoopbackBus::emit_feedback`].
//!
//! Feedback is delivered synchronously on the thread that calls
//! `emit_feedback`, which plays the role of the driver's notification thread.
//!
//! Structured reports are stored as encoded wire frames. Each target keeps
//! only the last [`REPORT_HISTORY_LIMIT`] frames and raw reports, plus a
//! running count of structured submissions.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, trace};

use super::{
    BusStatus, BusTransport, DeviceIds, OutputBuffer, TargetHandle, OUTPUT_REPORT_SIZE,
    STATUS_ALREADY_CONNECTED,
};
use crate::feedback::{FeedbackSink, LightbarColor};
use crate::report::input::{InputReport, MAX_RAW_INPUT_REPORT_SIZE};

/// Reports retained per target, oldest dropped first.
pub const REPORT_HISTORY_LIMIT: usize = 256;

#[derive(Default)]
struct TargetSlot {
    ids: Option<DeviceIds>,
    sink: Option<Arc<dyn FeedbackSink>>,
    frames: VecDeque<Bytes>,
    raw_reports: VecDeque<Vec<u8>>,
    report_count: u64,
    pending_output: VecDeque<Vec<u8>>,
}

impl TargetSlot {
    fn is_plugged(&self) -> bool {
        self.ids.is_some()
    }
}

fn push_capped<T>(history: &mut VecDeque<T>, item: T) {
    if history.len() == REPORT_HISTORY_LIMIT {
        history.pop_front();
    }
    history.push_back(item);
}

#[derive(Default)]
struct BusState {
    disposing: bool,
    targets: HashMap<TargetHandle, TargetSlot>,
}

/// Virtual bus that loops reports back to the caller.
///
/// # Examples
///
/// ```
/// use dualsense_bus::transport::{BusTransport, DeviceIds, LoopbackBus};
/// use dualsense_bus::report::input::InputReport;
///
/// let bus = LoopbackBus::new();
/// let target = bus.allocate_target();
/// assert!(bus.add_target(target, DeviceIds { vendor_id: 0x054C, product_id: 0x0CE6 }).is_success());
/// assert!(bus.update_report(target, &InputReport::RESTING).is_success());
/// assert_eq!(bus.submitted_reports(target).len(), 1);
/// ```
#[derive(Default)]
pub struct LoopbackBus {
    state: Mutex<BusState>,
    output_ready: Condvar,
    next_target: AtomicU64,
}

impl std::fmt::Debug for LoopbackBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("LoopbackBus")
            .field("targets", &state.targets.len())
            .field("disposing", &state.disposing)
            .finish_non_exhaustive()
    }
}

impl LoopbackBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an output report for `target`, as a host write would.
    ///
    /// Reports longer than [`OUTPUT_REPORT_SIZE`] are truncated. Returns
    /// `false` if the target is not plugged in.
    pub fn push_output_report(&self, target: TargetHandle, report: &[u8]) -> bool {
        let mut state = self.lock();
        let Some(slot) = state.targets.get_mut(&target).filter(|slot| slot.is_plugged()) else {
            return false;
        };
        let len = report.len().min(OUTPUT_REPORT_SIZE);
        slot.pending_output.push_back(report[..len].to_vec());
        drop(state);

        self.output_ready.notify_all();
        true
    }

    /// Delivers rumble and lightbar values to the registered sink, on the
    /// calling thread. Returns `false` if no sink is registered.
    pub fn emit_feedback(
        &self,
        target: TargetHandle,
        large_motor: u8,
        small_motor: u8,
        lightbar: LightbarColor,
    ) -> bool {
        let sink = self
            .lock()
            .targets
            .get(&target)
            .and_then(|slot| slot.sink.clone());

        match sink {
            Some(sink) => {
                trace!("{}: feedback large={} small={}", target, large_motor, small_motor);
                sink.on_feedback(large_motor, small_motor, lightbar);
                true
            }
            None => false,
        }
    }

    /// Retained structured reports for `target`, oldest first.
    pub fn submitted_reports(&self, target: TargetHandle) -> Vec<InputReport> {
        self.lock()
            .targets
            .get(&target)
            .map(|slot| slot.frames.iter().filter_map(|frame| InputReport::decode(frame)).collect())
            .unwrap_or_default()
    }

    /// Retained structured reports for `target` as wire frames.
    pub fn submitted_frames(&self, target: TargetHandle) -> Vec<Bytes> {
        self.lock()
            .targets
            .get(&target)
            .map(|slot| slot.frames.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Structured reports accepted for `target` since allocation, including
    /// those no longer retained.
    pub fn submitted_count(&self, target: TargetHandle) -> u64 {
        self.lock()
            .targets
            .get(&target)
            .map_or(0, |slot| slot.report_count)
    }

    /// Retained raw reports for `target`, oldest first.
    pub fn raw_reports(&self, target: TargetHandle) -> Vec<Vec<u8>> {
        self.lock()
            .targets
            .get(&target)
            .map(|slot| slot.raw_reports.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// USB identity of a plugged-in target.
    pub fn device_ids(&self, target: TargetHandle) -> Option<DeviceIds> {
        self.lock().targets.get(&target).and_then(|slot| slot.ids)
    }

    pub fn is_plugged(&self, target: TargetHandle) -> bool {
        self.device_ids(target).is_some()
    }

    pub fn has_notification(&self, target: TargetHandle) -> bool {
        self.lock()
            .targets
            .get(&target)
            .is_some_and(|slot| slot.sink.is_some())
    }

    /// Tears the bus down. Pending and future awaits fail with
    /// [`BusStatus::IsDisposing`].
    pub fn shutdown(&self) {
        self.lock().disposing = true;
        self.output_ready.notify_all();
        debug!("Loopback bus disposing");
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Status once the wait predicate is satisfied.
    fn take_output(state: &mut BusState, target: TargetHandle, buffer: &mut OutputBuffer) -> BusStatus {
        if state.disposing {
            return BusStatus::IsDisposing;
        }
        let Some(slot) = state.targets.get_mut(&target).filter(|slot| slot.is_plugged()) else {
            return BusStatus::InvalidTarget;
        };
        match slot.pending_output.pop_front() {
            Some(report) => {
                buffer.fill(0);
                buffer[..report.len()].copy_from_slice(&report);
                BusStatus::Success
            }
            None => BusStatus::TimedOut,
        }
    }

    fn still_waiting(state: &mut BusState, target: TargetHandle) -> bool {
        !state.disposing
            && state
                .targets
                .get(&target)
                .is_some_and(|slot| slot.is_plugged() && slot.pending_output.is_empty())
    }
}

impl BusTransport for LoopbackBus {
    fn allocate_target(&self) -> TargetHandle {
        let target = TargetHandle(self.next_target.fetch_add(1, Ordering::Relaxed) + 1);
        self.lock().targets.insert(target, TargetSlot::default());
        target
    }

    fn add_target(&self, target: TargetHandle, ids: DeviceIds) -> BusStatus {
        let mut state = self.lock();
        if state.disposing {
            return BusStatus::IsDisposing;
        }
        match state.targets.get_mut(&target) {
            None => BusStatus::InvalidTarget,
            Some(slot) if slot.is_plugged() => BusStatus::Other(STATUS_ALREADY_CONNECTED),
            Some(slot) => {
                slot.ids = Some(ids);
                debug!("{} plugged in as {}", target, ids);
                BusStatus::Success
            }
        }
    }

    fn remove_target(&self, target: TargetHandle) -> BusStatus {
        let mut state = self.lock();
        let status = match state.targets.get_mut(&target) {
            Some(slot) if slot.is_plugged() => {
                slot.ids = None;
                slot.sink = None;
                slot.pending_output.clear();
                debug!("{} unplugged", target);
                BusStatus::Success
            }
            _ => BusStatus::InvalidTarget,
        };
        drop(state);

        // Wake awaiters so they observe the unplug
        self.output_ready.notify_all();
        status
    }

    fn free_target(&self, target: TargetHandle) {
        let freed = self.lock().targets.remove(&target).is_some();
        if freed {
            debug!("{} freed", target);
            self.output_ready.notify_all();
        }
    }

    fn register_notification(&self, target: TargetHandle, sink: Arc<dyn FeedbackSink>) -> BusStatus {
        let mut state = self.lock();
        if state.disposing {
            return BusStatus::IsDisposing;
        }
        match state.targets.get_mut(&target) {
            Some(slot) if slot.is_plugged() => {
                if slot.sink.is_some() {
                    return BusStatus::CallbackAlreadyRegistered;
                }
                slot.sink = Some(sink);
                BusStatus::Success
            }
            _ => BusStatus::InvalidTarget,
        }
    }

    fn unregister_notification(&self, target: TargetHandle) {
        if let Some(slot) = self.lock().targets.get_mut(&target) {
            slot.sink = None;
        }
    }

    fn update_report(&self, target: TargetHandle, report: &InputReport) -> BusStatus {
        let mut state = self.lock();
        if state.disposing {
            return BusStatus::IsDisposing;
        }
        match state.targets.get_mut(&target) {
            Some(slot) if slot.is_plugged() => {
                push_capped(&mut slot.frames, report.encode());
                slot.report_count += 1;
                BusStatus::Success
            }
            _ => BusStatus::InvalidTarget,
        }
    }

    fn update_raw_report(&self, target: TargetHandle, buffer: &[u8]) -> BusStatus {
        if buffer.len() > MAX_RAW_INPUT_REPORT_SIZE {
            return BusStatus::InvalidParameter;
        }
        let mut state = self.lock();
        if state.disposing {
            return BusStatus::IsDisposing;
        }
        match state.targets.get_mut(&target) {
            Some(slot) if slot.is_plugged() => {
                push_capped(&mut slot.raw_reports, buffer.to_vec());
                BusStatus::Success
            }
            _ => BusStatus::InvalidTarget,
        }
    }

    fn await_output_report(&self, target: TargetHandle, buffer: &mut OutputBuffer) -> BusStatus {
        let state = self.lock();
        let mut state = self
            .output_ready
            .wait_while(state, |state| Self::still_waiting(state, target))
            .unwrap_or_else(PoisonError::into_inner);
        Self::take_output(&mut state, target, buffer)
    }

    fn await_output_report_timeout(
        &self,
        target: TargetHandle,
        timeout: Duration,
        buffer: &mut OutputBuffer,
    ) -> BusStatus {
        let state = self.lock();
        let (mut state, _) = self
            .output_ready
            .wait_timeout_while(state, timeout, |state| Self::still_waiting(state, target))
            .unwrap_or_else(PoisonError::into_inner);
        Self::take_output(&mut state, target, buffer)
    }

    fn last_os_error(&self) -> i32 {
        std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    const IDS: DeviceIds = DeviceIds {
        vendor_id: 0x054C,
        product_id: 0x0CE6,
    };

    fn plugged() -> (Arc<LoopbackBus>, TargetHandle) {
        let bus = Arc::new(LoopbackBus::new());
        let target = bus.allocate_target();
        assert_eq!(bus.add_target(target, IDS), BusStatus::Success);
        (bus, target)
    }

    #[test]
    fn test_allocate_distinct_handles() {
        let bus = LoopbackBus::new();
        assert_ne!(bus.allocate_target(), bus.allocate_target());
    }

    #[test]
    fn test_unknown_target_is_invalid() {
        let bus = LoopbackBus::new();
        assert_eq!(bus.add_target(TargetHandle(99), IDS), BusStatus::InvalidTarget);
        assert_eq!(
            bus.update_report(TargetHandle(99), &InputReport::RESTING),
            BusStatus::InvalidTarget
        );
    }

    #[test]
    fn test_double_plug_is_rejected() {
        let (bus, target) = plugged();
        assert_eq!(
            bus.add_target(target, IDS),
            BusStatus::Other(STATUS_ALREADY_CONNECTED)
        );
        assert_eq!(bus.device_ids(target), Some(IDS));
    }

    #[test]
    fn test_update_requires_plugged_target() {
        let bus = LoopbackBus::new();
        let target = bus.allocate_target();
        assert_eq!(
            bus.update_report(target, &InputReport::RESTING),
            BusStatus::InvalidTarget
        );
    }

    #[test]
    fn test_double_registration_rejected() {
        let (bus, target) = plugged();
        let hub = Arc::new(crate::feedback::FeedbackHub::new());
        assert_eq!(bus.register_notification(target, hub.clone()), BusStatus::Success);
        assert_eq!(
            bus.register_notification(target, hub.clone()),
            BusStatus::CallbackAlreadyRegistered
        );
        bus.unregister_notification(target);
        assert!(!bus.has_notification(target));
        assert_eq!(bus.register_notification(target, hub), BusStatus::Success);
    }

    #[test]
    fn test_raw_report_limit() {
        let (bus, target) = plugged();
        assert_eq!(bus.update_raw_report(target, &[0u8; 63]), BusStatus::Success);
        assert_eq!(bus.update_raw_report(target, &[0u8; 64]), BusStatus::InvalidParameter);
        assert_eq!(bus.raw_reports(target).len(), 1);
    }

    #[test]
    fn test_pending_output_is_returned_zero_padded() {
        let (bus, target) = plugged();
        let mut buffer = [0xAAu8; OUTPUT_REPORT_SIZE];
        assert!(bus.push_output_report(target, &[0x02, 0xFF, 0x01]));

        assert_eq!(bus.await_output_report(target, &mut buffer), BusStatus::Success);
        assert_eq!(&buffer[..3], &[0x02, 0xFF, 0x01]);
        assert!(buffer[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_timeout_without_output() {
        let (bus, target) = plugged();
        let mut buffer = [0u8; OUTPUT_REPORT_SIZE];
        let start = Instant::now();
        let status =
            bus.await_output_report_timeout(target, Duration::from_millis(50), &mut buffer);
        let elapsed = start.elapsed();

        assert_eq!(status, BusStatus::TimedOut);
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_secs(2));
    }

    #[test]
    fn test_blocking_await_wakes_on_push() {
        let (bus, target) = plugged();
        let host = Arc::clone(&bus);
        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            host.push_output_report(target, &[0x31])
        });

        let mut buffer = [0u8; OUTPUT_REPORT_SIZE];
        assert_eq!(bus.await_output_report(target, &mut buffer), BusStatus::Success);
        assert_eq!(buffer[0], 0x31);
        assert!(writer.join().unwrap());
    }

    #[test]
    fn test_shutdown_releases_waiters() {
        let (bus, target) = plugged();
        let host = Arc::clone(&bus);
        let closer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            host.shutdown();
        });

        let mut buffer = [0u8; OUTPUT_REPORT_SIZE];
        assert_eq!(bus.await_output_report(target, &mut buffer), BusStatus::IsDisposing);
        closer.join().unwrap();
        assert_eq!(bus.update_report(target, &InputReport::RESTING), BusStatus::IsDisposing);
    }

    #[test]
    fn test_unplug_releases_waiters() {
        let (bus, target) = plugged();
        let host = Arc::clone(&bus);
        let closer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            host.remove_target(target)
        });

        let mut buffer = [0u8; OUTPUT_REPORT_SIZE];
        assert_eq!(bus.await_output_report(target, &mut buffer), BusStatus::InvalidTarget);
        assert_eq!(closer.join().unwrap(), BusStatus::Success);
    }

    #[test]
    fn test_history_is_capped() {
        let (bus, target) = plugged();
        let mut report = InputReport::RESTING;
        for i in 0..(REPORT_HISTORY_LIMIT + 44) {
            report.set_buttons_full(i as u16);
            assert_eq!(bus.update_report(target, &report), BusStatus::Success);
            assert_eq!(bus.update_raw_report(target, &[i as u8]), BusStatus::Success);
        }

        let reports = bus.submitted_reports(target);
        assert_eq!(reports.len(), REPORT_HISTORY_LIMIT);
        assert_eq!(reports[0].buttons(), 44);
        assert_eq!(reports[REPORT_HISTORY_LIMIT - 1].buttons(), (REPORT_HISTORY_LIMIT + 43) as u16);
        assert_eq!(bus.raw_reports(target).len(), REPORT_HISTORY_LIMIT);
        assert_eq!(bus.submitted_count(target), (REPORT_HISTORY_LIMIT + 44) as u64);
    }

    #[test]
    fn test_reports_are_recorded_as_wire_frames() {
        let (bus, target) = plugged();
        let mut report = InputReport::RESTING;
        report.set_buttons_full(0x1234);
        bus.update_report(target, &report);

        let frames = bus.submitted_frames(target);
        assert_eq!(frames.len(), 1);
        assert_eq!(&frames[0][..3], &[0x34, 0x12, 0x00]);
        assert_eq!(bus.submitted_reports(target), vec![report]);
    }

    #[test]
    fn test_free_target_drops_slot() {
        let (bus, target) = plugged();
        bus.update_report(target, &InputReport::RESTING);
        assert_eq!(bus.remove_target(target), BusStatus::Success);
        assert_eq!(bus.submitted_count(target), 1);

        bus.free_target(target);
        assert_eq!(bus.submitted_count(target), 0);
        assert!(bus.submitted_reports(target).is_empty());
        assert_eq!(bus.add_target(target, IDS), BusStatus::InvalidTarget);
        assert_eq!(format!("{:?}", bus), "LoopbackBus { targets: 0, disposing: false, .. }");
    }

    #[test]
    fn test_emit_feedback_without_sink() {
        let (bus, target) = plugged();
        assert!(!bus.emit_feedback(target, 1, 2, LightbarColor::default()));
    }
}
