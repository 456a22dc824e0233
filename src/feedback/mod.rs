//! # Feedback Module
//!
//! Force-feedback and lightbar notifications coming back from the host.
//!
//! The bus transport calls [`FeedbackSink::on_feedback`] on its own
//! notification thread. [`FeedbackHub`] turns those raw values into a
//! [`FeedbackEvent`] and hands it to every subscriber synchronously, in
//! subscription order, on that same thread. A slow listener therefore stalls
//! the transport's notification thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::trace;

/// Lightbar RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct LightbarColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl LightbarColor {
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

/// Snapshot of one feedback notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeedbackEvent {
    large_motor: u8,
    small_motor: u8,
    lightbar: LightbarColor,
}

impl FeedbackEvent {
    pub(crate) fn new(large_motor: u8, small_motor: u8, lightbar: LightbarColor) -> Self {
        Self {
            large_motor,
            small_motor,
            lightbar,
        }
    }

    /// Intensity of the large rumble motor.
    pub fn large_motor(&self) -> u8 {
        self.large_motor
    }

    /// Intensity of the small rumble motor.
    pub fn small_motor(&self) -> u8 {
        self.small_motor
    }

    pub fn lightbar(&self) -> LightbarColor {
        self.lightbar
    }
}

/// Receiver of feedback events.
///
/// Implemented for any `Fn(&FeedbackEvent) + Send + Sync` closure.
pub trait FeedbackListener: Send + Sync {
    fn on_event(&self, event: &FeedbackEvent);
}

impl<F> FeedbackListener for F
where
    F: Fn(&FeedbackEvent) + Send + Sync,
{
    fn on_event(&self, event: &FeedbackEvent) {
        self(event)
    }
}

/// Entry point the transport adapts its native notification callback onto.
pub trait FeedbackSink: Send + Sync {
    fn on_feedback(&self, large_motor: u8, small_motor: u8, lightbar: LightbarColor);
}

/// Handle returned by [`FeedbackHub::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Ordered list of feedback listeners.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use dualsense_bus::feedback::{FeedbackHub, FeedbackSink, LightbarColor};
///
/// let hub = FeedbackHub::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&seen);
/// hub.subscribe(move |event: &dualsense_bus::feedback::FeedbackEvent| {
///     sink.lock().unwrap().push(event.large_motor());
/// });
///
/// hub.on_feedback(200, 10, LightbarColor::new(0, 0, 255));
/// assert_eq!(*seen.lock().unwrap(), vec![200]);
/// ```
#[derive(Default)]
pub struct FeedbackHub {
    listeners: Mutex<Vec<(SubscriptionId, Arc<dyn FeedbackListener>)>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for FeedbackHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackHub")
            .field("listeners", &self.len())
            .finish_non_exhaustive()
    }
}

impl FeedbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a listener. It receives events after all earlier listeners.
    pub fn subscribe(&self, listener: impl FeedbackListener + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers `event` to every listener in subscription order.
    pub fn publish(&self, event: &FeedbackEvent) {
        // Snapshot so listeners may (un)subscribe from inside the callback
        let listeners: Vec<Arc<dyn FeedbackListener>> = self
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        trace!("Dispatching {:?} to {} listener(s)", event, listeners.len());
        for listener in listeners {
            listener.on_event(event);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, Arc<dyn FeedbackListener>)>> {
        // A listener panicking during publish must not disable the hub
        self.listeners
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl FeedbackSink for FeedbackHub {
    fn on_feedback(&self, large_motor: u8, small_motor: u8, lightbar: LightbarColor) {
        self.publish(&FeedbackEvent::new(large_motor, small_motor, lightbar));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<(&'static str, FeedbackEvent)>>>, impl Fn(&'static str) -> Box<dyn Fn(&FeedbackEvent) + Send + Sync>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let shared = Arc::clone(&log);
        let make = move |tag: &'static str| {
            let log = Arc::clone(&shared);
            Box::new(move |event: &FeedbackEvent| log.lock().unwrap().push((tag, *event)))
                as Box<dyn Fn(&FeedbackEvent) + Send + Sync>
        };
        (log, make)
    }

    #[test]
    fn test_fan_out_in_subscription_order() {
        let hub = FeedbackHub::new();
        let (log, make) = recorder();
        hub.subscribe(make("first"));
        hub.subscribe(make("second"));

        hub.on_feedback(255, 64, LightbarColor::new(1, 2, 3));

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].0, "first");
        assert_eq!(log[1].0, "second");
        for (_, event) in log.iter() {
            assert_eq!(event.large_motor(), 255);
            assert_eq!(event.small_motor(), 64);
            assert_eq!(event.lightbar(), LightbarColor::new(1, 2, 3));
        }
    }

    #[test]
    fn test_unsubscribe() {
        let hub = FeedbackHub::new();
        let (log, make) = recorder();
        let first = hub.subscribe(make("first"));
        hub.subscribe(make("second"));

        assert!(hub.unsubscribe(first));
        assert!(!hub.unsubscribe(first));
        hub.on_feedback(1, 1, LightbarColor::default());

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, "second");
    }

    #[test]
    fn test_no_listeners_is_noop() {
        let hub = FeedbackHub::new();
        assert!(hub.is_empty());
        hub.on_feedback(0, 0, LightbarColor::default());
    }

    #[test]
    fn test_listener_may_subscribe_during_publish() {
        let hub = Arc::new(FeedbackHub::new());
        let inner = Arc::clone(&hub);
        hub.subscribe(move |_: &FeedbackEvent| {
            inner.subscribe(|_: &FeedbackEvent| {});
        });

        hub.on_feedback(0, 0, LightbarColor::default());
        assert_eq!(hub.len(), 2);
    }

    #[test]
    fn test_lightbar_equality_is_structural() {
        assert_eq!(LightbarColor::new(10, 20, 30), LightbarColor::new(10, 20, 30));
        assert_ne!(LightbarColor::new(10, 20, 30), LightbarColor::new(10, 20, 31));
    }

    #[test]
    fn test_event_serializes_as_json() {
        let event = FeedbackEvent::new(1, 2, LightbarColor::new(3, 4, 5));
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"large_motor":1,"small_motor":2,"lightbar":{"red":3,"green":4,"blue":5}}"#
        );
    }
}
