//! State subscription bus.
//!
//! Subscribers receive a full [`BackupWorkerState`] snapshot once when they
//! subscribe and again after every state mutation. Dropping or calling
//! [`Subscription::unsubscribe`] on the returned handle stops delivery.

use crate::state::BackupWorkerState;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// Callback invoked with each state snapshot.
pub type StateCallback = Arc<dyn Fn(&BackupWorkerState) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(u64, StateCallback)>>,
}

/// Fan-out of state snapshots to registered callbacks.
#[derive(Clone, Default)]
pub struct NotificationBus {
    inner: Arc<Subscribers>,
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl NotificationBus {
    /// Create a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` and deliver `current` to it immediately.
    pub fn subscribe(&self, current: &BackupWorkerState, callback: StateCallback) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .callbacks
            .lock()
            .expect("subscriber lock poisoned")
            .push((id, Arc::clone(&callback)));

        callback(current);

        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `state` to every subscriber.
    ///
    /// Callbacks run outside the subscriber lock, so they may subscribe or
    /// unsubscribe themselves.
    pub fn publish(&self, state: &BackupWorkerState) {
        let callbacks: Vec<StateCallback> = self
            .inner
            .callbacks
            .lock()
            .expect("subscriber lock poisoned")
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        for callback in callbacks {
            callback(state);
        }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .callbacks
            .lock()
            .expect("subscriber lock poisoned")
            .len()
    }
}

/// Handle for a registered callback.
///
/// The callback is removed when the handle is dropped.
#[derive(Debug)]
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    bus: Weak<Subscribers>,
}

impl Subscription {
    /// Stop receiving state snapshots.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.callbacks
                .lock()
                .expect("subscriber lock poisoned")
                .retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, StateCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let callback: StateCallback = Arc::new(move |_state: &BackupWorkerState| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    #[test]
    fn test_subscribe_delivers_current_state() {
        let bus = NotificationBus::new();
        let (count, callback) = counter();
        let _sub = bus.subscribe(&BackupWorkerState::default(), callback);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        bus.publish(&BackupWorkerState::default());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = NotificationBus::new();
        let (count, callback) = counter();
        let sub = bus.subscribe(&BackupWorkerState::default(), callback);
        assert_eq!(bus.subscriber_count(), 1);

        sub.unsubscribe();
        assert_eq!(bus.subscriber_count(), 0);

        bus.publish(&BackupWorkerState::default());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_snapshot_contents_delivered() {
        let bus = NotificationBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = bus.subscribe(
            &BackupWorkerState::default(),
            Arc::new(move |state: &BackupWorkerState| {
                sink.lock().unwrap().push(state.is_running);
            }),
        );

        bus.publish(&BackupWorkerState {
            is_running: true,
            ..BackupWorkerState::default()
        });
        assert_eq!(*seen.lock().unwrap(), vec![false, true]);
    }

    #[test]
    fn test_subscription_outliving_bus() {
        let bus = NotificationBus::new();
        let (_count, callback) = counter();
        let sub = bus.subscribe(&BackupWorkerState::default(), callback);
        drop(bus);
        drop(sub);
    }
}
