//! Progress events with last-value replay.
//!
//! Each run has at most one live subscriber. Attaching a new one replaces the
//! previous sink, which closes the old receiver. There is no fan-out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use reel_models::{ProgressEvent, RunId};

/// Sending half handed to [`ProgressChannel::subscribe`].
pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// Receiving half held by an observer.
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Identity of one attached subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

#[derive(Default)]
struct Slot {
    last: Option<ProgressEvent>,
    sink: Option<(SubscriberId, ProgressSender)>,
}

/// Per-run last-known state plus the single live observer.
#[derive(Default)]
pub struct ProgressChannel {
    slots: Mutex<HashMap<RunId, Slot>>,
    next_subscriber: AtomicU64,
}

impl ProgressChannel {
    /// Create a new progress channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `event` as the run's last-known state and forward it to the
    /// attached subscriber, if any.
    ///
    /// A subscriber whose receiver is gone is detached; the run is unaffected.
    pub async fn publish(&self, id: &RunId, event: ProgressEvent) {
        let mut slots = self.slots.lock().await;
        let slot = slots.entry(id.clone()).or_default();

        if let Some((subscriber, sink)) = &slot.sink {
            if sink.send(event.clone()).is_err() {
                debug!(run_id = %id, subscriber = subscriber.0, "Subscriber gone, detaching");
                slot.sink = None;
            }
        }

        slot.last = Some(event);
    }

    /// Attach `sink` as the sole live observer of a run.
    ///
    /// Any previous sink is dropped. The last-known state, if there is one,
    /// is pushed to the new sink immediately. Returns `None` for a run that
    /// has never published or was already removed.
    pub async fn subscribe(&self, id: &RunId, sink: ProgressSender) -> Option<SubscriberId> {
        let mut slots = self.slots.lock().await;
        let slot = slots.get_mut(id)?;
        let subscriber = SubscriberId(self.next_subscriber.fetch_add(1, Ordering::Relaxed));

        if let Some(last) = &slot.last {
            // A closed sink just means the observer left before attaching
            let _ = sink.send(last.clone());
        }

        if slot.sink.replace((subscriber, sink)).is_some() {
            debug!(run_id = %id, "Replaced previous subscriber");
        }

        Some(subscriber)
    }

    /// Detach whatever subscriber is attached to a run.
    pub async fn unsubscribe(&self, id: &RunId) {
        if let Some(slot) = self.slots.lock().await.get_mut(id) {
            slot.sink = None;
        }
    }

    /// Detach `subscriber` only if it is still the attached one.
    ///
    /// Used on disconnect so a stale observer cannot detach its replacement.
    pub async fn detach(&self, id: &RunId, subscriber: SubscriberId) {
        if let Some(slot) = self.slots.lock().await.get_mut(id) {
            if matches!(&slot.sink, Some((current, _)) if *current == subscriber) {
                slot.sink = None;
            }
        }
    }

    /// Last-known state of a run.
    pub async fn last(&self, id: &RunId) -> Option<ProgressEvent> {
        self.slots.lock().await.get(id).and_then(|s| s.last.clone())
    }

    /// Whether a subscriber is currently attached.
    pub async fn has_subscriber(&self, id: &RunId) -> bool {
        self.slots
            .lock()
            .await
            .get(id)
            .is_some_and(|s| s.sink.is_some())
    }

    /// Forget a run entirely. An attached subscriber sees its stream end.
    pub async fn remove(&self, id: &RunId) {
        self.slots.lock().await.remove(id);
    }

    /// Forget every run.
    pub async fn clear(&self) {
        self.slots.lock().await.clear();
    }
}
