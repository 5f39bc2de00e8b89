// ── Event subscriber registry ──
//
// A mutex-guarded table of subscriber queues. The reader task holds the
// lock for a whole fan-out pass, so a subscriber is either present for
// the entire delivery of an event or absent for all of it.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::Stream;
use indexmap::IndexMap;
use tokio::sync::{Mutex, mpsc};

use crate::messages::StateChange;

/// Per-subscriber queue depth. Delivery awaits free space, so a full
/// queue stalls the whole pipeline instead of buffering without bound.
pub const SUBSCRIBER_QUEUE_CAPACITY: usize = 16;

#[derive(Clone, Default)]
pub(crate) struct Registry {
    inner: Arc<Mutex<Slots>>,
}

#[derive(Default)]
struct Slots {
    next_id: u64,
    subscribers: IndexMap<u64, mpsc::Sender<StateChange>>,
    closed: bool,
}

impl Registry {
    /// Register a new subscriber. After [`close_all`](Self::close_all) the
    /// returned stream is already at its end.
    pub(crate) async fn subscribe(&self) -> (StateChangeStream, Unsubscribe) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);

        let mut slots = self.inner.lock().await;
        let id = slots.next_id;
        slots.next_id += 1;
        if !slots.closed {
            slots.subscribers.insert(id, tx);
        }
        drop(slots);

        (
            StateChangeStream { rx },
            Unsubscribe {
                registry: self.clone(),
                id,
            },
        )
    }

    async fn remove(&self, id: u64) {
        self.inner.lock().await.subscribers.shift_remove(&id);
    }

    /// Fan one event out to every current subscriber, in registration order.
    ///
    /// Subscribers whose stream was dropped are pruned. Returns the number
    /// of subscribers that received the event.
    pub(crate) async fn deliver(&self, change: &StateChange) -> usize {
        let mut slots = self.inner.lock().await;
        let mut gone = Vec::new();

        for (id, tx) in &slots.subscribers {
            if tx.send(change.clone()).await.is_err() {
                gone.push(*id);
            }
        }

        for id in &gone {
            slots.subscribers.shift_remove(id);
        }
        if !gone.is_empty() {
            tracing::debug!(pruned = gone.len(), "removed dropped subscribers");
        }

        slots.subscribers.len()
    }

    /// Drop every subscriber queue, ending all streams, and refuse new ones.
    pub(crate) async fn close_all(&self) {
        let mut slots = self.inner.lock().await;
        slots.closed = true;
        slots.subscribers.clear();
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.inner.lock().await.subscribers.len()
    }
}

// ── Subscriber handles ───────────────────────────────────────────────

/// Receiving end of a state-change subscription.
///
/// Yields events in the order the hub sent them; returns `None` once the
/// subscription is removed or the client is closed.
pub struct StateChangeStream {
    rx: mpsc::Receiver<StateChange>,
}

impl StateChangeStream {
    pub async fn recv(&mut self) -> Option<StateChange> {
        self.rx.recv().await
    }
}

impl Stream for StateChangeStream {
    type Item = StateChange;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Removes one subscription from the registry. Safe to call repeatedly,
/// including after the client has closed.
///
/// Delivery holds the registry lock while waiting on a full queue, so
/// drop (or keep draining) the stream before awaiting `unsubscribe`.
#[derive(Clone)]
pub struct Unsubscribe {
    registry: Registry,
    id: u64,
}

impl Unsubscribe {
    pub async fn unsubscribe(&self) {
        self.registry.remove(self.id).await;
    }
}
