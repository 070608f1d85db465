use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::{PlaybackEvent, PlaybackEventKind, SubscriptionId};

struct Listener {
    id: SubscriptionId,
    kind: PlaybackEventKind,
    tx: Sender<PlaybackEvent>,
}

/// Listener registry shared by handle implementations.
///
/// Emitting never blocks: each listener gets an unbounded channel, and
/// listeners whose receiver is gone are pruned on the next emit.
#[derive(Default)]
pub struct Listeners {
    next_id: AtomicU64,
    inner: Mutex<Vec<Listener>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, kind: PlaybackEventKind) -> (SubscriptionId, Receiver<PlaybackEvent>) {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (tx, rx) = unbounded();
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Listener { id, kind, tx });
        (id, rx)
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    /// Deliver `event` to every listener of its kind; returns the delivery count.
    pub fn emit(&self, event: &PlaybackEvent) -> usize {
        let kind = event.kind();
        let mut delivered = 0;
        let mut listeners = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|l| {
            if l.kind != kind {
                return true;
            }
            match l.tx.send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });
        delivered
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count(&self, kind: PlaybackEventKind) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|l| l.kind == kind)
            .count()
    }
}
