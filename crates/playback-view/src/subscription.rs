use std::sync::{Arc, Weak};

use crossbeam_channel::Receiver;
use playback_types::{PlaybackEvent, PlaybackEventKind, PlaybackHandle, SubscriptionId};

/// One registered listener on a playback handle.
///
/// Dropping the guard unsubscribes. Notifications still queued in the receiver
/// are discarded with it.
pub struct Subscription {
    id: SubscriptionId,
    kind: PlaybackEventKind,
    rx: Receiver<PlaybackEvent>,
    handle: Weak<dyn PlaybackHandle>,
}

impl Subscription {
    pub fn acquire(handle: &Arc<dyn PlaybackHandle>, kind: PlaybackEventKind) -> Self {
        let (id, rx) = handle.subscribe(kind);
        tracing::debug!(event = kind.as_str(), id = id.0, "subscribed");
        Self {
            id,
            kind,
            rx,
            handle: Arc::downgrade(handle),
        }
    }

    pub fn kind(&self) -> PlaybackEventKind {
        self.kind
    }

    /// Take every notification received so far.
    pub fn drain(&self) -> impl Iterator<Item = PlaybackEvent> + '_ {
        let kind = self.kind;
        self.rx.try_iter().filter(move |ev| ev.kind() == kind)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.upgrade() {
            handle.unsubscribe(self.id);
            tracing::debug!(event = self.kind.as_str(), id = self.id.0, "unsubscribed");
        }
    }
}

/// Exactly one subscription per notification kind.
#[derive(Default)]
pub struct SubscriptionSet {
    subs: Vec<Subscription>,
}

impl SubscriptionSet {
    pub fn acquire_all(handle: &Arc<dyn PlaybackHandle>) -> Self {
        let subs = PlaybackEventKind::ALL
            .iter()
            .map(|kind| Subscription::acquire(handle, *kind))
            .collect();
        Self { subs }
    }

    /// Pending notifications, grouped by kind in [`PlaybackEventKind::ALL`] order.
    pub fn drain(&self) -> Vec<PlaybackEvent> {
        self.subs.iter().flat_map(|sub| sub.drain()).collect()
    }

    pub fn len(&self) -> usize {
        self.subs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }

    pub fn release(&mut self) {
        self.subs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeHandle;

    #[test]
    fn acquire_all_subscribes_once_per_kind() {
        let fake = FakeHandle::new();
        let handle: Arc<dyn PlaybackHandle> = fake.clone();
        let set = SubscriptionSet::acquire_all(&handle);
        assert_eq!(set.len(), 4);
        for kind in PlaybackEventKind::ALL {
            assert_eq!(fake.listeners.count(kind), 1);
        }
    }

    #[test]
    fn dropping_the_set_unsubscribes() {
        let fake = FakeHandle::new();
        let handle: Arc<dyn PlaybackHandle> = fake.clone();
        let set = SubscriptionSet::acquire_all(&handle);
        fake.listeners.emit(&PlaybackEvent::Ended);
        drop(set);
        assert!(fake.listeners.is_empty());
    }

    #[test]
    fn drain_orders_metadata_before_time() {
        let fake = FakeHandle::new();
        let handle: Arc<dyn PlaybackHandle> = fake.clone();
        let set = SubscriptionSet::acquire_all(&handle);
        fake.listeners.emit(&PlaybackEvent::TimeUpdate { current_time: 1.0 });
        fake.listeners.emit(&PlaybackEvent::LoadedMetadata { duration: 9.0 });
        let events = set.drain();
        assert_eq!(
            events,
            vec![
                PlaybackEvent::LoadedMetadata { duration: 9.0 },
                PlaybackEvent::TimeUpdate { current_time: 1.0 },
            ]
        );
        assert!(set.drain().is_empty());
    }

    #[test]
    fn guard_outliving_handle_is_harmless() {
        let fake = FakeHandle::new();
        let handle: Arc<dyn PlaybackHandle> = fake;
        let sub = Subscription::acquire(&handle, PlaybackEventKind::Ended);
        drop(handle);
        drop(sub);
    }
}
