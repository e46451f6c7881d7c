use log::debug;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Habits,
    Completions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub kind: ChangeKind,
    /// None when the change covers several documents or came from another process
    pub document_id: Option<String>,
}

impl ChangeEvent {
    pub fn new(collection: Collection, kind: ChangeKind, document_id: impl Into<String>) -> Self {
        Self {
            collection,
            kind,
            document_id: Some(document_id.into()),
        }
    }

    pub fn bulk(collection: Collection, kind: ChangeKind) -> Self {
        Self {
            collection,
            kind,
            document_id: None,
        }
    }
}

pub type Callback = Box<dyn Fn(&ChangeEvent) + Send + Sync>;

struct Subscriber {
    collection: Collection,
    callback: Arc<dyn Fn(&ChangeEvent) + Send + Sync>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: BTreeMap<u64, Subscriber>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    // A panicking callback runs outside the lock, so poisoning only means a
    // panic elsewhere; the map itself is still consistent.
    registry.lock().unwrap_or_else(|e| e.into_inner())
}

/// In-process publish/subscribe for store mutations.
#[derive(Clone, Default)]
pub struct ChangeFeed {
    registry: Arc<Mutex<Registry>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, collection: Collection, callback: Callback) -> Subscription {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.insert(
            id,
            Subscriber {
                collection,
                callback: Arc::from(callback),
            },
        );
        debug!("subscriber {} attached to {:?}", id, collection);

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
            active: true,
        }
    }

    /// Deliver `event` to every subscriber of its collection.
    ///
    /// Callbacks run after the registry lock is released, so they may
    /// subscribe or cancel without deadlocking.
    pub fn publish(&self, event: &ChangeEvent) {
        let targets: Vec<Arc<dyn Fn(&ChangeEvent) + Send + Sync>> = lock(&self.registry)
            .subscribers
            .values()
            .filter(|s| s.collection == event.collection)
            .map(|s| Arc::clone(&s.callback))
            .collect();

        debug!("publishing {:?} to {} subscribers", event, targets.len());
        for callback in targets {
            callback(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).subscribers.len()
    }
}

/// Handle for a live subscription. Cancelling or dropping it detaches the
/// callback; either way it is released exactly once.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
    active: bool,
}

impl Subscription {
    pub fn cancel(mut self) {
        self.release();
    }

    pub fn is_active(&self) -> bool {
        self.active && self.registry.strong_count() > 0
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).subscribers.remove(&self.id);
            debug!("subscriber {} released", self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter(feed: &ChangeFeed, collection: Collection) -> (Arc<AtomicUsize>, Subscription) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let sub = feed.subscribe(
            collection,
            Box::new(move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (hits, sub)
    }

    #[test]
    fn delivers_only_matching_collection() {
        let feed = ChangeFeed::new();
        let (habit_hits, _h) = counter(&feed, Collection::Habits);
        let (done_hits, _c) = counter(&feed, Collection::Completions);

        feed.publish(&ChangeEvent::new(Collection::Completions, ChangeKind::Create, "c1"));
        feed.publish(&ChangeEvent::bulk(Collection::Completions, ChangeKind::Update));

        assert_eq!(habit_hits.load(Ordering::SeqCst), 0);
        assert_eq!(done_hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn cancel_stops_delivery() {
        let feed = ChangeFeed::new();
        let (hits, sub) = counter(&feed, Collection::Habits);
        feed.publish(&ChangeEvent::bulk(Collection::Habits, ChangeKind::Delete));
        sub.cancel();
        feed.publish(&ChangeEvent::bulk(Collection::Habits, ChangeKind::Delete));

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn drop_releases_once_without_touching_others() {
        let feed = ChangeFeed::new();
        let (_a_hits, a) = counter(&feed, Collection::Habits);
        let (b_hits, _b) = counter(&feed, Collection::Habits);
        assert_eq!(feed.subscriber_count(), 2);

        drop(a);
        assert_eq!(feed.subscriber_count(), 1);
        feed.publish(&ChangeEvent::bulk(Collection::Habits, ChangeKind::Update));
        assert_eq!(b_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscription_outliving_feed_is_harmless() {
        let feed = ChangeFeed::new();
        let (_hits, sub) = counter(&feed, Collection::Habits);
        drop(feed);
        assert!(!sub.is_active());
        sub.cancel();
    }

    #[test]
    fn callback_may_subscribe_during_publish() {
        let feed = ChangeFeed::new();
        let inner_feed = feed.clone();
        let spawned: Arc<Mutex<Vec<Subscription>>> = Arc::new(Mutex::new(Vec::new()));
        let keep = Arc::clone(&spawned);
        let _outer = feed.subscribe(
            Collection::Habits,
            Box::new(move |_| {
                let sub = inner_feed.subscribe(Collection::Completions, Box::new(|_| {}));
                keep.lock().unwrap().push(sub);
            }),
        );

        feed.publish(&ChangeEvent::bulk(Collection::Habits, ChangeKind::Create));
        assert_eq!(feed.subscriber_count(), 2);
        spawned.lock().unwrap().clear();
        assert_eq!(feed.subscriber_count(), 1);
    }
}
