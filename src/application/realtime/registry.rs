//! Subscription Registry
//!
//! Owns the live mapping `chat -> subscriber -> bounded queue`. A chat entry
//! exists only while it has at least one subscription, and each
//! `(chat, subscriber)` pair has at most one live queue.
//!
//! The map sits behind a single `parking_lot::Mutex` that is held only for
//! map reads and writes. Nothing awaits or sends while holding it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::envelope::Envelope;
use super::RealtimeError;
use crate::infrastructure::metrics;

/// Process-unique identifier of one installed subscription.
pub type SubscriptionId = u64;

/// Write side of a subscription, owned by the registry.
struct Subscription {
    id: SubscriptionId,
    sender: mpsc::Sender<Arc<Envelope>>,
    closed: CancellationToken,
    created_at: DateTime<Utc>,
}

impl Subscription {
    fn close(&self) {
        self.closed.cancel();
    }
}

#[derive(Default)]
struct RegistryInner {
    chats: HashMap<i64, HashMap<i64, Subscription>>,
    shut_down: bool,
}

impl RegistryInner {
    /// Remove the subscription for `(chat, user)`, optionally only when it is
    /// still the one identified by `expected`.
    fn remove(&mut self, chat_id: i64, user_id: i64, expected: Option<SubscriptionId>) -> bool {
        let Some(subscribers) = self.chats.get_mut(&chat_id) else {
            return false;
        };

        let matches = match (subscribers.get(&user_id), expected) {
            (Some(sub), Some(id)) => sub.id == id,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !matches {
            return false;
        }

        if let Some(sub) = subscribers.remove(&user_id) {
            sub.close();
        }
        if subscribers.is_empty() {
            self.chats.remove(&chat_id);
        }
        true
    }
}

/// Read side of a subscription, handed to the delivery session.
pub struct SubscriptionHandle {
    chat_id: i64,
    user_id: i64,
    id: SubscriptionId,
    receiver: mpsc::Receiver<Arc<Envelope>>,
    closed: CancellationToken,
}

impl SubscriptionHandle {
    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Whether the registry has retired this subscription.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Wait for the next envelope.
    ///
    /// Returns `None` once the registry closes the subscription (replaced,
    /// evicted, unsubscribed or shut down). Envelopes still buffered at that
    /// point are discarded.
    pub async fn recv(&mut self) -> Option<Arc<Envelope>> {
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => None,
            next = self.receiver.recv() => next,
        }
    }

    /// Non-blocking receive, `None` if nothing is queued or the subscription is closed.
    pub fn try_recv(&mut self) -> Option<Arc<Envelope>> {
        if self.is_closed() {
            return None;
        }
        self.receiver.try_recv().ok()
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("chat_id", &self.chat_id)
            .field("user_id", &self.user_id)
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A queue captured by [`SubscriptionRegistry::snapshot`] for delivery outside the lock.
pub(crate) struct QueueSnapshot {
    pub user_id: i64,
    pub id: SubscriptionId,
    pub sender: mpsc::Sender<Arc<Envelope>>,
}

/// Point-in-time registry figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub chats: usize,
    pub subscriptions: usize,
    pub subscribes_total: u64,
    pub unsubscribes_total: u64,
    pub evictions_total: u64,
}

/// Registry of live chat subscriptions.
pub struct SubscriptionRegistry {
    inner: Mutex<RegistryInner>,
    capacity: usize,
    next_id: AtomicU64,
    subscribes: AtomicU64,
    unsubscribes: AtomicU64,
    evictions: AtomicU64,
}

impl SubscriptionRegistry {
    /// Create a registry whose queues hold `capacity` envelopes each.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
            capacity: capacity.max(1),
            next_id: AtomicU64::new(1),
            subscribes: AtomicU64::new(0),
            unsubscribes: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Install a fresh queue for `(chat_id, user_id)`.
    ///
    /// An existing queue for the same pair is closed and replaced in the same
    /// critical section, so there is never more than one live queue per pair.
    pub fn subscribe(&self, chat_id: i64, user_id: i64) -> Result<SubscriptionHandle, RealtimeError> {
        let (sender, receiver) = mpsc::channel(self.capacity);
        let closed = CancellationToken::new();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let replaced = {
            let mut inner = self.inner.lock();
            if inner.shut_down {
                return Err(RealtimeError::ShuttingDown);
            }

            let previous = inner.chats.entry(chat_id).or_default().insert(
                user_id,
                Subscription {
                    id,
                    sender,
                    closed: closed.clone(),
                    created_at: Utc::now(),
                },
            );
            previous.map(|prev| {
                prev.close();
                prev.id
            })
        };

        self.subscribes.fetch_add(1, Ordering::Relaxed);
        match replaced {
            Some(previous_id) => tracing::info!(
                chat_id,
                user_id,
                subscription_id = id,
                previous_id,
                "Replaced existing chat subscription"
            ),
            None => tracing::info!(chat_id, user_id, subscription_id = id, "User subscribed to chat"),
        }

        Ok(SubscriptionHandle {
            chat_id,
            user_id,
            id,
            receiver,
            closed,
        })
    }

    /// Close and remove whatever queue is installed for `(chat_id, user_id)`.
    ///
    /// Idempotent; returns whether a subscription was removed.
    pub fn unsubscribe(&self, chat_id: i64, user_id: i64) -> bool {
        let removed = self.inner.lock().remove(chat_id, user_id, None);
        if removed {
            self.unsubscribes.fetch_add(1, Ordering::Relaxed);
            tracing::info!(chat_id, user_id, "User unsubscribed from chat");
        }
        removed
    }

    /// Remove the subscription only if it is still the one identified by `id`.
    pub fn unsubscribe_subscription(&self, chat_id: i64, user_id: i64, id: SubscriptionId) -> bool {
        let removed = self.inner.lock().remove(chat_id, user_id, Some(id));
        if removed {
            self.unsubscribes.fetch_add(1, Ordering::Relaxed);
            tracing::info!(chat_id, user_id, subscription_id = id, "User unsubscribed from chat");
        } else {
            tracing::debug!(
                chat_id,
                user_id,
                subscription_id = id,
                "Subscription already retired"
            );
        }
        removed
    }

    /// Evict a saturated or abandoned subscriber.
    pub(crate) fn evict(&self, chat_id: i64, user_id: i64, id: SubscriptionId) -> bool {
        let removed = self.inner.lock().remove(chat_id, user_id, Some(id));
        if removed {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            metrics::record_realtime_eviction();
            tracing::warn!(chat_id, user_id, subscription_id = id, "Evicted chat subscriber");
        }
        removed
    }

    /// Copy the chat's queues so delivery can happen without the lock.
    pub(crate) fn snapshot(&self, chat_id: i64) -> Vec<QueueSnapshot> {
        let inner = self.inner.lock();
        inner
            .chats
            .get(&chat_id)
            .map(|subscribers| {
                subscribers
                    .iter()
                    .map(|(user_id, sub)| QueueSnapshot {
                        user_id: *user_id,
                        id: sub.id,
                        sender: sub.sender.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, chat_id: i64, user_id: i64) -> bool {
        self.inner
            .lock()
            .chats
            .get(&chat_id)
            .is_some_and(|subscribers| subscribers.contains_key(&user_id))
    }

    /// When the current subscription for the pair was installed.
    pub fn subscribed_since(&self, chat_id: i64, user_id: i64) -> Option<DateTime<Utc>> {
        self.inner
            .lock()
            .chats
            .get(&chat_id)
            .and_then(|subscribers| subscribers.get(&user_id))
            .map(|sub| sub.created_at)
    }

    pub fn subscriber_count(&self, chat_id: i64) -> usize {
        self.inner.lock().chats.get(&chat_id).map_or(0, HashMap::len)
    }

    pub fn total_subscriptions(&self) -> usize {
        self.inner.lock().chats.values().map(HashMap::len).sum()
    }

    pub fn chat_count(&self) -> usize {
        self.inner.lock().chats.len()
    }

    pub fn stats(&self) -> RegistryStats {
        let (chats, subscriptions) = {
            let inner = self.inner.lock();
            (inner.chats.len(), inner.chats.values().map(HashMap::len).sum())
        };

        RegistryStats {
            chats,
            subscriptions,
            subscribes_total: self.subscribes.load(Ordering::Relaxed),
            unsubscribes_total: self.unsubscribes.load(Ordering::Relaxed),
            evictions_total: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.lock().shut_down
    }

    /// Close every queue and refuse further subscriptions.
    pub fn shutdown(&self) {
        let drained: Vec<Subscription> = {
            let mut inner = self.inner.lock();
            inner.shut_down = true;
            inner
                .chats
                .drain()
                .flat_map(|(_, subscribers)| subscribers.into_values())
                .collect()
        };

        for sub in &drained {
            sub.close();
        }
        tracing::info!(closed = drained.len(), "Subscription registry shut down");
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_installs_queue() {
        let registry = SubscriptionRegistry::new(4);
        let handle = registry.subscribe(1, 10).unwrap();

        assert!(registry.is_subscribed(1, 10));
        assert_eq!(registry.subscriber_count(1), 1);
        assert_eq!(registry.chat_count(), 1);
        assert_eq!(handle.chat_id(), 1);
        assert_eq!(handle.user_id(), 10);
        assert!(registry.subscribed_since(1, 10).is_some());
    }

    #[test]
    fn test_eviction_is_counted_when_it_happens() {
        let registry = SubscriptionRegistry::new(4);
        let handle = registry.subscribe(1, 10).unwrap();
        let exported_before = metrics::REALTIME_EVICTIONS_TOTAL.get();

        assert!(registry.evict(1, 10, handle.id()));
        assert!(!registry.evict(1, 10, handle.id()));

        assert_eq!(registry.stats().evictions_total, 1);
        assert!(metrics::REALTIME_EVICTIONS_TOTAL.get() > exported_before);
    }

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let registry = SubscriptionRegistry::new(4);
        let handle = registry.subscribe(1, 10).unwrap();

        assert!(registry.unsubscribe(1, 10));
        assert!(!registry.unsubscribe(1, 10));
        assert!(!registry.unsubscribe(99, 10));

        assert!(handle.is_closed());
        assert_eq!(registry.chat_count(), 0);
        assert_eq!(registry.stats().unsubscribes_total, 1);
    }

    #[test]
    fn test_resubscribe_replaces_and_closes_previous() {
        let registry = SubscriptionRegistry::new(4);
        let first = registry.subscribe(1, 10).unwrap();
        let second = registry.subscribe(1, 10).unwrap();

        assert!(first.is_closed());
        assert!(!second.is_closed());
        assert_ne!(first.id(), second.id());
        assert_eq!(registry.subscriber_count(1), 1);
    }

    #[test]
    fn test_stale_subscription_cannot_remove_successor() {
        let registry = SubscriptionRegistry::new(4);
        let first = registry.subscribe(1, 10).unwrap();
        let second = registry.subscribe(1, 10).unwrap();

        assert!(!registry.unsubscribe_subscription(1, 10, first.id()));
        assert!(registry.is_subscribed(1, 10));

        assert!(registry.unsubscribe_subscription(1, 10, second.id()));
        assert!(!registry.is_subscribed(1, 10));
    }

    #[test]
    fn test_chat_entry_removed_only_when_empty() {
        let registry = SubscriptionRegistry::new(4);
        let _a = registry.subscribe(1, 10).unwrap();
        let _b = registry.subscribe(1, 11).unwrap();

        registry.unsubscribe(1, 10);
        assert_eq!(registry.chat_count(), 1);

        registry.unsubscribe(1, 11);
        assert_eq!(registry.chat_count(), 0);
    }

    #[test]
    fn test_shutdown_closes_everything() {
        let registry = SubscriptionRegistry::new(4);
        let a = registry.subscribe(1, 10).unwrap();
        let b = registry.subscribe(2, 20).unwrap();

        registry.shutdown();

        assert!(a.is_closed());
        assert!(b.is_closed());
        assert_eq!(registry.total_subscriptions(), 0);
        assert!(matches!(registry.subscribe(1, 10), Err(RealtimeError::ShuttingDown)));
    }

    #[tokio::test]
    async fn test_closed_handle_yields_none() {
        let registry = SubscriptionRegistry::new(4);
        let mut handle = registry.subscribe(1, 10).unwrap();

        registry.unsubscribe(1, 10);

        assert!(handle.recv().await.is_none());
    }
}
