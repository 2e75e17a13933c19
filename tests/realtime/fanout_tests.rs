//! Registry and dispatcher behaviour through the public API

use std::sync::Arc;

use pretty_assertions::assert_eq;
use tokio_test::assert_ok;

use messaging_server::application::realtime::{BroadcastOutcome, Dispatcher, SubscriptionRegistry};

use super::envelope;

fn dispatcher(capacity: usize) -> (Arc<SubscriptionRegistry>, Dispatcher) {
    let registry = Arc::new(SubscriptionRegistry::new(capacity));
    let dispatcher = Dispatcher::new(Arc::clone(&registry));
    (registry, dispatcher)
}

#[test]
fn test_subscribe_unsubscribe_parity() {
    let registry = SubscriptionRegistry::new(8);

    let _a = assert_ok!(registry.subscribe(1, 10));
    let _b = assert_ok!(registry.subscribe(1, 11));
    let _c = assert_ok!(registry.subscribe(2, 10));
    assert_eq!(registry.total_subscriptions(), 3);

    assert!(registry.unsubscribe(1, 10));
    assert!(registry.unsubscribe(1, 11));
    assert!(registry.unsubscribe(2, 10));
    // Repeats are no-ops
    assert!(!registry.unsubscribe(1, 10));
    assert!(!registry.unsubscribe(2, 10));

    let stats = registry.stats();
    assert_eq!(stats.subscriptions, 0);
    assert_eq!(stats.chats, 0);
    assert_eq!(stats.subscribes_total, stats.unsubscribes_total);
}

#[tokio::test]
async fn test_every_subscriber_receives_every_broadcast_in_order() {
    let (registry, dispatcher) = dispatcher(64);
    let mut handles: Vec<_> = (0..5)
        .map(|user| registry.subscribe(1, 100 + user).unwrap())
        .collect();

    for seq in 0..20 {
        let outcome = dispatcher.broadcast(1, envelope(1, seq));
        assert_eq!(outcome, BroadcastOutcome { delivered: 5, evicted: 0 });
    }

    for handle in &mut handles {
        for seq in 0..20u64 {
            let received = handle.recv().await.expect("envelope");
            assert_eq!(received.message_id, seq.to_string());
        }
        assert!(handle.try_recv().is_none());
    }
}

#[tokio::test]
async fn test_saturated_subscriber_is_evicted() {
    let (registry, dispatcher) = dispatcher(100);
    let mut slow = registry.subscribe(1, 10).unwrap();
    let mut fast = registry.subscribe(1, 11).unwrap();

    for seq in 0..100 {
        let outcome = dispatcher.broadcast(1, envelope(1, seq));
        assert_eq!(outcome.delivered, 2);
        assert!(fast.try_recv().is_some());
    }

    let outcome = dispatcher.broadcast(1, envelope(1, 100));
    assert_eq!(outcome, BroadcastOutcome { delivered: 1, evicted: 1 });

    // The healthy subscriber still gets the envelope that evicted the slow one
    assert_eq!(fast.recv().await.unwrap().message_id, "100");

    assert!(!registry.is_subscribed(1, 10));
    assert!(slow.is_closed());
    assert!(slow.recv().await.is_none());

    dispatcher.broadcast(1, envelope(1, 101));
    assert!(slow.try_recv().is_none());
    assert_eq!(registry.stats().evictions_total, 1);
}

#[tokio::test]
async fn test_broadcast_after_unsubscribe_is_a_noop() {
    let (registry, dispatcher) = dispatcher(8);
    let mut handle = registry.subscribe(3, 30).unwrap();

    dispatcher.broadcast(3, envelope(3, 1));

    assert_eq!(handle.try_recv().unwrap().message_id, "1");
    assert!(handle.try_recv().is_none());

    assert!(registry.unsubscribe(3, 30));
    let outcome = dispatcher.broadcast(3, envelope(3, 2));

    assert_eq!(outcome, BroadcastOutcome::default());
    assert!(handle.try_recv().is_none());
}

#[tokio::test]
async fn test_dropped_reader_is_evicted_without_affecting_others() {
    let (registry, dispatcher) = dispatcher(8);
    let gone = registry.subscribe(4, 40).unwrap();
    let mut live = registry.subscribe(4, 41).unwrap();
    drop(gone);

    let outcome = dispatcher.broadcast(4, envelope(4, 1));

    assert_eq!(outcome, BroadcastOutcome { delivered: 1, evicted: 1 });
    assert_eq!(live.recv().await.unwrap().message_id, "1");
    assert_eq!(registry.subscriber_count(4), 1);
}

#[tokio::test]
async fn test_concurrent_subscribe_and_broadcast() {
    let (registry, dispatcher) = dispatcher(1024);

    let mut tasks = Vec::new();
    for user in 0..16i64 {
        let registry = Arc::clone(&registry);
        tasks.push(tokio::spawn(async move {
            let handle = registry.subscribe(9, user).unwrap();
            tokio::task::yield_now().await;
            registry.unsubscribe_subscription(9, user, handle.id())
        }));
    }
    let broadcaster = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            for seq in 0..50 {
                dispatcher.broadcast(9, envelope(9, seq));
                tokio::task::yield_now().await;
            }
        })
    };

    for task in tasks {
        assert!(task.await.unwrap());
    }
    broadcaster.await.unwrap();

    let stats = registry.stats();
    assert_eq!(stats.subscriptions, 0);
    assert_eq!(stats.subscribes_total, 16);
    assert_eq!(stats.unsubscribes_total, 16);
}
