//! Delivery sessions driven end to end through the registry and dispatcher

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use messaging_server::application::realtime::{
    DeliverySession, Dispatcher, Envelope, EnvelopeSink, SessionEnd, SessionError,
    SessionIdentity, SessionState, SinkError, SubscriptionRegistry,
};

use super::envelope;

/// Sink that hands every envelope to the test.
struct ChannelSink(mpsc::UnboundedSender<Envelope>);

#[async_trait]
impl EnvelopeSink for ChannelSink {
    async fn send(&mut self, envelope: &Envelope) -> Result<(), SinkError> {
        self.0.send(envelope.clone()).map_err(|_| SinkError::Closed)
    }
}

fn identity(user_id: i64) -> SessionIdentity {
    SessionIdentity {
        user_id,
        username: format!("user{user_id}"),
    }
}

async fn wait_until_subscribed(registry: &SubscriptionRegistry, chat_id: i64, user_id: i64) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !registry.is_subscribed(chat_id, user_id) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("session never subscribed");
}

#[tokio::test]
async fn test_cancelled_session_unsubscribes_exactly_once() {
    let registry = Arc::new(SubscriptionRegistry::new(16));
    let dispatcher = Dispatcher::new(Arc::clone(&registry));
    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut session = DeliverySession::new(Arc::clone(&registry), 5, identity(50), cancel.clone());
    let task = tokio::spawn(async move {
        let mut sink = ChannelSink(tx);
        let end = session.run(&mut sink).await;
        (end, session.state())
    });

    let ack = rx.recv().await.unwrap();
    assert!(ack.is_connection_ack());
    assert_eq!(ack.chat_id, "5");
    wait_until_subscribed(&registry, 5, 50).await;

    dispatcher.broadcast(5, envelope(5, 1));
    assert_eq!(rx.recv().await.unwrap().message_id, "1");

    cancel.cancel();
    let (end, state) = task.await.unwrap();

    assert!(matches!(end, Ok(SessionEnd::Cancelled)));
    assert_eq!(state, SessionState::Closed);
    assert!(!registry.is_subscribed(5, 50));
    assert_eq!(registry.stats().unsubscribes_total, 1);

    // Later broadcasts reach nobody
    let outcome = dispatcher.broadcast(5, envelope(5, 2));
    assert_eq!(outcome.delivered, 0);
}

#[tokio::test]
async fn test_shutdown_ends_live_sessions() {
    let registry = Arc::new(SubscriptionRegistry::new(16));
    let shutdown = CancellationToken::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut session = DeliverySession::new(
        Arc::clone(&registry),
        6,
        identity(60),
        shutdown.child_token(),
    );
    let task = tokio::spawn(async move { session.run(&mut ChannelSink(tx)).await });

    assert!(rx.recv().await.unwrap().is_connection_ack());
    wait_until_subscribed(&registry, 6, 60).await;

    registry.shutdown();

    let end = tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("session should end")
        .unwrap();
    assert!(matches!(end, Ok(SessionEnd::SubscriptionClosed)));

    let mut late = DeliverySession::new(Arc::clone(&registry), 6, identity(61), shutdown.child_token());
    let (tx, _rx) = mpsc::unbounded_channel();
    assert!(matches!(
        late.run(&mut ChannelSink(tx)).await,
        Err(SessionError::Subscribe(_))
    ));
}

#[tokio::test]
async fn test_second_connection_replaces_first() {
    let registry = Arc::new(SubscriptionRegistry::new(16));
    let dispatcher = Dispatcher::new(Arc::clone(&registry));

    let (tx1, mut rx1) = mpsc::unbounded_channel();
    let mut first = DeliverySession::new(Arc::clone(&registry), 7, identity(70), CancellationToken::new());
    let first_task = tokio::spawn(async move { first.run(&mut ChannelSink(tx1)).await });
    assert!(rx1.recv().await.unwrap().is_connection_ack());

    let (tx2, mut rx2) = mpsc::unbounded_channel();
    let cancel_second = CancellationToken::new();
    let mut second = DeliverySession::new(Arc::clone(&registry), 7, identity(70), cancel_second.clone());
    let second_task = tokio::spawn(async move { second.run(&mut ChannelSink(tx2)).await });
    assert!(rx2.recv().await.unwrap().is_connection_ack());

    assert!(matches!(first_task.await.unwrap(), Ok(SessionEnd::SubscriptionClosed)));
    // The retired session must not have removed its successor
    assert!(registry.is_subscribed(7, 70));

    dispatcher.broadcast(7, envelope(7, 1));
    assert_eq!(rx2.recv().await.unwrap().message_id, "1");

    cancel_second.cancel();
    assert!(matches!(second_task.await.unwrap(), Ok(SessionEnd::Cancelled)));
    assert_eq!(registry.subscriber_count(7), 0);
}
