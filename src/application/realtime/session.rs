//! Delivery Session
//!
//! Drives one subscriber's stream: subscribe, acknowledge, forward queued
//! envelopes until the queue closes or the connection is cancelled, then
//! unsubscribe exactly once.
//!
//! ```text
//! INIT -> CONNECTED -> STREAMING -> CLOSED
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::envelope::Envelope;
use super::registry::{SubscriptionId, SubscriptionRegistry};
use super::RealtimeError;

/// Outbound side of a subscriber's connection.
#[async_trait]
pub trait EnvelopeSink: Send {
    async fn send(&mut self, envelope: &Envelope) -> Result<(), SinkError>;
}

/// Failure writing to an [`EnvelopeSink`].
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("connection closed")]
    Closed,

    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Lifecycle state of a [`DeliverySession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Connected,
    Streaming,
    Closed,
}

/// Why a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The connection (or the server) cancelled the session.
    Cancelled,
    /// The registry closed the queue: replaced, evicted or shut down.
    SubscriptionClosed,
}

/// Session failures. They only ever affect the session that hit them.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to subscribe: {0}")]
    Subscribe(#[from] RealtimeError),

    #[error("failed to send connection acknowledgement: {0}")]
    Handshake(#[source] SinkError),

    #[error("failed to forward envelope: {0}")]
    Transport(#[source] SinkError),

    #[error("session already ran")]
    AlreadyRun,
}

/// Authenticated subscriber.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    pub user_id: i64,
    pub username: String,
}

/// Unsubscribes its subscription exactly once: explicitly on the normal
/// path, from `Drop` if the session future is aborted or panics.
struct SubscriptionGuard {
    registry: Arc<SubscriptionRegistry>,
    chat_id: i64,
    user_id: i64,
    id: SubscriptionId,
    released: bool,
}

impl SubscriptionGuard {
    fn release(&mut self) {
        if std::mem::replace(&mut self.released, true) {
            return;
        }
        self.registry
            .unsubscribe_subscription(self.chat_id, self.user_id, self.id);
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Per-connection delivery session.
pub struct DeliverySession {
    registry: Arc<SubscriptionRegistry>,
    chat_id: i64,
    identity: SessionIdentity,
    cancel: CancellationToken,
    state: SessionState,
}

impl DeliverySession {
    /// `cancel` should be a child of the server's shutdown token, cancelled
    /// by the transport when the client goes away.
    pub fn new(
        registry: Arc<SubscriptionRegistry>,
        chat_id: i64,
        identity: SessionIdentity,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            registry,
            chat_id,
            identity,
            cancel,
            state: SessionState::Init,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn chat_id(&self) -> i64 {
        self.chat_id
    }

    /// Run the session to completion against `sink`.
    #[tracing::instrument(
        name = "delivery_session",
        skip_all,
        fields(chat_id = self.chat_id, user_id = self.identity.user_id)
    )]
    pub async fn run<S>(&mut self, sink: &mut S) -> Result<SessionEnd, SessionError>
    where
        S: EnvelopeSink + ?Sized,
    {
        if self.state != SessionState::Init {
            return Err(SessionError::AlreadyRun);
        }

        let user_id = self.identity.user_id;
        let mut handle = match self.registry.subscribe(self.chat_id, user_id) {
            Ok(handle) => handle,
            Err(e) => {
                self.state = SessionState::Closed;
                return Err(e.into());
            }
        };
        let mut guard = SubscriptionGuard {
            registry: Arc::clone(&self.registry),
            chat_id: self.chat_id,
            user_id,
            id: handle.id(),
            released: false,
        };
        self.state = SessionState::Connected;

        let ack = Envelope::connection_ack(self.chat_id, user_id, &self.identity.username);
        if let Err(e) = sink.send(&ack).await {
            guard.release();
            self.state = SessionState::Closed;
            tracing::warn!(error = %e, "Connection acknowledgement failed");
            return Err(SessionError::Handshake(e));
        }

        self.state = SessionState::Streaming;
        tracing::debug!(subscription_id = handle.id(), "Streaming chat messages");

        let result = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break Ok(SessionEnd::Cancelled),
                next = handle.recv() => {
                    let Some(envelope) = next else {
                        break Ok(SessionEnd::SubscriptionClosed);
                    };
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => break Ok(SessionEnd::Cancelled),
                        sent = sink.send(&envelope) => {
                            if let Err(e) = sent {
                                break Err(SessionError::Transport(e));
                            }
                        }
                    }
                }
            }
        };

        guard.release();
        self.state = SessionState::Closed;

        match &result {
            Ok(end) => tracing::info!(?end, "Delivery session ended"),
            Err(e) => tracing::warn!(error = %e, "Delivery session failed"),
        }
        result
    }
}
