//! Broadcast Dispatcher
//!
//! Fans an envelope out to every queue of a chat without ever waiting on a
//! slow consumer. A queue that is full, or whose reader has gone away, gets
//! its subscriber evicted; everyone else still receives the envelope.

use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;

use super::envelope::{Envelope, EnvelopeStatus, EnvelopeType};
use super::registry::SubscriptionRegistry;
use crate::domain::{Message, MessageStatus};

/// Result of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub delivered: usize,
    pub evicted: usize,
}

/// Delivers envelopes to the subscribers held by a [`SubscriptionRegistry`].
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<SubscriptionRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<SubscriptionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Enqueue `envelope` for every current subscriber of `chat_id`.
    pub fn broadcast(&self, chat_id: i64, envelope: Envelope) -> BroadcastOutcome {
        let queues = self.registry.snapshot(chat_id);
        if queues.is_empty() {
            tracing::debug!(chat_id, "No subscribers for chat");
            return BroadcastOutcome::default();
        }

        tracing::debug!(
            chat_id,
            subscribers = queues.len(),
            message_id = %envelope.message_id,
            "Broadcasting message to chat"
        );

        let envelope = Arc::new(envelope);
        let mut outcome = BroadcastOutcome::default();

        for queue in queues {
            match queue.sender.try_send(Arc::clone(&envelope)) {
                Ok(()) => outcome.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(chat_id, user_id = queue.user_id, "Subscriber queue is full");
                    if self.registry.evict(chat_id, queue.user_id, queue.id) {
                        outcome.evicted += 1;
                    }
                }
                Err(TrySendError::Closed(_)) => {
                    if self.registry.evict(chat_id, queue.user_id, queue.id) {
                        outcome.evicted += 1;
                    }
                }
            }
        }

        outcome
    }
}

/// Build the NEW/SENT envelope announcing a freshly stored message.
pub fn envelope_from_message(message: &Message) -> Envelope {
    Envelope {
        message_id: message.id.to_string(),
        chat_id: message.chat_id.to_string(),
        sender_id: message.user_id.to_string(),
        sender_username: message.sender_username.clone().unwrap_or_default(),
        content: message.content.clone(),
        sent_at: message.created_at,
        status: envelope_status(message.status),
        kind: EnvelopeType::New,
    }
}

/// Build a receipt envelope for a status change of `message`.
pub fn status_envelope(message: &Message) -> Envelope {
    Envelope {
        kind: EnvelopeType::Read,
        sent_at: message.updated_at,
        ..envelope_from_message(message)
    }
}

fn envelope_status(status: MessageStatus) -> EnvelopeStatus {
    match status {
        MessageStatus::Sent => EnvelopeStatus::Sent,
        MessageStatus::Read => EnvelopeStatus::Read,
        MessageStatus::Delivered => EnvelopeStatus::Delivered,
    }
}
