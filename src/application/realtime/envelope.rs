//! Realtime envelope pushed to chat subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `message_id` of the acknowledgement that opens every stream.
pub const CONNECTION_MESSAGE_ID: &str = "connection";

/// Content of the connection acknowledgement.
pub const CONNECTION_CONTENT: &str = "Connected to chat";

/// Delivery status carried by an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnvelopeStatus {
    Connected,
    Sent,
    Read,
    Delivered,
}

/// What the envelope announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum EnvelopeType {
    #[default]
    Unspecified,
    New,
    Read,
    Typing,
    Online,
    Offline,
}

/// Transient message pushed through the subscription queues.
///
/// IDs are strings on the wire, matching the HTTP responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub message_id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub sender_username: String,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub status: EnvelopeStatus,
    #[serde(rename = "type")]
    pub kind: EnvelopeType,
}

impl Envelope {
    /// The acknowledgement a delivery session sends before any chat traffic.
    pub fn connection_ack(chat_id: i64, user_id: i64, username: &str) -> Self {
        Self {
            message_id: CONNECTION_MESSAGE_ID.to_string(),
            chat_id: chat_id.to_string(),
            sender_id: user_id.to_string(),
            sender_username: username.to_string(),
            content: CONNECTION_CONTENT.to_string(),
            sent_at: Utc::now(),
            status: EnvelopeStatus::Connected,
            kind: EnvelopeType::Unspecified,
        }
    }

    pub fn is_connection_ack(&self) -> bool {
        self.status == EnvelopeStatus::Connected && self.message_id == CONNECTION_MESSAGE_ID
    }
}
