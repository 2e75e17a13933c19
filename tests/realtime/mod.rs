mod fanout_tests;
mod session_tests;

use chrono::Utc;
use messaging_server::application::realtime::{Envelope, EnvelopeStatus, EnvelopeType};

/// A NEW envelope whose id is `seq`, for ordering assertions.
pub fn envelope(chat_id: i64, seq: u64) -> Envelope {
    Envelope {
        message_id: seq.to_string(),
        chat_id: chat_id.to_string(),
        sender_id: "1".into(),
        sender_username: "alice".into(),
        content: format!("message {seq}"),
        sent_at: Utc::now(),
        status: EnvelopeStatus::Sent,
        kind: EnvelopeType::New,
    }
}
