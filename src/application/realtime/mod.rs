//! Realtime fan-out
//!
//! In-process delivery of chat messages to connected subscribers:
//!
//! - [`SubscriptionRegistry`]: live `(chat, subscriber) -> queue` mapping
//! - [`Dispatcher`]: non-blocking broadcast with eviction of slow consumers
//! - [`DeliverySession`]: per-connection lifecycle over an [`EnvelopeSink`]

mod dispatcher;
mod envelope;
mod registry;
mod session;

pub use dispatcher::{envelope_from_message, status_envelope, BroadcastOutcome, Dispatcher};
pub use envelope::{Envelope, EnvelopeStatus, EnvelopeType, CONNECTION_CONTENT, CONNECTION_MESSAGE_ID};
pub use registry::{RegistryStats, SubscriptionHandle, SubscriptionId, SubscriptionRegistry};
pub use session::{
    DeliverySession, EnvelopeSink, SessionEnd, SessionError, SessionIdentity, SessionState, SinkError,
};

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RealtimeError {
    #[error("subscription registry is shutting down")]
    ShuttingDown,
}
