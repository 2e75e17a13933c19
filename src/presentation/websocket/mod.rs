//! Chat Subscription Stream
//!
//! WebSocket transport for delivery sessions: the server pushes one JSON
//! text frame per envelope, starting with the CONNECTED acknowledgement.

pub mod handler;

pub use handler::{subscribe_handler, WebSocketSink};
