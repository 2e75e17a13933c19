//! Presentation Layer
//!
//! HTTP routes, middleware and the chat subscription stream.

pub mod http;
pub mod middleware;
pub mod websocket;
