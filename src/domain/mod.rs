//! # Domain Layer
//!
//! Entities and repository contracts of the messaging backend. Nothing here
//! depends on the infrastructure or presentation layers.

pub mod entities;

// Re-export commonly used types
pub use entities::*;
