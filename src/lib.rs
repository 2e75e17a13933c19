//! # Messaging Server Library
//!
//! This crate provides a chat backend with:
//! - RESTful HTTP API for users, chats and messages
//! - Idempotent message ingestion (Redis `SET NX EX` gate)
//! - In-process realtime fan-out over WebSocket subscription streams
//! - PostgreSQL for persistent storage
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Core business entities and repository traits
//! - **Application Layer**: Services, DTOs and the realtime registry/dispatcher
//! - **Infrastructure Layer**: Database, cache and metrics implementations
//! - **Presentation Layer**: HTTP handlers and the subscription stream
//!
//! ## Module Structure
//!
//! ```text
//! messaging_server/
//! +-- config/         Configuration management
//! +-- domain/         Domain entities and repository traits
//! +-- application/    Services, DTOs, realtime fan-out
//! +-- infrastructure/ Database, cache and metrics implementations
//! +-- presentation/   HTTP routes and WebSocket handlers
//! +-- shared/         Common utilities (errors, snowflake IDs)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
