//! Application Layer
//!
//! Contains business logic services, data transfer objects (DTOs) and the
//! in-process realtime fan-out. This layer orchestrates the flow of data
//! between the presentation and domain layers.

pub mod dto;
pub mod realtime;
pub mod services;
