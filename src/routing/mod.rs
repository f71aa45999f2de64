//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (authority, Host header)
//!     → host.rs (extract & normalize routing key)
//!     → backend table lookup (exact match)
//!     → Return: Backend Entry or NoMatch (502)
//! ```
//!
//! # Design Decisions
//! - Table built at startup, immutable at runtime
//! - O(1) lookup via HashMap, no pattern matching
//! - Explicit NoMatch rather than silent default

pub mod host;

pub use host::{normalize_host, request_host, routing_key};
