//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (global connection cap, accept loop)
//!     → connection.rs (slot held for the connection's lifetime)
//!     → Hand off to HTTP layer (axum::serve)
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - At capacity, clients queue in the kernel backlog instead of being refused

pub mod connection;
pub mod listener;

pub use connection::{ConnectionId, LimitedConnection};
pub use listener::{LimitedListener, ListenerError, PeerAddr};
