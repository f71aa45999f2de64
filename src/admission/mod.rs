//! Admission control subsystem.
//!
//! Two independent limits, with deliberately different policies:
//!
//! ```text
//! client connects
//!     → net::listener (global cap on accepted connections)
//!         full: wait at accept, the kernel backlog queues the client
//! request arrives
//!     → gate.rs (per-backend cap on in-flight requests)
//!         full: 503 Service Unavailable, backend never contacted
//! ```
//!
//! The global limiter lives with the listener in [`crate::net`]; this module
//! holds the per-backend gate.

pub mod gate;

pub use gate::{AdmissionGate, AdmissionPermit};
