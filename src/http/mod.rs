//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Bounded TCP connection
//!     → server.rs (Axum setup, HTTP/1.1 + HTTP/2, middleware)
//!     → dispatch.rs (routing key → backend → admission gate)
//!     → request.rs (Host, hop-by-hop, X-Forwarded-For)
//!     → [forwarding target sends to backend]
//!     → response.rs (strip hop-by-hop, stream body, release slot)
//!     → Send to client
//! ```

pub mod dispatch;
pub mod request;
pub mod response;
pub mod server;

pub use dispatch::{Dispatcher, Outcome};
pub use request::{request_id, X_FORWARDED_FOR, X_REQUEST_ID};
pub use server::{HttpServer, ServerOptions};
