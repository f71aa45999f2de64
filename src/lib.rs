//! Host-based HTTP reverse proxy with admission control.
//!
//! Each request is routed by its target host to one statically configured
//! backend, reached over TCP or a Unix domain socket. Two independent limits
//! protect the system: a global cap on accepted client connections (waits at
//! accept) and a per-backend cap on in-flight requests (rejects with 503).

// Core subsystems
pub mod admission;
pub mod backend;
pub mod config;
pub mod http;
pub mod net;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use backend::BackendTable;
pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
