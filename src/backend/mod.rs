//! Backend subsystem.
//!
//! # Data Flow
//! ```text
//! ProxyConfig.Mapping (routing key → destination)
//!     → transport.rs (classify destination, pick client)
//!         "/path"     → Unix socket connector, synthetic authority
//!         "http://…"  → shared network client
//!     → target.rs (ForwardingTarget: URI rewrite + send)
//!     → table.rs (BackendEntry = target + admission gate, keyed by host)
//! ```

pub mod table;
pub mod target;
pub mod transport;

pub use table::{BackendEntry, BackendTable};
pub use target::{ForwardError, ForwardingTarget};
pub use transport::{Destination, DestinationError, TransportBuilder};
