//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → backend table built once at startup
//!
//! command line
//!     → params.rs (listen address, config path, limits)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload path
//! - Any validation failure rejects the whole configuration
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod params;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use params::ProcessParams;
pub use schema::ProxyConfig;
pub use validation::ValidationError;
