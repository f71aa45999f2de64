//! Configuration schema definitions.
//!
//! The document is JSON with PascalCase field names:
//!
//! ```json
//! {
//!   "MaxConnsPerBackend": 100,
//!   "MaxKeepalivesPerBackend": 10,
//!   "Mapping": {
//!     "api.example.com": "http://10.0.0.5:8080",
//!     "static.example.com": "/run/static.sock"
//!   }
//! }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::validation::{validate_config, ValidationError};

/// Root configuration for the reverse proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProxyConfig {
    /// Capacity of every backend's admission gate.
    pub max_conns_per_backend: usize,

    /// Idle connections kept per destination by the shared network transport.
    pub max_keepalives_per_backend: usize,

    /// Routing key (request host) to destination.
    ///
    /// A destination starting with `/` is a Unix domain socket path,
    /// anything else is an `http://` URL.
    pub mapping: HashMap<String, String>,
}

impl ProxyConfig {
    /// Check the semantic invariants of the configuration.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        validate_config(self)
    }

    /// Iterate over `(routing key, destination)` pairs.
    pub fn backends(&self) -> impl Iterator<Item = (&str, &str)> {
        self.mapping.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
