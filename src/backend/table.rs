//! Backend table.
//!
//! # Responsibilities
//! - Build one Backend Entry per mapping item at startup
//! - Pair every forwarding target with its own admission gate
//! - Look entries up by routing key
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - All-or-nothing: one bad destination fails the whole table
//! - Entries are never shared, even when two keys name the same destination

use std::collections::HashMap;
use std::sync::Arc;

use crate::admission::AdmissionGate;
use crate::backend::target::ForwardingTarget;
use crate::backend::transport::TransportBuilder;
use crate::config::{ConfigError, ProxyConfig};
use crate::routing::normalize_host;

/// A configured backend: where to forward and how many requests at once.
#[derive(Debug)]
pub struct BackendEntry {
    key: String,
    target: ForwardingTarget,
    gate: Arc<AdmissionGate>,
}

impl BackendEntry {
    /// Normalized routing key.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn target(&self) -> &ForwardingTarget {
        &self.target
    }

    pub fn gate(&self) -> &Arc<AdmissionGate> {
        &self.gate
    }
}

/// Routing key to backend entry, built once from the configuration.
#[derive(Debug)]
pub struct BackendTable {
    entries: HashMap<String, BackendEntry>,
}

impl BackendTable {
    /// Validate the configuration and build every backend.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ConfigError> {
        config.validate().map_err(ConfigError::Validation)?;

        let builder = TransportBuilder::new(config.max_keepalives_per_backend);
        let mut entries = HashMap::with_capacity(config.mapping.len());

        for (key, destination) in config.backends() {
            let target =
                builder
                    .build(key, destination)
                    .map_err(|e| ConfigError::Destination {
                        key: key.to_string(),
                        destination: destination.to_string(),
                        reason: e.to_string(),
                    })?;

            let key = normalize_host(key);
            tracing::info!(
                backend = %key,
                destination = %destination,
                transport = target.transport_kind(),
                max_conns = config.max_conns_per_backend,
                "Backend registered"
            );

            let entry = BackendEntry {
                gate: Arc::new(AdmissionGate::new(key.clone(), config.max_conns_per_backend)),
                target,
                key: key.clone(),
            };
            entries.insert(key, entry);
        }

        Ok(Self { entries })
    }

    /// Look up a backend by normalized routing key.
    pub fn get(&self, key: &str) -> Option<&BackendEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
