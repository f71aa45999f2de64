//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits must be positive)
//! - Reject empty mappings and routing keys that collide once normalized
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Destinations are checked when the backend table is built, since parsing
//!   them is the same work as building the transport

use std::collections::HashMap;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::routing::normalize_host;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("MaxConnsPerBackend is too low (got {0}, need at least 1)")]
    MaxConnsTooLow(usize),

    #[error("MaxKeepalivesPerBackend is too low (got {0}, need at least 1)")]
    MaxKeepalivesTooLow(usize),

    #[error("no backends provided")]
    NoBackends,

    #[error("routing key is empty")]
    EmptyRoutingKey,

    #[error("routing keys '{first}' and '{second}' are the same host")]
    DuplicateRoutingKey { first: String, second: String },
}

/// Validate a parsed configuration, collecting every violation.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.max_conns_per_backend < 1 {
        errors.push(ValidationError::MaxConnsTooLow(config.max_conns_per_backend));
    }
    if config.max_keepalives_per_backend < 1 {
        errors.push(ValidationError::MaxKeepalivesTooLow(
            config.max_keepalives_per_backend,
        ));
    }
    if config.mapping.is_empty() {
        errors.push(ValidationError::NoBackends);
    }

    // Sorted so the reported pair is stable across runs.
    let mut keys: Vec<&String> = config.mapping.keys().collect();
    keys.sort();

    let mut seen: HashMap<String, &str> = HashMap::with_capacity(keys.len());
    for key in keys {
        let normalized = normalize_host(key);
        if normalized.is_empty() {
            errors.push(ValidationError::EmptyRoutingKey);
            continue;
        }
        if let Some(first) = seen.insert(normalized, key) {
            errors.push(ValidationError::DuplicateRoutingKey {
                first: first.to_string(),
                second: key.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
