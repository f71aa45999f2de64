//! Request dispatch.
//!
//! Every request ends in exactly one of three states, decided in one step:
//!
//! ```text
//! routing key ──▶ no backend ───────────────▶ 502 Bad Gateway
//!      │
//!      ▼
//! backend gate ─▶ full ─────────────────────▶ 503 Service Unavailable
//!      │
//!      ▼
//! forward ──────▶ backend response (or 502 on backend I/O error)
//! ```
//!
//! Nothing waits on a gate and nothing is retried.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

use crate::backend::BackendTable;
use crate::http::request::prepare_upstream_request;
use crate::http::response;
use crate::observability::metrics::{self, UNKNOWN_BACKEND};
use crate::routing::routing_key;

/// How a request was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Forwarded and the backend answered.
    Forwarded,
    /// No backend for the requested host.
    UnknownBackend,
    /// The backend's gate was full.
    Overloaded,
    /// Admitted, but the backend could not be reached.
    UpstreamFailed,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Forwarded => "forwarded",
            Outcome::UnknownBackend => "unknown_backend",
            Outcome::Overloaded => "overloaded",
            Outcome::UpstreamFailed => "upstream_failed",
        }
    }
}

/// Routes requests to backends through their admission gates.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    table: Arc<BackendTable>,
    /// Bounds the whole exchange, including the relayed body.
    request_timeout: Duration,
}

impl Dispatcher {
    pub fn new(table: BackendTable, request_timeout: Duration) -> Self {
        Self {
            table: Arc::new(table),
            request_timeout,
        }
    }

    pub fn table(&self) -> &BackendTable {
        &self.table
    }

    /// Handle one request. `client` is the peer address used for
    /// `X-Forwarded-For`.
    pub async fn dispatch(&self, mut request: Request<Body>, client: Option<IpAddr>) -> Response {
        let started = Instant::now();
        let deadline = tokio::time::Instant::from_std(started) + self.request_timeout;

        let entry = routing_key(&request).and_then(|key| self.table.get(&key));
        let Some(entry) = entry else {
            tracing::warn!(
                host = ?crate::routing::request_host(&request),
                "No backend for host"
            );
            metrics::record_request(UNKNOWN_BACKEND, Outcome::UnknownBackend.as_str(), started);
            return response::bad_gateway();
        };

        let Some(permit) = entry.gate().try_acquire() else {
            tracing::warn!(
                backend = %entry.key(),
                capacity = entry.gate().capacity(),
                "Backend saturated, rejecting request"
            );
            metrics::record_request(entry.key(), Outcome::Overloaded.as_str(), started);
            return response::service_unavailable();
        };

        prepare_upstream_request(&mut request, client);

        match entry.target().forward(request).await {
            Ok(upstream) => {
                tracing::debug!(
                    backend = %entry.key(),
                    status = %upstream.status(),
                    in_flight = entry.gate().in_flight(),
                    "Backend responded"
                );
                metrics::record_request(entry.key(), Outcome::Forwarded.as_str(), started);
                response::relay(upstream, permit, deadline)
            }
            Err(e) => {
                tracing::error!(
                    backend = %entry.key(),
                    error = %e,
                    "Backend request failed"
                );
                metrics::record_request(entry.key(), Outcome::UpstreamFailed.as_str(), started);
                drop(permit);
                response::bad_gateway()
            }
        }
    }
}
