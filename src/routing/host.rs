//! Routing key extraction.
//!
//! # Responsibilities
//! - Find the host a request targets
//! - Normalize it into the form stored in the backend table
//!
//! # Design Decisions
//! - The URI authority wins over the Host header (absolute-form requests and
//!   HTTP/2 `:authority` carry the target there)
//! - Host matching is case-insensitive
//! - The port is part of the key; `a.test:8080` and `a.test` are different hosts

use std::borrow::Cow;

use axum::http::{header, Request};

/// Lowercase and trim a host so lookups are case-insensitive.
pub fn normalize_host(host: &str) -> String {
    host.trim().to_ascii_lowercase()
}

/// The host named by the request, with its port but never any userinfo.
pub fn request_host<B>(req: &Request<B>) -> Option<Cow<'_, str>> {
    if let Some(authority) = req.uri().authority() {
        return Some(match authority.port() {
            Some(port) => Cow::Owned(format!("{}:{}", authority.host(), port)),
            None => Cow::Borrowed(authority.host()),
        });
    }
    req.headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.trim().is_empty())
        .map(Cow::Borrowed)
}

/// The routing key of a request, or `None` when it names no host.
pub fn routing_key<B>(req: &Request<B>) -> Option<String> {
    request_host(req).map(|host| normalize_host(&host))
}
