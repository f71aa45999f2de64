//! Request preparation for forwarding.
//!
//! # Responsibilities
//! - Keep the client's view of the target host in the `Host` header
//! - Strip hop-by-hop headers
//! - Record the client address in `X-Forwarded-For`
//! - Expose the request ID assigned at the server boundary

use std::net::IpAddr;

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::Request;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Headers that describe a single hop and must not be forwarded.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "proxy-connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn remove_hop_by_hop_headers(headers: &mut HeaderMap) {
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect();

    for name in &listed {
        headers.remove(name.as_str());
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

/// Append the client IP to `X-Forwarded-For`, folding earlier values into one.
pub fn append_forwarded_for(headers: &mut HeaderMap, client: IpAddr) {
    let value = {
        let prior: Vec<&str> = headers
            .get_all(&X_FORWARDED_FOR)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        if prior.is_empty() {
            client.to_string()
        } else {
            format!("{}, {client}", prior.join(", "))
        }
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}

/// The request ID set by the request-id middleware, if any.
pub fn request_id<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
}

/// Rewrite headers of an inbound request before it is sent to a backend.
pub fn prepare_upstream_request<B>(req: &mut Request<B>, client: Option<IpAddr>) {
    // HTTP/2 and absolute-form requests carry the host in the URI only.
    if !req.headers().contains_key(header::HOST) {
        let host = req
            .uri()
            .authority()
            .and_then(|a| HeaderValue::from_str(a.as_str()).ok());
        if let Some(host) = host {
            req.headers_mut().insert(header::HOST, host);
        }
    }

    let headers = req.headers_mut();
    remove_hop_by_hop_headers(headers);
    if let Some(ip) = client {
        append_forwarded_for(headers, ip);
    }
}
