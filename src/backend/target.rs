//! Forwarding targets.
//!
//! A target is bound to one backend: it knows the authority and base path
//! requests are rewritten to, and which client carries them there.

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::uri::{Authority, Scheme};
use axum::http::{Request, Response, Uri, Version};
use hyper::body::Incoming;
use thiserror::Error;
use url::Url;

use crate::backend::transport::{DestinationError, LocalSocketClient, NetworkClient};

/// Failure while forwarding a request to a backend.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to build upstream uri: {0}")]
    Uri(#[from] axum::http::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

#[derive(Debug, Clone)]
enum Transport {
    Network(NetworkClient),
    LocalSocket {
        path: PathBuf,
        client: LocalSocketClient,
    },
}

/// A reverse-proxy target for a single backend.
#[derive(Debug, Clone)]
pub struct ForwardingTarget {
    authority: Authority,
    base_path: String,
    base_query: Option<String>,
    transport: Transport,
}

impl ForwardingTarget {
    /// Target reached over TCP through the shared client.
    pub fn network(url: &Url, client: NetworkClient) -> Result<Self, DestinationError> {
        let (authority, base_path, base_query) = split_url(url)?;
        Ok(Self {
            authority,
            base_path,
            base_query,
            transport: Transport::Network(client),
        })
    }

    /// Target reached through a Unix socket. The authority is synthesized
    /// from the routing key since a socket has no host or port.
    pub fn local_socket(
        routing_key: &str,
        path: PathBuf,
        client: LocalSocketClient,
    ) -> Result<Self, DestinationError> {
        let url = Url::parse(&format!("http://{routing_key}"))?;
        let (authority, base_path, base_query) = split_url(&url)?;
        Ok(Self {
            authority,
            base_path,
            base_query,
            transport: Transport::LocalSocket { path, client },
        })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Socket path for local-socket targets.
    pub fn socket_path(&self) -> Option<&Path> {
        match &self.transport {
            Transport::LocalSocket { path, .. } => Some(path),
            Transport::Network(_) => None,
        }
    }

    /// Short transport name for logs.
    pub fn transport_kind(&self) -> &'static str {
        match self.transport {
            Transport::Network(_) => "tcp",
            Transport::LocalSocket { .. } => "unix",
        }
    }

    /// Rewrite an inbound request URI to point at this target.
    ///
    /// The target's base path and the request path are joined with exactly
    /// one slash, and both query strings are kept.
    pub fn upstream_uri(&self, incoming: &Uri) -> Result<Uri, axum::http::Error> {
        let mut path_and_query = join_paths(&self.base_path, incoming.path());
        let queries: Vec<&str> = [self.base_query.as_deref(), incoming.query()]
            .into_iter()
            .flatten()
            .filter(|q| !q.is_empty())
            .collect();
        if !queries.is_empty() {
            path_and_query.push('?');
            path_and_query.push_str(&queries.join("&"));
        }

        Uri::builder()
            .scheme(Scheme::HTTP.as_str())
            .authority(self.authority.as_str())
            .path_and_query(path_and_query.as_str())
            .build()
    }

    /// Send the request to the backend and return the response head with a
    /// streaming body.
    pub async fn forward(&self, mut req: Request<Body>) -> Result<Response<Incoming>, ForwardError> {
        *req.uri_mut() = self.upstream_uri(req.uri())?;
        *req.version_mut() = Version::HTTP_11;

        let response = match &self.transport {
            Transport::Network(client) => client.request(req).await?,
            Transport::LocalSocket { client, .. } => client.request(req).await?,
        };
        Ok(response)
    }
}

fn split_url(url: &Url) -> Result<(Authority, String, Option<String>), DestinationError> {
    if url.scheme() != "http" {
        return Err(DestinationError::UnsupportedScheme(url.scheme().to_string()));
    }
    let host = url.host_str().ok_or(DestinationError::MissingHost)?;
    let authority = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    Ok((
        authority.parse()?,
        url.path().to_string(),
        url.query().map(str::to_string),
    ))
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{base}{}", &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}
