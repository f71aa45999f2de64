//! Outbound transports.
//!
//! # Responsibilities
//! - Classify a configured destination (network URL vs Unix socket path)
//! - Build the one shared network client every TCP backend forwards through
//! - Build a per-backend client whose connector always dials a socket path
//!
//! # Design Decisions
//! - One network client for all TCP backends: its pool is keyed by
//!   authority, so `MaxKeepalivesPerBackend` caps idle connections per
//!   destination, and there is a single value for the whole process
//! - Socket destinations ignore the request URI when dialing; the URI only
//!   carries the synthetic authority built from the routing key

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::Body;
use axum::http::Uri;
use hyper_util::client::legacy::connect::{Connected, Connection, HttpConnector};
use hyper_util::client::legacy::Client;
use hyper_util::rt::{TokioExecutor, TokioIo};
use thiserror::Error;
use tokio::net::UnixStream;
use tower::Service;
use url::Url;

use crate::backend::target::ForwardingTarget;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const TCP_KEEPALIVE: Duration = Duration::from_secs(30);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Client used for every TCP backend.
pub type NetworkClient = Client<HttpConnector, Body>;

/// Client bound to a single Unix domain socket.
pub type LocalSocketClient = Client<UnixConnector, Body>;

/// Why a destination could not be turned into a forwarding target.
#[derive(Debug, Error)]
pub enum DestinationError {
    #[error("malformed url: {0}")]
    Url(#[from] url::ParseError),

    #[error("unsupported scheme '{0}', only http is supported")]
    UnsupportedScheme(String),

    #[error("url has no host")]
    MissingHost,

    #[error("invalid authority: {0}")]
    Authority(#[from] axum::http::uri::InvalidUri),
}

/// Where a backend lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Reached over TCP at an `http://` URL.
    Network(Url),
    /// Reached through a Unix domain socket at this path.
    LocalSocket(PathBuf),
}

impl Destination {
    /// Classify a destination string from the configuration document.
    ///
    /// Anything starting with `/` is a socket path and is never parsed as a URL.
    pub fn parse(raw: &str) -> Result<Self, DestinationError> {
        if raw.starts_with('/') {
            return Ok(Destination::LocalSocket(PathBuf::from(raw)));
        }
        Ok(Destination::Network(Url::parse(raw)?))
    }
}

/// Builds forwarding targets for configured backends.
#[derive(Debug, Clone)]
pub struct TransportBuilder {
    shared: NetworkClient,
    max_keepalives: usize,
}

impl TransportBuilder {
    /// Create the builder and the shared network client it hands out.
    pub fn new(max_keepalives: usize) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(CONNECT_TIMEOUT));
        connector.set_keepalive(Some(TCP_KEEPALIVE));
        connector.set_nodelay(true);

        let shared = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .pool_max_idle_per_host(max_keepalives)
            .build(connector);

        Self {
            shared,
            max_keepalives,
        }
    }

    /// Build the forwarding target for one `(routing key, destination)` pair.
    pub fn build(
        &self,
        routing_key: &str,
        destination: &str,
    ) -> Result<ForwardingTarget, DestinationError> {
        match Destination::parse(destination)? {
            Destination::Network(url) => ForwardingTarget::network(&url, self.shared.clone()),
            Destination::LocalSocket(path) => {
                let client = Client::builder(TokioExecutor::new())
                    .pool_idle_timeout(POOL_IDLE_TIMEOUT)
                    .pool_max_idle_per_host(self.max_keepalives)
                    .build(UnixConnector::new(path.clone()));
                ForwardingTarget::local_socket(routing_key, path, client)
            }
        }
    }
}

/// Connector that dials a fixed Unix socket whatever URI it is asked for.
#[derive(Debug, Clone)]
pub struct UnixConnector {
    path: Arc<Path>,
}

impl UnixConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::from(path.into()),
        }
    }
}

impl Service<Uri> for UnixConnector {
    type Response = UnixConnection;
    type Error = io::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _dst: Uri) -> Self::Future {
        let path = Arc::clone(&self.path);
        Box::pin(async move {
            let stream = UnixStream::connect(&*path).await?;
            Ok(UnixConnection {
                io: TokioIo::new(stream),
            })
        })
    }
}

/// An established Unix socket connection usable by the hyper client.
#[derive(Debug)]
pub struct UnixConnection {
    io: TokioIo<UnixStream>,
}

impl Connection for UnixConnection {
    fn connected(&self) -> Connected {
        Connected::new()
    }
}

impl hyper::rt::Read for UnixConnection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: hyper::rt::ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().io).poll_read(cx, buf)
    }
}

impl hyper::rt::Write for UnixConnection {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().io).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().io).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().io).poll_shutdown(cx)
    }
}
