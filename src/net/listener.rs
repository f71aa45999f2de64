//! TCP listener with a global connection limit.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Enforce the max connection limit via semaphore
//! - Survive transient accept errors
//!
//! # Design Decisions
//! - The slot is taken before `accept`, so at capacity the listener simply
//!   stops accepting and new clients wait in the kernel backlog
//! - Nothing is ever refused here; refusing is the per-backend gate's job

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::connect_info::Connected;
use axum::serve::IncomingStream;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::net::connection::LimitedConnection;

/// Error type for listener setup.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("maxconn should be positive")]
    InvalidLimit,

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },
}

/// Remote address of an accepted client, exposed to handlers as connect info.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerAddr(pub SocketAddr);

impl Connected<IncomingStream<'_, LimitedListener>> for PeerAddr {
    fn connect_info(stream: IncomingStream<'_, LimitedListener>) -> Self {
        *stream.remote_addr()
    }
}

/// A TCP listener that holds at most `max_connections` accepted connections.
#[derive(Debug)]
pub struct LimitedListener {
    inner: TcpListener,
    connection_limit: Arc<Semaphore>,
    max_connections: usize,
}

impl LimitedListener {
    /// Bind to `addr` with the given connection cap.
    pub async fn bind(addr: &str, max_connections: usize) -> Result<Self, ListenerError> {
        if max_connections < 1 {
            return Err(ListenerError::InvalidLimit);
        }
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        Self::from_tcp(listener, max_connections)
    }

    /// Wrap an already bound listener.
    pub fn from_tcp(listener: TcpListener, max_connections: usize) -> Result<Self, ListenerError> {
        if max_connections < 1 {
            return Err(ListenerError::InvalidLimit);
        }
        if let Ok(local_addr) = listener.local_addr() {
            tracing::info!(
                address = %local_addr,
                max_connections,
                "Listener bound"
            );
        }
        Ok(Self {
            inner: listener,
            connection_limit: Arc::new(Semaphore::new(max_connections)),
            max_connections,
        })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Connection slots currently free.
    pub fn available_permits(&self) -> usize {
        self.connection_limit.available_permits()
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }
}

impl axum::serve::Listener for LimitedListener {
    type Io = LimitedConnection;
    type Addr = PeerAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        // Backpressure first: wait for a free slot, then accept.
        let permit = Arc::clone(&self.connection_limit)
            .acquire_owned()
            .await
            .expect("connection semaphore is never closed");

        loop {
            match self.inner.accept().await {
                Ok((stream, addr)) => {
                    let _ = stream.set_nodelay(true);
                    let conn = LimitedConnection::new(stream, permit);
                    tracing::debug!(
                        connection_id = %conn.id(),
                        peer_addr = %addr,
                        available_permits = self.available_permits(),
                        "Connection accepted"
                    );
                    return (conn, PeerAddr(addr));
                }
                Err(e) => handle_accept_error(e).await,
            }
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        self.inner.local_addr().map(PeerAddr)
    }
}

async fn handle_accept_error(e: io::Error) {
    if is_connection_error(&e) {
        return;
    }
    // Typically fd exhaustion; back off instead of spinning.
    tracing::error!(error = %e, "Accept error");
    tokio::time::sleep(Duration::from_secs(1)).await;
}

fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}
