//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, UnixListener};

use revproxy::config::ProxyConfig;
use revproxy::http::{HttpServer, ServerOptions};
use revproxy::net::LimitedListener;
use revproxy::{BackendTable, Shutdown};

/// Start a programmable TCP backend. The handler receives the raw request
/// head and returns status and body.
pub async fn start_backend<F, Fut>(handler: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let handler = handler.clone();
            tokio::spawn(serve_one(socket, move |head| handler(head)));
        }
    });
    addr
}

/// Same as [`start_backend`], listening on a Unix domain socket.
pub async fn start_unix_backend<F, Fut>(path: &Path, handler: F)
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = UnixListener::bind(path).unwrap();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let handler = handler.clone();
            tokio::spawn(serve_one(socket, move |head| handler(head)));
        }
    });
}

/// Backend that answers every request with 200 and a fixed body.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    start_backend(move |_| async move { (200, response.to_string()) }).await
}

/// Backend that writes `raw` as soon as a request head arrives and then keeps
/// the connection open without writing anything else.
pub async fn start_stalling_backend(raw: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                read_head(&mut socket).await;
                let _ = socket.write_all(raw.as_bytes()).await;
                std::future::pending::<()>().await;
            });
        }
    });
    addr
}

async fn serve_one<S, F, Fut>(mut socket: S, handler: F)
where
    S: AsyncRead + AsyncWrite + Unpin,
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = (u16, String)>,
{
    let head = read_head(&mut socket).await;
    let (status, body) = handler(head).await;
    let status_text = match status {
        200 => "200 OK",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn read_head<S: AsyncRead + Unpin>(socket: &mut S) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn config(max_conns: usize, mapping: &[(&str, String)]) -> ProxyConfig {
    ProxyConfig {
        max_conns_per_backend: max_conns,
        max_keepalives_per_backend: 5,
        mapping: mapping
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    }
}

/// Start the proxy on an ephemeral port.
pub async fn start_proxy(config: ProxyConfig, max_connections: usize) -> (SocketAddr, Shutdown) {
    start_proxy_with(config, max_connections, ServerOptions::default()).await
}

pub async fn start_proxy_with(
    config: ProxyConfig,
    max_connections: usize,
    options: ServerOptions,
) -> (SocketAddr, Shutdown) {
    let table = BackendTable::from_config(&config).unwrap();
    let server = HttpServer::new(table, options);
    let listener = LimitedListener::bind("127.0.0.1:0", max_connections)
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    (addr, shutdown)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

pub async fn get(client: &reqwest::Client, proxy: SocketAddr, host: &str, path: &str) -> reqwest::Response {
    client
        .get(format!("http://{proxy}{path}"))
        .header(reqwest::header::HOST, host)
        .send()
        .await
        .expect("proxy unreachable")
}
