//! revproxy: host-based HTTP reverse proxy.
//!
//! ```text
//!   client ──▶ net::listener ──▶ http::server ──▶ http::dispatch
//!              (maxconn cap,      (axum, h1/h2,     │ routing key → backend
//!               waits at accept)   request id,      │ admission gate (503 when full)
//!                                  deadline)        ▼
//!   client ◀── http::response ◀──────────────── backend::target ──▶ TCP or Unix socket
//! ```

use clap::Parser;

use revproxy::config::ProcessParams;
use revproxy::lifecycle;
use revproxy::observability::logging::init_logging;

#[tokio::main]
async fn main() {
    init_logging();

    let params = ProcessParams::parse();
    tracing::info!(
        addr = %params.addr,
        conf = %params.conf.display(),
        maxconn = params.maxconn,
        diag = ?params.diag,
        "revproxy v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    if let Err(e) = lifecycle::run(params).await {
        tracing::error!(error = %e, "Fatal error");
        std::process::exit(1);
    }
}
