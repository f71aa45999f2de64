//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Build the backend table
//! - Bind the bounded listener
//! - Start the optional diagnostics endpoint
//! - Serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any configuration or listener error is fatal and nothing is
//!   served
//! - The listener binds last, after every backend has been built

use thiserror::Error;

use crate::backend::BackendTable;
use crate::config::{load_config, ConfigError, ProcessParams};
use crate::http::{HttpServer, ServerOptions};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::spawn_signal_handler;
use crate::net::{LimitedListener, ListenerError};
use crate::observability::metrics;

/// Errors that stop the process before or while serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Everything needed to start serving, built and validated.
pub struct Prepared {
    pub server: HttpServer,
    pub listener: LimitedListener,
}

/// Load config, build backends and bind the listener.
pub async fn prepare(params: &ProcessParams) -> Result<Prepared, StartupError> {
    let config = load_config(&params.conf)?;
    tracing::info!(
        path = %params.conf.display(),
        backends = config.mapping.len(),
        max_conns_per_backend = config.max_conns_per_backend,
        max_keepalives_per_backend = config.max_keepalives_per_backend,
        "Configuration loaded"
    );

    let table = BackendTable::from_config(&config)?;
    let server = HttpServer::new(
        table,
        ServerOptions {
            request_timeout: params.request_timeout(),
        },
    );
    let listener = LimitedListener::bind(&params.addr, params.maxconn).await?;

    Ok(Prepared { server, listener })
}

/// Run the proxy until SIGINT/SIGTERM.
pub async fn run(params: ProcessParams) -> Result<(), StartupError> {
    let Prepared { server, listener } = prepare(&params).await?;

    if let Some(addr) = params.diag {
        if let Err(e) = metrics::init_metrics(addr) {
            tracing::error!(address = %addr, error = %e, "Failed to start diagnostics endpoint");
        }
    }

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    server.run(listener, shutdown.subscribe()).await?;
    tracing::info!("Shutdown complete");
    Ok(())
}
