//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the dispatch handler
//! - Wire up middleware (request ID, tracing, request deadline)
//! - Serve HTTP/1.1 and HTTP/2 over the bounded listener
//! - Stop gracefully when the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::backend::BackendTable;
use crate::http::dispatch::Dispatcher;
use crate::http::request_id;
use crate::net::{LimitedListener, PeerAddr};

/// Server deadline used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(65);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// Knobs of the serving boundary.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Overall deadline for one request. Exceeding it before the response
    /// head yields 504; a body still streaming at the deadline is cut off.
    pub request_timeout: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// HTTP server for the reverse proxy.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server dispatching into `table`.
    pub fn new(table: BackendTable, options: ServerOptions) -> Self {
        let state = AppState {
            dispatcher: Arc::new(Dispatcher::new(table, options.request_timeout)),
        };
        Self {
            router: Self::build_router(&options, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(options: &ServerOptions, state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                options.request_timeout,
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Serve until `shutdown` fires.
    pub async fn run(
        self,
        listener: LimitedListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            max_connections = listener.max_connections(),
            "HTTP server starting"
        );

        let app = self
            .router
            .into_make_service_with_connect_info::<PeerAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(PeerAddr(peer)): ConnectInfo<PeerAddr>,
    request: Request<Body>,
) -> Response {
    state.dispatcher.dispatch(request, Some(peer.ip())).await
}

fn request_span(request: &Request<Body>) -> tracing::Span {
    tracing::info_span!(
        "request",
        request_id = %request_id(request).unwrap_or("-"),
        method = %request.method(),
        uri = %request.uri(),
        version = ?request.version(),
    )
}
