//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (fmt layer, filter from RUST_LOG)
//!     → diagnostics endpoint (Prometheus scrape, only with --diag)
//! ```

pub mod logging;
pub mod metrics;
