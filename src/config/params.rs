//! Process parameters supplied on the command line.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Startup parameters of the proxy process.
#[derive(Debug, Clone, Parser)]
#[command(name = "revproxy")]
#[command(about = "Host-based HTTP reverse proxy with per-backend admission control", long_about = None)]
pub struct ProcessParams {
    /// Address to listen at.
    #[arg(long, value_name = "ADDRESS", default_value = "0.0.0.0:8080")]
    pub addr: String,

    /// Configuration file with the host to backend mapping.
    #[arg(long, value_name = "FILE", default_value = "/etc/revproxy.json")]
    pub conf: PathBuf,

    /// Address to expose diagnostics (Prometheus metrics) at.
    #[arg(long, visible_alias = "prof", value_name = "ADDRESS")]
    pub diag: Option<SocketAddr>,

    /// Maximum number of client connections to accept at once.
    #[arg(long, default_value_t = 1000)]
    pub maxconn: usize,

    /// Overall deadline for a single proxied request, in seconds.
    #[arg(long, default_value_t = 65, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,
}

impl ProcessParams {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
