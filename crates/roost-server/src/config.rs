//! Server configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Immutable configuration for the metadata server.
///
/// Constructed once at startup from command-line flags and shared by
/// reference; nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub listen: SocketAddr,
    /// Root of the per-client metadata tree
    pub base_dir: PathBuf,
    /// Per-request deadline enforced by the transport
    pub request_timeout: Duration,
}

impl ServerConfig {
    /// Configuration with the default 10 second request deadline.
    pub fn new(listen: SocketAddr, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            listen,
            base_dir: base_dir.into(),
            request_timeout: Duration::from_secs(10),
        }
    }
}
