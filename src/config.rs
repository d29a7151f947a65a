//! Configuration for a single fetch exchange.
//!
//! The inputs to an exchange (where to connect, what to ask for, and how
//! patient to be) are captured up front in two immutable values:
//! [`Target`] for the remote endpoint and [`FetchConfig`] for policy.

use std::sync::Arc;
use std::time::Duration;

/// The remote endpoint of an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Host name or address, without a scheme prefix.
    pub host: String,

    /// Remote port.
    pub port: u16,

    /// Request path sent in the request line.
    pub path: String,

    /// Whether to wrap the connection in TLS.
    pub tls: bool,
}

impl Target {
    /// A plain-text target on port 80 with the root path.
    pub fn http(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 80,
            path: "/".into(),
            tls: false,
        }
    }

    /// A TLS target on port 443 with the root path.
    pub fn https(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 443,
            path: "/".into(),
            tls: true,
        }
    }

    /// Replace the request path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Replace the remote port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Policy knobs for one exchange.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Timeout covering resolution, TCP connect and the TLS handshake.
    pub connect_timeout: Duration,

    /// Timeout for each individual write operation.
    pub write_timeout: Duration,

    /// Timeout for each individual read operation. A read that times out
    /// ends the exchange cleanly rather than failing it.
    pub read_timeout: Duration,

    /// Optional deadline for the whole exchange. `None` means the exchange
    /// runs until a terminal read condition or failure.
    pub exchange_timeout: Option<Duration>,

    /// Capacity of the reused read buffer.
    pub read_buffer_size: usize,

    /// How many consecutive empty read completions are retried before the
    /// peer is considered stalled and the connection is closed.
    pub stall_limit: u32,

    /// Whether to disable Nagle's algorithm.
    pub nodelay: bool,

    /// TLS configuration to use for TLS targets. `None` loads the
    /// platform's native trust roots.
    pub tls: Option<Arc<rustls::ClientConfig>>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(10),
            exchange_timeout: None,
            read_buffer_size: 16384,
            stall_limit: 3,
            nodelay: true,
            tls: None,
        }
    }
}
