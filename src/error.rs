//! Error types for the connection lifecycle.
//!
//! Every abnormal terminal condition converges on [`Error`]; the variants
//! are the full set of failure kinds an exchange can end with. A read
//! timeout is deliberately absent: it ends the exchange cleanly and is
//! reported as [`Outcome::TimedOut`][crate::Outcome::TimedOut] instead.

use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::BoxError;

/// The lifecycle phase in which a timeout occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Resolving, connecting and handshaking.
    Connect,

    /// Writing the request.
    Write,

    /// The whole exchange, when a deadline was configured.
    Exchange,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Connect => f.write_str("connect"),
            Phase::Write => f.write_str("write"),
            Phase::Exchange => f.write_str("exchange"),
        }
    }
}

/// Terminal failure of an exchange.
///
/// None of these are retried; whichever occurs first tears the connection
/// down and is reported as the single outcome of the exchange.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The remote address could not be resolved.
    #[error("address resolution: {0}")]
    Resolution(#[source] io::Error),

    /// An internal invariant was violated.
    #[error("connection misuse: {0}")]
    Misuse(#[source] BoxError),

    /// The transport failed while connecting, writing or reading.
    #[error("transport: {0}")]
    Transport(#[source] io::Error),

    /// TLS configuration was rejected or the handshake failed.
    #[error("tls: {0}")]
    Tls(#[source] BoxError),

    /// A connect or write operation, or the whole exchange, timed out.
    #[error("{phase} timed out after {limit:?}")]
    Timeout {
        /// Which phase exceeded its timeout.
        phase: Phase,
        /// The configured limit that was exceeded.
        limit: Duration,
    },
}

impl Error {
    pub(crate) fn misuse<M>(message: M) -> Self
    where
        M: Into<BoxError>,
    {
        Error::Misuse(message.into())
    }

    pub(crate) fn timeout(phase: Phase, limit: Duration) -> Self {
        Error::Timeout { phase, limit }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(error: tokio::task::JoinError) -> Self {
        Error::misuse(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use static_assertions::assert_impl_all;

    assert_impl_all!(Error: std::error::Error, Send, Sync);

    #[test]
    fn display() {
        let error = Error::timeout(Phase::Connect, Duration::from_secs(10));
        assert_eq!(error.to_string(), "connect timed out after 10s");

        let error = Error::misuse("loops finished without a terminal event");
        assert!(error.to_string().starts_with("connection misuse"));
    }
}
