//! Establishing the connection: resolve, connect, handshake.
//!
//! One attempt against one address, with the whole sequence bounded by the
//! connect timeout. Connect failures of every kind are terminal for the
//! exchange; nothing here retries.

use std::io;
use std::net::{SocketAddr, ToSocketAddrs as _};
use std::sync::Arc;

use tokio::net::TcpStream;
use tracing::{debug, trace, warn};

use crate::config::{FetchConfig, Target};
use crate::error::{Error, Phase};
use crate::stream::ClientStream;

/// Connect to `target`, wrapping in TLS when a configuration is given.
pub(crate) async fn establish(
    target: &Target,
    config: &FetchConfig,
    tls: Option<Arc<rustls::ClientConfig>>,
) -> Result<ClientStream, Error> {
    let limit = config.connect_timeout;
    match tokio::time::timeout(limit, connect(target, config, tls)).await {
        Ok(result) => result,
        Err(_) => {
            trace!(timeout=?limit, "connect timed out");
            Err(Error::timeout(Phase::Connect, limit))
        }
    }
}

async fn connect(
    target: &Target,
    config: &FetchConfig,
    tls: Option<Arc<rustls::ClientConfig>>,
) -> Result<ClientStream, Error> {
    let address = resolve(&target.host, target.port).await?;
    trace!(remote.addr = %address, "resolved");

    let stream = TcpStream::connect(address)
        .await
        .map_err(Error::Transport)?;
    trace!("tcp connected");

    if config.nodelay {
        if let Err(error) = stream.set_nodelay(true) {
            warn!("tcp set_nodelay error: {}", error);
        }
    }

    let mut stream = ClientStream::from(stream);
    if let Some(tls_config) = tls {
        stream = stream
            .tls(&target.host, tls_config)
            .map_err(|error| Error::Tls(error.into()))?;
        stream
            .finish_handshake()
            .await
            .map_err(|error| Error::Tls(error.into()))?;
        debug!("tls handshake complete");
    }

    Ok(stream)
}

/// Resolve `host` via the operating system, taking the first address.
///
/// `getaddrinfo` blocks, so it runs on the blocking pool, as is standard
/// for resolver-less clients.
async fn resolve(host: &str, port: u16) -> Result<SocketAddr, Error> {
    let query = (host.to_owned(), port);
    let addresses = tokio::task::spawn_blocking(move || {
        trace!("dns resolution starting");
        query.to_socket_addrs()
    })
    .await?
    .map_err(Error::Resolution)?;

    addresses.into_iter().next().ok_or_else(|| {
        Error::Resolution(io::Error::new(
            io::ErrorKind::NotFound,
            "host resolved to no addresses",
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_localhost() {
        let address = resolve("localhost", 8080).await.unwrap();
        assert_eq!(address.port(), 8080);
    }

    #[tokio::test]
    async fn resolve_literal() {
        let address = resolve("127.0.0.1", 80).await.unwrap();
        assert_eq!(address, "127.0.0.1:80".parse().unwrap());
    }

    #[tokio::test]
    async fn resolve_invalid_host() {
        let error = resolve("host.invalid", 443).await.unwrap_err();
        assert!(matches!(error, Error::Resolution(_)));
    }
}
