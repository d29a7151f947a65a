//! Client-side TLS stream with a deferred handshake.
//!
//! The handshake is driven by the first read or write against the stream,
//! or explicitly via [`ClientTlsStream::finish_handshake`] so that
//! handshake failures can be classified as connect-phase errors.

use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::ready;
use rustls::ClientConfig;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

enum State<IO> {
    Handshake(tokio_rustls::Connect<IO>),
    Streaming(tokio_rustls::client::TlsStream<IO>),
}

impl<IO> fmt::Debug for State<IO> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Handshake(_) => f.write_str("State::Handshake"),
            State::Streaming(_) => f.write_str("State::Streaming"),
        }
    }
}

/// A TLS stream, generic over the underlying IO.
#[derive(Debug)]
pub struct ClientTlsStream<IO> {
    state: State<IO>,
}

impl<IO> ClientTlsStream<IO>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    /// Start TLS over `stream` for `domain`.
    ///
    /// Fails when `domain` is not a valid server name for SNI.
    pub fn new(stream: IO, domain: &str, config: Arc<ClientConfig>) -> io::Result<Self> {
        let domain = rustls::pki_types::ServerName::try_from(domain)
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidInput, error))?
            .to_owned();

        let connect = tokio_rustls::TlsConnector::from(config).connect(domain, stream);
        Ok(Self {
            state: State::Handshake(connect),
        })
    }

    /// Finish the TLS handshake.
    pub async fn finish_handshake(&mut self) -> io::Result<()> {
        futures_util::future::poll_fn(|cx| self.handshake(cx, |_, _| Poll::Ready(Ok(())))).await
    }

    fn handshake<F, R>(&mut self, cx: &mut Context<'_>, action: F) -> Poll<io::Result<R>>
    where
        F: FnOnce(&mut tokio_rustls::client::TlsStream<IO>, &mut Context<'_>) -> Poll<io::Result<R>>,
    {
        match self.state {
            State::Handshake(ref mut connect) => match ready!(Pin::new(connect).poll(cx)) {
                Ok(mut stream) => {
                    let result = action(&mut stream, cx);
                    self.state = State::Streaming(stream);
                    result
                }
                Err(err) => Poll::Ready(Err(err)),
            },
            State::Streaming(ref mut stream) => action(stream, cx),
        }
    }
}

impl<IO> AsyncRead for ClientTlsStream<IO>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let pin = self.get_mut();
        pin.handshake(cx, |stream, cx| Pin::new(stream).poll_read(cx, buf))
    }
}

impl<IO> AsyncWrite for ClientTlsStream<IO>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let pin = self.get_mut();
        pin.handshake(cx, |stream, cx| Pin::new(stream).poll_write(cx, buf))
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.state {
            State::Handshake(_) => Poll::Ready(Ok(())),
            State::Streaming(ref mut stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.state {
            State::Handshake(_) => Poll::Ready(Ok(())),
            State::Streaming(ref mut stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// Build a TLS client configuration from the platform's native trust roots.
///
/// Fails when no roots can be loaded at all; individual unreadable
/// certificates are skipped.
pub fn platform_tls_config() -> io::Result<ClientConfig> {
    let loaded = rustls_native_certs::load_native_certs();

    let mut roots = rustls::RootCertStore::empty();
    for cert in loaded.certs {
        if let Err(error) = roots.add(cert) {
            tracing::debug!("skipping unusable platform certificate: {}", error);
        }
    }

    if roots.is_empty() {
        return Err(io::Error::other(match loaded.errors.into_iter().next() {
            Some(error) => format!("no usable platform trust roots: {error}"),
            None => "no usable platform trust roots".into(),
        }));
    }

    let mut config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    config.alpn_protocols.push(b"http/1.1".to_vec());
    Ok(config)
}
