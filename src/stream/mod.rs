//! Stream type providing [`AsyncRead`] and [`AsyncWrite`] over plain TCP
//! or TLS through a unified type.
//!
//! The connection core owns exactly one [`ClientStream`] per exchange and
//! splits it into halves once connected; nothing else mutates it.

use std::io;

use pin_project::pin_project;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

pub mod tls;

pub use self::tls::ClientTlsStream;

/// Dispatching wrapper for the stream connection types an exchange can
/// run over.
///
/// Effectively implements enum-dispatch for AsyncRead and AsyncWrite
/// around the plain and TLS renditions of the connection.
#[derive(Debug)]
#[pin_project(project = ClientStreamProjection)]
pub enum ClientStream {
    /// A plain TCP stream.
    Tcp(#[pin] TcpStream),

    /// A TLS stream over TCP.
    Tls(#[pin] ClientTlsStream<TcpStream>),
}

macro_rules! dispatch {
    (pin $stream:ident.$method:ident($($args:expr),*)) => {
        match $stream.project() {
            ClientStreamProjection::Tcp(stream) => stream.$method($($args),*),
            ClientStreamProjection::Tls(stream) => stream.$method($($args),*),
        }
    };
}

impl ClientStream {
    /// Wrap this stream in TLS for `domain`.
    ///
    /// Fails when `domain` is not a valid server name, or when called on a
    /// stream which already has TLS.
    pub fn tls(self, domain: &str, config: std::sync::Arc<rustls::ClientConfig>) -> io::Result<Self> {
        match self {
            ClientStream::Tcp(stream) => Ok(ClientStream::Tls(ClientTlsStream::new(
                stream, domain, config,
            )?)),
            ClientStream::Tls(_) => Err(io::Error::other("stream already has tls")),
        }
    }

    /// Drive the TLS handshake to completion.
    ///
    /// A no-op for plain streams. Without this call the handshake would
    /// complete lazily on first use; the connection core calls it during
    /// the connect phase so that handshake failures surface there.
    pub async fn finish_handshake(&mut self) -> io::Result<()> {
        match self {
            ClientStream::Tcp(_) => Ok(()),
            ClientStream::Tls(stream) => stream.finish_handshake().await,
        }
    }
}

impl From<TcpStream> for ClientStream {
    fn from(stream: TcpStream) -> Self {
        ClientStream::Tcp(stream)
    }
}

impl From<ClientTlsStream<TcpStream>> for ClientStream {
    fn from(stream: ClientTlsStream<TcpStream>) -> Self {
        ClientStream::Tls(stream)
    }
}

impl AsyncRead for ClientStream {
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<io::Result<()>> {
        dispatch!(pin self.poll_read(cx, buf))
    }
}

impl AsyncWrite for ClientStream {
    fn poll_write(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<Result<usize, io::Error>> {
        dispatch!(pin self.poll_write(cx, buf))
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), io::Error>> {
        dispatch!(pin self.poll_flush(cx))
    }

    fn poll_shutdown(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), io::Error>> {
        dispatch!(pin self.poll_shutdown(cx))
    }
}
