//! The capability surface of a connected stream.
//!
//! The connection loops never touch the IO type directly; they drive a pair
//! of direction-specific handles obtained from [`Channel::split`]. Each
//! operation carries its own timeout and resolves to exactly one completion,
//! which keeps the one-outstanding-operation invariant a property of the
//! types rather than something to police at runtime.

use std::fmt;
use std::future::Future;
use std::io;
use std::time::Duration;

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _, ReadHalf, WriteHalf};

use crate::stream::ClientStream;

/// Failure of a single channel operation.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The operation did not complete within its timeout.
    #[error("operation timed out")]
    TimedOut,

    /// The underlying transport reported a failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Completion of a single read operation.
///
/// This is the closed rendering of the `bytes read > 0 / == 0 / < 0`
/// contract of an asynchronous channel. The tokio-backed channel completes
/// reads only with data, end-of-stream or failure, and so never produces
/// [`Empty`][ReadSignal::Empty]; the signal exists because the read loop's
/// stall policy is defined over channels that can report no-progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSignal {
    /// `n` bytes were appended to the read buffer.
    Chunk(usize),

    /// The operation completed without transferring data; try again.
    Empty,

    /// The peer closed its send side.
    End,
}

/// Reads response bytes, one bounded operation at a time.
pub trait ReadChannel: Send + 'static {
    /// Issue one read into `buf`, bounded by `limit`.
    ///
    /// Data is appended to `buf`; the caller decides when to drain it.
    fn read(
        &mut self,
        buf: &mut BytesMut,
        limit: Duration,
    ) -> impl Future<Output = Result<ReadSignal, ChannelError>> + Send;
}

/// Writes request bytes, one bounded operation at a time.
pub trait WriteChannel: Send + 'static {
    /// Issue one write of `chunk`, bounded by `limit`.
    ///
    /// Completion reports how many bytes were accepted, which may be fewer
    /// than offered.
    fn write(
        &mut self,
        chunk: &[u8],
        limit: Duration,
    ) -> impl Future<Output = Result<usize, ChannelError>> + Send;

    /// Gracefully close the send side.
    fn shutdown(&mut self) -> impl Future<Output = Result<(), ChannelError>> + Send;
}

/// A bidirectional stream that can be split into its two directions.
///
/// Splitting consumes the stream: each half has exactly one owner, and each
/// direction self-serializes by awaiting its previous operation before
/// issuing the next.
pub trait Channel: Send + 'static {
    /// The read half.
    type Reader: ReadChannel;

    /// The write half.
    type Writer: WriteChannel;

    /// Split into independently-owned read and write halves.
    fn split(self) -> (Self::Reader, Self::Writer);
}

/// Read half of a [`ClientStream`].
pub struct StreamReader {
    inner: ReadHalf<ClientStream>,
}

/// Write half of a [`ClientStream`].
pub struct StreamWriter {
    inner: WriteHalf<ClientStream>,
}

impl fmt::Debug for StreamReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamReader").finish()
    }
}

impl fmt::Debug for StreamWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamWriter").finish()
    }
}

impl Channel for ClientStream {
    type Reader = StreamReader;
    type Writer = StreamWriter;

    fn split(self) -> (Self::Reader, Self::Writer) {
        let (read, write) = tokio::io::split(self);
        (StreamReader { inner: read }, StreamWriter { inner: write })
    }
}

impl ReadChannel for StreamReader {
    async fn read(
        &mut self,
        buf: &mut BytesMut,
        limit: Duration,
    ) -> Result<ReadSignal, ChannelError> {
        match tokio::time::timeout(limit, self.inner.read_buf(buf)).await {
            // Readiness-based reads complete with zero only at end-of-stream.
            Ok(Ok(0)) => Ok(ReadSignal::End),
            Ok(Ok(n)) => Ok(ReadSignal::Chunk(n)),
            Ok(Err(error)) => Err(error.into()),
            Err(_) => Err(ChannelError::TimedOut),
        }
    }
}

impl WriteChannel for StreamWriter {
    async fn write(&mut self, chunk: &[u8], limit: Duration) -> Result<usize, ChannelError> {
        match tokio::time::timeout(limit, self.inner.write(chunk)).await {
            Ok(Ok(n)) => Ok(n),
            Ok(Err(error)) => Err(error.into()),
            Err(_) => Err(ChannelError::TimedOut),
        }
    }

    async fn shutdown(&mut self) -> Result<(), ChannelError> {
        self.inner.shutdown().await.map_err(ChannelError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use static_assertions::assert_impl_all;

    assert_impl_all!(ChannelError: std::error::Error, Send, Sync);
    assert_impl_all!(ReadSignal: Copy, PartialEq, fmt::Debug);
}
