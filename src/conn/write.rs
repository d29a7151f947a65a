//! The write side of an exchange.
//!
//! Delivers the entire request buffer, tolerating partial completions. The
//! loop owns its half of the stream, so exactly one write is outstanding at
//! any time. Finishing the request is silent: only the read side, or a
//! failure, terminates the exchange.

use std::io;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::channel::{ChannelError, WriteChannel};
use crate::error::{Error, Phase};

/// Drains one immutable request buffer into the write half.
#[derive(Debug)]
pub(crate) struct RequestWriter<W> {
    writer: W,
    request: Bytes,
    cursor: usize,
    limit: Duration,
}

impl<W> RequestWriter<W>
where
    W: WriteChannel,
{
    pub(crate) fn new(writer: W, request: Bytes, limit: Duration) -> Self {
        Self {
            writer,
            request,
            cursor: 0,
            limit,
        }
    }

    /// Write until the cursor covers the request, then return the write
    /// half so the connection can be closed gracefully.
    ///
    /// Any failure, including a write timeout, is terminal for the whole
    /// connection.
    pub(crate) async fn send(mut self) -> Result<W, Error> {
        while self.cursor < self.request.len() {
            let remaining = &self.request[self.cursor..];
            let written = match self.writer.write(remaining, self.limit).await {
                Ok(n) => n,
                Err(ChannelError::TimedOut) => {
                    return Err(Error::timeout(Phase::Write, self.limit))
                }
                Err(ChannelError::Io(error)) => return Err(Error::Transport(error)),
            };

            if written == 0 {
                return Err(Error::Transport(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "write accepted no bytes",
                )));
            }
            if written > remaining.len() {
                return Err(Error::misuse(
                    "write completion reported more bytes than were offered",
                ));
            }

            self.cursor += written;
            trace!(
                written,
                sent = self.cursor,
                total = self.request.len(),
                "write complete"
            );
        }

        debug!(bytes = self.request.len(), "request sent");
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::conn::mock::{MockWrite, MockWriter};

    fn request() -> Bytes {
        Bytes::from(vec![b'x'; 100])
    }

    #[tokio::test]
    async fn single_completion() {
        let (writer, transcript) = MockWriter::new(vec![]);
        let writer = RequestWriter::new(writer, request(), Duration::from_secs(1));

        writer.send().await.unwrap();
        assert_eq!(transcript.written(), request());
    }

    #[tokio::test]
    async fn partial_completions() {
        let (writer, transcript) = MockWriter::new(vec![MockWrite::Accept(60), MockWrite::Accept(40)]);
        let writer = RequestWriter::new(writer, request(), Duration::from_secs(1));

        writer.send().await.unwrap();
        assert_eq!(transcript.written(), request());
        assert_eq!(transcript.writes(), 2);
    }

    #[tokio::test]
    async fn zero_length_completion() {
        let (writer, _) = MockWriter::new(vec![MockWrite::Accept(0)]);
        let writer = RequestWriter::new(writer, request(), Duration::from_secs(1));

        let error = writer.send().await.unwrap_err();
        assert!(matches!(error, Error::Transport(ref e) if e.kind() == io::ErrorKind::WriteZero));
    }

    #[tokio::test]
    async fn over_reported_completion() {
        let (writer, _) = MockWriter::new(vec![MockWrite::Report(150)]);
        let writer = RequestWriter::new(writer, request(), Duration::from_secs(1));

        let error = writer.send().await.unwrap_err();
        assert!(matches!(error, Error::Misuse(_)));
    }

    #[tokio::test]
    async fn timeout_is_abnormal() {
        let limit = Duration::from_millis(250);
        let (writer, _) = MockWriter::new(vec![MockWrite::Accept(60), MockWrite::TimedOut]);
        let writer = RequestWriter::new(writer, request(), limit);

        let error = writer.send().await.unwrap_err();
        assert!(
            matches!(error, Error::Timeout { phase: Phase::Write, limit: l } if l == limit)
        );
    }

    #[tokio::test]
    async fn transport_failure() {
        let (writer, _) = MockWriter::new(vec![MockWrite::Fail(io::ErrorKind::BrokenPipe)]);
        let writer = RequestWriter::new(writer, request(), Duration::from_secs(1));

        let error = writer.send().await.unwrap_err();
        assert!(matches!(error, Error::Transport(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
    }
}
