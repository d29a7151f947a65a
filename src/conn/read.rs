//! The read side of an exchange.
//!
//! Consumes response bytes until the peer hangs up, delivering each chunk
//! to the sink and reusing one fixed-capacity buffer. End-of-stream and a
//! read timeout both end the exchange cleanly; repeated empty completions
//! past the stall limit close it as stalled.

use std::time::Duration;

use bytes::BytesMut;
use tracing::{debug, trace};

use crate::channel::{ChannelError, ReadChannel, ReadSignal};
use crate::config::FetchConfig;
use crate::conn::Outcome;
use crate::error::Error;
use crate::sink::ChunkSink;

/// Reads the response stream and feeds the sink.
pub(crate) struct ResponseReader<R, S> {
    reader: R,
    sink: S,
    buffer: BytesMut,
    limit: Duration,
    stall_limit: u32,
    empty_reads: u32,
    received: u64,
}

impl<R, S> ResponseReader<R, S>
where
    R: ReadChannel,
    S: ChunkSink,
{
    pub(crate) fn new(reader: R, sink: S, config: &FetchConfig) -> Self {
        Self {
            reader,
            sink,
            buffer: BytesMut::with_capacity(config.read_buffer_size),
            limit: config.read_timeout,
            stall_limit: config.stall_limit,
            empty_reads: 0,
            received: 0,
        }
    }

    /// Read until a terminal condition and report it.
    ///
    /// Exactly one read is outstanding at any time; the next is issued only
    /// after the previous completion is handled.
    pub(crate) async fn receive(mut self) -> Result<Outcome, Error> {
        loop {
            match self.reader.read(&mut self.buffer, self.limit).await {
                Ok(ReadSignal::Chunk(bytes)) => {
                    self.empty_reads = 0;
                    self.received += bytes as u64;
                    self.sink.deliver(&self.buffer);
                    self.buffer.clear();
                    trace!(bytes, "chunk delivered");
                }
                Ok(ReadSignal::Empty) => {
                    // No data was transferred, so the buffer is left alone.
                    self.empty_reads += 1;
                    if self.empty_reads > self.stall_limit {
                        debug!(consecutive = self.empty_reads, "peer stalled, closing");
                        return Ok(Outcome::Stalled {
                            received: self.received,
                        });
                    }
                    trace!(consecutive = self.empty_reads, "empty read, trying again");
                }
                Ok(ReadSignal::End) => {
                    debug!(received = self.received, "end of stream");
                    return Ok(Outcome::Complete {
                        received: self.received,
                    });
                }
                Err(ChannelError::TimedOut) => {
                    debug!(received = self.received, "read timed out, closing");
                    return Ok(Outcome::TimedOut {
                        received: self.received,
                    });
                }
                Err(ChannelError::Io(error)) => return Err(Error::Transport(error)),
            }
        }
    }
}
