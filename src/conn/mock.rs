//! Scripted channel for driving the connection loops in tests.
//!
//! Each mock half replays a fixed script of completions, one per
//! operation, and records what the loops did with it in a shared
//! [`Transcript`].

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::BytesMut;

use crate::channel::{Channel, ChannelError, ReadChannel, ReadSignal, WriteChannel};

/// One scripted read completion.
#[derive(Debug, Clone, Copy)]
pub(crate) enum MockRead {
    /// Append these bytes and report them.
    Chunk(&'static [u8]),
    /// Complete without transferring data.
    Empty,
    /// Signal end-of-stream.
    End,
    /// Fail with a timeout.
    TimedOut,
    /// Fail with an I/O error.
    Fail(io::ErrorKind),
    /// Never complete; only an abort ends this read.
    Pending,
}

/// One scripted write completion.
#[derive(Debug, Clone, Copy)]
pub(crate) enum MockWrite {
    /// Accept at most this many of the offered bytes.
    Accept(usize),
    /// Report exactly this count, regardless of what was offered.
    Report(usize),
    /// Fail with a timeout.
    TimedOut,
    /// Fail with an I/O error.
    Fail(io::ErrorKind),
}

/// What the loops did to the mock channel.
#[derive(Debug, Clone, Default)]
pub(crate) struct Transcript {
    written: Arc<Mutex<Vec<u8>>>,
    writes: Arc<AtomicUsize>,
    shutdowns: Arc<AtomicUsize>,
}

impl Transcript {
    /// All bytes the write loop delivered, in order.
    pub(crate) fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }

    /// Number of write operations issued.
    pub(crate) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of graceful shutdowns requested on the write half.
    pub(crate) fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

/// Scripted read half.
#[derive(Debug)]
pub(crate) struct MockReader {
    script: VecDeque<MockRead>,
}

impl MockReader {
    pub(crate) fn new(script: Vec<MockRead>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl ReadChannel for MockReader {
    async fn read(
        &mut self,
        buf: &mut BytesMut,
        _limit: Duration,
    ) -> Result<ReadSignal, ChannelError> {
        match self.script.pop_front() {
            Some(MockRead::Chunk(data)) => {
                buf.extend_from_slice(data);
                Ok(ReadSignal::Chunk(data.len()))
            }
            Some(MockRead::Empty) => Ok(ReadSignal::Empty),
            Some(MockRead::End) | None => Ok(ReadSignal::End),
            Some(MockRead::TimedOut) => Err(ChannelError::TimedOut),
            Some(MockRead::Fail(kind)) => Err(ChannelError::Io(kind.into())),
            Some(MockRead::Pending) => std::future::pending().await,
        }
    }
}

/// Scripted write half.
#[derive(Debug)]
pub(crate) struct MockWriter {
    script: VecDeque<MockWrite>,
    transcript: Transcript,
}

impl MockWriter {
    pub(crate) fn new(script: Vec<MockWrite>) -> (Self, Transcript) {
        let transcript = Transcript::default();
        (
            Self {
                script: script.into(),
                transcript: transcript.clone(),
            },
            transcript,
        )
    }
}

impl WriteChannel for MockWriter {
    async fn write(&mut self, chunk: &[u8], _limit: Duration) -> Result<usize, ChannelError> {
        self.transcript.writes.fetch_add(1, Ordering::SeqCst);
        match self.script.pop_front() {
            Some(MockWrite::Accept(cap)) => {
                let accepted = cap.min(chunk.len());
                self.transcript
                    .written
                    .lock()
                    .unwrap()
                    .extend_from_slice(&chunk[..accepted]);
                Ok(accepted)
            }
            Some(MockWrite::Report(reported)) => {
                let recorded = reported.min(chunk.len());
                self.transcript
                    .written
                    .lock()
                    .unwrap()
                    .extend_from_slice(&chunk[..recorded]);
                Ok(reported)
            }
            Some(MockWrite::TimedOut) => Err(ChannelError::TimedOut),
            Some(MockWrite::Fail(kind)) => Err(ChannelError::Io(kind.into())),
            None => {
                self.transcript
                    .written
                    .lock()
                    .unwrap()
                    .extend_from_slice(chunk);
                Ok(chunk.len())
            }
        }
    }

    async fn shutdown(&mut self) -> Result<(), ChannelError> {
        self.transcript.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Scripted bidirectional channel.
#[derive(Debug)]
pub(crate) struct MockChannel {
    reader: MockReader,
    writer: MockWriter,
}

impl MockChannel {
    pub(crate) fn new(reads: Vec<MockRead>, writes: Vec<MockWrite>) -> (Self, Transcript) {
        let (writer, transcript) = MockWriter::new(writes);
        (
            Self {
                reader: MockReader::new(reads),
                writer,
            },
            transcript,
        )
    }
}

impl Channel for MockChannel {
    type Reader = MockReader;
    type Writer = MockWriter;

    fn split(self) -> (Self::Reader, Self::Writer) {
        (self.reader, self.writer)
    }
}
