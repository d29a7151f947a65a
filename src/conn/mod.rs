//! The connection supervisor.
//!
//! One exchange is one connection driven through
//! `Idle → Connecting → Connected → Closing → Closed`. Once connected, the
//! stream is split and a task per direction is spawned into the
//! connection's task group; the supervisor waits for the first terminal
//! event from either side and funnels every ending, clean or not,
//! through the same idempotent teardown.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinSet;
use tracing::{debug, debug_span, trace, Instrument as _};

use crate::channel::{Channel, StreamWriter};
use crate::config::{FetchConfig, Target};
use crate::error::{Error, Phase};
use crate::request;
use crate::sink::ChunkSink;
use crate::stream::tls::platform_tls_config;
use crate::transport;

use self::read::ResponseReader;
use self::shutdown::Teardown;
use self::write::RequestWriter;

#[cfg(test)]
pub(crate) mod mock;
mod read;
mod shutdown;
mod write;

/// The single terminal outcome of an exchange that ended cleanly.
///
/// Abnormal endings are reported as [`Error`] instead; between the two,
/// every exchange ends in exactly one way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The peer closed its send side and the response was consumed in full.
    Complete {
        /// Bytes delivered to the sink.
        received: u64,
    },

    /// No data arrived within the read timeout; the interaction is over.
    TimedOut {
        /// Bytes delivered to the sink.
        received: u64,
    },

    /// The peer repeatedly completed reads without data.
    Stalled {
        /// Bytes delivered to the sink.
        received: u64,
    },
}

impl Outcome {
    /// Total bytes delivered to the sink over the exchange.
    pub fn received(&self) -> u64 {
        match *self {
            Outcome::Complete { received }
            | Outcome::TimedOut { received }
            | Outcome::Stalled { received } => received,
        }
    }

    /// Whether the response was consumed to end-of-stream.
    pub fn is_complete(&self) -> bool {
        matches!(self, Outcome::Complete { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Complete { received } => write!(f, "complete ({received} bytes)"),
            Outcome::TimedOut { received } => write!(f, "timed out ({received} bytes)"),
            Outcome::Stalled { received } => write!(f, "stalled ({received} bytes)"),
        }
    }
}

/// Lifecycle states of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Connecting,
    Connected,
    Closing,
    Closed,
}

/// Message from a direction task back to the supervisor.
enum Event<W> {
    /// The request went out in full; the write half comes back for the
    /// graceful close.
    Sent(W),

    /// The read side reached its terminal condition.
    Received(Outcome),
}

/// Perform one full exchange against `target`.
///
/// Connects, sends a single request, and streams response chunks to `sink`
/// until a terminal condition. Connect failures of any kind are terminal
/// and never retried. The returned value is the one terminal report for
/// the whole exchange: `Ok` when the stream ended cleanly (end-of-stream,
/// read timeout, or stall), `Err` for every abnormal failure.
pub async fn fetch<S>(target: Target, config: FetchConfig, sink: S) -> Result<Outcome, Error>
where
    S: ChunkSink,
{
    Exchange::new(config).run(target, sink).await
}

/// Drives one connection through its lifecycle.
struct Exchange {
    config: FetchConfig,
    state: State,
}

impl Exchange {
    fn new(config: FetchConfig) -> Self {
        Self {
            config,
            state: State::Idle,
        }
    }

    fn transition(&mut self, next: State) {
        trace!(from = ?self.state, to = ?next, "transition");
        self.state = next;
    }

    /// Resolve the TLS configuration for the target, before connecting.
    fn open(&self, target: &Target) -> Result<Option<Arc<rustls::ClientConfig>>, Error> {
        if !target.tls {
            return Ok(None);
        }
        match &self.config.tls {
            Some(config) => Ok(Some(config.clone())),
            None => Ok(Some(Arc::new(
                platform_tls_config().map_err(|error| Error::Tls(error.into()))?,
            ))),
        }
    }

    async fn run<S>(mut self, target: Target, sink: S) -> Result<Outcome, Error>
    where
        S: ChunkSink,
    {
        let span = debug_span!("exchange", host = %target.host, port = target.port, tls = target.tls);
        async move {
            // The task group outlives the connect attempt so that every
            // failure below funnels through the same teardown.
            let teardown = Teardown::new();
            let mut driver: JoinSet<Result<Event<StreamWriter>, Error>> = JoinSet::new();

            let tls = match self.open(&target) {
                Ok(tls) => tls,
                Err(error) => return self.fail(&mut driver, &teardown, error).await,
            };

            self.transition(State::Connecting);
            let stream = match transport::establish(&target, &self.config, tls).await {
                Ok(stream) => stream,
                Err(error) => return self.fail(&mut driver, &teardown, error).await,
            };

            self.transition(State::Connected);
            let request = request::get(&target.host, &target.path);

            match self.config.exchange_timeout {
                Some(limit) => {
                    let supervised =
                        self.drive(&mut driver, &teardown, stream, request, sink);
                    match tokio::time::timeout(limit, supervised).await {
                        Ok(result) => result,
                        Err(_) => {
                            debug!(timeout = ?limit, "exchange deadline exceeded");
                            self.fail(
                                &mut driver,
                                &teardown,
                                Error::timeout(Phase::Exchange, limit),
                            )
                            .await
                        }
                    }
                }
                None => self.drive(&mut driver, &teardown, stream, request, sink).await,
            }
        }
        .instrument(span)
        .await
    }

    /// Supervise the two direction tasks until the first terminal event,
    /// then tear the connection down.
    async fn drive<C, S>(
        &mut self,
        driver: &mut JoinSet<Result<Event<C::Writer>, Error>>,
        teardown: &Teardown,
        channel: C,
        request: Bytes,
        sink: S,
    ) -> Result<Outcome, Error>
    where
        C: Channel,
        S: ChunkSink,
    {
        let (reader, writer) = channel.split();

        let sender = RequestWriter::new(writer, request, self.config.write_timeout);
        driver.spawn(async move { sender.send().await.map(Event::Sent) });

        let receiver = ResponseReader::new(reader, sink, &self.config);
        driver.spawn(async move { receiver.receive().await.map(Event::Received) });

        let mut writer: Option<C::Writer> = None;
        let result = loop {
            match driver.join_next().await {
                // The request is out; only the read side, or a failure,
                // terminates the exchange.
                Some(Ok(Ok(Event::Sent(handle)))) => writer = Some(handle),
                Some(Ok(Ok(Event::Received(outcome)))) => break Ok(outcome),
                Some(Ok(Err(error))) => break Err(error),
                Some(Err(join_error)) => break Err(join_error.into()),
                None => {
                    break Err(Error::misuse(
                        "connection tasks ended without a terminal event",
                    ))
                }
            }
        };

        self.transition(State::Closing);
        teardown.finish(driver, writer).await;
        self.transition(State::Closed);
        result
    }

    /// Terminal path for failures that occur outside the supervised loops.
    async fn fail(
        &mut self,
        driver: &mut JoinSet<Result<Event<StreamWriter>, Error>>,
        teardown: &Teardown,
        error: Error,
    ) -> Result<Outcome, Error> {
        self.transition(State::Closing);
        teardown.finish(driver, Option::<StreamWriter>::None).await;
        self.transition(State::Closed);
        Err(error)
    }
}
