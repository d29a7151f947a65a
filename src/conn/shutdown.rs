//! Idempotent teardown of a connection.
//!
//! Whichever side of the exchange reaches a terminal condition first, the
//! same path closes the stream and the task group, and a second invocation
//! is a no-op. Failures during teardown are reported and swallowed so they
//! never mask the condition that triggered it.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinSet;
use tracing::{debug, trace, warn};

use crate::channel::WriteChannel;

/// Once-guarded connection teardown.
#[derive(Debug, Default)]
pub(crate) struct Teardown {
    finished: AtomicBool,
}

impl Teardown {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Tear down the task group and, when available, the write half.
    ///
    /// Steps, each best-effort and tolerant of already-closed resources:
    /// abort outstanding connection tasks, close the stream's send side
    /// gracefully, then drain the task group to completion.
    pub(crate) async fn finish<T, W>(&self, driver: &mut JoinSet<T>, writer: Option<W>)
    where
        T: 'static,
        W: WriteChannel,
    {
        if self.finished.swap(true, Ordering::SeqCst) {
            trace!("connection already torn down");
            return;
        }

        driver.abort_all();

        if let Some(mut writer) = writer {
            if let Err(error) = writer.shutdown().await {
                debug!("stream close failed: {}", error);
            }
        }

        while let Some(result) = driver.join_next().await {
            if let Err(error) = result {
                if !error.is_cancelled() {
                    warn!("connection task failed during teardown: {}", error);
                }
            }
        }

        trace!("teardown complete");
    }
}
