//! Delivery of response chunks to the caller.
//!
//! The read loop hands every received chunk to a [`ChunkSink`] and then
//! reuses its buffer; a sink that wants to keep the bytes must copy them.

/// Receives response bytes as they arrive.
///
/// Any `FnMut(&[u8])` closure is a sink, which covers accumulating into a
/// shared buffer, forwarding chunks over a channel to another task, or
/// writing them straight to an output.
pub trait ChunkSink: Send + 'static {
    /// Deliver one non-empty chunk of response bytes.
    fn deliver(&mut self, chunk: &[u8]);
}

impl<F> ChunkSink for F
where
    F: FnMut(&[u8]) + Send + 'static,
{
    fn deliver(&mut self, chunk: &[u8]) {
        self(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    #[test]
    fn closure_accumulates() {
        let body: Arc<Mutex<Vec<u8>>> = Arc::default();
        let mut sink = {
            let body = body.clone();
            move |chunk: &[u8]| body.lock().unwrap().extend_from_slice(chunk)
        };

        sink.deliver(b"hello ");
        sink.deliver(b"world");
        assert_eq!(*body.lock().unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn closure_streams_over_a_channel() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut sink = move |chunk: &[u8]| {
            let _ = tx.send(bytes::Bytes::copy_from_slice(chunk));
        };

        sink.deliver(b"chunk");
        assert_eq!(rx.recv().await.unwrap(), bytes::Bytes::from_static(b"chunk"));
    }
}
