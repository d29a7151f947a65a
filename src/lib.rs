//! Filament
//!
//! A single-strand asynchronous client: connect a TLS-capable stream to one
//! remote peer, send one request, and stream the response back in chunks
//! until the peer hangs up.
//!
//! The crate is deliberately narrow. It does not parse responses, pool
//! connections, or retry. It drives exactly one connection through its
//! lifecycle (connect, write, read, close) and reports exactly one
//! terminal [`Outcome`] (or [`Error`]) for the whole exchange.
//!
//! # Example
//! ```no_run
//! use filament::{fetch, FetchConfig, Target};
//!
//! # async fn run() -> Result<(), filament::Error> {
//! let target = Target::https("example.com");
//! let outcome = fetch(target, FetchConfig::default(), |chunk: &[u8]| {
//!     print!("{}", String::from_utf8_lossy(chunk));
//! })
//! .await?;
//!
//! println!("{outcome}");
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod config;
mod conn;
pub mod error;
pub mod request;
pub mod sink;
pub mod stream;
mod transport;

pub use self::channel::{Channel, ChannelError, ReadChannel, ReadSignal, WriteChannel};
pub use self::config::{FetchConfig, Target};
pub use self::conn::{fetch, Outcome};
pub use self::error::{Error, Phase};
pub use self::sink::ChunkSink;
pub use self::stream::ClientStream;

/// A boxed error, used where the underlying cause can take several types.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
