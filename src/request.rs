//! Request buffer construction.
//!
//! The request is a single plain-text `GET` line with a `Host` header and
//! `Connection: Keep-Alive`; the response is consumed as an opaque byte
//! stream, so no further HTTP machinery lives here.

use bytes::Bytes;

/// Build the request buffer for `path` on `host`.
///
/// The buffer is immutable once built; the write loop tracks its own cursor
/// into it. A missing leading `/` on the path is supplied.
pub fn get(host: &str, path: &str) -> Bytes {
    let slash = if path.starts_with('/') { "" } else { "/" };
    Bytes::from(format!(
        "GET {slash}{path} HTTP/1.1\r\nHost: {host}\r\nConnection: Keep-Alive\r\n\r\n"
    ))
}
