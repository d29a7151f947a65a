//! Fetch a web page over a single connection and print it to stdout.
//!
//! Usage: `cargo run --example get -- [url]`, where the url looks like
//! `scheme://host[:port][/path]` and the scheme is `http` or `https`.
//! Without an argument the page at `https://github.com` is fetched.

use filament::{fetch, FetchConfig, Target};

fn decompose(url: &str) -> Result<Target, String> {
    let (scheme, rest) = url
        .split_once("://")
        .ok_or("expected scheme://host[:port][/path]")?;
    let tls = match scheme {
        "http" => false,
        "https" => true,
        _ => return Err("scheme must be http or https".into()),
    };

    let (authority, path) = match rest.find('/') {
        Some(slash) => (&rest[..slash], &rest[slash..]),
        None => (rest, "/"),
    };
    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => (host, port.parse::<u16>().map_err(|_| "invalid port")?),
        None => (authority, if tls { 443 } else { 80 }),
    };
    if host.is_empty() {
        return Err("host name is empty".into());
    }

    Ok(Target {
        host: host.into(),
        port,
        path: path.into(),
        tls,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt::init();

    let _ = rustls::crypto::ring::default_provider().install_default();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://github.com".to_string());
    let target = decompose(&url).map_err(|message| format!("illegal url {url:?}: {message}"))?;

    let outcome = fetch(target, FetchConfig::default(), |chunk: &[u8]| {
        print!("{}", String::from_utf8_lossy(chunk));
    })
    .await?;

    eprintln!("connection closed: {outcome}");
    Ok(())
}
