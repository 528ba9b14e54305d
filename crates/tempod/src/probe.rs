//! Probes for the daemon's configured target.
//!
//! A probe resolves to `Ok(true)` when the target looks healthy,
//! `Ok(false)` when it answered but reported a problem, and `Err` when it
//! could not be reached at all. Timeouts are enforced by the monitor.

use anyhow::Context;
use tokio::net::TcpStream;
use tracing::debug;

use tempo_health::{ProbeFn, probe_fn};

use crate::config::ProbeConfig;

/// Build the probe described by `config`.
pub fn build(config: &ProbeConfig) -> ProbeFn {
    match config.clone() {
        ProbeConfig::Http { address, path } => probe_fn(move || {
            let address = address.clone();
            let path = path.clone();
            async move { http_probe(&address, &path).await }
        }),
        ProbeConfig::Tcp { address } => probe_fn(move || {
            let address = address.clone();
            async move { tcp_probe(&address).await }
        }),
    }
}

/// Perform an HTTP GET against `path` on `address`.
///
/// Returns `Ok(true)` for 2xx and `Ok(false)` for any other status.
pub async fn http_probe(address: &str, path: &str) -> anyhow::Result<bool> {
    let uri = format!("http://{address}{path}");

    let stream = TcpStream::connect(address)
        .await
        .with_context(|| format!("connecting to {address}"))?;

    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .with_context(|| format!("http handshake with {address}"))?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let req = http::Request::builder()
        .method("GET")
        .uri(&uri)
        .header("host", address)
        .header("user-agent", concat!("tempod/", env!("CARGO_PKG_VERSION")))
        .body(http_body_util::Empty::<bytes::Bytes>::new())?;

    let resp = sender
        .send_request(req)
        .await
        .with_context(|| format!("GET {uri}"))?;

    if resp.status().is_success() {
        Ok(true)
    } else {
        debug!(status = %resp.status(), %uri, "health probe non-2xx");
        Ok(false)
    }
}

/// Open and immediately close a TCP connection to `address`.
pub async fn tcp_probe(address: &str) -> anyhow::Result<bool> {
    TcpStream::connect(address)
        .await
        .with_context(|| format!("connecting to {address}"))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single HTTP response with the given status line.
    async fn serve_once(status_line: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await.unwrap();
            let response = format!("HTTP/1.1 {status_line}\r\ncontent-length: 0\r\n\r\n");
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn http_probe_2xx_is_healthy() {
        let addr = serve_once("200 OK").await;
        assert!(http_probe(&addr, "/healthz").await.unwrap());
    }

    #[tokio::test]
    async fn http_probe_non_2xx_is_unhealthy() {
        let addr = serve_once("503 Service Unavailable").await;
        assert!(!http_probe(&addr, "/healthz").await.unwrap());
    }

    #[tokio::test]
    async fn http_probe_to_closed_port_is_an_error() {
        // Port 1 won't be listening.
        let err = http_probe("127.0.0.1:1", "/healthz").await.unwrap_err();
        assert!(err.to_string().contains("connecting to 127.0.0.1:1"));
    }

    #[tokio::test]
    async fn tcp_probe_reports_reachability() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        assert!(tcp_probe(&addr).await.unwrap());

        drop(listener);
        assert!(tcp_probe("127.0.0.1:1").await.is_err());
    }

    #[tokio::test]
    async fn build_wraps_configured_target() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let probe = build(&ProbeConfig::Tcp { address });
        assert!(probe().await.unwrap());
    }
}
