//! [`HealthServer`] – a fixed plaintext liveness responder.
//!
//! Listens on `0.0.0.0:8081` by default (configurable via
//! [`HealthServer::with_port`]). Every connection receives the same
//! `200 OK` response and is closed; the request itself is not inspected.
//! The server shares no state with the collision engine.

use std::net::SocketAddr;
use std::time::Duration;

use raywarden_types::RayError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

/// Default TCP port for the health endpoint.
pub const DEFAULT_PORT: u16 = 8081;

/// Response body sent to every client.
pub const HEALTH_BODY: &str = "collision avoidance is healthy";

/// How long to wait for the client's request bytes before answering anyway.
const READ_GRACE: Duration = Duration::from_millis(500);

// ---------------------------------------------------------------------------
// HealthServer
// ---------------------------------------------------------------------------

/// # Example
///
/// ```rust,no_run
/// use raywarden_health::HealthServer;
///
/// #[tokio::main]
/// async fn main() {
///     HealthServer::new()
///         .with_port(8081)
///         .run()
///         .await
///         .expect("health server failed");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct HealthServer {
    port: u16,
}

impl HealthServer {
    /// Create a server on the [`DEFAULT_PORT`].
    pub fn new() -> Self {
        Self { port: DEFAULT_PORT }
    }

    /// Override the listening port (builder-style).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Return the configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Bind the configured port and serve forever.
    ///
    /// # Errors
    ///
    /// Returns [`RayError::Io`] if the TCP listener cannot bind.
    pub async fn run(self) -> Result<(), RayError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RayError::Io(format!("health bind error on {addr}: {e}")))?;
        info!(port = self.port, "health endpoint listening");
        serve(listener).await
    }
}

impl Default for HealthServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Answer every connection on `listener`.
pub async fn serve(listener: TcpListener) -> Result<(), RayError> {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                tokio::spawn(async move {
                    if let Err(e) = respond(stream).await {
                        error!(peer = %peer, error = %e, "health client error");
                    }
                });
            }
            Err(e) => {
                error!(error = %e, "health accept error");
            }
        }
    }
}

/// The raw HTTP response bytes.
pub fn health_response() -> String {
    format!(
        "HTTP/1.1 200 OK\r\n\
         Content-Type: text/plain; encoding=utf-8\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        HEALTH_BODY.len(),
        HEALTH_BODY
    )
}

// ---------------------------------------------------------------------------
// Per-connection handler
// ---------------------------------------------------------------------------

async fn respond(mut stream: TcpStream) -> Result<(), RayError> {
    // Drain whatever request the client sent so closing does not reset it.
    let mut buf = [0u8; 1024];
    let _ = tokio::time::timeout(READ_GRACE, stream.read(&mut buf)).await;

    stream
        .write_all(health_response().as_bytes())
        .await
        .map_err(|e| RayError::Io(format!("health write error: {e}")))?;
    stream
        .shutdown()
        .await
        .map_err(|e| RayError::Io(format!("health shutdown error: {e}")))?;
    debug!("sent health status");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_is_well_formed() {
        let response = health_response();
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Type: text/plain; encoding=utf-8\r\n"));
        assert!(response.contains(&format!("Content-Length: {}\r\n", HEALTH_BODY.len())));
        assert!(response.contains("Connection: close\r\n"));
        assert!(response.ends_with("\r\n\r\ncollision avoidance is healthy"));
    }

    #[test]
    fn builder_overrides_port() {
        assert_eq!(HealthServer::new().port(), DEFAULT_PORT);
        assert_eq!(HealthServer::default().with_port(9000).port(), 9000);
    }

    #[tokio::test]
    async fn serves_fixed_body_over_loopback() -> Result<(), Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(serve(listener));

        let mut client = TcpStream::connect(addr).await?;
        client.write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\n\r\n").await?;
        let mut reply = String::new();
        tokio::time::timeout(Duration::from_secs(2), client.read_to_string(&mut reply)).await??;

        assert!(reply.starts_with("HTTP/1.1 200 OK"));
        assert!(reply.ends_with(HEALTH_BODY));
        Ok(())
    }

    #[tokio::test]
    async fn answers_even_without_a_request() -> Result<(), Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(serve(listener));

        let mut client = TcpStream::connect(addr).await?;
        let mut reply = String::new();
        tokio::time::timeout(Duration::from_secs(2), client.read_to_string(&mut reply)).await??;
        assert!(reply.ends_with(HEALTH_BODY));
        Ok(())
    }
}
