//! Loopback listener for the provider redirect.
//!
//! A terminal app has no page for the provider to redirect to, so the
//! redirect URI points at a port on this machine. Every connection is
//! served on its own task, and the first request for the callback path
//! becomes a `CallbackLanding`. Browsers open speculative sockets that
//! never send anything, so no single connection may hold up the others.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

use super::flow::{CallbackLanding, CallbackParams};
use super::AuthError;

/// Largest request head we bother reading
const MAX_REQUEST_BYTES: usize = 8192;

/// How long one connection may take to send its request line
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(10);

const LANDING_RESPONSE: &str = "HTTP/1.1 200 OK\r\n\
Content-Type: text/html; charset=utf-8\r\n\
Connection: close\r\n\r\n\
<!doctype html><html><body style=\"font-family:sans-serif;text-align:center;margin-top:4em\">\
<h2>musicrec</h2><p>You can close this window and return to the terminal.</p>\
</body></html>";

const NOT_FOUND_RESPONSE: &str = "HTTP/1.1 404 Not Found\r\n\
Content-Length: 0\r\n\
Connection: close\r\n\r\n";

pub struct CallbackServer {
    listener: TcpListener,
    callback_path: String,
}

impl CallbackServer {
    /// Bind to the host and port of the redirect URI.
    pub async fn bind(redirect_uri: &str) -> Result<Self, AuthError> {
        let url = Url::parse(redirect_uri)
            .map_err(|e| AuthError::Misconfigured(format!("redirect uri: {}", e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| AuthError::Misconfigured("redirect uri has no host".to_string()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| AuthError::Misconfigured("redirect uri has no port".to_string()))?;
        // IPv6 literals come back bracketed from host_str()
        let host = host.trim_start_matches('[').trim_end_matches(']');

        let listener = TcpListener::bind((host, port)).await?;
        info!(host = %host, port, "Waiting for provider redirect");

        Ok(Self {
            listener,
            callback_path: url.path().to_string(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Wait for the provider redirect, giving up after `wait`.
    pub async fn wait_for_landing(&self, wait: Duration) -> Result<CallbackLanding, AuthError> {
        tokio::time::timeout(wait, self.accept_landing())
            .await
            .map_err(|_| AuthError::CallbackTimeout)?
    }

    async fn accept_landing(&self) -> Result<CallbackLanding, AuthError> {
        let (landing_tx, mut landing_rx) = mpsc::channel::<CallbackParams>(1);
        // Dropping the set on return aborts connections still being served
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                Some(params) = landing_rx.recv() => {
                    return Ok(CallbackLanding::new(params));
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = accepted?;
                    debug!(%peer, "Callback connection accepted");
                    let callback_path = self.callback_path.clone();
                    let landing_tx = landing_tx.clone();
                    connections.spawn(async move {
                        match serve(stream, &callback_path).await {
                            Ok(Some(params)) => {
                                if landing_tx.try_send(params).is_err() {
                                    debug!(%peer, "Landing already received, ignoring repeat");
                                }
                            }
                            Ok(None) => {}
                            Err(e) => warn!(%peer, error = %e, "Dropping callback connection"),
                        }
                    });
                }
            }
        }
    }
}

/// Answer one connection. Some(params) if it was the callback request.
async fn serve(
    mut stream: TcpStream,
    callback_path: &str,
) -> std::io::Result<Option<CallbackParams>> {
    let request = tokio::time::timeout(REQUEST_READ_TIMEOUT, read_request_line(&mut stream))
        .await
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "no request line"))??;

    match callback_query(&request, callback_path) {
        Some(query) => {
            stream.write_all(LANDING_RESPONSE.as_bytes()).await?;
            stream.shutdown().await.ok();
            Ok(Some(CallbackParams::from_query(&query)))
        }
        None => {
            stream.write_all(NOT_FOUND_RESPONSE.as_bytes()).await?;
            Ok(None)
        }
    }
}

/// Read until the request line is complete, the peer stops sending or
/// `MAX_REQUEST_BYTES` is reached.
async fn read_request_line(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    while !buffer.windows(2).any(|w| w == b"\r\n") && buffer.len() < MAX_REQUEST_BYTES {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Query string of a `GET <callback_path>?...` request line, if it is one.
fn callback_query(request: &str, callback_path: &str) -> Option<String> {
    let request_line = request.lines().next()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    if method != "GET" {
        return None;
    }

    let url = Url::parse(&format!("http://localhost{}", target)).ok()?;
    if url.path() != callback_path {
        return None;
    }
    Some(url.query().unwrap_or("").to_string())
}
