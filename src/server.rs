// SPDX-License-Identifier: MIT

//! The HTTPS server demo.
//!
//! Serves a canned plaintext response over TLS using the bundled self-signed
//! keystore. Connections are handled one at a time; the demo configures no
//! executor, no backpressure, and no keep-alive.

use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;

use anyhow::Context;
use openssl::ssl::{Ssl, SslAcceptor, SslMethod, SslVerifyMode};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_openssl::SslStream;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, Instrument};

use crate::error::ServerError;
use crate::http;
use crate::keystore::Keystore;

/// The port the server listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 8000;

// Paths with a registered handler. Matching follows the prefix rule of the
// original demo server, so "/" catches every request.
const ROUTES: &[&str] = &["/", "/test"];

/// Configuration for the demo server.
#[derive(Debug, Clone)]
pub struct Config {
    /// The port to listen on. Port 0 requests an ephemeral port; the bound
    /// port is available from [`Listener::port`].
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

/// A demo HTTPS server, ready to listen.
pub struct Server {
    config: Config,
    tls_config: SslAcceptor,
}

/// A running server.
pub struct Listener {
    task: tokio::task::JoinHandle<anyhow::Result<()>>,
    halt_token: CancellationToken,
    local_addr: SocketAddr,
}

impl Listener {
    /// The port the server is actually bound to.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get a cancellation token which can be used to stop this listener.
    pub fn halt_token(&self) -> CancellationToken {
        self.halt_token.clone()
    }

    /// Stop accepting connections, waiting up to `timeout` for the accept
    /// loop to wind down.
    pub async fn halt(self, timeout: Duration) -> anyhow::Result<()> {
        self.halt_token.cancel();
        let result = tokio::time::timeout(timeout, self.task)
            .await
            .context("the listener did not stop within the timeout")?;
        result??;
        Ok(())
    }

    /// Block until the accept loop exits via its cancellation token.
    pub async fn wait_to_finish(self) -> anyhow::Result<()> {
        self.task.await??;
        Ok(())
    }
}

impl Server {
    /// Create a new server from the bundled keystore.
    pub fn new(config: Config) -> Result<Self, ServerError> {
        let keystore = Keystore::bundled()?;
        let tls_config = tls_acceptor(&keystore)?;
        Ok(Self { config, tls_config })
    }

    /// Bind the listening socket and start the accept loop.
    ///
    /// A bind failure aborts startup; there is no retry.
    #[instrument(skip_all, name = "server", fields(port = self.config.port))]
    pub async fn listen(self) -> Result<Listener, ServerError> {
        let tcp_listener = TcpListener::bind(("0.0.0.0", self.config.port))
            .await
            .map_err(|source| ServerError::Bind {
                port: self.config.port,
                source,
            })?;
        let local_addr = tcp_listener.local_addr()?;
        tracing::info!(%local_addr, "Listening for connections");

        let halt_token = CancellationToken::new();
        let accept_halt_token = halt_token.clone();
        let task = tokio::spawn(
            accept_loop(tcp_listener, self.tls_config, accept_halt_token)
                .instrument(tracing::Span::current()),
        );

        Ok(Listener {
            task,
            halt_token,
            local_addr,
        })
    }
}

fn tls_acceptor(keystore: &Keystore) -> Result<SslAcceptor, ServerError> {
    let mut acceptor = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls())?;
    // No client certificate is required.
    acceptor.set_verify(SslVerifyMode::NONE);
    acceptor.set_private_key(keystore.private_key())?;
    acceptor.set_certificate(keystore.certificate())?;
    acceptor.check_private_key()?;
    tracing::debug!(
        certificate_expires = %keystore.certificate().not_after(),
        "TLS context ready"
    );
    Ok(acceptor.build())
}

async fn accept_loop(
    tcp_listener: TcpListener,
    tls_config: SslAcceptor,
    halt_token: CancellationToken,
) -> anyhow::Result<()> {
    loop {
        let accepted = tokio::select! {
            _ = halt_token.cancelled() => {
                tracing::info!("Shutdown requested; no new connections will be accepted");
                break;
            }
            accepted = tcp_listener.accept() => accepted,
        };

        match accepted {
            Ok((tcp_stream, remote_addr)) => {
                if let Err(error) = handle(&tls_config, tcp_stream, remote_addr).await {
                    tracing::warn!(%remote_addr, ?error, "Failed to serve connection");
                }
            }
            Err(error) => {
                tracing::error!(?error, "Failed to accept incoming connection");
            }
        }
    }

    Ok(())
}

#[instrument(skip_all, fields(client = %remote_addr))]
async fn handle(
    tls_config: &SslAcceptor,
    tcp_stream: TcpStream,
    remote_addr: SocketAddr,
) -> anyhow::Result<()> {
    let ssl = Ssl::new(tls_config.context())?;
    let mut stream = SslStream::new(ssl, tcp_stream)?;
    Pin::new(&mut stream).accept().await?;
    let cipher_suite = stream
        .ssl()
        .current_cipher()
        .map(|cipher| cipher.name().to_string())
        .unwrap_or_default();

    let request = http::read_request(&mut stream).await?;
    tracing::info!(
        method = %request.method,
        path = %request.path,
        %cipher_suite,
        "Request received"
    );

    match route(&request.path) {
        Some(_context) => {
            let body = format!("You asked for {}; This is the response", request.path);
            http::write_response(
                &mut stream,
                200,
                "OK",
                &[("access-control-allow-origin", "*")],
                body.as_bytes(),
            )
            .await?;
        }
        None => {
            http::write_response(&mut stream, 404, "Not Found", &[], b"").await?;
        }
    }

    stream.shutdown().await?;
    Ok(())
}

// Longest matching registered prefix, as the original demo server routes.
fn route(path: &str) -> Option<&'static str> {
    ROUTES
        .iter()
        .copied()
        .filter(|context| path.starts_with(context))
        .max_by_key(|context| context.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_catches_everything() {
        assert_eq!(route("/"), Some("/"));
        assert_eq!(route("/anything/else?query=1"), Some("/"));
    }

    #[test]
    fn test_context_wins_over_root() {
        assert_eq!(route("/test"), Some("/test"));
        assert_eq!(route("/test/nested"), Some("/test"));
    }
}
