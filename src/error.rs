// SPDX-License-Identifier: MIT

//! Error types for the demo client, server, and checksum tool.

use std::path::PathBuf;

/// Errors that occur while loading the bundled keystore.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum KeystoreError {
    /// The PKCS#12 container could not be parsed, or the passphrase was
    /// rejected.
    #[error("one or more openssl errors occurred: {0}")]
    Ssl(#[from] openssl::error::ErrorStack),

    /// The container parsed, but did not hold the expected key material.
    #[error("the keystore does not contain {0}")]
    Incomplete(&'static str),
}

/// HTTP-level protocol violations.
///
/// These cover the minimal HTTP/1.1 exchange the demos perform; anything the
/// parser cannot make sense of ends up here.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HttpError {
    #[error("an I/O error occurred: {0}")]
    Io(#[from] std::io::Error),

    #[error("the peer sent a malformed HTTP message: {0}")]
    Parse(#[from] httparse::Error),

    #[error("the HTTP message head is unreasonably large")]
    HeadTooLarge,

    #[error("the connection closed before a complete HTTP message arrived")]
    Incomplete,

    #[error("the message carried an invalid '{0}' header")]
    InvalidHeader(&'static str),

    #[error("the chunked message body is malformed")]
    InvalidChunk,
}

/// Errors the [`crate::client::HttpsClient`] may return.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ClientError {
    /// The URL could not be parsed at all.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] http::uri::InvalidUri),

    /// The URL parsed, but isn't something this client can fetch.
    #[error("only https URLs are supported; got '{0}'")]
    UnsupportedScheme(http::Uri),

    #[error("the URL '{0}' has no host")]
    MissingHost(http::Uri),

    /// An I/O error occurred.
    ///
    /// This is usually an unreachable host or a dropped connection; the URL
    /// may simply point at the wrong place.
    #[error("an I/O error occurred: {0}")]
    Io(std::io::Error),

    /// OpenSSL rejected the TLS configuration before a connection was even
    /// attempted. This is not a handshake failure.
    #[error("one or more openssl errors occurred: {0}")]
    SslErrors(#[from] openssl::error::ErrorStack),

    /// The TLS connection itself failed.
    ///
    /// This covers handshake failures, including certificate verification
    /// errors such as connecting to the local demo server without
    /// `--use-local-keystore`.
    #[error("an SSL error occurred: {0}")]
    Ssl(#[from] openssl::ssl::Error),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("failed to load the bundled keystore: {0}")]
    Keystore(#[from] KeystoreError),
}

impl From<std::io::Error> for ClientError {
    fn from(error: std::io::Error) -> Self {
        // I/O errors may occur due to a TLS error, like if the peer rejects the
        // session but the client then reads from the socket. Map those to the
        // more specific variant.
        if let Some(ssl_error) = std::error::Error::source(&error)
            .and_then(|error| error.downcast_ref::<openssl::error::ErrorStack>())
        {
            ClientError::Ssl(ssl_error.to_owned().into())
        } else {
            ClientError::Io(error)
        }
    }
}

impl ClientError {
    /// Whether this error came out of the TLS layer itself.
    ///
    /// The client downgrades these to a printed warning when the local
    /// keystore was not requested, since the likely cause is the demo
    /// server's self-signed certificate.
    pub fn is_tls(&self) -> bool {
        matches!(self, ClientError::Ssl(_))
    }
}

/// Errors the [`crate::server::Server`] may return during startup.
///
/// Per-connection failures are logged and do not surface here; only
/// conditions that prevent the server from starting at all do.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ServerError {
    #[error("failed to load the bundled keystore: {0}")]
    Keystore(#[from] KeystoreError),

    #[error("one or more openssl errors occurred: {0}")]
    SslErrors(#[from] openssl::error::ErrorStack),

    /// The listening socket could not be bound; startup aborts.
    #[error("failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        source: std::io::Error,
    },

    #[error("an I/O error occurred: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors the checksum tool may return. All of these are usage errors from
/// the command line's point of view.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ChecksumError {
    #[error("unknown digest algorithm '{0}'")]
    UnknownAlgorithm(String),

    #[error("cannot read '{}': {source}", path.display())]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("one or more openssl errors occurred: {0}")]
    Ssl(#[from] openssl::error::ErrorStack),
}
