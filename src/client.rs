// SPDX-License-Identifier: MIT

//! The HTTPS client demo.
//!
//! Performs a single outbound GET over TLS and prints selected parts of the
//! result. With [`HttpsClient::use_local_keystore`] set, the bundled
//! self-signed certificate is trusted alongside the system trust anchors and
//! hostname verification is skipped so the client can talk to the local demo
//! server. That combination is insecure and exists only for local testing.

use std::io::Write;
use std::pin::Pin;

use ::http::Uri;
use openssl::hash::{hash, MessageDigest};
use openssl::pkey::Id;
use openssl::ssl::{SslConnector, SslMethod};
use openssl::x509::X509Ref;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_openssl::SslStream;
use tracing::instrument;

use crate::checksum::to_hex;
use crate::error::ClientError;
use crate::http;
use crate::keystore::Keystore;

/// The URL fetched when none is given on the command line.
pub const DEFAULT_URL: &str =
    "https://raw.githubusercontent.com/remkop/picocli-native-image-demo/master/java.security.overrides";

const LOCAL_KEYSTORE_HINT: &str =
    "Try the --use-local-keystore option when connecting to the demo https server on localhost";

/// A single-shot HTTPS GET client.
#[derive(Debug, Clone)]
pub struct HttpsClient {
    /// The URL to fetch.
    pub url: String,
    /// Print the response status, negotiated cipher suite, and the peer's
    /// certificate chain.
    pub show_certificates: bool,
    /// Print the response headers.
    pub show_headers: bool,
    /// Trust the bundled self-signed certificate in addition to the system
    /// trust anchors, and skip hostname verification.
    pub use_local_keystore: bool,
}

impl Default for HttpsClient {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            show_certificates: true,
            show_headers: false,
            use_local_keystore: false,
        }
    }
}

/// Everything observed during one request/response exchange.
#[derive(Debug)]
pub struct Exchange {
    pub status: u16,
    pub cipher_suite: String,
    /// Metadata for each certificate in the chain the peer presented.
    pub certificates: Vec<CertificateInfo>,
    /// Header pairs in the order the peer sent them.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[derive(Debug)]
pub struct CertificateInfo {
    pub cert_type: &'static str,
    /// SHA-256 over the certificate's DER encoding, in hex.
    pub content_hash: String,
    pub public_key_algorithm: String,
    pub public_key_format: &'static str,
}

impl HttpsClient {
    /// Fetch the URL and print the requested sections to `out`.
    ///
    /// A TLS failure while the certificate section is being gathered is
    /// downgraded to a warning when the local keystore was not requested,
    /// since the likely cause is the demo server's self-signed certificate;
    /// the body fetch is still attempted and its failure is fatal.
    pub async fn run(&self, out: &mut dyn Write) -> Result<(), ClientError> {
        let (exchange, certificates_ok) = match self.fetch().await {
            Ok(exchange) => (exchange, true),
            Err(error)
                if self.show_certificates && !self.use_local_keystore && error.is_tls() =>
            {
                eprintln!("{error}");
                eprintln!("{LOCAL_KEYSTORE_HINT}");
                // The body is still wanted; a second attempt reports the
                // failure as fatal.
                (self.fetch().await?, false)
            }
            Err(error) => return Err(error),
        };

        if self.show_certificates && certificates_ok {
            print_certificates(&exchange, out)?;
        }
        if self.show_headers {
            print_headers(&exchange, out)?;
        }
        print_contents(&exchange, out)?;
        Ok(())
    }

    /// Perform the GET and collect the exchange without printing anything.
    #[instrument(skip_all, fields(url = %self.url))]
    pub async fn fetch(&self) -> Result<Exchange, ClientError> {
        let uri: Uri = self.url.parse()?;
        if uri.scheme_str() != Some("https") {
            return Err(ClientError::UnsupportedScheme(uri));
        }
        let host = uri
            .host()
            .ok_or_else(|| ClientError::MissingHost(uri.clone()))?
            .to_string();
        let port = uri.port_u16().unwrap_or(443);

        let connector = self.ssl_connector()?;
        let tcp_stream = TcpStream::connect((host.as_str(), port)).await?;
        tracing::debug!(%host, port, "TCP connection established");

        let mut ssl_config = connector.configure()?;
        if self.use_local_keystore {
            // The bundled certificate names no real host.
            ssl_config.set_verify_hostname(false);
        }
        let ssl = ssl_config.into_ssl(&host)?;
        let mut stream = SslStream::new(ssl, tcp_stream)?;
        Pin::new(&mut stream).connect().await?;
        tracing::debug!("TLS session established");

        let cipher_suite = stream
            .ssl()
            .current_cipher()
            .map(|cipher| cipher.name().to_string())
            .unwrap_or_default();
        let certificates = stream
            .ssl()
            .peer_cert_chain()
            .map(|chain| {
                chain
                    .iter()
                    .map(certificate_info)
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        stream.write_all(&http::format_get_request(&uri)).await?;
        let response = http::read_response(&mut stream).await?;
        tracing::debug!(status = response.status, "Response received");

        Ok(Exchange {
            status: response.status,
            cipher_suite,
            certificates,
            headers: response.headers,
            body: response.body,
        })
    }

    fn ssl_connector(&self) -> Result<SslConnector, ClientError> {
        let mut connector = SslConnector::builder(SslMethod::tls())?;
        if self.use_local_keystore {
            // Trust the demo certificate alongside the system trust anchors.
            let keystore = Keystore::bundled()?;
            connector
                .cert_store_mut()
                .add_cert(keystore.certificate().to_owned())?;
        }
        Ok(connector.build())
    }
}

fn certificate_info(certificate: &X509Ref) -> Result<CertificateInfo, ClientError> {
    let der = certificate.to_der()?;
    let content_hash = to_hex(&hash(MessageDigest::sha256(), &der)?);
    let public_key_algorithm = match certificate.public_key()?.id() {
        Id::RSA => "RSA".to_string(),
        Id::EC => "EC".to_string(),
        Id::DSA => "DSA".to_string(),
        Id::ED25519 => "Ed25519".to_string(),
        Id::ED448 => "Ed448".to_string(),
        other => format!("{other:?}"),
    };
    Ok(CertificateInfo {
        cert_type: "X.509",
        content_hash,
        public_key_algorithm,
        public_key_format: "X.509",
    })
}

fn print_certificates(exchange: &Exchange, out: &mut dyn Write) -> Result<(), ClientError> {
    writeln!(out, "Response Code : {}", exchange.status)?;
    writeln!(out, "Cipher Suite : {}", exchange.cipher_suite)?;
    writeln!(out)?;
    for certificate in &exchange.certificates {
        writeln!(out, "Cert Type : {}", certificate.cert_type)?;
        writeln!(out, "Cert Hash Code : {}", certificate.content_hash)?;
        writeln!(
            out,
            "Cert Public Key Algorithm : {}",
            certificate.public_key_algorithm
        )?;
        writeln!(
            out,
            "Cert Public Key Format : {}",
            certificate.public_key_format
        )?;
        writeln!(out)?;
    }
    Ok(())
}

fn print_headers(exchange: &Exchange, out: &mut dyn Write) -> Result<(), ClientError> {
    // Group repeated headers under one name, preserving first-seen order.
    let mut grouped: Vec<(&str, Vec<&str>)> = Vec::new();
    for (name, value) in &exchange.headers {
        match grouped
            .iter_mut()
            .find(|(seen, _)| seen.eq_ignore_ascii_case(name))
        {
            Some((_, values)) => values.push(value),
            None => grouped.push((name, vec![value])),
        }
    }

    writeln!(out, "****** Response Headers ********")?;
    for (name, values) in grouped {
        writeln!(out, "{name}: [{}]", values.join(", "))?;
    }
    writeln!(out)?;
    Ok(())
}

fn print_contents(exchange: &Exchange, out: &mut dyn Write) -> Result<(), ClientError> {
    writeln!(out, "****** Content of the URL ********")?;
    let body = String::from_utf8_lossy(&exchange.body);
    for line in body.lines() {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange() -> Exchange {
        Exchange {
            status: 200,
            cipher_suite: "TLS_AES_256_GCM_SHA384".to_string(),
            certificates: vec![CertificateInfo {
                cert_type: "X.509",
                content_hash: "abc123".to_string(),
                public_key_algorithm: "RSA".to_string(),
                public_key_format: "X.509",
            }],
            headers: vec![
                ("content-type".to_string(), "text/plain".to_string()),
                ("set-cookie".to_string(), "a=1".to_string()),
                ("set-cookie".to_string(), "b=2".to_string()),
            ],
            body: b"first line\nsecond line\n".to_vec(),
        }
    }

    #[test]
    fn certificate_section_format() {
        let mut out = Vec::new();
        print_certificates(&exchange(), &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert_eq!(
            out,
            "Response Code : 200\n\
             Cipher Suite : TLS_AES_256_GCM_SHA384\n\
             \n\
             Cert Type : X.509\n\
             Cert Hash Code : abc123\n\
             Cert Public Key Algorithm : RSA\n\
             Cert Public Key Format : X.509\n\
             \n"
        );
    }

    #[test]
    fn headers_are_grouped_by_name() {
        let mut out = Vec::new();
        print_headers(&exchange(), &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("****** Response Headers ********\n"));
        assert!(out.contains("content-type: [text/plain]\n"));
        assert!(out.contains("set-cookie: [a=1, b=2]\n"));
    }

    #[test]
    fn body_is_printed_line_by_line() {
        let mut out = Vec::new();
        print_contents(&exchange(), &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert_eq!(
            out,
            "****** Content of the URL ********\nfirst line\nsecond line\n"
        );
    }

    #[tokio::test]
    async fn non_https_scheme_is_rejected() {
        let client = HttpsClient {
            url: "http://example.com/".to_string(),
            ..HttpsClient::default()
        };
        let result = client.fetch().await;
        assert!(matches!(result, Err(ClientError::UnsupportedScheme(_))));
    }

    #[tokio::test]
    async fn malformed_url_is_rejected() {
        let client = HttpsClient {
            url: "not a url at all".to_string(),
            ..HttpsClient::default()
        };
        let result = client.fetch().await;
        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));
    }
}
