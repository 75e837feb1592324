// SPDX-License-Identifier: MIT

//! Exercises the demo client against the demo server over a real socket.

use std::process::Command;
use std::time::Duration;

use assert_cmd::cargo::CommandCargoExt;
use httpsdemo::client::HttpsClient;
use httpsdemo::error::ClientError;
use httpsdemo::server::{Config, Listener, Server};

async fn start_server() -> anyhow::Result<Listener> {
    // Port 0 gets an ephemeral port so tests don't collide.
    let server = Server::new(Config { port: 0 })?;
    Ok(server.listen().await?)
}

fn local_client(port: u16, path: &str) -> HttpsClient {
    HttpsClient {
        url: format!("https://localhost:{port}{path}"),
        use_local_keystore: true,
        ..HttpsClient::default()
    }
}

#[tokio::test]
async fn serves_the_root_path() -> anyhow::Result<()> {
    let listener = start_server().await?;
    let client = local_client(listener.port(), "/");

    let exchange = client.fetch().await?;
    assert_eq!(exchange.status, 200);
    assert_eq!(
        exchange.body.as_slice(),
        b"You asked for /; This is the response"
    );
    assert!(!exchange.cipher_suite.is_empty());

    listener.halt(Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn serves_the_test_path() -> anyhow::Result<()> {
    let listener = start_server().await?;
    let client = local_client(listener.port(), "/test");

    let exchange = client.fetch().await?;
    assert_eq!(exchange.status, 200);
    assert_eq!(
        exchange.body.as_slice(),
        b"You asked for /test; This is the response"
    );

    listener.halt(Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn root_context_catches_every_path() -> anyhow::Result<()> {
    let listener = start_server().await?;
    let client = local_client(listener.port(), "/nested/path?q=1");

    let exchange = client.fetch().await?;
    assert_eq!(exchange.status, 200);
    assert_eq!(
        exchange.body.as_slice(),
        b"You asked for /nested/path?q=1; This is the response"
    );

    listener.halt(Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn responses_allow_any_origin() -> anyhow::Result<()> {
    let listener = start_server().await?;
    let client = local_client(listener.port(), "/");

    let exchange = client.fetch().await?;
    let cors = exchange
        .headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("access-control-allow-origin"))
        .map(|(_, value)| value.as_str());
    assert_eq!(cors, Some("*"));

    listener.halt(Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn reports_the_self_signed_certificate() -> anyhow::Result<()> {
    let listener = start_server().await?;
    let client = local_client(listener.port(), "/");

    let exchange = client.fetch().await?;
    assert_eq!(exchange.certificates.len(), 1);
    let certificate = &exchange.certificates[0];
    assert_eq!(certificate.cert_type, "X.509");
    assert_eq!(certificate.public_key_algorithm, "RSA");
    assert_eq!(certificate.public_key_format, "X.509");
    assert_eq!(certificate.content_hash.len(), 64);

    listener.halt(Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn rejects_the_server_without_the_local_keystore() -> anyhow::Result<()> {
    let listener = start_server().await?;
    let client = HttpsClient {
        url: format!("https://localhost:{}/", listener.port()),
        ..HttpsClient::default()
    };

    let error = client.fetch().await.unwrap_err();
    assert!(error.is_tls(), "expected a TLS error, got: {error:?}");

    listener.halt(Duration::from_secs(5)).await?;
    Ok(())
}

// An untrusted certificate in the default configuration is downgraded to a
// stderr warning plus a hint, and the body fetch is retried; against our
// self-signed server that retry fails the same way, so nothing is printed.
#[tokio::test]
async fn run_retries_after_an_untrusted_certificate() -> anyhow::Result<()> {
    let listener = start_server().await?;
    let client = HttpsClient {
        url: format!("https://localhost:{}/", listener.port()),
        ..HttpsClient::default()
    };

    let mut out = Vec::new();
    let error = client.run(&mut out).await.unwrap_err();
    assert!(error.is_tls(), "expected a TLS error, got: {error:?}");
    assert!(out.is_empty(), "nothing should be printed: {out:?}");

    listener.halt(Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn untrusted_certificate_prints_the_keystore_hint() -> anyhow::Result<()> {
    let listener = start_server().await?;
    let url = format!("https://localhost:{}/", listener.port());

    // The hint goes to the process's stderr, so run the real binary. The
    // child blocks, which must happen off the runtime's thread.
    let output = tokio::task::spawn_blocking(move || -> anyhow::Result<std::process::Output> {
        Ok(Command::cargo_bin("https-client")?.arg(&url).output()?)
    })
    .await??;

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains(
            "Try the --use-local-keystore option when connecting to the \
             demo https server on localhost"
        ),
        "missing hint in stderr: {stderr}"
    );

    listener.halt(Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn run_prints_only_the_body_when_asked() -> anyhow::Result<()> {
    let listener = start_server().await?;
    let client = HttpsClient {
        url: format!("https://localhost:{}/", listener.port()),
        show_certificates: false,
        show_headers: false,
        use_local_keystore: true,
    };

    let mut out = Vec::new();
    client.run(&mut out).await?;
    let out = String::from_utf8(out)?;
    assert_eq!(
        out,
        "****** Content of the URL ********\nYou asked for /; This is the response\n"
    );

    listener.halt(Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn run_prints_certificates_and_headers() -> anyhow::Result<()> {
    let listener = start_server().await?;
    let client = HttpsClient {
        url: format!("https://localhost:{}/", listener.port()),
        show_certificates: true,
        show_headers: true,
        use_local_keystore: true,
    };

    let mut out = Vec::new();
    client.run(&mut out).await?;
    let out = String::from_utf8(out)?;
    assert!(out.starts_with("Response Code : 200\n"));
    assert!(out.contains("Cert Type : X.509\n"));
    assert!(out.contains("****** Response Headers ********\n"));
    assert!(out.contains("access-control-allow-origin: [*]\n"));
    assert!(out.ends_with(
        "****** Content of the URL ********\nYou asked for /; This is the response\n"
    ));

    listener.halt(Duration::from_secs(5)).await?;
    Ok(())
}

#[tokio::test]
async fn halt_stops_the_listener() -> anyhow::Result<()> {
    let listener = start_server().await?;
    let port = listener.port();

    // A request before the halt succeeds.
    local_client(port, "/").fetch().await?;
    listener.halt(Duration::from_secs(5)).await?;

    // Afterwards the port no longer accepts connections.
    let error = local_client(port, "/").fetch().await.unwrap_err();
    assert!(
        matches!(error, ClientError::Io(_)),
        "expected a connection error, got: {error:?}"
    );
    Ok(())
}

#[tokio::test]
async fn halt_token_stops_the_listener() -> anyhow::Result<()> {
    let listener = start_server().await?;
    listener.halt_token().cancel();
    listener.wait_to_finish().await?;
    Ok(())
}
