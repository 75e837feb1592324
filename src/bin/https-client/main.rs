// SPDX-License-Identifier: MIT

use clap::Parser;
use httpsdemo::cli;
use httpsdemo::client::{HttpsClient, DEFAULT_URL};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, EnvFilter};

/// Uses the https protocol to get a remote resource.
#[derive(Debug, Parser)]
#[command(name = "https-client", version)]
struct Cli {
    /// The URL to download.
    #[arg(default_value = DEFAULT_URL)]
    url: String,

    /// Show server certificates (true by default).
    #[arg(short = 'c', long = "certificates", overrides_with = "no_certificates")]
    certificates: bool,

    /// Hide server certificates.
    #[arg(long = "no-certificates")]
    no_certificates: bool,

    /// Print response headers (false by default).
    #[arg(short = 'H', long = "headers")]
    headers: bool,

    /// Use this when connecting to the local https-server demo.
    ///
    /// Trusts the bundled self-signed certificate in addition to the system
    /// trust anchors, and skips hostname verification. Insecure outside of
    /// local testing.
    #[arg(long = "use-local-keystore")]
    use_local_keystore: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let opts = cli::parse_or_exit::<Cli>();
    init_logging();

    let client = HttpsClient {
        url: opts.url,
        show_certificates: !opts.no_certificates,
        show_headers: opts.headers,
        use_local_keystore: opts.use_local_keystore,
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    client.run(&mut out).await?;
    Ok(())
}

fn init_logging() {
    let log_filter = EnvFilter::builder()
        .with_env_var("HTTPSDEMO_LOG")
        .try_from_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(log_filter);
    tracing::subscriber::set_global_default(registry)
        .expect("Programming error: set_global_default should only be called once.");
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;

    #[test]
    fn certificates_shown_by_default() {
        let opts = Cli::try_parse_from(["https-client"]).unwrap();
        assert!(!opts.no_certificates);
        assert_eq!(opts.url, super::DEFAULT_URL);
    }

    #[test]
    fn no_certificates_flag() {
        let opts = Cli::try_parse_from(["https-client", "--no-certificates"]).unwrap();
        assert!(opts.no_certificates);
    }

    #[test]
    fn certificates_flag_overrides_negation() {
        let opts =
            Cli::try_parse_from(["https-client", "--no-certificates", "-c"]).unwrap();
        assert!(!opts.no_certificates);
    }

    #[test]
    fn unknown_option_is_a_parse_error() {
        let error = Cli::try_parse_from(["https-client", "--xxx"]).unwrap_err();
        assert_eq!(error.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
