// SPDX-License-Identifier: MIT

use clap::Parser;
use httpsdemo::cli;
use httpsdemo::server::{Config, Server, DEFAULT_PORT};
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, EnvFilter};

/// Starts a HTTPS server running on the specified port.
#[derive(Debug, Parser)]
#[command(name = "https-server", version)]
struct Cli {
    /// The port to listen on.
    #[arg(short = 'p', long = "port", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Print requests received.
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Print debug information.
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Keep the process alive until SIGINT or SIGTERM arrives.
    #[arg(long = "stay-alive")]
    stay_alive: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let opts = cli::parse_or_exit::<Cli>();
    let default_directives = if opts.debug {
        "httpsdemo=debug,https_server=debug"
    } else if opts.verbose {
        "httpsdemo=info,https_server=info"
    } else {
        "warn"
    };
    init_logging(default_directives);

    let server = Server::new(Config { port: opts.port })?;
    let listener = server.listen().await?;
    println!("Server started OK on port {}", listener.port());

    if opts.stay_alive {
        tokio::spawn(signal_handler(listener.halt_token()));
        listener.wait_to_finish().await?;
    }
    // Without --stay-alive the process exits once startup completes, taking
    // the listener with it.
    Ok(())
}

/// Install signal handlers for the process.
///
/// SIGTERM or SIGINT stops the listener; an in-flight request is allowed to
/// complete before the accept loop exits.
async fn signal_handler(halt_token: CancellationToken) -> Result<(), anyhow::Error> {
    let mut sigterm_stream = signal(SignalKind::terminate()).inspect_err(|error| {
        tracing::error!(?error, "Failed to register a SIGTERM signal handler");
    })?;
    let mut sigint_stream = signal(SignalKind::interrupt()).inspect_err(|error| {
        tracing::error!(?error, "Failed to register a SIGINT signal handler");
    })?;

    tokio::select! {
        _ = sigterm_stream.recv() => {
            tracing::info!("SIGTERM received, beginning shutdown");
        }
        _ = sigint_stream.recv() => {
            tracing::info!("SIGINT received, beginning shutdown");
        }
    }
    halt_token.cancel();
    Ok(())
}

fn init_logging(default_directives: &str) {
    let log_filter = EnvFilter::builder()
        .with_env_var("HTTPSDEMO_LOG")
        .try_from_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));
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
    fn default_port_is_8000() {
        let opts = Cli::try_parse_from(["https-server"]).unwrap();
        assert_eq!(opts.port, 8000);
        assert!(!opts.stay_alive);
    }

    #[test]
    fn port_accepts_both_forms() {
        let opts = Cli::try_parse_from(["https-server", "--port=7999"]).unwrap();
        assert_eq!(opts.port, 7999);
        let opts = Cli::try_parse_from(["https-server", "-p", "7999"]).unwrap();
        assert_eq!(opts.port, 7999);
    }
}
