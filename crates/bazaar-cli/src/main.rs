//! Bazaar - marketplace command line
//!
//! Reads commands from stdin and writes replies to stdout. Logs go to stderr.

use std::io::IsTerminal;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bazaar_cli::{open_table, CliConfig, Dispatcher};
use bazaar_store::Marketplace;

const PROMPT: &str = "# ";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bazaar=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting bazaar");

    // Load configuration from environment
    let config = CliConfig::from_env();

    tracing::info!(
        backend = %config.backend,
        table = %config.table_name,
        region = %config.region,
        endpoint = ?config.dynamodb_endpoint,
        create_table = config.create_table,
        "Configuration loaded"
    );

    let table = open_table(&config).await?;
    let market = Marketplace::new(table)?;
    let dispatcher = Dispatcher::new(market, &config);

    tokio::select! {
        result = run_repl(&dispatcher) => result?,
        () = shutdown_signal() => println!("Received SIGTERM, exiting..."),
    }

    tracing::info!("Shutting down");
    Ok(())
}

/// Answer commands until stdin closes.
async fn run_repl(dispatcher: &Dispatcher) -> std::io::Result<()> {
    let interactive = std::io::stdin().is_terminal();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        if interactive {
            stdout.write_all(PROMPT.as_bytes()).await?;
            stdout.flush().await?;
        }
        let Some(line) = lines.next_line().await? else {
            return Ok(());
        };
        if let Some(reply) = dispatcher.dispatch(&line).await {
            stdout.write_all(reply.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
