use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use vstream::cli::commands::{handle_config, handle_embed, handle_status};
use vstream::cli::output::get_formatter;
use vstream::cli::{Cli, Commands};
use vstream::models::{Config, OutputFormat};

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "vstream=debug" } else { "vstream=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout carries results, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load().unwrap_or_default();
    let format = cli.format.unwrap_or(config.output.default_format);

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("received shutdown signal, waiting for in-flight batches");
        signal_token.cancel();
    });

    if let Err(e) = run_command(cli.command, format, cancel).await {
        eprintln!("{}", get_formatter(format).format_error(&format!("{e:#}")).trim_end());
        std::process::exit(1);
    }

    Ok(())
}

async fn run_command(
    command: Commands,
    format: OutputFormat,
    cancel: CancellationToken,
) -> Result<()> {
    match command {
        Commands::Embed(args) => {
            handle_embed(args, format, cancel).await?;
        }
        Commands::Status => {
            handle_status(format).await?;
        }
        Commands::Config(cmd) => {
            handle_config(cmd, format).await?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
