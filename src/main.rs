//! Devbox - shell session and process supervisor
//!
//! CLI entry point for the Devbox server.

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

mod api;
mod cli;
mod server;
mod websocket;

use server::config::LoggingConfig;

/// Install the global subscriber. The returned guard flushes the file
/// writer and must live until exit.
fn init_tracing(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.filter.as_str()));

    let stdout_layer = if logging.json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    let (file_layer, guard) = match &logging.file {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "devbox.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();
    let config = server::load_config(cli.config.as_deref())
        .context("Failed to load configuration")?;

    let _log_guard = init_tracing(&config.logging);

    cli::run(cli, config).await
}
