//! revcatgpt - context server for custom GPTs over the Revcat catalogue.

mod commands;
mod tls;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use revcatgpt_core::config::{LogConfig, load_config};

/// revcatgpt - query in, token-bounded catalogue context out.
#[derive(Parser, Debug)]
#[command(name = "revcatgpt", version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file (default: ./revcatgpt.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the configuration and print it with secrets masked
    CheckConfig,
}

/// Filter directive for the stderr layer. `-v`/`-q` win over `RUST_LOG`,
/// which wins over `log.level`.
fn stderr_filter(verbose: u8, quiet: bool, log: &LogConfig) -> EnvFilter {
    match verbose {
        0 if quiet => EnvFilter::new("error"),
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.level)),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    // Human-readable layer for stderr (always active)
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter(cli.verbose, cli.quiet, &config.log));

    // JSON file layer when a log file is configured
    let mut _guard = None;
    let json_layer = match &config.log.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let file_name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "revcatgpt.log".into());
            std::fs::create_dir_all(&dir)?;
            let file_appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            _guard = Some(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_filter(EnvFilter::new(&config.log.level)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    match cli.command {
        Some(Commands::CheckConfig) => commands::check_config(&config),
        None => commands::serve(config).await,
    }
}
