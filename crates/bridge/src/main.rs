//! ptybridge
//!
//! Serves a terminal command to webtty clients over WebSocket.

use std::path::PathBuf;
use std::sync::Arc;

use bridge::config::Config;
use bridge::{logging, network};
use clap::Parser;
use tokio_util::sync::CancellationToken;

/// ptybridge - share a terminal command over WebSocket.
#[derive(Parser, Debug)]
#[command(name = "ptybridge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Address to listen on
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// Allow clients to type into the terminal
    #[arg(short = 'w', long)]
    pub permit_write: bool,

    /// Window title sent to clients
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Command to run, followed by its arguments
    #[arg(trailing_var_arg = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl Cli {
    /// Overrides config values with the ones given on the command line.
    fn apply(&self, config: &mut Config) {
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if self.permit_write {
            config.session.permit_write = true;
        }
        if let Some(title) = &self.title {
            config.session.title = title.clone();
        }
        if let Some((command, args)) = self.command.split_first() {
            config.server.command = command.clone();
            config.server.args = args.to_vec();
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default()?
    };

    config.apply_env_overrides();
    cli.apply(&mut config);

    logging::init(&config.logging.level)?;
    tracing::info!("ptybridge starting...");

    config.validate()?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::info!("Received shutdown signal");
        signal_token.cancel();
    });

    network::serve(Arc::new(config), shutdown).await?;

    tracing::info!("ptybridge stopped");
    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            tracing::warn!("Failed to register SIGTERM handler: {}", e);
            wait_for_ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            tracing::info!("Received SIGTERM");
        }
        _ = wait_for_ctrl_c() => {
            tracing::info!("Received SIGINT");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
