//! WebSocket server running one bridge session per connection.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_tungstenite::accept_hdr_async;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::websocket::{negotiate_subprotocol, WsMaster};
use crate::config::Config;
use crate::session::{PtySlave, Session};

/// Binds the configured address and serves until `shutdown` is cancelled.
pub async fn serve(config: Arc<Config>, shutdown: CancellationToken) -> Result<()> {
    let listener = TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;

    serve_listener(listener, config, shutdown).await
}

/// Accepts connections on `listener` until `shutdown` is cancelled.
///
/// Every connection gets a child token, so shutdown also ends running
/// sessions. Returns once all connections have been torn down.
pub async fn serve_listener(
    listener: TcpListener,
    config: Arc<Config>,
    shutdown: CancellationToken,
) -> Result<()> {
    info!(addr = %listener.local_addr()?, "Listening for terminal clients");

    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Server shutting down");
                break;
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        continue;
                    }
                };

                let config = Arc::clone(&config);
                let token = shutdown.child_token();
                let span = info_span!("connection", connection_id = %Uuid::new_v4(), %peer);

                connections.spawn(
                    async move {
                        if let Err(e) = handle_connection(stream, peer, &config, token).await {
                            warn!(error = format!("{e:#}"), "Connection failed");
                        }
                    }
                    .instrument(span),
                );
            }
            Some(_) = connections.join_next() => {}
        }
    }

    while connections.join_next().await.is_some() {}
    Ok(())
}

/// Bridges one TCP connection to a freshly spawned command.
///
/// Both endpoints are closed before returning, whatever ended the session.
pub async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    config: &Config,
    shutdown: CancellationToken,
) -> Result<()> {
    let ws = accept_hdr_async(stream, negotiate_subprotocol)
        .await
        .context("WebSocket handshake failed")?;
    let master = Arc::new(WsMaster::new(ws));

    let options = match config.session_options() {
        Ok(options) => options,
        Err(e) => {
            let _ = master.close().await;
            return Err(e).context("Invalid session options");
        }
    };

    let (cols, rows) = config.session.initial_size();
    let slave = match PtySlave::spawn(&config.server.pty_command(), cols, rows) {
        Ok(slave) => Arc::new(slave),
        Err(e) => {
            let _ = master.close().await;
            return Err(e).context("Failed to start command");
        }
    };
    info!(%peer, pid = ?slave.pid(), command = %config.server.command, "Session started");

    let session = Session::new(Arc::clone(&master), Arc::clone(&slave), options);
    let result = session.run(shutdown).await;

    match slave.kill().await {
        Ok(code) => debug!(code, "Command exited"),
        Err(e) => warn!(error = %e, "Failed to stop command"),
    }
    if let Err(e) = master.close().await {
        debug!(error = %e, "Failed to close WebSocket");
    }

    match result {
        Ok(()) => info!("Session cancelled"),
        Err(e) if e.is_stream_closed() => info!(reason = %e, "Session ended"),
        Err(e) => return Err(e).context("Session failed"),
    }
    Ok(())
}
