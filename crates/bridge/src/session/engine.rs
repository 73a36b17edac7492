//! The bridge session: handshake, the two pumps and frame dispatch.

use std::sync::Arc;

use protocol::{framing, InboundCommand, InboundFrame, OutboundCommand, ProtocolError, ResizeArgs};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn, Instrument};

use super::endpoint::{Master, Slave};
use super::options::{SessionOption, SessionOptions, MIN_CHUNK_SIZE};
use crate::audit::{AuditHandle, Auditor, Direction};
use crate::error::{BridgeError, BridgeResult, Side};

/// Bridges a slave terminal process to a master client.
///
/// The session shares the endpoints with its caller and never closes them.
/// Once [`run`](Self::run) returns, the caller must close both endpoints: a
/// pump blocked in a read that cannot be interrupted (such as a PTY read on
/// the blocking pool) only finishes when its stream closes.
pub struct Session {
    inner: Arc<Inner>,
}

struct Inner {
    master: Arc<dyn Master>,
    slave: Arc<dyn Slave>,
    options: SessionOptions,
    /// Serializes every write to the master across both pumps.
    write_lock: Mutex<()>,
}

impl Session {
    /// Creates a session over `master` and `slave` with `options` applied in
    /// order.
    pub fn new<M, S>(
        master: Arc<M>,
        slave: Arc<S>,
        options: impl IntoIterator<Item = SessionOption>,
    ) -> Self
    where
        M: Master + 'static,
        S: Slave + 'static,
    {
        Self::with_options(master, slave, SessionOptions::from_options(options))
    }

    /// Creates a session from already resolved settings.
    pub fn with_options(
        master: Arc<dyn Master>,
        slave: Arc<dyn Slave>,
        mut options: SessionOptions,
    ) -> Self {
        options.chunk_size = options.chunk_size.max(MIN_CHUNK_SIZE);
        Self {
            inner: Arc::new(Inner {
                master,
                slave,
                options,
                write_lock: Mutex::new(()),
            }),
        }
    }

    /// The settings this session runs with.
    pub fn options(&self) -> &SessionOptions {
        &self.inner.options
    }

    /// Runs the bridge until a pump fails or `shutdown` is cancelled.
    ///
    /// Sends the handshake frames first, then pumps slave output to the
    /// master and master frames to the slave. Returns `Ok(())` on
    /// cancellation and the error of the first pump to stop otherwise.
    /// The remaining pump is aborted on return.
    pub async fn run(&self, shutdown: CancellationToken) -> BridgeResult<()> {
        self.inner
            .send_initialize_message()
            .await
            .map_err(|e| BridgeError::Handshake(Box::new(e)))?;

        let auditor = Auditor::new(self.inner.options.audit.clone());
        let (audit, _audit_task) =
            AuditHandle::spawn(auditor, Arc::clone(&self.inner.options.audit_sink));

        let mut pumps = JoinSet::new();
        pumps.spawn(
            Arc::clone(&self.inner)
                .slave_pump(audit.clone())
                .in_current_span(),
        );
        pumps.spawn(Arc::clone(&self.inner).master_pump(audit).in_current_span());

        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("Session cancelled");
                Ok(())
            }
            Some(result) = pumps.join_next() => {
                let err = result.unwrap_or_else(BridgeError::Pump);
                debug!(error = %err, "Session pump stopped");
                Err(err)
            }
        }
    }
}

impl Inner {
    async fn send_initialize_message(&self) -> BridgeResult<()> {
        let title = framing::encode_window_title(&self.options.window_title);
        self.master_write(&title, OutboundCommand::SetWindowTitle)
            .await?;

        if self.options.reconnect_interval > 0 {
            let reconnect = framing::encode_reconnect(self.options.reconnect_interval)?;
            self.master_write(&reconnect, OutboundCommand::SetReconnect)
                .await?;
        }

        if let Some(preferences) = &self.options.preferences {
            let preferences = framing::encode_preferences(preferences);
            self.master_write(&preferences, OutboundCommand::SetPreferences)
                .await?;
        }

        Ok(())
    }

    /// Writes one frame to the master under the write lock.
    async fn master_write(&self, frame: &[u8], command: OutboundCommand) -> BridgeResult<()> {
        let _guard = self.write_lock.lock().await;
        self.master
            .write(frame)
            .await
            .map_err(|source| BridgeError::Write {
                side: Side::Master,
                frame: command.name(),
                source,
            })?;
        Ok(())
    }

    async fn slave_pump(self: Arc<Self>, audit: AuditHandle) -> BridgeError {
        let mut buffer = vec![0u8; self.options.chunk_size];
        loop {
            let n = match self.slave.read(&mut buffer).await {
                Ok(0) => {
                    debug!("Slave reached end of stream");
                    return BridgeError::slave_closed();
                }
                Ok(n) => n,
                Err(e) => {
                    debug!(error = %e, "Slave read failed");
                    return BridgeError::slave_closed();
                }
            };

            if let Err(e) = self.handle_slave_read(&buffer[..n], &audit).await {
                return e;
            }
        }
    }

    async fn handle_slave_read(&self, data: &[u8], audit: &AuditHandle) -> BridgeResult<()> {
        audit.record(Direction::Send, data);
        let frame = framing::encode_output(data);
        self.master_write(&frame, OutboundCommand::Output).await
    }

    async fn master_pump(self: Arc<Self>, audit: AuditHandle) -> BridgeError {
        let mut buffer = vec![0u8; self.options.chunk_size];
        loop {
            let n = match self.master.read(&mut buffer).await {
                Ok(n) => n,
                Err(e) => {
                    debug!(error = %e, "Master read failed");
                    return BridgeError::master_closed();
                }
            };

            if let Err(e) = self.handle_master_read(&buffer[..n], &audit).await {
                return e;
            }
        }
    }

    async fn handle_master_read(&self, data: &[u8], audit: &AuditHandle) -> BridgeResult<()> {
        if data.is_empty() {
            return Err(ProtocolError::EmptyFrame.into());
        }
        audit.record(Direction::Receive, &data[1..]);

        let frame = InboundFrame::decode(data)?;
        trace!(frame = frame.command.name(), len = frame.payload.len(), "Master frame");

        match frame.command {
            InboundCommand::Input => {
                if !self.options.permit_write || frame.payload.is_empty() {
                    return Ok(());
                }
                self.slave
                    .write(frame.payload)
                    .await
                    .map_err(|source| BridgeError::Write {
                        side: Side::Slave,
                        frame: "input",
                        source,
                    })?;
            }
            InboundCommand::Ping => {
                self.master_write(&framing::encode_pong(), OutboundCommand::Pong)
                    .await?;
            }
            InboundCommand::ResizeTerminal => self.resize_terminal(frame.payload).await?,
        }

        Ok(())
    }

    async fn resize_terminal(&self, payload: &[u8]) -> BridgeResult<()> {
        // A fixed size never reads the payload, so bad arguments are accepted.
        if self.options.has_fixed_size() {
            debug!("Terminal size is fixed, ignoring resize request");
            return Ok(());
        }

        let args = ResizeArgs::from_payload(payload)?;

        let columns = match self.options.fixed_columns {
            0 => args.columns(),
            fixed => fixed,
        };
        let rows = match self.options.fixed_rows {
            0 => args.rows(),
            fixed => fixed,
        };

        if let Err(e) = self.slave.resize(columns, rows).await {
            warn!(columns, rows, error = %e, "Failed to resize terminal");
        }
        Ok(())
    }
}
