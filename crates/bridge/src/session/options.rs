//! Session construction options.

use std::fmt;
use std::sync::Arc;

use protocol::ProtocolError;
use serde::Serialize;

use crate::audit::{AuditConfig, AuditSink, TracingAuditSink};

/// Default read buffer size for each pump.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Smallest read buffer that holds a command byte and one payload byte.
pub const MIN_CHUNK_SIZE: usize = 2;

/// One configuration step for a [`Session`](super::Session).
///
/// Options are applied in order, so a later option overrides an earlier one
/// touching the same setting.
#[derive(Clone)]
pub enum SessionOption {
    /// Forward Input frames to the slave.
    PermitWrite(bool),
    /// Lock the terminal width. 0 leaves it to the client.
    FixedColumns(u16),
    /// Lock the terminal height. 0 leaves it to the client.
    FixedRows(u16),
    /// Title sent in the first handshake frame.
    WindowTitle(Vec<u8>),
    /// Advertise reconnect support with this interval in seconds. 0 disables.
    ReconnectInterval(u32),
    /// Opaque preferences forwarded to the client during the handshake.
    Preferences(Vec<u8>),
    /// Read buffer size for each pump, raised to [`MIN_CHUNK_SIZE`] if smaller.
    ChunkSize(usize),
    /// Identity attached to audit records.
    AuditUser(String),
    /// Full audit configuration, including the audit user.
    Audit(AuditConfig),
    /// Where completed audit records go.
    AuditSink(Arc<dyn AuditSink>),
}

impl SessionOption {
    /// Preferences serialized as JSON.
    pub fn preferences_json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ProtocolError> {
        Ok(Self::Preferences(serde_json::to_vec(value)?))
    }
}

/// Resolved session settings.
#[derive(Clone)]
pub struct SessionOptions {
    /// Forward Input frames to the slave.
    pub permit_write: bool,
    /// Locked width, 0 when unset.
    pub fixed_columns: u16,
    /// Locked height, 0 when unset.
    pub fixed_rows: u16,
    /// Handshake window title.
    pub window_title: Vec<u8>,
    /// Reconnect interval in seconds, 0 when disabled.
    pub reconnect_interval: u32,
    /// Handshake preferences, if any.
    pub preferences: Option<Vec<u8>>,
    /// Read buffer size per pump.
    pub chunk_size: usize,
    /// Audit recorder settings.
    pub audit: AuditConfig,
    /// Audit record destination.
    pub audit_sink: Arc<dyn AuditSink>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            permit_write: false,
            fixed_columns: 0,
            fixed_rows: 0,
            window_title: Vec::new(),
            reconnect_interval: 0,
            preferences: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            audit: AuditConfig::default(),
            audit_sink: Arc::new(TracingAuditSink),
        }
    }
}

impl SessionOptions {
    /// Builds settings by applying `options` to the defaults.
    pub fn from_options(options: impl IntoIterator<Item = SessionOption>) -> Self {
        let mut resolved = Self::default();
        for option in options {
            resolved.apply(option);
        }
        resolved
    }

    /// Applies one option.
    pub fn apply(&mut self, option: SessionOption) {
        match option {
            SessionOption::PermitWrite(permit) => self.permit_write = permit,
            SessionOption::FixedColumns(columns) => self.fixed_columns = columns,
            SessionOption::FixedRows(rows) => self.fixed_rows = rows,
            SessionOption::WindowTitle(title) => self.window_title = title,
            SessionOption::ReconnectInterval(seconds) => self.reconnect_interval = seconds,
            SessionOption::Preferences(preferences) => self.preferences = Some(preferences),
            SessionOption::ChunkSize(size) => self.chunk_size = size.max(MIN_CHUNK_SIZE),
            SessionOption::AuditUser(user) => self.audit.user = user,
            SessionOption::Audit(audit) => self.audit = audit,
            SessionOption::AuditSink(sink) => self.audit_sink = sink,
        }
    }

    /// True when both dimensions are locked and resize requests are ignored.
    pub fn has_fixed_size(&self) -> bool {
        self.fixed_columns > 0 && self.fixed_rows > 0
    }
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("permit_write", &self.permit_write)
            .field("fixed_columns", &self.fixed_columns)
            .field("fixed_rows", &self.fixed_rows)
            .field("window_title", &String::from_utf8_lossy(&self.window_title))
            .field("reconnect_interval", &self.reconnect_interval)
            .field("preferences", &self.preferences.as_ref().map(Vec::len))
            .field("chunk_size", &self.chunk_size)
            .field("audit", &self.audit)
            .finish_non_exhaustive()
    }
}
