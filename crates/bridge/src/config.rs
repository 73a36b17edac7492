//! Configuration management for ptybridge.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/ptybridge/config.toml`.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use protocol::ProtocolError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audit::AuditConfig;
use crate::session::{PtyCommand, SessionOption, DEFAULT_CHUNK_SIZE, MIN_CHUNK_SIZE};

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("bind must be a socket address such as 127.0.0.1:8080, got {0}")]
    InvalidBind(String),

    #[error("chunk_size must be between 2 and 1048576 bytes, got {0}")]
    InvalidChunkSize(usize),

    #[error("command not found: {0}")]
    InvalidCommand(String),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

const MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// Main configuration structure for ptybridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Listener and command configuration.
    pub server: ServerConfig,

    /// Per-session terminal settings.
    pub session: SessionConfig,

    /// Command audit settings.
    pub audit: AuditConfig,

    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Listener and command configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind: String,

    /// Program started for every connection.
    pub command: String,

    /// Arguments passed to `command`.
    pub args: Vec<String>,

    /// Value of `TERM` in the command's environment.
    pub term: String,
}

/// Per-session terminal settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    /// Window title sent to clients. Empty uses the command name.
    pub title: String,

    /// Let clients type into the terminal.
    pub permit_write: bool,

    /// Fixed terminal width (0 = client decides).
    pub columns: u16,

    /// Fixed terminal height (0 = client decides).
    pub rows: u16,

    /// Reconnect interval in seconds advertised to clients (0 = disabled).
    pub reconnect: u32,

    /// Read buffer size of each pump in bytes.
    pub chunk_size: usize,

    /// Client preferences, forwarded as JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<toml::Table>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            command: default_shell(),
            args: Vec::new(),
            term: "xterm-256color".to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            title: "ptybridge".to_string(),
            permit_write: false,
            columns: 0,
            rows: 0,
            reconnect: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            preferences: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// The command line run on each connection's PTY.
    pub fn pty_command(&self) -> PtyCommand {
        PtyCommand {
            program: self.command.clone(),
            args: self.args.clone(),
            env: vec![("TERM".to_string(), self.term.clone())],
            cwd: None,
        }
    }
}

impl SessionConfig {
    /// PTY size at spawn time: the fixed size where set, 80x24 otherwise.
    pub fn initial_size(&self) -> (u16, u16) {
        let cols = if self.columns > 0 { self.columns } else { 80 };
        let rows = if self.rows > 0 { self.rows } else { 24 };
        (cols, rows)
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ptybridge")
        .join("config.toml")
}

/// Returns the default shell for the current platform.
fn default_shell() -> String {
    if cfg!(windows) {
        "powershell.exe".to_string()
    } else {
        std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
    }
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - PTYBRIDGE_BIND: Override the listen address
    /// - PTYBRIDGE_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(bind) = std::env::var("PTYBRIDGE_BIND") {
            if !bind.is_empty() {
                tracing::info!("Overriding bind from environment: {}", bind);
                self.server.bind = bind;
            }
        }

        if let Ok(level) = std::env::var("PTYBRIDGE_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::info!("Overriding log_level from environment: {}", level);
                self.logging.level = level;
            }
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::InvalidBind(self.server.bind.clone()));
        }

        let chunk_size = self.session.chunk_size;
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&chunk_size) {
            return Err(ConfigError::InvalidChunkSize(chunk_size));
        }

        let command = &self.server.command;
        let found = if command.is_empty() {
            false
        } else if Path::new(command).is_absolute() {
            Path::new(command).exists()
        } else {
            which::which(command).is_ok()
        };
        if !found {
            return Err(ConfigError::InvalidCommand(command.clone()));
        }

        let level = self.logging.level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.logging.level.clone()));
        }

        Ok(())
    }

    /// The window title clients receive.
    pub fn window_title(&self) -> String {
        if !self.session.title.is_empty() {
            return self.session.title.clone();
        }
        Path::new(&self.server.command)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.server.command.clone())
    }

    /// Session options for one connection.
    ///
    /// Fails only if the preferences table cannot be encoded as JSON.
    pub fn session_options(&self) -> Result<Vec<SessionOption>, ProtocolError> {
        let session = &self.session;
        let mut options = vec![
            SessionOption::WindowTitle(self.window_title().into_bytes()),
            SessionOption::PermitWrite(session.permit_write),
            SessionOption::FixedColumns(session.columns),
            SessionOption::FixedRows(session.rows),
            SessionOption::ReconnectInterval(session.reconnect),
            SessionOption::ChunkSize(session.chunk_size),
            SessionOption::Audit(self.audit.clone()),
        ];
        if let Some(preferences) = &session.preferences {
            options.push(SessionOption::preferences_json(preferences)?);
        }
        Ok(options)
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
