//! Errors returned by a bridge session.

use std::fmt;
use std::io;

use protocol::ProtocolError;
use thiserror::Error;
use tokio::task::JoinError;

/// One end of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The remote terminal client.
    Master,
    /// The local process behind the pseudo-terminal.
    Slave,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Master => f.write_str("master"),
            Side::Slave => f.write_str("slave"),
        }
    }
}

/// Why a session stopped.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Reading from one side failed or hit end of stream.
    #[error("{side} closed")]
    StreamClosed {
        /// The side whose read failed.
        side: Side,
    },

    /// The master sent a frame that violates the protocol.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Writing a frame or input bytes failed.
    #[error("failed to write {frame} to {side}")]
    Write {
        /// The side being written to.
        side: Side,
        /// What was being written.
        frame: &'static str,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// One of the handshake frames could not be sent.
    #[error("failed to send initializing message")]
    Handshake(#[source] Box<BridgeError>),

    /// A pump task panicked or was cancelled by the runtime.
    #[error("pump task failed: {0}")]
    Pump(#[from] JoinError),
}

impl BridgeError {
    /// The master read failed.
    pub fn master_closed() -> Self {
        Self::StreamClosed { side: Side::Master }
    }

    /// The slave read failed.
    pub fn slave_closed() -> Self {
        Self::StreamClosed { side: Side::Slave }
    }

    /// Returns true if the session ended because a stream closed.
    pub fn is_stream_closed(&self) -> bool {
        matches!(self, Self::StreamClosed { .. })
    }
}

/// Result type for session operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
