//! # ptybridge
//!
//! Bridges a process running on a pseudo-terminal to a remote terminal
//! client speaking the webtty frame protocol.
//!
//! ## Overview
//!
//! - **Sessions**: pump slave output to the master as base64 Output frames
//!   and dispatch master frames (input, ping, resize) to the slave
//! - **Audit**: reconstruct typed command lines from the byte streams and
//!   record each executed command
//! - **Network**: a WebSocket server that spawns one command per connection
//!
//! ## Architecture
//!
//! ```text
//!  browser ──WebSocket──▶ WsMaster ◀──┐            ┌──▶ PtySlave ──▶ command
//!                                     │  Session   │
//!                                     └── pumps ───┘
//!                                          │
//!                                          ▼
//!                                   audit task ──▶ AuditSink
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bridge::{network, Config};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!     config.validate()?;
//!
//!     let shutdown = CancellationToken::new();
//!     network::serve(Arc::new(config), shutdown).await
//! }
//! ```
//!
//! ## Modules
//!
//! - [`session`]: the bridge engine, endpoint traits and the PTY slave
//! - [`audit`]: command auditing
//! - [`network`]: WebSocket master and server
//! - [`config`]: configuration loading and defaults
//! - [`logging`]: tracing subscriber setup
//! - [`error`]: session errors

pub mod audit;
pub mod config;
pub mod error;
pub mod logging;
pub mod network;
pub mod session;

// Re-export protocol for convenience
pub use protocol;

pub use audit::{AuditConfig, AuditRecord, AuditSink, Auditor, Direction, TracingAuditSink};
pub use config::Config;
pub use error::{BridgeError, BridgeResult, Side};
pub use network::{serve, WsMaster};
pub use session::{Master, PtyCommand, PtySlave, Session, SessionOption, SessionOptions, Slave};
