//! Network side of the bridge.
//!
//! This module provides:
//! - [`WsMaster`]: a WebSocket connection acting as the session master
//! - [`serve`]: the listener running one session per connection

pub mod server;
pub mod websocket;

pub use server::{handle_connection, serve, serve_listener};
pub use websocket::{negotiate_subprotocol, WsMaster, WEBTTY_SUBPROTOCOL};
