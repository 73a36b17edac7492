//! # ptybridge Protocol Library
//!
//! This crate defines the webtty wire protocol spoken between a terminal
//! bridge and its remote terminal client.
//!
//! ## Overview
//!
//! - **Command Codes**: one byte at the start of every frame, with separate
//!   code spaces for each direction
//! - **Frame Codec**: encoding of outbound frames (base64 output, handshake
//!   frames) and decoding of inbound frames and resize arguments
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{encode_output, InboundCommand, InboundFrame, ResizeArgs};
//!
//! // Terminal output always travels as base64
//! assert_eq!(encode_output(b"hi"), b"1aGk=".to_vec());
//!
//! // Frames from the client are decoded by their first byte
//! let frame = InboundFrame::decode(br#"3{"columns":80,"rows":24}"#).unwrap();
//! assert_eq!(frame.command, InboundCommand::ResizeTerminal);
//!
//! let args = ResizeArgs::from_payload(frame.payload).unwrap();
//! assert_eq!((args.columns(), args.rows()), (80, 24));
//! ```
//!
//! ## Modules
//!
//! - [`command`]: Inbound and outbound command codes
//! - [`framing`]: Frame encoding and decoding
//! - [`error`]: Error types

pub mod command;
pub mod error;
pub mod framing;

pub use command::{InboundCommand, OutboundCommand};
pub use error::{ProtocolError, Result};
pub use framing::{
    encode, encode_output, encode_pong, encode_preferences, encode_reconnect,
    encode_window_title, InboundFrame, OutboundFrame, ResizeArgs, COMMAND_SIZE,
};
