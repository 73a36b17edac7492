//! Frame codec for the webtty wire protocol.
//!
//! # Frame Format
//!
//! Each frame consists of:
//! - 1 byte: command code (see [`crate::command`])
//! - N bytes: payload
//!
//! Frame boundaries come from the transport (one WebSocket message is one
//! frame), so there is no length prefix.
//!
//! # Payloads
//!
//! Output payloads are standard base64 of the raw terminal bytes so they
//! survive text-only transports. ResizeTerminal carries a JSON object and
//! SetReconnect a JSON integer. Everything else is passed through verbatim.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::command::{InboundCommand, OutboundCommand};
use crate::error::{ProtocolError, Result};

/// Command byte size at the start of every frame.
pub const COMMAND_SIZE: usize = 1;

/// Encode an outbound frame from a command and a raw payload.
pub fn encode(command: OutboundCommand, payload: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(COMMAND_SIZE + payload.len());
    output.push(command.as_byte());
    output.extend_from_slice(payload);
    output
}

/// Encode terminal output read from the slave as an Output frame.
///
/// The payload is always the standard base64 encoding of `data`.
pub fn encode_output(data: &[u8]) -> Vec<u8> {
    let mut encoded = String::with_capacity(data.len().div_ceil(3) * 4);
    STANDARD.encode_string(data, &mut encoded);
    encode(OutboundCommand::Output, encoded.as_bytes())
}

/// Encode the single-byte Pong frame.
pub fn encode_pong() -> Vec<u8> {
    encode(OutboundCommand::Pong, &[])
}

/// Encode the window title handshake frame.
pub fn encode_window_title(title: &[u8]) -> Vec<u8> {
    encode(OutboundCommand::SetWindowTitle, title)
}

/// Encode the reconnect interval handshake frame.
pub fn encode_reconnect(seconds: u32) -> Result<Vec<u8>> {
    let payload = serde_json::to_vec(&seconds)?;
    Ok(encode(OutboundCommand::SetReconnect, &payload))
}

/// Encode the preferences handshake frame.
pub fn encode_preferences(preferences: &[u8]) -> Vec<u8> {
    encode(OutboundCommand::SetPreferences, preferences)
}

/// A frame received from the master, borrowing from the read buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundFrame<'a> {
    /// Decoded command byte.
    pub command: InboundCommand,
    /// Everything after the command byte.
    pub payload: &'a [u8],
}

impl<'a> InboundFrame<'a> {
    /// Decode a frame from one master read.
    ///
    /// Fails on a zero-length read and on command bytes outside the
    /// inbound command set.
    pub fn decode(data: &'a [u8]) -> Result<Self> {
        let (&code, payload) = data.split_first().ok_or(ProtocolError::EmptyFrame)?;
        let command = InboundCommand::try_from(code)?;
        Ok(Self { command, payload })
    }
}

/// A frame sent by the bridge, as seen by the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboundFrame<'a> {
    /// Decoded command byte.
    pub command: OutboundCommand,
    /// Everything after the command byte.
    pub payload: &'a [u8],
}

impl<'a> OutboundFrame<'a> {
    /// Decode a frame written by the bridge.
    pub fn decode(data: &'a [u8]) -> Result<Self> {
        let (&code, payload) = data.split_first().ok_or(ProtocolError::EmptyFrame)?;
        let command = OutboundCommand::try_from(code)?;
        Ok(Self { command, payload })
    }

    /// Decode the raw terminal bytes of an Output frame.
    pub fn output(&self) -> Result<Vec<u8>> {
        if self.command != OutboundCommand::Output {
            return Err(ProtocolError::Deserialization(format!(
                "expected output frame, got {}",
                self.command.name()
            )));
        }
        Ok(STANDARD.decode(self.payload)?)
    }
}

/// Arguments of a ResizeTerminal frame.
///
/// Clients send floating point numbers; fields that are missing default to
/// zero, and unknown fields are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizeArgs {
    /// Requested terminal width.
    #[serde(alias = "Columns")]
    pub columns: f64,
    /// Requested terminal height.
    #[serde(alias = "Rows")]
    pub rows: f64,
}

impl ResizeArgs {
    /// Parse the JSON payload of a ResizeTerminal frame.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        if payload.is_empty() {
            return Err(ProtocolError::EmptyResizePayload);
        }
        serde_json::from_slice(payload).map_err(|e| ProtocolError::MalformedResize(e.to_string()))
    }

    /// Requested columns, truncated toward zero.
    pub fn columns(&self) -> u16 {
        truncate_dimension(self.columns)
    }

    /// Requested rows, truncated toward zero.
    pub fn rows(&self) -> u16 {
        truncate_dimension(self.rows)
    }
}

/// Float to terminal dimension. Out-of-range values saturate, NaN becomes 0.
fn truncate_dimension(value: f64) -> u16 {
    value.trunc() as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_output_is_base64() {
        let frame = encode_output(b"hello\r\n");
        assert_eq!(frame[0], b'1');
        assert_eq!(&frame[1..], b"aGVsbG8NCg==");
    }

    #[test]
    fn test_encode_output_empty() {
        assert_eq!(encode_output(b""), vec![b'1']);
    }

    #[test]
    fn test_encode_output_binary_bytes() {
        let data = [0x00, 0x1b, 0xff, 0x80, b'[', b'm'];
        let frame = encode_output(&data);
        let decoded = OutboundFrame::decode(&frame).unwrap().output().unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_encode_pong() {
        assert_eq!(encode_pong(), vec![b'2']);
    }

    #[test]
    fn test_encode_window_title() {
        assert_eq!(encode_window_title(b"bash@host"), b"3bash@host".to_vec());
        assert_eq!(encode_window_title(b""), vec![b'3']);
    }

    #[test]
    fn test_encode_reconnect_is_json_integer() {
        assert_eq!(encode_reconnect(10).unwrap(), b"510".to_vec());
    }

    #[test]
    fn test_encode_preferences_verbatim() {
        let prefs = br#"{"font-size":14}"#;
        let frame = encode_preferences(prefs);
        assert_eq!(frame[0], b'4');
        assert_eq!(&frame[1..], prefs);
    }

    #[test]
    fn test_decode_inbound_input() {
        let frame = InboundFrame::decode(b"1ls -la").unwrap();
        assert_eq!(frame.command, InboundCommand::Input);
        assert_eq!(frame.payload, b"ls -la");
    }

    #[test]
    fn test_decode_inbound_ping_without_payload() {
        let frame = InboundFrame::decode(b"2").unwrap();
        assert_eq!(frame.command, InboundCommand::Ping);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_decode_inbound_empty() {
        let err = InboundFrame::decode(b"").unwrap_err();
        assert!(matches!(err, ProtocolError::EmptyFrame));
    }

    #[test]
    fn test_decode_inbound_unknown() {
        let err = InboundFrame::decode(b"9whatever").unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownCommand(b'9')));
        assert!(err.to_string().contains("`9`"));
    }

    #[test]
    fn test_outbound_output_rejects_other_commands() {
        let frame = encode_pong();
        let decoded = OutboundFrame::decode(&frame).unwrap();
        assert!(decoded.output().is_err());
    }

    #[test]
    fn test_resize_args_parse() {
        let args = ResizeArgs::from_payload(br#"{"columns":80,"rows":24}"#).unwrap();
        assert_eq!(args.columns(), 80);
        assert_eq!(args.rows(), 24);
    }

    #[test]
    fn test_resize_args_truncates_floats() {
        let args = ResizeArgs::from_payload(br#"{"columns":120.9,"rows":40.2}"#).unwrap();
        assert_eq!(args.columns(), 120);
        assert_eq!(args.rows(), 40);
    }

    #[test]
    fn test_resize_args_capitalized_fields() {
        let args = ResizeArgs::from_payload(br#"{"Columns":100,"Rows":30}"#).unwrap();
        assert_eq!(args.columns(), 100);
        assert_eq!(args.rows(), 30);
    }

    #[test]
    fn test_resize_args_missing_fields_default_to_zero() {
        let args = ResizeArgs::from_payload(br#"{"columns":132}"#).unwrap();
        assert_eq!(args.columns(), 132);
        assert_eq!(args.rows(), 0);
    }

    #[test]
    fn test_resize_args_ignores_unknown_fields() {
        let args = ResizeArgs::from_payload(br#"{"columns":80,"rows":24,"dpr":2}"#).unwrap();
        assert_eq!(args.columns(), 80);
    }

    #[test]
    fn test_resize_args_negative_saturates() {
        let args = ResizeArgs::from_payload(br#"{"columns":-5,"rows":1e9}"#).unwrap();
        assert_eq!(args.columns(), 0);
        assert_eq!(args.rows(), u16::MAX);
    }

    #[test]
    fn test_resize_args_empty_payload() {
        let err = ResizeArgs::from_payload(b"").unwrap_err();
        assert!(matches!(err, ProtocolError::EmptyResizePayload));
    }

    #[test]
    fn test_resize_args_malformed() {
        let err = ResizeArgs::from_payload(b"{columns: 80").unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedResize(_)));

        let err = ResizeArgs::from_payload(br#"{"columns":"wide","rows":24}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedResize(_)));
    }
}
