//! Command codes for the webtty wire protocol.
//!
//! Every frame starts with a single command byte. The two directions use
//! separate code spaces: the same byte means one thing when the master sends
//! it and another when the bridge does. The values are the ASCII digits used
//! by GoTTY-compatible clients and must match on both endpoints.

use crate::error::ProtocolError;

/// Commands sent by the master (the remote terminal) to the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InboundCommand {
    /// Raw keystrokes to forward to the slave.
    Input = b'1',
    /// Keep-alive, answered with [`OutboundCommand::Pong`].
    Ping = b'2',
    /// Terminal size change request carrying a JSON payload.
    ResizeTerminal = b'3',
}

impl InboundCommand {
    /// Look up a command by its wire byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'1' => Some(Self::Input),
            b'2' => Some(Self::Ping),
            b'3' => Some(Self::ResizeTerminal),
            _ => None,
        }
    }

    /// The wire byte for this command.
    #[inline]
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Short name used in log fields.
    pub fn name(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Ping => "ping",
            Self::ResizeTerminal => "resize_terminal",
        }
    }
}

impl TryFrom<u8> for InboundCommand {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::from_byte(byte).ok_or(ProtocolError::UnknownCommand(byte))
    }
}

/// Commands sent by the bridge to the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OutboundCommand {
    /// Base64-encoded terminal output.
    Output = b'1',
    /// Reply to [`InboundCommand::Ping`].
    Pong = b'2',
    /// Window title, sent once during the handshake.
    SetWindowTitle = b'3',
    /// Opaque client preferences, sent once during the handshake.
    SetPreferences = b'4',
    /// Reconnect interval in seconds as a JSON integer.
    SetReconnect = b'5',
}

impl OutboundCommand {
    /// Look up a command by its wire byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'1' => Some(Self::Output),
            b'2' => Some(Self::Pong),
            b'3' => Some(Self::SetWindowTitle),
            b'4' => Some(Self::SetPreferences),
            b'5' => Some(Self::SetReconnect),
            _ => None,
        }
    }

    /// The wire byte for this command.
    #[inline]
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Short name used in log fields and error context.
    pub fn name(self) -> &'static str {
        match self {
            Self::Output => "output",
            Self::Pong => "pong",
            Self::SetWindowTitle => "window title",
            Self::SetPreferences => "preferences",
            Self::SetReconnect => "reconnect",
        }
    }
}

impl TryFrom<u8> for OutboundCommand {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::from_byte(byte).ok_or(ProtocolError::UnknownCommand(byte))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_codes_are_ascii_digits() {
        assert_eq!(InboundCommand::Input.as_byte(), b'1');
        assert_eq!(InboundCommand::Ping.as_byte(), b'2');
        assert_eq!(InboundCommand::ResizeTerminal.as_byte(), b'3');
    }

    #[test]
    fn test_outbound_codes_are_ascii_digits() {
        assert_eq!(OutboundCommand::Output.as_byte(), b'1');
        assert_eq!(OutboundCommand::Pong.as_byte(), b'2');
        assert_eq!(OutboundCommand::SetWindowTitle.as_byte(), b'3');
        assert_eq!(OutboundCommand::SetPreferences.as_byte(), b'4');
        assert_eq!(OutboundCommand::SetReconnect.as_byte(), b'5');
    }

    #[test]
    fn test_inbound_from_byte() {
        for command in [
            InboundCommand::Input,
            InboundCommand::Ping,
            InboundCommand::ResizeTerminal,
        ] {
            assert_eq!(InboundCommand::from_byte(command.as_byte()), Some(command));
        }
        assert_eq!(InboundCommand::from_byte(b'4'), None);
        assert_eq!(InboundCommand::from_byte(0), None);
    }

    #[test]
    fn test_inbound_try_from_unknown() {
        let err = InboundCommand::try_from(b'x').unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownCommand(b'x')));
    }

    #[test]
    fn test_outbound_try_from() {
        assert_eq!(
            OutboundCommand::try_from(b'5').unwrap(),
            OutboundCommand::SetReconnect
        );
        assert!(OutboundCommand::try_from(b'6').is_err());
    }
}
