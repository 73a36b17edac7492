//! ASCII control character names.
//!
//! Used to render raw terminal chunks readably in debug logs. Nothing here
//! feeds the audit records themselves.

/// Null.
pub const NUL: u8 = 0x00;
/// Backspace.
pub const BS: u8 = 0x08;
/// Horizontal tab.
pub const HT: u8 = 0x09;
/// Line feed.
pub const LF: u8 = 0x0a;
/// Carriage return.
pub const CR: u8 = 0x0d;
/// Escape.
pub const ESC: u8 = 0x1b;
/// Space.
pub const SPACE: u8 = 0x20;
/// `#`, the last visible character of a root prompt.
pub const HASH: u8 = 0x23;
/// Delete.
pub const DEL: u8 = 0x7f;

/// Mnemonics for bytes 0x00..=0x1f, indexed by byte value.
const C0_NAMES: [&str; 32] = [
    "NUL", "SOH", "STX", "ETX", "EOT", "ENQ", "ACK", "BEL", "BS", "HT", "LF", "VT", "FF", "CR",
    "SO", "SI", "DLE", "DC1", "DC2", "DC3", "DC4", "NAK", "SYN", "ETB", "CAN", "EM", "SUB", "ESC",
    "FS", "GS", "RS", "US",
];

/// Returns the mnemonic of a control byte, or `None` for everything else.
pub fn control_name(byte: u8) -> Option<&'static str> {
    match byte {
        0x00..=0x1f => Some(C0_NAMES[byte as usize]),
        DEL => Some("DEL"),
        _ => None,
    }
}

/// Renders bytes for a debug log line.
///
/// Control bytes become `*MNEMONIC*`; every other byte is written as the
/// character with the same code point.
pub fn render(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &byte in bytes {
        match control_name(byte) {
            Some(name) => {
                out.push('*');
                out.push_str(name);
                out.push('*');
            }
            None => out.push(char::from(byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_names() {
        assert_eq!(control_name(NUL), Some("NUL"));
        assert_eq!(control_name(BS), Some("BS"));
        assert_eq!(control_name(HT), Some("HT"));
        assert_eq!(control_name(LF), Some("LF"));
        assert_eq!(control_name(CR), Some("CR"));
        assert_eq!(control_name(ESC), Some("ESC"));
        assert_eq!(control_name(0x1f), Some("US"));
        assert_eq!(control_name(DEL), Some("DEL"));
    }

    #[test]
    fn test_printable_bytes_have_no_name() {
        assert_eq!(control_name(SPACE), None);
        assert_eq!(control_name(HASH), None);
        assert_eq!(control_name(b'a'), None);
        assert_eq!(control_name(0x80), None);
    }

    #[test]
    fn test_render_mixed() {
        assert_eq!(render(b"ls\r\n"), "ls*CR**LF*");
        assert_eq!(render(b"\x1b[0m"), "*ESC*[0m");
        assert_eq!(render(b"a\tb\x7f"), "a*HT*b*DEL*");
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(b""), "");
    }
}
