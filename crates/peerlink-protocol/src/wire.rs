//! Wire format: newline-terminated UTF-8 lines.
//!
//! Each message on the wire is the message text followed by `\n`. A `\r`
//! before the terminator is tolerated on receipt and stripped. Invalid UTF-8
//! on receipt is replaced with U+FFFD rather than rejected.

use crate::error::ProtocolError;

/// Maximum inbound line length (64 KiB), terminator excluded.
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Encode a message as one terminated line.
pub fn encode_line(text: &str) -> Result<Vec<u8>, ProtocolError> {
    if text.contains(['\n', '\r']) {
        return Err(ProtocolError::EmbeddedNewline);
    }
    let mut buf = Vec::with_capacity(text.len() + 1);
    buf.extend_from_slice(text.as_bytes());
    buf.push(b'\n');
    Ok(buf)
}

/// Strip the line terminator from a raw line read off the wire.
///
/// Returns `None` when the line is not terminated, i.e. the stream ended
/// mid-line.
pub fn strip_terminator(raw: &[u8]) -> Option<&[u8]> {
    let line = raw.strip_suffix(b"\n")?;
    Some(line.strip_suffix(b"\r").unwrap_or(line))
}

/// Decode a received line, replacing invalid UTF-8 sequences.
pub fn decode_line(line: &[u8]) -> String {
    String::from_utf8_lossy(line).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_appends_newline() {
        assert_eq!(encode_line("hello").unwrap(), b"hello\n");
        assert_eq!(encode_line("").unwrap(), b"\n");
    }

    #[test]
    fn encode_rejects_line_breaks() {
        assert!(matches!(
            encode_line("two\nlines"),
            Err(ProtocolError::EmbeddedNewline)
        ));
        assert!(matches!(
            encode_line("cr\r"),
            Err(ProtocolError::EmbeddedNewline)
        ));
    }

    #[test]
    fn strip_handles_crlf_and_fragments() {
        assert_eq!(strip_terminator(b"hi\n"), Some(&b"hi"[..]));
        assert_eq!(strip_terminator(b"hi\r\n"), Some(&b"hi"[..]));
        assert_eq!(strip_terminator(b"\n"), Some(&b""[..]));
        assert_eq!(strip_terminator(b"partial"), None);
    }

    #[test]
    fn decode_replaces_invalid_utf8() {
        assert_eq!(decode_line(b"caf\xc3\xa9"), "caf\u{e9}");
        assert_eq!(decode_line(b"caf\xe9"), "caf\u{fffd}");
    }
}
