//! Quoted representations for diagnostics.

use std::fmt::Write;

use super::MutableString;

impl MutableString {
    /// Double-quoted, escaped form. Printable characters of the string's
    /// encoding are kept; bytes that do not decode become `\xHH`.
    pub fn inspect(&self) -> String {
        self.quote(false)
    }

    /// Like [`inspect`](Self::inspect) but pure ASCII: every non-ASCII
    /// character is written as `\u{...}` (or `\xHH` for undecodable bytes).
    pub fn dump(&self) -> String {
        self.quote(true)
    }

    fn quote(&self, ascii_only: bool) -> String {
        let mut out = String::with_capacity(self.len() + 2);
        out.push('"');
        let bytes = self.content.bytes_lossy(self.encoding);
        if self.encoding.is_single_byte() {
            for &byte in bytes.iter() {
                if byte < 0x80 || (!self.encoding.is_raw() && self.encoding.decode_byte(byte) != 0xFFFD) {
                    let unit = self.encoding.decode_byte(byte);
                    let c = char::from_u32(unit as u32).unwrap_or(char::REPLACEMENT_CHARACTER);
                    push_char(&mut out, c, ascii_only);
                } else {
                    let _ = write!(out, "\\x{byte:02X}");
                }
            }
        } else {
            for chunk in bytes.utf8_chunks() {
                let mut chars = chunk.valid().chars().peekable();
                while let Some(c) = chars.next() {
                    if c == '#' && matches!(chars.peek(), Some('{' | '$' | '@')) {
                        out.push_str("\\#");
                    } else {
                        push_char(&mut out, c, ascii_only);
                    }
                }
                for byte in chunk.invalid() {
                    let _ = write!(out, "\\x{byte:02X}");
                }
            }
        }
        out.push('"');
        out
    }
}

fn push_char(out: &mut String, c: char, ascii_only: bool) {
    match c {
        '"' => out.push_str("\\\""),
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\t' => out.push_str("\\t"),
        '\r' => out.push_str("\\r"),
        '\u{0C}' => out.push_str("\\f"),
        '\u{0B}' => out.push_str("\\v"),
        '\u{07}' => out.push_str("\\a"),
        '\u{08}' => out.push_str("\\b"),
        '\u{1B}' => out.push_str("\\e"),
        c if (c as u32) < 0x20 || c == '\u{7F}' => {
            let _ = write!(out, "\\x{:02X}", c as u32);
        }
        c if c.is_ascii() => out.push(c),
        c if ascii_only || c.is_control() => {
            let _ = write!(out, "\\u{{{:X}}}", c as u32);
        }
        c => out.push(c),
    }
}
