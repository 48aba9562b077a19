//! Interned encoding descriptors.
//!
//! Every string carries a `&'static Encoding`. Descriptors are process-wide
//! statics, so identity comparison is pointer comparison and there is no
//! registration step.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{Result, StringError};

const REPLACEMENT: u16 = 0xFFFD;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scheme {
    /// Raw bytes; each byte reads as U+0000..U+00FF.
    Binary,
    Ascii,
    Utf8,
    /// Legacy single-byte scheme. `None` maps the high half straight onto
    /// U+0080..U+00FF.
    SingleByte(Option<&'static [u16; 128]>),
}

pub struct Encoding {
    ordinal: u8,
    name: &'static str,
    aliases: &'static [&'static str],
    scheme: Scheme,
}

pub static BINARY: Encoding = Encoding {
    ordinal: 0,
    name: "ASCII-8BIT",
    aliases: &["BINARY"],
    scheme: Scheme::Binary,
};

pub static US_ASCII: Encoding = Encoding {
    ordinal: 1,
    name: "US-ASCII",
    aliases: &["ASCII", "ANSI_X3.4-1968", "646"],
    scheme: Scheme::Ascii,
};

pub static UTF_8: Encoding = Encoding {
    ordinal: 2,
    name: "UTF-8",
    aliases: &["CP65001"],
    scheme: Scheme::Utf8,
};

pub static ISO_8859_1: Encoding = Encoding {
    ordinal: 3,
    name: "ISO-8859-1",
    aliases: &["ISO8859-1", "LATIN1"],
    scheme: Scheme::SingleByte(None),
};

pub static ISO_8859_15: Encoding = Encoding {
    ordinal: 4,
    name: "ISO-8859-15",
    aliases: &["ISO8859-15", "LATIN9"],
    scheme: Scheme::SingleByte(Some(&LATIN9_HIGH)),
};

static ALL: [&Encoding; 5] = [&BINARY, &US_ASCII, &UTF_8, &ISO_8859_1, &ISO_8859_15];

static LATIN9_HIGH: [u16; 128] = latin9_high();

const fn latin9_high() -> [u16; 128] {
    let mut table = [0u16; 128];
    let mut i = 0;
    while i < 128 {
        table[i] = 0x80 + i as u16;
        i += 1;
    }
    table[0x24] = 0x20AC;
    table[0x26] = 0x0160;
    table[0x28] = 0x0161;
    table[0x34] = 0x017D;
    table[0x38] = 0x017E;
    table[0x3C] = 0x0152;
    table[0x3D] = 0x0153;
    table[0x3E] = 0x0178;
    table
}

impl Encoding {
    /// Looks an encoding up by canonical name or alias, ignoring ASCII case.
    pub fn find(name: &str) -> Option<&'static Encoding> {
        ALL.iter().copied().find(|enc| {
            enc.name.eq_ignore_ascii_case(name)
                || enc.aliases.iter().any(|alias| alias.eq_ignore_ascii_case(name))
        })
    }

    pub fn all() -> &'static [&'static Encoding] {
        &ALL
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ordinal(&self) -> u8 {
        self.ordinal
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        self.aliases
    }

    /// Byte-oriented encoding with no character semantics of its own.
    pub fn is_raw(&self) -> bool {
        matches!(self.scheme, Scheme::Binary)
    }

    pub fn is_single_byte(&self) -> bool {
        !matches!(self.scheme, Scheme::Utf8)
    }

    /// Legacy schemes where every byte is exactly one character. Strings in
    /// these encodings keep bytes and read them directly as characters.
    pub fn is_legacy_single_byte(&self) -> bool {
        matches!(self.scheme, Scheme::SingleByte(_))
    }

    /// Bytes 0x00..0x7F mean the ASCII characters.
    pub fn is_ascii_compatible(&self) -> bool {
        // single-byte tables only remap the high half
        match self.scheme {
            Scheme::Binary | Scheme::Ascii | Scheme::Utf8 | Scheme::SingleByte(_) => true,
        }
    }

    pub fn max_bytes_per_char(&self) -> usize {
        if self.is_single_byte() { 1 } else { 4 }
    }

    /// Character for a single byte; only meaningful when bytes are
    /// characters (single-byte schemes or ASCII bytes).
    pub fn decode_byte(&self, byte: u8) -> u16 {
        if byte < 0x80 {
            return byte as u16;
        }
        match self.scheme {
            Scheme::Binary => byte as u16,
            Scheme::Ascii | Scheme::Utf8 => REPLACEMENT,
            Scheme::SingleByte(None) => byte as u16,
            Scheme::SingleByte(Some(table)) => table[(byte - 0x80) as usize],
        }
    }

    /// Single byte for a UTF-16 unit, if this encoding has one.
    pub fn encode_unit(&self, unit: u16) -> Option<u8> {
        if unit < 0x80 {
            return Some(unit as u8);
        }
        match self.scheme {
            Scheme::Binary | Scheme::SingleByte(None) => u8::try_from(unit).ok(),
            Scheme::Ascii | Scheme::Utf8 => None,
            Scheme::SingleByte(Some(table)) => table
                .iter()
                .position(|&mapped| mapped == unit)
                .map(|pos| 0x80 + pos as u8),
        }
    }

    /// Strict decode into UTF-16 units.
    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<u16>> {
        match self.scheme {
            Scheme::Utf8 => {
                let text = std::str::from_utf8(bytes).map_err(|e| self.invalid(e.valid_up_to()))?;
                Ok(text.encode_utf16().collect())
            }
            Scheme::Ascii => match bytes.iter().position(|&b| b >= 0x80) {
                Some(offset) => Err(self.invalid(offset)),
                None => Ok(bytes.iter().map(|&b| b as u16).collect()),
            },
            _ => Ok(bytes.iter().map(|&b| self.decode_byte(b)).collect()),
        }
    }

    /// Decode that substitutes U+FFFD for anything invalid.
    pub fn decode_lossy(&self, bytes: &[u8]) -> Vec<u16> {
        match self.scheme {
            Scheme::Utf8 => String::from_utf8_lossy(bytes).encode_utf16().collect(),
            _ => bytes.iter().map(|&b| self.decode_byte(b)).collect(),
        }
    }

    pub fn decode_to_string(&self, bytes: &[u8]) -> Result<String> {
        match self.scheme {
            Scheme::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|e| self.invalid(e.valid_up_to())),
            _ => {
                let units = self.decode(bytes)?;
                Ok(units
                    .iter()
                    .map(|&u| char::from_u32(u as u32).unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect())
            }
        }
    }

    /// Number of UTF-16 units the bytes decode to, counting invalid
    /// sequences as one replacement unit each.
    pub fn char_len(&self, bytes: &[u8]) -> usize {
        match self.scheme {
            Scheme::Utf8 if !bytes.is_ascii() => {
                String::from_utf8_lossy(bytes).encode_utf16().count()
            }
            _ => bytes.len(),
        }
    }

    /// Strict encode of UTF-16 units.
    pub fn encode_units(&self, units: &[u16]) -> Result<Vec<u8>> {
        if units.iter().all(|&u| u < 0x80) {
            return Ok(units.iter().map(|&u| u as u8).collect());
        }
        match self.scheme {
            Scheme::Utf8 => {
                let mut out = Vec::with_capacity(units.len() * 2);
                let mut buf = [0u8; 4];
                for decoded in char::decode_utf16(units.iter().copied()) {
                    let c = decoded.map_err(|e| self.unencodable(e.unpaired_surrogate() as u32))?;
                    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                }
                Ok(out)
            }
            _ => units
                .iter()
                .map(|&u| self.encode_unit(u).ok_or_else(|| self.unencodable(u as u32)))
                .collect(),
        }
    }

    /// Encode that writes `?` for units this encoding cannot represent.
    pub fn encode_units_lossy(&self, units: &[u16]) -> Vec<u8> {
        match self.scheme {
            Scheme::Utf8 => {
                let text: String = char::decode_utf16(units.iter().copied())
                    .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect();
                text.into_bytes()
            }
            _ => units
                .iter()
                .map(|&u| self.encode_unit(u).unwrap_or(b'?'))
                .collect(),
        }
    }

    pub fn encode_str<'a>(&self, text: &'a str) -> Result<Cow<'a, [u8]>> {
        if text.is_ascii() || matches!(self.scheme, Scheme::Utf8) {
            return Ok(Cow::Borrowed(text.as_bytes()));
        }
        let mut out = Vec::with_capacity(text.len());
        for c in text.chars() {
            let byte = u16::try_from(c as u32)
                .ok()
                .and_then(|unit| self.encode_unit(unit))
                .ok_or_else(|| self.unencodable(c as u32))?;
            out.push(byte);
        }
        Ok(Cow::Owned(out))
    }

    /// Encoding of the result of combining two strings, or `None` when they
    /// cannot be combined.
    ///
    /// Order of the checks:
    /// 1. identical encodings combine as-is;
    /// 2. when exactly one side is raw and the other side is pure ASCII, the
    ///    non-raw encoding wins;
    /// 3. two pure-ASCII sides keep the left encoding;
    /// 4. a pure-ASCII side takes the other side's encoding;
    /// 5. anything else is incompatible.
    ///
    /// Rule 2 applies even when the raw side holds high bytes: BINARY
    /// `"\xFF"` joined with UTF-8 `"a"` is tagged UTF-8. The bytes are kept
    /// as they are, so the result may not decode in its new encoding.
    pub fn compatible(
        left: &'static Encoding,
        left_ascii: bool,
        right: &'static Encoding,
        right_ascii: bool,
    ) -> Option<&'static Encoding> {
        if left == right {
            return Some(left);
        }
        if left.is_raw() != right.is_raw() {
            let (non_raw, non_raw_ascii) = if left.is_raw() {
                (right, right_ascii)
            } else {
                (left, left_ascii)
            };
            if non_raw_ascii {
                return Some(non_raw);
            }
        }
        match (left_ascii, right_ascii) {
            (_, true) => Some(left),
            (true, false) => Some(right),
            (false, false) => None,
        }
    }

    fn invalid(&self, offset: usize) -> StringError {
        StringError::InvalidByteSequence {
            encoding: self.name,
            offset,
        }
    }

    fn unencodable(&self, code_point: u32) -> StringError {
        StringError::Unencodable {
            encoding: self.name,
            code_point,
        }
    }
}

impl PartialEq for Encoding {
    fn eq(&self, other: &Self) -> bool {
        self.ordinal == other.ordinal
    }
}

impl Eq for Encoding {}

impl Hash for Encoding {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ordinal.hash(state);
    }
}

impl fmt::Debug for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Encoding({})", self.name)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
