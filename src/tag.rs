//! Four-byte tags for sfnt tables and OpenType features.

use std::fmt;

use crate::error::ParseError;

/// Generate a 4-byte tag from byte string
///
/// Example:
///
/// ```
/// use fontmerge::tag;
///
/// assert_eq!(tag::GSUB, 0x47535542);
/// ```
macro_rules! tag {
    ($w:expr) => {
        tag(*$w)
    };
}

/// Wrapper that formats a tag as its four characters.
#[derive(PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct DisplayTag(pub u32);

const fn tag(chars: [u8; 4]) -> u32 {
    (chars[3] as u32)
        | ((chars[2] as u32) << 8)
        | ((chars[1] as u32) << 16)
        | ((chars[0] as u32) << 24)
}

/// Parse a tag from a string of up to four ASCII characters, padding with spaces.
pub fn from_string(s: &str) -> Result<u32, ParseError> {
    if s.len() > 4 {
        return Err(ParseError::BadValue);
    }

    let mut tag: u32 = 0;
    let mut count = 0;

    for c in s.chars() {
        if !c.is_ascii() || c.is_ascii_control() {
            return Err(ParseError::BadValue);
        }

        tag = (tag << 8) | (c as u32);
        count += 1;
    }

    while count < 4 {
        tag = (tag << 8) | (' ' as u32);
        count += 1;
    }

    Ok(tag)
}

impl fmt::Display for DisplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = self.0;
        let bytes = tag.to_be_bytes();
        if bytes.iter().any(|&b| !b.is_ascii() || b.is_ascii_control()) {
            write!(f, "0x{:08x}", tag)
        } else {
            let s: String = bytes.iter().copied().map(char::from).collect();
            s.fmt(f)
        }
    }
}

impl fmt::Debug for DisplayTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_string().fmt(f)
    }
}

// sfnt versions
pub const OTTO: u32 = tag!(b"OTTO");
pub const TTCF: u32 = tag!(b"ttcf");

// tables
pub const CFF: u32 = tag!(b"CFF ");
pub const CMAP: u32 = tag!(b"cmap");
pub const GLYF: u32 = tag!(b"glyf");
pub const GSUB: u32 = tag!(b"GSUB");
pub const HEAD: u32 = tag!(b"head");
pub const HHEA: u32 = tag!(b"hhea");
pub const HMTX: u32 = tag!(b"hmtx");
pub const KERN: u32 = tag!(b"kern");
pub const LOCA: u32 = tag!(b"loca");
pub const MAXP: u32 = tag!(b"maxp");
pub const POST: u32 = tag!(b"post");

// features
pub const CASE: u32 = tag!(b"case");
pub const SS01: u32 = tag!(b"ss01");
pub const SS02: u32 = tag!(b"ss02");
pub const SWSH: u32 = tag!(b"swsh");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_string_pads() {
        assert_eq!(from_string("ss01"), Ok(SS01));
        assert_eq!(from_string("CFF"), Ok(CFF));
        assert_eq!(from_string("toolong"), Err(ParseError::BadValue));
    }

    #[test]
    fn test_display() {
        assert_eq!(DisplayTag(CASE).to_string(), "case");
        assert_eq!(DisplayTag(0x00_01_02_03).to_string(), "0x00010203");
    }
}
