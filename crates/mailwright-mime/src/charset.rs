//! Charset identification, encoding and decoding.
//!
//! Wide Unicode charsets (UTF-16/UTF-32) are converted by hand in this
//! module; `encoding_rs` encoders only produce the WHATWG output encodings,
//! which does not include them. Legacy charsets resolve through
//! `encoding_rs` label lookup.

use std::fmt;

use crate::error::{Error, Result};

/// A character set usable in encoded words and body content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// 7-bit US-ASCII.
    Ascii,
    /// UTF-8.
    Utf8,
    /// UTF-16 little-endian.
    Utf16Le,
    /// UTF-16 big-endian.
    Utf16Be,
    /// UTF-32 little-endian.
    Utf32Le,
    /// UTF-32 big-endian.
    Utf32Be,
    /// Any other charset known to `encoding_rs`.
    Other(&'static encoding_rs::Encoding),
}

impl Charset {
    /// Resolves a charset label (case-insensitive) to a charset.
    ///
    /// UTF-16 and UTF-32 labels are intercepted before the `encoding_rs`
    /// lookup. `encoding_rs` resolves those labels to encodings whose
    /// encoder emits UTF-8, which must never reach the wire.
    #[must_use]
    pub fn for_label(label: &str) -> Option<Self> {
        let normalized = label.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "us-ascii" | "ascii" => Some(Self::Ascii),
            "utf-8" | "utf8" => Some(Self::Utf8),
            "utf-16" | "utf-16le" | "unicode" => Some(Self::Utf16Le),
            "utf-16be" | "unicodefffe" => Some(Self::Utf16Be),
            "utf-32" | "utf-32le" => Some(Self::Utf32Le),
            "utf-32be" => Some(Self::Utf32Be),
            _ => match encoding_rs::Encoding::for_label(normalized.as_bytes()) {
                Some(encoding) if encoding == encoding_rs::UTF_8 => Some(Self::Utf8),
                Some(encoding) if encoding == encoding_rs::UTF_16LE => Some(Self::Utf16Le),
                Some(encoding) if encoding == encoding_rs::UTF_16BE => Some(Self::Utf16Be),
                Some(encoding) => Some(Self::Other(encoding)),
                None => None,
            },
        }
    }

    /// The name used for this charset in encoded words and MIME parameters.
    ///
    /// Big-endian UTF-16 reports `utf-16be`; the unsuffixed `utf-16` name
    /// belongs to the little-endian variant.
    #[must_use]
    pub fn mime_name(&self) -> &'static str {
        match self {
            Self::Ascii => "us-ascii",
            Self::Utf8 => "utf-8",
            Self::Utf16Le => "utf-16",
            Self::Utf16Be => "utf-16be",
            Self::Utf32Le => "utf-32",
            Self::Utf32Be => "utf-32be",
            Self::Other(encoding) => encoding.name(),
        }
    }

    /// Whether RFC 2047 payloads for this charset should use Base64.
    ///
    /// True exactly for the UTF-16 and UTF-32 variants.
    #[must_use]
    pub const fn prefers_base64(&self) -> bool {
        matches!(
            self,
            Self::Utf16Le | Self::Utf16Be | Self::Utf32Le | Self::Utf32Be
        )
    }

    /// Encodes a string into this charset's byte representation.
    ///
    /// ASCII encoding replaces characters outside the 7-bit range with `?`.
    #[must_use]
    pub fn encode(&self, value: &str) -> Vec<u8> {
        match self {
            Self::Ascii => value
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
            Self::Utf8 => value.as_bytes().to_vec(),
            Self::Utf16Le => value.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            Self::Utf16Be => value.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            Self::Utf32Le => value
                .chars()
                .flat_map(|c| u32::from(c).to_le_bytes())
                .collect(),
            Self::Utf32Be => value
                .chars()
                .flat_map(|c| u32::from(c).to_be_bytes())
                .collect(),
            Self::Other(encoding) => encoding.encode(value).0.into_owned(),
        }
    }

    /// Decodes bytes in this charset into a string.
    ///
    /// ASCII and legacy charsets substitute the replacement character for
    /// invalid input; the Unicode transformation formats are strict.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not valid for a strict charset.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self {
            Self::Ascii => Ok(bytes
                .iter()
                .map(|&b| if b.is_ascii() { b as char } else { '\u{FFFD}' })
                .collect()),
            Self::Utf8 => String::from_utf8(bytes.to_vec()).map_err(Into::into),
            Self::Utf16Le => decode_utf16_with(bytes, u16::from_le_bytes),
            Self::Utf16Be => decode_utf16_with(bytes, u16::from_be_bytes),
            Self::Utf32Le => decode_utf32_with(bytes, u32::from_le_bytes),
            Self::Utf32Be => decode_utf32_with(bytes, u32::from_be_bytes),
            Self::Other(encoding) => {
                let (decoded, _) = encoding.decode_without_bom_handling(bytes);
                Ok(decoded.into_owned())
            }
        }
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self::Utf8
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_name())
    }
}

fn decode_utf16_with(bytes: &[u8], from_bytes: fn([u8; 2]) -> u16) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(Error::CharsetDecode("Odd UTF-16 byte length".to_string()));
    }

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| from_bytes([pair[0], pair[1]]))
        .collect();

    String::from_utf16(&units)
        .map_err(|_| Error::CharsetDecode("Invalid UTF-16 sequence".to_string()))
}

fn decode_utf32_with(bytes: &[u8], from_bytes: fn([u8; 4]) -> u32) -> Result<String> {
    if bytes.len() % 4 != 0 {
        return Err(Error::CharsetDecode(
            "UTF-32 byte length not a multiple of 4".to_string(),
        ));
    }

    bytes
        .chunks_exact(4)
        .map(|quad| {
            let unit = from_bytes([quad[0], quad[1], quad[2], quad[3]]);
            char::from_u32(unit).ok_or_else(|| {
                Error::CharsetDecode(format!("Invalid UTF-32 code point {unit:#X}"))
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_for_label_basic() {
        assert_eq!(Charset::for_label("utf-8"), Some(Charset::Utf8));
        assert_eq!(Charset::for_label("UTF-8"), Some(Charset::Utf8));
        assert_eq!(Charset::for_label("us-ascii"), Some(Charset::Ascii));
        assert_eq!(Charset::for_label(" utf-16be "), Some(Charset::Utf16Be));
        assert_eq!(Charset::for_label("utf-32"), Some(Charset::Utf32Le));
        assert_eq!(Charset::for_label("no-such-charset"), None);
    }

    #[test]
    fn test_for_label_legacy() {
        let latin1 = Charset::for_label("iso-8859-1").unwrap();
        assert!(matches!(latin1, Charset::Other(_)));
        assert_eq!(latin1.mime_name(), "windows-1252");
    }

    #[test]
    fn test_mime_names() {
        assert_eq!(Charset::Utf8.mime_name(), "utf-8");
        assert_eq!(Charset::Utf16Le.mime_name(), "utf-16");
        assert_eq!(Charset::Utf16Be.mime_name(), "utf-16be");
        assert_eq!(Charset::Utf32Be.mime_name(), "utf-32be");
        assert_eq!(Charset::Ascii.mime_name(), "us-ascii");
    }

    #[test]
    fn test_prefers_base64() {
        assert!(!Charset::Ascii.prefers_base64());
        assert!(!Charset::Utf8.prefers_base64());
        assert!(Charset::Utf16Le.prefers_base64());
        assert!(Charset::Utf16Be.prefers_base64());
        assert!(Charset::Utf32Le.prefers_base64());
        assert!(Charset::Utf32Be.prefers_base64());
    }

    #[test]
    fn test_utf16_round_trip() {
        let text = "Héllo 🦀";
        for charset in [Charset::Utf16Le, Charset::Utf16Be] {
            let bytes = charset.encode(text);
            assert_eq!(charset.decode(&bytes).unwrap(), text);
        }
    }

    #[test]
    fn test_utf16_byte_order() {
        assert_eq!(Charset::Utf16Le.encode("A"), vec![0x41, 0x00]);
        assert_eq!(Charset::Utf16Be.encode("A"), vec![0x00, 0x41]);
    }

    #[test]
    fn test_utf32_round_trip() {
        let text = "Héllo 🦀";
        for charset in [Charset::Utf32Le, Charset::Utf32Be] {
            let bytes = charset.encode(text);
            assert_eq!(charset.decode(&bytes).unwrap(), text);
        }
    }

    #[test]
    fn test_ascii_lossy_encode() {
        assert_eq!(Charset::Ascii.encode("Héllo"), b"H?llo");
    }

    #[test]
    fn test_legacy_round_trip() {
        let latin1 = Charset::for_label("latin1").unwrap();
        let bytes = latin1.encode("café");
        assert_eq!(bytes, b"caf\xE9");
        assert_eq!(latin1.decode(&bytes).unwrap(), "café");
    }

    #[test]
    fn test_decode_errors() {
        assert!(Charset::Utf16Le.decode(&[0x41]).is_err());
        assert!(Charset::Utf32Le.decode(&[0xFF, 0xFF, 0xFF, 0xFF]).is_err());
        assert!(Charset::Utf8.decode(&[0xC3]).is_err());
    }

    #[test]
    fn test_default_is_utf8() {
        assert_eq!(Charset::default(), Charset::Utf8);
    }
}
