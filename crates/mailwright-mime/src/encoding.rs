//! Content transfer encodings and their codecs.
//!
//! Supports Base64 and Quoted-Printable in one-shot and streaming form,
//! plus the RFC 2047 Q variant used inside encoded words. The streaming
//! encoders carry line state across chunks so the mail writer can feed
//! them arbitrarily sized slices.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};

/// Maximum encoded line length for Quoted-Printable and Base64 bodies.
const MAX_LINE_LENGTH: usize = 76;

/// Data columns per line; the soft-break `=` occupies the last column.
const SOFT_LINE_LIMIT: usize = MAX_LINE_LENGTH - 1;

/// Raw bytes per Base64 output line (57 bytes encode to 76 characters).
const BASE64_LINE_INPUT: usize = 57;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    #[default]
    SevenBit,
    /// 8-bit text.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses a transfer encoding name.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit, // Default (includes "7bit")
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// Line breaks in the input are escaped, so the output is binary-safe;
/// soft breaks keep every encoded line within 76 characters.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut encoder = QuotedPrintableEncoder::new();
    let mut out = Vec::with_capacity(text.len());
    encoder.encode(text.as_bytes(), &mut out);
    encoder.finish(&mut out);
    // The encoder only ever emits ASCII.
    String::from_utf8_lossy(&out).into_owned()
}

/// Decodes Quoted-Printable text (RFC 2045) to raw bytes.
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable_bytes(text: &str) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(text.len());
    let mut bytes = text.bytes().peekable();

    while let Some(byte) = bytes.next() {
        if byte != b'=' {
            result.push(byte);
            continue;
        }

        // Soft line break
        if bytes.peek() == Some(&b'\r') {
            bytes.next();
            if bytes.peek() == Some(&b'\n') {
                bytes.next();
                continue;
            }
            return Err(Error::InvalidEncoding(
                "Bare carriage return after soft break".to_string(),
            ));
        }
        if bytes.peek() == Some(&b'\n') {
            bytes.next();
            continue;
        }

        // Hex encoded byte
        let (Some(hi), Some(lo)) = (bytes.next(), bytes.next()) else {
            return Err(Error::InvalidEncoding(
                "Incomplete escape sequence".to_string(),
            ));
        };
        let decoded = hex_value(hi)
            .zip(hex_value(lo))
            .map(|(hi, lo)| (hi << 4) | lo)
            .ok_or_else(|| {
                Error::InvalidEncoding(format!(
                    "Invalid hex escape ={}{}",
                    char::from(hi),
                    char::from(lo)
                ))
            })?;
        result.push(decoded);
    }

    Ok(result)
}

/// Decodes Quoted-Printable text (RFC 2045).
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences or the
/// decoded bytes are not UTF-8.
pub fn decode_quoted_printable(text: &str) -> Result<String> {
    String::from_utf8(decode_quoted_printable_bytes(text)?).map_err(Into::into)
}

/// Encodes bytes with the RFC 2047 Q encoding for header payloads.
///
/// Spaces become `_`; everything outside a conservative safe set becomes
/// `=XX`. The output never contains line breaks.
#[must_use]
pub fn encode_q(data: &[u8]) -> String {
    let mut out = Vec::with_capacity(data.len());
    for &byte in data {
        match byte {
            b' ' => out.push(b'_'),
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'!' | b'*' | b'+' | b'-' | b'/' => {
                out.push(byte);
            }
            _ => {
                out.push(b'=');
                out.push(HEX_DIGITS[usize::from(byte >> 4)]);
                out.push(HEX_DIGITS[usize::from(byte & 0x0F)]);
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Decodes an RFC 2047 Q payload to raw bytes.
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_q(text: &str) -> Result<Vec<u8>> {
    decode_quoted_printable_bytes(&text.replace('_', " "))
}

fn hex_value(byte: u8) -> Option<u8> {
    char::from(byte).to_digit(16).and_then(|v| u8::try_from(v).ok())
}

const fn is_qp_literal(byte: u8) -> bool {
    matches!(byte, b'!'..=b'<' | b'>'..=b'~')
}

/// Streaming Quoted-Printable encoder.
///
/// Carries line length and deferred-space state across chunks. A literal
/// space is never left at the end of an encoded line; decoders delete
/// trailing whitespace, so one there would be lost.
#[derive(Debug, Default)]
pub struct QuotedPrintableEncoder {
    line_len: usize,
    pending_space: bool,
}

impl QuotedPrintableEncoder {
    /// Creates an encoder positioned at the start of a line.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes a chunk into `out`, carrying state across calls.
    pub fn encode(&mut self, input: &[u8], out: &mut Vec<u8>) {
        for &byte in input {
            if byte == b' ' {
                if self.pending_space {
                    self.flush_space(1, out);
                }
                self.pending_space = true;
                continue;
            }

            let width = if is_qp_literal(byte) { 1 } else { 3 };
            if self.pending_space {
                self.flush_space(width, out);
            } else if self.line_len + width > SOFT_LINE_LIMIT {
                self.soft_break(out);
            }
            self.push_token(byte, width, out);
        }
    }

    /// Flushes any deferred trailing space as `=20`.
    pub fn finish(&mut self, out: &mut Vec<u8>) {
        if self.pending_space {
            self.pending_space = false;
            if self.line_len + 3 > SOFT_LINE_LIMIT {
                self.soft_break(out);
            }
            out.extend_from_slice(b"=20");
            self.line_len += 3;
        }
    }

    // The space and the token following it must land on the same line.
    fn flush_space(&mut self, next_width: usize, out: &mut Vec<u8>) {
        self.pending_space = false;
        if self.line_len + 1 + next_width > SOFT_LINE_LIMIT {
            self.soft_break(out);
        }
        out.push(b' ');
        self.line_len += 1;
    }

    fn soft_break(&mut self, out: &mut Vec<u8>) {
        out.extend_from_slice(b"=\r\n");
        self.line_len = 0;
    }

    fn push_token(&mut self, byte: u8, width: usize, out: &mut Vec<u8>) {
        if width == 1 {
            out.push(byte);
        } else {
            out.push(b'=');
            out.push(HEX_DIGITS[usize::from(byte >> 4)]);
            out.push(HEX_DIGITS[usize::from(byte & 0x0F)]);
        }
        self.line_len += width;
    }
}

/// Streaming Base64 encoder emitting 76-character lines.
#[derive(Debug, Default)]
pub struct Base64Encoder {
    pending: Vec<u8>,
}

impl Base64Encoder {
    /// Creates an encoder with no buffered input.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes a chunk into `out`, buffering partial lines.
    pub fn encode(&mut self, input: &[u8], out: &mut Vec<u8>) {
        self.pending.extend_from_slice(input);
        while self.pending.len() >= BASE64_LINE_INPUT {
            let line: Vec<u8> = self.pending.drain(..BASE64_LINE_INPUT).collect();
            out.extend_from_slice(STANDARD.encode(&line).as_bytes());
            out.extend_from_slice(b"\r\n");
        }
    }

    /// Encodes and pads any buffered remainder.
    pub fn finish(&mut self, out: &mut Vec<u8>) {
        if !self.pending.is_empty() {
            let rest: Vec<u8> = self.pending.drain(..).collect();
            out.extend_from_slice(STANDARD.encode(&rest).as_bytes());
            out.extend_from_slice(b"\r\n");
        }
    }
}

/// Streaming encoder for a content transfer encoding.
#[derive(Debug)]
pub enum ContentEncoder {
    /// Pass-through that rejects bytes outside the 7-bit range.
    SevenBit,
    /// Unvalidated pass-through (8bit and binary).
    PassThrough,
    /// Quoted-Printable with soft line breaks.
    QuotedPrintable(QuotedPrintableEncoder),
    /// Base64 with 76-column lines.
    Base64(Base64Encoder),
}

impl ContentEncoder {
    /// Selects the encoder for a transfer encoding.
    #[must_use]
    pub fn for_encoding(encoding: TransferEncoding) -> Self {
        match encoding {
            TransferEncoding::SevenBit => Self::SevenBit,
            TransferEncoding::EightBit | TransferEncoding::Binary => Self::PassThrough,
            TransferEncoding::QuotedPrintable => {
                Self::QuotedPrintable(QuotedPrintableEncoder::new())
            }
            TransferEncoding::Base64 => Self::Base64(Base64Encoder::new()),
        }
    }

    /// Encodes a chunk into `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if 7bit content contains a byte outside the 7-bit
    /// range.
    pub fn encode(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        match self {
            Self::SevenBit => {
                if let Some(&byte) = input.iter().find(|b| !b.is_ascii()) {
                    return Err(Error::NonAsciiBody(byte));
                }
                out.extend_from_slice(input);
                Ok(())
            }
            Self::PassThrough => {
                out.extend_from_slice(input);
                Ok(())
            }
            Self::QuotedPrintable(encoder) => {
                encoder.encode(input, out);
                Ok(())
            }
            Self::Base64(encoder) => {
                encoder.encode(input, out);
                Ok(())
            }
        }
    }

    /// Finalizes the encoded stream (Base64 padding, deferred spaces).
    pub fn finish(&mut self, out: &mut Vec<u8>) {
        match self {
            Self::SevenBit | Self::PassThrough => {}
            Self::QuotedPrintable(encoder) => encoder.finish(out),
            Self::Base64(encoder) => encoder.finish(out),
        }
    }
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
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_transfer_encoding_parse() {
        assert_eq!(TransferEncoding::parse("7bit"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::parse("8BIT"), TransferEncoding::EightBit);
        assert_eq!(TransferEncoding::parse("base64"), TransferEncoding::Base64);
        assert_eq!(
            TransferEncoding::parse("quoted-printable"),
            TransferEncoding::QuotedPrintable
        );
        assert_eq!(
            TransferEncoding::parse("bogus"),
            TransferEncoding::SevenBit
        );
    }

    #[test]
    fn test_transfer_encoding_display() {
        assert_eq!(TransferEncoding::SevenBit.to_string(), "7bit");
        assert_eq!(
            TransferEncoding::QuotedPrintable.to_string(),
            "quoted-printable"
        );
        assert_eq!(TransferEncoding::Base64.to_string(), "base64");
    }

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_quoted_printable_encode() {
        let text = "Hello, World!";
        let encoded = encode_quoted_printable(text);
        assert_eq!(encoded, "Hello, World!");

        let text = "Héllo, Wørld!";
        let encoded = encode_quoted_printable(text);
        assert!(encoded.contains("=C3"));
    }

    #[test]
    fn test_quoted_printable_decode() {
        let encoded = "Hello, World!";
        let decoded = decode_quoted_printable(encoded).unwrap();
        assert_eq!(decoded, "Hello, World!");

        let encoded = "H=C3=A9llo";
        let decoded = decode_quoted_printable(encoded).unwrap();
        assert_eq!(decoded, "Héllo");
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        let encoded = "Hello=\r\nWorld";
        let decoded = decode_quoted_printable(encoded).unwrap();
        assert_eq!(decoded, "HelloWorld");
    }

    #[test]
    fn test_quoted_printable_incomplete_escape() {
        assert!(decode_quoted_printable("abc=4").is_err());
        assert!(decode_quoted_printable("abc=ZZ").is_err());
    }

    #[test]
    fn test_quoted_printable_trailing_space() {
        assert_eq!(encode_quoted_printable("word "), "word=20");
        assert_eq!(decode_quoted_printable("word=20").unwrap(), "word ");
    }

    #[test]
    fn test_quoted_printable_no_space_at_line_end() {
        let text = format!("{} b", "a".repeat(74));
        let encoded = encode_quoted_printable(&text);

        for line in encoded.split("\r\n") {
            assert!(!line.ends_with(' '), "line ends with space: {line:?}");
            assert!(line.len() <= MAX_LINE_LENGTH);
        }
        assert_eq!(decode_quoted_printable(&encoded).unwrap(), text);
    }

    #[test]
    fn test_quoted_printable_line_limit() {
        let text = "x".repeat(200);
        let encoded = encode_quoted_printable(&text);

        for line in encoded.split("\r\n") {
            assert!(line.len() <= MAX_LINE_LENGTH);
        }
        assert_eq!(decode_quoted_printable(&encoded).unwrap(), text);
    }

    #[test]
    fn test_q_encode_decode() {
        let encoded = encode_q("Héllo there".as_bytes());
        assert_eq!(encoded, "H=C3=A9llo_there");
        assert_eq!(decode_q(&encoded).unwrap(), "Héllo there".as_bytes());
    }

    #[test]
    fn test_q_encode_specials() {
        assert_eq!(encode_q(b"a=b?c_d"), "a=3Db=3Fc=5Fd");
        assert_eq!(decode_q("a=3Db=3Fc=5Fd").unwrap(), b"a=b?c_d");
    }

    #[test]
    fn test_base64_encoder_line_wrap() {
        let data = vec![0u8; 57];
        let mut encoder = Base64Encoder::new();
        let mut out = Vec::new();
        encoder.encode(&data, &mut out);
        encoder.finish(&mut out);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, format!("{}\r\n", "A".repeat(76)));
    }

    #[test]
    fn test_base64_encoder_carry_across_chunks() {
        let data: Vec<u8> = (0u8..=119).collect();

        let mut whole = Vec::new();
        let mut encoder = Base64Encoder::new();
        encoder.encode(&data, &mut whole);
        encoder.finish(&mut whole);

        let mut chunked = Vec::new();
        let mut encoder = Base64Encoder::new();
        for chunk in data.chunks(7) {
            encoder.encode(chunk, &mut chunked);
        }
        encoder.finish(&mut chunked);

        assert_eq!(whole, chunked);

        let joined: String = String::from_utf8(whole)
            .unwrap()
            .split("\r\n")
            .collect();
        assert_eq!(joined, encode_base64(&data));
    }

    #[test]
    fn test_content_encoder_seven_bit() {
        let mut encoder = ContentEncoder::for_encoding(TransferEncoding::SevenBit);
        let mut out = Vec::new();
        encoder.encode(b"plain ascii\r\n", &mut out).unwrap();
        assert_eq!(out, b"plain ascii\r\n");

        let err = encoder.encode("héllo".as_bytes(), &mut out).unwrap_err();
        assert!(matches!(err, Error::NonAsciiBody(0xC3)));
    }

    #[test]
    fn test_content_encoder_pass_through() {
        let mut encoder = ContentEncoder::for_encoding(TransferEncoding::EightBit);
        let mut out = Vec::new();
        encoder.encode(&[0x00, 0x80, 0xFF], &mut out).unwrap();
        encoder.finish(&mut out);
        assert_eq!(out, vec![0x00, 0x80, 0xFF]);
    }

    proptest! {
        #[test]
        fn prop_quoted_printable_round_trip(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let mut encoder = QuotedPrintableEncoder::new();
            let mut encoded = Vec::new();
            encoder.encode(&data, &mut encoded);
            encoder.finish(&mut encoded);

            let text = String::from_utf8(encoded).unwrap();
            prop_assert_eq!(decode_quoted_printable_bytes(&text).unwrap(), data);
        }

        #[test]
        fn prop_quoted_printable_chunking_invariant(
            data in proptest::collection::vec(any::<u8>(), 0..256),
            split in 0usize..256,
        ) {
            let at = split.min(data.len());

            let mut whole = Vec::new();
            let mut encoder = QuotedPrintableEncoder::new();
            encoder.encode(&data, &mut whole);
            encoder.finish(&mut whole);

            let mut chunked = Vec::new();
            let mut encoder = QuotedPrintableEncoder::new();
            encoder.encode(&data[..at], &mut chunked);
            encoder.encode(&data[at..], &mut chunked);
            encoder.finish(&mut chunked);

            prop_assert_eq!(whole, chunked);
        }

        #[test]
        fn prop_base64_stream_matches_one_shot(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let mut encoder = Base64Encoder::new();
            let mut encoded = Vec::new();
            encoder.encode(&data, &mut encoded);
            encoder.finish(&mut encoded);

            let joined: String = String::from_utf8(encoded).unwrap().split("\r\n").collect();
            prop_assert_eq!(joined, encode_base64(&data));
        }

        #[test]
        fn prop_q_round_trip(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let encoded = encode_q(&data);
            prop_assert_eq!(decode_q(&encoded).unwrap(), data);
        }
    }
}
