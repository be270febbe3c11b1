//! RFC 2047 encoded-word codec for header values.
//!
//! Encoded words carry non-ASCII header text as `=?charset?B|Q?payload?=`.
//! A value that does not split into exactly five `?`-separated segments
//! with `=` sentinels at both ends is not an encoded word; what happens to
//! it is governed by the [`DecodePolicy`].

use crate::charset::Charset;
use crate::encoding::{decode_base64, decode_q, encode_base64, encode_q};
use crate::error::{Error, Result};

/// Policy for values that fail the encoded-word shape check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecodePolicy {
    /// Malformed candidates pass through unchanged.
    #[default]
    Lenient,
    /// Malformed candidates are an error.
    Strict,
}

/// Whether encoded-word payloads for `charset` should use Base64.
///
/// True exactly for the UTF-16 and UTF-32 variants.
#[must_use]
pub const fn should_use_base64(charset: Charset) -> bool {
    charset.prefers_base64()
}

/// Encodes a header value as an RFC 2047 encoded word when needed.
///
/// A pure-ASCII value with no explicit charset is returned unchanged.
/// Otherwise the value is converted to `charset` bytes (UTF-8 when `None`)
/// and wrapped as `=?charset?B|Q?payload?=`. Base64 is used when the
/// caller requests it or [`should_use_base64`] holds for the charset; the
/// Q encoding is used otherwise.
#[must_use]
pub fn encode_header_value(value: &str, charset: Option<Charset>, use_base64: bool) -> String {
    if charset.is_none() && value.is_ascii() {
        return value.to_string();
    }

    let charset = charset.unwrap_or_default();
    let bytes = charset.encode(value);
    let name = charset.mime_name();

    if use_base64 || charset.prefers_base64() {
        format!("=?{name}?B?{}?=", encode_base64(&bytes))
    } else {
        format!("=?{name}?Q?{}?=", encode_q(&bytes))
    }
}

/// Decodes an RFC 2047 encoded word with the lenient policy.
///
/// # Errors
///
/// Returns an error if the charset label is unknown or the payload fails
/// to decode.
pub fn decode_header_value(value: &str) -> Result<String> {
    decode_header_value_with(value, DecodePolicy::Lenient)
}

/// Decodes an RFC 2047 encoded word under an explicit policy.
///
/// The value must split on `?` into exactly five segments with `=` as the
/// first and the last. Anything else is not an encoded word: it passes
/// through unchanged under [`DecodePolicy::Lenient`] and errors under
/// [`DecodePolicy::Strict`]. Segment 1 names the charset; segment 2
/// selects Base64 when it is `B` or `b` and the Q encoding otherwise;
/// segment 3 is the payload.
///
/// # Errors
///
/// Returns [`Error::MalformedEncodedWord`] for malformed candidates under
/// the strict policy, [`Error::UnknownCharset`] when the label does not
/// resolve, and a decode error when the payload is invalid. Payload and
/// charset failures error under both policies.
pub fn decode_header_value_with(value: &str, policy: DecodePolicy) -> Result<String> {
    let segments: Vec<&str> = value.split('?').collect();

    if segments.len() != 5 || segments[0] != "=" || segments[4] != "=" {
        return match policy {
            DecodePolicy::Lenient => Ok(value.to_string()),
            DecodePolicy::Strict => Err(Error::MalformedEncodedWord(value.to_string())),
        };
    }

    let charset = Charset::for_label(segments[1])
        .ok_or_else(|| Error::UnknownCharset(segments[1].to_string()))?;

    let bytes = if segments[2].eq_ignore_ascii_case("b") {
        decode_base64(segments[3])?
    } else {
        decode_q(segments[3])?
    };

    charset.decode(&bytes)
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
    fn test_ascii_fast_path() {
        assert_eq!(
            encode_header_value("Plain Subject", None, false),
            "Plain Subject"
        );
        assert_eq!(
            encode_header_value("Plain Subject", None, true),
            "Plain Subject"
        );
    }

    #[test]
    fn test_explicit_charset_forces_encoding() {
        let encoded = encode_header_value("Plain", Some(Charset::Utf8), false);
        assert_eq!(encoded, "=?utf-8?Q?Plain?=");
    }

    #[test]
    fn test_encode_utf8_q() {
        let encoded = encode_header_value("Héllo", None, false);
        assert_eq!(encoded, "=?utf-8?Q?H=C3=A9llo?=");
        assert_eq!(decode_header_value(&encoded).unwrap(), "Héllo");
    }

    #[test]
    fn test_encode_utf8_b() {
        let encoded = encode_header_value("Héllo", None, true);
        assert_eq!(encoded, "=?utf-8?B?SMOpbGxv?=");
        assert_eq!(decode_header_value(&encoded).unwrap(), "Héllo");
    }

    #[test]
    fn test_utf16be_uses_base64_and_suffixed_name() {
        let encoded = encode_header_value("Hi", Some(Charset::Utf16Be), false);
        assert_eq!(encoded, "=?utf-16be?B?AEgAaQ==?=");
        assert_eq!(decode_header_value(&encoded).unwrap(), "Hi");
    }

    #[test]
    fn test_space_becomes_underscore() {
        let encoded = encode_header_value("Héllo there", None, false);
        assert_eq!(encoded, "=?utf-8?Q?H=C3=A9llo_there?=");
        assert_eq!(decode_header_value(&encoded).unwrap(), "Héllo there");
    }

    #[test]
    fn test_lenient_passthrough() {
        for value in ["Hello", "=?incomplete", "erm? what?", "=?a?B?x?=trail", ""] {
            assert_eq!(decode_header_value(value).unwrap(), value);
        }
    }

    #[test]
    fn test_strict_policy_rejects_malformed() {
        let err = decode_header_value_with("not encoded", DecodePolicy::Strict).unwrap_err();
        assert!(matches!(err, Error::MalformedEncodedWord(_)));

        assert_eq!(
            decode_header_value_with("=?utf-8?B?SGk=?=", DecodePolicy::Strict).unwrap(),
            "Hi"
        );
    }

    #[test]
    fn test_unknown_charset_errors() {
        let err = decode_header_value("=?martian?B?SGk=?=").unwrap_err();
        assert!(matches!(err, Error::UnknownCharset(_)));
    }

    #[test]
    fn test_bad_payload_errors_in_both_policies() {
        assert!(decode_header_value("=?utf-8?B?!!!?=").is_err());
        assert!(decode_header_value("=?utf-8?Q?=ZZ?=").is_err());
    }

    #[test]
    fn test_non_b_segment_takes_q_path() {
        assert_eq!(
            decode_header_value("=?utf-8?Q?caf=C3=A9?=").unwrap(),
            "café"
        );
        // Any marker other than B falls through to the Q decoder
        assert_eq!(decode_header_value("=?utf-8?X?plain?=").unwrap(), "plain");
    }

    #[test]
    fn test_should_use_base64() {
        assert!(should_use_base64(Charset::Utf16Le));
        assert!(should_use_base64(Charset::Utf16Be));
        assert!(should_use_base64(Charset::Utf32Le));
        assert!(should_use_base64(Charset::Utf32Be));
        assert!(!should_use_base64(Charset::Utf8));
        assert!(!should_use_base64(Charset::Ascii));
    }

    #[test]
    fn test_legacy_charset_decode() {
        assert_eq!(
            decode_header_value("=?iso-8859-1?Q?caf=E9?=").unwrap(),
            "café"
        );
    }

    proptest! {
        #[test]
        fn prop_ascii_identity(value in "[ -~]*") {
            prop_assert_eq!(encode_header_value(&value, None, false), value.clone());
        }

        #[test]
        fn prop_round_trip_utf8_q(value in any::<String>()) {
            let encoded = encode_header_value(&value, Some(Charset::Utf8), false);
            prop_assert_eq!(decode_header_value(&encoded).unwrap(), value);
        }

        #[test]
        fn prop_round_trip_utf8_b(value in any::<String>()) {
            let encoded = encode_header_value(&value, Some(Charset::Utf8), true);
            prop_assert_eq!(decode_header_value(&encoded).unwrap(), value);
        }

        #[test]
        fn prop_round_trip_utf16be(value in any::<String>()) {
            let encoded = encode_header_value(&value, Some(Charset::Utf16Be), false);
            prop_assert_eq!(decode_header_value(&encoded).unwrap(), value);
        }
    }
}
