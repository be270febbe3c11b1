//! Error types for MIME operations.

use std::string::FromUtf8Error;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid content type.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// Invalid content disposition.
    #[error("Invalid content disposition: {0}")]
    InvalidDisposition(String),

    /// Invalid encoding.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// UTF-8 decode error.
    #[error("UTF-8 decode error: {0}")]
    Utf8Decode(#[from] FromUtf8Error),

    /// Header value is not a well-formed RFC 2047 encoded word.
    #[error("Malformed encoded word: {0}")]
    MalformedEncodedWord(String),

    /// Charset label could not be resolved.
    #[error("Unknown charset: {0}")]
    UnknownCharset(String),

    /// Byte sequence is invalid for the charset.
    #[error("Charset decode error: {0}")]
    CharsetDecode(String),

    /// Byte outside the 7-bit range in 7bit content.
    #[error("Non-ASCII byte 0x{0:02X} in 7bit content")]
    NonAsciiBody(u8),
}
