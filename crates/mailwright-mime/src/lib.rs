//! # mailwright-mime
//!
//! MIME primitives for mail composition.
//!
//! ## Features
//!
//! - **Encoded words**: RFC 2047 header encoding and decoding with a
//!   configurable leniency policy
//! - **Charsets**: ASCII, UTF-8, UTF-16/32 variants, and legacy charsets
//! - **Transfer encodings**: Base64 and Quoted-Printable, both one-shot
//!   and streaming with line-length management
//! - **Content types**: MIME content types with ordered parameters
//! - **Dispositions**: inline and attachment with encoded filenames
//!
//! ## Quick Start
//!
//! ### Header Encoding
//!
//! ```ignore
//! use mailwright_mime::encoded_word::{decode_header_value, encode_header_value};
//!
//! let encoded = encode_header_value("Héllo", None, false);
//! assert_eq!(encoded, "=?utf-8?Q?H=C3=A9llo?=");
//!
//! // Values that are not encoded words pass through unchanged
//! assert_eq!(decode_header_value("plain subject")?, "plain subject");
//! ```
//!
//! ### Content Encoding
//!
//! ```ignore
//! use mailwright_mime::TransferEncoding;
//! use mailwright_mime::encoding::ContentEncoder;
//!
//! let mut encoder = ContentEncoder::for_encoding(TransferEncoding::Base64);
//! let mut wire = Vec::new();
//! encoder.encode(b"Hello, World!", &mut wire)?;
//! encoder.finish(&mut wire);
//! ```
//!
//! ### Content Types
//!
//! ```ignore
//! use mailwright_mime::ContentType;
//!
//! let ct = ContentType::multipart_mixed("boundary_0_abc123");
//! assert_eq!(ct.to_string(), "multipart/mixed; boundary=boundary_0_abc123");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod charset;
mod content_type;
mod disposition;
mod error;
mod header;

pub mod encoded_word;
pub mod encoding;

pub use charset::Charset;
pub use content_type::ContentType;
pub use disposition::{ContentDisposition, DispositionType};
pub use encoded_word::DecodePolicy;
pub use encoding::TransferEncoding;
pub use error::{Error, Result};
pub use header::Headers;
