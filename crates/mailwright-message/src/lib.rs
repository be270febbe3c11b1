//! # mailwright-message
//!
//! Async MIME message composition: mail addresses, multipart part trees,
//! and streaming wire output.
//!
//! ## Features
//!
//! - **Mail addresses**: RFC 2822 parsing with display names, quoted
//!   local parts, and RFC 2047 display-name encoding
//! - **Part trees**: single parts and nested multipart containers with
//!   per-part transfer encodings
//! - **Streaming writer**: folded headers and encoded bodies written
//!   through a buffered [`tokio::io::AsyncWrite`] without assembling the
//!   whole message in memory
//! - **Unique boundaries**: process-wide counter plus a random suffix
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailwright_message::{MailAddress, Message, MultiPart, SinglePart};
//!
//! #[tokio::main]
//! async fn main() -> mailwright_message::Result<()> {
//!     let body = MultiPart::alternative()
//!         .with_part(SinglePart::text("Hello, World!"))
//!         .with_part(SinglePart::html("<p>Hello, World!</p>"));
//!
//!     let message = Message::new(MailAddress::parse("sender@example.com")?, body)
//!         .to(MailAddress::parse("Jane Doe <jane@example.com>")?)
//!         .subject("Greetings");
//!
//!     let stream = tokio::net::TcpStream::connect("mail.example.com:25").await?;
//!     message.write_to(stream).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`address`]: mail address parsing and rendering
//! - [`part`]: message body part trees
//! - [`writer`]: streaming message writer

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod address;
mod boundary;
mod error;
mod message;
pub mod part;
pub mod writer;

pub use address::MailAddress;
pub use boundary::{BoundaryGenerator, next_boundary};
pub use error::{Error, Result};
pub use message::Message;
pub use part::{MultiPart, MultipartKind, Part, SinglePart};
pub use writer::{ContentStream, MailWriter};

pub use mailwright_mime::{ContentDisposition, ContentType, DispositionType, TransferEncoding};
