//! Error types for message composition.

use thiserror::Error;

/// Errors that can occur while composing or writing a message.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error on the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A MIME primitive rejected its input.
    #[error("MIME error: {0}")]
    Mime(#[from] mailwright_mime::Error),

    /// A mail address string could not be parsed.
    #[error("Invalid mail address: {0}")]
    InvalidAddress(String),

    /// Invalid state for the requested operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The message has no To, Cc, or Bcc recipients.
    #[error("Message has no recipients")]
    NoRecipients,
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
