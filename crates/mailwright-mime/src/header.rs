//! MIME header handling.

use std::fmt;

use crate::encoded_word::{decode_header_value, encode_header_value};
use crate::error::Result;

/// Collection of email headers.
///
/// Entries keep insertion order and allow repeated names, so rendering
/// the same collection twice produces identical output. Lookups are
/// case-insensitive; names are stored as provided.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value, keeping any existing values for the name.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Sets a header value, replacing any existing values.
    ///
    /// The new value takes the position of the first existing entry for
    /// the name; further entries are dropped. A new name appends.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        let mut replaced = false;
        self.entries.retain_mut(|(existing, slot)| {
            if existing.eq_ignore_ascii_case(&name) {
                if replaced {
                    return false;
                }
                *slot = value.clone();
                replaced = true;
            }
            true
        });
        if !replaced {
            self.entries.push((name, value));
        }
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Gets all values for a header in insertion order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// Removes all values for a header.
    pub fn remove(&mut self, name: &str) {
        self.entries
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
    }

    /// Returns an iterator over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of header entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encodes a header value as a UTF-8 encoded word if needed.
    ///
    /// ASCII values are returned unchanged.
    #[must_use]
    pub fn encode_value(value: &str) -> String {
        encode_header_value(value, None, false)
    }

    /// Decodes a header value from an RFC 2047 encoded word if it is one.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding fails.
    pub fn decode_value(value: &str) -> Result<String> {
        decode_header_value(value)
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            // Capitalize header name (e.g., "content-type" -> "Content-Type")
            let capitalized = name
                .split('-')
                .map(|part| {
                    let mut chars = part.chars();
                    chars.next().map_or_else(String::new, |first| {
                        first.to_uppercase().collect::<String>() + chars.as_str()
                    })
                })
                .collect::<Vec<_>>()
                .join("-");

            writeln!(f, "{capitalized}: {value}")?;
        }

        Ok(())
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
    use super::*;

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
        assert_eq!(headers.len(), 0);
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain")); // Case insensitive
    }

    #[test]
    fn test_headers_set_keeps_first_position() {
        let mut headers = Headers::new();
        headers.add("X-First", "1");
        headers.add("To", "alice@example.com");
        headers.add("To", "bob@example.com");
        headers.add("X-Last", "9");

        headers.set("To", "charlie@example.com");
        assert_eq!(headers.get_all("To"), vec!["charlie@example.com"]);

        let order: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(order, vec!["X-First", "To", "X-Last"]);
    }

    #[test]
    fn test_headers_remove() {
        let mut headers = Headers::new();
        headers.add("Subject", "Test");
        assert!(headers.get("Subject").is_some());

        headers.remove("subject");
        assert!(headers.get("Subject").is_none());
    }

    #[test]
    fn test_headers_get_all_insertion_order() {
        let mut headers = Headers::new();
        headers.add("Received", "from a");
        headers.add("X-Other", "x");
        headers.add("Received", "from b");

        assert_eq!(headers.get_all("Received"), vec!["from a", "from b"]);
    }

    #[test]
    fn test_headers_display_in_insertion_order() {
        let mut headers = Headers::new();
        headers.add("to", "recipient@example.com");
        headers.add("from", "sender@example.com");

        let s = headers.to_string();
        assert_eq!(
            s,
            "To: recipient@example.com\nFrom: sender@example.com\n"
        );
    }

    #[test]
    fn test_headers_iter() {
        let mut headers = Headers::new();
        headers.add("From", "sender@example.com");
        headers.add("To", "recipient@example.com");

        let mut count = 0;
        for (name, value) in headers.iter() {
            assert!(!name.is_empty());
            assert!(!value.is_empty());
            count += 1;
        }
        assert_eq!(count, 2);
    }

    #[test]
    fn test_headers_encode_value() {
        assert_eq!(Headers::encode_value("plain"), "plain");
        assert_eq!(Headers::encode_value("café"), "=?utf-8?Q?caf=C3=A9?=");
    }

    #[test]
    fn test_headers_decode_value() {
        assert_eq!(
            Headers::decode_value("=?utf-8?Q?caf=C3=A9?=").unwrap(),
            "café"
        );
        assert_eq!(Headers::decode_value("plain").unwrap(), "plain");
    }
}
