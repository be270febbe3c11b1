//! MIME content disposition handling.

use std::fmt;

use crate::charset::Charset;
use crate::encoded_word::{decode_header_value, encode_header_value};
use crate::error::{Error, Result};

/// How a part should be presented to the recipient.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DispositionType {
    /// Displayed inline with the message body.
    #[default]
    Inline,
    /// Offered as a downloadable file.
    Attachment,
}

impl DispositionType {
    /// Parses a disposition type token.
    ///
    /// # Errors
    ///
    /// Returns an error for tokens other than `inline` and `attachment`.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "inline" => Ok(Self::Inline),
            "attachment" => Ok(Self::Attachment),
            other => Err(Error::InvalidDisposition(other.to_string())),
        }
    }
}

impl fmt::Display for DispositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inline => write!(f, "inline"),
            Self::Attachment => write!(f, "attachment"),
        }
    }
}

/// MIME content disposition with parameters.
///
/// Parameters keep insertion order, matching [`crate::ContentType`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentDisposition {
    /// The disposition type.
    pub disposition: DispositionType,
    /// Parameters in insertion order (e.g., filename=report.pdf).
    pub parameters: Vec<(String, String)>,
}

impl ContentDisposition {
    /// Creates an inline disposition.
    #[must_use]
    pub fn inline() -> Self {
        Self {
            disposition: DispositionType::Inline,
            parameters: Vec::new(),
        }
    }

    /// Creates an attachment disposition.
    #[must_use]
    pub fn attachment() -> Self {
        Self {
            disposition: DispositionType::Attachment,
            parameters: Vec::new(),
        }
    }

    /// Adds a parameter, replacing an existing one with the same name.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_parameter(key, value);
        self
    }

    /// Sets a parameter, replacing an existing one with the same name.
    pub fn set_parameter(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(existing) = self
            .parameters
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(&key))
        {
            existing.1 = value;
        } else {
            self.parameters.push((key, value));
        }
    }

    /// Sets the filename parameter.
    ///
    /// A non-ASCII filename is stored as a UTF-8 encoded word so the
    /// rendered header stays 7-bit clean.
    #[must_use]
    pub fn with_filename(self, filename: &str) -> Self {
        let value = if filename.is_ascii() {
            filename.to_string()
        } else {
            encode_header_value(filename, Some(Charset::Utf8), false)
        };
        self.with_parameter("filename", value)
    }

    /// Sets the size parameter.
    #[must_use]
    pub fn with_size(self, size: u64) -> Self {
        self.with_parameter("size", size.to_string())
    }

    /// Returns a parameter value by case-insensitive name.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the filename, decoding an encoded-word value back to text.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored encoded word fails to decode.
    pub fn filename(&self) -> Result<Option<String>> {
        self.parameter("filename")
            .map(decode_header_value)
            .transpose()
    }

    /// Parses a content disposition string.
    ///
    /// Format: `inline|attachment; param1=value1; param2=value2`
    ///
    /// # Errors
    ///
    /// Returns an error if the disposition type is unknown.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split(';');

        let disposition = DispositionType::parse(
            parts
                .next()
                .ok_or_else(|| Error::InvalidDisposition("Empty disposition".to_string()))?,
        )?;

        let mut content_disposition = Self {
            disposition,
            parameters: Vec::new(),
        };

        for param in parts {
            let param = param.trim();
            if let Some((key, value)) = param.split_once('=') {
                let key = key.trim().to_lowercase();
                let value = value.trim().trim_matches('"').to_string();
                content_disposition.set_parameter(key, value);
            }
        }

        Ok(content_disposition)
    }
}

impl fmt::Display for ContentDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.disposition)?;

        for (key, value) in &self.parameters {
            if value.is_empty()
                || value.contains(|c: char| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c))
            {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "; {key}=\"{escaped}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
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
    fn test_disposition_type_parse() {
        assert_eq!(
            DispositionType::parse("inline").unwrap(),
            DispositionType::Inline
        );
        assert_eq!(
            DispositionType::parse(" Attachment ").unwrap(),
            DispositionType::Attachment
        );
        assert!(DispositionType::parse("form-data").is_err());
    }

    #[test]
    fn test_attachment_with_filename() {
        let cd = ContentDisposition::attachment().with_filename("report.pdf");
        assert_eq!(cd.to_string(), "attachment; filename=report.pdf");
        assert_eq!(cd.filename().unwrap(), Some("report.pdf".to_string()));
    }

    #[test]
    fn test_non_ascii_filename_is_encoded() {
        let cd = ContentDisposition::attachment().with_filename("résumé.pdf");
        let rendered = cd.to_string();
        assert!(rendered.contains("=?utf-8?Q?"));
        assert!(rendered.is_ascii());
        assert_eq!(cd.filename().unwrap(), Some("résumé.pdf".to_string()));
    }

    #[test]
    fn test_with_size() {
        let cd = ContentDisposition::attachment()
            .with_filename("data.bin")
            .with_size(1024);
        assert_eq!(cd.to_string(), "attachment; filename=data.bin; size=1024");
    }

    #[test]
    fn test_parse_with_parameters() {
        let cd = ContentDisposition::parse("attachment; filename=\"two words.txt\"").unwrap();
        assert_eq!(cd.disposition, DispositionType::Attachment);
        assert_eq!(cd.filename().unwrap(), Some("two words.txt".to_string()));
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        assert!(ContentDisposition::parse("banana; filename=x").is_err());
    }

    #[test]
    fn test_display_quotes_specials() {
        let cd = ContentDisposition::inline().with_parameter("filename", "a;b.txt");
        assert_eq!(cd.to_string(), "inline; filename=\"a;b.txt\"");
    }
}
