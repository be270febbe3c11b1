//! Mail address parsing and rendering.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use mailwright_mime::encoded_word::{decode_header_value, encode_header_value};

use crate::error::{Error, Result};

/// A single RFC 2822 mailbox: optional display name plus `user@host`.
///
/// Immutable once parsed. The encoded display name is computed at
/// construction, so rendering never mutates the value.
#[derive(Debug, Clone)]
pub struct MailAddress {
    display_name: String,
    user: String,
    host: String,
    encoded_display_name: String,
}

impl MailAddress {
    /// Parses a mailbox string.
    ///
    /// Accepted forms are `"Display Name" <user@host>`,
    /// `Display Name <user@host>`, `<user@host>`, and bare `user@host`.
    /// A display name that is an RFC 2047 encoded word is decoded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] for an empty input, an
    /// unterminated quoted display name, a quoted display name with
    /// nothing after it, mismatched angle brackets, or an address part
    /// without exactly one `@` between non-empty user and host. A
    /// display name that looks like an encoded word but fails to decode
    /// yields [`Error::Mime`].
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidAddress("Empty address".to_string()));
        }

        let (quoted_name, remainder) = take_quoted_display_name(trimmed)?;
        let remainder = remainder.trim();

        let (bare_name, addr_spec) = take_addr_spec(remainder)?;
        let display_name = match quoted_name {
            Some(name) => name,
            None => bare_name.to_string(),
        };
        // A display name may itself be an encoded word
        let display_name = decode_header_value(display_name.trim())?;

        let (user, host) = split_addr_spec(addr_spec)?;

        Ok(Self::assemble(display_name, user, host))
    }

    /// Parses `address` and attaches an explicit display name.
    ///
    /// A non-empty `display_name` replaces any display name found in
    /// `address`; surrounding double quotes are stripped from it first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] when `address` does not parse,
    /// or [`Error::Mime`] when `display_name` is an encoded word that
    /// fails to decode.
    pub fn with_display_name(address: &str, display_name: &str) -> Result<Self> {
        let parsed = Self::parse(address)?;
        let name = display_name.trim();
        if name.is_empty() {
            return Ok(parsed);
        }

        let name = name
            .strip_prefix('"')
            .and_then(|n| n.strip_suffix('"'))
            .unwrap_or(name);
        let name = decode_header_value(name)?;

        Ok(Self::assemble(name, parsed.user, parsed.host))
    }

    fn assemble(display_name: String, user: String, host: String) -> Self {
        let encoded_display_name = if display_name.is_empty() {
            String::new()
        } else if display_name.is_ascii() {
            format!("\"{}\"", escape_quoted(&display_name))
        } else {
            encode_header_value(&display_name, None, false)
        };

        Self {
            display_name,
            user,
            host,
            encoded_display_name,
        }
    }

    /// The human-readable display name; empty when none was given.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The local part, without surrounding quotes.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The domain part.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The bare `user@host` form.
    ///
    /// A local part that is not a dot-atom is rendered as a quoted
    /// string; the host is rendered as-is (dot-atom or domain literal).
    #[must_use]
    pub fn address(&self) -> String {
        let host = &self.host;
        if is_dot_atom(&self.user) {
            format!("{}@{host}", self.user)
        } else {
            format!("\"{}\"@{host}", escape_quoted(&self.user))
        }
    }

    /// The wire form for address headers, 7-bit clean.
    ///
    /// A non-ASCII display name appears as an encoded word; an ASCII one
    /// as a quoted string.
    #[must_use]
    pub fn encoded_address(&self) -> String {
        if self.encoded_display_name.is_empty() {
            self.address()
        } else {
            format!("{} <{}>", self.encoded_display_name, self.address())
        }
    }
}

impl fmt::Display for MailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.display_name.is_empty() {
            write!(f, "{}", self.address())
        } else {
            write!(f, "\"{}\" <{}>", self.display_name, self.address())
        }
    }
}

impl FromStr for MailAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Two addresses are equal iff their fully rendered forms match
/// case-insensitively; display name casing participates.
impl PartialEq for MailAddress {
    fn eq(&self, other: &Self) -> bool {
        self.to_string().eq_ignore_ascii_case(&other.to_string())
    }
}

impl Eq for MailAddress {}

impl Hash for MailAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().to_ascii_lowercase().hash(state);
    }
}

/// Splits off a leading quoted display name.
///
/// Returns `None` and the whole input when it does not start with a
/// double quote. The display name runs to the next double quote; no
/// escape processing happens at this layer.
fn take_quoted_display_name(input: &str) -> Result<(Option<String>, &str)> {
    let Some(rest) = input.strip_prefix('"') else {
        return Ok((None, input));
    };

    let end = rest.find('"').ok_or_else(|| {
        Error::InvalidAddress(format!("Unterminated quoted display name: {input}"))
    })?;

    let remainder = rest[end + 1..].trim_start();
    if remainder.is_empty() {
        return Err(Error::InvalidAddress(format!(
            "Nothing follows the quoted display name: {input}"
        )));
    }

    Ok((Some(rest[..end].to_string()), remainder))
}

/// Extracts the addr-spec, splitting off a bare display name when a `<`
/// appears after position 0.
fn take_addr_spec(input: &str) -> Result<(&str, &str)> {
    let Some(open) = input.find('<') else {
        return Ok(("", input));
    };

    let close = input[open..].find('>').ok_or_else(|| {
        Error::InvalidAddress(format!("Mismatched angle brackets: {input}"))
    })?;

    Ok((&input[..open], input[open + 1..open + close].trim()))
}

/// Splits a bare addr-spec on its first `@` and unwraps a quoted local
/// part. The remaining host must not contain another `@`.
fn split_addr_spec(addr_spec: &str) -> Result<(String, String)> {
    let (user, host) = addr_spec
        .split_once('@')
        .ok_or_else(|| Error::InvalidAddress(format!("Missing @ in address: {addr_spec}")))?;

    if user.is_empty() {
        return Err(Error::InvalidAddress(format!(
            "Empty local part: {addr_spec}"
        )));
    }
    if host.is_empty() {
        return Err(Error::InvalidAddress(format!("Empty host: {addr_spec}")));
    }
    if host.contains('@') {
        return Err(Error::InvalidAddress(format!(
            "More than one @ in address: {addr_spec}"
        )));
    }

    let user = user
        .strip_prefix('"')
        .and_then(|u| u.strip_suffix('"'))
        .map_or_else(|| user.to_string(), unescape_quoted);

    Ok((user, host.to_string()))
}

fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~".contains(c)
}

/// RFC 2822 dot-atom: atext runs separated by single dots.
fn is_dot_atom(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('.')
        && !s.ends_with('.')
        && !s.contains("..")
        && s.chars().all(|c| c == '.' || is_atext(c))
}

fn escape_quoted(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn unescape_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
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
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_parse_quoted_display_name() {
        let addr = MailAddress::parse("\"Jane Doe\" <jane@example.com>").unwrap();
        assert_eq!(addr.display_name(), "Jane Doe");
        assert_eq!(addr.user(), "jane");
        assert_eq!(addr.host(), "example.com");
        assert_eq!(addr.address(), "jane@example.com");
    }

    #[test]
    fn test_parse_bare_address() {
        let addr = MailAddress::parse("jane@example.com").unwrap();
        assert_eq!(addr.display_name(), "");
        assert_eq!(addr.user(), "jane");
        assert_eq!(addr.host(), "example.com");
        assert_eq!(addr.to_string(), "jane@example.com");
    }

    #[test]
    fn test_parse_unquoted_display_name() {
        let addr = MailAddress::parse("Jane Doe <jane@example.com>").unwrap();
        assert_eq!(addr.display_name(), "Jane Doe");
        assert_eq!(addr.address(), "jane@example.com");
    }

    #[test]
    fn test_parse_angle_only() {
        let addr = MailAddress::parse("<jane@example.com>").unwrap();
        assert_eq!(addr.display_name(), "");
        assert_eq!(addr.address(), "jane@example.com");
    }

    #[test]
    fn test_parse_missing_at_fails() {
        assert!(matches!(
            MailAddress::parse("jane"),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(MailAddress::parse("").is_err());
        assert!(MailAddress::parse("   ").is_err());
        assert!(MailAddress::parse("\"Jane <jane@example.com>").is_err());
        assert!(MailAddress::parse("\"Jane\"").is_err());
        assert!(MailAddress::parse("Jane <jane@example.com").is_err());
        assert!(MailAddress::parse("@example.com").is_err());
        assert!(MailAddress::parse("jane@").is_err());
        assert!(MailAddress::parse("a@b@c").is_err());
    }

    #[test]
    fn test_equality_is_case_insensitive_on_rendered_form() {
        let left = MailAddress::parse("A <a@b.com>").unwrap();
        let right = MailAddress::parse("a <A@B.COM>").unwrap();
        assert_eq!(left, right);

        // Display name casing participates, so a different name differs
        let other = MailAddress::parse("B <a@b.com>").unwrap();
        assert_ne!(left, other);
    }

    #[test]
    fn test_hash_agrees_with_equality() {
        let left = MailAddress::parse("A <a@b.com>").unwrap();
        let right = MailAddress::parse("a <A@B.COM>").unwrap();

        let mut set = HashSet::new();
        set.insert(left);
        set.insert(right);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_space_local_part_renders_quoted() {
        let addr = MailAddress::parse("john smith@example.com").unwrap();
        assert_eq!(addr.user(), "john smith");
        assert_eq!(addr.address(), "\"john smith\"@example.com");
    }

    #[test]
    fn test_quoted_local_part_round_trips_in_angle_form() {
        let addr = MailAddress::parse("<\"john doe\"@example.com>").unwrap();
        assert_eq!(addr.user(), "john doe");
        assert_eq!(addr.address(), "\"john doe\"@example.com");
    }

    #[test]
    fn test_leading_quote_is_always_a_display_name() {
        // The quoted prefix is consumed as a display name, which leaves
        // no local part to parse
        assert!(matches!(
            MailAddress::parse("\"john doe\"@example.com"),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_dot_atom_local_part_stays_bare() {
        let addr = MailAddress::parse("first.last+tag@example.com").unwrap();
        assert_eq!(addr.address(), "first.last+tag@example.com");
    }

    #[test]
    fn test_domain_literal_host() {
        let addr = MailAddress::parse("user@[127.0.0.1]").unwrap();
        assert_eq!(addr.host(), "[127.0.0.1]");
        assert_eq!(addr.address(), "user@[127.0.0.1]");
    }

    #[test]
    fn test_encoded_word_display_name_is_decoded() {
        let addr = MailAddress::parse("=?utf-8?Q?Jos=C3=A9?= <jose@example.com>").unwrap();
        assert_eq!(addr.display_name(), "José");

        let wire = addr.encoded_address();
        assert!(wire.is_ascii());
        assert_eq!(wire, "=?utf-8?Q?Jos=C3=A9?= <jose@example.com>");
    }

    #[test]
    fn test_ascii_display_name_is_quoted_on_the_wire() {
        let addr = MailAddress::parse("Jane Doe <jane@example.com>").unwrap();
        assert_eq!(addr.encoded_address(), "\"Jane Doe\" <jane@example.com>");
    }

    #[test]
    fn test_with_display_name_overrides_parsed_name() {
        let addr = MailAddress::with_display_name("\"Old\" <a@b.com>", "New").unwrap();
        assert_eq!(addr.display_name(), "New");

        let kept = MailAddress::with_display_name("\"Old\" <a@b.com>", "").unwrap();
        assert_eq!(kept.display_name(), "Old");
    }

    #[test]
    fn test_with_display_name_strips_surrounding_quotes() {
        let addr = MailAddress::with_display_name("a@b.com", "\"The Team\"").unwrap();
        assert_eq!(addr.display_name(), "The Team");
        assert_eq!(addr.to_string(), "\"The Team\" <a@b.com>");
    }

    #[test]
    fn test_from_str() {
        let addr: MailAddress = "jane@example.com".parse().unwrap();
        assert_eq!(addr.host(), "example.com");
    }

    proptest! {
        #[test]
        fn prop_bare_address_round_trips(
            user in "[a-z0-9]{1,12}",
            host in "[a-z0-9]{1,12}\\.[a-z]{2,4}",
        ) {
            let addr = MailAddress::parse(&format!("{user}@{host}")).unwrap();
            prop_assert_eq!(addr.address(), format!("{user}@{host}"));
        }

        #[test]
        fn prop_rendered_form_reparses_equal(
            name in "[A-Za-z ]{1,20}",
            user in "[a-z0-9]{1,12}",
            host in "[a-z0-9]{1,12}\\.[a-z]{2,4}",
        ) {
            let input = format!("\"{name}\" <{user}@{host}>");
            let addr = MailAddress::parse(&input).unwrap();
            let reparsed = MailAddress::parse(&addr.to_string()).unwrap();
            prop_assert_eq!(addr, reparsed);
        }
    }
}
