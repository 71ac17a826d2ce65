//! Distinguished name utilities for directory entries.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use cfmgmt_core::error::Error as CoreError;

/// Errors that can occur when parsing distinguished names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistinguishedNameError {
    /// The distinguished name was empty.
    #[error("distinguished name cannot be empty")]
    Empty,
    /// A component in the distinguished name was invalid.
    #[error("invalid distinguished name component: {0}")]
    InvalidComponent(String),
    /// A component was missing the attribute name to the left of the `=`.
    #[error("distinguished name component missing attribute: {0}")]
    MissingAttribute(String),
    /// A component was missing the value to the right of the `=`.
    #[error("distinguished name component missing value for attribute {0}")]
    MissingValue(String),
    /// The distinguished name ended with an escape character.
    #[error("distinguished name contains an unterminated escape sequence")]
    UnterminatedEscape,
}

impl From<DistinguishedNameError> for CoreError {
    fn from(err: DistinguishedNameError) -> Self {
        CoreError::InvalidRequest(err.to_string())
    }
}

/// Relative distinguished name (single attribute/value pair).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativeDistinguishedName {
    attribute: String,
    value: String,
}

impl RelativeDistinguishedName {
    /// Create a new relative distinguished name.
    #[must_use]
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Attribute portion of the RDN (e.g. `cn`).
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Attribute value portion of the RDN, with DN escapes removed.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// Parsed distinguished name.
///
/// Parsing is strict: every comma that is not escaped starts a new component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistinguishedName {
    raw: String,
    rdns: Vec<RelativeDistinguishedName>,
}

impl DistinguishedName {
    /// Parses a distinguished name from a string.
    ///
    /// # Errors
    ///
    /// Returns [`DistinguishedNameError`] if the distinguished name is empty or contains invalid
    /// syntax.
    pub fn parse(input: impl AsRef<str>) -> std::result::Result<Self, DistinguishedNameError> {
        let raw = input.as_ref().trim();
        if raw.is_empty() {
            return Err(DistinguishedNameError::Empty);
        }

        let rdns = split_escaped(raw, ',')?
            .iter()
            .map(|component| {
                split_attribute_value(component)
                    .map(|(attribute, value)| RelativeDistinguishedName::new(attribute, value))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: rdns_to_string(&rdns),
            rdns,
        })
    }

    /// Borrows the canonical distinguished name string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the relative distinguished names in order, leaf first.
    #[must_use]
    pub fn components(&self) -> &[RelativeDistinguishedName] {
        &self.rdns
    }

    /// Looks up the value for the first attribute that matches `attribute` (case-insensitive).
    #[must_use]
    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.rdns
            .iter()
            .find(|rdn| rdn.attribute.eq_ignore_ascii_case(attribute))
            .map(RelativeDistinguishedName::value)
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for DistinguishedName {
    type Err = DistinguishedNameError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Returns the leading RDN of `dn` relative to the search base `base`.
///
/// When `dn` ends with `,<base>` (compared case-insensitively) everything before the
/// base is treated as a single `attr=value` pair, so values holding unescaped commas
/// such as `cn=Washburn, Caleb` stay intact. Otherwise `dn` is parsed strictly and its
/// first component is returned.
///
/// # Errors
///
/// Returns [`DistinguishedNameError`] if the leading component is malformed.
pub fn leading_rdn(
    dn: &str,
    base: &str,
) -> std::result::Result<RelativeDistinguishedName, DistinguishedNameError> {
    let dn = dn.trim();
    let suffix = format!(",{}", base.trim()).to_ascii_lowercase();
    let lowered = dn.to_ascii_lowercase();

    if base.trim().is_empty() || !lowered.ends_with(&suffix) || lowered.len() == suffix.len() {
        return DistinguishedName::parse(dn)?
            .rdns
            .into_iter()
            .next()
            .ok_or(DistinguishedNameError::Empty);
    }

    let prefix = dn[..dn.len() - suffix.len()].trim();
    let (attribute, value) = split_attribute_value(prefix)?;
    Ok(RelativeDistinguishedName::new(attribute, value))
}

fn split_escaped(
    input: &str,
    delimiter: char,
) -> std::result::Result<Vec<String>, DistinguishedNameError> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escape = false;

    for ch in input.chars() {
        if escape {
            current.push('\\');
            current.push(ch);
            escape = false;
            continue;
        }

        if ch == '\\' {
            escape = true;
            continue;
        }

        if ch == delimiter {
            parts.push(current.trim().to_string());
            current.clear();
            continue;
        }

        current.push(ch);
    }

    if escape {
        return Err(DistinguishedNameError::UnterminatedEscape);
    }

    parts.push(current.trim().to_string());
    if parts.iter().any(String::is_empty) {
        return Err(DistinguishedNameError::InvalidComponent(input.to_string()));
    }
    Ok(parts)
}

fn split_attribute_value(
    component: &str,
) -> std::result::Result<(String, String), DistinguishedNameError> {
    let mut escape = false;
    let mut index = None;

    for (i, ch) in component.char_indices() {
        if escape {
            escape = false;
            continue;
        }

        if ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '=' {
            index = Some(i);
            break;
        }
    }

    let idx =
        index.ok_or_else(|| DistinguishedNameError::InvalidComponent(component.to_string()))?;
    let attribute = component[..idx].trim();
    let value_part = component[idx + 1..].trim();

    if attribute.is_empty() {
        return Err(DistinguishedNameError::MissingAttribute(
            component.to_string(),
        ));
    }

    if value_part.is_empty() {
        return Err(DistinguishedNameError::MissingValue(attribute.to_string()));
    }

    Ok((attribute.to_string(), unescape(value_part)?))
}

fn unescape(value: &str) -> std::result::Result<String, DistinguishedNameError> {
    let mut bytes = Vec::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            let mut buf = [0; 4];
            bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            continue;
        }

        let next = chars
            .next()
            .ok_or(DistinguishedNameError::UnterminatedEscape)?;
        let hex_pair = next
            .to_digit(16)
            .zip(chars.peek().and_then(|low| low.to_digit(16)));
        if let Some((high, low)) = hex_pair {
            chars.next();
            // Both digits are below 16, so the pair always fits in a byte.
            bytes.push(u8::try_from(high * 16 + low).unwrap_or_default());
        } else {
            let mut buf = [0; 4];
            bytes.extend_from_slice(next.encode_utf8(&mut buf).as_bytes());
        }
    }

    String::from_utf8(bytes)
        .map_err(|_| DistinguishedNameError::InvalidComponent(value.to_string()))
}

fn escape(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut escaped = String::with_capacity(value.len());

    for (idx, ch) in chars.iter().enumerate() {
        let is_first = idx == 0;
        let is_last = idx == chars.len() - 1;
        let needs_escape = matches!(ch, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=')
            || (is_first && (*ch == ' ' || *ch == '#'))
            || (is_last && *ch == ' ');

        if needs_escape {
            escaped.push('\\');
        }
        escaped.push(*ch);
    }

    escaped
}

fn rdns_to_string(rdns: &[RelativeDistinguishedName]) -> String {
    rdns.iter()
        .map(|rdn| format!("{}={}", rdn.attribute(), escape(rdn.value())))
        .collect::<Vec<_>>()
        .join(",")
}
