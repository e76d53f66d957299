//! Identifier validation.
//!
//! Areas, types, record ids and token ids are embedded verbatim in storage
//! keys, so they are restricted to a fixed ASCII character set:
//!
//! ```text
//! A-Z a-z 0-9 : ; . , ~ ! @ # $ ^ * ( ) - _ +
//! ```
//!
//! Areas and types additionally may not contain the key separator `_`
//! (see [`validate_segment`]); record ids and token ids are always the last
//! segment of their key and may use it freely.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Separator between the segments of a storage key.
pub const KEY_SEPARATOR: char = '_';

/// Punctuation allowed in identifiers in addition to ASCII letters and digits.
const ALLOWED_PUNCTUATION: &str = ":;.,~!@#$^*()-_+";

/// Which identifier is being validated. Used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    Area,
    Type,
    Id,
    Token,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IdentifierKind::Area => "Area",
            IdentifierKind::Type => "Type",
            IdentifierKind::Id => "Id",
            IdentifierKind::Token => "Token",
        };
        f.write_str(name)
    }
}

/// Identifier validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    #[error("VN001: {kind} is missing.")]
    Missing { kind: IdentifierKind },

    #[error("VN002: {kind} is not a string.")]
    NotAString { kind: IdentifierKind },

    #[error("VN003: {kind} \"{value}\" contains invalid characters \"{invalid}\".")]
    InvalidCharacters {
        kind: IdentifierKind,
        value: String,
        invalid: String,
    },

    #[error("KC001: {kind} \"{value}\" may not contain the key separator '_'.")]
    ContainsSeparator { kind: IdentifierKind, value: String },
}

/// Returns true if `c` may appear in an identifier.
pub fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || ALLOWED_PUNCTUATION.contains(c)
}

/// Every character of `value` outside the allowed set, in order of
/// occurrence and including duplicates.
pub fn invalid_characters(value: &str) -> String {
    value.chars().filter(|c| !is_allowed(*c)).collect()
}

/// Validate an identifier against the allowed character set.
pub fn validate(kind: IdentifierKind, value: &str) -> Result<(), NamingError> {
    if value.is_empty() {
        return Err(NamingError::Missing { kind });
    }

    let invalid = invalid_characters(value);
    if !invalid.is_empty() {
        return Err(NamingError::InvalidCharacters {
            kind,
            value: value.to_string(),
            invalid,
        });
    }

    Ok(())
}

/// Validate an identifier taken from untrusted JSON, such as a record's `id`.
///
/// An absent member or an empty string is "missing"; `null`, numbers and any
/// other non-string value are "not a string".
pub fn validate_value(kind: IdentifierKind, value: Option<&Value>) -> Result<&str, NamingError> {
    match value {
        None => Err(NamingError::Missing { kind }),
        Some(Value::String(s)) => {
            validate(kind, s)?;
            Ok(s.as_str())
        }
        Some(_) => Err(NamingError::NotAString { kind }),
    }
}

/// Validate an identifier that is a middle segment of a storage key (area or
/// type). Besides the character set, it must not contain [`KEY_SEPARATOR`]:
/// `db_data_a_b_c` must split one way only.
pub fn validate_segment(kind: IdentifierKind, value: &str) -> Result<(), NamingError> {
    validate(kind, value)?;
    if value.contains(KEY_SEPARATOR) {
        return Err(NamingError::ContainsSeparator {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// A validated tenant area name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Area(String);

impl Area {
    pub fn parse(value: &str) -> Result<Self, NamingError> {
        validate_segment(IdentifierKind::Area, value)?;
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Area {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
