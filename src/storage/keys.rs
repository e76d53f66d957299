//! Storage key layout.
//!
//! ```text
//! db_data_{area}_{type}_{id}     one record
//! db_meta_token_{token}          token -> {"area": ...}
//! ```
//!
//! Nothing outside this module builds or parses keys. Area and type never
//! contain `_`, so the type of a data key is always its 4th `_`-delimited
//! segment.

use crate::naming::{validate, validate_segment, Area, IdentifierKind, NamingError, KEY_SEPARATOR};

const DATA_PREFIX: &str = "db_data_";
const TOKEN_PREFIX: &str = "db_meta_token_";

/// Key of one record.
pub fn data_key(area: &Area, type_name: &str, id: &str) -> Result<String, NamingError> {
    let prefix = data_prefix(area, type_name)?;
    record_key(&prefix, id)
}

/// Key of one record under a prefix already built by [`data_prefix`].
pub fn record_key(prefix: &str, id: &str) -> Result<String, NamingError> {
    validate(IdentifierKind::Id, id)?;
    Ok(format!("{prefix}{id}"))
}

/// Prefix of every record of one type in an area.
pub fn data_prefix(area: &Area, type_name: &str) -> Result<String, NamingError> {
    validate_segment(IdentifierKind::Type, type_name)?;
    Ok(format!("{}{type_name}{KEY_SEPARATOR}", area_prefix(area)))
}

/// Prefix of every record in an area.
pub fn area_prefix(area: &Area) -> String {
    format!("{DATA_PREFIX}{}{KEY_SEPARATOR}", area.as_str())
}

/// Key holding a token's area binding.
pub fn token_key(token_id: &str) -> Result<String, NamingError> {
    validate(IdentifierKind::Token, token_id)?;
    Ok(format!("{TOKEN_PREFIX}{token_id}"))
}

/// Type segment of a data key listed under [`area_prefix`]`(area)`.
///
/// Returns `None` for keys outside the area or without an id segment.
pub fn type_from_key<'k>(area: &Area, key: &'k str) -> Option<&'k str> {
    let rest = key.strip_prefix(&area_prefix(area))?;
    let (type_name, _id) = rest.split_once(KEY_SEPARATOR)?;
    if type_name.is_empty() {
        return None;
    }
    Some(type_name)
}
