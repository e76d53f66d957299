//! Type Catalog
//!
//! Types are not stored anywhere; they are whatever type segments appear in
//! the area's keys. A type can still be listed briefly after its last
//! record was deleted, until the store's listings catch up.

use crate::auth::Session;
use crate::error::{Error, Result};
use crate::storage::keys::{area_prefix, type_from_key};
use crate::storage::Storage;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, instrument};

/// One type present in an area.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeEntry {
    pub name: String,
}

/// Every type with at least one listed key in the session's area, each
/// once, in the order first seen.
#[instrument(skip(storage), fields(area = %session.area()))]
pub async fn list_types(storage: &Storage, session: &Session) -> Result<Vec<TypeEntry>> {
    let keys = storage
        .scan_prefix(&area_prefix(session.area()))
        .await
        .map_err(Error::store("LS002", "Could not list types"))?;

    let mut seen = HashSet::new();
    let types: Vec<TypeEntry> = keys
        .iter()
        .filter_map(|key| type_from_key(session.area(), &key.name))
        .filter(|name| seen.insert(*name))
        .map(|name| TypeEntry {
            name: name.to_string(),
        })
        .collect();

    debug!(keys = keys.len(), types = types.len(), "Listed types");
    Ok(types)
}
