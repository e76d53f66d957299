//! Record Store
//!
//! Single-record operations within one area and type. A record is a JSON
//! object stored whole under `db_data_{area}_{type}_{id}`.
//!
//! The store gives no read-after-write guarantee, so none of these
//! operations read before writing: `replace` does not check the record
//! exists and `destroy` succeeds whether or not it did.

use crate::auth::Session;
use crate::error::{Error, Result};
use crate::naming::{validate_value, IdentifierKind};
use crate::storage::keys::{data_prefix, record_key};
use crate::storage::{PutOptions, Storage};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Validate the type and `record.id` and build the record's key.
fn locate<'r>(
    session: &Session,
    type_name: &str,
    record: &'r Value,
    code: &'static str,
) -> Result<(String, &'r str)> {
    let prefix = data_prefix(session.area(), type_name).map_err(Error::identifier(code))?;
    let id = validate_value(IdentifierKind::Id, record.get("id")).map_err(Error::identifier(code))?;
    let key = record_key(&prefix, id).map_err(Error::identifier(code))?;
    Ok((key, id))
}

/// Store a new record under a freshly generated id.
///
/// The record must be a JSON object without an `id` member. The stored
/// value is the record with `id` prepended, and is returned.
#[instrument(skip(storage, record), fields(area = %session.area()))]
pub async fn create(
    storage: &Storage,
    session: &Session,
    type_name: &str,
    record: Value,
) -> Result<Value> {
    let prefix = data_prefix(session.area(), type_name).map_err(Error::identifier("A001"))?;

    let fields = match record {
        Value::Object(fields) => fields,
        other => {
            return Err(Error::InvalidInput {
                code: "A005",
                message: format!("Record must be a JSON object, got {}.", json_type(&other)),
            })
        }
    };
    if fields.contains_key("id") {
        return Err(Error::InvalidInput {
            code: "A002",
            message: "Record may not contain an id; ids are assigned on creation.".to_string(),
        });
    }

    let id = Uuid::new_v4().simple().to_string();
    let key = record_key(&prefix, &id).map_err(Error::identifier("A001"))?;

    let mut stored = Map::with_capacity(fields.len() + 1);
    stored.insert("id".to_string(), Value::String(id.clone()));
    stored.extend(fields);
    let stored = Value::Object(stored);

    storage
        .put(&key, stored.to_string(), PutOptions::default())
        .await
        .map_err(Error::store("A003", "Could not write record"))?;

    info!(code = "A004", type_name, id = %id, "Created record");
    Ok(stored)
}

/// Fetch the record whose id is `record.id`.
#[instrument(skip(storage, record), fields(area = %session.area()))]
pub async fn read(
    storage: &Storage,
    session: &Session,
    type_name: &str,
    record: &Value,
) -> Result<Value> {
    let (key, id) = locate(session, type_name, record, "G001")?;

    let text = storage
        .get(&key)
        .await
        .map_err(Error::store("G004", "Could not read record"))?
        .ok_or_else(|| Error::NotFound {
            code: "G002",
            id: id.to_string(),
        })?;

    let value: Value = serde_json::from_str(&text).map_err(|e| Error::Corrupt {
        code: "G004",
        id: id.to_string(),
        message: e.to_string(),
    })?;
    if value.is_null() {
        return Err(Error::NotFound {
            code: "G002",
            id: id.to_string(),
        });
    }

    debug!(code = "G003", type_name, id, "Read record");
    Ok(value)
}

/// Overwrite the record whose id is `record.id` with `record`, as given.
///
/// Nothing is merged and the previous value is not checked; writing an id
/// that does not exist yet creates it.
#[instrument(skip(storage, record), fields(area = %session.area()))]
pub async fn replace(
    storage: &Storage,
    session: &Session,
    type_name: &str,
    record: Value,
) -> Result<Value> {
    let (key, id) = locate(session, type_name, &record, "U001")?;
    let id = id.to_string();

    storage
        .put(&key, record.to_string(), PutOptions::default())
        .await
        .map_err(Error::store("U002", "Could not write record"))?;

    info!(code = "U003", type_name, id = %id, "Replaced record");
    Ok(record)
}

/// Delete the record whose id is `record.id`. Deleting an absent record
/// succeeds.
#[instrument(skip(storage, record), fields(area = %session.area()))]
pub async fn destroy(
    storage: &Storage,
    session: &Session,
    type_name: &str,
    record: &Value,
) -> Result<()> {
    let (key, id) = locate(session, type_name, record, "D001")?;

    storage
        .delete(&key)
        .await
        .map_err(Error::store("D002", "Could not delete record"))?;

    info!(code = "D003", type_name, id, "Destroyed record");
    Ok(())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
