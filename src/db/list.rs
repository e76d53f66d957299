//! List Operator
//!
//! Full scan of one type: every key under the type prefix is fetched and
//! tested against the filter. There is no index, sort or limit, and the
//! result is not a snapshot.
//!
//! Listings can run ahead of values. A key whose value is already gone (or
//! was left as `null`) is skipped with a warning, as is a value that does
//! not parse; neither fails the query.

use crate::auth::Session;
use crate::error::{Error, Result};
use crate::metrics;
use crate::query::FilterCompiler;
use crate::storage::keys::data_prefix;
use crate::storage::Storage;
use serde_json::Value;
use tracing::{debug, instrument, warn};

/// Records of `type_name` matching `expression`, in listing order.
///
/// A `null` expression matches every record.
#[instrument(skip(storage, expression), fields(area = %session.area()))]
pub async fn list(
    storage: &Storage,
    session: &Session,
    type_name: &str,
    expression: &Value,
) -> Result<Vec<Value>> {
    let prefix = data_prefix(session.area(), type_name).map_err(Error::identifier("L001"))?;
    let filter = FilterCompiler::compile(expression).map_err(|source| Error::Query {
        code: "L005",
        source,
    })?;

    let keys = storage
        .scan_prefix(&prefix)
        .await
        .map_err(Error::store("L002", "Could not list records"))?;

    let mut matched = Vec::new();
    for key in &keys {
        metrics::LIST_KEYS_SCANNED.inc();
        let text = storage
            .get(&key.name)
            .await
            .map_err(Error::store("L006", "Could not read record"))?;

        let record = match text.as_deref().map(serde_json::from_str::<Value>) {
            None | Some(Ok(Value::Null)) => {
                warn!(code = "L004", key = %key.name, "Skipping listed key without a value");
                metrics::record_list_skip("missing");
                continue;
            }
            Some(Err(e)) => {
                warn!(code = "L003", key = %key.name, error = %e, "Skipping unparsable value");
                metrics::record_list_skip("unparsable");
                continue;
            }
            Some(Ok(record)) => record,
        };

        if filter.matches(&record) {
            matched.push(record);
        }
    }

    debug!(
        type_name,
        scanned = keys.len(),
        matched = matched.len(),
        "Listed records"
    );
    Ok(matched)
}
