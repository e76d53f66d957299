//! Filter query engine

pub mod compiler;
pub mod executor;
pub mod filter;

pub use compiler::{FilterCompiler, QueryError, QueryResult};
pub use filter::{Clause, CompareOp, Filter, Operator};

use serde_json::Value;
use tracing::{debug, instrument};

/// Evaluate a JSON filter expression against one record.
///
/// Compiles the expression on every call; callers matching many records
/// should compile once with [`FilterCompiler::compile`] instead.
#[instrument(skip_all)]
pub fn evaluate(expression: &Value, record: &Value) -> QueryResult<bool> {
    let filter = FilterCompiler::compile(expression)?;
    let matched = filter.matches(record);
    debug!(matched, "evaluated filter");
    Ok(matched)
}
