//! Filter Executor.
//!
//! Evaluates a compiled [`Filter`] against one record by structural
//! recursion over the clause tree.
//!
//! # Value semantics
//!
//! - **Missing fields** are absent, not `null`: `eq` against a missing field
//!   never holds (not even `{"eq": {"x": null}}`), so `ne` always does.
//! - **Equality**: numbers compare by value (`44 == 44.0`); strings, booleans
//!   and `null` by value; arrays and objects structurally.
//! - **Ordering** (`gt` `ge` `lt` `le`) is only defined between two numbers,
//!   two strings, two booleans (`false < true`) or two nulls. Any other
//!   pairing, including a missing field, does not match.
//! - **Regular expressions** search the string form of the field: strings as
//!   they are, everything else as compact JSON (`44`, `true`, `null`,
//!   `[1,2]`). A missing field does not match.

use super::filter::{Clause, CompareOp, Filter};
use fancy_regex::Regex;
use serde_json::{Number, Value};
use std::borrow::Cow;
use std::cmp::Ordering;
use tracing::warn;

/// Whether `record` satisfies every clause of `filter`.
pub fn matches(filter: &Filter, record: &Value) -> bool {
    filter
        .clauses()
        .iter()
        .all(|clause| clause_matches(clause, record))
}

fn clause_matches(clause: &Clause, record: &Value) -> bool {
    match clause {
        Clause::Not(inner) => !matches(inner, record),
        Clause::And(filters) => filters.iter().all(|f| matches(f, record)),
        Clause::Or(filters) => filters.iter().any(|f| matches(f, record)),
        Clause::Compare { op, field, value } => compare(*op, record.get(field), value),
        Clause::Matches { field, pattern } => record
            .get(field)
            .is_some_and(|actual| regex_matches(pattern, &string_form(actual))),
    }
}

/// A pattern that exhausts its backtracking budget does not match.
fn regex_matches(pattern: &Regex, text: &str) -> bool {
    pattern.is_match(text).unwrap_or_else(|e| {
        warn!(pattern = pattern.as_str(), error = %e, "Regular expression gave up");
        false
    })
}

fn compare(op: CompareOp, actual: Option<&Value>, expected: &Value) -> bool {
    let ordering = || actual.and_then(|a| compare_values(a, expected));
    match op {
        CompareOp::Eq => actual.is_some_and(|a| values_equal(a, expected)),
        CompareOp::Ne => !actual.is_some_and(|a| values_equal(a, expected)),
        CompareOp::Gt => matches!(ordering(), Some(Ordering::Greater)),
        CompareOp::Ge => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
        CompareOp::Lt => matches!(ordering(), Some(Ordering::Less)),
        CompareOp::Le => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
    }
}

/// Equality used by `eq` and `ne`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| values_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(key, a)| y.get(key).is_some_and(|b| values_equal(a, b)))
        }
        _ => a == b,
    }
}

/// Ordering used by `gt`, `ge`, `lt` and `le`; `None` when incomparable.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn compare_numbers(x: &Number, y: &Number) -> Option<Ordering> {
    // integers are compared exactly; anything involving a float goes through f64
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return Some(a.cmp(&b));
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return Some(a.cmp(&b));
    }
    x.as_f64()?.partial_cmp(&y.as_f64()?)
}

/// Text a `re` pattern is matched against.
pub fn string_form(value: &Value) -> Cow<'_, str> {
    match value {
        Value::String(s) => Cow::Borrowed(s),
        other => Cow::Owned(other.to_string()),
    }
}
