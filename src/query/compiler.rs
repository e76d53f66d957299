//! Filter Compiler.
//!
//! Compiles the JSON filter language into a [`Filter`] tree.
//!
//! # Format
//!
//! An expression is an object whose keys are operators:
//!
//! | operator | payload |
//! |---|---|
//! | `eq` `ne` `gt` `ge` `lt` `le` | `{field: value, ...}` |
//! | `re` | `{field: "pattern", ...}` |
//! | `and` `or` | `[expression, ...]` |
//! | `not` | `expression` |
//!
//! All keys of one object must hold. A leaf operator with several fields
//! becomes one clause per field, e.g. `{"lt": {"age": 44, "name": "w"}}`
//! requires both `age < 44` and `name < "w"`.
//!
//! Regular expressions are compiled here, once per query, so an invalid
//! pattern fails the query before any record is examined. Patterns follow
//! JavaScript `RegExp` syntax closely, including look-around and
//! backreferences.

use super::filter::{Clause, Filter, Operator};
use fancy_regex::RegexBuilder;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Upper bound on the compiled size of one filter pattern.
const REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Backtracking steps allowed per match before the pattern gives up.
const REGEX_BACKTRACK_LIMIT: usize = 1_000_000;

/// Malformed filter expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("PQ003: Invalid regular expression: {pattern} ({message})")]
    InvalidRegex { pattern: String, message: String },

    #[error("PQ004: Unknown filter operator \"{0}\"")]
    UnknownOperator(String),

    #[error("PQ005: \"{operator}\" expects {expected}")]
    Malformed {
        operator: String,
        expected: &'static str,
    },
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Compiler for JSON filter expressions.
pub struct FilterCompiler;

impl FilterCompiler {
    /// Compile a JSON expression. `null` compiles to the empty filter.
    pub fn compile(expression: &Value) -> QueryResult<Filter> {
        match expression {
            Value::Null => Ok(Filter::match_all()),
            other => Self::compile_filter(other),
        }
    }

    fn compile_filter(json: &Value) -> QueryResult<Filter> {
        let operators = json.as_object().ok_or_else(|| QueryError::Malformed {
            operator: "expression".to_string(),
            expected: "an object of operators",
        })?;

        let mut clauses = Vec::with_capacity(operators.len());
        for (name, payload) in operators {
            let operator = Operator::from_name(name)
                .ok_or_else(|| QueryError::UnknownOperator(name.clone()))?;

            match operator {
                Operator::Not => {
                    clauses.push(Clause::Not(Box::new(Self::compile_filter(payload)?)));
                }
                Operator::And => clauses.push(Clause::And(Self::compile_list(operator, payload)?)),
                Operator::Or => clauses.push(Clause::Or(Self::compile_list(operator, payload)?)),
                Operator::Re => {
                    for (field, pattern) in Self::fields(operator, payload)? {
                        let pattern = pattern.as_str().ok_or_else(|| QueryError::Malformed {
                            operator: operator.name().to_string(),
                            expected: "string patterns",
                        })?;
                        let regex = RegexBuilder::new(pattern)
                            .delegate_size_limit(REGEX_SIZE_LIMIT)
                            .backtrack_limit(REGEX_BACKTRACK_LIMIT)
                            .build()
                            .map_err(|e| QueryError::InvalidRegex {
                                pattern: pattern.to_string(),
                                message: e.to_string(),
                            })?;
                        clauses.push(Clause::Matches {
                            field: field.clone(),
                            pattern: regex,
                        });
                    }
                }
                Operator::Compare(op) => {
                    for (field, value) in Self::fields(operator, payload)? {
                        clauses.push(Clause::Compare {
                            op,
                            field: field.clone(),
                            value: value.clone(),
                        });
                    }
                }
            }
        }

        debug!(clauses = clauses.len(), "compiled filter");
        Ok(Filter::new(clauses))
    }

    fn compile_list(operator: Operator, payload: &Value) -> QueryResult<Vec<Filter>> {
        payload
            .as_array()
            .ok_or_else(|| QueryError::Malformed {
                operator: operator.name().to_string(),
                expected: "an array of expressions",
            })?
            .iter()
            .map(Self::compile_filter)
            .collect()
    }

    fn fields(operator: Operator, payload: &Value) -> QueryResult<&Map<String, Value>> {
        payload.as_object().ok_or_else(|| QueryError::Malformed {
            operator: operator.name().to_string(),
            expected: "an object of field values",
        })
    }
}
