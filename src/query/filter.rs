//! Filter expression tree.
//!
//! A filter is a list of clauses that must all hold. Clauses nest through
//! `not`, `and` and `or`:
//!
//! ```json
//! {"or": [{"eq": {"age": 44}}, {"re": {"age": ".*3$"}}], "lt": {"name": "w"}}
//! ```
//!
//! compiles to
//!
//! ```text
//! Filter [
//!   Or [ Filter [Compare(eq, age, 44)], Filter [Matches(age, /.*3$/)] ],
//!   Compare(lt, name, "w"),
//! ]
//! ```

use fancy_regex::Regex;
use serde_json::Value;

/// Field comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn name(&self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
        }
    }
}

/// Operator names accepted as keys of an expression object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Not,
    And,
    Or,
    Re,
    Compare(CompareOp),
}

impl Operator {
    pub fn from_name(name: &str) -> Option<Self> {
        let op = match name {
            "not" => Operator::Not,
            "and" => Operator::And,
            "or" => Operator::Or,
            "re" => Operator::Re,
            "eq" => Operator::Compare(CompareOp::Eq),
            "ne" => Operator::Compare(CompareOp::Ne),
            "gt" => Operator::Compare(CompareOp::Gt),
            "ge" => Operator::Compare(CompareOp::Ge),
            "lt" => Operator::Compare(CompareOp::Lt),
            "le" => Operator::Compare(CompareOp::Le),
            _ => return None,
        };
        Some(op)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operator::Not => "not",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Re => "re",
            Operator::Compare(op) => op.name(),
        }
    }
}

/// One condition of a [`Filter`].
#[derive(Debug, Clone)]
pub enum Clause {
    Not(Box<Filter>),
    /// Every filter holds. Empty is true.
    And(Vec<Filter>),
    /// At least one filter holds. Empty is false.
    Or(Vec<Filter>),
    Compare {
        op: CompareOp,
        field: String,
        value: Value,
    },
    /// The string form of the field matches the pattern.
    Matches { field: String, pattern: Regex },
}

/// Conjunction of clauses. The empty filter matches every record.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    pub fn new(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    /// A filter without clauses.
    pub fn match_all() -> Self {
        Self::default()
    }

    pub fn with_clause(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Whether `record` satisfies every clause.
    pub fn matches(&self, record: &Value) -> bool {
        super::executor::matches(self, record)
    }
}
