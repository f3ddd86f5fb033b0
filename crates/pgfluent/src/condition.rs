//! Condition vocabulary shared by WHERE predicates and join ON-conditions.

use crate::error::{QueryError, QueryResult};
use crate::value::Value;

/// Comparison operators accepted in WHERE and ON conditions.
const OPERATORS: &[&str] = &[
    "=", "<>", "!=", "<", ">", "<=", ">=", "LIKE", "NOT LIKE", "IS NOT",
];

/// Validate a comparison operator against the whitelist.
///
/// Word operators compare case-insensitively; the canonical (upper-case)
/// spelling is what gets rendered.
pub(crate) fn validate_operator(op: &str) -> QueryResult<&'static str> {
    let trimmed = op.trim();
    OPERATORS
        .iter()
        .find(|candidate| candidate.eq_ignore_ascii_case(trimmed))
        .copied()
        .ok_or_else(|| QueryError::InvalidOperator(op.to_string()))
}

/// Logical connector between two conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

impl Connector {
    /// Parse a connector, case-insensitively.
    pub fn parse(s: &str) -> QueryResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Connector::And),
            "OR" => Ok(Connector::Or),
            _ => Err(QueryError::InvalidConnector(s.to_string())),
        }
    }

    /// SQL spelling.
    pub fn as_sql(self) -> &'static str {
        match self {
            Connector::And => "AND",
            Connector::Or => "OR",
        }
    }
}

/// Sort direction for ORDER BY entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    /// Parse a direction, case-insensitively.
    pub fn parse(s: &str) -> QueryResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(Direction::Asc),
            "DESC" => Ok(Direction::Desc),
            _ => Err(QueryError::InvalidDirection(s.to_string())),
        }
    }

    /// SQL spelling.
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// One WHERE predicate: `column op :placeholder`, joined by `connector`.
///
/// The value is held here and bound under a derived placeholder at render
/// time; the first predicate's connector is never rendered.
#[derive(Debug, Clone)]
pub(crate) struct Predicate {
    pub column: String,
    pub op: &'static str,
    pub value: Value,
    pub connector: Connector,
}

/// One ORDER BY entry.
#[derive(Debug, Clone)]
pub(crate) struct OrderBy {
    pub column: String,
    pub direction: Direction,
}
