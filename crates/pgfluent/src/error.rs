//! Error types for pgfluent

use thiserror::Error;

/// Result type alias for pgfluent operations
pub type QueryResult<T> = Result<T, QueryError>;

/// Error types for query construction and execution
#[derive(Debug, Error)]
pub enum QueryError {
    /// Table does not exist in the schema
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// Column does not exist on the named table
    #[error("Unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// Identifier has more than one qualifier or an empty segment
    #[error("Malformed identifier: '{0}'")]
    MalformedIdentifier(String),

    /// A table-dependent operation was called before `from()`
    #[error("No table selected; call from() first")]
    MissingFromClause,

    /// UPDATE/DELETE without at least one WHERE predicate
    #[error("Refusing to run {statement} without a WHERE clause")]
    MissingWhereClause { statement: &'static str },

    /// Comparison operator not in the whitelist
    #[error("Invalid operator: '{0}'")]
    InvalidOperator(String),

    /// Logical connector other than AND/OR
    #[error("Invalid logical connector: '{0}'")]
    InvalidConnector(String),

    /// Sort direction other than ASC/DESC
    #[error("Invalid sort direction: '{0}'")]
    InvalidDirection(String),

    /// Join type not in the whitelist
    #[error("Invalid join type: '{0}'")]
    InvalidJoinType(String),

    /// A stored join no longer matches the builder's from-table
    #[error("Join on '{table}' does not belong to the current from-table")]
    InvalidJoinFragment { table: String },

    /// A named placeholder had no binding at rewrite time
    #[error("No binding for placeholder ':{0}'")]
    UnboundPlaceholder(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Query execution error, propagated verbatim from the driver
    #[error("Query error: {0}")]
    Db(#[from] tokio_postgres::Error),
}

impl QueryError {
    /// Create an unknown-column error for a specific table
    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Check if this is an identifier error (unknown table/column, malformed)
    pub fn is_identifier_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownTable(_) | Self::UnknownColumn { .. } | Self::MalformedIdentifier(_)
        )
    }

    /// Check if this error came from the database driver
    pub fn is_db_error(&self) -> bool {
        matches!(self, Self::Db(_))
    }
}
