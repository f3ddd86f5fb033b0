//! Row mapping traits and utilities

use crate::error::QueryResult;
use tokio_postgres::Row;

/// Trait for converting a database row into a Rust struct.
///
/// # Example
///
/// ```ignore
/// use pgfluent::{FromRow, QueryResult, RowExt};
///
/// struct User {
///     id: i64,
///     name: String,
/// }
///
/// impl FromRow for User {
///     fn from_row(row: &tokio_postgres::Row) -> QueryResult<Self> {
///         Ok(Self {
///             id: row.try_get_column("id")?,
///             name: row.try_get_column("name")?,
///         })
///     }
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a database row into Self
    fn from_row(row: &Row) -> QueryResult<Self>;
}

/// Extension trait for Row to provide typed access
pub trait RowExt {
    /// Try to get a column value, returning `QueryError::Decode` on failure
    fn try_get_column<T>(&self, column: &str) -> QueryResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> QueryResult<T>
    where
        T: for<'a> tokio_postgres::types::FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| crate::error::QueryError::decode(column, e.to_string()))
    }
}

/// Map a slice of rows through [`FromRow`].
pub fn map_rows<T: FromRow>(rows: &[Row]) -> QueryResult<Vec<T>> {
    rows.iter().map(T::from_row).collect()
}
