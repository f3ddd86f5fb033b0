//! Schema metadata and identifier validation.
//!
//! [`SchemaReader`] is the sole authority on identifier validity: every
//! table and column name is checked here before it is ever embedded in SQL
//! text. Identifiers cannot be parameterized the way literal values can, so
//! the builder refuses to store anything this module has not confirmed.
//!
//! Metadata comes in through the [`TableSource`] port: either a
//! [`StaticCatalog`] (in-memory, also what [`crate::catalog::load_catalog`]
//! produces from a live database) or any caller-provided implementation.
//! Lookups are memoized per table; populated entries are immutable until an
//! explicit [`SchemaReader::clear`].

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::error::{QueryError, QueryResult};

/// Source of table and column catalog metadata.
pub trait TableSource: Send + Sync {
    /// Names of the existing tables.
    fn table_names(&self) -> QueryResult<Vec<String>>;

    /// Ordered column names of `table`; fails if the table is absent.
    fn column_names(&self, table: &str) -> QueryResult<Vec<String>>;
}

/// An in-memory table catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    tables: Vec<(String, Vec<String>)>,
}

impl StaticCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table with its columns.
    pub fn with_table(mut self, name: impl Into<String>, columns: &[&str]) -> Self {
        self.add_table(name, columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Add a table with its columns, in place.
    pub fn add_table(&mut self, name: impl Into<String>, columns: Vec<String>) {
        self.tables.push((name.into(), columns));
    }

    /// Number of tables in the catalog.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl TableSource for StaticCatalog {
    fn table_names(&self) -> QueryResult<Vec<String>> {
        Ok(self.tables.iter().map(|(name, _)| name.clone()).collect())
    }

    fn column_names(&self, table: &str) -> QueryResult<Vec<String>> {
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, columns)| columns.clone())
            .ok_or_else(|| QueryError::UnknownTable(table.to_string()))
    }
}

/// Caches and validates table/column existence.
///
/// Shared read-mostly across builder instances (`Arc<SchemaReader>`).
/// First-population races are resolved by idempotent recomputation: the
/// value is computed outside the write lock and the first writer wins.
pub struct SchemaReader {
    source: Box<dyn TableSource>,
    tables: RwLock<Option<Arc<HashSet<String>>>>,
    columns: RwLock<HashMap<String, Arc<Vec<String>>>>,
}

impl SchemaReader {
    /// Create a reader over a metadata source.
    pub fn new(source: impl TableSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            tables: RwLock::new(None),
            columns: RwLock::new(HashMap::new()),
        }
    }

    /// Names of the existing tables; memoized.
    pub fn table_names(&self) -> QueryResult<Vec<String>> {
        Ok(self.table_set()?.iter().cloned().collect())
    }

    /// Ordered column names of `table`; memoized per table.
    pub fn column_names(&self, table: &str) -> QueryResult<Vec<String>> {
        Ok(self.columns_for(table)?.as_ref().clone())
    }

    /// Check that `table` exists.
    pub fn validate_table(&self, table: &str) -> QueryResult<()> {
        if self.table_set()?.contains(table) {
            Ok(())
        } else {
            Err(QueryError::UnknownTable(table.to_string()))
        }
    }

    /// Check that every column exists on `table`.
    ///
    /// A column list that is exactly the wildcard (`["*"]`) only validates
    /// the table.
    pub fn validate_columns<S: AsRef<str>>(&self, columns: &[S], table: &str) -> QueryResult<()> {
        if columns.len() == 1 && columns[0].as_ref() == "*" {
            return self.validate_table(table);
        }
        let known = self.columns_for(table)?;
        for column in columns {
            let column = column.as_ref();
            if !known.iter().any(|c| c == column) {
                return Err(QueryError::unknown_column(table, column));
            }
        }
        Ok(())
    }

    /// Validate possibly-qualified column references.
    ///
    /// Bare columns resolve against `default_table`; `table.column` /
    /// `alias.column` resolve via `aliases` (falling back to the literal
    /// table name). More than one `.` is malformed. Columns are grouped by
    /// resolved table and validated in one batch per table.
    pub fn validate_dotted<S: AsRef<str>>(
        &self,
        columns: &[S],
        default_table: &str,
        aliases: &HashMap<String, String>,
    ) -> QueryResult<()> {
        let mut by_table: HashMap<String, Vec<String>> = HashMap::new();
        for raw in columns {
            let raw = raw.as_ref();
            let (qualifier, column) = split_dotted(raw)?;
            let table = match qualifier {
                Some(q) => aliases.get(q).cloned().unwrap_or_else(|| q.to_string()),
                None => default_table.to_string(),
            };
            by_table.entry(table).or_default().push(column.to_string());
        }
        for (table, columns) in &by_table {
            self.validate_columns(columns, table)?;
        }
        Ok(())
    }

    /// Drop all memoized entries, forcing the next lookup back to the source.
    pub fn clear(&self) {
        *self.tables.write().unwrap() = None;
        self.columns.write().unwrap().clear();
    }

    fn table_set(&self) -> QueryResult<Arc<HashSet<String>>> {
        if let Some(set) = self.tables.read().unwrap().as_ref() {
            return Ok(set.clone());
        }
        let fresh: HashSet<String> = self.source.table_names()?.into_iter().collect();
        let mut guard = self.tables.write().unwrap();
        Ok(guard.get_or_insert_with(|| Arc::new(fresh)).clone())
    }

    fn columns_for(&self, table: &str) -> QueryResult<Arc<Vec<String>>> {
        self.validate_table(table)?;
        if let Some(columns) = self.columns.read().unwrap().get(table) {
            return Ok(columns.clone());
        }
        let fresh = Arc::new(self.source.column_names(table)?);
        let mut guard = self.columns.write().unwrap();
        Ok(guard.entry(table.to_string()).or_insert(fresh).clone())
    }
}

impl std::fmt::Debug for SchemaReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaReader")
            .field("cached_tables", &self.tables.read().unwrap().is_some())
            .field("cached_columns", &self.columns.read().unwrap().len())
            .finish()
    }
}

/// Split a column reference into optional qualifier and column name.
fn split_dotted(raw: &str) -> QueryResult<(Option<&str>, &str)> {
    let mut parts = raw.split('.');
    let first = parts.next().unwrap_or("");
    match (parts.next(), parts.next()) {
        (None, _) => {
            if first.is_empty() {
                Err(QueryError::MalformedIdentifier(raw.to_string()))
            } else {
                Ok((None, first))
            }
        }
        (Some(second), None) => {
            if first.is_empty() || second.is_empty() {
                Err(QueryError::MalformedIdentifier(raw.to_string()))
            } else {
                Ok((Some(first), second))
            }
        }
        (Some(_), Some(_)) => Err(QueryError::MalformedIdentifier(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn users_posts() -> StaticCatalog {
        StaticCatalog::new()
            .with_table("users", &["id", "name", "age"])
            .with_table("posts", &["id", "user_id", "title"])
    }

    #[test]
    fn present_identifiers_never_raise() {
        let schema = SchemaReader::new(users_posts());
        schema.validate_table("users").unwrap();
        schema.validate_table("posts").unwrap();
        schema.validate_columns(&["id", "name", "age"], "users").unwrap();
        schema.validate_columns(&["*"], "posts").unwrap();
    }

    #[test]
    fn absent_identifiers_always_raise() {
        let schema = SchemaReader::new(users_posts());
        assert!(matches!(
            schema.validate_table("orders"),
            Err(QueryError::UnknownTable(t)) if t == "orders"
        ));
        assert!(matches!(
            schema.validate_columns(&["email"], "users"),
            Err(QueryError::UnknownColumn { table, column })
                if table == "users" && column == "email"
        ));
    }

    #[test]
    fn column_names_on_missing_table() {
        let schema = SchemaReader::new(users_posts());
        assert!(matches!(
            schema.column_names("orders"),
            Err(QueryError::UnknownTable(_))
        ));
    }

    #[test]
    fn dotted_resolution_with_aliases() {
        let schema = SchemaReader::new(users_posts());
        let mut aliases = HashMap::new();
        aliases.insert("u".to_string(), "users".to_string());

        schema
            .validate_dotted(&["title", "u.name", "users.age"], "posts", &aliases)
            .unwrap();

        assert!(matches!(
            schema.validate_dotted(&["u.email"], "posts", &aliases),
            Err(QueryError::UnknownColumn { table, .. }) if table == "users"
        ));
    }

    #[test]
    fn dotted_rejects_extra_qualifiers() {
        let schema = SchemaReader::new(users_posts());
        let aliases = HashMap::new();
        for bad in ["a.b.c", ".id", "users.", "."] {
            assert!(matches!(
                schema.validate_dotted(&[bad], "users", &aliases),
                Err(QueryError::MalformedIdentifier(_))
            ));
        }
    }

    struct CountingSource {
        inner: StaticCatalog,
        table_hits: Arc<AtomicUsize>,
        column_hits: Arc<AtomicUsize>,
    }

    impl TableSource for CountingSource {
        fn table_names(&self) -> QueryResult<Vec<String>> {
            self.table_hits.fetch_add(1, Ordering::SeqCst);
            self.inner.table_names()
        }

        fn column_names(&self, table: &str) -> QueryResult<Vec<String>> {
            self.column_hits.fetch_add(1, Ordering::SeqCst);
            self.inner.column_names(table)
        }
    }

    #[test]
    fn lookups_are_memoized_until_clear() {
        let table_hits = Arc::new(AtomicUsize::new(0));
        let column_hits = Arc::new(AtomicUsize::new(0));
        let schema = SchemaReader::new(CountingSource {
            inner: users_posts(),
            table_hits: table_hits.clone(),
            column_hits: column_hits.clone(),
        });

        for _ in 0..3 {
            schema.validate_table("users").unwrap();
            schema.validate_columns(&["name"], "users").unwrap();
        }
        assert_eq!(table_hits.load(Ordering::SeqCst), 1);
        assert_eq!(column_hits.load(Ordering::SeqCst), 1);

        schema.clear();
        schema.validate_columns(&["name"], "users").unwrap();
        assert_eq!(table_hits.load(Ordering::SeqCst), 2);
        assert_eq!(column_hits.load(Ordering::SeqCst), 2);
    }
}
