//! Live schema introspection for PostgreSQL.
//!
//! Loads the visible tables and their columns from `pg_catalog` into a
//! [`StaticCatalog`], which a [`crate::SchemaReader`] then serves from
//! memory. This is the one async, backend-specific corner of schema
//! handling; everything downstream of the snapshot is synchronous.

use std::collections::BTreeMap;

use crate::error::QueryResult;
use crate::row::RowExt;
use crate::schema::StaticCatalog;

/// Which PostgreSQL schemas to introspect.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Schema search order; tables in earlier schemas shadow later ones
    /// (default: `["public"]`).
    pub schemas: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            schemas: vec!["public".to_string()],
        }
    }
}

const CATALOG_SQL: &str = r#"
SELECT
  n.nspname AS schema_name,
  c.relname AS table_name,
  a.attname AS column_name
FROM pg_catalog.pg_class c
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
JOIN pg_catalog.pg_attribute a ON a.attrelid = c.oid
WHERE c.relkind IN ('r', 'p', 'v', 'm', 'f')
  AND a.attnum > 0
  AND NOT a.attisdropped
  AND n.nspname = ANY($1::text[])
ORDER BY n.nspname, c.relname, a.attnum
"#;

/// Load a table catalog from the database.
pub async fn load_catalog(
    client: &tokio_postgres::Client,
    config: &CatalogConfig,
) -> QueryResult<StaticCatalog> {
    let rows = client.query(CATALOG_SQL, &[&config.schemas]).await?;

    // Key by configured schema position so earlier schemas shadow later ones
    // when the same table name appears twice.
    let mut tables: BTreeMap<(usize, String), Vec<String>> = BTreeMap::new();
    for row in rows {
        let schema_name: String = row.try_get_column("schema_name")?;
        let table_name: String = row.try_get_column("table_name")?;
        let column_name: String = row.try_get_column("column_name")?;

        let position = config
            .schemas
            .iter()
            .position(|s| *s == schema_name)
            .unwrap_or(usize::MAX);
        tables
            .entry((position, table_name))
            .or_default()
            .push(column_name);
    }

    if tables.is_empty() {
        tracing::warn!(
            target: "pgfluent.catalog",
            schemas = ?config.schemas,
            "no tables found in the selected schemas"
        );
    }

    let mut catalog = StaticCatalog::new();
    for ((_, table), columns) in tables {
        catalog.add_table(table, columns);
    }
    Ok(catalog)
}
