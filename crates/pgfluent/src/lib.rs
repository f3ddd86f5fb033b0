//! # pgfluent
//!
//! A schema-validated fluent SQL builder for PostgreSQL.
//!
//! ## Features
//!
//! - **Validated identifiers**: every table/column name is checked against
//!   schema metadata before it is embedded in SQL text (identifiers cannot
//!   be parameterized, so they are never trusted)
//! - **Named placeholders**: every literal value is bound under a
//!   deterministically derived `:name` placeholder; the connection layer
//!   rewrites to the driver's `$n` dialect
//! - **Safe defaults**: UPDATE and DELETE require WHERE, OFFSET requires
//!   LIMIT, a join with no ON-condition is dropped
//! - **Transaction-friendly**: pass a transaction anywhere a [`Connection`]
//!   is expected
//! - **Single-statement lifecycle**: builder state resets after every
//!   execute attempt, so no clause leaks into the next statement
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use pgfluent::{CatalogConfig, QueryBuilder, SchemaReader, load_catalog};
//!
//! let catalog = load_catalog(&client, &CatalogConfig::default()).await?;
//! let schema = Arc::new(SchemaReader::new(catalog));
//!
//! let mut qb = QueryBuilder::new(schema.clone());
//! let adults = qb
//!     .from("users")?
//!     .select(&["*"])?
//!     .and_where("age", ">", 18)?
//!     .order_by_asc("name")?
//!     .limit(10)
//!     .get(&client)
//!     .await?;
//!
//! // Joins compose their own conditions and bindings:
//! let mut qb = QueryBuilder::new(schema);
//! let titles = qb
//!     .from("posts")?
//!     .join("users", Some("u"), "LEFT", |j| {
//!         j.on_column("posts.user_id", "=", "u.id")?;
//!         Ok(())
//!     })?
//!     .select(&["posts.title", "u.name"])?
//!     .get(&client)
//!     .await?;
//! ```

pub mod binding;
pub mod builder;
pub mod catalog;
pub mod client;
pub mod condition;
pub mod error;
pub mod join;
pub mod prelude;
pub mod row;
pub mod schema;
pub mod value;

pub use binding::BindingSet;
pub use builder::{QueryBuilder, RenderedQuery};
pub use catalog::{CatalogConfig, load_catalog};
pub use client::Connection;
pub use condition::{Connector, Direction};
pub use error::{QueryError, QueryResult};
pub use join::{JoinClause, JoinKind};
pub use row::{FromRow, RowExt, map_rows};
pub use schema::{SchemaReader, StaticCatalog, TableSource};
pub use value::Value;
