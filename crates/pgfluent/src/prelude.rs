//! Convenience re-exports for the common API surface.
//!
//! ```ignore
//! use pgfluent::prelude::*;
//! ```

pub use crate::binding::BindingSet;
pub use crate::builder::{QueryBuilder, RenderedQuery};
pub use crate::catalog::{CatalogConfig, load_catalog};
pub use crate::client::Connection;
pub use crate::condition::{Connector, Direction};
pub use crate::error::{QueryError, QueryResult};
pub use crate::join::{JoinClause, JoinKind};
pub use crate::row::{FromRow, RowExt};
pub use crate::schema::{SchemaReader, StaticCatalog, TableSource};
pub use crate::value::Value;
