//! Connection trait for statement execution.
//!
//! The builder renders SQL in the named-placeholder dialect and hands it to a
//! [`Connection`] together with its [`BindingSet`]. The PostgreSQL
//! implementations rewrite `:name` into the driver's positional `$n` dialect
//! once per call and resolve each parameter from the binding set.

use crate::binding::{BindingSet, to_positional};
use crate::error::{QueryError, QueryResult};
use tokio_postgres::Row;

/// A connection that can execute one statement at a time.
///
/// Implemented for `tokio_postgres::Client` and `tokio_postgres::Transaction`
/// so builder code can run inside or outside a transaction unchanged.
pub trait Connection: Send + Sync {
    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        bindings: &BindingSet,
    ) -> impl std::future::Future<Output = QueryResult<Vec<Row>>> + Send;

    /// Execute a query and return the first row, if any.
    fn query_opt(
        &self,
        sql: &str,
        bindings: &BindingSet,
    ) -> impl std::future::Future<Output = QueryResult<Option<Row>>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        bindings: &BindingSet,
    ) -> impl std::future::Future<Output = QueryResult<u64>> + Send;

    /// The most recently generated identifier on this connection.
    ///
    /// `None` is the not-supported sentinel. The default implementation
    /// reports unsupported.
    fn last_insert_id(&self) -> impl std::future::Future<Output = QueryResult<Option<i64>>> + Send {
        async { Ok(None) }
    }
}

impl Connection for tokio_postgres::Client {
    async fn query(&self, sql: &str, bindings: &BindingSet) -> QueryResult<Vec<Row>> {
        let (sql, params) = to_positional(sql, bindings)?;
        tokio_postgres::Client::query(self, &sql, &params)
            .await
            .map_err(QueryError::from)
    }

    async fn query_opt(&self, sql: &str, bindings: &BindingSet) -> QueryResult<Option<Row>> {
        let (sql, params) = to_positional(sql, bindings)?;
        tokio_postgres::Client::query_opt(self, &sql, &params)
            .await
            .map_err(QueryError::from)
    }

    async fn execute(&self, sql: &str, bindings: &BindingSet) -> QueryResult<u64> {
        let (sql, params) = to_positional(sql, bindings)?;
        tokio_postgres::Client::execute(self, &sql, &params)
            .await
            .map_err(QueryError::from)
    }

    async fn last_insert_id(&self) -> QueryResult<Option<i64>> {
        // lastval() raises if no sequence has been used in this session;
        // that maps to the not-supported sentinel rather than an error.
        match tokio_postgres::Client::query_one(self, "SELECT lastval()", &[]).await {
            Ok(row) => Ok(row.try_get::<_, i64>(0).ok()),
            Err(_) => Ok(None),
        }
    }
}

impl Connection for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, bindings: &BindingSet) -> QueryResult<Vec<Row>> {
        let (sql, params) = to_positional(sql, bindings)?;
        tokio_postgres::Transaction::query(self, &sql, &params)
            .await
            .map_err(QueryError::from)
    }

    async fn query_opt(&self, sql: &str, bindings: &BindingSet) -> QueryResult<Option<Row>> {
        let (sql, params) = to_positional(sql, bindings)?;
        tokio_postgres::Transaction::query_opt(self, &sql, &params)
            .await
            .map_err(QueryError::from)
    }

    async fn execute(&self, sql: &str, bindings: &BindingSet) -> QueryResult<u64> {
        let (sql, params) = to_positional(sql, bindings)?;
        tokio_postgres::Transaction::execute(self, &sql, &params)
            .await
            .map_err(QueryError::from)
    }

    async fn last_insert_id(&self) -> QueryResult<Option<i64>> {
        match tokio_postgres::Transaction::query_one(self, "SELECT lastval()", &[]).await {
            Ok(row) => Ok(row.try_get::<_, i64>(0).ok()),
            Err(_) => Ok(None),
        }
    }
}
