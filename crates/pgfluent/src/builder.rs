//! Stateful fluent query builder.
//!
//! [`QueryBuilder`] accumulates validated clause fragments into a typed
//! [`QueryState`], renders SQL text with named placeholders, and executes via
//! a [`Connection`]. Every mutator validates its identifiers against the
//! shared [`SchemaReader`] before anything enters builder state, so
//! finalization is pure string assembly with no identifier error paths.
//!
//! Mutators take `&mut self` and return `QueryResult<&mut Self>`: a failed
//! call leaves the builder usable and exactly as it was (validate first,
//! mutate last). Terminal calls (`get`, `first`, `insert`, `update`,
//! `delete`) reset the builder after any attempt that reached the database,
//! so no state leaks into the next statement.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_postgres::Row;

use crate::binding::{BindingSet, placeholder};
use crate::client::Connection;
use crate::condition::{Connector, Direction, OrderBy, Predicate, validate_operator};
use crate::error::{QueryError, QueryResult};
use crate::join::{JoinClause, JoinKind};
use crate::schema::SchemaReader;
use crate::value::Value;

/// A finalized statement: SQL text plus its merged bindings.
#[derive(Debug, Clone)]
pub struct RenderedQuery {
    /// SQL text in the named-placeholder dialect.
    pub sql: String,
    /// Bindings for every placeholder in `sql`.
    pub bindings: BindingSet,
}

/// Accumulated clause state, one typed field per clause kind.
#[derive(Debug, Default)]
struct QueryState {
    table: Option<String>,
    columns: Vec<String>,
    predicates: Vec<Predicate>,
    order_by: Vec<OrderBy>,
    limit: Option<i64>,
    offset: Option<i64>,
    joins: Vec<JoinClause>,
    aliases: HashMap<String, String>,
}

/// Fluent, schema-validated SQL builder.
#[derive(Debug)]
pub struct QueryBuilder {
    schema: Arc<SchemaReader>,
    state: QueryState,
}

impl QueryBuilder {
    /// Create a builder over a shared schema reader.
    pub fn new(schema: Arc<SchemaReader>) -> Self {
        Self {
            schema,
            state: QueryState::default(),
        }
    }

    /// Set the target table. Overwrites on repeat calls.
    pub fn from(&mut self, table: &str) -> QueryResult<&mut Self> {
        self.schema.validate_table(table)?;
        self.state.table = Some(table.to_string());
        Ok(self)
    }

    /// Set the selected columns. `["*"]` (or an empty slice) selects the
    /// wildcard; dotted references are resolved against the from-table and
    /// registered join aliases.
    pub fn select(&mut self, columns: &[&str]) -> QueryResult<&mut Self> {
        let table = self.table()?.to_string();
        if columns.is_empty() || (columns.len() == 1 && columns[0] == "*") {
            self.state.columns.clear();
            return Ok(self);
        }
        self.schema
            .validate_dotted(columns, &table, &self.state.aliases)?;
        self.state.columns = columns.iter().map(|c| c.to_string()).collect();
        Ok(self)
    }

    /// Append an AND-connected WHERE predicate.
    pub fn and_where(
        &mut self,
        column: &str,
        op: &str,
        value: impl Into<Value>,
    ) -> QueryResult<&mut Self> {
        self.push_predicate(column, op, value.into(), Connector::And)
    }

    /// Append an OR-connected WHERE predicate.
    pub fn or_where(
        &mut self,
        column: &str,
        op: &str,
        value: impl Into<Value>,
    ) -> QueryResult<&mut Self> {
        self.push_predicate(column, op, value.into(), Connector::Or)
    }

    /// Append a WHERE predicate with an explicit connector.
    ///
    /// The connector of the first predicate is never rendered.
    pub fn where_with(
        &mut self,
        column: &str,
        op: &str,
        value: impl Into<Value>,
        connector: Connector,
    ) -> QueryResult<&mut Self> {
        self.push_predicate(column, op, value.into(), connector)
    }

    /// Append an ORDER BY entry. `direction` is validated against ASC/DESC.
    pub fn order_by(&mut self, column: &str, direction: &str) -> QueryResult<&mut Self> {
        let direction = Direction::parse(direction)?;
        self.push_order(column, direction)
    }

    /// Append an ascending ORDER BY entry.
    pub fn order_by_asc(&mut self, column: &str) -> QueryResult<&mut Self> {
        self.push_order(column, Direction::Asc)
    }

    /// Append a descending ORDER BY entry.
    pub fn order_by_desc(&mut self, column: &str) -> QueryResult<&mut Self> {
        self.push_order(column, Direction::Desc)
    }

    /// Set LIMIT. Stored as-is; overwrites on repeat calls.
    pub fn limit(&mut self, n: i64) -> &mut Self {
        self.state.limit = Some(n);
        self
    }

    /// Set OFFSET. Stored as-is; rendered only when a LIMIT is also set.
    pub fn offset(&mut self, n: i64) -> &mut Self {
        self.state.offset = Some(n);
        self
    }

    /// Add a join and configure its ON-conditions.
    ///
    /// The joined table, alias and kind are validated before `configure`
    /// runs; the clause (and its alias) is stored only if `configure`
    /// succeeds.
    pub fn join(
        &mut self,
        table: &str,
        alias: Option<&str>,
        kind: &str,
        configure: impl FnOnce(&mut JoinClause) -> QueryResult<()>,
    ) -> QueryResult<&mut Self> {
        let from_table = self.table()?.to_string();
        self.schema.validate_table(table)?;
        let kind = JoinKind::parse(kind)?;

        let mut aliases = self.state.aliases.clone();
        if let Some(alias) = alias {
            aliases.insert(alias.to_string(), table.to_string());
        }

        let mut clause = JoinClause::new(
            self.schema.clone(),
            kind,
            table.to_string(),
            alias.map(|a| a.to_string()),
            from_table,
            aliases,
        );
        configure(&mut clause)?;

        if let Some(alias) = alias {
            self.state
                .aliases
                .insert(alias.to_string(), table.to_string());
        }
        self.state.joins.push(clause);
        Ok(self)
    }

    /// Add an INNER join.
    pub fn inner_join(
        &mut self,
        table: &str,
        configure: impl FnOnce(&mut JoinClause) -> QueryResult<()>,
    ) -> QueryResult<&mut Self> {
        self.join(table, None, "INNER", configure)
    }

    /// Add a LEFT join.
    pub fn left_join(
        &mut self,
        table: &str,
        configure: impl FnOnce(&mut JoinClause) -> QueryResult<()>,
    ) -> QueryResult<&mut Self> {
        self.join(table, None, "LEFT", configure)
    }

    // ==================== Finalizers ====================

    /// Render the accumulated state as a SELECT statement.
    ///
    /// Pure string assembly: never touches the connection, never resets.
    pub fn to_select(&self) -> QueryResult<RenderedQuery> {
        let table = self.table()?;
        let mut bindings = BindingSet::new();
        let mut fragments: Vec<String> = Vec::new();

        let columns = if self.state.columns.is_empty() {
            "*".to_string()
        } else {
            self.state.columns.join(", ")
        };
        fragments.push(format!("SELECT {columns} FROM {table}"));

        for join in &self.state.joins {
            if join.source_table() != table {
                return Err(QueryError::InvalidJoinFragment {
                    table: join.target_table().to_string(),
                });
            }
            let sql = join.to_sql();
            if !sql.is_empty() {
                fragments.push(sql);
                bindings.merge(join.bindings());
            }
        }

        let where_sql = self.render_where(&mut bindings);
        if !where_sql.is_empty() {
            fragments.push(format!("WHERE {where_sql}"));
        }

        if !self.state.order_by.is_empty() {
            let entries: Vec<String> = self
                .state
                .order_by
                .iter()
                .map(|o| format!("{} {}", o.column, o.direction.as_sql()))
                .collect();
            fragments.push(format!("ORDER BY {}", entries.join(", ")));
        }

        if let Some(limit) = self.state.limit {
            fragments.push(format!("LIMIT {limit}"));
            // OFFSET without LIMIT is suppressed entirely.
            if let Some(offset) = self.state.offset {
                fragments.push(format!("OFFSET {offset}"));
            }
        }

        Ok(RenderedQuery {
            sql: fragments.join(" "),
            bindings,
        })
    }

    /// Render the accumulated state as an INSERT statement.
    pub fn to_insert(&self, data: &[(&str, Value)]) -> QueryResult<RenderedQuery> {
        let table = self.table()?;
        let columns: Vec<&str> = data.iter().map(|(c, _)| *c).collect();
        self.schema.validate_columns(&columns, table)?;

        if data.is_empty() {
            return Ok(RenderedQuery {
                sql: format!("INSERT INTO {table} DEFAULT VALUES"),
                bindings: BindingSet::new(),
            });
        }

        let mut bindings = BindingSet::new();
        let mut occurrences: HashMap<&str, usize> = HashMap::new();
        let mut names: Vec<String> = Vec::with_capacity(data.len());
        for (column, value) in data {
            let n = occurrences.entry(column).or_insert(0);
            let name = placeholder("insert", column, *n);
            *n += 1;
            bindings.insert(name.clone(), value.clone());
            names.push(format!(":{name}"));
        }

        Ok(RenderedQuery {
            sql: format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                columns.join(", "),
                names.join(", ")
            ),
            bindings,
        })
    }

    /// Render the accumulated state as an UPDATE statement.
    ///
    /// Requires at least one WHERE predicate; SET and WHERE placeholders
    /// live in disjoint namespaces, so a column used in both never collides.
    pub fn to_update(&self, data: &[(&str, Value)]) -> QueryResult<RenderedQuery> {
        let table = self.table()?;
        if self.state.predicates.is_empty() {
            return Err(QueryError::MissingWhereClause {
                statement: "UPDATE",
            });
        }
        let columns: Vec<&str> = data.iter().map(|(c, _)| *c).collect();
        self.schema.validate_columns(&columns, table)?;

        let mut bindings = BindingSet::new();
        let mut occurrences: HashMap<&str, usize> = HashMap::new();
        let mut sets: Vec<String> = Vec::with_capacity(data.len());
        for (column, value) in data {
            let n = occurrences.entry(column).or_insert(0);
            let name = placeholder("set", column, *n);
            *n += 1;
            bindings.insert(name.clone(), value.clone());
            sets.push(format!("{column} = :{name}"));
        }

        let where_sql = self.render_where(&mut bindings);
        Ok(RenderedQuery {
            sql: format!("UPDATE {table} SET {} WHERE {where_sql}", sets.join(", ")),
            bindings,
        })
    }

    /// Render the accumulated state as a DELETE statement.
    ///
    /// Requires at least one WHERE predicate.
    pub fn to_delete(&self) -> QueryResult<RenderedQuery> {
        let table = self.table()?;
        if self.state.predicates.is_empty() {
            return Err(QueryError::MissingWhereClause {
                statement: "DELETE",
            });
        }
        let mut bindings = BindingSet::new();
        let where_sql = self.render_where(&mut bindings);
        Ok(RenderedQuery {
            sql: format!("DELETE FROM {table} WHERE {where_sql}"),
            bindings,
        })
    }

    // ==================== Execution ====================

    /// Finalize and execute a read; returns all rows.
    pub async fn get(&mut self, conn: &impl Connection) -> QueryResult<Vec<Row>> {
        let rendered = self.to_select()?;
        trace_statement("SELECT", &rendered);
        let result = conn.query(&rendered.sql, &rendered.bindings).await;
        self.reset();
        result
    }

    /// Finalize and execute a read limited to one row.
    pub async fn first(&mut self, conn: &impl Connection) -> QueryResult<Option<Row>> {
        self.limit(1);
        let rendered = self.to_select()?;
        trace_statement("SELECT", &rendered);
        let result = conn.query_opt(&rendered.sql, &rendered.bindings).await;
        self.reset();
        result
    }

    /// Insert a row; returns the affected row count.
    pub async fn insert(
        &mut self,
        conn: &impl Connection,
        data: &[(&str, Value)],
    ) -> QueryResult<u64> {
        let rendered = self.to_insert(data)?;
        trace_statement("INSERT", &rendered);
        let result = conn.execute(&rendered.sql, &rendered.bindings).await;
        self.reset();
        result
    }

    /// Insert a row and ask the connection for the last generated id.
    ///
    /// `None` is the driver's not-supported sentinel.
    pub async fn insert_and_get_id(
        &mut self,
        conn: &impl Connection,
        data: &[(&str, Value)],
    ) -> QueryResult<Option<i64>> {
        let rendered = self.to_insert(data)?;
        trace_statement("INSERT", &rendered);
        let result = match conn.execute(&rendered.sql, &rendered.bindings).await {
            Ok(_) => conn.last_insert_id().await,
            Err(e) => Err(e),
        };
        self.reset();
        result
    }

    /// Update matching rows; returns the affected row count.
    pub async fn update(
        &mut self,
        conn: &impl Connection,
        data: &[(&str, Value)],
    ) -> QueryResult<u64> {
        let rendered = self.to_update(data)?;
        trace_statement("UPDATE", &rendered);
        let result = conn.execute(&rendered.sql, &rendered.bindings).await;
        self.reset();
        result
    }

    /// Delete matching rows; returns the affected row count.
    pub async fn delete(&mut self, conn: &impl Connection) -> QueryResult<u64> {
        let rendered = self.to_delete()?;
        trace_statement("DELETE", &rendered);
        let result = conn.execute(&rendered.sql, &rendered.bindings).await;
        self.reset();
        result
    }

    // ==================== Internals ====================

    fn table(&self) -> QueryResult<&str> {
        self.state
            .table
            .as_deref()
            .ok_or(QueryError::MissingFromClause)
    }

    fn push_predicate(
        &mut self,
        column: &str,
        op: &str,
        value: Value,
        connector: Connector,
    ) -> QueryResult<&mut Self> {
        let table = self.table()?.to_string();
        let op = validate_operator(op)?;
        self.schema
            .validate_dotted(&[column], &table, &self.state.aliases)?;
        self.state.predicates.push(Predicate {
            column: column.to_string(),
            op,
            value,
            connector,
        });
        Ok(self)
    }

    fn push_order(&mut self, column: &str, direction: Direction) -> QueryResult<&mut Self> {
        let table = self.table()?.to_string();
        self.schema
            .validate_dotted(&[column], &table, &self.state.aliases)?;
        self.state.order_by.push(OrderBy {
            column: column.to_string(),
            direction,
        });
        Ok(self)
    }

    /// Render WHERE predicates, binding each value under a derived
    /// placeholder. The occurrence index counts per column, so repeated
    /// columns stay unique.
    fn render_where(&self, bindings: &mut BindingSet) -> String {
        let mut occurrences: HashMap<&str, usize> = HashMap::new();
        let mut out = String::new();
        for (i, predicate) in self.state.predicates.iter().enumerate() {
            let n = occurrences.entry(predicate.column.as_str()).or_insert(0);
            let name = placeholder("where", &predicate.column, *n);
            *n += 1;
            bindings.insert(name.clone(), predicate.value.clone());
            if i > 0 {
                out.push(' ');
                out.push_str(predicate.connector.as_sql());
                out.push(' ');
            }
            out.push_str(&format!("{} {} :{}", predicate.column, predicate.op, name));
        }
        out
    }

    fn reset(&mut self) {
        self.state = QueryState::default();
    }
}

fn trace_statement(kind: &str, rendered: &RenderedQuery) {
    tracing::debug!(
        target: "pgfluent.sql",
        statement = kind,
        bindings = rendered.bindings.len(),
        sql = %rendered.sql,
    );
}
