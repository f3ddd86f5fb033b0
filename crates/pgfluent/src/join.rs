//! JOIN sub-builder.
//!
//! A [`JoinClause`] accumulates ON-conditions for a single join and computes
//! its own bindings; the owning builder merges them at finalize. Column-to-
//! column conditions are rendered literally (identifiers are never bound),
//! which is exactly why both sides are validated before being stored.

use std::collections::HashMap;
use std::sync::Arc;

use crate::binding::{BindingSet, placeholder};
use crate::condition::{Connector, validate_operator};
use crate::error::{QueryError, QueryResult};
use crate::schema::SchemaReader;
use crate::value::Value;

/// Join kind whitelist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Outer,
}

impl JoinKind {
    /// Parse a join kind, case-insensitively.
    pub fn parse(s: &str) -> QueryResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INNER" => Ok(JoinKind::Inner),
            "LEFT" => Ok(JoinKind::Left),
            "RIGHT" => Ok(JoinKind::Right),
            "OUTER" => Ok(JoinKind::Outer),
            _ => Err(QueryError::InvalidJoinType(s.to_string())),
        }
    }

    /// SQL spelling, without the trailing `JOIN`.
    pub fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
            JoinKind::Outer => "OUTER",
        }
    }
}

/// Column-to-column ON-condition; both sides rendered literally.
#[derive(Debug, Clone)]
struct ColumnCondition {
    left: String,
    op: &'static str,
    right: String,
    connector: Connector,
}

/// Column-to-value ON-condition; the value is bound via placeholder.
#[derive(Debug, Clone)]
struct ValueCondition {
    column: String,
    op: &'static str,
    placeholder: String,
    connector: Connector,
}

/// Per-join sub-builder.
#[derive(Debug, Clone)]
pub struct JoinClause {
    schema: Arc<SchemaReader>,
    kind: JoinKind,
    table: String,
    alias: Option<String>,
    from_table: String,
    aliases: HashMap<String, String>,
    column_conditions: Vec<ColumnCondition>,
    value_conditions: Vec<ValueCondition>,
    bindings: BindingSet,
}

impl JoinClause {
    pub(crate) fn new(
        schema: Arc<SchemaReader>,
        kind: JoinKind,
        table: String,
        alias: Option<String>,
        from_table: String,
        aliases: HashMap<String, String>,
    ) -> Self {
        Self {
            schema,
            kind,
            table,
            alias,
            from_table,
            aliases,
            column_conditions: Vec::new(),
            value_conditions: Vec::new(),
            bindings: BindingSet::new(),
        }
    }

    /// Add a column-to-column ON-condition (AND-connected).
    ///
    /// Both sides must be fully qualified (`table.column` / `alias.column`).
    pub fn on_column(&mut self, left: &str, op: &str, right: &str) -> QueryResult<&mut Self> {
        self.push_column(left, op, right, Connector::And)
    }

    /// Alias for [`JoinClause::on_column`].
    pub fn and_on_column(&mut self, left: &str, op: &str, right: &str) -> QueryResult<&mut Self> {
        self.push_column(left, op, right, Connector::And)
    }

    /// Add an OR-connected column-to-column ON-condition.
    pub fn or_on_column(&mut self, left: &str, op: &str, right: &str) -> QueryResult<&mut Self> {
        self.push_column(left, op, right, Connector::Or)
    }

    /// Add a column-to-value ON-condition (AND-connected).
    ///
    /// Bare columns resolve against the joined table.
    pub fn on_value(
        &mut self,
        column: &str,
        op: &str,
        value: impl Into<Value>,
    ) -> QueryResult<&mut Self> {
        self.push_value(column, op, value.into(), Connector::And)
    }

    /// Alias for [`JoinClause::on_value`].
    pub fn and_on_value(
        &mut self,
        column: &str,
        op: &str,
        value: impl Into<Value>,
    ) -> QueryResult<&mut Self> {
        self.push_value(column, op, value.into(), Connector::And)
    }

    /// Add an OR-connected column-to-value ON-condition.
    pub fn or_on_value(
        &mut self,
        column: &str,
        op: &str,
        value: impl Into<Value>,
    ) -> QueryResult<&mut Self> {
        self.push_value(column, op, value.into(), Connector::Or)
    }

    /// This join's bindings, merged by the owning builder at finalize.
    pub fn bindings(&self) -> &BindingSet {
        &self.bindings
    }

    /// The table this join was built against.
    pub(crate) fn source_table(&self) -> &str {
        &self.from_table
    }

    /// The joined table.
    pub(crate) fn target_table(&self) -> &str {
        &self.table
    }

    /// Render the join fragment.
    ///
    /// A join with no ON-condition renders as an empty string and is dropped
    /// from the final SQL, so a half-configured join can never degenerate
    /// into a cartesian product.
    pub fn to_sql(&self) -> String {
        if self.column_conditions.is_empty() && self.value_conditions.is_empty() {
            return String::new();
        }

        let mut out = format!("{} JOIN {}", self.kind.as_sql(), self.table);
        if let Some(alias) = &self.alias {
            out.push_str(" AS ");
            out.push_str(alias);
        }
        out.push_str(" ON ");

        let mut first = true;
        for cond in &self.column_conditions {
            if !first {
                out.push(' ');
                out.push_str(cond.connector.as_sql());
                out.push(' ');
            }
            first = false;
            out.push_str(&format!("{} {} {}", cond.left, cond.op, cond.right));
        }
        for cond in &self.value_conditions {
            if !first {
                out.push(' ');
                out.push_str(cond.connector.as_sql());
                out.push(' ');
            }
            first = false;
            out.push_str(&format!("{} {} :{}", cond.column, cond.op, cond.placeholder));
        }
        out
    }

    fn push_column(
        &mut self,
        left: &str,
        op: &str,
        right: &str,
        connector: Connector,
    ) -> QueryResult<&mut Self> {
        let op = validate_operator(op)?;
        for side in [left, right] {
            if !side.contains('.') {
                return Err(QueryError::MalformedIdentifier(side.to_string()));
            }
        }
        self.schema
            .validate_dotted(&[left, right], &self.from_table, &self.aliases)?;
        self.column_conditions.push(ColumnCondition {
            left: left.to_string(),
            op,
            right: right.to_string(),
            connector,
        });
        Ok(self)
    }

    fn push_value(
        &mut self,
        column: &str,
        op: &str,
        value: Value,
        connector: Connector,
    ) -> QueryResult<&mut Self> {
        let op = validate_operator(op)?;
        self.schema
            .validate_dotted(&[column], &self.table, &self.aliases)?;

        let target = self.alias.as_deref().unwrap_or(&self.table);
        let occurrence = self
            .value_conditions
            .iter()
            .filter(|c| c.column == column)
            .count();
        let name = placeholder(&format!("join_{target}"), column, occurrence);

        self.bindings.insert(name.clone(), value);
        self.value_conditions.push(ValueCondition {
            column: column.to_string(),
            op,
            placeholder: name,
            connector,
        });
        Ok(self)
    }
}
