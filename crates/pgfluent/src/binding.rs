//! Named-placeholder binding storage.
//!
//! Rendered SQL carries `:name` placeholders; [`BindingSet`] maps each name to
//! its [`Value`]. Names are derived deterministically from clause kind, column
//! and per-column occurrence index, so a statement assembled from several
//! independently-built parts (WHERE, SET, each join) merges without collision.
//!
//! The PostgreSQL connection impls call [`to_positional`] once per statement
//! to rewrite `:name` into the driver's `$n` dialect; placeholder indices are
//! computed in a single scan, never via textual search-and-replace.

use std::collections::HashMap;

use tokio_postgres::types::ToSql;

use crate::error::{QueryError, QueryResult};
use crate::value::Value;

/// Derive a placeholder name from clause kind, column and occurrence index.
///
/// Qualifier separators in the column are normalized to `_` so that
/// `posts.user_id` yields `where_posts_user_id_0`.
pub(crate) fn placeholder(clause: &str, column: &str, index: usize) -> String {
    let column = column.replace(['.', ' '], "_");
    format!("{clause}_{column}_{index}")
}

/// An ordered mapping of placeholder name to bound [`Value`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingSet {
    entries: Vec<(String, Value)>,
}

impl BindingSet {
    /// Create an empty binding set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a value under a placeholder name.
    ///
    /// Names are unique by construction; a repeated name replaces the
    /// earlier binding rather than duplicating it.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Look up a binding by placeholder name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge another set's bindings into this one, preserving order.
    pub fn merge(&mut self, other: &BindingSet) {
        for (name, value) in &other.entries {
            self.insert(name.clone(), value.clone());
        }
    }

    /// Iterate bindings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Drop all bindings.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Rewrite `:name` placeholders into `$n` and collect the parameters in
/// placeholder order.
///
/// Single-quoted string literals and `::` type casts are left untouched.
/// Every placeholder must have a binding; [`QueryError::UnboundPlaceholder`]
/// is unreachable for builder-rendered SQL since names and bindings are
/// derived together.
pub(crate) fn to_positional<'a>(
    sql: &str,
    bindings: &'a BindingSet,
) -> QueryResult<(String, Vec<&'a (dyn ToSql + Sync)>)> {
    let mut out = String::with_capacity(sql.len());
    let mut params: Vec<&'a (dyn ToSql + Sync)> = Vec::with_capacity(bindings.len());
    let mut indices: HashMap<String, usize> = HashMap::new();

    let mut chars = sql.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if c == '\'' {
                in_string = false;
            }
            continue;
        }
        match c {
            '\'' => {
                in_string = true;
                out.push(c);
            }
            ':' => {
                if chars.peek() == Some(&':') {
                    // Postgres cast syntax, not a placeholder.
                    chars.next();
                    out.push_str("::");
                    continue;
                }
                let mut name = String::new();
                while let Some(&n) = chars.peek() {
                    if n == '_' || n.is_ascii_alphanumeric() {
                        name.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    out.push(':');
                    continue;
                }
                let idx = match indices.get(&name) {
                    Some(&idx) => idx,
                    None => {
                        let value = bindings
                            .get(&name)
                            .ok_or_else(|| QueryError::UnboundPlaceholder(name.clone()))?;
                        params.push(value as &(dyn ToSql + Sync));
                        let idx = params.len();
                        indices.insert(name.clone(), idx);
                        idx
                    }
                };
                out.push('$');
                out.push_str(&idx.to_string());
            }
            _ => out.push(c),
        }
    }

    Ok((out, params))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(pairs: &[(&str, Value)]) -> BindingSet {
        let mut b = BindingSet::new();
        for (n, v) in pairs {
            b.insert(*n, v.clone());
        }
        b
    }

    #[test]
    fn placeholder_normalizes_separators() {
        assert_eq!(placeholder("where", "age", 0), "where_age_0");
        assert_eq!(
            placeholder("where", "posts.user_id", 1),
            "where_posts_user_id_1"
        );
    }

    #[test]
    fn merge_preserves_order() {
        let mut a = set(&[("where_age_0", Value::Int(18))]);
        let b = set(&[("join_p_id_0", Value::Int(1))]);
        a.merge(&b);
        let names: Vec<&str> = a.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["where_age_0", "join_p_id_0"]);
    }

    #[test]
    fn rewrite_first_occurrence_order() {
        let b = set(&[
            ("where_age_0", Value::Int(18)),
            ("where_name_0", Value::Text("a".into())),
        ]);
        let (sql, params) =
            to_positional("SELECT * FROM users WHERE age > :where_age_0 AND name = :where_name_0", &b)
                .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM users WHERE age > $1 AND name = $2"
        );
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn rewrite_reuses_repeated_placeholder() {
        let b = set(&[("set_age_0", Value::Int(30))]);
        let (sql, params) = to_positional("SET a = :set_age_0, b = :set_age_0", &b).unwrap();
        assert_eq!(sql, "SET a = $1, b = $1");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn rewrite_skips_string_literals_and_casts() {
        let b = set(&[("where_note_0", Value::Text("x".into()))]);
        let (sql, _) = to_positional(
            "SELECT ':not_a_param' FROM t WHERE note::text = :where_note_0",
            &b,
        )
        .unwrap();
        assert_eq!(
            sql,
            "SELECT ':not_a_param' FROM t WHERE note::text = $1"
        );
    }

    #[test]
    fn rewrite_fails_on_unbound_placeholder() {
        let b = BindingSet::new();
        let err = to_positional("WHERE a = :where_a_0", &b).unwrap_err();
        assert!(matches!(err, QueryError::UnboundPlaceholder(n) if n == "where_a_0"));
    }
}
