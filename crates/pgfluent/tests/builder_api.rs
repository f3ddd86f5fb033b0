//! End-to-end tests of the public builder API against an in-memory catalog
//! and a recording mock connection. No database required.

use std::sync::{Arc, Mutex};

use pgfluent::{
    BindingSet, Connection, QueryBuilder, QueryError, QueryResult, SchemaReader, StaticCatalog,
    Value,
};
use tokio_postgres::Row;

/// Records every statement handed to it and returns empty results.
#[derive(Default)]
struct RecordingConnection {
    calls: Mutex<Vec<(String, BindingSet)>>,
    fail_execute: bool,
}

impl RecordingConnection {
    fn new() -> Self {
        Self::default()
    }

    fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_execute: true,
        }
    }

    fn calls(&self) -> Vec<(String, BindingSet)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, sql: &str, bindings: &BindingSet) {
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_string(), bindings.clone()));
    }
}

impl Connection for RecordingConnection {
    async fn query(&self, sql: &str, bindings: &BindingSet) -> QueryResult<Vec<Row>> {
        self.record(sql, bindings);
        Ok(Vec::new())
    }

    async fn query_opt(&self, sql: &str, bindings: &BindingSet) -> QueryResult<Option<Row>> {
        self.record(sql, bindings);
        Ok(None)
    }

    async fn execute(&self, sql: &str, bindings: &BindingSet) -> QueryResult<u64> {
        self.record(sql, bindings);
        if self.fail_execute {
            return Err(QueryError::UnboundPlaceholder("simulated failure".into()));
        }
        Ok(1)
    }

    async fn last_insert_id(&self) -> QueryResult<Option<i64>> {
        Ok(Some(42))
    }
}

/// Refuses to be called at all; proves guards fire before the connection.
struct UnreachableConnection;

impl Connection for UnreachableConnection {
    async fn query(&self, _sql: &str, _bindings: &BindingSet) -> QueryResult<Vec<Row>> {
        panic!("connection must not be reached");
    }

    async fn query_opt(&self, _sql: &str, _bindings: &BindingSet) -> QueryResult<Option<Row>> {
        panic!("connection must not be reached");
    }

    async fn execute(&self, _sql: &str, _bindings: &BindingSet) -> QueryResult<u64> {
        panic!("connection must not be reached");
    }
}

fn schema() -> Arc<SchemaReader> {
    Arc::new(SchemaReader::new(
        StaticCatalog::new()
            .with_table("users", &["id", "name", "age"])
            .with_table("posts", &["id", "user_id", "title"]),
    ))
}

#[tokio::test]
async fn select_chain_renders_and_binds() {
    let conn = RecordingConnection::new();
    let mut qb = QueryBuilder::new(schema());

    let rows = qb
        .from("users")
        .unwrap()
        .select(&["*"])
        .unwrap()
        .and_where("age", ">", 18)
        .unwrap()
        .order_by_asc("name")
        .unwrap()
        .limit(10)
        .get(&conn)
        .await
        .unwrap();
    assert!(rows.is_empty());

    let calls = conn.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].0,
        "SELECT * FROM users WHERE age > :where_age_0 ORDER BY name ASC LIMIT 10"
    );
    assert_eq!(calls[0].1.get("where_age_0"), Some(&Value::Int(18)));
    assert_eq!(calls[0].1.len(), 1);
}

#[tokio::test]
async fn left_join_merges_zero_bindings() {
    let conn = RecordingConnection::new();
    let mut qb = QueryBuilder::new(schema());

    qb.from("posts")
        .unwrap()
        .join("users", None, "LEFT", |j| {
            j.on_column("posts.user_id", "=", "users.id")?;
            Ok(())
        })
        .unwrap()
        .select(&["posts.title"])
        .unwrap()
        .get(&conn)
        .await
        .unwrap();

    let calls = conn.calls();
    assert_eq!(
        calls[0].0,
        "SELECT posts.title FROM posts LEFT JOIN users ON posts.user_id = users.id"
    );
    assert!(calls[0].1.is_empty());
}

#[tokio::test]
async fn first_forces_limit_one() {
    let conn = RecordingConnection::new();
    let mut qb = QueryBuilder::new(schema());

    let row = qb
        .from("users")
        .unwrap()
        .and_where("id", "=", 7)
        .unwrap()
        .first(&conn)
        .await
        .unwrap();
    assert!(row.is_none());

    let calls = conn.calls();
    assert_eq!(
        calls[0].0,
        "SELECT * FROM users WHERE id = :where_id_0 LIMIT 1"
    );
}

#[tokio::test]
async fn mutations_without_where_never_reach_the_connection() {
    let mut qb = QueryBuilder::new(schema());
    qb.from("users").unwrap();
    let err = qb
        .update(&UnreachableConnection, &[("age", Value::Int(30))])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        QueryError::MissingWhereClause { statement: "UPDATE" }
    ));

    qb.from("users").unwrap();
    let err = qb.delete(&UnreachableConnection).await.unwrap_err();
    assert!(matches!(
        err,
        QueryError::MissingWhereClause { statement: "DELETE" }
    ));
}

#[tokio::test]
async fn update_uses_disjoint_set_and_where_namespaces() {
    let conn = RecordingConnection::new();
    let mut qb = QueryBuilder::new(schema());

    let affected = qb
        .from("users")
        .unwrap()
        .and_where("age", ">", 18)
        .unwrap()
        .update(&conn, &[("age", Value::Int(30))])
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let calls = conn.calls();
    assert_eq!(
        calls[0].0,
        "UPDATE users SET age = :set_age_0 WHERE age > :where_age_0"
    );
    assert_eq!(calls[0].1.get("set_age_0"), Some(&Value::Int(30)));
    assert_eq!(calls[0].1.get("where_age_0"), Some(&Value::Int(18)));
}

#[tokio::test]
async fn insert_and_get_id_returns_driver_id() {
    let conn = RecordingConnection::new();
    let mut qb = QueryBuilder::new(schema());

    let id = qb
        .from("users")
        .unwrap()
        .insert_and_get_id(&conn, &[("name", Value::Text("alice".into()))])
        .await
        .unwrap();
    assert_eq!(id, Some(42));

    let calls = conn.calls();
    assert_eq!(
        calls[0].0,
        "INSERT INTO users (name) VALUES (:insert_name_0)"
    );
}

#[tokio::test]
async fn builder_resets_after_success_and_after_db_failure() {
    let conn = RecordingConnection::new();
    let mut qb = QueryBuilder::new(schema());

    qb.from("users")
        .unwrap()
        .and_where("age", ">", 18)
        .unwrap()
        .get(&conn)
        .await
        .unwrap();
    // State is gone: the next finalize has no from-table.
    assert!(matches!(
        qb.to_select(),
        Err(QueryError::MissingFromClause)
    ));

    let failing = RecordingConnection::failing();
    qb.from("users")
        .unwrap()
        .and_where("id", "=", 1)
        .unwrap();
    assert!(qb.delete(&failing).await.is_err());
    // The statement reached the connection, so state is cleared anyway.
    assert!(matches!(
        qb.to_select(),
        Err(QueryError::MissingFromClause)
    ));
}

#[tokio::test]
async fn bound_values_round_trip() {
    let conn = RecordingConnection::new();
    let mut qb = QueryBuilder::new(schema());

    qb.from("users")
        .unwrap()
        .and_where("name", "=", "alice")
        .unwrap()
        .and_where("age", ">=", 21)
        .unwrap()
        .and_where("age", "<", 99.5)
        .unwrap()
        .get(&conn)
        .await
        .unwrap();

    let calls = conn.calls();
    let bindings = &calls[0].1;
    assert_eq!(
        bindings.get("where_name_0"),
        Some(&Value::Text("alice".to_string()))
    );
    assert_eq!(bindings.get("where_age_0"), Some(&Value::Int(21)));
    assert_eq!(bindings.get("where_age_1"), Some(&Value::Float(99.5)));
}

#[tokio::test]
async fn two_joins_on_same_column_do_not_collide() {
    let schema = Arc::new(SchemaReader::new(
        StaticCatalog::new()
            .with_table("posts", &["id", "author_id", "editor_id", "title"])
            .with_table("users", &["id", "name"]),
    ));
    let conn = RecordingConnection::new();
    let mut qb = QueryBuilder::new(schema);

    qb.from("posts")
        .unwrap()
        .join("users", Some("author"), "INNER", |j| {
            j.on_column("posts.author_id", "=", "author.id")?
                .on_value("author.name", "=", "alice")?;
            Ok(())
        })
        .unwrap()
        .join("users", Some("editor"), "INNER", |j| {
            j.on_column("posts.editor_id", "=", "editor.id")?
                .on_value("editor.name", "=", "bob")?;
            Ok(())
        })
        .unwrap()
        .get(&conn)
        .await
        .unwrap();

    let calls = conn.calls();
    let bindings = &calls[0].1;
    assert_eq!(bindings.len(), 2);
    assert_eq!(
        bindings.get("join_author_author_name_0"),
        Some(&Value::Text("alice".to_string()))
    );
    assert_eq!(
        bindings.get("join_editor_editor_name_0"),
        Some(&Value::Text("bob".to_string()))
    );
}

#[tokio::test]
async fn offset_without_limit_is_suppressed_end_to_end() {
    let conn = RecordingConnection::new();
    let mut qb = QueryBuilder::new(schema());

    qb.from("users").unwrap().offset(5).get(&conn).await.unwrap();
    qb.from("users")
        .unwrap()
        .offset(5)
        .limit(10)
        .get(&conn)
        .await
        .unwrap();

    let calls = conn.calls();
    assert_eq!(calls[0].0, "SELECT * FROM users");
    assert_eq!(calls[1].0, "SELECT * FROM users LIMIT 10 OFFSET 5");
}

#[test]
fn schema_snapshot_validation_is_total() {
    let schema = schema();
    for table in ["users", "posts"] {
        schema.validate_table(table).unwrap();
        for column in schema.column_names(table).unwrap() {
            schema.validate_columns(&[column.as_str()], table).unwrap();
        }
    }
    assert!(schema.validate_table("orders").is_err());
    assert!(schema.validate_columns(&["email"], "users").is_err());
}
