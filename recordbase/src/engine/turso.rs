//! libsql / Turso storage engine

use std::sync::Arc;
use std::time::{Duration, Instant};

use libsql::params::Params;

use super::sql::{self, Dialect, Statement};
use super::{Aggregate, QueryLog, SelectQuery, StorageEngine};
use crate::config::{Config, TursoConfig};
use crate::error::{DatabaseError, DatabaseOperation, Error, Result};
use crate::repository::Selection;
use crate::value::{Payload, Record, Value};

/// A libsql session: one connection plus its statement log
///
/// Cloning the connection out and building a second engine from it shares
/// the connection (and therefore any open transaction); build a second
/// engine from the same [`libsql::Database`] for an independent session.
///
/// # Example
///
/// ```rust,no_run
/// use recordbase::engine::{StorageEngine, TursoEngine};
///
/// # async fn run() -> recordbase::error::Result<()> {
/// let engine = TursoEngine::in_memory().await?;
/// engine
///     .connection()
///     .execute("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)", ())
///     .await?;
/// engine.query_log().enable();
/// # Ok(())
/// # }
/// ```
pub struct TursoEngine {
    conn: libsql::Connection,
    database: Option<Arc<libsql::Database>>,
    log: Arc<QueryLog>,
}

impl std::fmt::Debug for TursoEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TursoEngine")
            .field("owns_database", &self.database.is_some())
            .field("log", &self.log)
            .finish()
    }
}

impl TursoEngine {
    /// Wrap an existing connection with a fresh, disabled statement log
    pub fn new(conn: libsql::Connection) -> Self {
        Self {
            conn,
            database: None,
            log: Arc::new(QueryLog::new()),
        }
    }

    /// Open a private in-memory database
    pub async fn in_memory() -> Result<Self> {
        let database = libsql::Builder::new_local(":memory:").build().await?;
        Self::from_database(Arc::new(database))
    }

    /// Open a new session on `database`
    pub fn from_database(database: Arc<libsql::Database>) -> Result<Self> {
        let conn = database.connect()?;
        Ok(Self {
            conn,
            database: Some(database),
            log: Arc::new(QueryLog::new()),
        })
    }

    /// Open the database described by `config`, retrying per its settings
    pub async fn connect(config: &TursoConfig) -> Result<Self> {
        let database = crate::turso::create_database(config).await?;
        Self::from_database(Arc::new(database))
    }

    /// Open the `[turso]` database of a loaded configuration
    ///
    /// The statement log follows the `[query_log]` section.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let turso = config
            .turso
            .as_ref()
            .ok_or_else(|| Error::Internal("missing [turso] configuration section".into()))?;
        let engine = Self::connect(turso).await?;
        Ok(engine.with_query_log(Arc::new(config.query_log.build())))
    }

    /// Use `log` as this session's statement log
    #[must_use]
    pub fn with_query_log(mut self, log: Arc<QueryLog>) -> Self {
        self.log = log;
        self
    }

    /// The underlying connection, for DDL and anything outside the engine contract
    pub fn connection(&self) -> &libsql::Connection {
        &self.conn
    }

    /// Another independent session on the same database
    ///
    /// Fails for engines built with [`TursoEngine::new`], which do not own a
    /// database handle.
    pub fn session(&self) -> Result<Self> {
        let database = self
            .database
            .clone()
            .ok_or_else(|| Error::Internal("engine does not own a database handle".into()))?;
        Self::from_database(database)
    }

    /// Pull remote changes into an embedded replica
    pub async fn sync(&self) -> Result<()> {
        let database = self
            .database
            .as_ref()
            .ok_or_else(|| Error::Internal("engine does not own a database handle".into()))?;
        let started = Instant::now();
        database
            .sync()
            .await
            .map_err(|e| DatabaseError::sync_failed(e.to_string()))?;
        tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "replica synced");
        Ok(())
    }

    async fn execute(&self, stmt: &Statement, operation: DatabaseOperation) -> Result<u64> {
        let started = Instant::now();
        let affected = self
            .conn
            .execute(&stmt.sql, bind(&stmt.params))
            .await
            .map_err(|e| DatabaseError::from(e).during(operation))?;
        self.trace(stmt, started.elapsed());
        Ok(affected)
    }

    async fn query(&self, stmt: &Statement) -> Result<Vec<Record>> {
        let started = Instant::now();
        let mut rows = self
            .conn
            .query(&stmt.sql, bind(&stmt.params))
            .await
            .map_err(|e| DatabaseError::from(e).during(DatabaseOperation::Query))?;

        let columns: Vec<String> = (0..rows.column_count())
            .map(|i| rows.column_name(i).unwrap_or_default().to_string())
            .collect();

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::from(e).during(DatabaseOperation::Query))?
        {
            let mut record = Record::with_capacity(columns.len());
            for (index, column) in columns.iter().enumerate() {
                let value = row
                    .get_value(index as i32)
                    .map_err(|e| DatabaseError::type_conversion(e.to_string()))?;
                record.insert(column.as_str(), from_libsql(value));
            }
            records.push(record);
        }

        self.trace(stmt, started.elapsed());
        Ok(records)
    }

    async fn scalar(&self, stmt: &Statement) -> Result<Value> {
        let first = self.query(stmt).await?.into_iter().next();
        Ok(first
            .and_then(|record| record.into_iter().next())
            .map(|(_, value)| value)
            .unwrap_or_default())
    }

    fn trace(&self, stmt: &Statement, elapsed: Duration) {
        tracing::debug!(
            sql = %stmt.sql,
            bindings = stmt.params.len(),
            elapsed_us = elapsed.as_micros() as u64,
            "statement executed"
        );
        self.log.record(&stmt.sql, &stmt.params, elapsed);
    }
}

fn bind(params: &[Value]) -> Params {
    if params.is_empty() {
        Params::None
    } else {
        Params::Positional(params.iter().map(to_libsql).collect())
    }
}

fn to_libsql(value: &Value) -> libsql::Value {
    match value {
        Value::Null => libsql::Value::Null,
        Value::Boolean(b) => libsql::Value::Integer(i64::from(*b)),
        Value::Integer(i) => libsql::Value::Integer(*i),
        Value::Real(f) => libsql::Value::Real(*f),
        Value::Text(s) => libsql::Value::Text(s.clone()),
        Value::Blob(b) => libsql::Value::Blob(b.clone()),
    }
}

fn from_libsql(value: libsql::Value) -> Value {
    match value {
        libsql::Value::Null => Value::Null,
        libsql::Value::Integer(i) => Value::Integer(i),
        libsql::Value::Real(f) => Value::Real(f),
        libsql::Value::Text(s) => Value::Text(s),
        libsql::Value::Blob(b) => Value::Blob(b),
    }
}

impl StorageEngine for TursoEngine {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Record>> {
        let stmt = sql::select(Dialect::Sqlite, query)?;
        self.query(&stmt).await
    }

    async fn insert_get_id(&self, table: &str, _primary_key: &str, payload: &Payload) -> Result<i64> {
        let stmt = sql::insert(Dialect::Sqlite, table, payload, None)?;
        self.execute(&stmt, DatabaseOperation::Insert).await?;
        Ok(self.conn.last_insert_rowid())
    }

    async fn insert_many(&self, table: &str, payloads: &[Payload]) -> Result<u64> {
        let stmt = sql::insert_many(Dialect::Sqlite, table, payloads)?;
        self.execute(&stmt, DatabaseOperation::Insert).await
    }

    async fn update(&self, table: &str, selection: &Selection, payload: &Payload) -> Result<u64> {
        let stmt = sql::update(Dialect::Sqlite, table, selection, payload)?;
        self.execute(&stmt, DatabaseOperation::Update).await
    }

    async fn delete(&self, table: &str, selection: &Selection) -> Result<u64> {
        let stmt = sql::delete(Dialect::Sqlite, table, selection)?;
        self.execute(&stmt, DatabaseOperation::Delete).await
    }

    async fn truncate(&self, table: &str) -> Result<()> {
        self.execute(&sql::truncate(Dialect::Sqlite, table), DatabaseOperation::Delete)
            .await?;

        // sqlite_sequence only exists once some table uses AUTOINCREMENT
        let probe = Statement {
            sql: "SELECT 1 FROM \"sqlite_master\" WHERE \"type\" = 'table' AND \"name\" = 'sqlite_sequence'"
                .to_string(),
            params: Vec::new(),
        };
        if !self.query(&probe).await?.is_empty() {
            self.execute(&sql::reset_sequence(table), DatabaseOperation::Delete)
                .await?;
        }
        Ok(())
    }

    async fn adjust(
        &self,
        table: &str,
        selection: &Selection,
        column: &str,
        delta: i64,
    ) -> Result<u64> {
        let stmt = sql::adjust(Dialect::Sqlite, table, selection, column, delta)?;
        self.execute(&stmt, DatabaseOperation::Update).await
    }

    async fn aggregate(
        &self,
        table: &str,
        selection: &Selection,
        aggregate: &Aggregate,
    ) -> Result<Value> {
        let stmt = sql::aggregate(Dialect::Sqlite, table, selection, aggregate)?;
        self.scalar(&stmt).await
    }

    async fn pluck(&self, table: &str, selection: &Selection, column: &str) -> Result<Vec<Value>> {
        let stmt = sql::pluck(Dialect::Sqlite, table, selection, column)?;
        Ok(self
            .query(&stmt)
            .await?
            .into_iter()
            .map(|record| {
                record
                    .into_iter()
                    .next()
                    .map(|(_, value)| value)
                    .unwrap_or_default()
            })
            .collect())
    }

    async fn begin(&self) -> Result<()> {
        self.execute(&transaction("BEGIN"), DatabaseOperation::Transaction)
            .await
            .map(drop)
    }

    async fn commit(&self) -> Result<()> {
        self.execute(&transaction("COMMIT"), DatabaseOperation::Transaction)
            .await
            .map(drop)
    }

    async fn rollback(&self) -> Result<()> {
        self.execute(&transaction("ROLLBACK"), DatabaseOperation::Transaction)
            .await
            .map(drop)
    }

    fn query_log(&self) -> &Arc<QueryLog> {
        &self.log
    }
}

fn transaction(verb: &str) -> Statement {
    Statement {
        sql: verb.to_string(),
        params: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatabaseErrorKind;
    use crate::repository::FilterCondition;

    async fn engine() -> TursoEngine {
        let engine = TursoEngine::in_memory().await.unwrap();
        engine
            .connection()
            .execute(
                "CREATE TABLE items (id INTEGER PRIMARY KEY AUTOINCREMENT, label TEXT, qty INTEGER, price REAL, raw BLOB)",
                (),
            )
            .await
            .unwrap();
        engine
    }

    #[tokio::test]
    async fn test_values_survive_storage() {
        let engine = engine().await;
        let payload = Payload::new()
            .set("label", "bolt")
            .set("qty", 3_i64)
            .set("price", 0.25)
            .set("raw", vec![1_u8, 2, 3]);
        let id = engine.insert_get_id("items", "id", &payload).await.unwrap();
        assert_eq!(id, 1);

        let rows = engine.select(&SelectQuery::new("items")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("label"), Some(&Value::from("bolt")));
        assert_eq!(rows[0].get("qty"), Some(&Value::Integer(3)));
        assert_eq!(rows[0].get("price"), Some(&Value::Real(0.25)));
        assert_eq!(rows[0].get("raw"), Some(&Value::Blob(vec![1, 2, 3])));
    }

    #[tokio::test]
    async fn test_truncate_resets_autoincrement() {
        let engine = engine().await;
        for label in ["a", "b", "c"] {
            engine
                .insert_get_id("items", "id", &Payload::new().set("label", label))
                .await
                .unwrap();
        }

        engine.truncate("items").await.unwrap();
        let count = engine
            .aggregate("items", &Selection::All(vec![]), &Aggregate::Count)
            .await
            .unwrap();
        assert_eq!(count, Value::Integer(0));

        let id = engine
            .insert_get_id("items", "id", &Payload::new().set("label", "d"))
            .await
            .unwrap();
        assert_eq!(id, 1);
    }

    #[tokio::test]
    async fn test_constraint_violation_is_classified() {
        let engine = engine().await;
        engine
            .insert_get_id("items", "id", &Payload::new().set("id", 7_i64))
            .await
            .unwrap();
        let err = engine
            .insert_get_id("items", "id", &Payload::new().set("id", 7_i64))
            .await
            .unwrap_err();

        match err {
            Error::Database(db) => {
                assert_eq!(db.kind, DatabaseErrorKind::ConstraintViolation);
                assert_eq!(db.operation, DatabaseOperation::Insert);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_bad_raw_predicate_propagates() {
        let engine = engine().await;
        let err = engine
            .select(&SelectQuery::new("items").filter(Selection::raw("no_such_column = 1")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let engine = engine().await;
        engine.begin().await.unwrap();
        engine
            .insert_many(
                "items",
                &[
                    Payload::new().set("label", "x"),
                    Payload::new().set("label", "y"),
                ],
            )
            .await
            .unwrap();
        engine.rollback().await.unwrap();

        let count = engine
            .aggregate("items", &Selection::raw("1 = 1"), &Aggregate::Count)
            .await
            .unwrap();
        assert_eq!(count, Value::Integer(0));
    }

    #[tokio::test]
    async fn test_commit_without_begin_is_an_error() {
        let engine = engine().await;
        assert!(engine.commit().await.is_err());
    }

    #[tokio::test]
    async fn test_statements_are_logged_when_enabled() {
        let engine = engine().await;
        engine.query_log().enable();
        engine
            .pluck(
                "items",
                &FilterCondition::gt("qty", 1_i64).into(),
                "label",
            )
            .await
            .unwrap();

        let entries = engine.query_log().entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(
            entries[0].sql,
            r#"SELECT "label" FROM "items" WHERE "qty" > ?1"#
        );
        assert_eq!(entries[0].bindings, vec![Value::Integer(1)]);
    }

    #[tokio::test]
    async fn test_session_is_independent() {
        let dir = tempfile::tempdir().unwrap();
        let engine = TursoEngine::connect(&TursoConfig::local(dir.path().join("s.db")))
            .await
            .unwrap();
        let other = engine.session().unwrap();

        engine.query_log().enable();
        assert!(!other.query_log().is_enabled());
        assert!(!Arc::ptr_eq(engine.query_log(), other.query_log()));
    }
}
