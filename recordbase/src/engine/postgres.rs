//! PostgreSQL storage engine (sqlx)

use std::sync::Arc;
use std::time::{Duration, Instant};

use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row, TypeInfo};
use tokio::sync::Mutex;

use super::sql::{self, Dialect, Statement};
use super::{Aggregate, QueryLog, SelectQuery, StorageEngine};
use crate::config::{Config, DatabaseConfig};
use crate::error::{DatabaseError, DatabaseOperation, Error, Result};
use crate::repository::Selection;
use crate::value::{Payload, Record, Value};

/// A PostgreSQL session: one pooled connection plus its statement log
///
/// The connection is held for the lifetime of the engine so that
/// `BEGIN`/`COMMIT`/`ROLLBACK` apply to every statement in between.
#[derive(Debug)]
pub struct PgEngine {
    conn: Mutex<PoolConnection<Postgres>>,
    log: Arc<QueryLog>,
}

impl PgEngine {
    /// Check a connection out of `pool` for a new session
    pub async fn acquire(pool: &PgPool) -> Result<Self> {
        let conn = pool.acquire().await?;
        Ok(Self {
            conn: Mutex::new(conn),
            log: Arc::new(QueryLog::new()),
        })
    }

    /// Build a pool per `config` (with retries) and open one session on it
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = crate::database::create_pool(config).await?;
        Self::acquire(&pool).await
    }

    /// Open the `[database]` section of a loaded configuration
    ///
    /// The statement log follows the `[query_log]` section.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let database = config
            .database
            .as_ref()
            .ok_or_else(|| Error::Internal("missing [database] configuration section".into()))?;
        let engine = Self::connect(database).await?;
        Ok(engine.with_query_log(Arc::new(config.query_log.build())))
    }

    /// Use `log` as this session's statement log
    #[must_use]
    pub fn with_query_log(mut self, log: Arc<QueryLog>) -> Self {
        self.log = log;
        self
    }

    async fn execute(&self, stmt: &Statement, operation: DatabaseOperation) -> Result<u64> {
        let started = Instant::now();
        let mut conn = self.conn.lock().await;
        let result = bind(stmt)
            .execute(&mut **conn)
            .await
            .map_err(|e| DatabaseError::from(e).during(operation))?;
        drop(conn);
        self.trace(stmt, started.elapsed());
        Ok(result.rows_affected())
    }

    async fn query(&self, stmt: &Statement) -> Result<Vec<Record>> {
        let started = Instant::now();
        let mut conn = self.conn.lock().await;
        let rows = bind(stmt)
            .fetch_all(&mut **conn)
            .await
            .map_err(|e| DatabaseError::from(e).during(DatabaseOperation::Query))?;
        drop(conn);
        self.trace(stmt, started.elapsed());
        rows.iter().map(decode_row).collect()
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

fn bind(stmt: &Statement) -> Query<'_, Postgres, PgArguments> {
    let mut query = sqlx::query(&stmt.sql);
    for value in &stmt.params {
        query = match value {
            // NULL is rendered as a literal by the compiler; kept for completeness
            Value::Null => query.bind(None::<String>),
            Value::Boolean(b) => query.bind(*b),
            Value::Integer(i) => query.bind(*i),
            Value::Real(f) => query.bind(*f),
            Value::Text(s) => query.bind(s.clone()),
            Value::Blob(b) => query.bind(b.clone()),
        };
    }
    query
}

fn decode_row(row: &PgRow) -> Result<Record> {
    let mut record = Record::with_capacity(row.columns().len());
    for column in row.columns() {
        let index = column.ordinal();
        let value = decode_column(row, index, column.type_info().name())
            .map_err(|e| DatabaseError::from(e).add_context(column.name().to_string()))?;
        let value = value.ok_or_else(|| {
            DatabaseError::type_conversion(format!(
                "unsupported column type {} for column {}",
                column.type_info().name(),
                column.name()
            ))
        })?;
        record.insert(column.name(), value);
    }
    Ok(record)
}

/// Decode one column; `Ok(None)` means the column type is not supported
fn decode_column(
    row: &PgRow,
    index: usize,
    type_name: &str,
) -> std::result::Result<Option<Value>, sqlx::Error> {
    use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use sqlx::types::{Decimal, JsonValue, Uuid};

    let value: Value = match type_name {
        "BOOL" => row.try_get::<Option<bool>, _>(index)?.into(),
        "INT2" => row.try_get::<Option<i16>, _>(index)?.map(i64::from).into(),
        "INT4" => row.try_get::<Option<i32>, _>(index)?.map(i64::from).into(),
        "INT8" => row.try_get::<Option<i64>, _>(index)?.into(),
        "FLOAT4" => row.try_get::<Option<f32>, _>(index)?.map(f64::from).into(),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index)?.into(),
        "NUMERIC" => row
            .try_get::<Option<Decimal>, _>(index)?
            .map(|d| numeric(&d.to_string()))
            .unwrap_or_default(),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" => {
            row.try_get::<Option<String>, _>(index)?.into()
        }
        "BYTEA" => row.try_get::<Option<Vec<u8>>, _>(index)?.into(),
        "JSON" | "JSONB" => row
            .try_get::<Option<JsonValue>, _>(index)?
            .map(|json| json.to_string())
            .into(),
        "UUID" => row
            .try_get::<Option<Uuid>, _>(index)?
            .map(|uuid| uuid.to_string())
            .into(),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(index)?
            .map(|date| date.to_string())
            .into(),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)?
            .map(|ts| ts.to_string())
            .into(),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)?
            .map(|ts| ts.to_rfc3339())
            .into(),
        "VOID" => Value::Null,
        _ => return Ok(None),
    };
    Ok(Some(value))
}

/// NUMERIC keeps integers integral; anything fractional becomes a real
fn numeric(text: &str) -> Value {
    if let Ok(i) = text.parse::<i64>() {
        return Value::Integer(i);
    }
    text.parse::<f64>()
        .map(Value::Real)
        .unwrap_or_else(|_| Value::Text(text.to_string()))
}

impl StorageEngine for PgEngine {
    async fn select(&self, query: &SelectQuery) -> Result<Vec<Record>> {
        let stmt = sql::select(Dialect::Postgres, query)?;
        self.query(&stmt).await
    }

    async fn insert_get_id(&self, table: &str, primary_key: &str, payload: &Payload) -> Result<i64> {
        let stmt = sql::insert(Dialect::Postgres, table, payload, Some(primary_key))?;
        let id = self.scalar(&stmt).await.map_err(|err| match err {
            Error::Database(db) => Error::Database(db.during(DatabaseOperation::Insert)),
            other => other,
        })?;
        Ok(id.as_i64().unwrap_or_default())
    }

    async fn insert_many(&self, table: &str, payloads: &[Payload]) -> Result<u64> {
        let stmt = sql::insert_many(Dialect::Postgres, table, payloads)?;
        self.execute(&stmt, DatabaseOperation::Insert).await
    }

    async fn update(&self, table: &str, selection: &Selection, payload: &Payload) -> Result<u64> {
        let stmt = sql::update(Dialect::Postgres, table, selection, payload)?;
        self.execute(&stmt, DatabaseOperation::Update).await
    }

    async fn delete(&self, table: &str, selection: &Selection) -> Result<u64> {
        let stmt = sql::delete(Dialect::Postgres, table, selection)?;
        self.execute(&stmt, DatabaseOperation::Delete).await
    }

    async fn truncate(&self, table: &str) -> Result<()> {
        self.execute(&sql::truncate(Dialect::Postgres, table), DatabaseOperation::Delete)
            .await
            .map(drop)
    }

    async fn adjust(
        &self,
        table: &str,
        selection: &Selection,
        column: &str,
        delta: i64,
    ) -> Result<u64> {
        let stmt = sql::adjust(Dialect::Postgres, table, selection, column, delta)?;
        self.execute(&stmt, DatabaseOperation::Update).await
    }

    async fn aggregate(
        &self,
        table: &str,
        selection: &Selection,
        aggregate: &Aggregate,
    ) -> Result<Value> {
        let stmt = sql::aggregate(Dialect::Postgres, table, selection, aggregate)?;
        self.scalar(&stmt).await
    }

    async fn pluck(&self, table: &str, selection: &Selection, column: &str) -> Result<Vec<Value>> {
        let stmt = sql::pluck(Dialect::Postgres, table, selection, column)?;
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

    #[test]
    fn test_numeric_keeps_integers_integral() {
        assert_eq!(numeric("42"), Value::Integer(42));
        assert_eq!(numeric("-7"), Value::Integer(-7));
        assert_eq!(numeric("12.50"), Value::Real(12.5));
    }

    #[test]
    fn test_numeric_out_of_range_falls_back() {
        assert_eq!(
            numeric("123456789012345678901234567890"),
            Value::Real(123456789012345678901234567890.0)
        );
    }
}
