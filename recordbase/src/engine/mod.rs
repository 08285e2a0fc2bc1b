//! Storage engines
//!
//! A [`StorageEngine`] executes reads, writes and transaction demarcation
//! against persisted rows. An engine value is also the execution context of
//! a logical session: it owns one connection (transactions are scoped to it)
//! and one [`QueryLog`]. Two engines are two independent sessions.
//!
//! # Backends
//!
//! - [`TursoEngine`]: libsql, local file, remote Turso or embedded replica
//!   (`turso` feature, enabled by default)
//! - [`PgEngine`]: PostgreSQL through sqlx (`database` feature)
//!
//! Both compile statements with the shared compiler in [`sql`].

use std::future::Future;
use std::sync::Arc;

use crate::error::Result;
use crate::repository::{OrderDirection, Pagination, Selection};
use crate::value::{Fields, Payload, Record, Value};

mod query_log;
pub mod sql;

#[cfg(feature = "turso")]
mod turso;

#[cfg(feature = "database")]
mod postgres;

pub use query_log::{QueryLog, QueryLogEntry};

#[cfg(feature = "turso")]
pub use turso::TursoEngine;

#[cfg(feature = "database")]
pub use postgres::PgEngine;

/// Row ordering for a read
#[derive(Debug, Clone, PartialEq)]
pub enum Ordering {
    /// An ordering expression in the engine's own syntax, spliced verbatim
    Raw(String),
    /// A single column in the given direction
    Column {
        /// Column to sort on
        column: String,
        /// Sort direction
        direction: OrderDirection,
    },
}

impl Ordering {
    /// Sort on one column
    pub fn column(column: impl Into<String>, direction: OrderDirection) -> Self {
        Self::Column {
            column: column.into(),
            direction,
        }
    }

    /// Whether the ordering would render to nothing
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Raw(expr) => expr.trim().is_empty(),
            Self::Column { column, .. } => column.trim().is_empty(),
        }
    }
}

/// A projected, filtered, ordered and windowed read
///
/// An empty selection reads every row.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    /// Table to read from
    pub table: String,
    /// Columns to project
    pub fields: Fields,
    /// Row criteria
    pub selection: Selection,
    /// Optional ordering
    pub order: Option<Ordering>,
    /// Optional offset/limit window
    pub window: Option<Pagination>,
}

impl SelectQuery {
    /// Read every column of every row of `table`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: Fields::All,
            selection: Selection::All(Vec::new()),
            order: None,
            window: None,
        }
    }

    /// Project the given columns
    #[must_use]
    pub fn fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    /// Restrict to rows matching `selection`
    #[must_use]
    pub fn filter(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Order the rows; empty orderings are ignored
    #[must_use]
    pub fn order(mut self, order: Ordering) -> Self {
        self.order = (!order.is_empty()).then_some(order);
        self
    }

    /// Return only the rows inside `window`
    #[must_use]
    pub fn window(mut self, window: Pagination) -> Self {
        self.window = Some(window);
        self
    }
}

/// Scalar aggregate over the rows matching a selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregate {
    /// Number of matching rows
    Count,
    /// Sum of a column; 0 when nothing matches
    Sum(String),
    /// Maximum of a column; NULL when nothing matches
    Max(String),
}

/// The contract every storage backend fulfils
///
/// Mutations and counter adjustments refuse an empty selection with
/// [`Error::UnsafeStatement`](crate::error::Error::UnsafeStatement); reads and
/// aggregates treat it as "every row". Failures are reported as
/// [`Error::Database`](crate::error::Error::Database) and never retried.
pub trait StorageEngine: Send + Sync {
    /// Materialize the rows matched by `query`
    fn select(&self, query: &SelectQuery) -> impl Future<Output = Result<Vec<Record>>> + Send;

    /// Insert one row and return its generated identifier
    fn insert_get_id(
        &self,
        table: &str,
        primary_key: &str,
        payload: &Payload,
    ) -> impl Future<Output = Result<i64>> + Send;

    /// Insert every payload in one statement and return the number of rows
    ///
    /// All payloads must carry the same set of columns.
    fn insert_many(
        &self,
        table: &str,
        payloads: &[Payload],
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Update matching rows and return how many were affected
    fn update(
        &self,
        table: &str,
        selection: &Selection,
        payload: &Payload,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Delete matching rows and return how many were removed
    fn delete(
        &self,
        table: &str,
        selection: &Selection,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Remove every row and restart the identifier sequence
    fn truncate(&self, table: &str) -> impl Future<Output = Result<()>> + Send;

    /// Add `delta` to `column` in place on matching rows
    fn adjust(
        &self,
        table: &str,
        selection: &Selection,
        column: &str,
        delta: i64,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Compute a scalar aggregate over matching rows
    fn aggregate(
        &self,
        table: &str,
        selection: &Selection,
        aggregate: &Aggregate,
    ) -> impl Future<Output = Result<Value>> + Send;

    /// Values of one column across matching rows, in engine order
    fn pluck(
        &self,
        table: &str,
        selection: &Selection,
        column: &str,
    ) -> impl Future<Output = Result<Vec<Value>>> + Send;

    /// Open a transaction on this session's connection
    fn begin(&self) -> impl Future<Output = Result<()>> + Send;

    /// Commit the open transaction
    fn commit(&self) -> impl Future<Output = Result<()>> + Send;

    /// Roll back the open transaction
    fn rollback(&self) -> impl Future<Output = Result<()>> + Send;

    /// This session's statement log
    fn query_log(&self) -> &Arc<QueryLog>;
}

#[cfg(test)]
pub(crate) mod mock {
    //! Engine double that counts calls and returns canned results

    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Records every call it receives; reads return nothing
    #[derive(Debug, Default)]
    pub struct MockEngine {
        calls: AtomicUsize,
        last: Mutex<Option<String>>,
        log: Arc<QueryLog>,
    }

    impl MockEngine {
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of calls that reached the engine
        pub fn calls(&self) -> usize {
            self.calls.load(AtomicOrdering::SeqCst)
        }

        /// Name of the most recent call
        pub fn last_call(&self) -> Option<String> {
            self.last.lock().unwrap().clone()
        }

        fn hit(&self, name: &str) {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            *self.last.lock().unwrap() = Some(name.to_string());
        }
    }

    impl StorageEngine for MockEngine {
        async fn select(&self, _query: &SelectQuery) -> Result<Vec<Record>> {
            self.hit("select");
            Ok(Vec::new())
        }

        async fn insert_get_id(&self, _: &str, _: &str, _: &Payload) -> Result<i64> {
            self.hit("insert_get_id");
            Ok(1)
        }

        async fn insert_many(&self, _: &str, payloads: &[Payload]) -> Result<u64> {
            self.hit("insert_many");
            Ok(payloads.len() as u64)
        }

        async fn update(&self, _: &str, _: &Selection, _: &Payload) -> Result<u64> {
            self.hit("update");
            Ok(0)
        }

        async fn delete(&self, _: &str, _: &Selection) -> Result<u64> {
            self.hit("delete");
            Ok(0)
        }

        async fn truncate(&self, _: &str) -> Result<()> {
            self.hit("truncate");
            Ok(())
        }

        async fn adjust(&self, _: &str, _: &Selection, _: &str, _: i64) -> Result<u64> {
            self.hit("adjust");
            Ok(0)
        }

        async fn aggregate(&self, _: &str, _: &Selection, _: &Aggregate) -> Result<Value> {
            self.hit("aggregate");
            Ok(Value::Integer(0))
        }

        async fn pluck(&self, _: &str, _: &Selection, _: &str) -> Result<Vec<Value>> {
            self.hit("pluck");
            Ok(Vec::new())
        }

        async fn begin(&self) -> Result<()> {
            self.hit("begin");
            Ok(())
        }

        async fn commit(&self) -> Result<()> {
            self.hit("commit");
            Ok(())
        }

        async fn rollback(&self) -> Result<()> {
            self.hit("rollback");
            Ok(())
        }

        fn query_log(&self) -> &Arc<QueryLog> {
            &self.log
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::FilterCondition;

    #[test]
    fn test_select_query_builder() {
        let query = SelectQuery::new("users")
            .fields(Fields::from(["id", "name"]))
            .filter(FilterCondition::eq("status", "active").into())
            .order(Ordering::column("id", OrderDirection::Descending))
            .window(Pagination::page(2, 10));

        assert_eq!(query.table, "users");
        assert_eq!(query.window, Some(Pagination::new(10, 10)));
        assert!(query.order.is_some());
    }

    #[test]
    fn test_blank_ordering_is_dropped() {
        let query = SelectQuery::new("users").order(Ordering::Raw("  ".into()));
        assert_eq!(query.order, None);
    }

    #[test]
    fn test_new_query_reads_everything() {
        let query = SelectQuery::new("users");
        assert!(query.selection.is_empty());
        assert!(query.fields.is_all());
        assert!(query.window.is_none());
    }
}
