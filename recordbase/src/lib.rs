//! # recordbase
//!
//! Generic record access layer for SQL-backed entities. Bind an entity to its
//! table once and get uniform, guarded operations for lookup, filtering,
//! pagination, mutation, atomic counters, aggregation and transactions.
//!
//! ## Features
//!
//! - **Guarded operations**: missing ids, empty selections and empty payloads
//!   are refused before any statement is built
//! - **Two result contracts**: [`Model`](model::Model) returns zero-value
//!   sentinels; [`CheckedModel`](model::CheckedModel) tells "rejected" apart
//!   from "not found"
//! - **Structured predicates**: [`Selection`](repository::Selection) compiles
//!   to bound parameters, with a raw escape hatch
//! - **Explicit sessions**: each engine value owns its connection, its
//!   transaction and its statement log
//! - **Backends**: libsql/Turso (`turso`, default) and PostgreSQL (`database`)
//!
//! ## Example
//!
//! ```rust,no_run
//! use recordbase::prelude::*;
//!
//! struct Orders;
//!
//! impl TableBinding for Orders {
//!     const TABLE: &'static str = "orders";
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let engine = TursoEngine::from_config(&config).await?;
//!     let orders = Orders::model(&engine);
//!
//!     orders.begin_transaction().await?;
//!     orders.add(Payload::new().set("customer", 7).set("total", 19.5)).await?;
//!     orders.increments("customer = 7", "visits", 1).await?;
//!     orders.commit().await?;
//!
//!     let recent = orders.get_lists("customer = 7", "id desc", "*", 1, 10).await?;
//!     println!("{} recent orders", recent.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod observability;
pub mod repository;
pub mod value;

#[cfg(feature = "database")]
mod database;

#[cfg(feature = "turso")]
mod turso;

/// Commonly used types and traits
pub mod prelude {
    pub use crate::config::{
        Config, DatabaseConfig, LoggingConfig, QueryLogConfig, TursoConfig, TursoMode,
    };

    pub use crate::engine::{QueryLog, QueryLogEntry, StorageEngine};

    #[cfg(feature = "turso")]
    pub use crate::engine::TursoEngine;

    #[cfg(feature = "database")]
    pub use crate::engine::PgEngine;

    pub use crate::error::{
        DatabaseError, DatabaseErrorKind, DatabaseOperation, Error, Result,
    };
    pub use crate::model::{CheckedModel, Model, TableBinding};
    pub use crate::observability::init_tracing;
    pub use crate::repository::{
        FilterCondition, FilterOperator, FilterValue, OrderDirection, Outcome, Pagination,
        Rejection, Repository, RepositoryError, RepositoryErrorKind, RepositoryResult, Selection,
    };
    pub use crate::value::{Fields, Payload, Record, Value};
}
