//! Generic record access layer
//!
//! A [`TableBinding`] names an entity's table and primary key. Binding it to
//! a [`StorageEngine`] yields a [`Model`], which provides uniform lookup,
//! filtering, pagination, mutation, aggregation and transaction control for
//! that table.
//!
//! Every operation checks its required inputs first. Input that fails a
//! check never reaches the engine. [`Model`] reports such input with the same
//! zero value it uses for "nothing matched" (an empty record, an empty list,
//! `0`). [`CheckedModel`], reached through [`Model::checked`], reports the
//! same operations as [`Outcome`]s so the two cases can be told apart.
//! Engine failures are never swallowed; they are returned as `Err`.
//!
//! # Example
//!
//! ```rust,no_run
//! use recordbase::prelude::*;
//!
//! struct Users;
//!
//! impl TableBinding for Users {
//!     const TABLE: &'static str = "users";
//! }
//!
//! # async fn run() -> recordbase::error::Result<()> {
//! let engine = TursoEngine::in_memory().await?;
//! let users = Users::model(&engine);
//!
//! let id = users.add(Payload::new().set("name", "ada")).await?;
//! let ada = users.get_by_id(id, "*").await?;
//! assert_eq!(ada.get("name"), Some(&Value::from("ada")));
//!
//! // Rejected input and "not found" look alike here...
//! assert!(users.get_by_id(0, "*").await?.is_empty());
//! // ...but not here
//! assert!(users.checked().get_by_id(0, "*").await?.is_rejected());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::engine::{QueryLog, QueryLogEntry, StorageEngine};
use crate::error::Result;
use crate::repository::{Outcome, Rejection};

mod aggregate;
mod facade;
mod mutation;
mod query;
mod repository;


/// Binds an entity type to its table
pub trait TableBinding {
    /// Table name
    const TABLE: &'static str;

    /// Primary key column
    const PRIMARY_KEY: &'static str = "id";

    /// Access layer for this table on `engine`
    fn model<S: StorageEngine>(engine: &S) -> Model<'_, Self, S>
    where
        Self: Sized,
    {
        Model::new(engine)
    }
}

/// Access layer for one table, reporting guard rejections as zero values
pub struct Model<'e, B, S> {
    engine: &'e S,
    binding: PhantomData<fn() -> B>,
}

/// Access layer for one table, reporting guard rejections as [`Outcome`]s
pub struct CheckedModel<'e, B, S> {
    engine: &'e S,
    binding: PhantomData<fn() -> B>,
}

impl<'e, B: TableBinding, S: StorageEngine> Model<'e, B, S> {
    /// Bind `B`'s table to `engine`
    pub fn new(engine: &'e S) -> Self {
        Self {
            engine,
            binding: PhantomData,
        }
    }

    /// The same operations with typed results
    pub fn checked(&self) -> CheckedModel<'e, B, S> {
        CheckedModel {
            engine: self.engine,
            binding: PhantomData,
        }
    }

    /// The engine this model executes on
    pub fn engine(&self) -> &'e S {
        self.engine
    }

    /// Open a transaction on the engine's session
    ///
    /// Nesting is not tracked; a second `begin_transaction` is passed to the
    /// engine as is.
    pub async fn begin_transaction(&self) -> Result<()> {
        self.engine.begin().await
    }

    /// Commit the session's open transaction
    pub async fn commit(&self) -> Result<()> {
        self.engine.commit().await
    }

    /// Roll back the session's open transaction
    pub async fn roll_back(&self) -> Result<()> {
        self.engine.rollback().await
    }

    /// Start recording statements in the session's log
    pub fn enable_query_log(&self) {
        self.engine.query_log().enable();
    }

    /// Stop recording statements; recorded entries are kept
    pub fn disable_query_log(&self) {
        self.engine.query_log().disable();
    }

    /// Statements recorded so far, oldest first
    pub fn get_query_log(&self) -> Vec<QueryLogEntry> {
        self.engine.query_log().entries()
    }

    /// Drop every recorded statement
    pub fn flush_query_log(&self) {
        self.engine.query_log().flush();
    }

    /// The session's log itself, for sharing with another engine
    pub fn query_log(&self) -> &'e Arc<QueryLog> {
        self.engine.query_log()
    }
}

impl<'e, B: TableBinding, S: StorageEngine> CheckedModel<'e, B, S> {
    /// Bind `B`'s table to `engine`
    pub fn new(engine: &'e S) -> Self {
        Self {
            engine,
            binding: PhantomData,
        }
    }

    /// The same operations with sentinel results
    pub fn sentinel(&self) -> Model<'e, B, S> {
        Model::new(self.engine)
    }

    fn reject<T>(&self, operation: &'static str, reason: Rejection) -> Result<Outcome<T>> {
        tracing::debug!(
            table = B::TABLE,
            operation,
            reason = %reason,
            "rejected before reaching storage"
        );
        Ok(Outcome::Rejected(reason))
    }
}

impl<B, S> Clone for Model<'_, B, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B, S> Copy for Model<'_, B, S> {}

impl<B, S> Clone for CheckedModel<'_, B, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B, S> Copy for CheckedModel<'_, B, S> {}

impl<B: TableBinding, S> fmt::Debug for Model<'_, B, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("table", &B::TABLE)
            .field("primary_key", &B::PRIMARY_KEY)
            .finish()
    }
}

impl<B: TableBinding, S> fmt::Debug for CheckedModel<'_, B, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckedModel")
            .field("table", &B::TABLE)
            .field("primary_key", &B::PRIMARY_KEY)
            .finish()
    }
}
