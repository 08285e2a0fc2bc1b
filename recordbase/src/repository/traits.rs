//! Repository trait definition
//!
//! [`Repository`] is a typed CRUD facade using RPITIT (Return Position Impl
//! Trait In Traits). Every [`Model`](crate::model::Model) implements it with
//! `i64` ids, [`Record`](crate::value::Record) entities and
//! [`Payload`](crate::value::Payload) inputs, turning the sentinel contract
//! into explicit `Option`s and [`RepositoryError`]s.
//!
//! # Example
//!
//! ```rust,no_run
//! use recordbase::prelude::*;
//!
//! struct Users;
//! impl TableBinding for Users {
//!     const TABLE: &'static str = "users";
//! }
//!
//! # async fn run(engine: TursoEngine) -> RepositoryResult<()> {
//! let users = Users::model(&engine);
//! let active = users
//!     .find_all(
//!         &[FilterCondition::eq("status", "active")],
//!         Some(("id", OrderDirection::Descending)),
//!         Some(Pagination::first_page(20)),
//!     )
//!     .await?;
//! println!("{} active users", active.len());
//! # Ok(())
//! # }
//! ```

use std::future::Future;

use super::error::RepositoryError;
use super::pagination::{FilterCondition, OrderDirection, Pagination};

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Base repository trait for CRUD operations
///
/// # Type Parameters
///
/// - `Id`: The identifier type for the entity
/// - `Entity`: The type returned from reads
/// - `Create`: The input for creating new entities
/// - `Update`: The input for updating existing entities
pub trait Repository<Id, Entity, Create, Update>: Send + Sync {
    /// Find an entity by its unique identifier
    ///
    /// Returns `Ok(Some(entity))` if found, `Ok(None)` if not found.
    fn find_by_id(&self, id: &Id) -> impl Future<Output = RepositoryResult<Option<Entity>>> + Send;

    /// Find all entities matching every filter
    ///
    /// No filters means every entity.
    fn find_all(
        &self,
        filters: &[FilterCondition],
        order_by: Option<(&str, OrderDirection)>,
        pagination: Option<Pagination>,
    ) -> impl Future<Output = RepositoryResult<Vec<Entity>>> + Send;

    /// Count entities matching every filter
    fn count(&self, filters: &[FilterCondition])
        -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Check if an entity exists by its identifier
    fn exists(&self, id: &Id) -> impl Future<Output = RepositoryResult<bool>> + Send;

    /// Create a new entity and return it as stored
    fn create(&self, data: Create) -> impl Future<Output = RepositoryResult<Entity>> + Send;

    /// Update an existing entity and return it as stored
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` with `NotFound` kind if the entity doesn't exist.
    fn update(&self, id: &Id, data: Update)
        -> impl Future<Output = RepositoryResult<Entity>> + Send;

    /// Delete an entity by its identifier
    ///
    /// Returns `true` if the entity was deleted, `false` if it didn't exist.
    fn delete(&self, id: &Id) -> impl Future<Output = RepositoryResult<bool>> + Send;
}
