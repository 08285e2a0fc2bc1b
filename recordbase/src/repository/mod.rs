//! Typed vocabulary shared by the model layer and storage engines
//!
//! # Features
//!
//! - **Structured predicates**: [`Selection`] built from [`FilterCondition`]s,
//!   conjunctions, disjunctions or a raw escape hatch
//! - **Pagination**: [`Pagination`] page windows translated to offset/limit
//! - **Typed results**: [`Outcome`] and [`Rejection`] for guarded operations
//! - **Generic CRUD**: the [`Repository`] trait and its [`RepositoryError`]

mod error;
mod outcome;
mod pagination;
mod traits;

pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use outcome::{Outcome, Rejection};
pub use pagination::{
    FilterCondition, FilterOperator, FilterValue, OrderDirection, Pagination, Selection,
};
pub use traits::{Repository, RepositoryResult};
