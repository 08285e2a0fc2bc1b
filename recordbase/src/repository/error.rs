//! Repository error types
//!
//! The [`Repository`](super::Repository) facade reports failures as
//! [`RepositoryError`]: which operation failed, what category of failure it
//! was, and which record was involved.
//!
//! # Example
//!
//! ```rust
//! use recordbase::repository::{RepositoryError, RepositoryErrorKind};
//!
//! let error = RepositoryError::not_found("users", 42);
//! assert!(matches!(error.kind, RepositoryErrorKind::NotFound));
//! assert_eq!(error.entity_id.as_deref(), Some("42"));
//! ```

use std::fmt;

use crate::error::{DatabaseErrorKind, DatabaseOperation, Error};

/// Operation being performed when the repository error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Finding a single record by id
    FindById,
    /// Finding records with filters
    FindAll,
    /// Counting records matching filters
    Count,
    /// Checking whether a record exists
    Exists,
    /// Creating a record
    Create,
    /// Updating a record
    Update,
    /// Deleting a record
    Delete,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FindById => write!(f, "find_by_id"),
            Self::FindAll => write!(f, "find_all"),
            Self::Count => write!(f, "count"),
            Self::Exists => write!(f, "exists"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// Record was not found
    NotFound,
    /// Storage constraint violation (unique, foreign key, not null, check)
    ConstraintViolation,
    /// Input was refused before reaching storage
    ValidationFailed,
    /// Failed to reach the storage engine
    ConnectionFailed,
    /// Operation timed out
    Timeout,
    /// Any other storage failure
    DatabaseError,
    /// Other unclassified error
    Other,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::ConstraintViolation => write!(f, "constraint_violation"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::ConnectionFailed => write!(f, "connection_failed"),
            Self::Timeout => write!(f, "timeout"),
            Self::DatabaseError => write!(f, "database_error"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// Structured repository error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The table involved
    pub entity_type: Option<String>,
    /// The id of the record involved
    pub entity_id: Option<String>,
}

impl RepositoryError {
    /// Create a new repository error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// Create a "not found" error for a record of `table`
    pub fn not_found(table: impl Into<String>, id: impl fmt::Display) -> Self {
        Self::new(
            RepositoryOperation::FindById,
            RepositoryErrorKind::NotFound,
            "Record not found",
        )
        .with_entity(table, id.to_string())
    }

    /// Create a validation failed error
    pub fn validation_failed(operation: RepositoryOperation, message: impl Into<String>) -> Self {
        Self::new(operation, RepositoryErrorKind::ValidationFailed, message)
    }

    /// Add record context to an existing error
    #[must_use]
    pub fn with_entity(mut self, table: impl Into<String>, id: impl Into<String>) -> Self {
        self.entity_type = Some(table.into());
        self.entity_id = Some(id.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Check if this error is retriable (transient errors that may succeed on retry)
    ///
    /// Nothing in this crate retries on its own; the flag is for callers.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.kind,
            RepositoryErrorKind::ConnectionFailed | RepositoryErrorKind::Timeout
        )
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(entity_type), Some(entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{}: {}]", entity_type, entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}

// Operation is left at FindAll; callers narrow it with `with_operation`.
impl From<Error> for RepositoryError {
    fn from(err: Error) -> Self {
        let kind = match &err {
            Error::Database(db) => match db.kind {
                DatabaseErrorKind::ConstraintViolation => RepositoryErrorKind::ConstraintViolation,
                DatabaseErrorKind::ConnectionFailed | DatabaseErrorKind::PoolExhausted => {
                    RepositoryErrorKind::ConnectionFailed
                }
                DatabaseErrorKind::Timeout => RepositoryErrorKind::Timeout,
                _ => RepositoryErrorKind::DatabaseError,
            },
            Error::InvalidInput(_) | Error::UnsafeStatement(_) => {
                RepositoryErrorKind::ValidationFailed
            }
            _ => RepositoryErrorKind::Other,
        };

        let operation = match &err {
            Error::Database(db) => match db.operation {
                DatabaseOperation::Insert => RepositoryOperation::Create,
                DatabaseOperation::Update => RepositoryOperation::Update,
                DatabaseOperation::Delete => RepositoryOperation::Delete,
                _ => RepositoryOperation::FindAll,
            },
            _ => RepositoryOperation::FindAll,
        };

        let message = match err {
            Error::Database(db) => db.message,
            other => other.to_string(),
        };

        Self::new(operation, kind, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatabaseError;

    #[test]
    fn test_repository_operation_display() {
        assert_eq!(format!("{}", RepositoryOperation::FindById), "find_by_id");
        assert_eq!(format!("{}", RepositoryOperation::Exists), "exists");
        assert_eq!(format!("{}", RepositoryOperation::Delete), "delete");
    }

    #[test]
    fn test_not_found_carries_entity() {
        let error = RepositoryError::not_found("users", 7);
        assert_eq!(error.operation, RepositoryOperation::FindById);
        assert_eq!(error.kind, RepositoryErrorKind::NotFound);
        assert_eq!(error.entity_type.as_deref(), Some("users"));
        assert_eq!(error.entity_id.as_deref(), Some("7"));
    }

    #[test]
    fn test_with_operation() {
        let error = RepositoryError::not_found("users", 1).with_operation(RepositoryOperation::Update);
        assert_eq!(error.operation, RepositoryOperation::Update);
    }

    #[test]
    fn test_is_retriable() {
        let transient = RepositoryError::new(
            RepositoryOperation::FindAll,
            RepositoryErrorKind::ConnectionFailed,
            "refused",
        );
        assert!(transient.is_retriable());
        assert!(!RepositoryError::not_found("users", 1).is_retriable());
        assert!(
            !RepositoryError::validation_failed(RepositoryOperation::Create, "empty").is_retriable()
        );
    }

    #[test]
    fn test_display_with_entity() {
        let display = RepositoryError::not_found("users", 3).to_string();
        assert!(display.contains("not_found"));
        assert!(display.contains("find_by_id"));
        assert!(display.contains("[users: 3]"));
    }

    #[test]
    fn test_from_constraint_violation() {
        let err = Error::Database(DatabaseError::constraint_violation(
            DatabaseOperation::Insert,
            "UNIQUE constraint failed: users.email",
        ));
        let repo_err = RepositoryError::from(err);
        assert_eq!(repo_err.kind, RepositoryErrorKind::ConstraintViolation);
        assert_eq!(repo_err.operation, RepositoryOperation::Create);
        assert!(repo_err.message.contains("UNIQUE"));
    }

    #[test]
    fn test_from_unsafe_statement() {
        let repo_err = RepositoryError::from(Error::UnsafeStatement("empty selection".into()));
        assert_eq!(repo_err.kind, RepositoryErrorKind::ValidationFailed);
    }
}
