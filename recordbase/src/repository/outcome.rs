//! Typed results for guarded operations
//!
//! Every model operation first checks its required inputs. When a check fails
//! the operation never reaches the storage engine and reports
//! [`Outcome::Rejected`] with the [`Rejection`] that fired. Single-record reads
//! that run but match nothing report [`Outcome::NotFound`]; collection reads
//! report an empty `Done`. Storage failures are not part of
//! this type; they travel as `Err` next to it.
//!
//! # Example
//!
//! ```rust
//! use recordbase::repository::{Outcome, Rejection};
//!
//! let rejected: Outcome<i64> = Outcome::Rejected(Rejection::EmptyPayload);
//! assert!(rejected.is_rejected());
//! assert_eq!(rejected.into_sentinel(), 0);
//!
//! let done = Outcome::Done(7_i64);
//! assert_eq!(done.done(), Some(7));
//! ```

use std::fmt;

/// The guard clause that refused an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// Identifier was missing, zero or blank
    EmptyId,
    /// Column name was blank
    EmptyColumn,
    /// Value set for a membership lookup was empty
    EmptyValues,
    /// Selection carried no criteria
    EmptySelection,
    /// Mutation payload (or batch of payloads) was empty
    EmptyPayload,
    /// Target field name was blank
    EmptyField,
    /// Counter step cannot be negated within `i64`
    AmountOutOfRange,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "empty_id"),
            Self::EmptyColumn => write!(f, "empty_column"),
            Self::EmptyValues => write!(f, "empty_values"),
            Self::EmptySelection => write!(f, "empty_selection"),
            Self::EmptyPayload => write!(f, "empty_payload"),
            Self::EmptyField => write!(f, "empty_field"),
            Self::AmountOutOfRange => write!(f, "amount_out_of_range"),
        }
    }
}

/// Result of a guarded operation that did not fail in storage
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum Outcome<T> {
    /// The operation ran and produced a value
    Done(T),
    /// The operation ran but nothing matched
    NotFound,
    /// A guard clause refused the input; storage was not contacted
    Rejected(Rejection),
}

impl<T> Outcome<T> {
    /// The produced value, if the operation ran and matched
    pub fn done(self) -> Option<T> {
        match self {
            Self::Done(value) => Some(value),
            Self::NotFound | Self::Rejected(_) => None,
        }
    }

    /// Whether a guard clause refused the input
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Whether the operation ran but matched nothing
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// The rejection reason, if any
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Self::Rejected(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Collapse to the produced value or the given sentinel
    pub fn unwrap_or(self, sentinel: T) -> T {
        self.done().unwrap_or(sentinel)
    }

    /// Transform the produced value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Done(value) => Outcome::Done(f(value)),
            Self::NotFound => Outcome::NotFound,
            Self::Rejected(reason) => Outcome::Rejected(reason),
        }
    }
}

impl<T: Default> Outcome<T> {
    /// Collapse to the produced value or the type's zero value
    ///
    /// This is the compatibility contract: rejected input and "nothing
    /// matched" look the same to the caller.
    pub fn into_sentinel(self) -> T {
        self.done().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Record;

    #[test]
    fn test_rejection_display() {
        assert_eq!(Rejection::EmptyId.to_string(), "empty_id");
        assert_eq!(Rejection::EmptySelection.to_string(), "empty_selection");
        assert_eq!(Rejection::EmptyField.to_string(), "empty_field");
        assert_eq!(
            Rejection::AmountOutOfRange.to_string(),
            "amount_out_of_range"
        );
    }

    #[test]
    fn test_sentinels_hide_the_reason() {
        let rejected: Outcome<Record> = Outcome::Rejected(Rejection::EmptyId);
        let missing: Outcome<Record> = Outcome::NotFound;
        assert_eq!(rejected.into_sentinel(), missing.into_sentinel());
    }

    #[test]
    fn test_typed_outcome_keeps_the_reason() {
        let rejected: Outcome<u64> = Outcome::Rejected(Rejection::EmptySelection);
        assert!(rejected.is_rejected());
        assert!(!rejected.is_not_found());
        assert_eq!(rejected.rejection(), Some(Rejection::EmptySelection));
    }

    #[test]
    fn test_map_preserves_variant() {
        assert_eq!(Outcome::Done(2).map(|n| n * 2), Outcome::Done(4));
        assert_eq!(Outcome::<i32>::NotFound.map(|n| n * 2), Outcome::NotFound);
        assert_eq!(
            Outcome::<i32>::Rejected(Rejection::EmptyField).map(|n| n * 2),
            Outcome::Rejected(Rejection::EmptyField)
        );
    }

    #[test]
    fn test_unwrap_or() {
        assert_eq!(Outcome::Done(5).unwrap_or(0), 5);
        assert_eq!(Outcome::<i32>::NotFound.unwrap_or(-1), -1);
    }
}
