//! Scalar aggregates and column listing

use super::{CheckedModel, TableBinding};
use crate::engine::{Aggregate, StorageEngine};
use crate::error::Result;
use crate::repository::{Outcome, Rejection, Selection};
use crate::value::Value;

impl<B: TableBinding, S: StorageEngine> CheckedModel<'_, B, S> {
    /// Sum of `field` over matching rows; 0 when nothing matches
    pub async fn get_sum(&self, selection: impl Into<Selection>, field: &str) -> Result<Outcome<Value>> {
        self.column_aggregate("get_sum", selection.into(), field, Aggregate::Sum)
            .await
    }

    /// Maximum of `field` over matching rows; null when nothing matches
    pub async fn get_max(&self, selection: impl Into<Selection>, field: &str) -> Result<Outcome<Value>> {
        self.column_aggregate("get_max", selection.into(), field, Aggregate::Max)
            .await
    }

    /// Number of matching rows
    pub async fn get_num(&self, selection: impl Into<Selection>) -> Result<Outcome<u64>> {
        let selection = selection.into();
        if selection.is_empty() {
            return self.reject("get_num", Rejection::EmptySelection);
        }

        let count = self
            .engine
            .aggregate(B::TABLE, &selection, &Aggregate::Count)
            .await?;
        let count = count
            .as_i64()
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or_default();
        Ok(Outcome::Done(count))
    }

    /// Values of `field` across matching rows, in engine order
    pub async fn get_pluck(
        &self,
        selection: impl Into<Selection>,
        field: &str,
    ) -> Result<Outcome<Vec<Value>>> {
        let selection = selection.into();
        if selection.is_empty() {
            return self.reject("get_pluck", Rejection::EmptySelection);
        }
        if field.trim().is_empty() {
            return self.reject("get_pluck", Rejection::EmptyField);
        }

        let values = self.engine.pluck(B::TABLE, &selection, field).await?;
        Ok(Outcome::Done(values))
    }

    async fn column_aggregate(
        &self,
        operation: &'static str,
        selection: Selection,
        field: &str,
        aggregate: fn(String) -> Aggregate,
    ) -> Result<Outcome<Value>> {
        if selection.is_empty() {
            return self.reject(operation, Rejection::EmptySelection);
        }
        if field.trim().is_empty() {
            return self.reject(operation, Rejection::EmptyField);
        }

        let value = self
            .engine
            .aggregate(B::TABLE, &selection, &aggregate(field.to_string()))
            .await?;
        Ok(Outcome::Done(value))
    }
}
