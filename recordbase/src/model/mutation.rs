//! Inserts, updates, deletes and counters

use super::{CheckedModel, TableBinding};
use crate::engine::StorageEngine;
use crate::error::Result;
use crate::repository::{FilterValue, Outcome, Rejection, Selection};
use crate::value::Payload;

impl<B: TableBinding, S: StorageEngine> CheckedModel<'_, B, S> {
    /// Insert one row and return its generated identifier
    pub async fn add(&self, payload: Payload) -> Result<Outcome<i64>> {
        if payload.is_empty() {
            return self.reject("add", Rejection::EmptyPayload);
        }

        let id = self
            .engine
            .insert_get_id(B::TABLE, B::PRIMARY_KEY, &payload)
            .await?;
        Ok(Outcome::Done(id))
    }

    /// Insert a batch of rows in one statement and return the row count
    ///
    /// An empty batch, or a batch holding an empty payload, is rejected.
    pub async fn adds(&self, payloads: Vec<Payload>) -> Result<Outcome<u64>> {
        if payloads.is_empty() || payloads.iter().any(Payload::is_empty) {
            return self.reject("adds", Rejection::EmptyPayload);
        }

        let inserted = self.engine.insert_many(B::TABLE, &payloads).await?;
        Ok(Outcome::Done(inserted))
    }

    /// Update rows where every `(column, value)` pair holds
    ///
    /// List values match by membership and nulls by `IS NULL`.
    pub async fn many_where_update<I, K, V>(&self, pairs: I, payload: Payload) -> Result<Outcome<u64>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FilterValue>,
    {
        let selection = Selection::equals(
            pairs
                .into_iter()
                .map(|(column, value)| -> (K, FilterValue) { (column, value.into()) }),
        );
        self.update_rows("many_where_update", selection, payload).await
    }

    /// Update rows matching `selection`
    pub async fn updates(
        &self,
        selection: impl Into<Selection>,
        payload: Payload,
    ) -> Result<Outcome<u64>> {
        self.update_rows("updates", selection.into(), payload).await
    }

    async fn update_rows(
        &self,
        operation: &'static str,
        selection: Selection,
        payload: Payload,
    ) -> Result<Outcome<u64>> {
        if selection.is_empty() {
            return self.reject(operation, Rejection::EmptySelection);
        }
        if payload.is_empty() {
            return self.reject(operation, Rejection::EmptyPayload);
        }

        let affected = self.engine.update(B::TABLE, &selection, &payload).await?;
        Ok(Outcome::Done(affected))
    }

    /// Delete rows matching `selection` and return how many went
    pub async fn delete_where(&self, selection: impl Into<Selection>) -> Result<Outcome<u64>> {
        let selection = selection.into();
        if selection.is_empty() {
            return self.reject("delete_where", Rejection::EmptySelection);
        }

        let removed = self.engine.delete(B::TABLE, &selection).await?;
        Ok(Outcome::Done(removed))
    }

    /// Delete every row and restart the identifier sequence
    ///
    /// There is no selection to check; this always empties the table.
    pub async fn truncate(&self) -> Result<()> {
        tracing::debug!(table = B::TABLE, "truncating table");
        self.engine.truncate(B::TABLE).await
    }

    /// Delete rows matching `selection`, then optionally empty the table
    ///
    /// # Warning
    ///
    /// With `reset_sequence` set, every row of the table is removed after the
    /// conditional delete, not just the rows `selection` matched, and the
    /// identifier sequence restarts. The returned count is the conditional
    /// delete's. Prefer [`delete_where`](Self::delete_where) and
    /// [`truncate`](Self::truncate), which say what they do.
    pub async fn del(&self, selection: impl Into<Selection>, reset_sequence: bool) -> Result<Outcome<u64>> {
        let outcome = self.delete_where(selection).await?;
        if reset_sequence && !outcome.is_rejected() {
            self.truncate().await?;
        }
        Ok(outcome)
    }

    /// Add `amount` to `field` in place on rows matching `selection`
    pub async fn increments(
        &self,
        selection: impl Into<Selection>,
        field: &str,
        amount: i64,
    ) -> Result<Outcome<u64>> {
        self.adjust("increments", selection.into(), field, amount).await
    }

    /// Subtract `amount` from `field` in place on rows matching `selection`
    ///
    /// `i64::MIN` has no positive counterpart and is rejected.
    pub async fn decrements(
        &self,
        selection: impl Into<Selection>,
        field: &str,
        amount: i64,
    ) -> Result<Outcome<u64>> {
        match amount.checked_neg() {
            Some(delta) => self.adjust("decrements", selection.into(), field, delta).await,
            None => self.reject("decrements", Rejection::AmountOutOfRange),
        }
    }

    async fn adjust(
        &self,
        operation: &'static str,
        selection: Selection,
        field: &str,
        delta: i64,
    ) -> Result<Outcome<u64>> {
        if selection.is_empty() {
            return self.reject(operation, Rejection::EmptySelection);
        }
        if field.trim().is_empty() {
            return self.reject(operation, Rejection::EmptyField);
        }

        let affected = self.engine.adjust(B::TABLE, &selection, field, delta).await?;
        Ok(Outcome::Done(affected))
    }
}
