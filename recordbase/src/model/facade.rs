//! Sentinel-returning operations
//!
//! Each method runs its [`CheckedModel`](super::CheckedModel) counterpart and
//! collapses the outcome: rejected input and "nothing matched" both become the
//! type's zero value. Storage errors still come back as `Err`.

use std::collections::HashMap;

use super::{Model, TableBinding};
use crate::engine::StorageEngine;
use crate::error::Result;
use crate::repository::{FilterValue, Outcome, Selection};
use crate::value::{Fields, Payload, Record, Value};

impl<B: TableBinding, S: StorageEngine> Model<'_, B, S> {
    /// Row with primary key `id`, or an empty record
    pub async fn get_by_id(&self, id: impl Into<Value>, fields: impl Into<Fields>) -> Result<Record> {
        self.checked()
            .get_by_id(id, fields)
            .await
            .map(Outcome::into_sentinel)
    }

    /// Rows whose `column` is one of `values`, or an empty list
    pub async fn get_by_ids<I>(
        &self,
        column: &str,
        values: I,
        fields: impl Into<Fields>,
    ) -> Result<Vec<Record>>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.checked()
            .get_by_ids(column, values, fields)
            .await
            .map(Outcome::into_sentinel)
    }

    /// Rows whose `field` is one of `values`, keyed by `key_field`
    pub async fn get_by_ids_to_key<I>(
        &self,
        field: &str,
        values: I,
        key_field: &str,
        fields: impl Into<Fields>,
    ) -> Result<HashMap<Value, Record>>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.checked()
            .get_by_ids_to_key(field, values, key_field, fields)
            .await
            .map(Outcome::into_sentinel)
    }

    /// First row matching `selection`, or an empty record
    pub async fn fetch(&self, selection: impl Into<Selection>, fields: impl Into<Fields>) -> Result<Record> {
        self.checked()
            .fetch(selection, fields)
            .await
            .map(Outcome::into_sentinel)
    }

    /// First row matching `selection` under `order`, or an empty record
    pub async fn fetch_order_by(
        &self,
        selection: impl Into<Selection>,
        fields: impl Into<Fields>,
        order: &str,
    ) -> Result<Record> {
        self.checked()
            .fetch_order_by(selection, fields, order)
            .await
            .map(Outcome::into_sentinel)
    }

    /// One page of matching rows
    pub async fn get_lists(
        &self,
        selection: impl Into<Selection>,
        order: &str,
        fields: impl Into<Fields>,
        page: i64,
        size: u64,
    ) -> Result<Vec<Record>> {
        self.checked()
            .get_lists(selection, order, fields, page, size)
            .await
            .map(Outcome::into_sentinel)
    }

    /// Every matching row; `None` orders by primary key, newest first
    pub async fn get_data(
        &self,
        selection: impl Into<Selection>,
        order: Option<&str>,
        fields: impl Into<Fields>,
    ) -> Result<Vec<Record>> {
        self.checked()
            .get_data(selection, order, fields)
            .await
            .map(Outcome::into_sentinel)
    }

    /// New row's identifier, or 0
    pub async fn add(&self, payload: Payload) -> Result<i64> {
        self.checked().add(payload).await.map(Outcome::into_sentinel)
    }

    /// Number of rows inserted, or 0
    pub async fn adds(&self, payloads: Vec<Payload>) -> Result<u64> {
        self.checked().adds(payloads).await.map(Outcome::into_sentinel)
    }

    /// Rows updated where every pair holds; 0 means nothing changed
    pub async fn many_where_update<I, K, V>(&self, pairs: I, payload: Payload) -> Result<u64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FilterValue>,
    {
        self.checked()
            .many_where_update(pairs, payload)
            .await
            .map(Outcome::into_sentinel)
    }

    /// Rows updated under `selection`; 0 means nothing changed
    pub async fn updates(&self, selection: impl Into<Selection>, payload: Payload) -> Result<u64> {
        self.checked()
            .updates(selection, payload)
            .await
            .map(Outcome::into_sentinel)
    }

    /// Rows deleted under `selection`
    pub async fn delete_where(&self, selection: impl Into<Selection>) -> Result<u64> {
        self.checked()
            .delete_where(selection)
            .await
            .map(Outcome::into_sentinel)
    }

    /// Delete every row and restart the identifier sequence
    pub async fn truncate(&self) -> Result<()> {
        self.checked().truncate().await
    }

    /// Conditional delete, then a full truncate when `reset_sequence` is set
    ///
    /// # Warning
    ///
    /// `reset_sequence` empties the whole table regardless of `selection`.
    /// See [`CheckedModel::del`](super::CheckedModel::del).
    pub async fn del(&self, selection: impl Into<Selection>, reset_sequence: bool) -> Result<u64> {
        self.checked()
            .del(selection, reset_sequence)
            .await
            .map(Outcome::into_sentinel)
    }

    /// Rows whose `field` grew by `amount`
    pub async fn increments(&self, selection: impl Into<Selection>, field: &str, amount: i64) -> Result<u64> {
        self.checked()
            .increments(selection, field, amount)
            .await
            .map(Outcome::into_sentinel)
    }

    /// Rows whose `field` shrank by `amount`
    pub async fn decrements(&self, selection: impl Into<Selection>, field: &str, amount: i64) -> Result<u64> {
        self.checked()
            .decrements(selection, field, amount)
            .await
            .map(Outcome::into_sentinel)
    }

    /// Sum of `field`, or 0
    pub async fn get_sum(&self, selection: impl Into<Selection>, field: &str) -> Result<Value> {
        self.checked()
            .get_sum(selection, field)
            .await
            .map(|outcome| outcome.unwrap_or(Value::Integer(0)))
    }

    /// Maximum of `field`; null over an empty match, 0 on rejected input
    pub async fn get_max(&self, selection: impl Into<Selection>, field: &str) -> Result<Value> {
        self.checked()
            .get_max(selection, field)
            .await
            .map(|outcome| outcome.unwrap_or(Value::Integer(0)))
    }

    /// Number of matching rows
    pub async fn get_num(&self, selection: impl Into<Selection>) -> Result<u64> {
        self.checked()
            .get_num(selection)
            .await
            .map(Outcome::into_sentinel)
    }

    /// Values of `field` across matching rows
    pub async fn get_pluck(&self, selection: impl Into<Selection>, field: &str) -> Result<Vec<Value>> {
        self.checked()
            .get_pluck(selection, field)
            .await
            .map(Outcome::into_sentinel)
    }
}
