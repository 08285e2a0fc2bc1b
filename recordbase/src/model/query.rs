//! Lookups and raw-predicate reads

use std::collections::HashMap;

use super::{CheckedModel, TableBinding};
use crate::engine::{Ordering, SelectQuery, StorageEngine};
use crate::error::Result;
use crate::repository::{FilterCondition, OrderDirection, Outcome, Pagination, Rejection, Selection};
use crate::value::{Fields, Record, Value};

impl<B: TableBinding, S: StorageEngine> CheckedModel<'_, B, S> {
    /// Read one row by primary key
    ///
    /// A blank id (null, zero, `""`, `"0"`) is rejected. Anything else is
    /// coerced to an integer before the lookup.
    pub async fn get_by_id(
        &self,
        id: impl Into<Value>,
        fields: impl Into<Fields>,
    ) -> Result<Outcome<Record>> {
        let id = id.into();
        if id.is_blank() {
            return self.reject("get_by_id", Rejection::EmptyId);
        }

        let query = SelectQuery::new(B::TABLE)
            .fields(fields.into())
            .filter(FilterCondition::eq(B::PRIMARY_KEY, id.coerce_integer()).into())
            .window(Pagination::single());
        self.first(&query).await
    }

    /// Read every row whose `column` is one of `values`, in engine order
    pub async fn get_by_ids<I>(
        &self,
        column: &str,
        values: I,
        fields: impl Into<Fields>,
    ) -> Result<Outcome<Vec<Record>>>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if column.trim().is_empty() {
            return self.reject("get_by_ids", Rejection::EmptyColumn);
        }
        if values.is_empty() {
            return self.reject("get_by_ids", Rejection::EmptyValues);
        }

        let query = SelectQuery::new(B::TABLE)
            .fields(fields.into())
            .filter(FilterCondition::is_in(column, values).into());
        Ok(Outcome::Done(self.engine.select(&query).await?))
    }

    /// Read every row whose `field` is one of `values`, keyed by `key_field`
    ///
    /// An explicit projection is widened to include `key_field` and `field`.
    /// Rows sharing a key overwrite each other in engine order, so the last
    /// one wins. Rows without a `key_field` column are skipped.
    pub async fn get_by_ids_to_key<I>(
        &self,
        field: &str,
        values: I,
        key_field: &str,
        fields: impl Into<Fields>,
    ) -> Result<Outcome<HashMap<Value, Record>>>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        if key_field.trim().is_empty() {
            return self.reject("get_by_ids_to_key", Rejection::EmptyField);
        }

        let fields: Fields = fields.into();
        let fields = fields.including(&[key_field, field]);
        let rows = match self.get_by_ids(field, values, fields).await? {
            Outcome::Done(rows) => rows,
            Outcome::NotFound => return Ok(Outcome::NotFound),
            Outcome::Rejected(reason) => return Ok(Outcome::Rejected(reason)),
        };

        let mut keyed = HashMap::with_capacity(rows.len());
        for row in rows {
            if let Some(key) = row.get(key_field).cloned() {
                keyed.insert(key, row);
            }
        }
        Ok(Outcome::Done(keyed))
    }

    /// First row matching `selection`
    pub async fn fetch(
        &self,
        selection: impl Into<Selection>,
        fields: impl Into<Fields>,
    ) -> Result<Outcome<Record>> {
        let selection = selection.into();
        if selection.is_empty() {
            return self.reject("fetch", Rejection::EmptySelection);
        }

        let query = SelectQuery::new(B::TABLE)
            .fields(fields.into())
            .filter(selection)
            .window(Pagination::single());
        self.first(&query).await
    }

    /// First row matching `selection` under a raw ordering expression
    pub async fn fetch_order_by(
        &self,
        selection: impl Into<Selection>,
        fields: impl Into<Fields>,
        order: &str,
    ) -> Result<Outcome<Record>> {
        let selection = selection.into();
        if selection.is_empty() {
            return self.reject("fetch_order_by", Rejection::EmptySelection);
        }

        let query = SelectQuery::new(B::TABLE)
            .fields(fields.into())
            .filter(selection)
            .order(Ordering::Raw(order.to_string()))
            .window(Pagination::single());
        self.first(&query).await
    }

    /// One page of rows matching `selection`
    ///
    /// `page` is 1-based; pages below 1 read the first page. A blank `order`
    /// leaves the rows in engine order.
    pub async fn get_lists(
        &self,
        selection: impl Into<Selection>,
        order: &str,
        fields: impl Into<Fields>,
        page: i64,
        size: u64,
    ) -> Result<Outcome<Vec<Record>>> {
        let selection = selection.into();
        if selection.is_empty() {
            return self.reject("get_lists", Rejection::EmptySelection);
        }

        let query = SelectQuery::new(B::TABLE)
            .fields(fields.into())
            .filter(selection)
            .order(Ordering::Raw(order.to_string()))
            .window(Pagination::page(page, size));
        Ok(Outcome::Done(self.engine.select(&query).await?))
    }

    /// Every row matching `selection`, newest first unless `order` says otherwise
    pub async fn get_data(
        &self,
        selection: impl Into<Selection>,
        order: Option<&str>,
        fields: impl Into<Fields>,
    ) -> Result<Outcome<Vec<Record>>> {
        let selection = selection.into();
        if selection.is_empty() {
            return self.reject("get_data", Rejection::EmptySelection);
        }

        let order = match order {
            Some(expr) => Ordering::Raw(expr.to_string()),
            None => Ordering::column(B::PRIMARY_KEY, OrderDirection::Descending),
        };
        let query = SelectQuery::new(B::TABLE)
            .fields(fields.into())
            .filter(selection)
            .order(order);
        Ok(Outcome::Done(self.engine.select(&query).await?))
    }

    async fn first(&self, query: &SelectQuery) -> Result<Outcome<Record>> {
        let row = self.engine.select(query).await?.into_iter().next();
        Ok(row.map_or(Outcome::NotFound, Outcome::Done))
    }
}
