//! [`Repository`] facade over a model
//!
//! Reads here are unguarded: no filters means every row, matching the CRUD
//! contract rather than the sentinel one.

use super::{Model, TableBinding};
use crate::engine::{Aggregate, Ordering, SelectQuery, StorageEngine};
use crate::error::Error;
use crate::repository::{
    FilterCondition, OrderDirection, Outcome, Pagination, Repository, RepositoryError,
    RepositoryOperation, RepositoryResult, Selection,
};
use crate::value::{Fields, Payload, Record};

fn fail(operation: RepositoryOperation) -> impl FnOnce(Error) -> RepositoryError {
    move |err| RepositoryError::from(err).with_operation(operation)
}

fn by_key<B: TableBinding>(id: i64) -> Selection {
    FilterCondition::eq(B::PRIMARY_KEY, id).into()
}

impl<B, S> Repository<i64, Record, Payload, Payload> for Model<'_, B, S>
where
    B: TableBinding,
    S: StorageEngine,
{
    async fn find_by_id(&self, id: &i64) -> RepositoryResult<Option<Record>> {
        let outcome = self
            .checked()
            .get_by_id(*id, Fields::All)
            .await
            .map_err(fail(RepositoryOperation::FindById))?;
        Ok(outcome.done())
    }

    async fn find_all(
        &self,
        filters: &[FilterCondition],
        order_by: Option<(&str, OrderDirection)>,
        pagination: Option<Pagination>,
    ) -> RepositoryResult<Vec<Record>> {
        let mut query = SelectQuery::new(B::TABLE).filter(Selection::from(filters));
        if let Some((column, direction)) = order_by {
            query = query.order(Ordering::column(column, direction));
        }
        if let Some(window) = pagination {
            query = query.window(window);
        }

        self.engine()
            .select(&query)
            .await
            .map_err(fail(RepositoryOperation::FindAll))
    }

    async fn count(&self, filters: &[FilterCondition]) -> RepositoryResult<u64> {
        let count = self
            .engine()
            .aggregate(B::TABLE, &Selection::from(filters), &Aggregate::Count)
            .await
            .map_err(fail(RepositoryOperation::Count))?;
        Ok(count
            .as_i64()
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or_default())
    }

    async fn exists(&self, id: &i64) -> RepositoryResult<bool> {
        let count = self
            .engine()
            .aggregate(B::TABLE, &by_key::<B>(*id), &Aggregate::Count)
            .await
            .map_err(fail(RepositoryOperation::Exists))?;
        Ok(count.as_i64().is_some_and(|n| n > 0))
    }

    async fn create(&self, data: Payload) -> RepositoryResult<Record> {
        let id = match self
            .checked()
            .add(data)
            .await
            .map_err(fail(RepositoryOperation::Create))?
        {
            Outcome::Done(id) => id,
            _ => {
                return Err(RepositoryError::validation_failed(
                    RepositoryOperation::Create,
                    "payload has no columns",
                )
                .with_entity(B::TABLE, "new"))
            }
        };

        match self.find_by_id(&id).await? {
            Some(record) => Ok(record),
            None => Err(RepositoryError::not_found(B::TABLE, id)
                .with_operation(RepositoryOperation::Create)),
        }
    }

    async fn update(&self, id: &i64, data: Payload) -> RepositoryResult<Record> {
        let affected = match self
            .checked()
            .updates(by_key::<B>(*id), data)
            .await
            .map_err(fail(RepositoryOperation::Update))?
        {
            Outcome::Done(affected) => affected,
            _ => {
                return Err(RepositoryError::validation_failed(
                    RepositoryOperation::Update,
                    "payload has no columns",
                )
                .with_entity(B::TABLE, id.to_string()))
            }
        };
        if affected == 0 {
            return Err(
                RepositoryError::not_found(B::TABLE, id).with_operation(RepositoryOperation::Update)
            );
        }

        self.find_by_id(id).await?.ok_or_else(|| {
            RepositoryError::not_found(B::TABLE, id).with_operation(RepositoryOperation::Update)
        })
    }

    async fn delete(&self, id: &i64) -> RepositoryResult<bool> {
        let removed = self
            .checked()
            .delete_where(by_key::<B>(*id))
            .await
            .map_err(fail(RepositoryOperation::Delete))?;
        Ok(removed.done().is_some_and(|n| n > 0))
    }
}
