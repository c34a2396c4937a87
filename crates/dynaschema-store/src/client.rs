//! The store client seam.
//!
//! [`StoreClient`] is the only way the schema layer talks to the key-value
//! store. It uses `#[async_trait]` because the schema layer holds clients
//! behind `Arc<dyn StoreClient>` as well as generically.

use std::sync::Arc;

use dynaschema_model::error::DynamoDBError;
use dynaschema_model::input::{
    BatchWriteItemInput, CreateTableInput, DeleteItemInput, DeleteTableInput, GetItemInput,
    PutItemInput, QueryInput, ScanInput,
};
use dynaschema_model::output::{
    BatchWriteItemOutput, CreateTableOutput, DeleteItemOutput, DeleteTableOutput, GetItemOutput,
    PutItemOutput, QueryOutput, ScanOutput,
};

/// Result alias for store calls.
pub type StoreResult<T> = Result<T, DynamoDBError>;

/// Asynchronous client for the key-value store.
///
/// Every call is a single request/response exchange. Failures are reported
/// as [`DynamoDBError`] and never retried.
#[async_trait::async_trait]
pub trait StoreClient: Send + Sync + 'static {
    /// Create a table.
    async fn create_table(&self, input: CreateTableInput) -> StoreResult<CreateTableOutput>;

    /// Delete a table. A missing table yields `ResourceNotFoundException`.
    async fn delete_table(&self, input: DeleteTableInput) -> StoreResult<DeleteTableOutput>;

    /// Fetch one item by its full primary key.
    async fn get_item(&self, input: GetItemInput) -> StoreResult<GetItemOutput>;

    /// Insert or replace one item.
    async fn put_item(&self, input: PutItemInput) -> StoreResult<PutItemOutput>;

    /// Remove one item by its full primary key.
    async fn delete_item(&self, input: DeleteItemInput) -> StoreResult<DeleteItemOutput>;

    /// Run a key-condition query on the table or one of its indexes.
    async fn query(&self, input: QueryInput) -> StoreResult<QueryOutput>;

    /// Return every item of a table.
    async fn scan(&self, input: ScanInput) -> StoreResult<ScanOutput>;

    /// Apply a batch of put/delete requests.
    async fn batch_write_item(&self, input: BatchWriteItemInput)
    -> StoreResult<BatchWriteItemOutput>;
}

#[async_trait::async_trait]
impl<T: StoreClient + ?Sized> StoreClient for Arc<T> {
    async fn create_table(&self, input: CreateTableInput) -> StoreResult<CreateTableOutput> {
        (**self).create_table(input).await
    }

    async fn delete_table(&self, input: DeleteTableInput) -> StoreResult<DeleteTableOutput> {
        (**self).delete_table(input).await
    }

    async fn get_item(&self, input: GetItemInput) -> StoreResult<GetItemOutput> {
        (**self).get_item(input).await
    }

    async fn put_item(&self, input: PutItemInput) -> StoreResult<PutItemOutput> {
        (**self).put_item(input).await
    }

    async fn delete_item(&self, input: DeleteItemInput) -> StoreResult<DeleteItemOutput> {
        (**self).delete_item(input).await
    }

    async fn query(&self, input: QueryInput) -> StoreResult<QueryOutput> {
        (**self).query(input).await
    }

    async fn scan(&self, input: ScanInput) -> StoreResult<ScanOutput> {
        (**self).scan(input).await
    }

    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> StoreResult<BatchWriteItemOutput> {
        (**self).batch_write_item(input).await
    }
}
