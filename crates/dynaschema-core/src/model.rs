//! Entity-scoped operations.

use std::collections::HashMap;
use std::sync::Arc;

use dynaschema_model::input::{
    BatchWriteItemInput, DeleteItemInput, GetItemInput, PutItemInput, ScanInput,
};
use dynaschema_model::output::{DeleteItemOutput, QueryOutput, ScanOutput};
use dynaschema_model::types::WriteRequest;
use dynaschema_model::{AttributeValue, Item};
use dynaschema_store::StoreClient;
use tracing::{debug, warn};

use crate::condition::{KeyCondition, KeyQuery, compile_query};
use crate::config::TableConfig;
use crate::error::{DynaSchemaError, DynaSchemaResult};
use crate::id::IdGenerator;
use crate::materialize;
use crate::params::Params;
use crate::schema::{ModelSchema, PARTITION_KEY, SORT_KEY};

/// Options for [`Model::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Create the item when nothing is stored under the sort key.
    pub upsert: bool,
}

impl UpdateOptions {
    /// Options with `upsert` enabled.
    #[must_use]
    pub fn upsert() -> Self {
        Self { upsert: true }
    }
}

/// A model bound to its partition key value.
///
/// Obtained from [`DynaSchema::model`](crate::DynaSchema::model). Every
/// operation reads or writes items under this model's partition key.
pub struct Model<S> {
    store: Arc<S>,
    config: Arc<TableConfig>,
    ids: Arc<dyn IdGenerator>,
    schema: Arc<ModelSchema>,
    partition_key: AttributeValue,
}

impl<S> Clone for Model<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
            ids: Arc::clone(&self.ids),
            schema: Arc::clone(&self.schema),
            partition_key: self.partition_key.clone(),
        }
    }
}

impl<S> std::fmt::Debug for Model<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.schema.name())
            .field("table", &self.config.table_name)
            .field("partition_key", &self.partition_key)
            .finish_non_exhaustive()
    }
}

impl<S: StoreClient> Model<S> {
    pub(crate) fn new(
        store: Arc<S>,
        config: Arc<TableConfig>,
        ids: Arc<dyn IdGenerator>,
        schema: Arc<ModelSchema>,
    ) -> DynaSchemaResult<Self> {
        let partition_key = schema.partition_key_value()?;
        Ok(Self {
            store,
            config,
            ids,
            schema,
            partition_key,
        })
    }

    /// Model name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    /// The partition key value every item of this model is stored under.
    #[must_use]
    pub fn partition_key(&self) -> &AttributeValue {
        &self.partition_key
    }

    /// The model's field declarations.
    #[must_use]
    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    fn key(&self, sort_key: AttributeValue) -> Item {
        Item::from([
            (PARTITION_KEY.to_owned(), self.partition_key.clone()),
            (SORT_KEY.to_owned(), sort_key),
        ])
    }

    async fn put(&self, item: Item) -> DynaSchemaResult<()> {
        self.store
            .put_item(PutItemInput {
                table_name: self.config.table_name.clone(),
                item,
            })
            .await?;
        Ok(())
    }

    /// Materialize a new item from `params` and store it.
    ///
    /// # Errors
    ///
    /// Fails on a rejected field value or a store error.
    pub async fn create(&self, params: &Params) -> DynaSchemaResult<Item> {
        let item = materialize::create(&self.schema, params, self.ids.as_ref())?;
        self.put(item.clone()).await?;
        debug!(model = self.name(), table = %self.config.table_name, "created item");
        Ok(item)
    }

    /// Materialize one item per element of `params` and store them in a
    /// single batch write.
    ///
    /// Nothing is written when any element fails validation. Items the
    /// store reports as unprocessed are not retried.
    ///
    /// # Errors
    ///
    /// Fails on a rejected field value or a store error.
    pub async fn create_many(&self, params: &[Params]) -> DynaSchemaResult<Vec<Item>> {
        let items = params
            .iter()
            .map(|p| materialize::create(&self.schema, p, self.ids.as_ref()))
            .collect::<DynaSchemaResult<Vec<_>>>()?;
        if items.is_empty() {
            return Ok(items);
        }

        let requests = items.iter().cloned().map(WriteRequest::put).collect();
        let output = self
            .store
            .batch_write_item(BatchWriteItemInput {
                request_items: HashMap::from([(self.config.table_name.clone(), requests)]),
            })
            .await?;
        let unprocessed: usize = output.unprocessed_items.values().map(Vec::len).sum();
        if unprocessed > 0 {
            warn!(model = self.name(), unprocessed, "batch write left items unprocessed");
        }
        debug!(model = self.name(), count = items.len(), "created items");
        Ok(items)
    }

    /// Fetch the item stored under `sort_key`.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn get(&self, sort_key: impl Into<AttributeValue>) -> DynaSchemaResult<Option<Item>> {
        let output = self
            .store
            .get_item(GetItemInput {
                table_name: self.config.table_name.clone(),
                key: self.key(sort_key.into()),
            })
            .await?;
        Ok(output.item)
    }

    /// Re-materialize the item under `sort_key` with `params` and store it.
    ///
    /// Generated and required values already on the stored item are kept;
    /// key and derived fields are recomputed. The stored item always keeps
    /// the requested sort key. This is a plain read followed by a write.
    ///
    /// # Errors
    ///
    /// Returns [`DynaSchemaError::ItemNotFound`] when nothing is stored under
    /// `sort_key` and `options.upsert` is off, and fails on a rejected field
    /// value or a store error.
    pub async fn update(
        &self,
        sort_key: impl Into<AttributeValue>,
        params: &Params,
        options: UpdateOptions,
    ) -> DynaSchemaResult<Item> {
        let sort_key = sort_key.into();
        let mut params = params.clone();
        params.remove(SORT_KEY);

        let existing = self.get(sort_key.clone()).await?;
        if existing.is_none() && !options.upsert {
            return Err(DynaSchemaError::ItemNotFound {
                model: self.name().to_owned(),
                sort_key: sort_key.to_string(),
            });
        }

        let mut item =
            materialize::update(&self.schema, &params, existing.as_ref(), self.ids.as_ref())?;
        item.insert(SORT_KEY.to_owned(), sort_key);
        item.insert(PARTITION_KEY.to_owned(), self.partition_key.clone());
        self.put(item.clone()).await?;
        debug!(
            model = self.name(),
            upserted = existing.is_none(),
            "updated item"
        );
        Ok(item)
    }

    /// Delete the item stored under `sort_key`.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn delete(
        &self,
        sort_key: impl Into<AttributeValue>,
    ) -> DynaSchemaResult<DeleteItemOutput> {
        let output = self
            .store
            .delete_item(DeleteItemInput {
                table_name: self.config.table_name.clone(),
                key: self.key(sort_key.into()),
            })
            .await?;
        debug!(model = self.name(), "deleted item");
        Ok(output)
    }

    /// Query this model's partition with a sort-key condition.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn query(&self, condition: KeyCondition) -> DynaSchemaResult<QueryOutput> {
        let query = KeyQuery::new(self.partition_key.clone()).sort_key(SORT_KEY, condition);
        let output = self
            .store
            .query(compile_query(&self.config.table_name, &query)?)
            .await?;
        debug!(model = self.name(), count = output.count, "queried items");
        Ok(output)
    }

    /// Scan the whole table.
    ///
    /// The scan is neither filtered by model nor paginated: it returns every
    /// item of every model that the store hands back in one response.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn all(&self) -> DynaSchemaResult<ScanOutput> {
        let output = self
            .store
            .scan(ScanInput {
                table_name: self.config.table_name.clone(),
            })
            .await?;
        debug!(model = self.name(), count = output.count, "scanned table");
        Ok(output)
    }
}
