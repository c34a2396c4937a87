//! The caller-facing entry point.

use std::sync::Arc;

use dynaschema_model::input::GetItemInput;
use dynaschema_model::output::QueryOutput;
use dynaschema_model::{AttributeValue, Item};
use dynaschema_store::StoreClient;
use tracing::debug;

use crate::condition::{KeyQuery, compile_query};
use crate::config::TableConfig;
use crate::error::{DynaSchemaError, DynaSchemaResult};
use crate::id::{IdGenerator, UlidGenerator};
use crate::model::Model;
use crate::schema::{PARTITION_KEY, SORT_KEY, Schema};
use crate::table::TableAdmin;

/// A schema bound to a table and a store.
///
/// Cheap to clone; every clone shares the same store, schema and id
/// generator.
pub struct DynaSchema<S> {
    store: Arc<S>,
    config: Arc<TableConfig>,
    schema: Arc<Schema>,
    ids: Arc<dyn IdGenerator>,
}

impl<S> Clone for DynaSchema<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
            schema: Arc::clone(&self.schema),
            ids: Arc::clone(&self.ids),
        }
    }
}

impl<S> std::fmt::Debug for DynaSchema<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynaSchema")
            .field("config", &self.config)
            .field("models", &self.schema.models().len())
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}

impl<S: StoreClient> DynaSchema<S> {
    /// Bind `schema` to the table described by `config` in `store`.
    #[must_use]
    pub fn new(config: TableConfig, schema: Schema, store: S) -> Self {
        Self::with_shared_store(config, schema, Arc::new(store))
    }

    /// Like [`new`](Self::new), for a store that is shared elsewhere.
    #[must_use]
    pub fn with_shared_store(config: TableConfig, schema: Schema, store: Arc<S>) -> Self {
        Self {
            store,
            config: Arc::new(config),
            schema: Arc::new(schema),
            ids: Arc::new(UlidGenerator::new()),
        }
    }

    /// Replace the id generator used for generated fields.
    #[must_use]
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// The model called `name`, bound to its partition key.
    ///
    /// # Errors
    ///
    /// Returns [`DynaSchemaError::UnknownModel`] for an unregistered name,
    /// or a validation error when the partition key cannot be computed.
    pub fn model(&self, name: &str) -> DynaSchemaResult<Model<S>> {
        let schema = self
            .schema
            .model(name)
            .ok_or_else(|| DynaSchemaError::UnknownModel(name.to_owned()))?;
        let model = Model::new(
            Arc::clone(&self.store),
            Arc::clone(&self.config),
            Arc::clone(&self.ids),
            Arc::clone(schema),
        )?;
        debug!(model = name, partition_key = %model.partition_key(), "bound model");
        Ok(model)
    }

    /// Table creation and deletion.
    #[must_use]
    pub fn admin(&self) -> TableAdmin<S> {
        TableAdmin::new(
            Arc::clone(&self.store),
            Arc::clone(&self.config),
            Arc::clone(&self.schema),
        )
    }

    /// Query any key pair of the table, including secondary indexes.
    ///
    /// # Errors
    ///
    /// Fails with [`SchemaError::PlaceholderCollision`](crate::error::SchemaError::PlaceholderCollision)
    /// when the partition key is named like a sort-key placeholder, and
    /// propagates store errors.
    pub async fn query(&self, query: &KeyQuery) -> DynaSchemaResult<QueryOutput> {
        let output = self
            .store
            .query(compile_query(&self.config.table_name, query)?)
            .await?;
        Ok(output)
    }

    /// Fetch an item by its full primary key, whatever model it belongs to.
    ///
    /// # Errors
    ///
    /// Propagates store errors.
    pub async fn get(
        &self,
        partition_key: impl Into<AttributeValue>,
        sort_key: impl Into<AttributeValue>,
    ) -> DynaSchemaResult<Option<Item>> {
        let output = self
            .store
            .get_item(GetItemInput {
                table_name: self.config.table_name.clone(),
                key: Item::from([
                    (PARTITION_KEY.to_owned(), partition_key.into()),
                    (SORT_KEY.to_owned(), sort_key.into()),
                ]),
            })
            .await?;
        Ok(output.item)
    }

    /// The underlying store client.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The registered schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The table configuration.
    #[must_use]
    pub fn config(&self) -> &TableConfig {
        &self.config
    }
}
