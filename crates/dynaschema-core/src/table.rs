//! Table administration: deriving the table definition from the schema and
//! creating or deleting the table.

use std::sync::Arc;

use dynaschema_model::AttributeType;
use dynaschema_model::input::{CreateTableInput, DeleteTableInput};
use dynaschema_model::output::{CreateTableOutput, DeleteTableOutput};
use dynaschema_model::types::{
    AttributeDefinition, GlobalSecondaryIndex, KeySchemaElement, LocalSecondaryIndex, Projection,
};
use dynaschema_store::StoreClient;
use tracing::{info, warn};

use crate::config::TableConfig;
use crate::error::DynaSchemaResult;
use crate::schema::{PARTITION_KEY, SORT_KEY, Schema};

/// Attribute definitions for the table's keys and every index key.
///
/// Starts with `pk` and `sk`, then the global index keys, then the local
/// index keys, each name once. Types are inferred from the first model that
/// defines the field.
#[must_use]
pub fn derive_attribute_definitions(schema: &Schema) -> Vec<AttributeDefinition> {
    let mut names: Vec<&str> = vec![PARTITION_KEY, SORT_KEY];
    for gsi in schema.global_indexes() {
        names.push(&gsi.hash_key);
        if let Some(range) = &gsi.range_key {
            names.push(range);
        }
    }
    for lsi in schema.local_indexes() {
        names.push(PARTITION_KEY);
        names.push(&lsi.range_key);
    }

    let mut definitions: Vec<AttributeDefinition> = Vec::with_capacity(names.len());
    for name in names {
        if definitions.iter().any(|d| d.attribute_name == name) {
            continue;
        }
        definitions.push(AttributeDefinition {
            attribute_name: name.to_owned(),
            attribute_type: schema.field_type(name).unwrap_or(AttributeType::S),
        });
    }
    definitions
}

/// The `CreateTable` request for `schema`.
///
/// Indexes project all attributes. Global indexes get the table's capacity.
#[must_use]
pub fn build_create_table_input(config: &TableConfig, schema: &Schema) -> CreateTableInput {
    let global_secondary_indexes = schema
        .global_indexes()
        .iter()
        .map(|gsi| {
            let mut key_schema = vec![KeySchemaElement::hash(gsi.hash_key.clone())];
            if let Some(range) = &gsi.range_key {
                key_schema.push(KeySchemaElement::range(range.clone()));
            }
            GlobalSecondaryIndex {
                index_name: gsi.index_name().to_owned(),
                key_schema,
                projection: Projection::all(),
                provisioned_throughput: Some(config.provisioned_throughput),
            }
        })
        .collect();

    let local_secondary_indexes = schema
        .local_indexes()
        .iter()
        .map(|lsi| LocalSecondaryIndex {
            index_name: lsi.index_name().to_owned(),
            key_schema: vec![
                KeySchemaElement::hash(PARTITION_KEY),
                KeySchemaElement::range(lsi.range_key.clone()),
            ],
            projection: Projection::all(),
        })
        .collect();

    CreateTableInput {
        table_name: config.table_name.clone(),
        key_schema: vec![
            KeySchemaElement::hash(PARTITION_KEY),
            KeySchemaElement::range(SORT_KEY),
        ],
        attribute_definitions: derive_attribute_definitions(schema),
        provisioned_throughput: Some(config.provisioned_throughput),
        global_secondary_indexes,
        local_secondary_indexes,
    }
}

/// Creates and deletes the table.
pub struct TableAdmin<S> {
    store: Arc<S>,
    config: Arc<TableConfig>,
    schema: Arc<Schema>,
}

impl<S> std::fmt::Debug for TableAdmin<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableAdmin")
            .field("table", &self.config.table_name)
            .finish_non_exhaustive()
    }
}

impl<S: StoreClient> TableAdmin<S> {
    pub(crate) fn new(store: Arc<S>, config: Arc<TableConfig>, schema: Arc<Schema>) -> Self {
        Self {
            store,
            config,
            schema,
        }
    }

    /// Create the table with its indexes.
    ///
    /// # Errors
    ///
    /// Propagates the store's error, e.g. when the table already exists.
    pub async fn create_table(&self) -> DynaSchemaResult<CreateTableOutput> {
        let input = build_create_table_input(&self.config, &self.schema);
        let output = self.store.create_table(input).await?;
        info!(
            table = %self.config.table_name,
            global_indexes = self.schema.global_indexes().len(),
            local_indexes = self.schema.local_indexes().len(),
            "created table"
        );
        Ok(output)
    }

    /// Delete the table.
    ///
    /// # Errors
    ///
    /// Propagates the store's error, including a missing table; see
    /// [`delete_table_if_exists`](Self::delete_table_if_exists) to tolerate that.
    pub async fn delete_table(&self) -> DynaSchemaResult<DeleteTableOutput> {
        let output = self
            .store
            .delete_table(DeleteTableInput {
                table_name: self.config.table_name.clone(),
            })
            .await?;
        info!(table = %self.config.table_name, "deleted table");
        Ok(output)
    }

    /// Delete the table, treating a missing table as success.
    ///
    /// Returns whether a table was deleted.
    ///
    /// # Errors
    ///
    /// Propagates every store error other than a missing table.
    pub async fn delete_table_if_exists(&self) -> DynaSchemaResult<bool> {
        match self.delete_table().await {
            Ok(_) => Ok(true),
            Err(e) if e.is_resource_not_found() => {
                warn!(table = %self.config.table_name, "table does not exist");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
