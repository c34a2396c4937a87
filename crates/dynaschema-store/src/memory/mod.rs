//! In-memory store engine.
//!
//! [`MemoryStore`] implements [`StoreClient`] entirely in process. It follows
//! the remote store's validation rules closely enough that schema-layer bugs
//! surface in tests: key types are checked, unknown tables and indexes are
//! rejected, and key-condition expressions are parsed rather than trusted.

pub mod key_condition;
pub mod state;
pub mod storage;

use std::sync::Arc;

use tracing::{debug, info};

use dynaschema_model::error::DynamoDBError;
use dynaschema_model::input::{
    BatchWriteItemInput, CreateTableInput, DeleteItemInput, DeleteTableInput, GetItemInput,
    PutItemInput, QueryInput, ScanInput,
};
use dynaschema_model::output::{
    BatchWriteItemOutput, CreateTableOutput, DeleteItemOutput, DeleteTableOutput, GetItemOutput,
    PutItemOutput, QueryOutput, ScanOutput,
};
use dynaschema_model::types::TableStatus;
use dynaschema_model::Item;

use crate::client::{StoreClient, StoreResult};

use self::key_condition::resolve_key_condition;
use self::state::{MemoryTable, StoreState};
use self::storage::extract_primary_key;

/// Maximum number of write requests accepted by one `BatchWriteItem` call.
pub const MAX_BATCH_WRITE_ITEMS: usize = 25;

/// An in-process store. Cloning shares the underlying tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<StoreState>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all existing tables, sorted.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        self.state.table_names()
    }

    fn put(table: &MemoryTable, item: Item) -> StoreResult<()> {
        table.validate_index_keys(&item)?;
        table.storage.put_item(item)?;
        Ok(())
    }

    fn delete(table: &MemoryTable, key: &Item) -> StoreResult<()> {
        let primary_key = exact_key(table, key)?;
        table.storage.delete_item(&primary_key);
        Ok(())
    }
}

/// Parse a key map that must contain exactly the table's key attributes.
fn exact_key(table: &MemoryTable, key: &Item) -> StoreResult<storage::PrimaryKey> {
    let schema = table.storage.key_schema();
    if key.len() != schema.key_count() {
        return Err(DynamoDBError::validation(
            "The provided key element does not match the schema",
        ));
    }
    Ok(extract_primary_key(schema, key)?)
}

#[async_trait::async_trait]
impl StoreClient for MemoryStore {
    async fn create_table(&self, input: CreateTableInput) -> StoreResult<CreateTableOutput> {
        let table = MemoryTable::from_input(input)?;
        let table = self.state.create_table(table)?;
        info!(
            table = %table.name,
            indexes = table.indexes.len(),
            "created table"
        );
        Ok(CreateTableOutput {
            table_description: Some(table.to_description(TableStatus::Active)),
        })
    }

    async fn delete_table(&self, input: DeleteTableInput) -> StoreResult<DeleteTableOutput> {
        let table = self.state.delete_table(&input.table_name)?;
        info!(table = %table.name, "deleted table");
        Ok(DeleteTableOutput {
            table_description: Some(table.to_description(TableStatus::Deleting)),
        })
    }

    async fn get_item(&self, input: GetItemInput) -> StoreResult<GetItemOutput> {
        let table = self.state.require_table(&input.table_name)?;
        let key = exact_key(&table, &input.key)?;
        let item = table.storage.get_item(&key);
        debug!(table = %table.name, found = item.is_some(), "get item");
        Ok(GetItemOutput { item })
    }

    async fn put_item(&self, input: PutItemInput) -> StoreResult<PutItemOutput> {
        let table = self.state.require_table(&input.table_name)?;
        Self::put(&table, input.item)?;
        debug!(table = %table.name, "put item");
        Ok(PutItemOutput {})
    }

    async fn delete_item(&self, input: DeleteItemInput) -> StoreResult<DeleteItemOutput> {
        let table = self.state.require_table(&input.table_name)?;
        Self::delete(&table, &input.key)?;
        debug!(table = %table.name, "delete item");
        Ok(DeleteItemOutput {})
    }

    async fn query(&self, input: QueryInput) -> StoreResult<QueryOutput> {
        let table = self.state.require_table(&input.table_name)?;
        let expression = input.key_condition_expression.as_deref().ok_or_else(|| {
            DynamoDBError::validation("Either the KeyConditions or KeyConditionExpression parameter must be specified in the request")
        })?;
        let schema = table.key_schema_for(input.index_name.as_deref())?;
        let condition = resolve_key_condition(
            expression,
            schema,
            &input.expression_attribute_values,
        )?;
        let forward = input.scan_index_forward.unwrap_or(true);

        let items = if input.index_name.is_some() {
            table.storage.query_index(
                schema,
                &condition.partition_value,
                &condition.sort_conditions,
                forward,
            )
        } else {
            table.storage.query(
                &condition.partition_value,
                &condition.sort_conditions,
                forward,
            )
        };

        let count = i32::try_from(items.len()).unwrap_or(i32::MAX);
        debug!(
            table = %table.name,
            index = input.index_name.as_deref().unwrap_or("-"),
            count,
            "query"
        );
        Ok(QueryOutput {
            items,
            count,
            scanned_count: count,
            last_evaluated_key: Item::new(),
        })
    }

    async fn scan(&self, input: ScanInput) -> StoreResult<ScanOutput> {
        let table = self.state.require_table(&input.table_name)?;
        let items = table.storage.scan();
        let count = i32::try_from(items.len()).unwrap_or(i32::MAX);
        debug!(table = %table.name, count, "scan");
        Ok(ScanOutput {
            items,
            count,
            scanned_count: count,
            last_evaluated_key: Item::new(),
        })
    }

    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> StoreResult<BatchWriteItemOutput> {
        let total: usize = input.request_items.values().map(Vec::len).sum();
        if total == 0 || total > MAX_BATCH_WRITE_ITEMS {
            return Err(DynamoDBError::validation(format!(
                "Too many items requested for the BatchWriteItem call: {total} (must be 1 to {MAX_BATCH_WRITE_ITEMS})"
            )));
        }

        // Resolve every table and shape-check every request before writing anything.
        let mut batches = Vec::with_capacity(input.request_items.len());
        for (table_name, requests) in input.request_items {
            let table = self.state.require_table(&table_name)?;
            for request in &requests {
                match (&request.put_request, &request.delete_request) {
                    (Some(put), None) => {
                        extract_primary_key(table.storage.key_schema(), &put.item)?;
                        table.validate_index_keys(&put.item)?;
                    }
                    (None, Some(delete)) => {
                        exact_key(&table, &delete.key)?;
                    }
                    _ => {
                        return Err(DynamoDBError::validation(
                            "Each WriteRequest must contain exactly one of PutRequest or DeleteRequest",
                        ));
                    }
                }
            }
            batches.push((table, requests));
        }

        for (table, requests) in batches {
            let count = requests.len();
            for request in requests {
                if let Some(put) = request.put_request {
                    Self::put(&table, put.item)?;
                } else if let Some(delete) = request.delete_request {
                    Self::delete(&table, &delete.key)?;
                }
            }
            debug!(table = %table.name, count, "batch write");
        }

        Ok(BatchWriteItemOutput::default())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use dynaschema_model::AttributeValue;
    use dynaschema_model::types::{
        AttributeDefinition, AttributeType, GlobalSecondaryIndex, KeySchemaElement, Projection,
        WriteRequest,
    };

    use super::*;

    fn definition(name: &str) -> AttributeDefinition {
        AttributeDefinition {
            attribute_name: name.to_owned(),
            attribute_type: AttributeType::S,
        }
    }

    fn create_input() -> CreateTableInput {
        CreateTableInput {
            table_name: "app".to_owned(),
            key_schema: vec![KeySchemaElement::hash("pk"), KeySchemaElement::range("sk")],
            attribute_definitions: vec![
                definition("pk"),
                definition("sk"),
                definition("userID"),
            ],
            global_secondary_indexes: vec![GlobalSecondaryIndex {
                index_name: "userID".to_owned(),
                key_schema: vec![
                    KeySchemaElement::hash("userID"),
                    KeySchemaElement::range("pk"),
                ],
                projection: Projection::all(),
                provisioned_throughput: None,
            }],
            ..CreateTableInput::default()
        }
    }

    fn post(sk: &str, user: &str) -> Item {
        Item::from([
            ("pk".to_owned(), AttributeValue::from("post:")),
            ("sk".to_owned(), AttributeValue::from(sk)),
            ("userID".to_owned(), AttributeValue::from(user)),
        ])
    }

    fn key(pk: &str, sk: &str) -> Item {
        Item::from([
            ("pk".to_owned(), AttributeValue::from(pk)),
            ("sk".to_owned(), AttributeValue::from(sk)),
        ])
    }

    async fn store_with_table() -> MemoryStore {
        let store = MemoryStore::new();
        store.create_table(create_input()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_should_reject_duplicate_table() {
        let store = store_with_table().await;
        let err = store.create_table(create_input()).await.unwrap_err();
        assert_eq!(
            err.code,
            dynaschema_model::DynamoDBErrorCode::ResourceInUseException
        );
    }

    #[tokio::test]
    async fn test_should_report_missing_table_on_delete() {
        let store = MemoryStore::new();
        let err = store
            .delete_table(DeleteTableInput {
                table_name: "nope".to_owned(),
            })
            .await
            .unwrap_err();
        assert!(err.is_resource_not_found());
    }

    #[tokio::test]
    async fn test_should_put_and_get_item() {
        let store = store_with_table().await;
        store
            .put_item(PutItemInput {
                table_name: "app".to_owned(),
                item: post("p1", "u1"),
            })
            .await
            .unwrap();
        let out = store
            .get_item(GetItemInput {
                table_name: "app".to_owned(),
                key: key("post:", "p1"),
            })
            .await
            .unwrap();
        assert_eq!(out.item, Some(post("p1", "u1")));
    }

    #[tokio::test]
    async fn test_should_reject_get_with_partial_key() {
        let store = store_with_table().await;
        let mut partial = key("post:", "p1");
        partial.remove("sk");
        let err = store
            .get_item(GetItemInput {
                table_name: "app".to_owned(),
                key: partial,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, dynaschema_model::DynamoDBErrorCode::ValidationException);
    }

    #[tokio::test]
    async fn test_should_reject_index_key_with_wrong_type() {
        let store = store_with_table().await;
        let mut item = post("p1", "u1");
        item.insert("userID".to_owned(), AttributeValue::from(7_i64));
        let err = store
            .put_item(PutItemInput {
                table_name: "app".to_owned(),
                item,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, dynaschema_model::DynamoDBErrorCode::ValidationException);
    }

    #[tokio::test]
    async fn test_should_query_base_table_and_index() {
        let store = store_with_table().await;
        store
            .batch_write_item(BatchWriteItemInput {
                request_items: HashMap::from([(
                    "app".to_owned(),
                    vec![
                        WriteRequest::put(post("abc1", "u1")),
                        WriteRequest::put(post("abd", "u1")),
                        WriteRequest::put(post("abc2", "u2")),
                    ],
                )]),
            })
            .await
            .unwrap();

        let out = store
            .query(QueryInput {
                table_name: "app".to_owned(),
                key_condition_expression: Some(
                    "pk = :pk and begins_with(sk, :beginsWith)".to_owned(),
                ),
                expression_attribute_values: HashMap::from([
                    (":pk".to_owned(), AttributeValue::from("post:")),
                    (":beginsWith".to_owned(), AttributeValue::from("abc")),
                ]),
                ..QueryInput::default()
            })
            .await
            .unwrap();
        assert_eq!(out.count, 2);

        let out = store
            .query(QueryInput {
                table_name: "app".to_owned(),
                index_name: Some("userID".to_owned()),
                key_condition_expression: Some("userID = :userID".to_owned()),
                expression_attribute_values: HashMap::from([(
                    ":userID".to_owned(),
                    AttributeValue::from("u1"),
                )]),
                ..QueryInput::default()
            })
            .await
            .unwrap();
        let keys: Vec<_> = out.items.iter().map(|i| i["sk"].as_s().unwrap()).collect();
        assert_eq!(keys, vec!["abc1", "abd"]);
    }

    #[tokio::test]
    async fn test_should_reject_unknown_index() {
        let store = store_with_table().await;
        let err = store
            .query(QueryInput {
                table_name: "app".to_owned(),
                index_name: Some("missing".to_owned()),
                key_condition_expression: Some("pk = :pk".to_owned()),
                expression_attribute_values: HashMap::from([(
                    ":pk".to_owned(),
                    AttributeValue::from("post:"),
                )]),
                ..QueryInput::default()
            })
            .await
            .unwrap_err();
        assert!(err.message.contains("missing"));
    }

    #[tokio::test]
    async fn test_should_reject_oversized_batch() {
        let store = store_with_table().await;
        let requests = (0..26)
            .map(|i| WriteRequest::put(post(&format!("p{i}"), "u1")))
            .collect();
        let err = store
            .batch_write_item(BatchWriteItemInput {
                request_items: HashMap::from([("app".to_owned(), requests)]),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, dynaschema_model::DynamoDBErrorCode::ValidationException);

        let scan = store
            .scan(ScanInput {
                table_name: "app".to_owned(),
            })
            .await
            .unwrap();
        assert_eq!(scan.count, 0);
    }

    #[tokio::test]
    async fn test_should_delete_item() {
        let store = store_with_table().await;
        store
            .put_item(PutItemInput {
                table_name: "app".to_owned(),
                item: post("p1", "u1"),
            })
            .await
            .unwrap();
        store
            .delete_item(DeleteItemInput {
                table_name: "app".to_owned(),
                key: key("post:", "p1"),
            })
            .await
            .unwrap();
        let out = store
            .get_item(GetItemInput {
                table_name: "app".to_owned(),
                key: key("post:", "p1"),
            })
            .await
            .unwrap();
        assert!(out.item.is_none());
    }
}
