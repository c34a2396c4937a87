//! Input types for the store operations.
//!
//! All input structs use DynamoDB's `PascalCase` field naming when
//! serialized. Optional fields are omitted when `None`, and empty maps and
//! vectors are omitted too.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::attribute_value::AttributeValue;
use crate::types::{
    AttributeDefinition, GlobalSecondaryIndex, Item, KeySchemaElement, LocalSecondaryIndex,
    ProvisionedThroughput, WriteRequest,
};

// ---------------------------------------------------------------------------
// Table management
// ---------------------------------------------------------------------------

/// Input for the `CreateTable` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTableInput {
    /// The name of the table to create.
    pub table_name: String,

    /// The key schema for the table (partition key and optional sort key).
    pub key_schema: Vec<KeySchemaElement>,

    /// The attribute definitions for the key schema and index key attributes.
    pub attribute_definitions: Vec<AttributeDefinition>,

    /// The provisioned throughput settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned_throughput: Option<ProvisionedThroughput>,

    /// Global secondary indexes to create on the table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_secondary_indexes: Vec<GlobalSecondaryIndex>,

    /// Local secondary indexes to create on the table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_secondary_indexes: Vec<LocalSecondaryIndex>,
}

/// Input for the `DeleteTable` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteTableInput {
    /// The name of the table to delete.
    pub table_name: String,
}

// ---------------------------------------------------------------------------
// Item CRUD
// ---------------------------------------------------------------------------

/// Input for the `PutItem` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutItemInput {
    /// The name of the table to put the item into.
    pub table_name: String,

    /// A map of attribute name/value pairs, one for each attribute.
    pub item: Item,
}

/// Input for the `GetItem` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemInput {
    /// The name of the table containing the item.
    pub table_name: String,

    /// The primary key of the item to retrieve.
    pub key: Item,
}

/// Input for the `DeleteItem` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteItemInput {
    /// The name of the table from which to delete the item.
    pub table_name: String,

    /// The primary key of the item to delete.
    pub key: Item,
}

// ---------------------------------------------------------------------------
// Query & Scan
// ---------------------------------------------------------------------------

/// Input for the `Query` operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryInput {
    /// The name of the table to query.
    pub table_name: String,

    /// The name of a secondary index to query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,

    /// The condition that specifies the key values for items to be retrieved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_condition_expression: Option<String>,

    /// Substitution tokens for attribute values in an expression.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expression_attribute_values: HashMap<String, AttributeValue>,

    /// Specifies the order of index traversal. `true` (default) for ascending,
    /// `false` for descending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_index_forward: Option<bool>,
}

/// Input for the `Scan` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanInput {
    /// The name of the table to scan.
    pub table_name: String,
}

// ---------------------------------------------------------------------------
// Batch operations
// ---------------------------------------------------------------------------

/// Input for the `BatchWriteItem` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchWriteItemInput {
    /// A map of table names to lists of write requests.
    pub request_items: HashMap<String, Vec<WriteRequest>>,
}
