//! Output types for the store operations.
//!
//! All output structs use DynamoDB's `PascalCase` field naming when
//! serialized. Absent fields deserialize to their defaults.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{Item, TableDescription, WriteRequest};

// ---------------------------------------------------------------------------
// Table management
// ---------------------------------------------------------------------------

/// Output for the `CreateTable` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTableOutput {
    /// The properties of the newly created table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_description: Option<TableDescription>,
}

/// Output for the `DeleteTable` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteTableOutput {
    /// The properties of the table that was deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_description: Option<TableDescription>,
}

// ---------------------------------------------------------------------------
// Item CRUD
// ---------------------------------------------------------------------------

/// Output for the `PutItem` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutItemOutput {}

/// Output for the `GetItem` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetItemOutput {
    /// The item, or `None` when no item matches the key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<Item>,
}

/// Output for the `DeleteItem` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteItemOutput {}

// ---------------------------------------------------------------------------
// Query & Scan
// ---------------------------------------------------------------------------

/// Output for the `Query` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueryOutput {
    /// The items that match the key condition.
    #[serde(default)]
    pub items: Vec<Item>,

    /// The number of items in the response.
    #[serde(default)]
    pub count: i32,

    /// The number of items evaluated.
    #[serde(default)]
    pub scanned_count: i32,

    /// The primary key where the query stopped, when the endpoint truncated
    /// the result. Never followed by this library.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub last_evaluated_key: Item,
}

/// Output for the `Scan` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScanOutput {
    /// Every item in the table.
    #[serde(default)]
    pub items: Vec<Item>,

    /// The number of items in the response.
    #[serde(default)]
    pub count: i32,

    /// The number of items evaluated.
    #[serde(default)]
    pub scanned_count: i32,

    /// The primary key where the scan stopped, when the endpoint truncated
    /// the result. Never followed by this library.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub last_evaluated_key: Item,
}

// ---------------------------------------------------------------------------
// Batch operations
// ---------------------------------------------------------------------------

/// Output for the `BatchWriteItem` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchWriteItemOutput {
    /// Write requests the store did not process, keyed by table name.
    #[serde(default)]
    pub unprocessed_items: HashMap<String, Vec<WriteRequest>>,
}
