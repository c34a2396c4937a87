//! Shared store types for table administration and item access.
//!
//! All types follow the JSON wire format with `PascalCase` field names.
//! Structs use `#[serde(rename_all = "PascalCase")]` to match the store API.
//!
//! Enum variants use idiomatic Rust `PascalCase` naming with `#[serde(rename)]`
//! attributes to map to the `SCREAMING_SNAKE_CASE` wire format.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::attribute_value::AttributeValue;

/// An item represented as a map of attribute names to values.
pub type Item = HashMap<String, AttributeValue>;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Key type within a key schema element.
///
/// `Hash` denotes the partition key; `Range` denotes the sort key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// Partition key.
    #[serde(rename = "HASH")]
    Hash,
    /// Sort key.
    #[serde(rename = "RANGE")]
    Range,
}

impl KeyType {
    /// Returns the wire-format string representation of this key type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hash => "HASH",
            Self::Range => "RANGE",
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attribute types as declared in attribute definitions.
///
/// The store itself only indexes `S`, `N` and `B`; the document types are
/// still representable because type inference can produce them for index
/// fields, and the store must be able to reject them with a
/// `ValidationException` instead of a deserialization error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeType {
    /// String type.
    S,
    /// Number type.
    N,
    /// Binary type.
    B,
    /// Boolean type.
    Bool,
    /// Null marker.
    Null,
    /// Map (document) type.
    M,
    /// List type.
    L,
    /// An unknown attribute type received on the wire.
    Unknown(String),
}

impl AttributeType {
    /// Returns the wire-format string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::S => "S",
            Self::N => "N",
            Self::B => "B",
            Self::Bool => "BOOL",
            Self::Null => "NULL",
            Self::M => "M",
            Self::L => "L",
            Self::Unknown(s) => s.as_str(),
        }
    }

    /// Parse a wire-format type name. Unrecognized names are kept as
    /// [`AttributeType::Unknown`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "S" => Self::S,
            "N" => Self::N,
            "B" => Self::B,
            "BOOL" => Self::Bool,
            "NULL" => Self::Null,
            "M" => Self::M,
            "L" => Self::L,
            _ => Self::Unknown(name.to_owned()),
        }
    }

    /// Returns `true` if this is a valid key attribute type (S, N, or B).
    #[must_use]
    pub fn is_valid_key_type(&self) -> bool {
        matches!(self, Self::S | Self::N | Self::B)
    }

    /// Returns `true` if the given value carries this type.
    #[must_use]
    pub fn matches(&self, value: &AttributeValue) -> bool {
        self.as_str() == value.type_descriptor()
    }
}

impl Serialize for AttributeType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AttributeType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from_name(&s))
    }
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current status of a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TableStatus {
    /// The table is being created.
    #[serde(rename = "CREATING")]
    Creating,
    /// The table is ready for use.
    #[serde(rename = "ACTIVE")]
    Active,
    /// The table is being deleted.
    #[serde(rename = "DELETING")]
    Deleting,
}

/// Projection type for secondary indexes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProjectionType {
    /// All attributes from the table are projected into the index.
    #[default]
    #[serde(rename = "ALL")]
    All,
    /// Only the index and primary keys are projected.
    #[serde(rename = "KEYS_ONLY")]
    KeysOnly,
    /// Only specified non-key attributes are projected alongside keys.
    #[serde(rename = "INCLUDE")]
    Include,
}

// ---------------------------------------------------------------------------
// Structs - Key schema
// ---------------------------------------------------------------------------

/// An element of the key schema for a table or index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeySchemaElement {
    /// The name of the key attribute.
    pub attribute_name: String,
    /// The role of the attribute in the key schema (`HASH` or `RANGE`).
    pub key_type: KeyType,
}

impl KeySchemaElement {
    /// Partition key element.
    #[must_use]
    pub fn hash(name: impl Into<String>) -> Self {
        Self {
            attribute_name: name.into(),
            key_type: KeyType::Hash,
        }
    }

    /// Sort key element.
    #[must_use]
    pub fn range(name: impl Into<String>) -> Self {
        Self {
            attribute_name: name.into(),
            key_type: KeyType::Range,
        }
    }
}

/// An attribute definition specifying the attribute name and its type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeDefinition {
    /// The name of the attribute.
    pub attribute_name: String,
    /// The data type of the attribute.
    pub attribute_type: AttributeType,
}

// ---------------------------------------------------------------------------
// Structs - Throughput & Projection
// ---------------------------------------------------------------------------

/// Provisioned throughput settings for a table or global index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProvisionedThroughput {
    /// The maximum number of strongly consistent reads per second.
    pub read_capacity_units: i64,
    /// The maximum number of writes per second.
    pub write_capacity_units: i64,
}

impl Default for ProvisionedThroughput {
    fn default() -> Self {
        Self {
            read_capacity_units: 10,
            write_capacity_units: 10,
        }
    }
}

/// Projection settings for a secondary index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Projection {
    /// The set of attributes projected into the index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection_type: Option<ProjectionType>,
    /// The non-key attributes to project when `projection_type` is `INCLUDE`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub non_key_attributes: Vec<String>,
}

impl Projection {
    /// Project every attribute.
    #[must_use]
    pub fn all() -> Self {
        Self {
            projection_type: Some(ProjectionType::All),
            non_key_attributes: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Structs - Secondary Indexes
// ---------------------------------------------------------------------------

/// Global secondary index definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GlobalSecondaryIndex {
    /// The name of the global secondary index.
    pub index_name: String,
    /// The key schema for this index (partition key, optional sort key).
    pub key_schema: Vec<KeySchemaElement>,
    /// The attributes projected into this index.
    pub projection: Projection,
    /// The provisioned throughput for this index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned_throughput: Option<ProvisionedThroughput>,
}

/// Local secondary index definition.
///
/// An LSI shares the partition key with the base table but uses a different sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LocalSecondaryIndex {
    /// The name of the local secondary index.
    pub index_name: String,
    /// The key schema for this index.
    pub key_schema: Vec<KeySchemaElement>,
    /// The attributes projected into this index.
    pub projection: Projection,
}

// ---------------------------------------------------------------------------
// Structs - Table Description
// ---------------------------------------------------------------------------

/// Description of a table, returned by `CreateTable` and `DeleteTable`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableDescription {
    /// The name of the table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    /// The current status of the table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_status: Option<TableStatus>,
    /// The key schema for the table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_schema: Vec<KeySchemaElement>,
    /// The attribute definitions for the table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute_definitions: Vec<AttributeDefinition>,
    /// The date and time (epoch seconds) when the table was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date_time: Option<f64>,
    /// The number of items in the table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_count: Option<i64>,
    /// The provisioned throughput settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provisioned_throughput: Option<ProvisionedThroughput>,
    /// The global secondary indexes on the table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub global_secondary_indexes: Vec<GlobalSecondaryIndex>,
    /// The local secondary indexes on the table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub local_secondary_indexes: Vec<LocalSecondaryIndex>,
}

// ---------------------------------------------------------------------------
// Structs - Batch write
// ---------------------------------------------------------------------------

/// A single write request within a `BatchWriteItem` operation.
///
/// Exactly one of `put_request` or `delete_request` must be specified.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WriteRequest {
    /// A request to put an item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put_request: Option<PutRequest>,
    /// A request to delete an item.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_request: Option<DeleteRequest>,
}

impl WriteRequest {
    /// Wrap an item in a put request.
    #[must_use]
    pub fn put(item: Item) -> Self {
        Self {
            put_request: Some(PutRequest { item }),
            delete_request: None,
        }
    }
}

/// A request to put an item within a `BatchWriteItem` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutRequest {
    /// The item attributes to put.
    pub item: Item,
}

/// A request to delete an item within a `BatchWriteItem` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteRequest {
    /// The primary key of the item to delete.
    pub key: Item,
}
