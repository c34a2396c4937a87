//! In-memory item storage for a single table.
//!
//! Items are partitioned by partition-key value in a [`DashMap`]; each
//! partition keeps its items in a [`BTreeMap`] ordered by sort key:
//!
//! ```text
//! DashMap<PartitionKey, BTreeMap<SortableAttributeValue, Item>>
//! ```
//!
//! Tables without a sort key store a single sentinel entry per partition.
//! Secondary-index reads are answered by filtering every partition, which is
//! plenty for tests and local development.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

use dynaschema_model::error::DynamoDBError;
use dynaschema_model::types::AttributeType;
use dynaschema_model::{AttributeValue, Item};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A required key attribute was not found in the item.
    #[error("One or more parameter values were invalid: Missing the key {attr} in the item")]
    MissingKeyAttribute {
        /// The name of the missing attribute.
        attr: String,
    },
    /// A key attribute has the wrong type.
    #[error(
        "One or more parameter values were invalid: Type mismatch for key {attr} expected: {expected} actual: {actual}"
    )]
    InvalidKeyType {
        /// The name of the attribute.
        attr: String,
        /// The expected type descriptor.
        expected: String,
        /// The actual type descriptor.
        actual: String,
    },
}

impl From<StorageError> for DynamoDBError {
    fn from(e: StorageError) -> Self {
        DynamoDBError::validation(e.to_string()).with_source(e)
    }
}

// ---------------------------------------------------------------------------
// Key types
// ---------------------------------------------------------------------------

/// Parsed key schema of a table or index.
#[derive(Debug, Clone)]
pub struct KeySchema {
    /// Partition (HASH) key name and type.
    pub partition_key: KeyAttribute,
    /// Optional sort (RANGE) key name and type.
    pub sort_key: Option<KeyAttribute>,
}

impl KeySchema {
    /// Number of attributes that make up a full key.
    #[must_use]
    pub fn key_count(&self) -> usize {
        1 + usize::from(self.sort_key.is_some())
    }
}

/// A single key attribute with its name and type.
#[derive(Debug, Clone)]
pub struct KeyAttribute {
    /// The attribute name.
    pub name: String,
    /// The key type (S, N, or B).
    pub attr_type: AttributeType,
}

/// A primary key consisting of a partition key and an optional sort key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrimaryKey {
    /// The partition (HASH) key value.
    pub partition_key: AttributeValue,
    /// The optional sort (RANGE) key value.
    pub sort_key: Option<SortableAttributeValue>,
}

// ---------------------------------------------------------------------------
// SortableAttributeValue
// ---------------------------------------------------------------------------

/// Key-eligible attribute values with a total order, usable as `BTreeMap` keys.
///
/// - **S**: UTF-8 byte ordering.
/// - **N**: numeric ordering (parsed as `f64`).
/// - **B**: unsigned byte ordering.
/// - **Sentinel**: stands in for the sort key of tables without one.
#[derive(Debug, Clone)]
pub enum SortableAttributeValue {
    /// String key.
    S(String),
    /// Number key (original string representation).
    N(String),
    /// Binary key.
    B(bytes::Bytes),
    /// Sentinel value for tables without a sort key.
    Sentinel,
}

impl SortableAttributeValue {
    /// Creates a `SortableAttributeValue` from an `AttributeValue`.
    pub fn from_attribute_value(
        attr_name: &str,
        value: &AttributeValue,
    ) -> Result<Self, StorageError> {
        match value {
            AttributeValue::S(s) => Ok(Self::S(s.clone())),
            AttributeValue::N(n) => Ok(Self::N(n.clone())),
            AttributeValue::B(b) => Ok(Self::B(b.clone())),
            other => Err(StorageError::InvalidKeyType {
                attr: attr_name.to_owned(),
                expected: "S, N, or B".to_owned(),
                actual: other.type_descriptor().to_owned(),
            }),
        }
    }
}

/// Parses a number string for comparison; unparsable input sorts as NaN.
fn parse_number(s: &str) -> f64 {
    s.parse::<f64>().unwrap_or(f64::NAN)
}

impl PartialEq for SortableAttributeValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortableAttributeValue {}

impl PartialOrd for SortableAttributeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortableAttributeValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::S(a), Self::S(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Self::N(a), Self::N(b)) => parse_number(a)
                .partial_cmp(&parse_number(b))
                .unwrap_or(Ordering::Equal),
            (Self::B(a), Self::B(b)) => a.as_ref().cmp(b.as_ref()),
            (Self::Sentinel, Self::Sentinel) => Ordering::Equal,
            // Mixed variants never share a map; keep the order total anyway.
            (Self::S(_), _) => Ordering::Less,
            (_, Self::S(_)) => Ordering::Greater,
            (Self::N(_), _) => Ordering::Less,
            (_, Self::N(_)) => Ordering::Greater,
            (Self::B(_), _) => Ordering::Less,
            (_, Self::B(_)) => Ordering::Greater,
        }
    }
}

impl std::hash::Hash for SortableAttributeValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            Self::S(s) | Self::N(s) => s.hash(state),
            Self::B(b) => b.hash(state),
            Self::Sentinel => {}
        }
    }
}

// ---------------------------------------------------------------------------
// SortKeyCondition
// ---------------------------------------------------------------------------

/// A single condition on a sort key; several are applied conjunctively.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKeyCondition {
    /// Sort key equals the given value.
    Eq(SortableAttributeValue),
    /// Sort key is less than the given value.
    Lt(SortableAttributeValue),
    /// Sort key is less than or equal to the given value.
    Le(SortableAttributeValue),
    /// Sort key is greater than the given value.
    Gt(SortableAttributeValue),
    /// Sort key is greater than or equal to the given value.
    Ge(SortableAttributeValue),
    /// Sort key is between the two given values (inclusive).
    Between(SortableAttributeValue, SortableAttributeValue),
    /// String sort key begins with the given prefix.
    BeginsWith(String),
    /// Binary sort key begins with the given bytes.
    BeginsWithBytes(bytes::Bytes),
}

impl SortKeyCondition {
    /// Returns `true` if `key` satisfies this condition.
    #[must_use]
    pub fn matches(&self, key: &SortableAttributeValue) -> bool {
        match self {
            Self::Eq(v) => key == v,
            Self::Lt(v) => key < v,
            Self::Le(v) => key <= v,
            Self::Gt(v) => key > v,
            Self::Ge(v) => key >= v,
            Self::Between(low, high) => key >= low && key <= high,
            Self::BeginsWith(prefix) => {
                matches!(key, SortableAttributeValue::S(s) if s.starts_with(prefix.as_str()))
            }
            Self::BeginsWithBytes(prefix) => {
                matches!(key, SortableAttributeValue::B(b) if b.starts_with(prefix))
            }
        }
    }

    /// The `BTreeMap` range that can contain matches, or `None` when no key can.
    fn bounds(&self) -> Option<(Bound<SortableAttributeValue>, Bound<SortableAttributeValue>)> {
        let range = match self {
            Self::Eq(v) => (Bound::Included(v.clone()), Bound::Included(v.clone())),
            Self::Lt(v) => (Bound::Unbounded, Bound::Excluded(v.clone())),
            Self::Le(v) => (Bound::Unbounded, Bound::Included(v.clone())),
            Self::Gt(v) => (Bound::Excluded(v.clone()), Bound::Unbounded),
            Self::Ge(v) => (Bound::Included(v.clone()), Bound::Unbounded),
            Self::Between(low, high) => {
                if low > high {
                    return None;
                }
                (Bound::Included(low.clone()), Bound::Included(high.clone()))
            }
            Self::BeginsWith(prefix) => (
                Bound::Included(SortableAttributeValue::S(prefix.clone())),
                Bound::Unbounded,
            ),
            Self::BeginsWithBytes(prefix) => (
                Bound::Included(SortableAttributeValue::B(prefix.clone())),
                Bound::Unbounded,
            ),
        };
        Some(range)
    }
}

// ---------------------------------------------------------------------------
// TableStorage
// ---------------------------------------------------------------------------

/// In-memory storage for a single table.
#[derive(Debug)]
pub struct TableStorage {
    /// Partition key -> sorted items within that partition.
    data: DashMap<AttributeValue, BTreeMap<SortableAttributeValue, Item>>,
    /// The key schema for this table.
    key_schema: KeySchema,
    /// Total number of items in the table.
    item_count: AtomicU64,
}

impl TableStorage {
    /// Creates a new empty `TableStorage` with the given key schema.
    #[must_use]
    pub fn new(key_schema: KeySchema) -> Self {
        Self {
            data: DashMap::new(),
            key_schema,
            item_count: AtomicU64::new(0),
        }
    }

    /// Returns a reference to the key schema.
    #[must_use]
    pub fn key_schema(&self) -> &KeySchema {
        &self.key_schema
    }

    /// Returns the current item count.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.item_count.load(AtomicOrdering::Relaxed)
    }

    /// Inserts or replaces an item, returning the replaced item if any.
    pub fn put_item(&self, item: Item) -> Result<Option<Item>, StorageError> {
        let primary_key = extract_primary_key(&self.key_schema, &item)?;
        let sort_key = primary_key
            .sort_key
            .unwrap_or(SortableAttributeValue::Sentinel);

        let old_item = {
            let mut partition = self.data.entry(primary_key.partition_key).or_default();
            partition.insert(sort_key, item)
        };

        if old_item.is_some() {
            debug!("replaced existing item");
        } else {
            self.item_count.fetch_add(1, AtomicOrdering::Relaxed);
            debug!("inserted new item");
        }
        Ok(old_item)
    }

    /// Retrieves an item by its primary key.
    #[must_use]
    pub fn get_item(&self, key: &PrimaryKey) -> Option<Item> {
        let sort_key = key
            .sort_key
            .as_ref()
            .unwrap_or(&SortableAttributeValue::Sentinel);

        self.data
            .get(&key.partition_key)
            .and_then(|partition| partition.get(sort_key).cloned())
    }

    /// Deletes an item by its primary key, returning it if it existed.
    pub fn delete_item(&self, key: &PrimaryKey) -> Option<Item> {
        let sort_key = key
            .sort_key
            .as_ref()
            .unwrap_or(&SortableAttributeValue::Sentinel);

        let removed = {
            let mut partition = self.data.get_mut(&key.partition_key)?;
            partition.remove(sort_key)?
        };
        self.data
            .remove_if(&key.partition_key, |_, partition| partition.is_empty());

        self.item_count.fetch_sub(1, AtomicOrdering::Relaxed);
        debug!("deleted item");
        Some(removed)
    }

    /// Items of one base-table partition whose sort key satisfies every condition.
    #[must_use]
    pub fn query(
        &self,
        partition_key: &AttributeValue,
        conditions: &[SortKeyCondition],
        scan_forward: bool,
    ) -> Vec<Item> {
        let Some(partition) = self.data.get(partition_key) else {
            return Vec::new();
        };

        let bounds = match conditions.first() {
            Some(first) => first.bounds(),
            None => Some((Bound::Unbounded, Bound::Unbounded)),
        };
        let Some(bounds) = bounds else {
            return Vec::new();
        };

        let matching = partition
            .range(bounds)
            .filter(|(sk, _)| conditions.iter().all(|c| c.matches(sk)))
            .map(|(_, item)| item.clone());

        if scan_forward {
            matching.collect()
        } else {
            let mut items: Vec<Item> = matching.collect();
            items.reverse();
            items
        }
    }

    /// Items visible through a secondary index with the given key schema.
    ///
    /// Items lacking the index partition key (or its sort key, when the
    /// index has one) are not part of the index. Results are ordered by the
    /// index sort key, then by the base-table key.
    #[must_use]
    pub fn query_index(
        &self,
        index_schema: &KeySchema,
        partition_key: &AttributeValue,
        conditions: &[SortKeyCondition],
        scan_forward: bool,
    ) -> Vec<Item> {
        // (index sort key, base partition key, base sort key, item)
        let mut matches: Vec<IndexHit> = Vec::new();

        for partition in &self.data {
            let base_pk = sortable_or_sentinel(partition.key());
            for (base_sk, item) in partition.value() {
                if item.get(&index_schema.partition_key.name) != Some(partition_key) {
                    continue;
                }
                let index_sk = match &index_schema.sort_key {
                    Some(sk) => match item
                        .get(&sk.name)
                        .and_then(|v| SortableAttributeValue::from_attribute_value(&sk.name, v).ok())
                    {
                        Some(value) => value,
                        None => continue,
                    },
                    None => SortableAttributeValue::Sentinel,
                };
                if conditions.iter().all(|c| c.matches(&index_sk)) {
                    matches.push((index_sk, base_pk.clone(), base_sk.clone(), item.clone()));
                }
            }
        }

        matches.sort_by(|a, b| (&a.0, &a.1, &a.2).cmp(&(&b.0, &b.1, &b.2)));
        if !scan_forward {
            matches.reverse();
        }
        matches.into_iter().map(|(_, _, _, item)| item).collect()
    }

    /// Every item, ordered by partition key then sort key.
    #[must_use]
    pub fn scan(&self) -> Vec<Item> {
        let mut partitions: Vec<(SortableAttributeValue, Vec<Item>)> = self
            .data
            .iter()
            .map(|entry| {
                (
                    sortable_or_sentinel(entry.key()),
                    entry.value().values().cloned().collect(),
                )
            })
            .collect();
        partitions.sort_by(|a, b| a.0.cmp(&b.0));
        partitions.into_iter().flat_map(|(_, items)| items).collect()
    }
}

type IndexHit = (
    SortableAttributeValue,
    SortableAttributeValue,
    SortableAttributeValue,
    Item,
);

fn sortable_or_sentinel(value: &AttributeValue) -> SortableAttributeValue {
    SortableAttributeValue::from_attribute_value("", value)
        .unwrap_or(SortableAttributeValue::Sentinel)
}

// ---------------------------------------------------------------------------
// Key extraction
// ---------------------------------------------------------------------------

/// Extracts and type-checks the primary key of an item or key map.
#[allow(clippy::implicit_hasher)]
pub fn extract_primary_key(key_schema: &KeySchema, item: &Item) -> Result<PrimaryKey, StorageError> {
    let pk_value = item.get(&key_schema.partition_key.name).ok_or_else(|| {
        StorageError::MissingKeyAttribute {
            attr: key_schema.partition_key.name.clone(),
        }
    })?;
    validate_key_type(&key_schema.partition_key, pk_value)?;

    let sort_key = match &key_schema.sort_key {
        Some(sk_def) => {
            let sk_value =
                item.get(&sk_def.name)
                    .ok_or_else(|| StorageError::MissingKeyAttribute {
                        attr: sk_def.name.clone(),
                    })?;
            validate_key_type(sk_def, sk_value)?;
            Some(SortableAttributeValue::from_attribute_value(
                &sk_def.name,
                sk_value,
            )?)
        }
        None => None,
    };

    Ok(PrimaryKey {
        partition_key: pk_value.clone(),
        sort_key,
    })
}

/// Validates that an attribute value carries the key attribute's declared type.
pub fn validate_key_type(key: &KeyAttribute, value: &AttributeValue) -> Result<(), StorageError> {
    if key.attr_type.is_valid_key_type() && key.attr_type.matches(value) {
        Ok(())
    } else {
        Err(StorageError::InvalidKeyType {
            attr: key.name.clone(),
            expected: key.attr_type.as_str().to_owned(),
            actual: value.type_descriptor().to_owned(),
        })
    }
}
