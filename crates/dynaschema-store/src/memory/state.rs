//! In-memory store state: the table registry and per-table metadata.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;

use dynaschema_model::error::DynamoDBError;
use dynaschema_model::input::CreateTableInput;
use dynaschema_model::types::{
    AttributeDefinition, GlobalSecondaryIndex, KeySchemaElement, KeyType, LocalSecondaryIndex,
    ProvisionedThroughput, TableDescription, TableStatus,
};
use dynaschema_model::Item;

use super::storage::{KeyAttribute, KeySchema, StorageError, TableStorage, validate_key_type};

/// All tables of one in-memory store.
#[derive(Debug, Default)]
pub struct StoreState {
    /// All tables keyed by name.
    tables: DashMap<String, Arc<MemoryTable>>,
}

impl StoreState {
    /// Get a table or return `ResourceNotFoundException`.
    pub fn require_table(&self, name: &str) -> Result<Arc<MemoryTable>, DynamoDBError> {
        self.tables
            .get(name)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| {
                DynamoDBError::resource_not_found(format!(
                    "Requested resource not found: Table: {name} not found"
                ))
            })
    }

    /// Insert a new table. Returns error if table already exists.
    pub fn create_table(&self, table: MemoryTable) -> Result<Arc<MemoryTable>, DynamoDBError> {
        match self.tables.entry(table.name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(e) => Err(DynamoDBError::resource_in_use(
                format!("Table already exists: {}", e.key()),
            )),
            dashmap::mapref::entry::Entry::Vacant(e) => {
                let table = Arc::new(table);
                e.insert(Arc::clone(&table));
                Ok(table)
            }
        }
    }

    /// Remove a table by name. Returns the removed table.
    pub fn delete_table(&self, name: &str) -> Result<Arc<MemoryTable>, DynamoDBError> {
        self.tables.remove(name).map(|(_, t)| t).ok_or_else(|| {
            DynamoDBError::resource_not_found(format!(
                "Requested resource not found: Table: {name} not found"
            ))
        })
    }

    /// List all table names (sorted).
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }
}

/// A secondary index with its parsed key schema.
#[derive(Debug, Clone)]
pub struct MemoryIndex {
    /// Index name.
    pub name: String,
    /// Parsed key schema.
    pub key_schema: KeySchema,
}

/// A single table with metadata and storage.
#[derive(Debug)]
pub struct MemoryTable {
    /// Table name.
    pub name: String,
    /// Key schema elements as declared.
    pub key_schema_elements: Vec<KeySchemaElement>,
    /// Attribute definitions as declared.
    pub attribute_definitions: Vec<AttributeDefinition>,
    /// Provisioned throughput (accepted but not enforced).
    pub provisioned_throughput: Option<ProvisionedThroughput>,
    /// Global secondary index definitions.
    pub gsi_definitions: Vec<GlobalSecondaryIndex>,
    /// Local secondary index definitions.
    pub lsi_definitions: Vec<LocalSecondaryIndex>,
    /// Parsed global and local indexes.
    pub indexes: Vec<MemoryIndex>,
    /// Creation timestamp.
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Item storage engine.
    pub storage: TableStorage,
}

impl MemoryTable {
    /// Validate a `CreateTable` request and build the table it describes.
    pub fn from_input(input: CreateTableInput) -> Result<Self, DynamoDBError> {
        if input.table_name.is_empty() {
            return Err(DynamoDBError::validation("TableName must not be empty"));
        }

        let key_schema = parse_key_schema(&input.key_schema, &input.attribute_definitions)?;
        let mut indexes = Vec::new();
        let mut seen = HashSet::new();

        for gsi in &input.global_secondary_indexes {
            if !seen.insert(gsi.index_name.clone()) {
                return Err(duplicate_index(&gsi.index_name));
            }
            indexes.push(MemoryIndex {
                name: gsi.index_name.clone(),
                key_schema: parse_key_schema(&gsi.key_schema, &input.attribute_definitions)?,
            });
        }

        for lsi in &input.local_secondary_indexes {
            if !seen.insert(lsi.index_name.clone()) {
                return Err(duplicate_index(&lsi.index_name));
            }
            let lsi_schema = parse_key_schema(&lsi.key_schema, &input.attribute_definitions)?;
            if lsi_schema.partition_key.name != key_schema.partition_key.name
                || lsi_schema.sort_key.is_none()
            {
                return Err(DynamoDBError::validation(format!(
                    "Local secondary index {} must use the table partition key and a sort key",
                    lsi.index_name
                )));
            }
            indexes.push(MemoryIndex {
                name: lsi.index_name.clone(),
                key_schema: lsi_schema,
            });
        }

        let used: HashSet<&str> = std::iter::once(&key_schema)
            .chain(indexes.iter().map(|idx| &idx.key_schema))
            .flat_map(|schema| {
                std::iter::once(schema.partition_key.name.as_str())
                    .chain(schema.sort_key.as_ref().map(|sk| sk.name.as_str()))
            })
            .collect();
        if let Some(unused) = input
            .attribute_definitions
            .iter()
            .find(|def| !used.contains(def.attribute_name.as_str()))
        {
            return Err(DynamoDBError::validation(format!(
                "One or more parameter values were invalid: Some AttributeDefinitions are not used. AttributeDefinitions: {}",
                unused.attribute_name
            )));
        }

        Ok(Self {
            name: input.table_name,
            key_schema_elements: input.key_schema,
            attribute_definitions: input.attribute_definitions,
            provisioned_throughput: input.provisioned_throughput,
            gsi_definitions: input.global_secondary_indexes,
            lsi_definitions: input.local_secondary_indexes,
            indexes,
            created_at: chrono::Utc::now(),
            storage: TableStorage::new(key_schema),
        })
    }

    /// Key schema of the base table or of the named index.
    pub fn key_schema_for(&self, index_name: Option<&str>) -> Result<&KeySchema, DynamoDBError> {
        match index_name {
            None => Ok(self.storage.key_schema()),
            Some(name) => self
                .indexes
                .iter()
                .find(|idx| idx.name == name)
                .map(|idx| &idx.key_schema)
                .ok_or_else(|| {
                    DynamoDBError::validation(format!(
                        "The table does not have the specified index: {name}"
                    ))
                }),
        }
    }

    /// Check that every index key attribute present in `item` has its declared type.
    pub fn validate_index_keys(&self, item: &Item) -> Result<(), StorageError> {
        for index in &self.indexes {
            let keys = std::iter::once(&index.key_schema.partition_key)
                .chain(index.key_schema.sort_key.as_ref());
            for key in keys {
                if let Some(value) = item.get(&key.name) {
                    validate_key_type(key, value)?;
                }
            }
        }
        Ok(())
    }

    /// Build a `TableDescription` from this table's metadata.
    #[must_use]
    pub fn to_description(&self, status: TableStatus) -> TableDescription {
        #[allow(clippy::cast_precision_loss)] // epoch seconds travel as f64
        let creation_time = self.created_at.timestamp() as f64;
        TableDescription {
            table_name: Some(self.name.clone()),
            table_status: Some(status),
            key_schema: self.key_schema_elements.clone(),
            attribute_definitions: self.attribute_definitions.clone(),
            creation_date_time: Some(creation_time),
            item_count: Some(i64::try_from(self.storage.item_count()).unwrap_or(i64::MAX)),
            provisioned_throughput: self.provisioned_throughput,
            global_secondary_indexes: self.gsi_definitions.clone(),
            local_secondary_indexes: self.lsi_definitions.clone(),
        }
    }
}

fn duplicate_index(name: &str) -> DynamoDBError {
    DynamoDBError::validation(format!("Duplicate index name: {name}"))
}

/// Parse key schema elements into a [`KeySchema`], checking each key against
/// the attribute definitions.
fn parse_key_schema(
    elements: &[KeySchemaElement],
    definitions: &[AttributeDefinition],
) -> Result<KeySchema, DynamoDBError> {
    let lookup = |element: &KeySchemaElement| -> Result<KeyAttribute, DynamoDBError> {
        let definition = definitions
            .iter()
            .find(|def| def.attribute_name == element.attribute_name)
            .ok_or_else(|| {
                DynamoDBError::validation(format!(
                    "One or more parameter values were invalid: Some index key attributes are not defined in AttributeDefinitions. Keys: [{}]",
                    element.attribute_name
                ))
            })?;
        if !definition.attribute_type.is_valid_key_type() {
            return Err(DynamoDBError::validation(format!(
                "Member must satisfy enum value set: [B, N, S] for key attribute {} (got {})",
                definition.attribute_name, definition.attribute_type
            )));
        }
        Ok(KeyAttribute {
            name: definition.attribute_name.clone(),
            attr_type: definition.attribute_type.clone(),
        })
    };

    let hashes: Vec<_> = elements
        .iter()
        .filter(|e| e.key_type == KeyType::Hash)
        .collect();
    let ranges: Vec<_> = elements
        .iter()
        .filter(|e| e.key_type == KeyType::Range)
        .collect();
    let ([hash], ranges @ ([] | [_])) = (hashes.as_slice(), ranges.as_slice()) else {
        return Err(DynamoDBError::validation(
            "Key schema must have exactly one HASH key and at most one RANGE key",
        ));
    };

    Ok(KeySchema {
        partition_key: lookup(*hash)?,
        sort_key: ranges.first().map(|range| lookup(*range)).transpose()?,
    })
}
