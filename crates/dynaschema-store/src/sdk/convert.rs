//! Conversions between the store model and `aws_sdk_dynamodb` types.
//!
//! Outgoing values are built with the SDK builders; a builder that reports
//! a missing required member becomes a `ValidationException`. Incoming
//! values only fail on attribute types the model cannot hold.

use std::collections::HashMap;

use aws_sdk_dynamodb::error::BuildError;
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types as ddb;
use bytes::Bytes;

use dynaschema_model::error::DynamoDBError;
use dynaschema_model::types::{
    AttributeDefinition, AttributeType, DeleteRequest, GlobalSecondaryIndex, KeySchemaElement,
    KeyType, LocalSecondaryIndex, Projection, ProjectionType, ProvisionedThroughput, PutRequest,
    TableDescription, TableStatus, WriteRequest,
};
use dynaschema_model::{AttributeValue, Item};

use crate::client::StoreResult;

/// An item in SDK form.
pub type SdkItem = HashMap<String, ddb::AttributeValue>;

fn build_error(e: BuildError) -> DynamoDBError {
    DynamoDBError::validation(e.to_string()).with_source(e)
}

// ---------------------------------------------------------------------------
// Attribute values
// ---------------------------------------------------------------------------

/// Convert a model value into its SDK form.
#[must_use]
pub fn to_sdk_value(value: AttributeValue) -> ddb::AttributeValue {
    match value {
        AttributeValue::S(s) => ddb::AttributeValue::S(s),
        AttributeValue::N(n) => ddb::AttributeValue::N(n),
        AttributeValue::B(b) => ddb::AttributeValue::B(Blob::new(b.to_vec())),
        AttributeValue::Bool(b) => ddb::AttributeValue::Bool(b),
        AttributeValue::Null(b) => ddb::AttributeValue::Null(b),
        AttributeValue::L(values) => {
            ddb::AttributeValue::L(values.into_iter().map(to_sdk_value).collect())
        }
        AttributeValue::M(map) => ddb::AttributeValue::M(to_sdk_item(map)),
    }
}

/// Convert an SDK value into the model.
///
/// Set types come back as lists of their scalar members.
pub fn from_sdk_value(value: ddb::AttributeValue) -> StoreResult<AttributeValue> {
    Ok(match value {
        ddb::AttributeValue::S(s) => AttributeValue::S(s),
        ddb::AttributeValue::N(n) => AttributeValue::N(n),
        ddb::AttributeValue::B(blob) => AttributeValue::B(Bytes::from(blob.into_inner())),
        ddb::AttributeValue::Bool(b) => AttributeValue::Bool(b),
        ddb::AttributeValue::Null(b) => AttributeValue::Null(b),
        ddb::AttributeValue::L(values) => AttributeValue::L(
            values
                .into_iter()
                .map(from_sdk_value)
                .collect::<StoreResult<_>>()?,
        ),
        ddb::AttributeValue::M(map) => AttributeValue::M(from_sdk_item(map)?),
        ddb::AttributeValue::Ss(values) => {
            AttributeValue::L(values.into_iter().map(AttributeValue::S).collect())
        }
        ddb::AttributeValue::Ns(values) => {
            AttributeValue::L(values.into_iter().map(AttributeValue::N).collect())
        }
        ddb::AttributeValue::Bs(values) => AttributeValue::L(
            values
                .into_iter()
                .map(|blob| AttributeValue::B(Bytes::from(blob.into_inner())))
                .collect(),
        ),
        other => {
            return Err(DynamoDBError::validation(format!(
                "unsupported attribute value: {other:?}"
            )));
        }
    })
}

/// Convert a model item into its SDK form.
#[must_use]
pub fn to_sdk_item(item: Item) -> SdkItem {
    item.into_iter()
        .map(|(name, value)| (name, to_sdk_value(value)))
        .collect()
}

/// Convert an SDK item into the model.
pub fn from_sdk_item(item: SdkItem) -> StoreResult<Item> {
    item.into_iter()
        .map(|(name, value)| from_sdk_value(value).map(|value| (name, value)))
        .collect()
}

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

/// Convert key schema elements for a table or index definition.
pub fn to_sdk_key_schema(
    elements: Vec<KeySchemaElement>,
) -> StoreResult<Vec<ddb::KeySchemaElement>> {
    elements
        .into_iter()
        .map(|element| {
            let key_type = match element.key_type {
                KeyType::Hash => ddb::KeyType::Hash,
                KeyType::Range => ddb::KeyType::Range,
            };
            ddb::KeySchemaElement::builder()
                .attribute_name(element.attribute_name)
                .key_type(key_type)
                .build()
                .map_err(build_error)
        })
        .collect()
}

/// Convert attribute definitions. Only `S`, `N` and `B` may be declared.
pub fn to_sdk_attribute_definitions(
    definitions: Vec<AttributeDefinition>,
) -> StoreResult<Vec<ddb::AttributeDefinition>> {
    definitions
        .into_iter()
        .map(|definition| {
            if !definition.attribute_type.is_valid_key_type() {
                return Err(DynamoDBError::validation(format!(
                    "Member must satisfy enum value set: [B, N, S] for attribute {} of type {}",
                    definition.attribute_name, definition.attribute_type
                )));
            }
            ddb::AttributeDefinition::builder()
                .attribute_name(definition.attribute_name)
                .attribute_type(ddb::ScalarAttributeType::from(
                    definition.attribute_type.as_str(),
                ))
                .build()
                .map_err(build_error)
        })
        .collect()
}

/// Convert provisioned throughput settings.
pub fn to_sdk_throughput(
    throughput: &ProvisionedThroughput,
) -> StoreResult<ddb::ProvisionedThroughput> {
    ddb::ProvisionedThroughput::builder()
        .read_capacity_units(throughput.read_capacity_units)
        .write_capacity_units(throughput.write_capacity_units)
        .build()
        .map_err(build_error)
}

fn to_sdk_projection(projection: Projection) -> ddb::Projection {
    let projection_type = projection.projection_type.map(|kind| match kind {
        ProjectionType::All => ddb::ProjectionType::All,
        ProjectionType::KeysOnly => ddb::ProjectionType::KeysOnly,
        ProjectionType::Include => ddb::ProjectionType::Include,
    });
    let non_key_attributes =
        (!projection.non_key_attributes.is_empty()).then_some(projection.non_key_attributes);
    ddb::Projection::builder()
        .set_projection_type(projection_type)
        .set_non_key_attributes(non_key_attributes)
        .build()
}

/// Convert a global secondary index definition.
pub fn to_sdk_global_index(
    index: GlobalSecondaryIndex,
) -> StoreResult<ddb::GlobalSecondaryIndex> {
    let throughput = index
        .provisioned_throughput
        .as_ref()
        .map(to_sdk_throughput)
        .transpose()?;
    ddb::GlobalSecondaryIndex::builder()
        .index_name(index.index_name)
        .set_key_schema(Some(to_sdk_key_schema(index.key_schema)?))
        .projection(to_sdk_projection(index.projection))
        .set_provisioned_throughput(throughput)
        .build()
        .map_err(build_error)
}

/// Convert a local secondary index definition.
pub fn to_sdk_local_index(index: LocalSecondaryIndex) -> StoreResult<ddb::LocalSecondaryIndex> {
    ddb::LocalSecondaryIndex::builder()
        .index_name(index.index_name)
        .set_key_schema(Some(to_sdk_key_schema(index.key_schema)?))
        .projection(to_sdk_projection(index.projection))
        .build()
        .map_err(build_error)
}

// ---------------------------------------------------------------------------
// Table descriptions
// ---------------------------------------------------------------------------

fn from_sdk_table_status(status: &ddb::TableStatus) -> Option<TableStatus> {
    match status {
        ddb::TableStatus::Creating => Some(TableStatus::Creating),
        ddb::TableStatus::Active => Some(TableStatus::Active),
        ddb::TableStatus::Deleting => Some(TableStatus::Deleting),
        _ => None,
    }
}

fn from_sdk_key_schema(elements: Option<Vec<ddb::KeySchemaElement>>) -> Vec<KeySchemaElement> {
    elements
        .unwrap_or_default()
        .into_iter()
        .filter_map(|element| {
            let key_type = match element.key_type {
                ddb::KeyType::Hash => KeyType::Hash,
                ddb::KeyType::Range => KeyType::Range,
                _ => return None,
            };
            Some(KeySchemaElement {
                attribute_name: element.attribute_name,
                key_type,
            })
        })
        .collect()
}

fn from_sdk_projection(projection: Option<ddb::Projection>) -> Projection {
    let Some(projection) = projection else {
        return Projection::default();
    };
    let projection_type = projection.projection_type.and_then(|kind| match kind {
        ddb::ProjectionType::All => Some(ProjectionType::All),
        ddb::ProjectionType::KeysOnly => Some(ProjectionType::KeysOnly),
        ddb::ProjectionType::Include => Some(ProjectionType::Include),
        _ => None,
    });
    Projection {
        projection_type,
        non_key_attributes: projection.non_key_attributes.unwrap_or_default(),
    }
}

fn from_sdk_throughput(
    throughput: Option<ddb::ProvisionedThroughputDescription>,
) -> Option<ProvisionedThroughput> {
    throughput.map(|t| ProvisionedThroughput {
        read_capacity_units: t.read_capacity_units.unwrap_or_default(),
        write_capacity_units: t.write_capacity_units.unwrap_or_default(),
    })
}

/// Convert a table description returned by `CreateTable` or `DeleteTable`.
#[must_use]
pub fn from_sdk_table_description(description: ddb::TableDescription) -> TableDescription {
    TableDescription {
        table_status: description.table_status.as_ref().and_then(from_sdk_table_status),
        table_name: description.table_name,
        key_schema: from_sdk_key_schema(description.key_schema),
        attribute_definitions: description
            .attribute_definitions
            .unwrap_or_default()
            .into_iter()
            .map(|definition| AttributeDefinition {
                attribute_type: AttributeType::from_name(definition.attribute_type.as_str()),
                attribute_name: definition.attribute_name,
            })
            .collect(),
        creation_date_time: description.creation_date_time.map(|t| t.as_secs_f64()),
        item_count: description.item_count,
        provisioned_throughput: from_sdk_throughput(description.provisioned_throughput),
        global_secondary_indexes: description
            .global_secondary_indexes
            .unwrap_or_default()
            .into_iter()
            .map(|index| GlobalSecondaryIndex {
                index_name: index.index_name.unwrap_or_default(),
                key_schema: from_sdk_key_schema(index.key_schema),
                projection: from_sdk_projection(index.projection),
                provisioned_throughput: from_sdk_throughput(index.provisioned_throughput),
            })
            .collect(),
        local_secondary_indexes: description
            .local_secondary_indexes
            .unwrap_or_default()
            .into_iter()
            .map(|index| LocalSecondaryIndex {
                index_name: index.index_name.unwrap_or_default(),
                key_schema: from_sdk_key_schema(index.key_schema),
                projection: from_sdk_projection(index.projection),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Batch writes
// ---------------------------------------------------------------------------

fn to_sdk_write_request(request: WriteRequest) -> StoreResult<ddb::WriteRequest> {
    let put = request
        .put_request
        .map(|put| {
            ddb::PutRequest::builder()
                .set_item(Some(to_sdk_item(put.item)))
                .build()
                .map_err(build_error)
        })
        .transpose()?;
    let delete = request
        .delete_request
        .map(|delete| {
            ddb::DeleteRequest::builder()
                .set_key(Some(to_sdk_item(delete.key)))
                .build()
                .map_err(build_error)
        })
        .transpose()?;
    Ok(ddb::WriteRequest::builder()
        .set_put_request(put)
        .set_delete_request(delete)
        .build())
}

fn from_sdk_write_request(request: ddb::WriteRequest) -> StoreResult<WriteRequest> {
    Ok(WriteRequest {
        put_request: request
            .put_request
            .map(|put| from_sdk_item(put.item).map(|item| PutRequest { item }))
            .transpose()?,
        delete_request: request
            .delete_request
            .map(|delete| from_sdk_item(delete.key).map(|key| DeleteRequest { key }))
            .transpose()?,
    })
}

/// Convert the per-table write requests of a `BatchWriteItem` call.
pub fn to_sdk_request_items(
    items: HashMap<String, Vec<WriteRequest>>,
) -> StoreResult<HashMap<String, Vec<ddb::WriteRequest>>> {
    let mut out = HashMap::with_capacity(items.len());
    for (table, requests) in items {
        let requests = requests
            .into_iter()
            .map(to_sdk_write_request)
            .collect::<StoreResult<Vec<_>>>()?;
        out.insert(table, requests);
    }
    Ok(out)
}

/// Convert the unprocessed write requests a `BatchWriteItem` call returned.
pub fn from_sdk_request_items(
    items: HashMap<String, Vec<ddb::WriteRequest>>,
) -> StoreResult<HashMap<String, Vec<WriteRequest>>> {
    let mut out = HashMap::with_capacity(items.len());
    for (table, requests) in items {
        let requests = requests
            .into_iter()
            .map(from_sdk_write_request)
            .collect::<StoreResult<Vec<_>>>()?;
        out.insert(table, requests);
    }
    Ok(out)
}
