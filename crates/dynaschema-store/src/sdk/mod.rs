//! Remote store client over `aws_sdk_dynamodb`.
//!
//! [`SdkStore`] forwards every [`StoreClient`] call to the AWS SDK, converting
//! requests and responses at this boundary. Service errors keep their
//! DynamoDB exception name; failures without a service response become
//! `TransportError`.

pub mod convert;

use aws_sdk_dynamodb::config::http::HttpResponse;
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use tracing::{debug, warn};

use dynaschema_model::error::{DynamoDBError, DynamoDBErrorCode};
use dynaschema_model::input::{
    BatchWriteItemInput, CreateTableInput, DeleteItemInput, DeleteTableInput, GetItemInput,
    PutItemInput, QueryInput, ScanInput,
};
use dynaschema_model::output::{
    BatchWriteItemOutput, CreateTableOutput, DeleteItemOutput, DeleteTableOutput, GetItemOutput,
    PutItemOutput, QueryOutput, ScanOutput,
};
use dynaschema_model::DynamoDBOperation;

use crate::client::{StoreClient, StoreResult};
use crate::config::StoreConfig;

use self::convert::{
    from_sdk_item, from_sdk_request_items, from_sdk_table_description, to_sdk_attribute_definitions,
    to_sdk_global_index, to_sdk_item, to_sdk_key_schema, to_sdk_local_index,
    to_sdk_request_items, to_sdk_throughput, to_sdk_value,
};

/// A [`StoreClient`] backed by `aws_sdk_dynamodb::Client`.
#[derive(Debug, Clone)]
pub struct SdkStore {
    client: aws_sdk_dynamodb::Client,
}

impl SdkStore {
    /// Resolve `config` through the AWS config chain and build a client.
    pub async fn new(config: &StoreConfig) -> Self {
        let shared = config.load().await;
        Self::from_client(aws_sdk_dynamodb::Client::new(&shared))
    }

    /// Build a client from a fully specified service configuration.
    #[must_use]
    pub fn from_conf(config: aws_sdk_dynamodb::Config) -> Self {
        Self::from_client(aws_sdk_dynamodb::Client::from_conf(config))
    }

    /// Wrap an existing SDK client.
    #[must_use]
    pub fn from_client(client: aws_sdk_dynamodb::Client) -> Self {
        Self { client }
    }

    /// The underlying SDK client.
    #[must_use]
    pub fn client(&self) -> &aws_sdk_dynamodb::Client {
        &self.client
    }
}

/// Map an SDK failure into a [`DynamoDBError`].
fn sdk_error<E>(operation: DynamoDBOperation, err: SdkError<E, HttpResponse>) -> DynamoDBError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let code = err.code().map(str::to_owned);
    let message = err.message().map(str::to_owned);
    let status = err.raw_response().map(|response| response.status().as_u16());
    let error = match code {
        Some(code) => service_error(&code, message, status),
        None => DynamoDBError::transport(format!(
            "{operation} request failed: {}",
            DisplayErrorContext(&err)
        )),
    };
    warn!(
        operation = operation.as_str(),
        code = error.code.as_str(),
        message = %error.message,
        "store call failed"
    );
    error.with_source(err)
}

/// Build the error for a service response carrying `code`.
fn service_error(code: &str, message: Option<String>, status: Option<u16>) -> DynamoDBError {
    let error = DynamoDBError::with_message(
        DynamoDBErrorCode::from_wire(code),
        message.unwrap_or_else(|| code.to_owned()),
    );
    match status.and_then(|s| http::StatusCode::from_u16(s).ok()) {
        Some(status) => error.with_status(status),
        None => error,
    }
}

#[async_trait::async_trait]
impl StoreClient for SdkStore {
    async fn create_table(&self, input: CreateTableInput) -> StoreResult<CreateTableOutput> {
        let throughput = input
            .provisioned_throughput
            .as_ref()
            .map(to_sdk_throughput)
            .transpose()?;
        let global = input
            .global_secondary_indexes
            .into_iter()
            .map(to_sdk_global_index)
            .collect::<StoreResult<Vec<_>>>()?;
        let local = input
            .local_secondary_indexes
            .into_iter()
            .map(to_sdk_local_index)
            .collect::<StoreResult<Vec<_>>>()?;

        let output = self
            .client
            .create_table()
            .table_name(&input.table_name)
            .set_key_schema(Some(to_sdk_key_schema(input.key_schema)?))
            .set_attribute_definitions(Some(to_sdk_attribute_definitions(
                input.attribute_definitions,
            )?))
            .set_provisioned_throughput(throughput)
            .set_global_secondary_indexes((!global.is_empty()).then_some(global))
            .set_local_secondary_indexes((!local.is_empty()).then_some(local))
            .send()
            .await
            .map_err(|e| sdk_error(DynamoDBOperation::CreateTable, e))?;
        debug!(table = %input.table_name, "created table");

        Ok(CreateTableOutput {
            table_description: output.table_description.map(from_sdk_table_description),
        })
    }

    async fn delete_table(&self, input: DeleteTableInput) -> StoreResult<DeleteTableOutput> {
        let output = self
            .client
            .delete_table()
            .table_name(&input.table_name)
            .send()
            .await
            .map_err(|e| sdk_error(DynamoDBOperation::DeleteTable, e))?;
        debug!(table = %input.table_name, "deleted table");

        Ok(DeleteTableOutput {
            table_description: output.table_description.map(from_sdk_table_description),
        })
    }

    async fn get_item(&self, input: GetItemInput) -> StoreResult<GetItemOutput> {
        let output = self
            .client
            .get_item()
            .table_name(input.table_name)
            .set_key(Some(to_sdk_item(input.key)))
            .send()
            .await
            .map_err(|e| sdk_error(DynamoDBOperation::GetItem, e))?;

        Ok(GetItemOutput {
            item: output.item.map(from_sdk_item).transpose()?,
        })
    }

    async fn put_item(&self, input: PutItemInput) -> StoreResult<PutItemOutput> {
        self.client
            .put_item()
            .table_name(input.table_name)
            .set_item(Some(to_sdk_item(input.item)))
            .send()
            .await
            .map_err(|e| sdk_error(DynamoDBOperation::PutItem, e))?;
        Ok(PutItemOutput {})
    }

    async fn delete_item(&self, input: DeleteItemInput) -> StoreResult<DeleteItemOutput> {
        self.client
            .delete_item()
            .table_name(input.table_name)
            .set_key(Some(to_sdk_item(input.key)))
            .send()
            .await
            .map_err(|e| sdk_error(DynamoDBOperation::DeleteItem, e))?;
        Ok(DeleteItemOutput {})
    }

    async fn query(&self, input: QueryInput) -> StoreResult<QueryOutput> {
        let values = input
            .expression_attribute_values
            .into_iter()
            .map(|(placeholder, value)| (placeholder, to_sdk_value(value)))
            .collect::<std::collections::HashMap<_, _>>();
        let output = self
            .client
            .query()
            .table_name(input.table_name)
            .set_index_name(input.index_name)
            .set_key_condition_expression(input.key_condition_expression)
            .set_expression_attribute_values((!values.is_empty()).then_some(values))
            .set_scan_index_forward(input.scan_index_forward)
            .send()
            .await
            .map_err(|e| sdk_error(DynamoDBOperation::Query, e))?;
        debug!(count = output.count, "query");

        Ok(QueryOutput {
            items: output
                .items
                .unwrap_or_default()
                .into_iter()
                .map(from_sdk_item)
                .collect::<StoreResult<_>>()?,
            count: output.count,
            scanned_count: output.scanned_count,
            last_evaluated_key: output
                .last_evaluated_key
                .map(from_sdk_item)
                .transpose()?
                .unwrap_or_default(),
        })
    }

    async fn scan(&self, input: ScanInput) -> StoreResult<ScanOutput> {
        let output = self
            .client
            .scan()
            .table_name(input.table_name)
            .send()
            .await
            .map_err(|e| sdk_error(DynamoDBOperation::Scan, e))?;

        Ok(ScanOutput {
            items: output
                .items
                .unwrap_or_default()
                .into_iter()
                .map(from_sdk_item)
                .collect::<StoreResult<_>>()?,
            count: output.count,
            scanned_count: output.scanned_count,
            last_evaluated_key: output
                .last_evaluated_key
                .map(from_sdk_item)
                .transpose()?
                .unwrap_or_default(),
        })
    }

    async fn batch_write_item(
        &self,
        input: BatchWriteItemInput,
    ) -> StoreResult<BatchWriteItemOutput> {
        let output = self
            .client
            .batch_write_item()
            .set_request_items(Some(to_sdk_request_items(input.request_items)?))
            .send()
            .await
            .map_err(|e| sdk_error(DynamoDBOperation::BatchWriteItem, e))?;

        Ok(BatchWriteItemOutput {
            unprocessed_items: output
                .unprocessed_items
                .map(from_sdk_request_items)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}
