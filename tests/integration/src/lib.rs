//! Integration tests for DynaSchema.
//!
//! Most tests run against the in-memory store. The tests in `test_sdk` need
//! a DynamoDB-compatible endpoint (for example DynamoDB Local on
//! `localhost:8000`) and are marked `#[ignore]`.
//!
//! Run them with:
//! ```text
//! DYNAMODB_ENDPOINT_URL=http://localhost:8000 cargo test -p dynaschema-integration -- --ignored
//! ```

use std::sync::Once;

use dynaschema_core::schema::{constant, from_field};
use dynaschema_core::{
    DynaSchema, GlobalIndex, IdStrategy, LocalIndex, ModelSchema, Schema, TableConfig, validate,
};
use aws_sdk_dynamodb::config::{BehaviorVersion, Credentials, Region};
use dynaschema_store::{MemoryStore, SdkStore};

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the store.
fn endpoint_url() -> String {
    std::env::var("DYNAMODB_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:8000".to_owned())
}

/// Generate a unique table name for a test.
#[must_use]
pub fn test_table_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// The user and post models with a `userID` global index and a
/// `createdAt` local index.
#[must_use]
pub fn blog_schema() -> Schema {
    let user = ModelSchema::builder("user")
        .partition_key(validate::string(), constant("user:"))
        .sort_key(validate::string(), from_field("userID"))
        .generated("userID", validate::string(), IdStrategy::Ulid)
        .required("username", validate::string())
        .required("name", validate::string())
        .required("age", validate::optional(validate::number()))
        .build()
        .unwrap();
    let post = ModelSchema::builder("post")
        .partition_key(validate::string(), constant("post:"))
        .sort_key(validate::string(), from_field("postID"))
        .generated("postID", validate::string(), IdStrategy::Ulid)
        .required("userID", validate::string())
        .required("content", validate::string())
        .required("createdAt", validate::datetime())
        .derived("slug", validate::string(), |p| {
            p.get_str("content")
                .map(|c| c.to_lowercase().replace(' ', "-").into())
        })
        .build()
        .unwrap();

    Schema::builder()
        .model(user)
        .model(post)
        .global_index(GlobalIndex::new("userID").with_range_key("pk"))
        .local_index(LocalIndex::new("createdAt"))
        .build()
        .unwrap()
}

/// A schema bound to a fresh in-memory store, table not yet created.
#[must_use]
pub fn memory_db(prefix: &str) -> DynaSchema<MemoryStore> {
    init_tracing();
    DynaSchema::new(
        TableConfig::new(test_table_name(prefix)),
        blog_schema(),
        MemoryStore::new(),
    )
}

/// A schema bound to the endpoint through the AWS SDK, table not yet
/// created.
#[must_use]
pub fn sdk_db(prefix: &str) -> DynaSchema<SdkStore> {
    init_tracing();
    let creds = Credentials::new("test", "test", None, None, "integration-test");
    let config = aws_sdk_dynamodb::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(creds)
        .endpoint_url(endpoint_url())
        .build();
    DynaSchema::new(
        TableConfig::new(test_table_name(prefix)),
        blog_schema(),
        SdkStore::from_conf(config),
    )
}

mod test_model;
mod test_query;
mod test_sdk;
mod test_table;
