//! DynaSchema playground.
//!
//! Registers a `user` and a `post` model in one table, then creates a user,
//! writes ten posts for it and reads them back by prefix, by key and through
//! the `userID` global index.
//!
//! # Usage
//!
//! ```text
//! DYNAMODB_ENDPOINT_URL=http://localhost:8000 dynaschema-playground
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DYNAMODB_ENDPOINT_URL` | *(unset = in-memory store)* | Store endpoint |
//! | `AWS_REGION` | *(provider chain)* | Signing region |
//! | `DYNASCHEMA_TABLE_NAME` | `test-table` | Table name |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use anyhow::{Context, Result, bail};
use dynaschema_core::schema::{constant, from_field};
use dynaschema_core::{
    DynaSchema, GlobalIndex, IdStrategy, KeyCondition, KeyQuery, ModelSchema, Params, Schema,
    TableConfig, validate,
};
use dynaschema_model::Item;
use dynaschema_store::{MemoryStore, SdkStore, StoreClient, StoreConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_TABLE: &str = "test-table";
const POST_COUNT: usize = 10;

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to `log_level`.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

fn schema() -> Result<Schema> {
    let user = ModelSchema::builder("user")
        .partition_key(validate::string(), constant("user:"))
        .sort_key(validate::string(), from_field("userID"))
        .generated("userID", validate::string(), IdStrategy::Ulid)
        .required("username", validate::string())
        .required("name", validate::string())
        .required("profilePicture", validate::string())
        .build()?;
    let post = ModelSchema::builder("post")
        .partition_key(validate::string(), constant("post:"))
        .sort_key(validate::string(), from_field("postID"))
        .generated("postID", validate::string(), IdStrategy::Ulid)
        .required("userID", validate::string())
        .required("content", validate::string())
        .required("createdAt", validate::datetime())
        .build()?;

    Ok(Schema::builder()
        .model(user)
        .model(post)
        .global_index(
            GlobalIndex::new("userID")
                .with_range_key("pk")
                .with_name("userID"),
        )
        .build()?)
}

fn string_attr<'a>(item: &'a Item, name: &str) -> Result<&'a str> {
    item.get(name)
        .and_then(dynaschema_model::AttributeValue::as_s)
        .with_context(|| format!("item has no string attribute {name}"))
}

async fn run<S: StoreClient>(db: DynaSchema<S>) -> Result<()> {
    let admin = db.admin();
    if !admin.delete_table_if_exists().await? {
        info!("table does not exist");
    }
    admin.create_table().await?;

    let users = db.model("user")?;
    let posts = db.model("post")?;

    let user = users
        .create(
            &Params::new()
                .with("username", "nicolesmileyface")
                .with("name", "nicole")
                .with("profilePicture", "https://example.com/avatar/76.jpg"),
        )
        .await?;
    let user_id = string_attr(&user, "userID")?.to_owned();
    info!(user_id = %user_id, "created user");

    let batch: Vec<Params> = (0..POST_COUNT)
        .map(|_| {
            Params::new()
                .with("userID", user_id.as_str())
                .with("content", "lorem ipsum sit dolor")
                .with("createdAt", chrono::Utc::now().to_rfc3339())
        })
        .collect();
    let created = posts.create_many(&batch).await?;
    let Some(first) = created.first() else {
        bail!("no posts were created");
    };
    let prefix: String = string_attr(first, "postID")?.chars().take(4).collect();

    let by_prefix = posts
        .query(KeyCondition::new().begins_with(prefix.as_str()))
        .await?;
    info!(prefix = %prefix, count = by_prefix.count, "queried posts by prefix");

    let all = posts.all().await?;
    info!(count = all.count, "scanned table");

    let Some(sort_key) = by_prefix.items.first().and_then(|i| i.get("sk")).cloned() else {
        bail!("prefix query returned no posts");
    };
    let fetched = posts.get(sort_key.clone()).await?;
    info!(found = fetched.is_some(), sort_key = %sort_key, "fetched post");

    posts.delete(sort_key.clone()).await?;
    let after_delete = posts
        .query(KeyCondition::new().begins_with(prefix.as_str()))
        .await?;
    info!(
        before = by_prefix.count,
        after = after_delete.count,
        "deleted post"
    );

    let by_user = db
        .query(
            &KeyQuery::new(user_id.as_str())
                .partition_key("userID", user_id.as_str())
                .sort_key("pk", KeyCondition::new().eq("post:"))
                .index("userID"),
        )
        .await?;
    for item in &by_user.items {
        let json: serde_json::Map<String, serde_json::Value> = item
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        println!("{}", serde_json::Value::Object(json));
    }
    info!(count = by_user.count, "queried posts by user");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    init_tracing(&log_level)?;

    let config = TableConfig::from_env(DEFAULT_TABLE);
    let schema = schema()?;
    let store_config = StoreConfig::from_env();

    if let Some(endpoint) = &store_config.endpoint_url {
        info!(%endpoint, "using sdk store");
        let store = SdkStore::new(&store_config).await;
        run(DynaSchema::new(config, schema, store)).await
    } else {
        info!("using in-memory store");
        run(DynaSchema::new(config, schema, MemoryStore::new())).await
    }
}
