//! Schema-driven single-table access for DynaSchema.
//!
//! Models are declared with [`ModelSchema`] and registered in a [`Schema`]
//! together with the table's secondary indexes. A [`DynaSchema`] binds the
//! schema to a table and a [`StoreClient`](dynaschema_store::StoreClient);
//! each [`Model`] it hands out reads and writes items under its own
//! partition key.
#![allow(clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod client;
pub mod condition;
pub mod config;
pub mod error;
pub mod id;
pub mod infer;
pub mod materialize;
pub mod model;
pub mod params;
pub mod schema;
pub mod table;
pub mod validate;

pub use client::DynaSchema;
pub use condition::{KeyCondition, KeyQuery};
pub use config::TableConfig;
pub use error::{DynaSchemaError, DynaSchemaResult, SchemaError};
pub use id::{IdGenerator, IdStrategy, UlidGenerator};
pub use model::{Model, UpdateOptions};
pub use params::Params;
pub use schema::{GlobalIndex, LocalIndex, ModelSchema, Schema};
pub use table::TableAdmin;
pub use validate::{ValidationError, Validator, ValidatorRef};
