//! Store request and response types for dynaschema.
//!
//! These types mirror the DynamoDB request and response shapes the schema
//! layer issues. Store implementations convert them at their own boundary,
//! so the schema layer never depends on a particular client.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute_value;
pub mod error;
pub mod input;
pub mod operations;
pub mod output;
pub mod types;

pub use attribute_value::AttributeValue;
pub use error::{DynamoDBError, DynamoDBErrorCode};
pub use operations::DynamoDBOperation;
pub use types::{AttributeType, Item};
