//! Error types for schema registration, materialization and store calls.

use dynaschema_model::AttributeType;
use dynaschema_model::error::DynamoDBError;

use crate::validate::ValidationError;

/// Result alias used throughout the crate.
pub type DynaSchemaResult<T> = Result<T, DynaSchemaError>;

/// Top-level error.
#[derive(Debug, thiserror::Error)]
pub enum DynaSchemaError {
    /// A field value was rejected by its validator.
    #[error("invalid value for {model}.{field}: {source}")]
    Validation {
        /// Model being materialized.
        model: String,
        /// Field whose validator failed.
        field: String,
        /// The validator's reason.
        source: ValidationError,
    },
    /// The schema is inconsistent.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// The store rejected or could not complete a request.
    #[error(transparent)]
    Store(#[from] DynamoDBError),
    /// No model is registered under this name.
    #[error("unknown model: {0}")]
    UnknownModel(String),
    /// An update found nothing to update.
    #[error("{model} item with sort key {sort_key} not found")]
    ItemNotFound {
        /// Model being updated.
        model: String,
        /// Requested sort key.
        sort_key: String,
    },
}

impl DynaSchemaError {
    /// `true` when the store reported a missing table or item.
    #[must_use]
    pub fn is_resource_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_resource_not_found())
    }
}

/// Problems found while registering models and indexes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// A model lacks its partition or sort key.
    #[error("model {model} does not define key field {field}")]
    MissingKeyField {
        /// Model name.
        model: String,
        /// `pk` or `sk`.
        field: String,
    },
    /// A field name is declared more than once in one model.
    #[error("model {model} declares field {field} more than once")]
    DuplicateField {
        /// Model name.
        model: String,
        /// Repeated field.
        field: String,
    },
    /// A non-key declaration claims `pk` or `sk`.
    #[error("model {model} declares key field {field} as a non-key attribute")]
    ReservedKeyField {
        /// Model name.
        model: String,
        /// `pk` or `sk`.
        field: String,
    },
    /// Two models share a name.
    #[error("model {0} is registered more than once")]
    DuplicateModel(String),
    /// The schema has no models.
    #[error("schema has no models")]
    NoModels,
    /// An index references a field that no model defines.
    #[error("index {index} references unknown field {field}")]
    UnknownIndexField {
        /// Index name.
        index: String,
        /// Missing field.
        field: String,
    },
    /// Two indexes share a name.
    #[error("index {0} is declared more than once")]
    DuplicateIndex(String),
    /// Models disagree on the type of a key field.
    #[error("field {field} is {first} in model {first_model} but {second} in model {second_model}")]
    TypeConflict {
        /// Key or index field.
        field: String,
        /// Model defining it first.
        first_model: String,
        /// Type inferred there.
        first: AttributeType,
        /// Conflicting model.
        second_model: String,
        /// Type inferred there.
        second: AttributeType,
    },
    /// A partition key whose `:name` placeholder is a sort-key placeholder.
    #[error("partition key {field} would bind :{field}, which sort-key conditions use")]
    PlaceholderCollision {
        /// Partition key attribute.
        field: String,
    },
    /// A key or index field has a type the store cannot index.
    #[error("field {field} has type {attr_type}, but key attributes must be S, N or B")]
    InvalidKeyType {
        /// Key or index field.
        field: String,
        /// Inferred type.
        attr_type: AttributeType,
    },
}

#[cfg(test)]
mod tests {
    use dynaschema_model::DynamoDBErrorCode;

    use super::*;

    #[test]
    fn test_should_format_validation_error() {
        let err = DynaSchemaError::Validation {
            model: "user".to_owned(),
            field: "name".to_owned(),
            source: ValidationError::Missing,
        };
        assert_eq!(err.to_string(), "invalid value for user.name: value is required");
    }

    #[test]
    fn test_should_detect_resource_not_found() {
        let err: DynaSchemaError = DynamoDBError::resource_not_found("gone").into();
        assert!(err.is_resource_not_found());
        let err: DynaSchemaError =
            DynamoDBError::with_message(DynamoDBErrorCode::ValidationException, "bad").into();
        assert!(!err.is_resource_not_found());
    }
}
