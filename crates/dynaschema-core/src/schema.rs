//! Schema registry: models, their field specifications and the table's
//! secondary indexes.
//!
//! Every model stores its items in the same table under the uniform key
//! names [`PARTITION_KEY`] and [`SORT_KEY`]. Each field is declared with
//! exactly one [`FieldKind`], decided when the model is built and never
//! re-inspected afterwards.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use dynaschema_model::{AttributeType, AttributeValue};
use serde_json::Value;
use tracing::info;

use crate::condition::collides_with_placeholder;
use crate::error::{DynaSchemaError, DynaSchemaResult, SchemaError};
use crate::id::IdStrategy;
use crate::infer::infer_attribute_type;
use crate::params::Params;
use crate::validate::ValidatorRef;

/// Partition key attribute name shared by every model.
pub const PARTITION_KEY: &str = "pk";

/// Sort key attribute name shared by every model.
pub const SORT_KEY: &str = "sk";

/// Computes a raw field value from parameters. `None` means "absent".
pub type ValueFn = Arc<dyn Fn(&Params) -> Option<Value> + Send + Sync>;

/// A value function that ignores its input.
#[must_use]
pub fn constant(value: impl Into<Value>) -> impl Fn(&Params) -> Option<Value> + Send + Sync {
    let value = value.into();
    move |_| Some(value.clone())
}

/// A value function that copies another parameter.
#[must_use]
pub fn from_field(name: impl Into<String>) -> impl Fn(&Params) -> Option<Value> + Send + Sync {
    let name = name.into();
    move |params| params.get(&name).cloned()
}

/// How a field obtains its value.
#[derive(Clone)]
pub enum FieldKind {
    /// The partition or sort key, computed from parameters.
    Key(ValueFn),
    /// Generated when neither the caller nor an existing item supplies it.
    Generated(IdStrategy),
    /// Supplied by the caller.
    Required,
    /// Computed from the caller's parameters merged with generated and
    /// required values.
    Derived(ValueFn),
}

impl FieldKind {
    /// Whether the value is computed by a function (keys and derived fields).
    #[must_use]
    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Key(_) | Self::Derived(_))
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Key(_) => "key",
            Self::Generated(_) => "generated",
            Self::Required => "required",
            Self::Derived(_) => "derived",
        }
    }
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generated(strategy) => f.debug_tuple("Generated").field(strategy).finish(),
            other => f.write_str(other.label()),
        }
    }
}

/// One field of a model.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    kind: FieldKind,
    validator: ValidatorRef,
}

impl FieldSpec {
    /// Attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How the value is obtained.
    #[must_use]
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Validator applied to every raw value.
    #[must_use]
    pub fn validator(&self) -> &ValidatorRef {
        &self.validator
    }

    /// Store attribute type inferred from the validator.
    #[must_use]
    pub fn attribute_type(&self) -> AttributeType {
        infer_attribute_type(self.validator.as_ref())
    }
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

/// The fields of one logical entity, in declaration order.
#[derive(Debug)]
pub struct ModelSchema {
    name: String,
    fields: Vec<FieldSpec>,
}

impl ModelSchema {
    /// Start declaring a model.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ModelSchemaBuilder {
        ModelSchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// The field called `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Compute and validate the model's partition key value.
    ///
    /// The key function sees no parameters; a partition key that depends on
    /// caller input fails validation here.
    ///
    /// # Errors
    ///
    /// Returns [`DynaSchemaError::Validation`] when the computed value is rejected.
    pub fn partition_key_value(&self) -> DynaSchemaResult<AttributeValue> {
        let field = self
            .field(PARTITION_KEY)
            .ok_or_else(|| SchemaError::MissingKeyField {
                model: self.name.clone(),
                field: PARTITION_KEY.to_owned(),
            })?;
        let raw = match &field.kind {
            FieldKind::Key(f) | FieldKind::Derived(f) => f(&Params::new()),
            FieldKind::Generated(_) | FieldKind::Required => None,
        };
        field
            .validator
            .parse(raw.as_ref())
            .map_err(|source| DynaSchemaError::Validation {
                model: self.name.clone(),
                field: PARTITION_KEY.to_owned(),
                source,
            })
    }
}

/// Builder for [`ModelSchema`].
#[derive(Debug)]
pub struct ModelSchemaBuilder {
    name: String,
    fields: Vec<FieldSpec>,
}

impl ModelSchemaBuilder {
    fn push(mut self, name: impl Into<String>, kind: FieldKind, validator: ValidatorRef) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            kind,
            validator,
        });
        self
    }

    /// Declare the partition key.
    #[must_use]
    pub fn partition_key<F>(self, validator: ValidatorRef, value: F) -> Self
    where
        F: Fn(&Params) -> Option<Value> + Send + Sync + 'static,
    {
        self.push(PARTITION_KEY, FieldKind::Key(Arc::new(value)), validator)
    }

    /// Declare the sort key.
    #[must_use]
    pub fn sort_key<F>(self, validator: ValidatorRef, value: F) -> Self
    where
        F: Fn(&Params) -> Option<Value> + Send + Sync + 'static,
    {
        self.push(SORT_KEY, FieldKind::Key(Arc::new(value)), validator)
    }

    /// Declare a generated field.
    #[must_use]
    pub fn generated(
        self,
        name: impl Into<String>,
        validator: ValidatorRef,
        strategy: IdStrategy,
    ) -> Self {
        self.push(name, FieldKind::Generated(strategy), validator)
    }

    /// Declare a caller-supplied field.
    #[must_use]
    pub fn required(self, name: impl Into<String>, validator: ValidatorRef) -> Self {
        self.push(name, FieldKind::Required, validator)
    }

    /// Declare a field computed from other values.
    #[must_use]
    pub fn derived<F>(self, name: impl Into<String>, validator: ValidatorRef, value: F) -> Self
    where
        F: Fn(&Params) -> Option<Value> + Send + Sync + 'static,
    {
        self.push(name, FieldKind::Derived(Arc::new(value)), validator)
    }

    /// Finish the model.
    ///
    /// # Errors
    ///
    /// Fails when a field is declared twice, when `pk`/`sk` is declared as a
    /// non-key field, or when either key is missing.
    pub fn build(self) -> Result<ModelSchema, SchemaError> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField {
                    model: self.name.clone(),
                    field: field.name.clone(),
                });
            }
            let is_key_name = field.name == PARTITION_KEY || field.name == SORT_KEY;
            if is_key_name && !matches!(field.kind, FieldKind::Key(_)) {
                return Err(SchemaError::ReservedKeyField {
                    model: self.name.clone(),
                    field: field.name.clone(),
                });
            }
        }
        for key in [PARTITION_KEY, SORT_KEY] {
            if !seen.contains(key) {
                return Err(SchemaError::MissingKeyField {
                    model: self.name.clone(),
                    field: key.to_owned(),
                });
            }
        }
        Ok(ModelSchema {
            name: self.name,
            fields: self.fields,
        })
    }
}

// ---------------------------------------------------------------------------
// Indexes
// ---------------------------------------------------------------------------

/// A global secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalIndex {
    /// Partition key field of the index.
    pub hash_key: String,
    /// Optional sort key field of the index.
    pub range_key: Option<String>,
    /// Index name; defaults to `hash_key`.
    pub name: Option<String>,
}

impl GlobalIndex {
    /// An index keyed on `hash_key`.
    #[must_use]
    pub fn new(hash_key: impl Into<String>) -> Self {
        Self {
            hash_key: hash_key.into(),
            range_key: None,
            name: None,
        }
    }

    /// Add a sort key.
    #[must_use]
    pub fn with_range_key(mut self, range_key: impl Into<String>) -> Self {
        self.range_key = Some(range_key.into());
        self
    }

    /// Name the index.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The effective index name.
    #[must_use]
    pub fn index_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.hash_key)
    }
}

/// A local secondary index. Its partition key is always the table's `pk`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIndex {
    /// Sort key field of the index.
    pub range_key: String,
    /// Index name; defaults to `range_key`.
    pub name: Option<String>,
}

impl LocalIndex {
    /// An index sorted on `range_key`.
    #[must_use]
    pub fn new(range_key: impl Into<String>) -> Self {
        Self {
            range_key: range_key.into(),
            name: None,
        }
    }

    /// Name the index.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The effective index name.
    #[must_use]
    pub fn index_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.range_key)
    }
}

// ---------------------------------------------------------------------------
// Table schema
// ---------------------------------------------------------------------------

/// Every model stored in the table plus the table's indexes.
///
/// Built once and read-only afterwards; share it behind an `Arc`.
#[derive(Debug)]
pub struct Schema {
    models: Vec<Arc<ModelSchema>>,
    global_indexes: Vec<GlobalIndex>,
    local_indexes: Vec<LocalIndex>,
}

impl Schema {
    /// Start declaring a schema.
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// The model called `name`.
    #[must_use]
    pub fn model(&self, name: &str) -> Option<&Arc<ModelSchema>> {
        self.models.iter().find(|m| m.name == name)
    }

    /// All models in registration order.
    #[must_use]
    pub fn models(&self) -> &[Arc<ModelSchema>] {
        &self.models
    }

    /// Global secondary indexes.
    #[must_use]
    pub fn global_indexes(&self) -> &[GlobalIndex] {
        &self.global_indexes
    }

    /// Local secondary indexes.
    #[must_use]
    pub fn local_indexes(&self) -> &[LocalIndex] {
        &self.local_indexes
    }

    /// Inferred type of `field`, taken from the first model that defines it.
    #[must_use]
    pub fn field_type(&self, field: &str) -> Option<AttributeType> {
        self.models
            .iter()
            .find_map(|m| m.field(field))
            .map(FieldSpec::attribute_type)
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    models: Vec<ModelSchema>,
    global_indexes: Vec<GlobalIndex>,
    local_indexes: Vec<LocalIndex>,
}

impl SchemaBuilder {
    /// Register a model.
    #[must_use]
    pub fn model(mut self, model: ModelSchema) -> Self {
        self.models.push(model);
        self
    }

    /// Add a global secondary index.
    #[must_use]
    pub fn global_index(mut self, index: GlobalIndex) -> Self {
        self.global_indexes.push(index);
        self
    }

    /// Add a local secondary index.
    #[must_use]
    pub fn local_index(mut self, index: LocalIndex) -> Self {
        self.local_indexes.push(index);
        self
    }

    /// Finish the schema.
    ///
    /// # Errors
    ///
    /// Fails when there are no models, a model name or index name repeats,
    /// a global index hash key is named like a sort-key placeholder, an
    /// index references a field no model defines, or the models disagree
    /// on the type of a key or index field (or infer one the store cannot
    /// index).
    pub fn build(self) -> Result<Schema, SchemaError> {
        if self.models.is_empty() {
            return Err(SchemaError::NoModels);
        }

        let mut names = HashSet::new();
        for model in &self.models {
            if !names.insert(model.name.as_str()) {
                return Err(SchemaError::DuplicateModel(model.name.clone()));
            }
        }

        let mut index_names = HashSet::new();
        let index_names_iter = self
            .global_indexes
            .iter()
            .map(GlobalIndex::index_name)
            .chain(self.local_indexes.iter().map(LocalIndex::index_name));
        for name in index_names_iter {
            if !index_names.insert(name) {
                return Err(SchemaError::DuplicateIndex(name.to_owned()));
            }
        }

        for gsi in &self.global_indexes {
            if collides_with_placeholder(&gsi.hash_key) {
                return Err(SchemaError::PlaceholderCollision {
                    field: gsi.hash_key.clone(),
                });
            }
        }

        // (owner, field): owner is the table itself for pk/sk, else the index.
        let mut key_fields: Vec<(&str, &str)> = vec![("table", PARTITION_KEY), ("table", SORT_KEY)];
        for gsi in &self.global_indexes {
            key_fields.push((gsi.index_name(), gsi.hash_key.as_str()));
            if let Some(range) = &gsi.range_key {
                key_fields.push((gsi.index_name(), range.as_str()));
            }
        }
        for lsi in &self.local_indexes {
            key_fields.push((lsi.index_name(), lsi.range_key.as_str()));
        }
        for (owner, field) in key_fields {
            check_key_field(&self.models, owner, field)?;
        }

        info!(
            models = self.models.len(),
            global_indexes = self.global_indexes.len(),
            local_indexes = self.local_indexes.len(),
            "registered schema"
        );

        Ok(Schema {
            models: self.models.into_iter().map(Arc::new).collect(),
            global_indexes: self.global_indexes,
            local_indexes: self.local_indexes,
        })
    }
}

/// Every model defining `field` must infer the same indexable type, and at
/// least one model must define it.
fn check_key_field(models: &[ModelSchema], owner: &str, field: &str) -> Result<(), SchemaError> {
    let mut first: Option<(&str, AttributeType)> = None;
    for model in models {
        let Some(spec) = model.field(field) else {
            continue;
        };
        let attr_type = spec.attribute_type();
        match &first {
            None => {
                if !attr_type.is_valid_key_type() {
                    return Err(SchemaError::InvalidKeyType {
                        field: field.to_owned(),
                        attr_type,
                    });
                }
                first = Some((model.name(), attr_type));
            }
            Some((first_model, first_type)) if *first_type != attr_type => {
                return Err(SchemaError::TypeConflict {
                    field: field.to_owned(),
                    first_model: (*first_model).to_owned(),
                    first: first_type.clone(),
                    second_model: model.name.clone(),
                    second: attr_type,
                });
            }
            Some(_) => {}
        }
    }
    if first.is_none() {
        return Err(SchemaError::UnknownIndexField {
            index: owner.to_owned(),
            field: field.to_owned(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate;

    fn user() -> ModelSchemaBuilder {
        ModelSchema::builder("user")
            .partition_key(validate::string(), constant("user:"))
            .sort_key(validate::string(), from_field("userID"))
            .generated("userID", validate::string(), IdStrategy::Ulid)
            .required("username", validate::string())
    }

    fn post() -> ModelSchemaBuilder {
        ModelSchema::builder("post")
            .partition_key(validate::string(), constant("post:"))
            .sort_key(validate::string(), from_field("postID"))
            .generated("postID", validate::string(), IdStrategy::Ulid)
            .required("userID", validate::string())
    }

    #[test]
    fn test_should_build_model_in_declaration_order() {
        let model = user().build().unwrap();
        let names: Vec<_> = model.fields().iter().map(FieldSpec::name).collect();
        assert_eq!(names, vec!["pk", "sk", "userID", "username"]);
        assert!(model.field("pk").unwrap().kind().is_computed());
    }

    #[test]
    fn test_should_compute_partition_key_once() {
        let model = user().build().unwrap();
        assert_eq!(
            model.partition_key_value().unwrap(),
            AttributeValue::from("user:")
        );
    }

    #[test]
    fn test_should_reject_missing_sort_key() {
        let err = ModelSchema::builder("broken")
            .partition_key(validate::string(), constant("x"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingKeyField {
                model: "broken".to_owned(),
                field: "sk".to_owned(),
            }
        );
    }

    #[test]
    fn test_should_reject_field_declared_twice() {
        let err = user()
            .derived("username", validate::string(), constant("x"))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { field, .. } if field == "username"));
    }

    #[test]
    fn test_should_reject_key_name_on_non_key_field() {
        let err = ModelSchema::builder("broken")
            .required("pk", validate::string())
            .sort_key(validate::string(), constant("x"))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::ReservedKeyField { .. }));
    }

    #[test]
    fn test_should_build_schema_with_index() {
        let schema = Schema::builder()
            .model(user().build().unwrap())
            .model(post().build().unwrap())
            .global_index(GlobalIndex::new("userID").with_range_key("pk"))
            .build()
            .unwrap();
        assert_eq!(schema.global_indexes()[0].index_name(), "userID");
        assert_eq!(schema.field_type("userID"), Some(AttributeType::S));
        assert!(schema.model("post").is_some());
    }

    #[test]
    fn test_should_reject_index_on_unknown_field() {
        let err = Schema::builder()
            .model(user().build().unwrap())
            .local_index(LocalIndex::new("createdAt"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownIndexField {
                index: "createdAt".to_owned(),
                field: "createdAt".to_owned(),
            }
        );
    }

    #[test]
    fn test_should_reject_cross_model_type_conflict() {
        let numeric_user = ModelSchema::builder("account")
            .partition_key(validate::string(), constant("account:"))
            .sort_key(validate::string(), constant("a"))
            .required("userID", validate::number())
            .build()
            .unwrap();
        let err = Schema::builder()
            .model(user().build().unwrap())
            .model(numeric_user)
            .global_index(GlobalIndex::new("userID"))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::TypeConflict { first: AttributeType::S, second: AttributeType::N, .. }
        ));
    }

    #[test]
    fn test_should_reject_unindexable_key_type() {
        let model = user()
            .required("tags", validate::list(validate::string()))
            .build()
            .unwrap();
        let err = Schema::builder()
            .model(model)
            .global_index(GlobalIndex::new("tags"))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidKeyType { attr_type: AttributeType::L, .. }));
    }

    #[test]
    fn test_should_reject_duplicate_model_and_index() {
        let err = Schema::builder()
            .model(user().build().unwrap())
            .model(user().build().unwrap())
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateModel("user".to_owned()));

        let err = Schema::builder()
            .model(user().build().unwrap())
            .global_index(GlobalIndex::new("userID"))
            .global_index(GlobalIndex::new("username").with_name("userID"))
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateIndex("userID".to_owned()));
    }

    #[test]
    fn test_should_reject_index_hash_key_named_like_a_placeholder() {
        let model = user().required("eq", validate::string()).build().unwrap();
        let err = Schema::builder()
            .model(model)
            .global_index(GlobalIndex::new("eq").with_name("byEq").with_range_key("pk"))
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::PlaceholderCollision { field: "eq".to_owned() });
    }
}
