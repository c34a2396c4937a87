//! Item materialization.
//!
//! Turning a model plus caller parameters into an item happens in a fixed
//! order:
//!
//! 1. Generated and required fields. On update, a value already present in
//!    the existing item is copied verbatim. Otherwise required fields are
//!    read from the parameters and generated fields get a fresh id; either
//!    way the raw value goes through the field's validator.
//! 2. The caller's parameters are overlaid with the values from step 1.
//! 3. Key and derived fields are computed from that merged view and
//!    validated.
//!
//! The item is the union of steps 1 and 3. A model never declares the same
//! name twice, so the two sets are disjoint.

use dynaschema_model::{AttributeValue, Item};
use serde_json::Value;
use tracing::debug;

use crate::error::{DynaSchemaError, DynaSchemaResult};
use crate::id::IdGenerator;
use crate::params::Params;
use crate::schema::{FieldKind, FieldSpec, ModelSchema};

/// Materialize a new item.
///
/// # Errors
///
/// Returns [`DynaSchemaError::Validation`] when any field value is rejected.
pub fn create(
    model: &ModelSchema,
    params: &Params,
    ids: &dyn IdGenerator,
) -> DynaSchemaResult<Item> {
    materialize(model, params, None, ids)
}

/// Re-materialize an item, keeping generated and required values from
/// `existing` when it has them.
///
/// # Errors
///
/// Returns [`DynaSchemaError::Validation`] when any field value is rejected.
pub fn update(
    model: &ModelSchema,
    params: &Params,
    existing: Option<&Item>,
    ids: &dyn IdGenerator,
) -> DynaSchemaResult<Item> {
    materialize(model, params, existing, ids)
}

fn materialize(
    model: &ModelSchema,
    params: &Params,
    existing: Option<&Item>,
    ids: &dyn IdGenerator,
) -> DynaSchemaResult<Item> {
    let mut item = Item::new();

    for field in model.fields() {
        let current = existing.and_then(|e| e.get(field.name()));
        let value = match (field.kind(), current) {
            (FieldKind::Key(_) | FieldKind::Derived(_), _) => continue,
            (_, Some(current)) => current.clone(),
            (FieldKind::Required, None) => validated(model, field, params.get(field.name()))?,
            (FieldKind::Generated(strategy), None) => {
                let raw = Value::String(ids.generate(*strategy));
                validated(model, field, Some(&raw))?
            }
        };
        item.insert(field.name().to_owned(), value);
    }

    let merged = params.merged(&Params::from_item(&item));

    for field in model.fields() {
        if let FieldKind::Key(compute) | FieldKind::Derived(compute) = field.kind() {
            let raw = compute(&merged);
            let value = validated(model, field, raw.as_ref())?;
            item.insert(field.name().to_owned(), value);
        }
    }

    debug!(
        model = model.name(),
        fields = item.len(),
        update = existing.is_some(),
        "materialized item"
    );
    Ok(item)
}

fn validated(
    model: &ModelSchema,
    field: &FieldSpec,
    raw: Option<&Value>,
) -> DynaSchemaResult<AttributeValue> {
    field
        .validator()
        .parse(raw)
        .map_err(|source| DynaSchemaError::Validation {
            model: model.name().to_owned(),
            field: field.name().to_owned(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::id::IdStrategy;
    use crate::schema::{constant, from_field};
    use crate::validate::{self, ValidationError};

    #[derive(Debug, Default)]
    struct Sequence(AtomicUsize);

    impl IdGenerator for Sequence {
        fn generate(&self, _strategy: IdStrategy) -> String {
            format!("id-{}", self.0.fetch_add(1, Ordering::SeqCst))
        }
    }

    fn user() -> ModelSchema {
        ModelSchema::builder("user")
            .partition_key(validate::string(), constant("user:"))
            .sort_key(validate::string(), from_field("userID"))
            .generated("userID", validate::string(), IdStrategy::Ulid)
            .required("username", validate::string())
            .required("name", validate::string())
            .derived("handle", validate::string(), |p| {
                p.get_str("username").map(|u| format!("@{u}").into())
            })
            .build()
            .unwrap()
    }

    fn params() -> Params {
        Params::new().with("username", "a").with("name", "b")
    }

    #[test]
    fn test_should_materialize_new_user() {
        let ids = Sequence::default();
        let item = create(&user(), &params(), &ids).unwrap();
        assert_eq!(item["pk"], AttributeValue::from("user:"));
        assert_eq!(item["userID"], AttributeValue::from("id-0"));
        assert_eq!(item["sk"], item["userID"]);
        assert_eq!(item["username"], AttributeValue::from("a"));
        assert_eq!(item["name"], AttributeValue::from("b"));
        assert_eq!(item["handle"], AttributeValue::from("@a"));
        assert_eq!(item.len(), 6);
    }

    #[test]
    fn test_should_ignore_params_outside_the_model() {
        let ids = Sequence::default();
        let item = create(&user(), &params().with("extra", 1), &ids).unwrap();
        assert!(!item.contains_key("extra"));
    }

    #[test]
    fn test_should_fail_on_missing_required_field() {
        let ids = Sequence::default();
        let err = create(&user(), &Params::new().with("username", "a"), &ids).unwrap_err();
        match err {
            DynaSchemaError::Validation {
                model,
                field,
                source,
            } => {
                assert_eq!(model, "user");
                assert_eq!(field, "name");
                assert_eq!(source, ValidationError::Missing);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_should_generate_fresh_ids_per_create() {
        let ids = Sequence::default();
        let first = create(&user(), &params(), &ids).unwrap();
        let second = create(&user(), &params(), &ids).unwrap();
        assert_ne!(first["userID"], second["userID"]);
    }

    #[test]
    fn test_should_be_idempotent_on_empty_update() {
        let ids = Sequence::default();
        let model = user();
        let existing = create(&model, &params(), &ids).unwrap();
        let updated = update(&model, &Params::new(), Some(&existing), &ids).unwrap();
        assert_eq!(updated, existing);
    }

    #[test]
    fn test_should_keep_existing_values_over_params() {
        let ids = Sequence::default();
        let model = user();
        let existing = create(&model, &params(), &ids).unwrap();
        let updated = update(
            &model,
            &Params::new().with("username", "z").with("userID", "forged"),
            Some(&existing),
            &ids,
        )
        .unwrap();
        assert_eq!(updated["username"], AttributeValue::from("a"));
        assert_eq!(updated["userID"], existing["userID"]);
        assert_eq!(updated["handle"], AttributeValue::from("@a"));
    }

    #[test]
    fn test_should_fill_fields_missing_from_existing_item() {
        let ids = Sequence::default();
        let model = user();
        let mut existing = create(&model, &params(), &ids).unwrap();
        existing.remove("name");
        let updated = update(
            &model,
            &Params::new().with("name", "c"),
            Some(&existing),
            &ids,
        )
        .unwrap();
        assert_eq!(updated["name"], AttributeValue::from("c"));
        assert_eq!(updated["userID"], existing["userID"]);
    }
}
