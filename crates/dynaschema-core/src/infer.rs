//! Attribute type inference for key and index fields.

use dynaschema_model::AttributeType;

use crate::validate::{ShapeTag, Validator};

/// Infer the store attribute type of values accepted by `validator`.
///
/// Validators without a recognizable shape default to `S`. Wrapping and
/// composite shapes (unions, optionals, effects and so on) map to `NULL`,
/// which marks the field as unusable as a key.
#[must_use]
pub fn infer_attribute_type(validator: &dyn Validator) -> AttributeType {
    validator
        .shape()
        .map_or(AttributeType::S, |tag| attribute_type_for_tag(&tag))
}

/// The attribute type for a single shape tag.
#[must_use]
pub fn attribute_type_for_tag(tag: &ShapeTag) -> AttributeType {
    match tag {
        ShapeTag::String
        | ShapeTag::Literal
        | ShapeTag::Date
        | ShapeTag::Symbol
        | ShapeTag::Other(_) => AttributeType::S,
        ShapeTag::Number | ShapeTag::NaN | ShapeTag::BigInt => AttributeType::N,
        ShapeTag::Boolean => AttributeType::Bool,
        ShapeTag::Binary => AttributeType::B,
        ShapeTag::Array | ShapeTag::Tuple => AttributeType::L,
        ShapeTag::Object
        | ShapeTag::Record
        | ShapeTag::Map
        | ShapeTag::Set
        | ShapeTag::Any
        | ShapeTag::Unknown
        | ShapeTag::Enum => AttributeType::M,
        ShapeTag::Null
        | ShapeTag::Undefined
        | ShapeTag::Never
        | ShapeTag::Void
        | ShapeTag::Union
        | ShapeTag::DiscriminatedUnion
        | ShapeTag::Intersection
        | ShapeTag::Function
        | ShapeTag::Lazy
        | ShapeTag::Effects
        | ShapeTag::NativeEnum
        | ShapeTag::Optional
        | ShapeTag::Nullable
        | ShapeTag::Default
        | ShapeTag::Catch
        | ShapeTag::Promise
        | ShapeTag::Branded
        | ShapeTag::Pipeline => AttributeType::Null,
    }
}
