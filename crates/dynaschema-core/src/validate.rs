//! Field validators.
//!
//! A [`Validator`] turns a raw JSON value (or its absence) into a typed
//! [`AttributeValue`], failing when the value does not conform. This is the
//! only place in the crate where coercion happens. Each validator can also
//! report a [`ShapeTag`] that the type inferencer uses to pick the attribute
//! type of key and index fields.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use dynaschema_model::AttributeValue;
use serde_json::Value;

/// Shared handle to a validator.
pub type ValidatorRef = Arc<dyn Validator>;

/// Parses raw values into typed attribute values.
pub trait Validator: fmt::Debug + Send + Sync {
    /// Parse `raw`, where `None` means the value was absent.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when `raw` does not conform.
    fn parse(&self, raw: Option<&Value>) -> Result<AttributeValue, ValidationError>;

    /// The value shape this validator accepts, if it has a recognizable one.
    fn shape(&self) -> Option<ShapeTag> {
        None
    }
}

/// Why a raw value was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The value was absent.
    #[error("value is required")]
    Missing,
    /// The value had the wrong JSON type.
    #[error("expected {expected}, received {received}")]
    InvalidType {
        /// What the validator accepts.
        expected: &'static str,
        /// What it got.
        received: &'static str,
    },
    /// The value had the right JSON type but an invalid format.
    #[error("invalid {expected}: {message}")]
    InvalidFormat {
        /// What the validator accepts.
        expected: &'static str,
        /// Details from the underlying parser.
        message: String,
    },
    /// The value is not one of the allowed values.
    #[error("expected one of [{allowed}], received {received}")]
    NotAllowed {
        /// Comma-separated allowed values.
        allowed: String,
        /// The rejected value.
        received: String,
    },
    /// A list element failed validation.
    #[error("invalid element at index {index}: {source}")]
    InvalidElement {
        /// Position of the element.
        index: usize,
        /// Why the element was rejected.
        source: Box<ValidationError>,
    },
}

/// Shape tags reported by validators.
///
/// The set mirrors the kinds of a typical schema-validation library so that
/// validators written against one can report their kind verbatim; anything
/// unrecognized goes in [`ShapeTag::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ShapeTag {
    String,
    Number,
    NaN,
    BigInt,
    Boolean,
    Date,
    Symbol,
    Undefined,
    Null,
    Any,
    Unknown,
    Never,
    Void,
    Array,
    Object,
    Union,
    DiscriminatedUnion,
    Intersection,
    Tuple,
    Record,
    Map,
    Set,
    Function,
    Lazy,
    Literal,
    Enum,
    Effects,
    NativeEnum,
    Optional,
    Nullable,
    Default,
    Catch,
    Promise,
    Branded,
    Pipeline,
    Binary,
    Other(String),
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn require<'a>(raw: Option<&'a Value>) -> Result<&'a Value, ValidationError> {
    raw.ok_or(ValidationError::Missing)
}

fn require_str<'a>(
    raw: Option<&'a Value>,
    expected: &'static str,
) -> Result<&'a str, ValidationError> {
    match require(raw)? {
        Value::String(s) => Ok(s),
        other => Err(ValidationError::InvalidType {
            expected,
            received: json_kind(other),
        }),
    }
}

// ---------------------------------------------------------------------------
// Scalars
// ---------------------------------------------------------------------------

/// Accepts any string.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringValidator;

impl Validator for StringValidator {
    fn parse(&self, raw: Option<&Value>) -> Result<AttributeValue, ValidationError> {
        require_str(raw, "string").map(AttributeValue::from)
    }

    fn shape(&self) -> Option<ShapeTag> {
        Some(ShapeTag::String)
    }
}

/// Accepts RFC 3339 timestamps, stored as strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTimeValidator;

impl Validator for DateTimeValidator {
    fn parse(&self, raw: Option<&Value>) -> Result<AttributeValue, ValidationError> {
        let s = require_str(raw, "datetime string")?;
        chrono::DateTime::parse_from_rfc3339(s).map_err(|e| ValidationError::InvalidFormat {
            expected: "datetime",
            message: e.to_string(),
        })?;
        Ok(AttributeValue::from(s))
    }

    fn shape(&self) -> Option<ShapeTag> {
        Some(ShapeTag::String)
    }
}

/// Accepts JSON numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberValidator;

impl Validator for NumberValidator {
    fn parse(&self, raw: Option<&Value>) -> Result<AttributeValue, ValidationError> {
        match require(raw)? {
            Value::Number(n) => Ok(AttributeValue::N(n.to_string())),
            other => Err(ValidationError::InvalidType {
                expected: "number",
                received: json_kind(other),
            }),
        }
    }

    fn shape(&self) -> Option<ShapeTag> {
        Some(ShapeTag::Number)
    }
}

/// Accepts JSON booleans.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanValidator;

impl Validator for BooleanValidator {
    fn parse(&self, raw: Option<&Value>) -> Result<AttributeValue, ValidationError> {
        match require(raw)? {
            Value::Bool(b) => Ok(AttributeValue::Bool(*b)),
            other => Err(ValidationError::InvalidType {
                expected: "boolean",
                received: json_kind(other),
            }),
        }
    }

    fn shape(&self) -> Option<ShapeTag> {
        Some(ShapeTag::Boolean)
    }
}

/// Accepts base64 strings, stored as binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryValidator;

impl Validator for BinaryValidator {
    fn parse(&self, raw: Option<&Value>) -> Result<AttributeValue, ValidationError> {
        let s = require_str(raw, "base64 string")?;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(s)
            .map_err(|e| ValidationError::InvalidFormat {
                expected: "base64",
                message: e.to_string(),
            })?;
        Ok(AttributeValue::B(bytes::Bytes::from(decoded)))
    }

    fn shape(&self) -> Option<ShapeTag> {
        Some(ShapeTag::Binary)
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// Accepts arrays whose elements all pass `inner`.
#[derive(Debug, Clone)]
pub struct ListValidator {
    inner: ValidatorRef,
}

impl Validator for ListValidator {
    fn parse(&self, raw: Option<&Value>) -> Result<AttributeValue, ValidationError> {
        let items = match require(raw)? {
            Value::Array(items) => items,
            other => {
                return Err(ValidationError::InvalidType {
                    expected: "array",
                    received: json_kind(other),
                });
            }
        };
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                self.inner
                    .parse(Some(item))
                    .map_err(|e| ValidationError::InvalidElement {
                        index,
                        source: Box::new(e),
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(AttributeValue::L)
    }

    fn shape(&self) -> Option<ShapeTag> {
        Some(ShapeTag::Array)
    }
}

/// Accepts any JSON object.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapValidator;

impl Validator for MapValidator {
    fn parse(&self, raw: Option<&Value>) -> Result<AttributeValue, ValidationError> {
        match require(raw)? {
            value @ Value::Object(_) => Ok(AttributeValue::from_json(value)),
            other => Err(ValidationError::InvalidType {
                expected: "object",
                received: json_kind(other),
            }),
        }
    }

    fn shape(&self) -> Option<ShapeTag> {
        Some(ShapeTag::Record)
    }
}

// ---------------------------------------------------------------------------
// Modifiers and constants
// ---------------------------------------------------------------------------

/// Wraps another validator; absent and `null` become the `NULL` attribute.
#[derive(Debug, Clone)]
pub struct OptionalValidator {
    inner: ValidatorRef,
}

impl Validator for OptionalValidator {
    fn parse(&self, raw: Option<&Value>) -> Result<AttributeValue, ValidationError> {
        match raw {
            None | Some(Value::Null) => Ok(AttributeValue::Null(true)),
            Some(value) => self.inner.parse(Some(value)),
        }
    }

    fn shape(&self) -> Option<ShapeTag> {
        Some(ShapeTag::Optional)
    }
}

/// Accepts one string out of a fixed set.
#[derive(Debug, Clone)]
pub struct EnumValidator {
    values: Vec<String>,
}

impl Validator for EnumValidator {
    fn parse(&self, raw: Option<&Value>) -> Result<AttributeValue, ValidationError> {
        let s = require_str(raw, "string")?;
        if self.values.iter().any(|v| v == s) {
            Ok(AttributeValue::from(s))
        } else {
            Err(ValidationError::NotAllowed {
                allowed: self.values.join(", "),
                received: s.to_owned(),
            })
        }
    }

    fn shape(&self) -> Option<ShapeTag> {
        Some(ShapeTag::Enum)
    }
}

/// Accepts exactly one JSON value.
#[derive(Debug, Clone)]
pub struct LiteralValidator {
    value: Value,
}

impl Validator for LiteralValidator {
    fn parse(&self, raw: Option<&Value>) -> Result<AttributeValue, ValidationError> {
        let value = require(raw)?;
        if *value == self.value {
            Ok(AttributeValue::from_json(value))
        } else {
            Err(ValidationError::NotAllowed {
                allowed: self.value.to_string(),
                received: value.to_string(),
            })
        }
    }

    fn shape(&self) -> Option<ShapeTag> {
        Some(ShapeTag::Literal)
    }
}

/// Any string.
#[must_use]
pub fn string() -> ValidatorRef {
    Arc::new(StringValidator)
}

/// An RFC 3339 timestamp string.
#[must_use]
pub fn datetime() -> ValidatorRef {
    Arc::new(DateTimeValidator)
}

/// Any number.
#[must_use]
pub fn number() -> ValidatorRef {
    Arc::new(NumberValidator)
}

/// `true` or `false`.
#[must_use]
pub fn boolean() -> ValidatorRef {
    Arc::new(BooleanValidator)
}

/// Base64-encoded bytes.
#[must_use]
pub fn binary() -> ValidatorRef {
    Arc::new(BinaryValidator)
}

/// An array whose elements pass `inner`.
#[must_use]
pub fn list(inner: ValidatorRef) -> ValidatorRef {
    Arc::new(ListValidator { inner })
}

/// Any object.
#[must_use]
pub fn map() -> ValidatorRef {
    Arc::new(MapValidator)
}

/// `inner`, or absent.
#[must_use]
pub fn optional(inner: ValidatorRef) -> ValidatorRef {
    Arc::new(OptionalValidator { inner })
}

/// One of `values`.
#[must_use]
pub fn enumeration<I, V>(values: I) -> ValidatorRef
where
    I: IntoIterator<Item = V>,
    V: Into<String>,
{
    Arc::new(EnumValidator {
        values: values.into_iter().map(Into::into).collect(),
    })
}

/// Exactly `value`.
#[must_use]
pub fn literal(value: impl Into<Value>) -> ValidatorRef {
    Arc::new(LiteralValidator {
        value: value.into(),
    })
}
