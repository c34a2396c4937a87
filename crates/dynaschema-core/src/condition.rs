//! Key-condition compiler.
//!
//! A [`KeyCondition`] describes sort-key comparisons; compiling it yields
//! expression fragments over fixed placeholder names, which [`compile_query`]
//! prefixes with the partition-key equality to form a `Query` request.

use std::collections::HashMap;

use dynaschema_model::AttributeValue;
use dynaschema_model::input::QueryInput;
use tracing::debug;

use crate::error::SchemaError;
use crate::schema::{PARTITION_KEY, SORT_KEY};

/// Placeholder for `=`.
pub const EQ: &str = ":eq";
/// Placeholder for `<`.
pub const LESS_THAN: &str = ":lessThan";
/// Placeholder for `<=`.
pub const LESS_THAN_EQUAL: &str = ":lessThanEqual";
/// Placeholder for `>`.
pub const GREATER_THAN: &str = ":greaterThan";
/// Placeholder for `>=`.
pub const GREATER_THAN_EQUAL: &str = ":greaterThanEqual";
/// Placeholder for the low bound of `between`.
pub const BETWEEN_LOW: &str = ":betweenA";
/// Placeholder for the high bound of `between`.
pub const BETWEEN_HIGH: &str = ":betweenB";
/// Placeholder for the `begins_with` prefix.
pub const BEGINS_WITH: &str = ":beginsWith";

/// Every sort-key placeholder.
pub const SORT_KEY_PLACEHOLDERS: [&str; 8] = [
    EQ,
    LESS_THAN,
    LESS_THAN_EQUAL,
    GREATER_THAN,
    GREATER_THAN_EQUAL,
    BETWEEN_LOW,
    BETWEEN_HIGH,
    BEGINS_WITH,
];

/// Whether a partition key named `name` would be bound to one of the
/// sort-key placeholders.
#[must_use]
pub fn collides_with_placeholder(name: &str) -> bool {
    SORT_KEY_PLACEHOLDERS
        .iter()
        .any(|placeholder| placeholder.strip_prefix(':') == Some(name))
}

/// Comparisons on a sort key, applied together.
///
/// Each operator appears at most once. An empty condition matches the whole
/// partition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyCondition {
    eq: Option<AttributeValue>,
    lt: Option<AttributeValue>,
    le: Option<AttributeValue>,
    gt: Option<AttributeValue>,
    ge: Option<AttributeValue>,
    between: Option<(AttributeValue, AttributeValue)>,
    begins_with: Option<AttributeValue>,
}

impl KeyCondition {
    /// An empty condition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `sk = value`.
    #[must_use]
    pub fn eq(mut self, value: impl Into<AttributeValue>) -> Self {
        self.eq = Some(value.into());
        self
    }

    /// `sk < value`.
    #[must_use]
    pub fn lt(mut self, value: impl Into<AttributeValue>) -> Self {
        self.lt = Some(value.into());
        self
    }

    /// `sk <= value`.
    #[must_use]
    pub fn le(mut self, value: impl Into<AttributeValue>) -> Self {
        self.le = Some(value.into());
        self
    }

    /// `sk > value`.
    #[must_use]
    pub fn gt(mut self, value: impl Into<AttributeValue>) -> Self {
        self.gt = Some(value.into());
        self
    }

    /// `sk >= value`.
    #[must_use]
    pub fn ge(mut self, value: impl Into<AttributeValue>) -> Self {
        self.ge = Some(value.into());
        self
    }

    /// `sk between low and high`. The bounds are used in the order given.
    #[must_use]
    pub fn between(
        mut self,
        low: impl Into<AttributeValue>,
        high: impl Into<AttributeValue>,
    ) -> Self {
        self.between = Some((low.into(), high.into()));
        self
    }

    /// `begins_with(sk, prefix)`.
    #[must_use]
    pub fn begins_with(mut self, prefix: impl Into<AttributeValue>) -> Self {
        self.begins_with = Some(prefix.into());
        self
    }

    /// Whether no operator is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Fragments and bound values produced from a [`KeyCondition`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledCondition {
    /// One fragment per operator, in a fixed order.
    pub fragments: Vec<String>,
    /// Placeholder to value.
    pub values: HashMap<String, AttributeValue>,
}

impl CompiledCondition {
    /// The fragments joined with ` and `.
    #[must_use]
    pub fn expression(&self) -> String {
        self.fragments.join(" and ")
    }

    fn push(&mut self, fragment: String, bindings: &[(&str, &AttributeValue)]) {
        self.fragments.push(fragment);
        for (name, value) in bindings {
            self.values.insert((*name).to_owned(), (*value).clone());
        }
    }
}

/// Compile `condition` against the sort key attribute `sort_key`.
///
/// Fragments come out in the order `=`, `<`, `<=`, `>`, `>=`, `between`,
/// `begins_with`.
#[must_use]
pub fn compile_sort_key_condition(sort_key: &str, condition: &KeyCondition) -> CompiledCondition {
    let mut out = CompiledCondition::default();
    let comparisons = [
        ("=", EQ, &condition.eq),
        ("<", LESS_THAN, &condition.lt),
        ("<=", LESS_THAN_EQUAL, &condition.le),
        (">", GREATER_THAN, &condition.gt),
        (">=", GREATER_THAN_EQUAL, &condition.ge),
    ];
    for (op, placeholder, value) in comparisons {
        if let Some(value) = value {
            out.push(format!("{sort_key} {op} {placeholder}"), &[(placeholder, value)]);
        }
    }
    if let Some((low, high)) = &condition.between {
        out.push(
            format!("{sort_key} between {BETWEEN_LOW} and {BETWEEN_HIGH}"),
            &[(BETWEEN_LOW, low), (BETWEEN_HIGH, high)],
        );
    }
    if let Some(prefix) = &condition.begins_with {
        out.push(
            format!("begins_with({sort_key}, {BEGINS_WITH})"),
            &[(BEGINS_WITH, prefix)],
        );
    }
    out
}

/// A query over any key pair: the base table's or a secondary index's.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyQuery {
    /// Partition key attribute name.
    pub partition_key_name: String,
    /// Value the partition key must equal.
    pub partition_key_value: AttributeValue,
    /// Sort key attribute name.
    pub sort_key_name: String,
    /// Sort key comparisons.
    pub condition: KeyCondition,
    /// Secondary index to query instead of the base table.
    pub index_name: Option<String>,
    /// Ascending sort-key order when `true`.
    pub scan_forward: bool,
}

impl KeyQuery {
    /// A base-table query on `pk = value`.
    #[must_use]
    pub fn new(partition_key_value: impl Into<AttributeValue>) -> Self {
        Self {
            partition_key_name: PARTITION_KEY.to_owned(),
            partition_key_value: partition_key_value.into(),
            sort_key_name: SORT_KEY.to_owned(),
            condition: KeyCondition::default(),
            index_name: None,
            scan_forward: true,
        }
    }

    /// Use a different partition key attribute.
    #[must_use]
    pub fn partition_key(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.partition_key_name = name.into();
        self.partition_key_value = value.into();
        self
    }

    /// Constrain the sort key `name` with `condition`.
    #[must_use]
    pub fn sort_key(mut self, name: impl Into<String>, condition: KeyCondition) -> Self {
        self.sort_key_name = name.into();
        self.condition = condition;
        self
    }

    /// Query the secondary index `name`.
    #[must_use]
    pub fn index(mut self, name: impl Into<String>) -> Self {
        self.index_name = Some(name.into());
        self
    }

    /// Return results in descending sort-key order.
    #[must_use]
    pub fn descending(mut self) -> Self {
        self.scan_forward = false;
        self
    }
}

/// Build the `Query` request for `query` against `table_name`.
///
/// The expression is `<pk> = :<pk>`, followed by ` and ` and the compiled
/// sort-key fragments when there are any.
///
/// # Errors
///
/// Returns [`SchemaError::PlaceholderCollision`] when `:<pk>` is one of the
/// sort-key placeholders.
pub fn compile_query(table_name: &str, query: &KeyQuery) -> Result<QueryInput, SchemaError> {
    let pk = &query.partition_key_name;
    if collides_with_placeholder(pk) {
        return Err(SchemaError::PlaceholderCollision { field: pk.clone() });
    }
    let compiled = compile_sort_key_condition(&query.sort_key_name, &query.condition);
    let mut expression = format!("{pk} = :{pk}");
    if !compiled.fragments.is_empty() {
        expression.push_str(" and ");
        expression.push_str(&compiled.expression());
    }

    let mut values = compiled.values;
    values.insert(format!(":{pk}"), query.partition_key_value.clone());

    debug!(
        table = table_name,
        index = query.index_name.as_deref().unwrap_or("-"),
        expression = %expression,
        "compiled key condition"
    );

    Ok(QueryInput {
        table_name: table_name.to_owned(),
        index_name: query.index_name.clone(),
        key_condition_expression: Some(expression),
        expression_attribute_values: values,
        scan_index_forward: (!query.scan_forward).then_some(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(s: &str) -> AttributeValue {
        AttributeValue::from(s)
    }

    #[test]
    fn test_should_compile_between_in_given_order() {
        let compiled = compile_sort_key_condition("sk", &KeyCondition::new().between("a", "m"));
        assert_eq!(compiled.fragments, vec!["sk between :betweenA and :betweenB"]);
        assert_eq!(compiled.values.len(), 2);
        assert_eq!(compiled.values[":betweenA"], value("a"));
        assert_eq!(compiled.values[":betweenB"], value("m"));
    }

    #[test]
    fn test_should_not_reorder_between_bounds() {
        let compiled = compile_sort_key_condition("sk", &KeyCondition::new().between("z", "a"));
        assert_eq!(compiled.values[":betweenA"], value("z"));
        assert_eq!(compiled.values[":betweenB"], value("a"));
    }

    #[test]
    fn test_should_compile_each_single_operator() {
        let cases = [
            (KeyCondition::new().eq("x"), "sk = :eq", ":eq"),
            (KeyCondition::new().lt("x"), "sk < :lessThan", ":lessThan"),
            (KeyCondition::new().le("x"), "sk <= :lessThanEqual", ":lessThanEqual"),
            (KeyCondition::new().gt("x"), "sk > :greaterThan", ":greaterThan"),
            (KeyCondition::new().ge("x"), "sk >= :greaterThanEqual", ":greaterThanEqual"),
            (
                KeyCondition::new().begins_with("x"),
                "begins_with(sk, :beginsWith)",
                ":beginsWith",
            ),
        ];
        for (condition, fragment, placeholder) in cases {
            let compiled = compile_sort_key_condition("sk", &condition);
            assert_eq!(compiled.fragments, vec![fragment.to_owned()]);
            assert_eq!(compiled.values.len(), 1);
            assert_eq!(compiled.values[placeholder], value("x"));
        }
    }

    #[test]
    fn test_should_join_multiple_operators_in_fixed_order() {
        let condition = KeyCondition::new().begins_with("a").gt("a0").eq("a1");
        let compiled = compile_sort_key_condition("sk", &condition);
        assert_eq!(
            compiled.expression(),
            "sk = :eq and sk > :greaterThan and begins_with(sk, :beginsWith)"
        );
        assert_eq!(compiled.values.len(), 3);
    }

    #[test]
    fn test_should_compile_begins_with_query() {
        let query = KeyQuery::new("post:").sort_key("sk", KeyCondition::new().begins_with("abc"));
        let input = compile_query("test-table", &query).unwrap();
        assert_eq!(input.table_name, "test-table");
        assert_eq!(
            input.key_condition_expression.as_deref(),
            Some("pk = :pk and begins_with(sk, :beginsWith)")
        );
        assert_eq!(
            input.expression_attribute_values,
            HashMap::from([
                (":pk".to_owned(), value("post:")),
                (":beginsWith".to_owned(), value("abc")),
            ])
        );
        assert!(input.index_name.is_none());
        assert!(input.scan_index_forward.is_none());
    }

    #[test]
    fn test_should_degrade_empty_condition_to_partition_query() {
        let input = compile_query("t", &KeyQuery::new("post:")).unwrap();
        assert_eq!(input.key_condition_expression.as_deref(), Some("pk = :pk"));
        assert_eq!(input.expression_attribute_values.len(), 1);
        assert!(KeyCondition::new().is_empty());
    }

    #[test]
    fn test_should_attach_index_name() {
        let query = KeyQuery::new("u1")
            .partition_key("userID", "u1")
            .sort_key("pk", KeyCondition::new().eq("post:"))
            .index("userID")
            .descending();
        let input = compile_query("t", &query).unwrap();
        assert_eq!(input.index_name.as_deref(), Some("userID"));
        assert_eq!(
            input.key_condition_expression.as_deref(),
            Some("userID = :userID and pk = :eq")
        );
        assert_eq!(input.expression_attribute_values[":userID"], value("u1"));
        assert_eq!(input.scan_index_forward, Some(false));
    }

    #[test]
    fn test_should_refuse_partition_key_named_like_a_placeholder() {
        let query = KeyQuery::new("u1")
            .partition_key("eq", "HASH-VALUE")
            .sort_key("pk", KeyCondition::new().eq("post:"))
            .index("byEq");
        let err = compile_query("t", &query).unwrap_err();
        assert_eq!(err, SchemaError::PlaceholderCollision { field: "eq".to_owned() });
    }

    #[test]
    fn test_should_keep_both_bindings_for_distinct_names() {
        let query = KeyQuery::new("u1")
            .partition_key("equals", "HASH-VALUE")
            .sort_key("pk", KeyCondition::new().eq("post:"));
        let input = compile_query("t", &query).unwrap();
        assert_eq!(
            input.key_condition_expression.as_deref(),
            Some("equals = :equals and pk = :eq")
        );
        assert_eq!(input.expression_attribute_values.len(), 2);
        assert_eq!(input.expression_attribute_values[":eq"], value("post:"));
        assert_eq!(input.expression_attribute_values[":equals"], value("HASH-VALUE"));
    }

    #[test]
    fn test_should_flag_every_placeholder_name() {
        for placeholder in SORT_KEY_PLACEHOLDERS {
            assert!(collides_with_placeholder(&placeholder[1..]));
        }
        assert!(!collides_with_placeholder("pk"));
        assert!(!collides_with_placeholder(":eq"));
    }
}
