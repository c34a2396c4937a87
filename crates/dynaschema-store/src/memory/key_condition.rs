//! Key-condition expression parsing for the in-memory store.
//!
//! Supports the subset of the expression language that key conditions use:
//!
//! ```text
//! condition := term ( AND term )*
//! term      := operand ( = | < | <= | > | >= ) operand
//!            | operand BETWEEN operand AND operand
//!            | begins_with ( operand , operand )
//!            | ( condition )
//! operand   := identifier | :value
//! ```
//!
//! Keywords are case-insensitive. Attribute names appear literally; `#name`
//! substitutions are not accepted. The parsed conjunction is then resolved
//! against a key schema into a partition value plus sort-key conditions.

use std::collections::HashMap;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use dynaschema_model::AttributeValue;
use dynaschema_model::error::DynamoDBError;

use super::storage::{KeySchema, SortKeyCondition, SortableAttributeValue, validate_key_type};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors produced while parsing or resolving a key condition.
#[derive(Debug, thiserror::Error)]
pub enum KeyConditionError {
    /// An unexpected token was encountered.
    #[error("Invalid KeyConditionExpression: expected {expected}, found {found}")]
    UnexpectedToken {
        /// What was expected.
        expected: String,
        /// What was found.
        found: String,
    },
    /// An expression attribute value placeholder could not be resolved.
    #[error("An expression attribute value used in expression is not defined; attribute value: :{name}")]
    UnresolvedValue {
        /// The unresolved value reference.
        name: String,
    },
    /// The condition does not fit the key schema.
    #[error("Query condition missed key schema element: {message}")]
    KeySchemaMismatch {
        /// Explanation.
        message: String,
    },
}

impl From<KeyConditionError> for DynamoDBError {
    fn from(e: KeyConditionError) -> Self {
        DynamoDBError::validation(e.to_string()).with_source(e)
    }
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Identifier(String),
    ExprAttrValue(String),
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
    Comma,
    LParen,
    RParen,
    And,
    Between,
    BeginsWith,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(s) => write!(f, "identifier '{s}'"),
            Self::ExprAttrValue(s) => write!(f, ":{s}"),
            Self::Eq => write!(f, "'='"),
            Self::Lt => write!(f, "'<'"),
            Self::Le => write!(f, "'<='"),
            Self::Gt => write!(f, "'>'"),
            Self::Ge => write!(f, "'>='"),
            Self::Comma => write!(f, "','"),
            Self::LParen => write!(f, "'('"),
            Self::RParen => write!(f, "')'"),
            Self::And => write!(f, "AND"),
            Self::Between => write!(f, "BETWEEN"),
            Self::BeginsWith => write!(f, "begins_with"),
            Self::Eof => write!(f, "EOF"),
        }
    }
}

// ---------------------------------------------------------------------------
// Lexer
// ---------------------------------------------------------------------------

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn tokenize(&mut self) -> Result<Vec<Token>, KeyConditionError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let done = tok == Token::Eof;
            tokens.push(tok);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, KeyConditionError> {
        while self.chars.peek().is_some_and(char::is_ascii_whitespace) {
            self.chars.next();
        }

        let Some(&ch) = self.chars.peek() else {
            return Ok(Token::Eof);
        };

        match ch {
            ':' => {
                self.chars.next();
                self.read_placeholder("value name after ':'")
                    .map(Token::ExprAttrValue)
            }
            '=' => Ok(self.single(Token::Eq)),
            ',' => Ok(self.single(Token::Comma)),
            '(' => Ok(self.single(Token::LParen)),
            ')' => Ok(self.single(Token::RParen)),
            '<' => {
                self.chars.next();
                Ok(self.or_equal(Token::Lt, Token::Le))
            }
            '>' => {
                self.chars.next();
                Ok(self.or_equal(Token::Gt, Token::Ge))
            }
            c if c.is_ascii_alphabetic() || c == '_' => Ok(self.read_identifier_or_keyword()),
            _ => Err(KeyConditionError::UnexpectedToken {
                expected: "valid token".to_owned(),
                found: format!("'{ch}'"),
            }),
        }
    }

    fn single(&mut self, token: Token) -> Token {
        self.chars.next();
        token
    }

    fn or_equal(&mut self, bare: Token, with_equal: Token) -> Token {
        if self.chars.peek() == Some(&'=') {
            self.chars.next();
            with_equal
        } else {
            bare
        }
    }

    fn read_ident_chars(&mut self) -> String {
        let mut s = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                s.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        s
    }

    fn read_placeholder(&mut self, expected: &str) -> Result<String, KeyConditionError> {
        let name = self.read_ident_chars();
        if name.is_empty() {
            return Err(KeyConditionError::UnexpectedToken {
                expected: expected.to_owned(),
                found: "empty".to_owned(),
            });
        }
        Ok(name)
    }

    fn read_identifier_or_keyword(&mut self) -> Token {
        let ident = self.read_ident_chars();
        match ident.to_ascii_lowercase().as_str() {
            "and" => Token::And,
            "between" => Token::Between,
            "begins_with" => Token::BeginsWith,
            _ => Token::Identifier(ident),
        }
    }
}

// ---------------------------------------------------------------------------
// AST
// ---------------------------------------------------------------------------

/// An operand of a key-condition term.
#[derive(Debug, Clone, PartialEq)]
enum Operand {
    /// Attribute name.
    Path(String),
    /// Resolved `:value` reference.
    Value(AttributeValue),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CompareOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// The operator seen from the other side: `:v < k` is `k > :v`.
    fn flipped(self) -> Self {
        match self {
            Self::Eq => Self::Eq,
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Term {
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    Between {
        subject: Operand,
        low: Operand,
        high: Operand,
    },
    BeginsWith {
        subject: Operand,
        prefix: Operand,
    },
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    values: &'a HashMap<String, AttributeValue>,
}

impl Parser<'_> {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: &Token) -> Result<(), KeyConditionError> {
        let tok = self.advance();
        if &tok == expected {
            Ok(())
        } else {
            Err(KeyConditionError::UnexpectedToken {
                expected: expected.to_string(),
                found: tok.to_string(),
            })
        }
    }

    fn parse_conjunction(&mut self, terms: &mut Vec<Term>) -> Result<(), KeyConditionError> {
        self.parse_term(terms)?;
        while self.peek() == &Token::And {
            self.advance();
            self.parse_term(terms)?;
        }
        Ok(())
    }

    fn parse_term(&mut self, terms: &mut Vec<Term>) -> Result<(), KeyConditionError> {
        match self.peek() {
            Token::LParen => {
                self.advance();
                self.parse_conjunction(terms)?;
                self.expect(&Token::RParen)
            }
            Token::BeginsWith => {
                self.advance();
                self.expect(&Token::LParen)?;
                let subject = self.parse_operand()?;
                self.expect(&Token::Comma)?;
                let prefix = self.parse_operand()?;
                self.expect(&Token::RParen)?;
                terms.push(Term::BeginsWith { subject, prefix });
                Ok(())
            }
            _ => {
                let left = self.parse_operand()?;
                let op = match self.advance() {
                    Token::Eq => CompareOp::Eq,
                    Token::Lt => CompareOp::Lt,
                    Token::Le => CompareOp::Le,
                    Token::Gt => CompareOp::Gt,
                    Token::Ge => CompareOp::Ge,
                    Token::Between => {
                        let low = self.parse_operand()?;
                        self.expect(&Token::And)?;
                        let high = self.parse_operand()?;
                        terms.push(Term::Between {
                            subject: left,
                            low,
                            high,
                        });
                        return Ok(());
                    }
                    other => {
                        return Err(KeyConditionError::UnexpectedToken {
                            expected: "comparison operator".to_owned(),
                            found: other.to_string(),
                        });
                    }
                };
                let right = self.parse_operand()?;
                terms.push(Term::Compare { left, op, right });
                Ok(())
            }
        }
    }

    fn parse_operand(&mut self) -> Result<Operand, KeyConditionError> {
        match self.advance() {
            Token::Identifier(name) => Ok(Operand::Path(name)),
            Token::ExprAttrValue(name) => self
                .values
                .get(&format!(":{name}"))
                .map(|value| Operand::Value(value.clone()))
                .ok_or(KeyConditionError::UnresolvedValue { name }),
            other => Err(KeyConditionError::UnexpectedToken {
                expected: "attribute or value".to_owned(),
                found: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolution against a key schema
// ---------------------------------------------------------------------------

/// A key condition resolved against a table or index key schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedKeyCondition {
    /// The partition key value to look up.
    pub partition_value: AttributeValue,
    /// Sort-key conditions, applied conjunctively.
    pub sort_conditions: Vec<SortKeyCondition>,
}

/// Parse `expression` and resolve it against `schema`.
///
/// Exactly one equality on the partition key is required; every other term
/// must constrain the sort key. Several sort-key terms are accepted and
/// applied together.
pub fn resolve_key_condition(
    expression: &str,
    schema: &KeySchema,
    values: &HashMap<String, AttributeValue>,
) -> Result<ResolvedKeyCondition, KeyConditionError> {
    let tokens = Lexer::new(expression).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        values,
    };
    let mut terms = Vec::new();
    parser.parse_conjunction(&mut terms)?;
    if parser.peek() != &Token::Eof {
        return Err(KeyConditionError::UnexpectedToken {
            expected: "end of expression".to_owned(),
            found: parser.peek().to_string(),
        });
    }

    let mut partition_value = None;
    let mut sort_conditions = Vec::new();

    for term in terms {
        match term {
            Term::Compare { left, op, right } => {
                let (name, value, op) = match (left, right) {
                    (Operand::Path(name), Operand::Value(value)) => (name, value, op),
                    (Operand::Value(value), Operand::Path(name)) => (name, value, op.flipped()),
                    _ => return Err(mismatch("comparison must pair a key with a value")),
                };
                if name == schema.partition_key.name {
                    if op != CompareOp::Eq || partition_value.is_some() {
                        return Err(mismatch(
                            "the partition key requires exactly one equality condition",
                        ));
                    }
                    validate_key_type(&schema.partition_key, &value)
                        .map_err(|e| mismatch(&e.to_string()))?;
                    partition_value = Some(value);
                } else {
                    let sortable = sort_value(schema, &name, &value)?;
                    sort_conditions.push(match op {
                        CompareOp::Eq => SortKeyCondition::Eq(sortable),
                        CompareOp::Lt => SortKeyCondition::Lt(sortable),
                        CompareOp::Le => SortKeyCondition::Le(sortable),
                        CompareOp::Gt => SortKeyCondition::Gt(sortable),
                        CompareOp::Ge => SortKeyCondition::Ge(sortable),
                    });
                }
            }
            Term::Between { subject, low, high } => {
                let (Operand::Path(name), Operand::Value(low), Operand::Value(high)) =
                    (subject, low, high)
                else {
                    return Err(mismatch("BETWEEN must apply to a key with two values"));
                };
                let low = sort_value(schema, &name, &low)?;
                let high = sort_value(schema, &name, &high)?;
                sort_conditions.push(SortKeyCondition::Between(low, high));
            }
            Term::BeginsWith { subject, prefix } => {
                let (Operand::Path(name), Operand::Value(prefix)) = (subject, prefix) else {
                    return Err(mismatch("begins_with must apply to a key and a value"));
                };
                sort_value(schema, &name, &prefix)?;
                sort_conditions.push(match prefix {
                    AttributeValue::S(s) => SortKeyCondition::BeginsWith(s),
                    AttributeValue::B(b) => SortKeyCondition::BeginsWithBytes(b),
                    _ => return Err(mismatch("begins_with requires a string or binary key")),
                });
            }
        }
    }

    let partition_value = partition_value.ok_or_else(|| {
        mismatch(&format!(
            "no equality condition on {}",
            schema.partition_key.name
        ))
    })?;

    Ok(ResolvedKeyCondition {
        partition_value,
        sort_conditions,
    })
}

fn sort_value(
    schema: &KeySchema,
    name: &str,
    value: &AttributeValue,
) -> Result<SortableAttributeValue, KeyConditionError> {
    let Some(sort_key) = schema.sort_key.as_ref().filter(|sk| sk.name == name) else {
        return Err(mismatch(&format!("{name} is not a key of this table or index")));
    };
    validate_key_type(sort_key, value).map_err(|e| mismatch(&e.to_string()))?;
    SortableAttributeValue::from_attribute_value(name, value).map_err(|e| mismatch(&e.to_string()))
}

fn mismatch(message: &str) -> KeyConditionError {
    KeyConditionError::KeySchemaMismatch {
        message: message.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use dynaschema_model::types::AttributeType;

    use super::*;
    use crate::memory::storage::KeyAttribute;

    fn schema() -> KeySchema {
        KeySchema {
            partition_key: KeyAttribute {
                name: "pk".to_owned(),
                attr_type: AttributeType::S,
            },
            sort_key: Some(KeyAttribute {
                name: "sk".to_owned(),
                attr_type: AttributeType::S,
            }),
        }
    }

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, AttributeValue> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), AttributeValue::from(*v)))
            .collect()
    }

    fn s(value: &str) -> SortableAttributeValue {
        SortableAttributeValue::S(value.to_owned())
    }

    #[test]
    fn test_should_resolve_partition_only_condition() {
        let resolved = resolve_key_condition(
            "pk = :pk",
            &schema(),
            &values(&[(":pk", "user:")]),
        )
        .unwrap();
        assert_eq!(resolved.partition_value, AttributeValue::from("user:"));
        assert!(resolved.sort_conditions.is_empty());
    }

    #[test]
    fn test_should_resolve_begins_with() {
        let resolved = resolve_key_condition(
            "pk = :pk and begins_with(sk, :beginsWith)",
            &schema(),
            &values(&[(":pk", "post:"), (":beginsWith", "abc")]),
        )
        .unwrap();
        assert_eq!(
            resolved.sort_conditions,
            vec![SortKeyCondition::BeginsWith("abc".to_owned())]
        );
    }

    #[test]
    fn test_should_resolve_between_and_extra_terms() {
        let resolved = resolve_key_condition(
            "pk = :pk and sk between :betweenA and :betweenB AND sk >= :greaterThanEqual",
            &schema(),
            &values(&[
                (":pk", "post:"),
                (":betweenA", "a"),
                (":betweenB", "m"),
                (":greaterThanEqual", "c"),
            ]),
        )
        .unwrap();
        assert_eq!(
            resolved.sort_conditions,
            vec![
                SortKeyCondition::Between(s("a"), s("m")),
                SortKeyCondition::Ge(s("c")),
            ]
        );
    }

    #[test]
    fn test_should_flip_reversed_comparison() {
        let resolved = resolve_key_condition(
            "(:v < sk) AND pk = :pk",
            &schema(),
            &values(&[(":pk", "post:"), (":v", "b")]),
        )
        .unwrap();
        assert_eq!(resolved.sort_conditions, vec![SortKeyCondition::Gt(s("b"))]);
    }

    #[test]
    fn test_should_reject_attribute_name_substitution() {
        let err =
            resolve_key_condition("#k = :pk", &schema(), &values(&[(":pk", "post:")])).unwrap_err();
        assert!(matches!(err, KeyConditionError::UnexpectedToken { found, .. } if found == "'#'"));
    }

    #[test]
    fn test_should_reject_missing_partition_condition() {
        let err = resolve_key_condition(
            "sk = :v",
            &schema(),
            &values(&[(":v", "b")]),
        )
        .unwrap_err();
        assert!(matches!(err, KeyConditionError::KeySchemaMismatch { .. }));
    }

    #[test]
    fn test_should_reject_undefined_value() {
        let err =
            resolve_key_condition("pk = :pk", &schema(), &HashMap::new())
                .unwrap_err();
        assert!(matches!(err, KeyConditionError::UnresolvedValue { name } if name == "pk"));
    }

    #[test]
    fn test_should_reject_dangling_conjunction() {
        let err = resolve_key_condition(
            "pk = :pk and ",
            &schema(),
            &values(&[(":pk", "post:")]),
        )
        .unwrap_err();
        assert!(matches!(err, KeyConditionError::UnexpectedToken { .. }));
    }

    #[test]
    fn test_should_reject_condition_on_non_key_attribute() {
        let err = resolve_key_condition(
            "pk = :pk and name = :n",
            &schema(),
            &values(&[(":pk", "post:"), (":n", "x")]),
        )
        .unwrap_err();
        assert!(matches!(err, KeyConditionError::KeySchemaMismatch { .. }));
    }
}
