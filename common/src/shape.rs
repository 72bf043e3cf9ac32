//! Structural shape descriptions for open values.
//!
//! A `Shape` states which keys a value must carry and the primitive kind of
//! each, recursively. Checking a value against a shape yields every
//! violation found, each keyed by the path that differs.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::display::ColumnType;
use crate::value::{index_path, key_path, ValueKind, ROOT_PATH};

/// Expected structure of a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Anything, including null.
    Any,
    Bool,
    Number,
    String,
    NonEmptyString,
    /// A string drawn from a closed set.
    OneOf(Vec<String>),
    /// A sequence whose every item has the inner shape.
    Sequence(Box<Shape>),
    /// A mapping with declared fields. Undeclared keys are allowed.
    Mapping(Vec<Field>),
    /// A mapping with arbitrary keys whose every value has the inner shape.
    MapOf(Box<Shape>),
}

/// A declared key of a [`Shape::Mapping`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: String,
    pub shape: Shape,
    pub required: bool,
}

impl Field {
    pub fn required(key: impl Into<String>, shape: Shape) -> Self {
        Self {
            key: key.into(),
            shape,
            required: true,
        }
    }

    pub fn optional(key: impl Into<String>, shape: Shape) -> Self {
        Self {
            key: key.into(),
            shape,
            required: false,
        }
    }
}

/// One place where a value does not match its shape.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeViolation {
    pub path: String,
    pub expected: String,
    pub actual: String,
}

impl Shape {
    pub fn mapping(fields: Vec<Field>) -> Self {
        Self::Mapping(fields)
    }

    pub fn sequence_of(item: Shape) -> Self {
        Self::Sequence(Box::new(item))
    }

    pub fn map_of(value: Shape) -> Self {
        Self::MapOf(Box::new(value))
    }

    pub fn one_of<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::OneOf(choices.into_iter().map(Into::into).collect())
    }

    /// Human-readable name of what this shape expects.
    pub fn describe(&self) -> String {
        match self {
            Self::Any => "any value".to_string(),
            Self::Bool => "bool".to_string(),
            Self::Number => "number".to_string(),
            Self::String => "string".to_string(),
            Self::NonEmptyString => "non-empty string".to_string(),
            Self::OneOf(choices) => format!("one of [{}]", choices.join(", ")),
            Self::Sequence(_) => "sequence".to_string(),
            Self::Mapping(_) | Self::MapOf(_) => "mapping".to_string(),
        }
    }

    /// Check `value` against this shape, collecting every violation.
    pub fn check(&self, value: &Value) -> Vec<ShapeViolation> {
        let mut violations = Vec::new();
        self.check_at(value, ROOT_PATH, &mut violations);
        violations
    }

    fn check_at(&self, value: &Value, path: &str, out: &mut Vec<ShapeViolation>) {
        let mismatch = |out: &mut Vec<ShapeViolation>, actual: String| {
            out.push(ShapeViolation {
                path: path.to_string(),
                expected: self.describe(),
                actual,
            })
        };
        let kind = ValueKind::of(value);

        match self {
            Self::Any => {}
            Self::Bool if !value.is_boolean() => mismatch(out, kind.to_string()),
            Self::Number if !value.is_number() => mismatch(out, kind.to_string()),
            Self::String if !value.is_string() => mismatch(out, kind.to_string()),
            Self::NonEmptyString => match value.as_str() {
                Some("") => mismatch(out, "empty string".to_string()),
                Some(_) => {}
                None => mismatch(out, kind.to_string()),
            },
            Self::OneOf(choices) => match value.as_str() {
                Some(s) if choices.iter().any(|c| c == s) => {}
                Some(s) => mismatch(out, format!("'{}'", s)),
                None => mismatch(out, kind.to_string()),
            },
            Self::Sequence(item) => match value.as_array() {
                Some(items) => {
                    for (index, element) in items.iter().enumerate() {
                        item.check_at(element, &index_path(path, index), out);
                    }
                }
                None => mismatch(out, kind.to_string()),
            },
            Self::Mapping(fields) => match value.as_object() {
                Some(map) => {
                    for field in fields {
                        let field_path = key_path(path, &field.key);
                        match map.get(&field.key) {
                            Some(inner) => field.shape.check_at(inner, &field_path, out),
                            None if field.required => out.push(ShapeViolation {
                                path: field_path,
                                expected: field.shape.describe(),
                                actual: ValueKind::Missing.to_string(),
                            }),
                            None => {}
                        }
                    }
                }
                None => mismatch(out, kind.to_string()),
            },
            Self::MapOf(inner) => match value.as_object() {
                Some(map) => {
                    for (key, element) in map {
                        inner.check_at(element, &key_path(path, key), out);
                    }
                }
                None => mismatch(out, kind.to_string()),
            },
            Self::Bool | Self::Number | Self::String => {}
        }
    }
}

/// Shape every display mapper output must satisfy.
pub fn display_shape() -> Shape {
    let column = Shape::mapping(vec![
        Field::required("name", Shape::String),
        Field::required("type", Shape::one_of(ColumnType::names())),
    ]);
    Shape::mapping(vec![
        Field::required("description", Shape::NonEmptyString),
        Field::required("tag", Shape::NonEmptyString),
        Field::optional(
            "violations",
            Shape::mapping(vec![
                Field::required("columns", Shape::map_of(column)),
                Field::optional("rows", Shape::sequence_of(Shape::Any)),
            ]),
        ),
    ])
}

/// Shape an occurrence must have once it reaches the display stage.
pub fn occurrence_shape() -> Shape {
    Shape::mapping(vec![Field::required("detail", Shape::Mapping(Vec::new()))])
}
