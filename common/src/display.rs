//! Display mapper output and the violations column schema.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Column value types the UI knows how to render.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Number,
    Email,
    Url,
}

impl ColumnType {
    pub const ALL: [ColumnType; 4] = [Self::String, Self::Number, Self::Email, Self::Url];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Email => "email",
            Self::Url => "url",
        }
    }

    /// Wire names of every column type, in declaration order.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(ColumnType::as_str).collect()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| format!("unknown column type '{}'", s))
    }
}

/// One column of the violations table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Tabular breakdown of individual violating items.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Violations {
    pub columns: BTreeMap<String, ColumnDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<Value>,
}

impl Violations {
    pub fn column(mut self, key: impl Into<String>, definition: ColumnDefinition) -> Self {
        self.columns.insert(key.into(), definition);
        self
    }

    pub fn row(mut self, row: Value) -> Self {
        self.rows.push(row);
        self
    }
}

/// UI-facing rendering of a control result.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DisplayOutput {
    /// What the control evaluates; identical for every result.
    pub description: String,
    /// Short summary of this particular result.
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violations: Option<Violations>,
}

impl DisplayOutput {
    pub fn new(description: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            tag: tag.into(),
            violations: None,
        }
    }

    pub fn with_violations(mut self, violations: Violations) -> Self {
        self.violations = Some(violations);
        self
    }

    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
