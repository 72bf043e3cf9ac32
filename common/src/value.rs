//! Helpers over the open `serde_json::Value` data model.
//!
//! Host payloads are schema-light: any intermediate may be null, missing, or
//! of an unexpected kind. The lookups here never fail; they return `None` or
//! the supplied default so mappers can degrade gracefully.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An open mapping from string keys to arbitrary values.
pub type Mapping = Map<String, Value>;

/// The primitive kind of a value, plus `Missing` for absent keys.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Missing,
    Null,
    Bool,
    Number,
    String,
    Sequence,
    Mapping,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(_) => Self::Number,
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Sequence,
            Value::Object(_) => Self::Mapping,
        }
    }

    /// Kind of an optional value, `Missing` when absent.
    pub fn of_opt(value: Option<&Value>) -> Self {
        value.map_or(Self::Missing, Self::of)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::String => "string",
            Self::Sequence => "sequence",
            Self::Mapping => "mapping",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Root marker used in every value path.
pub const ROOT_PATH: &str = "$";

/// Extend `path` with a mapping key.
pub fn key_path(path: &str, key: &str) -> String {
    format!("{}.{}", path, key)
}

/// Extend `path` with a sequence index.
pub fn index_path(path: &str, index: usize) -> String {
    format!("{}[{}]", path, index)
}

/// Walk `keys` through nested mappings. Any null, missing, or non-mapping
/// intermediate yields `None`.
pub fn lookup<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .try_fold(value, |current, key| current.get(*key))
}

/// The mapping at `keys`, or `None` when absent or not a mapping.
pub fn lookup_mapping<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Mapping> {
    lookup(value, keys).and_then(Value::as_object)
}

/// The sequence at `keys`, or an empty slice.
pub fn lookup_sequence<'a>(value: &'a Value, keys: &[&str]) -> &'a [Value] {
    lookup(value, keys)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// The boolean at `keys`; anything that is not a JSON boolean yields `default`.
pub fn bool_or(value: &Value, keys: &[&str], default: bool) -> bool {
    lookup(value, keys)
        .and_then(Value::as_bool)
        .unwrap_or(default)
}

/// The unsigned integer at `keys`, or `default`.
pub fn u64_or(value: &Value, keys: &[&str], default: u64) -> u64 {
    lookup(value, keys)
        .and_then(Value::as_u64)
        .unwrap_or(default)
}

/// The string at `keys`, or `None`.
pub fn str_at<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    lookup(value, keys).and_then(Value::as_str)
}

/// Canonical JSON bytes of a value. `serde_json` maps are key-sorted, so two
/// equal values always produce identical bytes.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}
