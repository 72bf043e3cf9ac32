//! Occurrence and attestation builders.
//!
//! Mappers always receive open values; these typed builders exist so hosts,
//! fixtures and tests can construct well-formed inputs without hand-writing
//! JSON.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::value::Mapping;

/// Literal discriminator carried by every occurrence.
pub const OCCURRENCE_TYPE: &str = "occurrence";

/// Status of an occurrence. Hosts may define more than `complete`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceStatus {
    Complete,
    #[serde(other)]
    Other,
}

/// One observed fact about an asset.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Occurrence {
    /// Identity/classification of the subject.
    pub asset: Option<Value>,
    /// Raw or mapped detail payload.
    #[serde(default)]
    pub detail: Mapping,
    pub status: OccurrenceStatus,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Occurrence {
    /// A complete occurrence for `asset` carrying `detail`.
    pub fn new(asset: Option<Value>, detail: Mapping) -> Self {
        Self {
            asset,
            detail,
            status: OccurrenceStatus::Complete,
            kind: OCCURRENCE_TYPE.to_string(),
        }
    }

    /// Shorthand for the `{key, name}` repository asset used by fixtures.
    pub fn repository_asset(key: &str, name: &str) -> Value {
        json!({"key": key, "name": name})
    }

    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Produce the occurrence the host hands to the display stage: `occurrence`
/// with its `detail` overwritten by `detail`. A non-mapping occurrence becomes
/// a mapping holding only `detail`.
pub fn splice_detail(occurrence: &Value, detail: Value) -> Value {
    let mut spliced = occurrence.as_object().cloned().unwrap_or_default();
    spliced.insert("detail".to_string(), detail);
    Value::Object(spliced)
}

/// Verdict of the external policy engine.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttestationResult {
    Pass,
    Fail,
    #[serde(other)]
    Other,
}

/// Policy configuration wrapper; `data` is control-defined.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Policy {
    #[serde(default)]
    pub data: Value,
}

/// Result of policy evaluation against mapped detail.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Attestation {
    pub policy: Policy,
    pub result: AttestationResult,
}

impl Attestation {
    /// Wrap policy `data` (typically a policy fixture) into an attestation.
    pub fn from_policy_data(data: Value, result: AttestationResult) -> Self {
        Self {
            policy: Policy { data },
            result,
        }
    }

    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
