//! Synthesized mapper inputs: the adversarial edge-case battery, fallback
//! samples when a control ships no fixtures, the large performance
//! occurrence, and numeric perturbation for the description check.

use serde_json::{json, Number, Value};

use control_kit_common::{Attestation, AttestationResult, Mapping, Occurrence};

/// One adversarial input set.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeCase {
    pub name: &'static str,
    pub occurrence: Value,
    /// Ignored for the detail stage.
    pub attestation: Value,
    pub context: Value,
    /// A required input is wholly null, so a narrow error is tolerated.
    pub null_input: bool,
}

impl EdgeCase {
    fn new(name: &'static str, occurrence: Value, attestation: Value, context: Value) -> Self {
        let null_input = occurrence.is_null() || attestation.is_null();
        Self {
            name,
            occurrence,
            attestation,
            context,
            null_input,
        }
    }
}

/// Minimal well-formed occurrence with an empty detail.
pub fn sample_occurrence() -> Value {
    Occurrence::new(
        Some(Occurrence::repository_asset("org/repo", "repo")),
        Mapping::new(),
    )
    .into_value()
}

/// Passing attestation over empty policy data.
pub fn sample_attestation() -> Value {
    Attestation::from_policy_data(json!({}), AttestationResult::Pass).into_value()
}

pub fn empty_context() -> Value {
    Value::Object(Mapping::new())
}

/// Battery for the detail stage.
pub fn detail_cases() -> Vec<EdgeCase> {
    let ctx = empty_context;
    let none = || json!({});
    vec![
        EdgeCase::new("empty_occurrence", json!({}), none(), ctx()),
        EdgeCase::new("empty_detail", json!({"detail": {}}), none(), ctx()),
        EdgeCase::new(
            "missing_detail",
            json!({
                "asset": {"key": "org/repo", "name": "repo"},
                "status": "complete",
                "type": "occurrence"
            }),
            none(),
            ctx(),
        ),
        EdgeCase::new(
            "null_nested_fields",
            json!({"asset": null, "detail": {"scan": null}}),
            none(),
            ctx(),
        ),
        EdgeCase::new("null_detail", json!({"detail": null}), none(), ctx()),
        EdgeCase::new("null_context", sample_occurrence(), none(), Value::Null),
        EdgeCase::new("null_occurrence", Value::Null, none(), ctx()),
    ]
}

/// Battery for the display stage.
pub fn display_cases() -> Vec<EdgeCase> {
    let ctx = empty_context;
    vec![
        EdgeCase::new("empty_occurrence", json!({}), sample_attestation(), ctx()),
        EdgeCase::new("empty_attestation", sample_occurrence(), json!({}), ctx()),
        EdgeCase::new(
            "missing_detail",
            json!({"asset": null, "status": "complete", "type": "occurrence"}),
            sample_attestation(),
            ctx(),
        ),
        EdgeCase::new(
            "null_nested_fields",
            json!({"asset": null, "detail": {"scan": null, "summary": null}}),
            json!({"policy": {"data": null}, "result": null}),
            ctx(),
        ),
        EdgeCase::new(
            "null_context",
            sample_occurrence(),
            sample_attestation(),
            Value::Null,
        ),
        EdgeCase::new("null_attestation", sample_occurrence(), Value::Null, ctx()),
        EdgeCase::new("all_null", Value::Null, Value::Null, Value::Null),
    ]
}

const SEVERITY_CYCLE: [&str; 4] = ["critical", "high", "medium", "low"];

/// Occurrence whose `detail.scan.results` holds `findings` entries.
pub fn large_occurrence(findings: usize) -> Value {
    let results: Vec<Value> = (0..findings)
        .map(|i| {
            json!({
                "id": format!("CVE-2024-{:05}", i),
                "severity": SEVERITY_CYCLE[i % SEVERITY_CYCLE.len()],
                "package": format!("package-{}", i % 50),
                "version": "1.0.0",
                "score": (i % 100) as f64 / 10.0,
            })
        })
        .collect();

    let mut detail = Mapping::new();
    detail.insert("scan".to_string(), json!({"results": results}));
    Occurrence::new(
        Some(Occurrence::repository_asset("org/large-repo", "large-repo")),
        detail,
    )
    .into_value()
}

/// Fallback pair of mapped details differing only in a numeric field.
pub fn numeric_detail_pair() -> (Value, Value) {
    (
        json!({"summary": {"total": 10}}),
        json!({"summary": {"total": 20}}),
    )
}

/// Copy of `value` with every number replaced by `2n + 1`. Structure and
/// non-numeric leaves are untouched.
pub fn perturb_numbers(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(perturb(n)),
        Value::Array(items) => Value::Array(items.iter().map(perturb_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), perturb_numbers(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn perturb(n: &Number) -> Number {
    if let Some(u) = n.as_u64() {
        return Number::from(u.saturating_mul(2).saturating_add(1));
    }
    if let Some(i) = n.as_i64() {
        return Number::from(i.saturating_mul(2).saturating_add(1));
    }
    n.as_f64()
        .and_then(|f| Number::from_f64(f * 2.0 + 1.0))
        .unwrap_or_else(|| n.clone())
}
