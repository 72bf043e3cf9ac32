//! `vulnerability.severity.summary`: aggregates scanner findings by severity
//! and flags severities whose count exceeds the policy maximum.
//!
//! Raw occurrences carry `detail.scan.results[*] = {id, severity}`. Policy
//! data carries `vulnerabilities.<severity>.maximum`.

use control_kit_common::value::{lookup, lookup_sequence, str_at, u64_or};
use control_kit_common::{
    ColumnDefinition, ColumnType, Control, DetailMapper, DisplayMapper, DisplayOutput, Field,
    MapperResult, Shape, Violations,
};
use serde_json::{json, Value};

pub const NAME: &str = "vulnerability.severity.summary";

const DESCRIPTION: &str =
    "Evaluates vulnerability scan findings against the maximum allowed count per severity";

/// Severities tracked individually, most severe first.
pub const SEVERITIES: [&str; 4] = ["critical", "high", "medium", "low"];

/// Detail stage: one linear pass over the findings.
pub struct SeverityDetail;

impl DetailMapper for SeverityDetail {
    fn map(&self, occurrence: &Value, _context: &Value) -> MapperResult<Value> {
        let results = lookup_sequence(occurrence, &["detail", "scan", "results"]);

        let mut counts = [0u64; SEVERITIES.len()];
        let mut vulnerabilities = Vec::with_capacity(results.len());
        for finding in results {
            let severity = str_at(finding, &["severity"])
                .unwrap_or("unknown")
                .to_ascii_lowercase();
            if let Some(slot) = SEVERITIES.iter().position(|s| *s == severity) {
                counts[slot] += 1;
            }
            vulnerabilities.push(json!({
                "id": str_at(finding, &["id"]).unwrap_or_default(),
                "severity": severity,
            }));
        }

        let mut summary = serde_json::Map::new();
        for (severity, count) in SEVERITIES.iter().zip(counts) {
            summary.insert((*severity).to_string(), json!(count));
        }
        summary.insert("total".to_string(), json!(vulnerabilities.len()));

        Ok(json!({
            "summary": summary,
            "vulnerabilities": vulnerabilities,
        }))
    }
}

/// Display stage.
pub struct SeverityDisplay;

impl DisplayMapper for SeverityDisplay {
    fn map(
        &self,
        occurrence: &Value,
        attestation: &Value,
        _context: &Value,
    ) -> MapperResult<Value> {
        let count = |severity: &str| u64_or(occurrence, &["detail", "summary", severity], 0);
        let total = u64_or(occurrence, &["detail", "summary", "total"], 0);
        let tag = format!(
            "{} critical, {} high ({} total)",
            count("critical"),
            count("high"),
            total
        );

        let mut violations = Violations::default()
            .column(
                "severity",
                ColumnDefinition::new("Severity", ColumnType::String),
            )
            .column("found", ColumnDefinition::new("Found", ColumnType::Number))
            .column(
                "maximum",
                ColumnDefinition::new("Maximum", ColumnType::Number),
            );
        for severity in SEVERITIES {
            let limit = ["policy", "data", "vulnerabilities", severity, "maximum"];
            let Some(maximum) = lookup(attestation, &limit).and_then(Value::as_u64) else {
                continue;
            };
            let found = count(severity);
            if found > maximum {
                violations = violations.row(json!({
                    "severity": severity,
                    "found": found,
                    "maximum": maximum,
                }));
            }
        }

        let mut output = DisplayOutput::new(DESCRIPTION, tag);
        if !violations.rows.is_empty() {
            output = output.with_violations(violations);
        }
        Ok(output.into_value())
    }
}

pub fn control() -> Control {
    let counts = SEVERITIES
        .iter()
        .chain(std::iter::once(&"total"))
        .map(|key| Field::required(*key, Shape::Number))
        .collect();
    let finding = Shape::mapping(vec![
        Field::required("id", Shape::String),
        Field::required("severity", Shape::String),
    ]);
    let shape = Shape::mapping(vec![
        Field::required("summary", Shape::mapping(counts)),
        Field::required("vulnerabilities", Shape::sequence_of(finding)),
    ]);
    Control::builder(NAME)
        .detail(SeverityDetail)
        .display(SeverityDisplay)
        .detail_shape(shape)
        .build()
}
