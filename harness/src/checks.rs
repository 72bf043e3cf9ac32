//! Individual contract checks. Each returns the violations it found; the
//! runner decides how they are grouped into report records.

use std::collections::HashSet;

use serde_json::Value;

use control_kit_common::value::{canonical_bytes, ValueKind, ROOT_PATH};
use control_kit_common::Shape;

use crate::diff::first_difference;
use crate::inputs::EdgeCase;
use crate::invoke::InvocationError;
use crate::report::{Advisory, Phase, Stage, Violation};

/// Words at least one of which an informative description mentions.
pub const DESCRIPTION_KEYWORDS: [&str; 7] = [
    "policy", "control", "evaluate", "check", "validate", "scan", "test",
];

/// Descriptions of this many characters or fewer are flagged.
pub const MIN_DESCRIPTION_CHARS: usize = 20;

/// Tags of this many characters or fewer are flagged.
pub const MIN_TAG_CHARS: usize = 5;

/// Declared parameters must equal `expected` in count, name and order.
pub fn signature(stage: Stage, declared: &[&str], expected: &[&str]) -> Vec<Violation> {
    let rendered = |params: &[&str]| format!("({})", params.join(", "));

    if declared.len() != expected.len() {
        let violation = Violation::new(
            Phase::Signature,
            stage,
            format!(
                "{} mapper declares {} parameters, the contract requires {}",
                stage,
                declared.len(),
                expected.len()
            ),
        );
        return vec![violation.delta(rendered(expected), rendered(declared))];
    }

    declared
        .iter()
        .zip(expected)
        .enumerate()
        .filter(|(_, (found, wanted))| found != wanted)
        .map(|(position, (found, wanted))| {
            Violation::new(
                Phase::Signature,
                stage,
                format!(
                    "{} mapper parameter {} is named '{}', expected '{}'",
                    stage, position, found, wanted
                ),
            )
            .delta(rendered(expected), rendered(declared))
        })
        .collect()
}

/// A failed invocation, worded for the report.
pub fn invocation_failure(phase: Phase, stage: Stage, err: &InvocationError) -> Violation {
    let message = match err {
        InvocationError::Mapper(e) => format!("{} mapper returned an error: {}", stage, e),
        InvocationError::Panicked(msg) => format!("{} mapper panicked: {}", stage, msg),
        InvocationError::TimedOut(limit) => {
            format!("{} mapper did not return within {:?}", stage, limit)
        }
        InvocationError::Spawn(msg) => format!("{} mapper could not be invoked: {}", stage, msg),
    };
    Violation::new(phase, stage, message)
}

/// The output must be a mapping.
pub fn is_mapping(phase: Phase, stage: Stage, output: &Value) -> Option<Violation> {
    if output.is_object() {
        return None;
    }
    Some(
        Violation::new(
            phase,
            stage,
            format!("{} mapper must return a mapping", stage),
        )
        .at(ROOT_PATH)
        .delta(ValueKind::Mapping.as_str(), ValueKind::of(output).as_str()),
    )
}

/// The output must be a mapping conforming to `shape`.
pub fn conforms(phase: Phase, stage: Stage, output: &Value, shape: &Shape) -> Vec<Violation> {
    if let Some(violation) = is_mapping(phase, stage, output) {
        return vec![violation];
    }
    shape
        .check(output)
        .iter()
        .map(|found| Violation::shape(phase, stage, found))
        .collect()
}

/// Judge one edge-case invocation. Ok results must fully conform; errors
/// are tolerated only when a required input was wholly null and the error
/// is narrowly typed.
pub fn edge_case(
    stage: Stage,
    case: &EdgeCase,
    result: &Result<Value, InvocationError>,
    shape: &Shape,
) -> Vec<Violation> {
    match result {
        Ok(output) => conforms(Phase::EdgeCases, stage, output, shape)
            .into_iter()
            .map(|v| v.case(case.name))
            .collect(),
        Err(err) if case.null_input && err.is_narrow() => Vec::new(),
        Err(err) => {
            let mut violation = invocation_failure(Phase::EdgeCases, stage, err).case(case.name);
            if case.null_input {
                violation.message.push_str(
                    "; only a missing-input or type-mismatch error is allowed for null input",
                );
            } else {
                violation
                    .message
                    .push_str("; malformed input must degrade to defaults");
            }
            vec![violation]
        }
    }
}

/// Two invocations on identical input must produce identical bytes.
pub fn deterministic(stage: Stage, first: &Value, second: &Value) -> Option<Violation> {
    if canonical_bytes(first) == canonical_bytes(second) {
        return None;
    }
    let mut violation = Violation::new(
        Phase::Consistency,
        stage,
        format!(
            "{} mapper returned different output for identical input",
            stage
        ),
    );
    if let Some(difference) = first_difference(first, second) {
        violation = violation.at(difference.path.clone());
        violation.message = format!("{}: {}", violation.message, difference);
    }
    Some(violation)
}

/// `description` must not change when only numeric detail changes.
pub fn stable_description(first: &Value, second: &Value) -> Option<Violation> {
    let a = first.get("description");
    let b = second.get("description");
    if a.is_some() && a == b {
        return None;
    }
    let render = |v: Option<&Value>| v.map_or_else(|| "missing".to_string(), Value::to_string);
    Some(
        Violation::new(
            Phase::Consistency,
            Stage::Display,
            "description changed between occurrences differing only in numeric detail",
        )
        .at("$.description")
        .delta(render(a), render(b)),
    )
}

/// Quality notes about a display output. Never failures.
pub fn display_advisories(output: &Value, fixture: Option<&str>) -> Vec<Advisory> {
    let advisory = |message: String| Advisory {
        stage: Stage::Display,
        fixture: fixture.map(str::to_string),
        message,
    };
    let mut out = Vec::new();

    if let Some(description) = output.get("description").and_then(Value::as_str) {
        if description.chars().count() <= MIN_DESCRIPTION_CHARS {
            out.push(advisory(format!(
                "description '{}' is short; more than {} characters reads better",
                description, MIN_DESCRIPTION_CHARS
            )));
        }
        let lowered = description.to_lowercase();
        if !DESCRIPTION_KEYWORDS.iter().any(|k| lowered.contains(k)) {
            out.push(advisory(format!(
                "description '{}' does not say what is evaluated (none of: {})",
                description,
                DESCRIPTION_KEYWORDS.join(", ")
            )));
        }
    }

    if let Some(tag) = output.get("tag").and_then(Value::as_str) {
        if !tag.is_empty() && tag.chars().count() <= MIN_TAG_CHARS {
            out.push(advisory(format!(
                "tag '{}' has {} characters or fewer",
                tag, MIN_TAG_CHARS
            )));
        }
    }
    out
}

/// Advisory when every rendered tag is the same although the mapped details
/// differ. Each sample pairs a mapped detail with its display output.
pub fn tag_varies(samples: &[(Value, Value)]) -> Option<Advisory> {
    let details: HashSet<Vec<u8>> = samples
        .iter()
        .map(|(detail, _)| canonical_bytes(detail))
        .collect();
    if details.len() < 2 {
        return None;
    }
    let tags: Option<HashSet<&str>> = samples
        .iter()
        .map(|(_, output)| output.get("tag").and_then(Value::as_str))
        .collect();
    let tags = tags?;
    if tags.len() != 1 {
        return None;
    }
    let tag = tags.into_iter().next()?;
    Some(Advisory {
        stage: Stage::Display,
        fixture: None,
        message: format!(
            "tag '{}' is identical for {} distinct detail results",
            tag,
            details.len()
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use control_kit_common::{display_shape, MapperError, DETAIL_PARAMETERS};
    use serde_json::json;

    use crate::inputs::{detail_cases, display_cases};

    fn rendered(passed: bool, tag: &str) -> (Value, Value) {
        (json!({"passed": passed}), json!({"tag": tag}))
    }

    #[test]
    fn signature_count_and_order() {
        let exact = signature(Stage::Detail, &DETAIL_PARAMETERS, &DETAIL_PARAMETERS);
        assert!(exact.is_empty());

        let count = signature(Stage::Detail, &["occurrence"], &DETAIL_PARAMETERS);
        assert_eq!(count.len(), 1);
        assert_eq!(count[0].actual.as_deref(), Some("(occurrence)"));

        let swapped = ["context", "occurrence"];
        let order = signature(Stage::Detail, &swapped, &DETAIL_PARAMETERS);
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn non_mapping_output_is_single_violation() {
        let found = conforms(Phase::Corpus, Stage::Detail, &json!([1]), &Shape::Any);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].actual.as_deref(), Some("sequence"));
    }

    #[test]
    fn narrow_error_tolerated_only_for_null_input() {
        let narrow: Result<Value, InvocationError> =
            Err(MapperError::missing_input("occurrence").into());
        let shape = Shape::Mapping(Vec::new());

        let null_case = detail_cases()
            .into_iter()
            .find(|c| c.name == "null_occurrence")
            .unwrap();
        let found = edge_case(Stage::Detail, &null_case, &narrow, &shape);
        assert!(found.is_empty());

        let empty_case = detail_cases()
            .into_iter()
            .find(|c| c.name == "empty_occurrence")
            .unwrap();
        let found = edge_case(Stage::Detail, &empty_case, &narrow, &shape);
        assert_eq!(found[0].case.as_deref(), Some("empty_occurrence"));

        let broad: Result<Value, InvocationError> = Err(MapperError::failed("nope").into());
        let found = edge_case(Stage::Detail, &null_case, &broad, &shape);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn edge_case_output_must_satisfy_display_shape() {
        let case = display_cases().remove(0);
        let output = Ok(json!({"tag": "x"}));
        let found = edge_case(Stage::Display, &case, &output, &display_shape());
        assert_eq!(found[0].path.as_deref(), Some("$.description"));
    }

    #[test]
    fn determinism_reports_first_difference() {
        let v = deterministic(Stage::Display, &json!({"tag": "a"}), &json!({"tag": "b"}));
        assert_eq!(v.unwrap().path.as_deref(), Some("$.tag"));
        let same = json!({"a": 1});
        let again = same.clone();
        assert!(deterministic(Stage::Display, &same, &again).is_none());

        let first = json!({"passed": true, "counts": [1, 2]});
        let second = json!({"passed": true, "counts": [1, 3]});
        let v = deterministic(Stage::Detail, &first, &second).unwrap();
        assert_eq!((v.phase, v.stage), (Phase::Consistency, Stage::Detail));
        assert_eq!(v.path.as_deref(), Some("$.counts[1]"));
        assert!(v.message.starts_with("detail mapper returned"));
    }

    #[test]
    fn description_must_match() {
        let d = json!({"description": "d"});
        let e = json!({"description": "e"});
        assert!(stable_description(&d, &d.clone()).is_none());
        assert!(stable_description(&d, &e).is_some());
        assert!(stable_description(&json!({}), &json!({})).is_some());
    }

    #[test]
    fn advisories_for_terse_output() {
        let terse = json!({"description": "Short", "tag": "ok"});
        let notes = display_advisories(&terse, Some("a.json"));
        assert_eq!(notes.len(), 3);
        assert_eq!(notes[0].fixture.as_deref(), Some("a.json"));

        let fine = json!({
            "description": "Checks the repository for open findings",
            "tag": "Value: True"
        });
        assert!(display_advisories(&fine, None).is_empty());
    }

    #[test]
    fn identical_tags_for_distinct_details_are_advised() {
        let samples = vec![rendered(true, "Done"), rendered(false, "Done")];
        let advisory = tag_varies(&samples).unwrap();
        assert_eq!(advisory.stage, Stage::Display);
        assert!(advisory.message.contains("'Done'"));
        assert!(advisory.message.contains("2 distinct"));
    }

    #[test]
    fn tags_may_repeat_when_details_do() {
        let same_detail = vec![rendered(true, "Value: True"), rendered(true, "Value: True")];
        assert!(tag_varies(&same_detail).is_none());

        let varied = vec![rendered(true, "Value: True"), rendered(false, "Value: False")];
        assert!(tag_varies(&varied).is_none());
        assert!(tag_varies(&[]).is_none());
    }
}
