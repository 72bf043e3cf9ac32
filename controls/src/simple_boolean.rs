//! `simple.boolean.check`: the most minimal control possible.
//!
//! The detail stage passes `detail.check_passed` through as `passed`; the
//! display stage renders it as `Value: True` / `Value: False`.

use control_kit_common::value::bool_or;
use control_kit_common::{
    Control, DetailMapper, DisplayMapper, DisplayOutput, Field, MapperResult, Shape,
};
use serde_json::{json, Value};

pub const NAME: &str = "simple.boolean.check";

const DESCRIPTION: &str = "A simple boolean check - the most minimal control possible";

/// Detail stage. Absent or non-boolean `check_passed` maps to `false`.
pub struct BooleanDetail;

impl DetailMapper for BooleanDetail {
    fn map(&self, occurrence: &Value, _context: &Value) -> MapperResult<Value> {
        let passed = bool_or(occurrence, &["detail", "check_passed"], false);
        Ok(json!({ "passed": passed }))
    }
}

/// Display stage.
pub struct BooleanDisplay;

impl DisplayMapper for BooleanDisplay {
    fn map(
        &self,
        occurrence: &Value,
        _attestation: &Value,
        _context: &Value,
    ) -> MapperResult<Value> {
        let passed = bool_or(occurrence, &["detail", "passed"], false);
        let tag = format!("Value: {}", if passed { "True" } else { "False" });
        Ok(DisplayOutput::new(DESCRIPTION, tag).into_value())
    }
}

pub fn control() -> Control {
    Control::builder(NAME)
        .detail(BooleanDetail)
        .display(BooleanDisplay)
        .detail_shape(Shape::mapping(vec![Field::required("passed", Shape::Bool)]))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(occurrence: Value) -> Value {
        BooleanDetail.map(&occurrence, &json!({})).unwrap()
    }

    fn display(detail: Value) -> Value {
        BooleanDisplay
            .map(&json!({ "detail": detail }), &json!({}), &json!({}))
            .unwrap()
    }

    #[test]
    fn check_passed_true_maps_to_passed_true() {
        assert_eq!(
            detail(json!({"detail": {"check_passed": true}})),
            json!({"passed": true})
        );
    }

    #[test]
    fn empty_detail_defaults_to_false() {
        assert_eq!(detail(json!({"detail": {}})), json!({"passed": false}));
        assert_eq!(
            detail(json!({"asset": {"key": "test"}})),
            json!({"passed": false})
        );
        assert_eq!(detail(Value::Null), json!({"passed": false}));
    }

    #[test]
    fn non_boolean_check_passed_is_false() {
        assert_eq!(
            detail(json!({"detail": {"check_passed": "yes"}})),
            json!({"passed": false})
        );
    }

    #[test]
    fn display_renders_true() {
        assert_eq!(
            display(json!({"passed": true})),
            json!({
                "description": "A simple boolean check - the most minimal control possible",
                "tag": "Value: True"
            })
        );
    }

    #[test]
    fn display_renders_false_with_same_description() {
        let passed = display(json!({"passed": true}));
        let failed = display(json!({"passed": false}));
        assert_eq!(failed["tag"], "Value: False");
        assert_eq!(failed["description"], passed["description"]);
    }

    #[test]
    fn display_tolerates_null_inputs() {
        let out = BooleanDisplay
            .map(&Value::Null, &Value::Null, &Value::Null)
            .unwrap();
        assert_eq!(out["tag"], "Value: False");
    }
}
