//! End-to-end harness runs against bundled and deliberately broken controls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};

use control_kit_common::value::{bool_or, lookup_sequence, u64_or};
use control_kit_common::{Control, Field, FnDetailMapper, FnDisplayMapper, MapperError, Shape};
use control_kit_controls::{builtin_registry, control_root, simple_boolean};
use control_kit_harness::{
    CheckOutcome, ContractHarness, ControlLayout, ControlReport, DirectoryFixtures, FixtureKind,
    HarnessConfig, HarnessError, InMemoryFixtures, Phase, Stage,
};

fn config() -> HarnessConfig {
    HarnessConfig {
        invocation_timeout: Duration::from_secs(2),
        parallelism: 4,
        performance_budget: Duration::from_secs(1),
        performance_findings: 1000,
    }
}

fn harness(config: HarnessConfig) -> ContractHarness {
    ContractHarness::new(config).unwrap()
}

fn run(control: &Control, fixtures: &InMemoryFixtures) -> ControlReport {
    harness(config()).run(control, fixtures)
}

fn passing_detail() -> FnDetailMapper {
    FnDetailMapper::new(|occ, _| {
        let passed = bool_or(occ, &["detail", "check_passed"], false);
        Ok(json!({"passed": passed}))
    })
}

fn passing_display() -> FnDisplayMapper {
    FnDisplayMapper::new(|occ, _, _| {
        let passed = bool_or(occ, &["detail", "passed"], false);
        Ok(json!({
            "description": "Checks whether the repository passed its scan",
            "tag": if passed { "Result: passed" } else { "Result: failed" },
        }))
    })
}

fn occurrence(passed: bool) -> Value {
    json!({"detail": {"check_passed": passed}, "status": "complete", "type": "occurrence"})
}

fn boolean_fixtures() -> InMemoryFixtures {
    InMemoryFixtures::new()
        .with_payload("a_pass.json", occurrence(true))
        .with_payload("b_fail.json", occurrence(false))
        .with_policy("policy.json", json!({"required": true}))
}

fn phases_failed(report: &ControlReport) -> Vec<Phase> {
    report.failures().iter().map(|v| v.phase).collect()
}

#[test]
fn bundled_controls_satisfy_the_contract() {
    let registry = builtin_registry();
    for control in registry.iter() {
        let layout = ControlLayout::new(control_root(control.name()));
        let fixtures = DirectoryFixtures::for_layout(&layout);
        let report = harness(config()).run(control, &fixtures);

        assert!(report.is_success(), "{}:\n{}", control.name(), report);
        assert!(report.skips().is_empty(), "{}:\n{}", control.name(), report);
        assert!(report
            .fixtures
            .iter()
            .any(|f| f.kind == FixtureKind::Payload));
        assert!(report.fixtures.iter().all(|f| f.sha256.len() == 64));
    }
}

#[test]
fn unusable_config_is_rejected_before_running() {
    let no_workers = HarnessConfig {
        parallelism: 0,
        ..config()
    };
    let no_time = HarnessConfig {
        invocation_timeout: Duration::ZERO,
        ..config()
    };
    let no_budget = HarnessConfig {
        performance_budget: Duration::ZERO,
        ..config()
    };

    for bad in [no_workers, no_time, no_budget] {
        let err = ContractHarness::new(bad.clone()).unwrap_err();
        assert!(
            matches!(err, HarnessError::Config { reason: 500, .. }),
            "{bad:?}: {err}"
        );
    }
    assert!(ContractHarness::new(config()).is_ok());
}

#[test]
fn every_phase_is_recorded_in_order() {
    let report = run(&simple_boolean::control(), &boolean_fixtures());
    let mut phases: Vec<Phase> = report.checks.iter().map(|c| c.phase).collect();
    phases.dedup();
    assert_eq!(phases, Phase::ALL.to_vec());
    assert!(report.run_id.starts_with("run-"));
    let generated = chrono::DateTime::parse_from_rfc3339(&report.generated_at);
    assert!(generated.is_ok());
}

#[test]
fn fixture_without_detail_fails_integration_once() {
    let fixtures = boolean_fixtures().with_payload(
        "c_missing_detail.json",
        json!({"asset": {"key": "org/repo"}, "status": "complete", "type": "occurrence"}),
    );
    let report = run(&simple_boolean::control(), &fixtures);

    let failures = report.failures();
    assert_eq!(failures.len(), 1, "{}", report);
    let failure = failures[0];
    assert_eq!(failure.phase, Phase::Integration);
    assert_eq!(failure.fixture.as_deref(), Some("c_missing_detail.json"));
    assert_eq!(failure.path.as_deref(), Some("$.detail"));
    assert_eq!(failure.actual.as_deref(), Some("missing"));
}

#[test]
fn missing_display_mapper_skips_dependent_checks() {
    let control = Control::builder("detail.only")
        .detail(passing_detail())
        .build();
    let report = run(&control, &boolean_fixtures());

    assert!(report.is_success(), "{}", report);
    let skipped: Vec<(Phase, Stage)> = report
        .skips()
        .iter()
        .map(|(check, _)| (check.phase, check.stage))
        .collect();
    assert!(skipped.contains(&(Phase::Signature, Stage::Display)));
    assert!(skipped.contains(&(Phase::Integration, Stage::Pipeline)));
    assert!(report
        .skips()
        .iter()
        .all(|(_, reason)| reason.contains("no display mapper")));
}

#[test]
fn absent_fixtures_are_soft_skips() {
    let control = Control::builder("no.fixtures")
        .detail(passing_detail())
        .display(passing_display())
        .build();
    let fixtures = InMemoryFixtures::new().with_empty(FixtureKind::Policy);
    let report = run(&control, &fixtures);

    assert!(report.is_success(), "{}", report);
    let reasons: Vec<&str> = report.skips().iter().map(|(_, r)| *r).collect();
    assert!(reasons.iter().any(|r| r.contains("does not exist")));
    assert!(reasons.iter().any(|r| r.contains("no policy fixtures")));
}

#[test]
fn unparsable_fixture_is_named_and_excluded() {
    let fixtures =
        boolean_fixtures().with_raw(FixtureKind::Payload, "broken.json", "{\"detail\": ");
    let report = run(&simple_boolean::control(), &fixtures);

    let failures = report.failures();
    assert_eq!(failures.len(), 1, "{}", report);
    assert_eq!(failures[0].phase, Phase::Discovery);
    assert_eq!(failures[0].fixture.as_deref(), Some("broken.json"));
    assert!(report.checks.iter().all(|c| c.name != "broken.json"));
}

#[test]
fn panic_on_null_nested_field_is_a_violation() {
    let detail = FnDetailMapper::new(|occ, _| {
        if occ.pointer("/detail/scan").is_some_and(Value::is_null) {
            panic!("scan is null");
        }
        Ok(json!({"passed": false}))
    });
    let control = Control::builder("fragile")
        .detail(detail)
        .display(passing_display())
        .build();
    let report = run(&control, &boolean_fixtures());

    let failures = report.failures();
    assert_eq!(failures.len(), 1, "{}", report);
    assert_eq!(failures[0].phase, Phase::EdgeCases);
    assert_eq!(failures[0].case.as_deref(), Some("null_nested_fields"));
    assert!(failures[0].message.contains("panicked: scan is null"));
}

#[test]
fn broad_error_on_null_occurrence_is_a_violation_but_narrow_is_not() {
    let narrow = Control::builder("narrow")
        .detail(FnDetailMapper::new(|occ, _| match occ {
            Value::Null => Err(MapperError::missing_input("occurrence")),
            _ => Ok(json!({})),
        }))
        .build();
    assert!(run(&narrow, &boolean_fixtures()).is_success());

    let broad = Control::builder("broad")
        .detail(FnDetailMapper::new(|occ, _| match occ {
            Value::Null => Err(MapperError::failed("cannot handle null")),
            _ => Ok(json!({})),
        }))
        .build();
    let report = run(&broad, &boolean_fixtures());
    let failures = report.failures();
    assert_eq!(failures.len(), 1, "{}", report);
    assert_eq!(failures[0].case.as_deref(), Some("null_occurrence"));
}

#[test]
fn hung_mapper_times_out_for_that_case_only() {
    let detail = FnDetailMapper::new(|_, ctx| {
        if ctx.is_null() {
            thread::sleep(Duration::from_secs(3));
        }
        Ok(json!({"passed": true}))
    });
    let control = Control::builder("slow").detail(detail).build();
    let config = HarnessConfig {
        invocation_timeout: Duration::from_millis(200),
        ..config()
    };
    let report = harness(config).run(&control, &boolean_fixtures());

    let failures = report.failures();
    assert_eq!(failures.len(), 1, "{}", report);
    assert_eq!(failures[0].case.as_deref(), Some("null_context"));
    assert!(failures[0].message.contains("did not return within"));
}

#[test]
fn wrong_signature_is_reported() {
    let detail = FnDetailMapper::with_parameters(vec!["occurrence"], |_, _| Ok(json!({})));
    let params = vec!["occurrence", "context", "attestation"];
    let display = FnDisplayMapper::with_parameters(params, |_, _, _| {
        let output = json!({"description": "Checks the signature of things", "tag": "Value: ok"});
        Ok(output)
    });
    let control = Control::builder("bad.signature")
        .detail(detail)
        .display(display)
        .build();
    let report = run(&control, &boolean_fixtures());

    let signature: Vec<_> = report
        .failures()
        .into_iter()
        .filter(|v| v.phase == Phase::Signature)
        .collect();
    assert_eq!(signature.len(), 3, "{}", report);
    assert_eq!(signature[0].stage, Stage::Detail);
    assert_eq!(signature[0].actual.as_deref(), Some("(occurrence)"));
}

#[test]
fn non_mapping_detail_output_is_located() {
    let detail = FnDetailMapper::new(|_, _| Ok(json!(["not", "a", "mapping"])));
    let control = Control::builder("list.detail").detail(detail).build();
    let report = run(&control, &boolean_fixtures());

    let smoke: Vec<_> = report
        .failures()
        .into_iter()
        .filter(|v| v.phase == Phase::Smoke)
        .collect();
    assert_eq!(smoke.len(), 1);
    assert_eq!(smoke[0].path.as_deref(), Some("$"));
    assert_eq!(smoke[0].actual.as_deref(), Some("sequence"));
    assert!(phases_failed(&report).contains(&Phase::Corpus));
    let structural_skipped = report
        .checks
        .iter()
        .filter(|c| c.phase == Phase::Structural)
        .any(|c| matches!(c.outcome, CheckOutcome::Skip(_)));
    assert!(structural_skipped);
}

#[test]
fn unknown_column_type_fails_structural_check() {
    let display = FnDisplayMapper::new(|_, _, _| {
        Ok(json!({
            "description": "Checks repository owners",
            "tag": "2 owners missing",
            "violations": {"columns": {"owner": {"name": "Owner", "type": "date"}}}
        }))
    });
    let control = Control::builder("bad.columns")
        .detail(passing_detail())
        .display(display)
        .build();
    let report = run(&control, &boolean_fixtures());

    let structural: Vec<_> = report
        .failures()
        .into_iter()
        .filter(|v| v.phase == Phase::Structural)
        .collect();
    assert_eq!(structural.len(), 1, "{}", report);
    assert_eq!(
        structural[0].path.as_deref(),
        Some("$.violations.columns.owner.type")
    );
    assert_eq!(structural[0].actual.as_deref(), Some("'date'"));
}

#[test]
fn detail_output_must_match_declared_shape() {
    let shape = Shape::mapping(vec![Field::required("passed", Shape::Bool)]);
    let control = Control::builder("shape.mismatch")
        .detail(FnDetailMapper::new(|_, _| Ok(json!({"passed": "yes"}))))
        .detail_shape(shape)
        .build();
    let report = run(&control, &boolean_fixtures());

    let located = report.failures().iter().any(|v| {
        v.phase == Phase::Corpus
            && v.fixture.as_deref() == Some("a_pass.json")
            && v.path.as_deref() == Some("$.passed")
    });
    assert!(located, "{}", report);
}

#[test]
fn nondeterministic_display_is_caught() {
    let calls = AtomicUsize::new(0);
    let display = FnDisplayMapper::new(move |_, _, _| {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        let tag = format!("Call number {}", n);
        let output = json!({"description": "Checks a counter control", "tag": tag});
        Ok(output)
    });
    let control = Control::builder("counter")
        .detail(passing_detail())
        .display(display)
        .build();
    let report = run(&control, &boolean_fixtures());

    let consistency: Vec<_> = report
        .failures()
        .into_iter()
        .filter(|v| v.phase == Phase::Consistency)
        .collect();
    assert_eq!(consistency.len(), 1, "{}", report);
    assert_eq!(consistency[0].stage, Stage::Display);
    assert_eq!(consistency[0].path.as_deref(), Some("$.tag"));
}

#[test]
fn nondeterministic_detail_is_caught() {
    let calls = AtomicUsize::new(0);
    let detail = FnDetailMapper::new(move |_, _| {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({"passed": true, "call": n}))
    });
    let control = Control::builder("counter.detail").detail(detail).build();
    let report = run(&control, &boolean_fixtures());

    let failures = report.failures();
    assert_eq!(failures.len(), 1, "{}", report);
    assert_eq!(failures[0].phase, Phase::Consistency);
    assert_eq!(failures[0].stage, Stage::Detail);
    assert_eq!(failures[0].path.as_deref(), Some("$.call"));
    assert_eq!(failures[0].fixture.as_deref(), Some("a_pass.json"));
}

#[test]
fn description_depending_on_numbers_is_caught() {
    let detail = FnDetailMapper::new(|occ, _| {
        let total = lookup_sequence(occ, &["detail", "scan", "results"]).len();
        Ok(json!({"total": total}))
    });
    let display = FnDisplayMapper::new(|occ, _, _| {
        let total = u64_or(occ, &["detail", "total"], 0);
        Ok(json!({
            "description": format!("Checks {} scan findings", total),
            "tag": format!("{} findings", total),
        }))
    });
    let control = Control::builder("chatty.description")
        .detail(detail)
        .display(display)
        .build();
    let report = run(&control, &boolean_fixtures());

    let failures = report.failures();
    assert_eq!(failures.len(), 1, "{}", report);
    assert_eq!(failures[0].phase, Phase::Consistency);
    assert_eq!(failures[0].path.as_deref(), Some("$.description"));
}

#[test]
fn slow_detail_mapper_fails_performance_budget() {
    let detail = FnDetailMapper::new(|occ, _| {
        let findings = lookup_sequence(occ, &["detail", "scan", "results"]);
        if findings.len() > 100 {
            thread::sleep(Duration::from_millis(300));
        }
        Ok(json!({"total": findings.len()}))
    });
    let control = Control::builder("slow.scan").detail(detail).build();
    let config = HarnessConfig {
        performance_budget: Duration::from_millis(100),
        ..config()
    };
    let report = harness(config).run(&control, &boolean_fixtures());

    let failures = report.failures();
    assert_eq!(failures.len(), 1, "{}", report);
    assert_eq!(failures[0].phase, Phase::Performance);
    assert!(failures[0].message.contains("1000 findings"));
}

#[test]
fn terse_output_yields_advisories_not_failures() {
    let display = FnDisplayMapper::new(|_, _, _| Ok(json!({"description": "Short", "tag": "ok"})));
    let control = Control::builder("terse")
        .detail(passing_detail())
        .display(display)
        .build();
    let report = run(&control, &boolean_fixtures());

    assert!(report.is_success(), "{}", report);
    assert_eq!(report.advisories.len(), 4, "{:?}", report.advisories);
    let same_tag = "tag 'ok' is identical for 2 distinct detail results";
    assert!(report.advisories.iter().any(|a| a.message == same_tag));
    assert!(report.to_string().contains("Advisories:"));
}

#[test]
fn json_report_lists_violations_with_fixture_names() {
    let fixtures = boolean_fixtures().with_payload("z_no_detail.json", json!({"asset": null}));
    let report = run(&simple_boolean::control(), &fixtures);

    let json: Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
    assert_eq!(json["control"], "simple.boolean.check");
    let failed: Vec<&Value> = json["checks"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|c| c["outcome"] == "fail")
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["name"], "z_no_detail.json");
    assert_eq!(failed[0]["details"][0]["fixture"], "z_no_detail.json");
}
