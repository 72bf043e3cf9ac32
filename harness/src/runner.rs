//! Phase orchestration.
//!
//! `ContractHarness::run` drives every phase in order against one control.
//! Phases never short-circuit each other: each records its own outcome, and
//! a missing mapper or fixture collection turns dependent checks into skips.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use control_kit_common::{
    display_shape, occurrence_shape, splice_detail, Attestation, AttestationResult, Control,
    DetailMapper, DisplayMapper, Shape, DETAIL_PARAMETERS, DISPLAY_PARAMETERS,
};

use crate::checks;
use crate::config::HarnessConfig;
use crate::error::HarnessResult;
use crate::fixtures::{Fixture, FixtureKind, FixtureSource};
use crate::inputs::{self, EdgeCase};
use crate::invoke::{Invocation, Invoker};
use crate::report::{
    Advisory, CheckOutcome, CheckRecord, ControlReport, FixtureDigest, Phase, Stage, Violation,
};

const NO_DETAIL_MAPPER: &str = "control registers no detail mapper";
const NO_DISPLAY_MAPPER: &str = "control registers no display mapper";

/// Runs the contract harness against controls.
#[derive(Debug, Clone)]
pub struct ContractHarness {
    config: HarnessConfig,
    invoker: Invoker,
}

impl ContractHarness {
    /// Build a harness, rejecting configurations that cannot drive a run.
    pub fn new(config: HarnessConfig) -> HarnessResult<Self> {
        config.validate()?;
        let invoker = Invoker::new(config.invocation_timeout);
        Ok(Self { config, invoker })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Exercise every phase against `control` with fixtures from `source`.
    pub fn run(&self, control: &Control, source: &dyn FixtureSource) -> ControlReport {
        let run_id = format!("run-{}", Uuid::new_v4());
        info!(
            event = "harness_start",
            control = control.name(),
            run_id = %run_id,
            "running contract harness"
        );

        let mut run = Run::new(self, control);
        run.discovery(source);
        run.signature();
        run.smoke();
        run.structural();
        run.edge_cases();
        run.corpus();
        run.integration();
        run.consistency();
        run.performance();

        let report = run.finish(run_id);
        info!(
            event = "harness_complete",
            control = control.name(),
            success = report.is_success(),
            failures = report.failures().len(),
            skips = report.skips().len(),
            advisories = report.advisories.len()
        );
        report
    }
}

/// Mutable state of one harness run.
struct Run<'a> {
    harness: &'a ContractHarness,
    control: &'a Control,
    detail: Option<Arc<dyn DetailMapper>>,
    display: Option<Arc<dyn DisplayMapper>>,
    payloads: Vec<Fixture>,
    policies: Vec<Fixture>,
    /// Why there are no usable payloads, when there are none.
    payload_gap: Option<String>,
    policy_gap: Option<String>,
    smoke_detail: Option<Value>,
    smoke_display: Option<Value>,
    checks: Vec<CheckRecord>,
    advisories: Vec<Advisory>,
    digests: Vec<FixtureDigest>,
}

impl<'a> Run<'a> {
    fn new(harness: &'a ContractHarness, control: &'a Control) -> Self {
        Self {
            harness,
            control,
            detail: control.detail().cloned(),
            display: control.display().cloned(),
            payloads: Vec::new(),
            policies: Vec::new(),
            payload_gap: None,
            policy_gap: None,
            smoke_detail: None,
            smoke_display: None,
            checks: Vec::new(),
            advisories: Vec::new(),
            digests: Vec::new(),
        }
    }

    fn invoker(&self) -> &Invoker {
        &self.harness.invoker
    }

    fn record(
        &mut self,
        phase: Phase,
        stage: Stage,
        name: impl Into<String>,
        outcome: CheckOutcome,
    ) {
        let name = name.into();
        match &outcome {
            CheckOutcome::Pass => {}
            CheckOutcome::Skip(reason) => info!(
                event = "check_skipped",
                control = self.control.name(),
                phase = phase.as_str(),
                stage = stage.as_str(),
                check = %name,
                reason = %reason
            ),
            CheckOutcome::Fail(violations) => warn!(
                event = "check_failed",
                control = self.control.name(),
                phase = phase.as_str(),
                stage = stage.as_str(),
                check = %name,
                violations = violations.len()
            ),
        }
        self.checks.push(CheckRecord {
            phase,
            stage,
            name,
            outcome,
        });
    }

    fn phase_start(&self, phase: Phase) {
        info!(
            event = "phase_start",
            control = self.control.name(),
            phase = phase.as_str()
        );
    }

    fn note_display(&mut self, output: &Value, fixture: Option<&str>) {
        self.advisories
            .extend(checks::display_advisories(output, fixture));
    }

    /// Occurrence used when a single representative input is needed.
    fn base_occurrence(&self) -> (Value, Option<String>) {
        match self.payloads.first() {
            Some(fixture) => (fixture.value.clone(), Some(fixture.name.clone())),
            None => (inputs::sample_occurrence(), None),
        }
    }

    /// Attestation used when a single representative input is needed.
    fn base_attestation(&self) -> Value {
        match self.policies.first() {
            Some(fixture) => {
                Attestation::from_policy_data(fixture.value.clone(), AttestationResult::Pass)
                    .into_value()
            }
            None => inputs::sample_attestation(),
        }
    }

    // -- Phase 1 -----------------------------------------------------------

    fn discovery(&mut self, source: &dyn FixtureSource) {
        self.phase_start(Phase::Discovery);

        let detail_outcome = match self.detail {
            Some(_) => CheckOutcome::Pass,
            None => CheckOutcome::Skip(NO_DETAIL_MAPPER.to_string()),
        };
        self.record(
            Phase::Discovery,
            Stage::Detail,
            "detail mapper registered",
            detail_outcome,
        );

        let display_outcome = match self.display {
            Some(_) => CheckOutcome::Pass,
            None => CheckOutcome::Skip(NO_DISPLAY_MAPPER.to_string()),
        };
        self.record(
            Phase::Discovery,
            Stage::Display,
            "display mapper registered",
            display_outcome,
        );

        let (payloads, payload_gap) = self.load_collection(source, FixtureKind::Payload);
        self.payloads = payloads;
        self.payload_gap = payload_gap;

        let (policies, policy_gap) = self.load_collection(source, FixtureKind::Policy);
        self.policies = policies;
        self.policy_gap = policy_gap;
    }

    fn load_collection(
        &mut self,
        source: &dyn FixtureSource,
        kind: FixtureKind,
    ) -> (Vec<Fixture>, Option<String>) {
        let check = format!("{} fixtures", kind);
        let names = match source.list(kind) {
            Ok(Some(names)) if names.is_empty() => {
                let reason = format!("no {} fixtures in {}", kind, source.location(kind));
                self.record(
                    Phase::Discovery,
                    Stage::Fixtures,
                    check,
                    CheckOutcome::Skip(reason.clone()),
                );
                return (Vec::new(), Some(reason));
            }
            Ok(Some(names)) => names,
            Ok(None) => {
                let reason = format!(
                    "{} fixture location {} does not exist",
                    kind,
                    source.location(kind)
                );
                self.record(
                    Phase::Discovery,
                    Stage::Fixtures,
                    check,
                    CheckOutcome::Skip(reason.clone()),
                );
                return (Vec::new(), Some(reason));
            }
            Err(e) => {
                let violation = Violation::new(
                    Phase::Discovery,
                    Stage::Fixtures,
                    format!("could not list {} fixtures: {}", kind, e),
                );
                self.record(
                    Phase::Discovery,
                    Stage::Fixtures,
                    check,
                    CheckOutcome::Fail(vec![violation]),
                );
                return (Vec::new(), Some(format!("{} fixtures could not be listed", kind)));
            }
        };

        let mut loaded = Vec::new();
        let mut violations = Vec::new();
        for name in names {
            match source.load(kind, &name) {
                Ok(fixture) => {
                    self.digests.push(FixtureDigest::from(&fixture));
                    loaded.push(fixture);
                }
                Err(e) => violations.push(
                    Violation::new(
                        Phase::Discovery,
                        Stage::Fixtures,
                        format!("{} fixture could not be loaded: {}", kind, e),
                    )
                    .fixture(name),
                ),
            }
        }
        info!(
            event = "fixtures_loaded",
            control = self.control.name(),
            kind = %kind,
            loaded = loaded.len(),
            rejected = violations.len()
        );

        let gap = loaded
            .is_empty()
            .then(|| format!("no loadable {} fixtures", kind));
        self.record(
            Phase::Discovery,
            Stage::Fixtures,
            check,
            CheckOutcome::from_violations(violations),
        );
        (loaded, gap)
    }

    // -- Phase 2 -----------------------------------------------------------

    fn signature(&mut self) {
        self.phase_start(Phase::Signature);

        let outcome = match &self.detail {
            Some(mapper) => CheckOutcome::from_violations(checks::signature(
                Stage::Detail,
                mapper.parameters(),
                &DETAIL_PARAMETERS,
            )),
            None => CheckOutcome::Skip(NO_DETAIL_MAPPER.to_string()),
        };
        self.record(Phase::Signature, Stage::Detail, "detail signature", outcome);

        let outcome = match &self.display {
            Some(mapper) => CheckOutcome::from_violations(checks::signature(
                Stage::Display,
                mapper.parameters(),
                &DISPLAY_PARAMETERS,
            )),
            None => CheckOutcome::Skip(NO_DISPLAY_MAPPER.to_string()),
        };
        self.record(
            Phase::Signature,
            Stage::Display,
            "display signature",
            outcome,
        );
    }

    // -- Phase 3 -----------------------------------------------------------

    fn smoke(&mut self) {
        self.phase_start(Phase::Smoke);
        let (occurrence, fixture) = self.base_occurrence();

        match self.detail.clone() {
            Some(mapper) => {
                let invocation =
                    self.invoker()
                        .detail(&mapper, occurrence.clone(), inputs::empty_context());
                let outcome = self.smoke_outcome(Stage::Detail, invocation, fixture.as_deref());
                self.smoke_detail = outcome.1;
                self.record(Phase::Smoke, Stage::Detail, "detail smoke", outcome.0);
            }
            None => self.record(
                Phase::Smoke,
                Stage::Detail,
                "detail smoke",
                CheckOutcome::Skip(NO_DETAIL_MAPPER.to_string()),
            ),
        }

        match self.display.clone() {
            Some(mapper) => {
                let spliced = match &self.smoke_detail {
                    Some(detail) => splice_detail(&occurrence, detail.clone()),
                    None => occurrence.clone(),
                };
                let invocation = self.invoker().display(
                    &mapper,
                    spliced,
                    self.base_attestation(),
                    inputs::empty_context(),
                );
                let outcome = self.smoke_outcome(Stage::Display, invocation, fixture.as_deref());
                self.smoke_display = outcome.1;
                self.record(Phase::Smoke, Stage::Display, "display smoke", outcome.0);
            }
            None => self.record(
                Phase::Smoke,
                Stage::Display,
                "display smoke",
                CheckOutcome::Skip(NO_DISPLAY_MAPPER.to_string()),
            ),
        }
    }

    /// Outcome of a smoke invocation plus the output when it is a mapping.
    fn smoke_outcome(
        &self,
        stage: Stage,
        invocation: Invocation,
        fixture: Option<&str>,
    ) -> (CheckOutcome, Option<Value>) {
        let tag = |v: Violation| match fixture {
            Some(name) => v.fixture(name),
            None => v,
        };
        match invocation.result {
            Ok(output) => match checks::is_mapping(Phase::Smoke, stage, &output) {
                Some(violation) => (CheckOutcome::Fail(vec![tag(violation)]), None),
                None => (CheckOutcome::Pass, Some(output)),
            },
            Err(err) => (
                CheckOutcome::Fail(vec![tag(checks::invocation_failure(
                    Phase::Smoke,
                    stage,
                    &err,
                ))]),
                None,
            ),
        }
    }

    // -- Phase 4 -----------------------------------------------------------

    fn structural(&mut self) {
        self.phase_start(Phase::Structural);

        let outcome = match (&self.detail, &self.smoke_detail) {
            (None, _) => CheckOutcome::Skip(NO_DETAIL_MAPPER.to_string()),
            (Some(_), None) => {
                CheckOutcome::Skip("detail smoke check produced no mapping".to_string())
            }
            (Some(_), Some(output)) => CheckOutcome::from_violations(checks::conforms(
                Phase::Structural,
                Stage::Detail,
                output,
                self.control.detail_shape(),
            )),
        };
        self.record(Phase::Structural, Stage::Detail, "detail shape", outcome);

        let outcome = match (&self.display, &self.smoke_display) {
            (None, _) => CheckOutcome::Skip(NO_DISPLAY_MAPPER.to_string()),
            (Some(_), None) => {
                CheckOutcome::Skip("display smoke check produced no mapping".to_string())
            }
            (Some(_), Some(output)) => CheckOutcome::from_violations(checks::conforms(
                Phase::Structural,
                Stage::Display,
                output,
                &display_shape(),
            )),
        };
        if let Some(output) = self.smoke_display.clone() {
            self.note_display(&output, None);
        }
        self.record(Phase::Structural, Stage::Display, "display shape", outcome);
    }

    // -- Phase 5 -----------------------------------------------------------

    fn edge_cases(&mut self) {
        self.phase_start(Phase::EdgeCases);

        match self.detail.clone() {
            Some(mapper) => {
                let shape = self.control.detail_shape().clone();
                for case in inputs::detail_cases() {
                    let invocation = self.invoker().detail(
                        &mapper,
                        case.occurrence.clone(),
                        case.context.clone(),
                    );
                    self.record_edge_case(Stage::Detail, &case, invocation, &shape);
                }
            }
            None => self.record(
                Phase::EdgeCases,
                Stage::Detail,
                "detail edge cases",
                CheckOutcome::Skip(NO_DETAIL_MAPPER.to_string()),
            ),
        }

        match self.display.clone() {
            Some(mapper) => {
                let shape = display_shape();
                for case in inputs::display_cases() {
                    let invocation = self.invoker().display(
                        &mapper,
                        case.occurrence.clone(),
                        case.attestation.clone(),
                        case.context.clone(),
                    );
                    self.record_edge_case(Stage::Display, &case, invocation, &shape);
                }
            }
            None => self.record(
                Phase::EdgeCases,
                Stage::Display,
                "display edge cases",
                CheckOutcome::Skip(NO_DISPLAY_MAPPER.to_string()),
            ),
        }
    }

    fn record_edge_case(
        &mut self,
        stage: Stage,
        case: &EdgeCase,
        invocation: Invocation,
        shape: &Shape,
    ) {
        let violations = checks::edge_case(stage, case, &invocation.result, shape);
        self.record(
            Phase::EdgeCases,
            stage,
            case.name,
            CheckOutcome::from_violations(violations),
        );
    }

    // -- Phase 6 -----------------------------------------------------------

    fn corpus(&mut self) {
        self.phase_start(Phase::Corpus);
        let batch = self.harness.config.parallelism;

        let outcome = match (self.detail.clone(), self.payload_gap.clone()) {
            (None, _) => CheckOutcome::Skip(NO_DETAIL_MAPPER.to_string()),
            (Some(_), Some(gap)) => CheckOutcome::Skip(gap),
            (Some(mapper), None) => {
                let shape = self.control.detail_shape().clone();
                let mut violations = Vec::new();
                for chunk in self.payloads.chunks(batch) {
                    let pending: Vec<_> = chunk
                        .iter()
                        .map(|fixture| {
                            self.invoker().spawn_detail(
                                &mapper,
                                fixture.value.clone(),
                                inputs::empty_context(),
                            )
                        })
                        .collect();
                    for (fixture, pending) in chunk.iter().zip(pending) {
                        let found = match pending.wait().result {
                            Ok(output) => {
                                checks::conforms(Phase::Corpus, Stage::Detail, &output, &shape)
                            }
                            Err(err) => {
                                vec![checks::invocation_failure(Phase::Corpus, Stage::Detail, &err)]
                            }
                        };
                        violations.extend(found.into_iter().map(|v| v.fixture(&fixture.name)));
                    }
                }
                CheckOutcome::from_violations(violations)
            }
        };
        self.record(Phase::Corpus, Stage::Detail, "payload corpus", outcome);

        let outcome = match (self.display.clone(), self.policy_gap.clone()) {
            (None, _) => CheckOutcome::Skip(NO_DISPLAY_MAPPER.to_string()),
            (Some(_), Some(gap)) => CheckOutcome::Skip(gap),
            (Some(mapper), None) => {
                let (base, _) = self.base_occurrence();
                let occurrence = match &self.smoke_detail {
                    Some(detail) => splice_detail(&base, detail.clone()),
                    None => base,
                };
                let cases: Vec<(String, Value)> = self
                    .policies
                    .iter()
                    .flat_map(|fixture| {
                        [AttestationResult::Pass, AttestationResult::Fail]
                            .into_iter()
                            .map(|result| {
                                (
                                    fixture.name.clone(),
                                    Attestation::from_policy_data(fixture.value.clone(), result)
                                        .into_value(),
                                )
                            })
                    })
                    .collect();

                let shape = display_shape();
                let mut violations = Vec::new();
                let mut outputs = Vec::new();
                for chunk in cases.chunks(batch) {
                    let pending: Vec<_> = chunk
                        .iter()
                        .map(|(_, attestation)| {
                            self.invoker().spawn_display(
                                &mapper,
                                occurrence.clone(),
                                attestation.clone(),
                                inputs::empty_context(),
                            )
                        })
                        .collect();
                    for ((name, _), pending) in chunk.iter().zip(pending) {
                        match pending.wait().result {
                            Ok(output) => {
                                violations.extend(
                                    checks::conforms(Phase::Corpus, Stage::Display, &output, &shape)
                                        .into_iter()
                                        .map(|v| v.fixture(name)),
                                );
                                outputs.push((name.clone(), output));
                            }
                            Err(err) => violations.push(
                                checks::invocation_failure(Phase::Corpus, Stage::Display, &err)
                                    .fixture(name),
                            ),
                        }
                    }
                }
                for (name, output) in outputs {
                    self.note_display(&output, Some(&name));
                }
                CheckOutcome::from_violations(violations)
            }
        };
        self.record(Phase::Corpus, Stage::Display, "policy corpus", outcome);
    }

    // -- Phase 7 -----------------------------------------------------------

    fn integration(&mut self) {
        self.phase_start(Phase::Integration);

        let (detail, display) = match (self.detail.clone(), self.display.clone()) {
            (Some(detail), Some(display)) => (detail, display),
            (None, _) => {
                return self.record(
                    Phase::Integration,
                    Stage::Pipeline,
                    "pipeline",
                    CheckOutcome::Skip(NO_DETAIL_MAPPER.to_string()),
                )
            }
            (_, None) => {
                return self.record(
                    Phase::Integration,
                    Stage::Pipeline,
                    "pipeline",
                    CheckOutcome::Skip(NO_DISPLAY_MAPPER.to_string()),
                )
            }
        };
        if let Some(gap) = self.payload_gap.clone() {
            return self.record(
                Phase::Integration,
                Stage::Pipeline,
                "pipeline",
                CheckOutcome::Skip(gap),
            );
        }

        let attestations: Vec<Value> = if self.policies.is_empty() {
            vec![inputs::sample_attestation()]
        } else {
            self.policies
                .iter()
                .map(|p| {
                    Attestation::from_policy_data(p.value.clone(), AttestationResult::Pass)
                        .into_value()
                })
                .collect()
        };

        let payloads = self.payloads.clone();
        let mut rendered = Vec::new();
        for fixture in &payloads {
            let (violations, outputs) =
                self.pipeline(&detail, &display, &fixture.value, &attestations);
            for (_, output) in &outputs {
                self.note_display(output, Some(&fixture.name));
            }
            rendered.extend(outputs);
            let violations = violations
                .into_iter()
                .map(|v| v.fixture(&fixture.name))
                .collect();
            self.record(
                Phase::Integration,
                Stage::Pipeline,
                fixture.name.clone(),
                CheckOutcome::from_violations(violations),
            );
        }
        self.advisories.extend(checks::tag_varies(&rendered));
    }

    /// Detail, splice, display for one raw fixture. Stops at the first stage
    /// that fails, since later stages would only repeat the same fault.
    /// Outputs pair the mapped detail with each display rendering.
    fn pipeline(
        &self,
        detail: &Arc<dyn DetailMapper>,
        display: &Arc<dyn DisplayMapper>,
        raw: &Value,
        attestations: &[Value],
    ) -> (Vec<Violation>, Vec<(Value, Value)>) {
        let shape_violations: Vec<Violation> = occurrence_shape()
            .check(raw)
            .iter()
            .map(|found| {
                let mut v = Violation::shape(Phase::Integration, Stage::Pipeline, found);
                v.message = format!("fixture is not occurrence-shaped at {}", found.path);
                v
            })
            .collect();
        if !shape_violations.is_empty() {
            return (shape_violations, Vec::new());
        }

        let mapped = match self
            .invoker()
            .detail(detail, raw.clone(), inputs::empty_context())
            .result
        {
            Ok(output) => output,
            Err(err) => {
                return (
                    vec![checks::invocation_failure(Phase::Integration, Stage::Detail, &err)],
                    Vec::new(),
                )
            }
        };
        if let Some(violation) = checks::is_mapping(Phase::Integration, Stage::Detail, &mapped) {
            return (vec![violation], Vec::new());
        }

        let spliced = splice_detail(raw, mapped.clone());
        let shape = display_shape();
        let mut violations = Vec::new();
        let mut outputs = Vec::new();
        for attestation in attestations {
            let invocation = self.invoker().display(
                display,
                spliced.clone(),
                attestation.clone(),
                inputs::empty_context(),
            );
            match invocation.result {
                Ok(output) => {
                    violations.extend(checks::conforms(
                        Phase::Integration,
                        Stage::Display,
                        &output,
                        &shape,
                    ));
                    outputs.push((mapped.clone(), output));
                }
                Err(err) => violations.push(checks::invocation_failure(
                    Phase::Integration,
                    Stage::Display,
                    &err,
                )),
            }
        }
        (violations, outputs)
    }

    // -- Phase 8 -----------------------------------------------------------

    fn consistency(&mut self) {
        self.phase_start(Phase::Consistency);
        let (occurrence, fixture) = self.base_occurrence();
        let tag = |v: Violation| match &fixture {
            Some(name) => v.fixture(name),
            None => v,
        };

        let outcome = match self.detail.clone() {
            None => CheckOutcome::Skip(NO_DETAIL_MAPPER.to_string()),
            Some(mapper) => {
                let ctx = inputs::empty_context();
                let first = self
                    .invoker()
                    .detail(&mapper, occurrence.clone(), ctx.clone());
                let second = self.invoker().detail(&mapper, occurrence.clone(), ctx);
                CheckOutcome::from_violations(
                    self.compare_runs(Stage::Detail, first, second)
                        .into_iter()
                        .map(tag)
                        .collect(),
                )
            }
        };
        self.record(
            Phase::Consistency,
            Stage::Detail,
            "detail determinism",
            outcome,
        );

        let Some(mapper) = self.display.clone() else {
            self.record(
                Phase::Consistency,
                Stage::Display,
                "display determinism",
                CheckOutcome::Skip(NO_DISPLAY_MAPPER.to_string()),
            );
            return self.record(
                Phase::Consistency,
                Stage::Display,
                "description stability",
                CheckOutcome::Skip(NO_DISPLAY_MAPPER.to_string()),
            );
        };

        let attestation = self.base_attestation();
        let spliced = match &self.smoke_detail {
            Some(detail) => splice_detail(&occurrence, detail.clone()),
            None => occurrence.clone(),
        };
        let ctx = inputs::empty_context();
        let first = self
            .invoker()
            .display(&mapper, spliced.clone(), attestation.clone(), ctx.clone());
        let second = self
            .invoker()
            .display(&mapper, spliced, attestation.clone(), ctx.clone());
        let outcome = CheckOutcome::from_violations(
            self.compare_runs(Stage::Display, first, second)
                .into_iter()
                .map(tag)
                .collect(),
        );
        self.record(
            Phase::Consistency,
            Stage::Display,
            "display determinism",
            outcome,
        );

        let (low, high) = match &self.smoke_detail {
            Some(detail) => {
                let perturbed = inputs::perturb_numbers(detail);
                if &perturbed == detail {
                    inputs::numeric_detail_pair()
                } else {
                    (detail.clone(), perturbed)
                }
            }
            None => inputs::numeric_detail_pair(),
        };
        let first = self.invoker().display(
            &mapper,
            splice_detail(&occurrence, low),
            attestation.clone(),
            ctx.clone(),
        );
        let second = self
            .invoker()
            .display(&mapper, splice_detail(&occurrence, high), attestation, ctx);
        let violations = match (first.result, second.result) {
            (Ok(a), Ok(b)) => checks::stable_description(&a, &b).into_iter().collect(),
            (Err(err), _) | (_, Err(err)) => vec![checks::invocation_failure(
                Phase::Consistency,
                Stage::Display,
                &err,
            )],
        };
        self.record(
            Phase::Consistency,
            Stage::Display,
            "description stability",
            CheckOutcome::from_violations(violations),
        );
    }

    fn compare_runs(&self, stage: Stage, first: Invocation, second: Invocation) -> Vec<Violation> {
        match (first.result, second.result) {
            (Ok(a), Ok(b)) => checks::deterministic(stage, &a, &b).into_iter().collect(),
            (Err(err), _) | (_, Err(err)) => {
                vec![checks::invocation_failure(Phase::Consistency, stage, &err)]
            }
        }
    }

    // -- Phase 9 -----------------------------------------------------------

    fn performance(&mut self) {
        self.phase_start(Phase::Performance);
        let Some(mapper) = self.detail.clone() else {
            return self.record(
                Phase::Performance,
                Stage::Detail,
                "large occurrence",
                CheckOutcome::Skip(NO_DETAIL_MAPPER.to_string()),
            );
        };

        let findings = self.harness.config.performance_findings;
        let budget = self.harness.config.performance_budget;
        let invocation = self.invoker().detail(
            &mapper,
            inputs::large_occurrence(findings),
            inputs::empty_context(),
        );
        info!(
            event = "performance_measured",
            control = self.control.name(),
            findings,
            elapsed_ms = invocation.elapsed.as_millis() as u64,
            budget_ms = budget.as_millis() as u64
        );

        let violations = match invocation.result {
            Err(err) => vec![checks::invocation_failure(Phase::Performance, Stage::Detail, &err)],
            Ok(_) if invocation.elapsed >= budget => {
                let violation = Violation::new(
                    Phase::Performance,
                    Stage::Detail,
                    format!("detail mapper took too long on {} findings", findings),
                );
                let elapsed = format!("{:?}", invocation.elapsed);
                vec![violation.delta(format!("< {:?}", budget), elapsed)]
            }
            Ok(output) => checks::is_mapping(Phase::Performance, Stage::Detail, &output)
                .into_iter()
                .collect(),
        };
        self.record(
            Phase::Performance,
            Stage::Detail,
            "large occurrence",
            CheckOutcome::from_violations(violations),
        );
    }

    fn finish(self, run_id: String) -> ControlReport {
        let mut seen = HashSet::new();
        let advisories = self
            .advisories
            .into_iter()
            .filter(|a| seen.insert((a.stage, a.message.clone())))
            .collect();

        ControlReport {
            control: self.control.name().to_string(),
            run_id,
            generated_at: chrono::Utc::now().to_rfc3339(),
            fixtures: self.digests,
            checks: self.checks,
            advisories,
        }
    }
}
