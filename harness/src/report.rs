//! Harness report types and rendering.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use control_kit_common::ShapeViolation;

use crate::error::HarnessResult;
use crate::fixtures::{Fixture, FixtureKind};

/// Harness phases, in execution order.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Discovery,
    Signature,
    Smoke,
    Structural,
    EdgeCases,
    Corpus,
    Integration,
    Consistency,
    Performance,
}

impl Phase {
    pub const ALL: [Phase; 9] = [
        Self::Discovery,
        Self::Signature,
        Self::Smoke,
        Self::Structural,
        Self::EdgeCases,
        Self::Corpus,
        Self::Integration,
        Self::Consistency,
        Self::Performance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovery => "discovery",
            Self::Signature => "signature",
            Self::Smoke => "smoke",
            Self::Structural => "structural",
            Self::EdgeCases => "edge_cases",
            Self::Corpus => "corpus",
            Self::Integration => "integration",
            Self::Consistency => "consistency",
            Self::Performance => "performance",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a check exercised.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Detail,
    Display,
    /// Detail, splice and display end to end.
    Pipeline,
    /// Fixture discovery and loading.
    Fixtures,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Detail => "detail",
            Self::Display => "display",
            Self::Pipeline => "pipeline",
            Self::Fixtures => "fixtures",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One located contract violation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Violation {
    pub phase: Phase,
    pub stage: Stage,
    /// Fixture the violation was found with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixture: Option<String>,
    /// Edge case the violation was found with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
    pub message: String,
}

impl Violation {
    pub fn new(phase: Phase, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            phase,
            stage,
            fixture: None,
            case: None,
            path: None,
            expected: None,
            actual: None,
            message: message.into(),
        }
    }

    /// Violation for one structural mismatch.
    pub fn shape(phase: Phase, stage: Stage, found: &ShapeViolation) -> Self {
        Self::new(
            phase,
            stage,
            format!(
                "{} output does not match its shape at {}",
                stage, found.path
            ),
        )
        .at(&found.path)
        .delta(&found.expected, &found.actual)
    }

    pub fn fixture(mut self, name: impl Into<String>) -> Self {
        self.fixture = Some(name.into());
        self
    }

    pub fn case(mut self, name: impl Into<String>) -> Self {
        self.case = Some(name.into());
        self
    }

    pub fn at(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn delta(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}]", self.phase, self.stage)?;
        if let Some(fixture) = &self.fixture {
            write!(f, " fixture={}", fixture)?;
        }
        if let Some(case) = &self.case {
            write!(f, " case={}", case)?;
        }
        write!(f, " {}", self.message)?;
        if let (Some(expected), Some(actual)) = (&self.expected, &self.actual) {
            write!(f, " (expected {}, got {})", expected, actual)?;
        }
        Ok(())
    }
}

/// Result of a single check.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "outcome", content = "details", rename_all = "snake_case")]
pub enum CheckOutcome {
    Pass,
    Fail(Vec<Violation>),
    Skip(String),
}

impl CheckOutcome {
    /// `Pass` when `violations` is empty, `Fail` otherwise.
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        if violations.is_empty() {
            Self::Pass
        } else {
            Self::Fail(violations)
        }
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail(_))
    }
}

/// A named check and its outcome.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CheckRecord {
    pub phase: Phase,
    pub stage: Stage,
    pub name: String,
    #[serde(flatten)]
    pub outcome: CheckOutcome,
}

/// A non-failing quality note.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Advisory {
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixture: Option<String>,
    pub message: String,
}

/// Digest of a fixture used by the run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FixtureDigest {
    pub name: String,
    pub kind: FixtureKind,
    pub sha256: String,
}

impl From<&Fixture> for FixtureDigest {
    fn from(fixture: &Fixture) -> Self {
        Self {
            name: fixture.name.clone(),
            kind: fixture.kind,
            sha256: fixture.digest.clone(),
        }
    }
}

/// Complete result of running the harness against one control.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ControlReport {
    pub control: String,
    /// Unique id of this run.
    pub run_id: String,
    /// RFC 3339 timestamp of when the report was produced.
    pub generated_at: String,
    pub fixtures: Vec<FixtureDigest>,
    pub checks: Vec<CheckRecord>,
    pub advisories: Vec<Advisory>,
}

impl ControlReport {
    /// Every distinct violation, in the order first recorded.
    pub fn failures(&self) -> Vec<&Violation> {
        let mut seen = HashSet::new();
        self.checks
            .iter()
            .filter_map(|check| match &check.outcome {
                CheckOutcome::Fail(violations) => Some(violations),
                _ => None,
            })
            .flatten()
            .filter(|v| seen.insert(*v))
            .collect()
    }

    /// Skipped checks with their reasons.
    pub fn skips(&self) -> Vec<(&CheckRecord, &str)> {
        self.checks
            .iter()
            .filter_map(|check| match &check.outcome {
                CheckOutcome::Skip(reason) => Some((check, reason.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn passed_checks(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.outcome == CheckOutcome::Pass)
            .count()
    }

    /// True when no check failed. Skips and advisories do not count.
    pub fn is_success(&self) -> bool {
        !self.checks.iter().any(|c| c.outcome.is_fail())
    }

    pub fn to_json_pretty(&self) -> HarnessResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for ControlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failures = self.failures();
        let skips = self.skips();

        writeln!(f, "Control: {}", self.control)?;
        writeln!(f, "Run:     {} ({})", self.run_id, self.generated_at)?;
        writeln!(
            f,
            "Result:  {} ({} passed, {} failed, {} skipped)",
            if self.is_success() { "PASS" } else { "FAIL" },
            self.passed_checks(),
            failures.len(),
            skips.len()
        )?;

        if !self.fixtures.is_empty() {
            writeln!(f, "\nFixtures:")?;
            for fixture in &self.fixtures {
                writeln!(
                    f,
                    "  {:<7} {} sha256:{}",
                    fixture.kind, fixture.name, fixture.sha256
                )?;
            }
        }

        if !failures.is_empty() {
            writeln!(f, "\nViolations:")?;
            for violation in &failures {
                writeln!(f, "  - {}", violation)?;
            }
        }

        if !skips.is_empty() {
            writeln!(f, "\nSkipped:")?;
            for (check, reason) in &skips {
                writeln!(
                    f,
                    "  - [{}/{}] {}: {}",
                    check.phase, check.stage, check.name, reason
                )?;
            }
        }

        if !self.advisories.is_empty() {
            writeln!(f, "\nAdvisories:")?;
            for advisory in &self.advisories {
                match &advisory.fixture {
                    Some(fixture) => writeln!(
                        f,
                        "  - [{}] fixture={} {}",
                        advisory.stage, fixture, advisory.message
                    )?,
                    None => writeln!(f, "  - [{}] {}", advisory.stage, advisory.message)?,
                }
            }
        }
        Ok(())
    }
}
