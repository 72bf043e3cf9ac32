//! Harness configuration.
//!
//! Priority: explicit override (CLI arg) > env var > default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{HarnessError, HarnessResult};

pub const DEFAULT_INVOCATION_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_PERFORMANCE_BUDGET: Duration = Duration::from_secs(1);
pub const DEFAULT_PERFORMANCE_FINDINGS: usize = 1000;
const MAX_DEFAULT_PARALLELISM: usize = 8;

/// Resolved harness configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Wall-clock ceiling for a single mapper invocation.
    pub invocation_timeout: Duration,
    /// Maximum concurrent invocations in the corpus phase.
    pub parallelism: usize,
    /// Budget for mapping the synthesized large occurrence.
    pub performance_budget: Duration,
    /// Number of findings in the synthesized large occurrence.
    pub performance_findings: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            invocation_timeout: DEFAULT_INVOCATION_TIMEOUT,
            parallelism: default_parallelism(),
            performance_budget: DEFAULT_PERFORMANCE_BUDGET,
            performance_findings: DEFAULT_PERFORMANCE_FINDINGS,
        }
    }
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_DEFAULT_PARALLELISM)
}

/// Values supplied explicitly, typically from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub timeout_ms: Option<u64>,
    pub parallelism: Option<usize>,
    pub perf_budget_ms: Option<u64>,
    pub perf_findings: Option<usize>,
}

/// Snapshot of the environment variables relevant to harness configuration.
///
/// Extracted into a struct so tests can inject values without mutating
/// the real process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvState {
    /// `CONTROL_HARNESS_TIMEOUT_MS`
    pub timeout_ms: Option<String>,
    /// `CONTROL_HARNESS_PARALLELISM`
    pub parallelism: Option<String>,
    /// `CONTROL_HARNESS_PERF_BUDGET_MS`
    pub perf_budget_ms: Option<String>,
    /// `CONTROL_HARNESS_PERF_FINDINGS`
    pub perf_findings: Option<String>,
}

impl EnvState {
    /// Read the current process environment.
    pub fn from_env() -> Self {
        Self {
            timeout_ms: std::env::var("CONTROL_HARNESS_TIMEOUT_MS").ok(),
            parallelism: std::env::var("CONTROL_HARNESS_PARALLELISM").ok(),
            perf_budget_ms: std::env::var("CONTROL_HARNESS_PERF_BUDGET_MS").ok(),
            perf_findings: std::env::var("CONTROL_HARNESS_PERF_FINDINGS").ok(),
        }
    }
}

impl HarnessConfig {
    /// Resolve config from explicit overrides and the process environment.
    pub fn resolve(overrides: &ConfigOverrides) -> HarnessResult<Self> {
        Self::resolve_with(overrides, &EnvState::from_env())
    }

    /// Resolve config with an explicit `EnvState` (for testing).
    pub fn resolve_with(overrides: &ConfigOverrides, env: &EnvState) -> HarnessResult<Self> {
        let defaults = Self::default();

        let timeout_ms = pick(
            overrides.timeout_ms,
            &env.timeout_ms,
            "CONTROL_HARNESS_TIMEOUT_MS",
        )?;
        let parallelism = pick(
            overrides.parallelism,
            &env.parallelism,
            "CONTROL_HARNESS_PARALLELISM",
        )?;
        let perf_budget_ms = pick(
            overrides.perf_budget_ms,
            &env.perf_budget_ms,
            "CONTROL_HARNESS_PERF_BUDGET_MS",
        )?;
        let perf_findings = pick(
            overrides.perf_findings,
            &env.perf_findings,
            "CONTROL_HARNESS_PERF_FINDINGS",
        )?;

        let config = Self {
            invocation_timeout: timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.invocation_timeout),
            parallelism: parallelism.unwrap_or(defaults.parallelism),
            performance_budget: perf_budget_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.performance_budget),
            performance_findings: perf_findings.unwrap_or(defaults.performance_findings),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall or panic a run.
    pub fn validate(&self) -> HarnessResult<()> {
        if self.invocation_timeout.is_zero() {
            return Err(HarnessError::config_error("invocation timeout must be > 0"));
        }
        if self.parallelism == 0 {
            return Err(HarnessError::config_error("parallelism must be >= 1"));
        }
        if self.performance_budget.is_zero() {
            return Err(HarnessError::config_error("performance budget must be > 0"));
        }
        Ok(())
    }
}

fn pick<T: std::str::FromStr>(
    explicit: Option<T>,
    env_value: &Option<String>,
    env_name: &str,
) -> HarnessResult<Option<T>> {
    if explicit.is_some() {
        return Ok(explicit);
    }
    match env_value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| {
            HarnessError::config_error(format!("{} has invalid value '{}'", env_name, raw))
        }),
    }
}

/// On-disk layout of a control's fixtures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlLayout {
    pub root: PathBuf,
}

impl ControlLayout {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Occurrence-shaped payloads: `<root>/testing/payloads`.
    pub fn payloads_dir(&self) -> PathBuf {
        self.root.join("testing").join("payloads")
    }

    /// Policy data: `<root>/inputs/data`.
    pub fn policy_dir(&self) -> PathBuf {
        self.root.join("inputs").join("data")
    }
}
