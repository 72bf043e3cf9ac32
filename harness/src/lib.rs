//! Contract validation harness for control mappers.
//!
//! Given a registered [`Control`](control_kit_common::Control) and a
//! [`FixtureSource`], the harness exercises both mappers through discovery,
//! signature, smoke, structural, edge-case, corpus, integration, consistency
//! and performance phases, and returns a [`ControlReport`] that lists every
//! violation found. Mapper misbehaviour never aborts a run.

pub mod checks;
pub mod config;
pub mod diff;
pub mod error;
pub mod fixtures;
pub mod inputs;
pub mod invoke;
pub mod report;
pub mod runner;

pub use config::{ConfigOverrides, ControlLayout, EnvState, HarnessConfig};
pub use error::{HarnessError, HarnessResult};
pub use fixtures::{DirectoryFixtures, Fixture, FixtureKind, FixtureSource, InMemoryFixtures};
pub use report::{
    Advisory, CheckOutcome, CheckRecord, ControlReport, FixtureDigest, Phase, Stage, Violation,
};
pub use runner::ContractHarness;
