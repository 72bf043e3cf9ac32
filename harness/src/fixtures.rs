//! Fixture discovery and loading.
//!
//! The harness never globs on its own: it asks an injected `FixtureSource`
//! for fixture names and loads them one by one. `DirectoryFixtures` reads a
//! control's fixture directories; `InMemoryFixtures` serves tests.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::ControlLayout;
use crate::error::{HarnessError, HarnessResult};

/// Which of the two fixture collections a fixture belongs to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum FixtureKind {
    /// Occurrence-shaped test payload.
    Payload,
    /// Policy configuration data.
    Policy,
}

impl fmt::Display for FixtureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Payload => f.pad("payload"),
            Self::Policy => f.pad("policy"),
        }
    }
}

/// A loaded fixture. Never mutated after loading.
#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    /// File name; the fixture's identity in reports.
    pub name: String,
    pub kind: FixtureKind,
    pub value: Value,
    /// SHA-256 of the raw fixture bytes, hex-encoded.
    pub digest: String,
}

impl Fixture {
    /// Parse raw fixture bytes.
    pub fn parse(name: &str, kind: FixtureKind, bytes: &[u8]) -> HarnessResult<Self> {
        let value = serde_json::from_slice(bytes)
            .map_err(|e| HarnessError::fixture_format(name, e.to_string()))?;
        Ok(Self {
            name: name.to_string(),
            kind,
            value,
            digest: hex::encode(Sha256::digest(bytes)),
        })
    }
}

/// Source of fixtures for one control.
pub trait FixtureSource: Send + Sync {
    /// Names of every fixture of `kind`, sorted. `Ok(None)` when the
    /// collection does not exist at all.
    fn list(&self, kind: FixtureKind) -> HarnessResult<Option<Vec<String>>>;

    /// Load one fixture by name.
    fn load(&self, kind: FixtureKind, name: &str) -> HarnessResult<Fixture>;

    /// Where fixtures of `kind` come from, for skip messages.
    fn location(&self, kind: FixtureKind) -> String;
}

/// Fixtures read from a payloads directory and a policy-data directory.
#[derive(Debug, Clone)]
pub struct DirectoryFixtures {
    payloads_dir: PathBuf,
    policy_dir: PathBuf,
}

impl DirectoryFixtures {
    pub fn new(payloads_dir: impl Into<PathBuf>, policy_dir: impl Into<PathBuf>) -> Self {
        Self {
            payloads_dir: payloads_dir.into(),
            policy_dir: policy_dir.into(),
        }
    }

    /// Fixtures at the conventional locations under a control root.
    pub fn for_layout(layout: &ControlLayout) -> Self {
        Self::new(layout.payloads_dir(), layout.policy_dir())
    }

    fn dir(&self, kind: FixtureKind) -> &Path {
        match kind {
            FixtureKind::Payload => &self.payloads_dir,
            FixtureKind::Policy => &self.policy_dir,
        }
    }
}

impl FixtureSource for DirectoryFixtures {
    fn list(&self, kind: FixtureKind) -> HarnessResult<Option<Vec<String>>> {
        let dir = self.dir(kind);
        if !dir.is_dir() {
            return Ok(None);
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(Some(names))
    }

    fn load(&self, kind: FixtureKind, name: &str) -> HarnessResult<Fixture> {
        let path = self.dir(kind).join(name);
        if !path.is_file() {
            return Err(HarnessError::fixture_not_found(path.display().to_string()));
        }
        let bytes = fs::read(&path)?;
        Fixture::parse(name, kind, &bytes)
    }

    fn location(&self, kind: FixtureKind) -> String {
        self.dir(kind).display().to_string()
    }
}

/// Fixtures held in memory as raw text, keyed by name.
///
/// A collection that was never given a fixture is reported as absent.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFixtures {
    payloads: Option<BTreeMap<String, String>>,
    policies: Option<BTreeMap<String, String>>,
}

impl InMemoryFixtures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(self, name: &str, value: Value) -> Self {
        self.with_raw(FixtureKind::Payload, name, value.to_string())
    }

    pub fn with_policy(self, name: &str, value: Value) -> Self {
        self.with_raw(FixtureKind::Policy, name, value.to_string())
    }

    /// Add raw text, which need not be valid JSON.
    pub fn with_raw(mut self, kind: FixtureKind, name: &str, raw: impl Into<String>) -> Self {
        self.collection_mut(kind)
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), raw.into());
        self
    }

    /// Mark a collection as present but empty.
    pub fn with_empty(mut self, kind: FixtureKind) -> Self {
        self.collection_mut(kind).get_or_insert_with(BTreeMap::new);
        self
    }

    fn collection(&self, kind: FixtureKind) -> Option<&BTreeMap<String, String>> {
        match kind {
            FixtureKind::Payload => self.payloads.as_ref(),
            FixtureKind::Policy => self.policies.as_ref(),
        }
    }

    fn collection_mut(&mut self, kind: FixtureKind) -> &mut Option<BTreeMap<String, String>> {
        match kind {
            FixtureKind::Payload => &mut self.payloads,
            FixtureKind::Policy => &mut self.policies,
        }
    }
}

impl FixtureSource for InMemoryFixtures {
    fn list(&self, kind: FixtureKind) -> HarnessResult<Option<Vec<String>>> {
        Ok(self.collection(kind).map(|c| c.keys().cloned().collect()))
    }

    fn load(&self, kind: FixtureKind, name: &str) -> HarnessResult<Fixture> {
        let raw = self
            .collection(kind)
            .and_then(|c| c.get(name))
            .ok_or_else(|| HarnessError::fixture_not_found(name))?;
        Fixture::parse(name, kind, raw.as_bytes())
    }

    fn location(&self, kind: FixtureKind) -> String {
        format!("in-memory {} fixtures", kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn directory_listing_is_sorted_and_json_only() {
        let dir = tempfile::tempdir().unwrap();
        let payloads = dir.path().join("payloads");
        fs::create_dir_all(&payloads).unwrap();
        fs::write(payloads.join("b.json"), "{}").unwrap();
        fs::write(payloads.join("a.json"), r#"{"detail": {}}"#).unwrap();
        fs::write(payloads.join("notes.txt"), "ignored").unwrap();

        let source = DirectoryFixtures::new(&payloads, dir.path().join("missing"));
        assert_eq!(
            source.list(FixtureKind::Payload).unwrap(),
            Some(vec!["a.json".to_string(), "b.json".to_string()])
        );
        assert_eq!(source.list(FixtureKind::Policy).unwrap(), None);

        let fixture = source.load(FixtureKind::Payload, "a.json").unwrap();
        assert_eq!(fixture.value, json!({"detail": {}}));
        assert_eq!(fixture.digest.len(), 64);
    }

    #[test]
    fn directory_load_reports_bad_json_with_name() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        let source = DirectoryFixtures::new(dir.path(), dir.path());
        match source.load(FixtureKind::Payload, "broken.json") {
            Err(HarnessError::FixtureFormat { fixture, .. }) => assert_eq!(fixture, "broken.json"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn directory_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectoryFixtures::new(dir.path(), dir.path());
        assert!(matches!(
            source.load(FixtureKind::Policy, "nope.json"),
            Err(HarnessError::FixtureNotFound { .. })
        ));
    }

    #[test]
    fn in_memory_absent_vs_empty() {
        let source = InMemoryFixtures::new().with_empty(FixtureKind::Policy);
        assert_eq!(source.list(FixtureKind::Payload).unwrap(), None);
        assert_eq!(source.list(FixtureKind::Policy).unwrap(), Some(vec![]));
    }

    #[test]
    fn digest_depends_on_raw_bytes() {
        let a = Fixture::parse("a", FixtureKind::Payload, br#"{"x":1}"#).unwrap();
        let b = Fixture::parse("b", FixtureKind::Payload, br#"{ "x": 1 }"#).unwrap();
        assert_eq!(a.value, b.value);
        assert_ne!(a.digest, b.digest);
    }
}
