//! Bundled controls for control-kit.
//!
//! Each control lives in its own module and exposes a `control()` builder
//! plus its fixtures under `fixtures/<control name>/`:
//! - `testing/payloads/*.json`: occurrence-shaped payloads
//! - `inputs/data/*.json`: policy data

pub mod simple_boolean;
pub mod vulnerability;

use std::collections::BTreeMap;
use std::path::PathBuf;

use control_kit_common::Control;

/// Controls keyed by name.
pub struct ControlRegistry {
    controls: BTreeMap<String, Control>,
}

impl ControlRegistry {
    /// Create a new registry with the given controls.
    pub fn new(controls: Vec<Control>) -> Self {
        Self {
            controls: controls
                .into_iter()
                .map(|control| (control.name().to_string(), control))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Control> {
        self.controls.get(name)
    }

    /// Registered control names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.controls.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Control> {
        self.controls.values()
    }
}

/// Registry holding every bundled control.
pub fn builtin_registry() -> ControlRegistry {
    ControlRegistry::new(vec![simple_boolean::control(), vulnerability::control()])
}

/// Root directory of the bundled fixtures.
pub fn fixtures_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

/// Control root of a bundled control (parent of `testing/` and `inputs/`).
pub fn control_root(name: &str) -> PathBuf {
    fixtures_root().join(name)
}
