//! Snapshot comparison engine.
//!
//! Compares two snapshots and reports:
//! - Components added, removed, or changed (same id, different content hash)
//! - Findings new, resolved, or persistent, matched by their composite key
//! - A stability label for the newer snapshot

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::ledger::Ledger;
use super::snapshot::Snapshot;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stability {
    Stable,
    Evolving,
    Unstable,
}

impl Stability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stability::Stable => "STABLE",
            Stability::Evolving => "EVOLVING",
            Stability::Unstable => "UNSTABLE",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ComponentDelta {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FindingDelta {
    pub new: Vec<String>,
    pub resolved: Vec<String>,
    pub persistent: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    pub old_snapshot_id: String,
    pub new_snapshot_id: String,
    pub components: ComponentDelta,
    pub findings: FindingDelta,
    pub stability: Stability,
}

/// Compare `old` against `new`. All delta lists are sorted.
pub fn compare_snapshots(old: &Snapshot, new: &Snapshot) -> DiffResult {
    // component id -> content hash
    let old_hashes: BTreeMap<&str, &str> = old
        .components
        .iter()
        .map(|c| (c.id.as_str(), c.content_hash.as_str()))
        .collect();
    let new_hashes: BTreeMap<&str, &str> = new
        .components
        .iter()
        .map(|c| (c.id.as_str(), c.content_hash.as_str()))
        .collect();

    let mut components = ComponentDelta::default();
    for (id, hash) in &new_hashes {
        match old_hashes.get(id) {
            None => components.added.push(id.to_string()),
            Some(old_hash) if old_hash != hash => components.changed.push(id.to_string()),
            Some(_) => {}
        }
    }
    components.removed = old_hashes
        .keys()
        .filter(|id| !new_hashes.contains_key(*id))
        .map(|id| id.to_string())
        .collect();

    let old_keys: BTreeSet<String> = old.findings.iter().map(|f| f.key()).collect();
    let new_keys: BTreeSet<String> = new.findings.iter().map(|f| f.key()).collect();

    let findings = FindingDelta {
        new: new_keys.difference(&old_keys).cloned().collect(),
        resolved: old_keys.difference(&new_keys).cloned().collect(),
        persistent: old_keys.intersection(&new_keys).cloned().collect(),
    };

    let stability = if !findings.new.is_empty() {
        Stability::Unstable
    } else if new.findings.is_empty() {
        Stability::Stable
    } else {
        Stability::Evolving
    };

    DiffResult {
        old_snapshot_id: old.snapshot_id.clone(),
        new_snapshot_id: new.snapshot_id.clone(),
        components,
        findings,
        stability,
    }
}

impl Ledger {
    /// Diff two recorded snapshots. Either id being unknown is an error.
    pub fn diff_snapshots(&self, old_id: &str, new_id: &str) -> Result<DiffResult> {
        let old = self.get_snapshot(old_id)?;
        let new = self.get_snapshot(new_id)?;
        Ok(compare_snapshots(&old, &new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::model::{Component, ComponentKind, Finding, Severity};

    fn component(id: &str, hash: &str) -> Component {
        Component {
            id: id.to_string(),
            kind: ComponentKind::Function,
            depth: 0,
            content_hash: hash.to_string(),
        }
    }

    fn finding(code: &str, file: &str) -> Finding {
        Finding::new(code, Severity::Error, file, Some(1), format!("{code} in {file}"))
    }

    fn snapshot(id: &str, components: Vec<Component>, findings: Vec<Finding>) -> Snapshot {
        let mut snapshot = Snapshot::new(id);
        snapshot.components = components;
        snapshot.findings = findings;
        snapshot
    }

    #[test]
    fn test_component_added_removed_changed() {
        let old = snapshot("a", vec![component("m.py:f", "1"), component("m.py:g", "2")], vec![]);
        let new = snapshot("b", vec![component("m.py:f", "9"), component("m.py:h", "3")], vec![]);

        let diff = compare_snapshots(&old, &new);
        assert_eq!(diff.components.added, vec!["m.py:h"]);
        assert_eq!(diff.components.removed, vec!["m.py:g"]);
        assert_eq!(diff.components.changed, vec!["m.py:f"]);
    }

    #[test]
    fn test_finding_sets() {
        let old = snapshot("a", vec![], vec![finding("X", "a.py"), finding("Y", "a.py")]);
        let new = snapshot("b", vec![], vec![finding("Y", "a.py"), finding("Z", "a.py")]);

        let diff = compare_snapshots(&old, &new);
        assert_eq!(diff.findings.new, vec![finding("Z", "a.py").key()]);
        assert_eq!(diff.findings.resolved, vec![finding("X", "a.py").key()]);
        assert_eq!(diff.findings.persistent, vec![finding("Y", "a.py").key()]);
        assert_eq!(diff.stability, Stability::Unstable);
    }

    #[test]
    fn test_stability_labels() {
        let clean = snapshot("a", vec![], vec![]);
        let dirty = snapshot("b", vec![], vec![finding("X", "a.py")]);

        assert_eq!(compare_snapshots(&clean, &clean).stability, Stability::Stable);
        assert_eq!(compare_snapshots(&dirty, &dirty).stability, Stability::Evolving);
        assert_eq!(compare_snapshots(&dirty, &clean).stability, Stability::Stable);
        assert_eq!(compare_snapshots(&clean, &dirty).stability, Stability::Unstable);
    }

    #[test]
    fn test_identical_snapshots_have_no_delta() {
        let s = snapshot("a", vec![component("m.py:f", "1")], vec![]);
        let diff = compare_snapshots(&s, &s);
        assert_eq!(diff.components, ComponentDelta::default());
        assert_eq!(diff.old_snapshot_id, "a");
    }

    #[test]
    fn test_stability_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Stability::Evolving).unwrap(), "\"EVOLVING\"");
        assert_eq!(Stability::Unstable.as_str(), "UNSTABLE");
    }
}
