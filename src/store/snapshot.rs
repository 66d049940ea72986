//! Snapshots recorded in the ledger's reserved `snapshots` table.
//!
//! A snapshot is written once and never replaced. Reads go through the
//! authenticated ledger, so a tampered snapshot simply disappears.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::ledger::Ledger;
use crate::analysis::graph::Dependency;
use crate::error::{Result, StrataError};
use crate::scan::model::{Component, Finding};

pub const SNAPSHOT_TABLE: &str = "snapshots";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetrics {
    pub components_total: usize,
    pub findings_total: usize,
    pub modules_total: usize,
    pub dependencies_total: usize,
    pub max_depth: u32,
    pub complexity_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub snapshot_id: String,
    #[serde(default)]
    pub repo_ref: String,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub execution_tree: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub metrics: SnapshotMetrics,
}

impl Snapshot {
    pub fn new(snapshot_id: impl Into<String>) -> Self {
        Snapshot {
            snapshot_id: snapshot_id.into(),
            repo_ref: String::new(),
            components: Vec::new(),
            findings: Vec::new(),
            dependencies: Vec::new(),
            execution_tree: BTreeMap::new(),
            metrics: SnapshotMetrics::default(),
        }
    }
}

/// A snapshot with the logical timestamp it was committed under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredSnapshot {
    pub timestamp: String,
    pub snapshot: Snapshot,
}

impl Ledger {
    /// Commit `snapshot` to the `snapshots` table. An id that is already
    /// recorded is rejected.
    pub fn record_snapshot(&self, snapshot: &Snapshot, timestamp: &str) -> Result<u64> {
        if self.stored_snapshots()?.iter().any(|s| s.snapshot.snapshot_id == snapshot.snapshot_id) {
            return Err(StrataError::SnapshotExists {
                id: snapshot.snapshot_id.clone(),
            });
        }
        self.commit(SNAPSHOT_TABLE, snapshot, timestamp)
    }

    /// Every valid snapshot, ordered by timestamp then id.
    pub fn list_snapshots(&self) -> Result<Vec<StoredSnapshot>> {
        let mut snapshots = self.stored_snapshots()?;
        snapshots.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.snapshot.snapshot_id.cmp(&b.snapshot.snapshot_id))
        });
        Ok(snapshots)
    }

    pub fn get_snapshot(&self, snapshot_id: &str) -> Result<Snapshot> {
        self.stored_snapshots()?
            .into_iter()
            .map(|s| s.snapshot)
            .find(|s| s.snapshot_id == snapshot_id)
            .ok_or_else(|| StrataError::SnapshotNotFound {
                id: snapshot_id.to_string(),
            })
    }

    fn stored_snapshots(&self) -> Result<Vec<StoredSnapshot>> {
        let mut snapshots = Vec::new();

        for record in self.fetch_records(SNAPSHOT_TABLE)? {
            match serde_json::from_value::<Snapshot>(record.payload) {
                Ok(snapshot) => snapshots.push(StoredSnapshot {
                    timestamp: record.timestamp,
                    snapshot,
                }),
                Err(e) => warn!("skipping malformed snapshot record at {}: {e}", record.timestamp),
            }
        }

        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::model::{ComponentKind, Severity};
    use crate::store::ledger::LedgerKey;

    fn ledger(dir: &tempfile::TempDir) -> Ledger {
        Ledger::new(dir.path().join("ledger.log"), LedgerKey::new("k").unwrap())
    }

    fn snapshot(id: &str) -> Snapshot {
        let mut snapshot = Snapshot::new(id);
        snapshot.repo_ref = "main".into();
        snapshot.components.push(Component {
            id: "a.py:a".into(),
            kind: ComponentKind::Module,
            depth: 0,
            content_hash: "00".into(),
        });
        snapshot
            .findings
            .push(Finding::new("DeadBranch", Severity::Warn, "a.py", Some(3), "pass".into()));
        snapshot.execution_tree.insert("a.py".into(), vec!["f".into()]);
        snapshot
    }

    #[test]
    fn recorded_snapshot_reads_back_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir);
        ledger.record_snapshot(&snapshot("s1"), "2024-01-01T00:00:00Z").unwrap();

        assert_eq!(ledger.get_snapshot("s1").unwrap(), snapshot("s1"));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir);
        ledger.record_snapshot(&snapshot("s1"), "t1").unwrap();

        let err = ledger.record_snapshot(&snapshot("s1"), "t2").unwrap_err();
        assert!(matches!(err, StrataError::SnapshotExists { id } if id == "s1"));
        assert_eq!(ledger.list_snapshots().unwrap().len(), 1);
    }

    #[test]
    fn listing_orders_by_timestamp_then_id() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir);
        ledger.record_snapshot(&snapshot("b"), "t2").unwrap();
        ledger.record_snapshot(&snapshot("z"), "t1").unwrap();
        ledger.record_snapshot(&snapshot("a"), "t2").unwrap();

        let order: Vec<_> = ledger
            .list_snapshots()
            .unwrap()
            .into_iter()
            .map(|s| (s.timestamp, s.snapshot.snapshot_id))
            .collect();
        assert_eq!(
            order,
            vec![
                ("t1".to_string(), "z".to_string()),
                ("t2".to_string(), "a".to_string()),
                ("t2".to_string(), "b".to_string()),
            ]
        );
    }

    #[test]
    fn unknown_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = ledger(&dir).get_snapshot("nope").unwrap_err();
        assert!(matches!(err, StrataError::SnapshotNotFound { id } if id == "nope"));
    }

    #[test]
    fn malformed_payloads_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir);
        ledger.commit(SNAPSHOT_TABLE, &serde_json::json!({"no_id": true}), "t0").unwrap();
        ledger.record_snapshot(&snapshot("s1"), "t1").unwrap();

        assert_eq!(ledger.list_snapshots().unwrap().len(), 1);
    }

    #[test]
    fn sparse_payload_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir);
        ledger.commit(SNAPSHOT_TABLE, &serde_json::json!({"snapshot_id": "bare"}), "t0").unwrap();

        let bare = ledger.get_snapshot("bare").unwrap();
        assert!(bare.components.is_empty());
        assert_eq!(bare.metrics, SnapshotMetrics::default());
    }
}
