use std::fs;

use proptest::prelude::*;
use strata::config::Config;
use strata::scan::model::{Component, ComponentKind, Finding, Severity};
use strata::store::diff::compare_snapshots;
use strata::store::ledger::{IntegrityReport, Ledger, LedgerKey};
use strata::store::snapshot::Snapshot;
use strata::Engine;

fn snapshot(id: &str, components: &[(u8, u8)], findings: &[(u8, u8)]) -> Snapshot {
    let mut snapshot = Snapshot::new(id);
    snapshot.components = components
        .iter()
        .map(|(name, hash)| Component {
            id: format!("m.py:f{name}"),
            kind: ComponentKind::Function,
            depth: 0,
            content_hash: hash.to_string(),
        })
        .collect();
    snapshot.findings = findings
        .iter()
        .map(|(file, line)| {
            Finding::new("DeadBranch", Severity::Warn, &format!("f{file}.py"), Some(u32::from(*line)), "x".into())
        })
        .collect();
    snapshot
}

fn ledger(dir: &tempfile::TempDir) -> Ledger {
    Ledger::new(dir.path().join("ledger.log"), LedgerKey::new("property-key").unwrap())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn diff_is_antisymmetric(
        a_components in prop::collection::vec((0u8..12, 0u8..3), 0..10),
        b_components in prop::collection::vec((0u8..12, 0u8..3), 0..10),
        a_findings in prop::collection::vec((0u8..4, 0u8..4), 0..6),
        b_findings in prop::collection::vec((0u8..4, 0u8..4), 0..6),
    ) {
        let a = snapshot("a", &a_components, &a_findings);
        let b = snapshot("b", &b_components, &b_findings);

        let forward = compare_snapshots(&a, &b);
        let backward = compare_snapshots(&b, &a);

        prop_assert_eq!(&forward.components.added, &backward.components.removed);
        prop_assert_eq!(&forward.components.removed, &backward.components.added);
        prop_assert_eq!(&forward.findings.new, &backward.findings.resolved);
        prop_assert_eq!(&forward.findings.resolved, &backward.findings.new);
        prop_assert_eq!(&forward.findings.persistent, &backward.findings.persistent);
    }

    #[test]
    fn committed_payload_fetches_unchanged(
        text in ".{0,40}",
        number in any::<i64>(),
        flags in prop::collection::vec(any::<bool>(), 0..5),
        timestamp in "[0-9T:-]{1,20}",
    ) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir);
        let payload = serde_json::json!({"text": text, "n": number, "flags": flags});

        ledger.commit("t", &payload, &timestamp).unwrap();
        let fetched = ledger.fetch_records("t").unwrap();

        prop_assert_eq!(fetched.len(), 1);
        prop_assert_eq!(&fetched[0].payload, &payload);
        prop_assert_eq!(&fetched[0].timestamp, &timestamp);
    }

    #[test]
    fn any_single_byte_change_invalidates(
        position in any::<prop::sample::Index>(),
        replacement in any::<u8>(),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = ledger(&dir);
        ledger.commit("t", &serde_json::json!({"score": 7, "file": "a.py"}), "t1").unwrap();

        let mut bytes = fs::read(ledger.path()).unwrap();
        let line_len = bytes.len() - 1;
        let at = position.index(line_len);
        prop_assume!(replacement != b'\n' && replacement != bytes[at]);
        bytes[at] = replacement;
        fs::write(ledger.path(), &bytes).unwrap();

        prop_assert!(ledger.fetch("t").unwrap().is_empty());
        prop_assert_eq!(ledger.verify().unwrap(), IntegrityReport { total: 1, valid: 0, invalid: 1 });
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn component_map_is_deterministic(
        names in prop::collection::btree_set("[a-z]{1,8}", 1..6),
        nested in any::<bool>(),
    ) {
        let repo = tempfile::tempdir().unwrap();
        for (i, name) in names.iter().enumerate() {
            let body = if nested {
                format!("class K{i}:\n    def {name}(self):\n        if self:\n            return 1\n")
            } else {
                format!("def {name}():\n    for x in range(3):\n        pass\n    return 0\n")
            };
            fs::write(repo.path().join(format!("m{i}.py")), body).unwrap();
        }

        let engine = Engine::new(repo.path(), Config::default());
        let first = engine.generate_component_map();
        let second = engine.generate_component_map();

        prop_assert_eq!(first.coordinates, second.coordinates);
        prop_assert_eq!(first.complexity_vector, second.complexity_vector);
    }
}
