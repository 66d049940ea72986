//! Plain terminal tables.
//!
//! Each renderer returns the full text so callers decide where it goes.

use crate::analysis::governance::Issue;
use crate::analysis::ComponentMap;
use crate::scan::model::Finding;
use crate::store::diff::DiffResult;
use crate::store::ledger::IntegrityReport;
use crate::store::snapshot::StoredSnapshot;

pub fn render_component_map(map: &ComponentMap) -> String {
    if map.coordinates.is_empty() {
        return String::from("No components found.\n");
    }

    let mut output = String::new();
    output.push_str(&format!("{:50} {:>5} {:>9} {:>10}\n", "component", "depth", "kind", "score"));
    output.push_str(&"-".repeat(77));
    output.push('\n');

    for (coordinate, record) in map.coordinates.iter().zip(&map.complexity_vector) {
        output.push_str(&format!(
            "{:50} {:>5} {:>9} {:>10.3}\n",
            truncate(&coordinate.x, 50),
            coordinate.y,
            coordinate.kind.as_str(),
            record.score
        ));
    }

    output.push_str(&format!(
        "\n{} components, max depth {}, complexity {:.3}, {} calls\n",
        map.coordinates.len(),
        map.max_depth,
        map.complexity_total,
        map.relations.len()
    ));

    if !map.hotspots.is_empty() {
        output.push_str("\nhotspots:\n");
        for hotspot in &map.hotspots {
            output.push_str(&format!(
                "  [{}] {} ({} {})\n",
                hotspot.risk, hotspot.component, hotspot.reason, hotspot.value
            ));
        }
    }

    output
}

pub fn render_findings(findings: &[Finding]) -> String {
    if findings.is_empty() {
        return String::from("No structural errors.\n");
    }

    let mut output = String::new();
    for finding in findings {
        let location = match finding.line {
            Some(line) => format!("{}:{line}", finding.file),
            None => finding.file.clone(),
        };
        output.push_str(&format!(
            "{:8} {:22} {}  {}\n",
            finding.severity.as_str(),
            finding.code,
            location,
            finding.message
        ));
    }
    output.push_str(&format!("\n{} findings\n", findings.len()));
    output
}

pub fn render_snapshots(snapshots: &[StoredSnapshot]) -> String {
    if snapshots.is_empty() {
        return String::from("No snapshots found. Run 'strata snapshot --id <ID>' to record one.\n");
    }

    let mut output = String::new();
    output.push_str(&format!(
        "{:20} {:26} {:16} {:>10} {:>9}\n",
        "ID", "Timestamp", "Ref", "Components", "Findings"
    ));
    output.push_str(&"-".repeat(85));
    output.push('\n');

    for stored in snapshots {
        let snapshot = &stored.snapshot;
        output.push_str(&format!(
            "{:20} {:26} {:16} {:>10} {:>9}\n",
            truncate(&snapshot.snapshot_id, 20),
            truncate(&stored.timestamp, 26),
            truncate(&snapshot.repo_ref, 16),
            snapshot.components.len(),
            snapshot.findings.len()
        ));
    }
    output
}

pub fn render_diff(diff: &DiffResult) -> String {
    let mut output = String::new();
    output.push_str("Comparing snapshots:\n");
    output.push_str(&format!("  From: {}\n", diff.old_snapshot_id));
    output.push_str(&format!("  To:   {}\n\n", diff.new_snapshot_id));

    let sections: [(&str, &[String]); 6] = [
        ("[+] component", &diff.components.added),
        ("[-] component", &diff.components.removed),
        ("[~] component", &diff.components.changed),
        ("[new] finding", &diff.findings.new),
        ("[resolved] finding", &diff.findings.resolved),
        ("[persistent] finding", &diff.findings.persistent),
    ];

    let mut any = false;
    for (label, items) in sections {
        for item in items {
            output.push_str(&format!("  {label} {item}\n"));
            any = true;
        }
    }
    if !any {
        output.push_str("No changes detected.\n");
    }

    output.push_str(&format!("\nstability: {}\n", diff.stability.as_str()));
    output
}

pub fn render_integrity(report: &IntegrityReport) -> String {
    format!(
        "records: {}\nvalid:   {}\ninvalid: {}\n",
        report.total, report.valid, report.invalid
    )
}

pub fn render_issues(issues: &[Issue]) -> String {
    if issues.is_empty() {
        return String::from("No open issues.\n");
    }

    let mut output = String::new();
    output.push_str(&format!("{:24} {:>6} {:>9} {:>9}  files\n", "code", "score", "severity", "evidence"));
    output.push_str(&"-".repeat(60));
    output.push('\n');
    for issue in issues {
        output.push_str(&format!(
            "{:24} {:>6} {:>9} {:>9}  {}\n",
            issue.code,
            issue.priority_score,
            issue.max_severity.as_str(),
            issue.evidence_count,
            issue.files.join(", ")
        ));
    }
    output
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{truncated}...")
    }
}
