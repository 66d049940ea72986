//! Turns findings into a prioritized issue backlog.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::scan::model::{Finding, Severity};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub code: String,
    pub priority_score: u32,
    pub max_severity: Severity,
    pub evidence_count: usize,
    pub files: Vec<String>,
}

pub fn severity_weight(severity: Severity) -> u32 {
    match severity {
        Severity::Info => 1,
        Severity::Warn => 3,
        Severity::Error => 8,
        Severity::Critical => 13,
    }
}

/// One issue per finding code; score is the sum of severity weights.
/// Ordered by score, then severity, both descending, then code.
pub fn build_issues(findings: &[Finding]) -> Vec<Issue> {
    let mut grouped: BTreeMap<&str, Vec<&Finding>> = BTreeMap::new();
    for finding in findings {
        grouped.entry(finding.code.as_str()).or_default().push(finding);
    }

    let mut issues: Vec<Issue> = grouped
        .into_iter()
        .map(|(code, entries)| {
            let files: BTreeSet<&str> = entries.iter().map(|f| f.file.as_str()).collect();
            Issue {
                code: code.to_string(),
                priority_score: entries.iter().map(|f| severity_weight(f.severity)).sum(),
                max_severity: entries.iter().map(|f| f.severity).max().unwrap_or(Severity::Info),
                evidence_count: entries.len(),
                files: files.into_iter().map(str::to_string).collect(),
            }
        })
        .collect();

    issues.sort_by(|a, b| {
        b.priority_score
            .cmp(&a.priority_score)
            .then(b.max_severity.cmp(&a.max_severity))
            .then(a.code.cmp(&b.code))
    });
    issues
}
