//! Layer classification and forbidden-reachability checks.

use std::collections::{BTreeMap, VecDeque};

use super::detector::Detector;
use super::graph::ImportGraph;
use crate::config::{ArchitectureConfig, ForbiddenRule, LayerRule};
use crate::scan::model::{codes, Finding, Severity};

pub const UNKNOWN_LAYER: &str = "unknown";

/// Ordered classification table. A module takes the first layer with a marker
/// equal to one of its dotted path segments.
#[derive(Debug, Clone)]
pub struct LayerTable {
    rules: Vec<LayerRule>,
}

impl LayerTable {
    pub fn new(rules: Vec<LayerRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| LayerRule {
                name: rule.name,
                markers: rule.markers.into_iter().map(|m| m.to_lowercase()).collect(),
            })
            .collect();
        LayerTable { rules }
    }

    pub fn classify(&self, module: &str) -> &str {
        let segments: Vec<String> = module.split('.').map(str::to_lowercase).collect();

        self.rules
            .iter()
            .find(|rule| rule.markers.iter().any(|marker| segments.contains(marker)))
            .map(|rule| rule.name.as_str())
            .unwrap_or(UNKNOWN_LAYER)
    }
}

pub struct ReachabilityGuard {
    layers: LayerTable,
    forbidden: Vec<ForbiddenRule>,
}

impl ReachabilityGuard {
    pub fn new(config: &ArchitectureConfig) -> Self {
        ReachabilityGuard {
            layers: LayerTable::new(config.layers.clone()),
            forbidden: config.forbidden.clone(),
        }
    }

    pub fn layers(&self) -> &LayerTable {
        &self.layers
    }

    /// Breadth-first from `start` to the nearest module tagged `target`, other
    /// than `start` itself. Returns the full path, start first.
    fn first_violation<'g>(&self, graph: &'g ImportGraph, start: &'g str, target: &str) -> Option<Vec<&'g str>> {
        let mut parent: BTreeMap<&'g str, &'g str> = BTreeMap::new();
        let mut queue = VecDeque::from([start]);
        parent.insert(start, start);

        while let Some(current) = queue.pop_front() {
            for next in graph.neighbors(current) {
                if parent.contains_key(next) {
                    continue;
                }
                parent.insert(next, current);

                if self.layers.classify(next) == target {
                    let mut path = vec![next];
                    let mut cursor = next;
                    while cursor != start {
                        cursor = parent[cursor];
                        path.push(cursor);
                    }
                    path.reverse();
                    return Some(path);
                }

                queue.push_back(next);
            }
        }

        None
    }
}

impl Detector for ReachabilityGuard {
    fn name(&self) -> &'static str {
        "reachability"
    }

    fn detect(&self, graph: &ImportGraph) -> Vec<Finding> {
        let mut findings = Vec::new();

        for rule in &self.forbidden {
            for start in graph.modules().filter(|m| self.layers.classify(m) == rule.from) {
                // nearest violation only
                let Some(path) = self.first_violation(graph, start, &rule.to) else { continue };

                findings.push(Finding::new(
                    codes::FORBIDDEN_REACHABILITY,
                    Severity::Error,
                    graph.file_of(start).unwrap_or(start),
                    Some(1),
                    format!(
                        "{} layer reaches {} layer: {}",
                        rule.from,
                        rule.to,
                        path.join(" -> ")
                    ),
                ));
            }
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> ReachabilityGuard {
        ReachabilityGuard::new(&ArchitectureConfig::default())
    }

    #[test]
    fn first_matching_layer_wins() {
        let guard = guard();
        let table = guard.layers();
        assert_eq!(table.classify("app.core.engine"), "core");
        assert_eq!(table.classify("app.core.db"), "core");
        assert_eq!(table.classify("app.storage.files"), "io");
        assert_eq!(table.classify("app.Governance.rules"), "policy");
        assert_eq!(table.classify("app.utils"), UNKNOWN_LAYER);
        assert_eq!(table.classify("app.coreutils"), UNKNOWN_LAYER);
    }

    #[test]
    fn transitive_core_to_io_is_reported_once() {
        let graph = ImportGraph::from_edges([
            ("app.core.engine", "app.helpers"),
            ("app.helpers", "app.db.session"),
            ("app.helpers", "app.io.files"),
        ]);

        let findings = guard().detect(&graph);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, codes::FORBIDDEN_REACHABILITY);
        assert_eq!(findings[0].file, "app/core/engine.py");
        assert!(findings[0]
            .message
            .ends_with("app.core.engine -> app.helpers -> app.db.session"));
    }

    #[test]
    fn one_finding_per_violating_start_module() {
        let graph = ImportGraph::from_edges([
            ("app.core.a", "app.io.x"),
            ("app.core.b", "app.core.a"),
            ("app.policy.p", "app.io.x"),
        ]);

        let findings = guard().detect(&graph);
        let files: Vec<_> = findings.iter().map(|f| f.file.as_str()).collect();
        assert_eq!(files, vec!["app/core/a.py", "app/core/b.py"]);
        assert!(findings[1].message.ends_with("app.core.b -> app.core.a -> app.io.x"));
    }

    #[test]
    fn clean_layering_has_no_findings() {
        let graph = ImportGraph::from_edges([("app.io.x", "app.core.a"), ("app.policy.p", "app.core.a")]);
        assert!(guard().detect(&graph).is_empty());
    }

    #[test]
    fn custom_rules_apply() {
        let config = ArchitectureConfig {
            layers: vec![LayerRule { name: "domain".into(), markers: vec!["Domain".into()] }],
            forbidden: vec![ForbiddenRule { from: "domain".into(), to: UNKNOWN_LAYER.into() }],
        };
        let graph = ImportGraph::from_edges([("shop.domain.cart", "requests_wrapper")]);
        let findings = ReachabilityGuard::new(&config).detect(&graph);
        assert_eq!(findings.len(), 1);
    }
}
