//! Repository-level analysis: one scan pass, the import graph, and the graph
//! detectors, exposed through [`Engine`].

pub mod cycles;
pub mod detector;
pub mod governance;
pub mod graph;
pub mod layers;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::scan::complexity::{round6, ComplexityRecord};
use crate::scan::extract::{Hotspot, Relation};
use crate::scan::model::{sort_findings, Component, ComponentKind, Finding};
use crate::scan::{self, ScanResult};
use crate::store::snapshot::{Snapshot, SnapshotMetrics};
use cycles::CycleDetector;
use detector::Detector;
use graph::{Dependency, ImportGraph};
use layers::ReachabilityGuard;

/// Position of one component: `x` is the component id, `y` its nesting depth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coordinate {
    pub x: String,
    pub y: u32,
    pub kind: ComponentKind,
    pub file: String,
    pub symbol: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentMap {
    pub coordinates: Vec<Coordinate>,
    pub complexity_vector: Vec<ComplexityRecord>,
    pub max_depth: u32,
    pub complexity_total: f64,
    pub hotspots: Vec<Hotspot>,
    pub relations: Vec<Relation>,
}

/// Everything one scan pass learned about a repository.
pub struct Analysis {
    pub scan: ScanResult,
    pub graph: ImportGraph,
    findings: Vec<Finding>,
}

impl Analysis {
    pub fn component_map(&self) -> ComponentMap {
        let coordinates = self
            .scan
            .components
            .iter()
            .map(|c| Coordinate {
                x: c.component.id.clone(),
                y: c.component.depth,
                kind: c.component.kind,
                file: c.file.clone(),
                symbol: c.symbol.clone(),
                line: c.line,
            })
            .collect();

        let complexity_vector: Vec<ComplexityRecord> =
            self.scan.components.iter().map(|c| c.complexity.clone()).collect();

        ComponentMap {
            coordinates,
            max_depth: self.scan.components.iter().map(|c| c.component.depth).max().unwrap_or(0),
            complexity_total: round6(complexity_vector.iter().map(|r| r.score).sum()),
            complexity_vector,
            hotspots: self.scan.hotspots.clone(),
            relations: self.scan.relations.clone(),
        }
    }

    /// Parse failures, dead branches, cycles and forbidden reachability, sorted.
    pub fn structural_errors(&self) -> &[Finding] {
        &self.findings
    }

    pub fn inventory(&self) -> Vec<Component> {
        self.scan.components.iter().map(|c| c.component.clone()).collect()
    }

    /// File -> sorted class/function symbols, for every file that parsed.
    pub fn execution_tree(&self) -> BTreeMap<String, Vec<String>> {
        let mut tree: BTreeMap<String, Vec<String>> = self
            .scan
            .files
            .iter()
            .filter(|f| f.parsed)
            .map(|f| (f.path.clone(), Vec::new()))
            .collect();

        for c in &self.scan.components {
            if c.component.kind == ComponentKind::Module {
                continue;
            }
            if let Some(symbols) = tree.get_mut(&c.file) {
                symbols.push(c.symbol.clone());
            }
        }

        for symbols in tree.values_mut() {
            symbols.sort();
            symbols.dedup();
        }
        tree
    }

    pub fn dependencies(&self) -> Vec<Dependency> {
        self.graph.dependencies()
    }

    pub fn snapshot(&self, snapshot_id: &str, repo_ref: &str) -> Snapshot {
        let map = self.component_map();
        let components = self.inventory();
        let dependencies = self.dependencies();

        Snapshot {
            snapshot_id: snapshot_id.to_string(),
            repo_ref: repo_ref.to_string(),
            metrics: SnapshotMetrics {
                components_total: components.len(),
                findings_total: self.findings.len(),
                modules_total: self.graph.len(),
                dependencies_total: dependencies.len(),
                max_depth: map.max_depth,
                complexity_total: map.complexity_total,
            },
            components,
            findings: self.findings.clone(),
            dependencies,
            execution_tree: self.execution_tree(),
        }
    }
}

/// Stateless facade: every call re-scans the repository.
pub struct Engine {
    root: PathBuf,
    config: Config,
}

impl Engine {
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        Engine {
            root: root.into(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn analyze(&self) -> Analysis {
        let scan = scan::run(&self.root, &self.config.scan);
        let graph = ImportGraph::build(&scan.files);
        let mut findings = scan.findings.clone();

        let detectors: Vec<Box<dyn Detector>> = vec![
            Box::new(CycleDetector),
            Box::new(ReachabilityGuard::new(&self.config.architecture)),
        ];

        for detector in detectors {
            let detector_start = std::time::Instant::now();
            let found = detector.detect(&graph);
            debug!(
                "{} complete: {} findings, {:.2}ms",
                detector.name(),
                found.len(),
                detector_start.elapsed().as_secs_f64() * 1000.0
            );
            findings.extend(found);
        }

        sort_findings(&mut findings);
        info!(
            "analysis complete: {} components, {} modules, {} findings",
            scan.components.len(),
            graph.len(),
            findings.len()
        );

        Analysis { scan, graph, findings }
    }

    pub fn generate_component_map(&self) -> ComponentMap {
        self.analyze().component_map()
    }

    pub fn detect_structural_errors(&self) -> Vec<Finding> {
        self.analyze().findings
    }

    /// Structural errors restricted to files under `prefix` (a relative path).
    pub fn detect_structural_errors_in(&self, prefix: &str) -> Vec<Finding> {
        let prefix = prefix.trim_end_matches('/');
        self.detect_structural_errors()
            .into_iter()
            .filter(|f| prefix.is_empty() || f.file == prefix || f.file.starts_with(&format!("{prefix}/")))
            .collect()
    }

    pub fn build_component_inventory(&self) -> Vec<Component> {
        self.analyze().inventory()
    }

    pub fn build_execution_tree(&self) -> BTreeMap<String, Vec<String>> {
        self.analyze().execution_tree()
    }

    pub fn capture_snapshot(&self, snapshot_id: &str, repo_ref: &str) -> Snapshot {
        self.analyze().snapshot(snapshot_id, repo_ref)
    }
}
