//! Module dependency graph built from literal import names.
//!
//! An edge A -> B exists when a file of module A imports a name that is
//! exactly B's identifier. Relative imports and re-exports are not resolved.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::scan::ScannedFile;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Dependency {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default)]
pub struct ImportGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
    files: BTreeMap<String, String>,
}

impl ImportGraph {
    pub fn build(files: &[ScannedFile]) -> Self {
        let mut graph = ImportGraph::default();

        for file in files {
            // two files can claim one module (a.py and a/__init__.py); first path wins
            graph.files.entry(file.module.clone()).or_insert_with(|| file.path.clone());
            graph.edges.entry(file.module.clone()).or_default();
        }

        for file in files {
            for target in &file.imports {
                if *target != file.module && graph.files.contains_key(target) {
                    graph
                        .edges
                        .entry(file.module.clone())
                        .or_default()
                        .insert(target.clone());
                }
            }
        }

        graph
    }

    /// Builds a graph straight from module pairs; each module's file is `<module>.py`.
    pub fn from_edges<'a>(edges: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut graph = ImportGraph::default();
        for (from, to) in edges {
            for module in [from, to] {
                graph
                    .files
                    .entry(module.to_string())
                    .or_insert_with(|| format!("{}.py", module.replace('.', "/")));
                graph.edges.entry(module.to_string()).or_default();
            }
            if from != to {
                graph.edges.entry(from.to_string()).or_default().insert(to.to_string());
            }
        }
        graph
    }

    /// All modules, sorted.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    /// Direct imports of `module`, sorted.
    pub fn neighbors(&self, module: &str) -> impl Iterator<Item = &str> {
        self.edges
            .get(module)
            .into_iter()
            .flat_map(|targets| targets.iter().map(String::as_str))
    }

    pub fn file_of(&self, module: &str) -> Option<&str> {
        self.files.get(module).map(String::as_str)
    }

    pub fn dependencies(&self) -> Vec<Dependency> {
        self.edges
            .iter()
            .flat_map(|(from, targets)| {
                targets.iter().map(move |to| Dependency {
                    from: from.clone(),
                    to: to.clone(),
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
