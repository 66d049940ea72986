//! Circular import detection.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::detector::Detector;
use super::graph::ImportGraph;
use crate::scan::model::{codes, Finding, Severity};

pub struct CycleDetector;

impl Detector for CycleDetector {
    fn name(&self) -> &'static str {
        "cycles"
    }

    fn detect(&self, graph: &ImportGraph) -> Vec<Finding> {
        cyclic_modules(graph)
            .into_iter()
            .map(|module| {
                let file = graph.file_of(&module).unwrap_or(&module).to_string();
                Finding::new(
                    codes::CIRCULAR_DEPENDENCY,
                    Severity::Error,
                    &file,
                    Some(1),
                    format!("module '{module}' is part of a circular import chain"),
                )
            })
            .collect()
    }
}

struct Search<'g> {
    graph: &'g ImportGraph,
    next_index: usize,
    index: HashMap<&'g str, usize>,
    low_link: HashMap<&'g str, usize>,
    stack: Vec<&'g str>,
    on_stack: HashSet<&'g str>,
    cyclic: BTreeSet<String>,
}

/// Every module on at least one import cycle, sorted.
///
/// Tarjan's strongly connected components, visiting modules and their imports
/// in sorted order. A module is cyclic when its component has more than one
/// member; self-imports never reach the graph.
pub fn cyclic_modules(graph: &ImportGraph) -> BTreeSet<String> {
    let mut search = Search {
        graph,
        next_index: 0,
        index: HashMap::new(),
        low_link: HashMap::new(),
        stack: Vec::new(),
        on_stack: HashSet::new(),
        cyclic: BTreeSet::new(),
    };

    for module in graph.modules() {
        if !search.index.contains_key(module) {
            search.visit(module);
        }
    }

    search.cyclic
}

impl<'g> Search<'g> {
    fn visit(&mut self, module: &'g str) {
        self.index.insert(module, self.next_index);
        self.low_link.insert(module, self.next_index);
        self.next_index += 1;
        self.stack.push(module);
        self.on_stack.insert(module);

        let graph = self.graph;
        for next in graph.neighbors(module) {
            let reached = match self.index.get(next).copied() {
                Some(index) => self.on_stack.contains(next).then_some(index),
                None => {
                    self.visit(next);
                    self.low_link.get(next).copied()
                }
            };

            if let Some(low) = reached {
                let own = self.low_link.entry(module).or_insert(low);
                *own = (*own).min(low);
            }
        }

        if self.low_link.get(module) != self.index.get(module) {
            return;
        }

        let mut component = Vec::new();
        while let Some(member) = self.stack.pop() {
            self.on_stack.remove(member);
            component.push(member);
            if member == module {
                break;
            }
        }

        if component.len() > 1 {
            self.cyclic.extend(component.into_iter().map(str::to_string));
        }
    }
}
