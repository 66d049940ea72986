use super::graph::ImportGraph;
use crate::scan::model::Finding;

/// A structural check over the module graph.
pub trait Detector {
    fn name(&self) -> &'static str;
    fn detect(&self, graph: &ImportGraph) -> Vec<Finding>;
}
