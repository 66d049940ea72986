//! Complexity scoring.
//!
//! stage_impact = decorators * 1.5 + conditionals * 1.2 + loops * 1.7
//! depth_weight = 2 ^ max(depth - 5, 0)
//! score        = round(stage_impact * depth_weight, 6)
//!
//! Counts cover a component's own body only; nested classes and functions are
//! scored as components of their own.

use serde::{Deserialize, Serialize};

const DECORATOR_WEIGHT: f64 = 1.5;
const CONDITIONAL_WEIGHT: f64 = 1.2;
const LOOP_WEIGHT: f64 = 1.7;
/// Nesting depth up to which the depth weight stays at 1.
const DEPTH_FREE_LEVELS: u32 = 5;

/// Decision points counted in one component body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BodyTally {
    pub decorators: u32,
    pub conditionals: u32,
    pub loops: u32,
    pub guards: u32,
}

impl BodyTally {
    pub fn stage_impact(&self) -> f64 {
        f64::from(self.decorators) * DECORATOR_WEIGHT
            + f64::from(self.conditionals) * CONDITIONAL_WEIGHT
            + f64::from(self.loops) * LOOP_WEIGHT
    }

    /// McCabe-style estimate used for hotspot detection.
    pub fn cyclomatic(&self) -> u32 {
        1 + self.conditionals + self.loops + self.guards
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityRecord {
    pub component: String,
    pub depth: u32,
    pub stage_impact: f64,
    pub depth_weight: f64,
    pub score: f64,
}

impl ComplexityRecord {
    pub fn new(component: &str, depth: u32, tally: &BodyTally) -> Self {
        let stage_impact = tally.stage_impact();
        let depth_weight = depth_weight(depth);

        ComplexityRecord {
            component: component.to_string(),
            depth,
            stage_impact: round6(stage_impact),
            depth_weight,
            score: round6(stage_impact * depth_weight),
        }
    }
}

pub fn depth_weight(depth: u32) -> f64 {
    let exponent = depth.saturating_sub(DEPTH_FREE_LEVELS).min(i32::MAX as u32) as i32;
    2f64.powi(exponent)
}

pub fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
