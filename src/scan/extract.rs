//! Component extraction over a lowered syntax tree.
//!
//! The walk is stack-passing: each level receives its [`Scope`] by value and
//! returns nothing but what it appends to the extraction, so nesting depth is
//! never shared mutable state.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use super::complexity::{BodyTally, ComplexityRecord};
use super::model::{codes, Component, ComponentKind, Finding, Severity};
use super::syntax::{Definition, SyntaxNode, SyntaxTree};

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedComponent {
    pub component: Component,
    pub file: String,
    /// Qualified symbol, dot-joined across enclosing scopes.
    pub symbol: String,
    pub line: u32,
    pub complexity: ComplexityRecord,
    pub cyclomatic: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hotspot {
    pub component: String,
    pub risk: &'static str,
    pub reason: &'static str,
    pub value: u32,
}

/// A call from a function (by component id) to a name it invokes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Relation {
    pub src: String,
    pub dst: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

pub const CALL_RELATION: &str = "CALL";

#[derive(Debug, Default)]
pub struct Extraction {
    pub components: Vec<ExtractedComponent>,
    pub findings: Vec<Finding>,
    pub hotspots: Vec<Hotspot>,
    /// Sorted by source, then callee.
    pub relations: Vec<Relation>,
    seen_ids: HashSet<String>,
}

/// What one component body contributes, nested definitions excluded.
#[derive(Debug, Default)]
struct Body {
    tally: BodyTally,
    calls: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy)]
struct Scope<'a> {
    file: &'a str,
    /// Enclosing class/function scopes; 0 at module level.
    depth: u32,
    prefix: Option<&'a str>,
}

impl Scope<'_> {
    fn qualify(&self, name: &str) -> String {
        match self.prefix {
            Some(prefix) => format!("{prefix}.{name}"),
            None => name.to_string(),
        }
    }
}

/// Extract the module component and every class/function of one parsed file.
pub fn extract_file(file: &str, module: &str, tree: &SyntaxTree, hotspot_threshold: u32) -> Extraction {
    let mut out = Extraction::default();
    let scope = Scope { file, depth: 0, prefix: None };

    // reserved up front so a top-level symbol named like the module gets the suffix
    let module_id = format!("{file}:{module}");
    out.seen_ids.insert(module_id.clone());

    let mut body = Body::default();
    walk(&tree.body, scope, &mut body, hotspot_threshold, &mut out);

    out.record(module_id, file, module, ComponentKind::Module, 0, 1, tree.content_hash.clone(), &body.tally);
    out.relations.sort();
    out
}

fn walk(nodes: &[SyntaxNode], scope: Scope<'_>, body: &mut Body, threshold: u32, out: &mut Extraction) {
    for node in nodes {
        match node {
            SyntaxNode::Class(def) => definition(ComponentKind::Class, def, scope, threshold, out),
            SyntaxNode::Function(def) => definition(ComponentKind::Function, def, scope, threshold, out),
            SyntaxNode::Branch(children) => {
                body.tally.conditionals += 1;
                walk(children, scope, body, threshold, out);
            }
            SyntaxNode::Loop(children) => {
                body.tally.loops += 1;
                walk(children, scope, body, threshold, out);
            }
            SyntaxNode::Guard(children) => {
                body.tally.guards += 1;
                walk(children, scope, body, threshold, out);
            }
            SyntaxNode::Call(name) => {
                body.calls.insert(name.clone());
            }
            SyntaxNode::Import(_) => {}
        }
    }
}

fn definition(kind: ComponentKind, def: &Definition, scope: Scope<'_>, threshold: u32, out: &mut Extraction) {
    let symbol = scope.qualify(&def.name);
    let inner = Scope {
        file: scope.file,
        depth: scope.depth + 1,
        prefix: Some(&symbol),
    };

    let mut body = Body {
        tally: BodyTally {
            decorators: def.decorators,
            ..BodyTally::default()
        },
        calls: BTreeSet::new(),
    };
    walk(&def.body, inner, &mut body, threshold, out);
    let tally = body.tally;

    let id = out.unique_id(scope.file, &symbol, def.line);
    out.record(id.clone(), scope.file, &symbol, kind, scope.depth, def.line, def.content_hash.clone(), &tally);

    if kind == ComponentKind::Function {
        if let Some(line) = def.terminal_pass {
            out.findings.push(Finding::new(
                codes::DEAD_BRANCH,
                Severity::Warn,
                scope.file,
                Some(line),
                format!("function '{}' ends in a bare pass statement", def.name),
            ));
        }

        out.relations.extend(body.calls.into_iter().map(|callee| Relation {
            src: id.clone(),
            dst: callee,
            kind: CALL_RELATION,
        }));

        let cyclomatic = tally.cyclomatic();
        if cyclomatic >= threshold {
            out.hotspots.push(Hotspot {
                component: id,
                risk: "high",
                reason: "high_cyclomatic_complexity",
                value: cyclomatic,
            });
        }
    }
}

impl Extraction {
    fn unique_id(&mut self, file: &str, symbol: &str, line: u32) -> String {
        let id = format!("{file}:{symbol}");
        if self.seen_ids.insert(id.clone()) {
            return id;
        }

        // conditional redefinitions share a qualified name
        let suffixed = format!("{id}@{line}");
        self.seen_ids.insert(suffixed.clone());
        suffixed
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &mut self,
        id: String,
        file: &str,
        symbol: &str,
        kind: ComponentKind,
        depth: u32,
        line: u32,
        content_hash: String,
        tally: &BodyTally,
    ) {
        let complexity = ComplexityRecord::new(&id, depth, tally);
        self.components.push(ExtractedComponent {
            component: Component {
                id,
                kind,
                depth,
                content_hash,
            },
            file: file.to_string(),
            symbol: symbol.to_string(),
            line,
            complexity,
            cyclomatic: tally.cyclomatic(),
        });
    }
}
