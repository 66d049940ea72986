//! Python syntax trees.
//!
//! tree-sitter produces a concrete tree with a few hundred node kinds. Only a
//! handful matter for structural analysis, so the tree is lowered once into
//! [`SyntaxNode`], a closed set of variants the rest of the crate matches on
//! exhaustively. Node kinds `lower` does not name are transparent: their
//! interesting descendants are spliced into the parent.

use sha2::{Digest, Sha256};
use tree_sitter::{Node, Parser};

use crate::error::{Result, StrataError};

#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxNode {
    Class(Definition),
    Function(Definition),
    /// `if`, each `elif`, and conditional expressions.
    Branch(Vec<SyntaxNode>),
    /// `for`, `while`, and comprehension `for` clauses.
    Loop(Vec<SyntaxNode>),
    /// try / with / boolean operators / match: decision points that are not conditionals.
    Guard(Vec<SyntaxNode>),
    Import(Import),
    /// Callee of `name(..)` or `self.name(..)`; other call shapes are not named.
    Call(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub name: String,
    pub line: u32,
    pub decorators: u32,
    pub body: Vec<SyntaxNode>,
    /// Line of a bare `pass` closing the body, if any.
    pub terminal_pass: Option<u32>,
    pub content_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub line: u32,
    /// Referenced names exactly as written: `import a.b` gives `a.b`,
    /// `from a import b` gives `a` and `a.b`.
    pub targets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTree {
    pub body: Vec<SyntaxNode>,
    pub content_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub line: Option<u32>,
    pub reason: String,
}

impl SyntaxTree {
    /// Every import in the file, nested scopes included, in source order.
    pub fn imports(&self) -> Vec<&Import> {
        fn gather<'a>(nodes: &'a [SyntaxNode], out: &mut Vec<&'a Import>) {
            for node in nodes {
                match node {
                    SyntaxNode::Import(import) => out.push(import),
                    SyntaxNode::Class(def) | SyntaxNode::Function(def) => gather(&def.body, out),
                    SyntaxNode::Branch(children) | SyntaxNode::Loop(children) | SyntaxNode::Guard(children) => {
                        gather(children, out)
                    }
                    SyntaxNode::Call(_) => {}
                }
            }
        }

        let mut out = Vec::new();
        gather(&self.body, &mut out);
        out
    }
}

pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| StrataError::Parser(e.to_string()))?;
        Ok(PythonParser { parser })
    }

    /// Parse one file. Invalid UTF-8 and any ERROR or MISSING node in the tree
    /// make the whole file a failure; no partial tree is returned.
    pub fn parse(&mut self, source: &[u8]) -> std::result::Result<SyntaxTree, ParseFailure> {
        if let Err(e) = std::str::from_utf8(source) {
            return Err(ParseFailure {
                line: None,
                reason: format!("source is not valid utf-8: {e}"),
            });
        }

        let tree = self.parser.parse(source, None).ok_or_else(|| ParseFailure {
            line: None,
            reason: "parser produced no tree".to_string(),
        })?;

        let root = tree.root_node();
        if root.has_error() {
            let line = first_error(root).map(|n| n.start_position().row as u32 + 1);
            return Err(ParseFailure {
                line,
                reason: "invalid syntax".to_string(),
            });
        }

        let mut body = Vec::new();
        lower_children(root, source, &mut body);

        Ok(SyntaxTree {
            body,
            content_hash: content_hash(source),
        })
    }
}

pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error(child) {
            return Some(found);
        }
    }
    None
}

fn lower_children(node: Node, source: &[u8], out: &mut Vec<SyntaxNode>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        lower(child, source, out);
    }
}

fn lowered(node: Node, source: &[u8]) -> Vec<SyntaxNode> {
    let mut out = Vec::new();
    lower_children(node, source, &mut out);
    out
}

fn lower(node: Node, source: &[u8], out: &mut Vec<SyntaxNode>) {
    match node.kind() {
        "class_definition" => out.push(SyntaxNode::Class(definition(node, 0, source))),
        "function_definition" => out.push(SyntaxNode::Function(definition(node, 0, source))),
        "decorated_definition" => {
            let mut cursor = node.walk();
            let decorators = node
                .named_children(&mut cursor)
                .filter(|c| c.kind() == "decorator")
                .count() as u32;

            match node.child_by_field_name("definition") {
                Some(def) if def.kind() == "class_definition" => {
                    out.push(SyntaxNode::Class(definition(def, decorators, source)))
                }
                Some(def) if def.kind() == "function_definition" => {
                    out.push(SyntaxNode::Function(definition(def, decorators, source)))
                }
                Some(def) => lower(def, source, out),
                None => {}
            }
        }
        "if_statement" | "elif_clause" | "conditional_expression" => {
            out.push(SyntaxNode::Branch(lowered(node, source)))
        }
        "for_statement" | "while_statement" | "for_in_clause" => out.push(SyntaxNode::Loop(lowered(node, source))),
        "try_statement" | "with_statement" | "boolean_operator" | "match_statement" => {
            out.push(SyntaxNode::Guard(lowered(node, source)))
        }
        "import_statement" | "import_from_statement" => out.push(SyntaxNode::Import(import(node, source))),
        "call" => {
            if let Some(callee) = callee(node, source) {
                out.push(SyntaxNode::Call(callee));
            }
            lower_children(node, source, out);
        }
        _ => lower_children(node, source, out),
    }
}

fn text<'a>(node: Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or_default()
}

fn callee(call: Node, source: &[u8]) -> Option<String> {
    let function = call.child_by_field_name("function")?;
    match function.kind() {
        "identifier" => Some(text(function, source).to_string()),
        "attribute" => {
            let object = function.child_by_field_name("object")?;
            if object.kind() != "identifier" || text(object, source) != "self" {
                return None;
            }
            let attribute = function.child_by_field_name("attribute")?;
            Some(text(attribute, source).to_string())
        }
        _ => None,
    }
}

fn definition(node: Node, decorators: u32, source: &[u8]) -> Definition {
    let name = node
        .child_by_field_name("name")
        .map(|n| text(n, source).to_string())
        .unwrap_or_else(|| "<anonymous>".to_string());

    let (body, terminal_pass) = match node.child_by_field_name("body") {
        Some(block) => (lowered(block, source), terminal_pass(block)),
        None => (Vec::new(), None),
    };

    Definition {
        name,
        line: node.start_position().row as u32 + 1,
        decorators,
        body,
        terminal_pass,
        content_hash: content_hash(&source[node.byte_range()]),
    }
}

fn terminal_pass(block: Node) -> Option<u32> {
    let mut cursor = block.walk();
    let last = block
        .named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .last()?;

    (last.kind() == "pass_statement").then(|| last.start_position().row as u32 + 1)
}

fn import(node: Node, source: &[u8]) -> Import {
    let mut targets = Vec::new();
    let mut cursor = node.walk();

    let imported_name = |n: Node| -> String {
        match n.kind() {
            "aliased_import" => n
                .child_by_field_name("name")
                .map(|inner| text(inner, source).to_string())
                .unwrap_or_default(),
            _ => text(n, source).to_string(),
        }
    };

    if node.kind() == "import_from_statement" {
        let module = node
            .child_by_field_name("module_name")
            .map(|n| text(n, source).to_string())
            .unwrap_or_default();

        for name in node.children_by_field_name("name", &mut cursor) {
            let name = imported_name(name);
            if !name.is_empty() && !module.is_empty() {
                targets.push(join_module(&module, &name));
            }
        }
        if !module.is_empty() {
            targets.insert(0, module);
        }
    } else {
        for name in node.children_by_field_name("name", &mut cursor) {
            let name = imported_name(name);
            if !name.is_empty() {
                targets.push(name);
            }
        }
    }

    Import {
        line: node.start_position().row as u32 + 1,
        targets,
    }
}

// `from . import x` must give `.x`, not `..x`
fn join_module(module: &str, name: &str) -> String {
    if module.ends_with('.') {
        format!("{module}{name}")
    } else {
        format!("{module}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> SyntaxTree {
        PythonParser::new().unwrap().parse(source.as_bytes()).unwrap()
    }

    fn function(node: &SyntaxNode) -> &Definition {
        match node {
            SyntaxNode::Function(def) => def,
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn lowers_definitions_and_control_flow() {
        let tree = parse(
            "class A:\n    def run(self, xs):\n        for x in xs:\n            if x:\n                return 1\n            elif x is None:\n                pass\n        return 0\n",
        );

        assert_eq!(tree.body.len(), 1);
        let SyntaxNode::Class(class) = &tree.body[0] else { panic!("expected class") };
        assert_eq!(class.name, "A");
        assert_eq!(class.line, 1);

        let run = function(&class.body[0]);
        assert_eq!(run.name, "run");
        assert_eq!(run.line, 2);
        let SyntaxNode::Loop(loop_body) = &run.body[0] else { panic!("expected loop") };
        let SyntaxNode::Branch(branch) = &loop_body[0] else { panic!("expected branch") };
        assert!(matches!(branch[0], SyntaxNode::Branch(_)));
        assert_eq!(run.terminal_pass, None);
    }

    #[test]
    fn counts_decorators() {
        let tree = parse("@a\n@b.c(1)\ndef f():\n    return 1\n");
        let f = function(&tree.body[0]);
        assert_eq!(f.decorators, 2);
        assert_eq!(f.name, "f");
    }

    #[test]
    fn detects_terminal_pass() {
        let tree = parse("def stub():\n    x = 1\n    pass  # todo\n");
        assert_eq!(function(&tree.body[0]).terminal_pass, Some(3));
    }

    #[test]
    fn collects_import_targets() {
        let tree = parse("import os, pkg.io as pio\nfrom pkg import a, b as c\nfrom . import d\n\ndef f():\n    import json\n");
        let targets: Vec<Vec<String>> = tree.imports().iter().map(|i| i.targets.clone()).collect();
        assert_eq!(
            targets,
            vec![
                vec!["os".to_string(), "pkg.io".to_string()],
                vec!["pkg".to_string(), "pkg.a".to_string(), "pkg.b".to_string()],
                vec![".".to_string(), ".d".to_string()],
                vec!["json".to_string()],
            ]
        );
    }

    #[test]
    fn names_plain_and_self_calls_only() {
        let tree = parse("def f(self):\n    g(h(1))\n    self.run()\n    obj.other()\n    make()()\n");
        let f = function(&tree.body[0]);
        let calls: Vec<&str> = f
            .body
            .iter()
            .filter_map(|n| match n {
                SyntaxNode::Call(name) => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(calls, vec!["g", "h", "run", "make"]);
    }

    #[test]
    fn syntax_error_reports_line() {
        let failure = PythonParser::new()
            .unwrap()
            .parse(b"x = 1\ndef oops(:\n    pass\n")
            .unwrap_err();
        assert!(matches!(failure.line, Some(line) if line >= 2), "got {:?}", failure.line);
    }

    #[test]
    fn invalid_utf8_is_a_failure_without_line() {
        let failure = PythonParser::new().unwrap().parse(&[0x78, 0x20, 0xff, 0xfe]).unwrap_err();
        assert_eq!(failure.line, None);
    }

    #[test]
    fn hashes_are_stable_and_content_sensitive() {
        let a = parse("def f():\n    return 1\n");
        let b = parse("def f():\n    return 1\n");
        let c = parse("def f():\n    return 2\n");
        assert_eq!(a.content_hash, b.content_hash);
        assert_ne!(function(&a.body[0]).content_hash, function(&c.body[0]).content_hash);
        assert_eq!(a.content_hash.len(), 64);
    }
}
