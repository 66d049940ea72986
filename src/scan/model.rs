use serde::{Deserialize, Serialize};

/// Finding codes emitted by the scanner and the graph detectors.
pub mod codes {
    pub const SYNTAX_ERROR: &str = "SyntaxError";
    pub const UNREADABLE_FILE: &str = "UnreadableFile";
    pub const DEAD_BRANCH: &str = "DeadBranch";
    pub const CIRCULAR_DEPENDENCY: &str = "CircularDependency";
    pub const FORBIDDEN_REACHABILITY: &str = "ForbiddenReachability";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Module,
    Class,
    Function,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Module => "module",
            ComponentKind::Class => "class",
            ComponentKind::Function => "function",
        }
    }
}

/// One analyzed syntactic unit. `id` is `<file>:<symbol>` and unique per scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub kind: ComponentKind,
    pub depth: u32,
    pub content_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warn,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub code: String,
    pub severity: Severity,
    pub file: String,
    pub line: Option<u32>,
    pub message: String,
}

impl Finding {
    pub fn new(code: &str, severity: Severity, file: &str, line: Option<u32>, message: String) -> Self {
        Finding {
            code: code.to_string(),
            severity,
            file: file.to_string(),
            line,
            message,
        }
    }

    /// Identity used when comparing findings across snapshots.
    pub fn key(&self) -> String {
        let line = self.line.map(|l| l.to_string()).unwrap_or_default();
        format!(
            "{}|{}|{}|{}|{}",
            self.code,
            self.severity.as_str(),
            self.file,
            line,
            self.message
        )
    }
}

/// Deterministic report order: file, then line (file-level first), then code.
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| {
        a.file
            .cmp(&b.file)
            .then(a.line.cmp(&b.line))
            .then(a.code.cmp(&b.code))
            .then(a.message.cmp(&b.message))
    });
}
