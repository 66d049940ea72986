pub mod collect;
pub mod complexity;
pub mod extract;
pub mod model;
pub mod syntax;

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use extract::{ExtractedComponent, Hotspot, Relation};
use model::{codes, sort_findings, Finding, Severity};
use syntax::PythonParser;

/// Per-file facts the graph detectors need.
#[derive(Debug, Clone, Serialize)]
pub struct ScannedFile {
    pub path: String,
    pub module: String,
    /// Import targets as written, sorted and deduplicated. Empty when parsing failed.
    pub imports: Vec<String>,
    pub parsed: bool,
}

#[derive(Debug, Serialize)]
pub struct ScanResult {
    pub files: Vec<ScannedFile>,
    /// Sorted by component id.
    pub components: Vec<ExtractedComponent>,
    /// Per-file findings: parse failures and dead branches.
    pub findings: Vec<Finding>,
    pub hotspots: Vec<Hotspot>,
    /// Call edges, sorted.
    pub relations: Vec<Relation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resident_memory_bytes: Option<usize>,
}

impl ScanResult {
    pub fn empty() -> Self {
        ScanResult {
            files: Vec::new(),
            components: Vec::new(),
            findings: Vec::new(),
            hotspots: Vec::new(),
            relations: Vec::new(),
            duration_ms: None,
            resident_memory_bytes: None,
        }
    }
}

/// Scan every eligible file under `root`. A file that cannot be read or parsed
/// contributes one CRITICAL finding and nothing else; the pass always completes.
pub fn run(root: &Path, config: &ScanConfig) -> ScanResult {
    let start = std::time::Instant::now();
    let mut result = ScanResult::empty();

    let mut parser = match PythonParser::new() {
        Ok(parser) => parser,
        Err(e) => {
            warn!("python grammar unavailable: {e}");
            return result;
        }
    };

    let files = collect::collect_python_files(root, config);
    info!("scanning {} python files under {}", files.len(), root.display());

    for path in files {
        scan_file(&mut parser, root, &path, config.hotspot_threshold, &mut result);
    }

    result.components.sort_by(|a, b| a.component.id.cmp(&b.component.id));
    result.hotspots.sort_by(|a, b| a.component.cmp(&b.component));
    result.relations.sort();
    sort_findings(&mut result.findings);

    result.duration_ms = Some(start.elapsed().as_millis());
    result.resident_memory_bytes = memory_stats::memory_stats().map(|m| m.physical_mem);
    result
}

/// Read, parse and extract one repository-relative file into `result`.
fn scan_file(
    parser: &mut PythonParser,
    root: &Path,
    path: &str,
    hotspot_threshold: u32,
    result: &mut ScanResult,
) {
    let module = collect::module_identifier(path);
    let mut scanned = ScannedFile {
        path: path.to_string(),
        module: module.clone(),
        imports: Vec::new(),
        parsed: false,
    };

    let source = match std::fs::read(root.join(path)) {
        Ok(source) => source,
        Err(e) => {
            warn!("failed to read {path}: {e}");
            result.findings.push(Finding::new(
                codes::UNREADABLE_FILE,
                Severity::Critical,
                path,
                None,
                format!("file could not be read: {e}"),
            ));
            result.files.push(scanned);
            return;
        }
    };

    match parser.parse(&source) {
        Ok(tree) => {
            let mut imports: Vec<String> = tree
                .imports()
                .into_iter()
                .flat_map(|i| i.targets.iter().cloned())
                .collect();
            imports.sort();
            imports.dedup();

            let extraction = extract::extract_file(path, &module, &tree, hotspot_threshold);
            debug!(
                "{path}: {} components, {} imports",
                extraction.components.len(),
                imports.len()
            );

            scanned.imports = imports;
            scanned.parsed = true;
            result.components.extend(extraction.components);
            result.findings.extend(extraction.findings);
            result.hotspots.extend(extraction.hotspots);
            result.relations.extend(extraction.relations);
        }
        Err(failure) => {
            debug!("{path}: parse failure at line {:?}", failure.line);
            result.findings.push(Finding::new(
                codes::SYNTAX_ERROR,
                Severity::Critical,
                path,
                failure.line,
                format!("{}; fix the syntax so the file can be analyzed", failure.reason),
            ));
        }
    }

    result.files.push(scanned);
}
