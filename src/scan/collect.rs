//! Enumerates the Python sources a scan pass will analyze.

use std::collections::BTreeSet;
use std::path::{Component as PathComponent, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::ScanConfig;

/// Returns repository-relative, `/`-separated paths, sorted and deduplicated.
pub fn collect_python_files(root: &Path, config: &ScanConfig) -> Vec<String> {
    let mut files = BTreeSet::new();
    let excluded: Vec<String> = config.exclude_dirs.iter().map(|d| d.to_lowercase()).collect();

    if !root.is_dir() {
        warn!("scan root {} is not a directory", root.display());
        return Vec::new();
    }

    for include in &config.include_dirs {
        // absolute or `..` includes stay outside the scan
        if escapes_root(include) {
            warn!("skipping include dir {}: outside scan root", include.display());
            continue;
        }

        let base = root.join(include);
        if !base.is_dir() {
            debug!("skipping include dir {}: not a directory", base.display());
            continue;
        }

        if include
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .any(|part| excluded.contains(&part.to_lowercase()))
        {
            continue;
        }

        let walker = WalkDir::new(&base)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_type().is_dir() || !is_excluded(e.file_name(), &excluded));

        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("py") {
                continue;
            }

            let Some(relative) = relative_posix(root, path) else { continue };

            if !config.include_tests && is_test_path(&relative) {
                continue;
            }

            let size_kb = entry.metadata().map(|m| m.len() as f64 / 1024.0).unwrap_or(0.0);
            if size_kb > config.max_file_kb as f64 {
                debug!("skipping {relative}: {size_kb:.1} KiB exceeds max_file_kb");
                continue;
            }

            files.insert(relative);
        }
    }

    files.into_iter().collect()
}

/// Maps a relative source path to its dotted module identifier.
/// `pkg/mod.py` is `pkg.mod`, `pkg/__init__.py` collapses to `pkg`.
pub fn module_identifier(relative: &str) -> String {
    let stem = relative.strip_suffix(".py").unwrap_or(relative);
    let mut parts: Vec<&str> = stem.split('/').filter(|p| !p.is_empty() && *p != ".").collect();

    if parts.len() > 1 && parts.last() == Some(&"__init__") {
        parts.pop();
    }

    parts.join(".")
}

/// Test code lives under a `test`/`tests` directory or in `test_*.py` / `*_test.py`.
pub fn is_test_path(relative: &str) -> bool {
    let mut parts: Vec<&str> = relative.split('/').collect();
    let name = parts.pop().unwrap_or_default();

    if parts.iter().any(|p| matches!(p.to_lowercase().as_str(), "test" | "tests")) {
        return true;
    }

    name.starts_with("test_") || name.ends_with("_test.py")
}

fn is_excluded(name: &std::ffi::OsStr, excluded: &[String]) -> bool {
    name.to_str()
        .map(|s| excluded.contains(&s.to_lowercase()))
        .unwrap_or(false)
}

fn escapes_root(include: &Path) -> bool {
    include.is_absolute() || include.components().any(|c| matches!(c, PathComponent::ParentDir))
}

fn relative_posix(root: &Path, path: &Path) -> Option<String> {
    let relative: PathBuf = path.strip_prefix(root).ok()?.to_path_buf();
    let parts: Vec<&str> = relative
        .components()
        .filter_map(|c| match c {
            PathComponent::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
