//! Phase 1: Walk the source tree and collect analysable files.

use std::path::Path;

use log::debug;
use walkdir::WalkDir;

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::languages::AnalyserRegistry;

/// Default directory names to exclude from analysis.
const DEFAULT_EXCLUDES: &[&str] = &[
    ".git",
    "__pycache__",
    "node_modules",
    ".venv",
    "venv",
    ".env",
    ".tox",
    ".eggs",
    ".mypy_cache",
    ".pytest_cache",
    ".ruff_cache",
    "build",
    "dist",
    "site-packages",
    "target",
];

/// Run the discovery phase: return the `/`-separated path, relative to
/// `repo_path`, of every analysable file, sorted so later phases see a stable order.
pub fn run_discovery_phase(
    config: &AnalysisConfig,
    registry: &AnalyserRegistry,
) -> Result<Vec<String>, AnalysisError> {
    let repo_path = Path::new(&config.repo_path);
    if !repo_path.is_dir() {
        return Err(AnalysisError::RootNotFound(config.repo_path.clone()));
    }

    let exclude_patterns: Vec<&str> = DEFAULT_EXCLUDES
        .iter()
        .copied()
        .chain(config.exclude_patterns.iter().map(|s| s.as_str()))
        .collect();

    let mut files = Vec::new();
    for entry in WalkDir::new(repo_path)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            if exclude_patterns.iter().any(|p| name == *p) {
                return false;
            }
            // Skip hidden directories, except the root itself
            !(e.file_type().is_dir() && name.starts_with('.'))
        })
    {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                debug!("skipping unreadable entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let abs_path = entry.path();
        let rel_path = abs_path
            .strip_prefix(repo_path)
            .unwrap_or(abs_path)
            .to_string_lossy()
            .replace('\\', "/");

        if registry.get_for_path(&rel_path).is_none() {
            continue;
        }

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        if size > config.max_file_size {
            debug!("skipping {rel_path}: {size} bytes exceeds limit");
            continue;
        }

        files.push(rel_path);
    }

    files.sort();
    debug!("discovered {} source files", files.len());
    Ok(files)
}
