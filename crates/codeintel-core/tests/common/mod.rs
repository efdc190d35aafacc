//! Shared test helpers for integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use codeintel_core::config::{AnalysisConfig, EntityKind, RelationshipKind};
use codeintel_core::graph::code_graph::CodeGraph;
use codeintel_core::pipeline::{run_pipeline, ScanOutcome};

// ---------------------------------------------------------------------------
// Fixture path resolution
// ---------------------------------------------------------------------------

/// Resolve `tests/fixtures/{name}` relative to the workspace root.
pub fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir)
        .join("../../tests/fixtures")
        .join(name)
        .canonicalize()
        .unwrap_or_else(|_| {
            Path::new(manifest_dir)
                .join("../../tests/fixtures")
                .join(name)
        })
}

// ---------------------------------------------------------------------------
// Scan runners
// ---------------------------------------------------------------------------

pub fn config_for(path: &Path, parallel: bool) -> AnalysisConfig {
    AnalysisConfig {
        repo_path: path.to_string_lossy().to_string(),
        parallel,
        ..Default::default()
    }
}

/// Run the full pipeline on a fixture directory.
pub fn scan_fixture(fixture_name: &str) -> ScanOutcome {
    scan_fixture_with(fixture_name, true)
}

pub fn scan_fixture_with(fixture_name: &str, parallel: bool) -> ScanOutcome {
    let config = config_for(&fixture_path(fixture_name), parallel);
    run_pipeline(&config, None).expect("fixture scan failed")
}

/// Write `(relative_path, contents)` pairs below a fresh temporary directory.
pub fn temp_tree(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for (rel, contents) in files {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create dirs");
        }
        std::fs::write(&path, contents).expect("write file");
    }
    dir
}

// ---------------------------------------------------------------------------
// Extractors from CodeGraph
// ---------------------------------------------------------------------------

/// Sorted ids of every entity of `kind`.
pub fn entity_ids(graph: &CodeGraph, kind: EntityKind) -> Vec<String> {
    graph.entities_of_kind(kind).map(|e| e.id.clone()).collect()
}

/// `(source, target)` pairs of every edge of `kind`, in insertion order.
pub fn edge_pairs(graph: &CodeGraph, kind: RelationshipKind) -> Vec<(String, String)> {
    graph
        .relationships_of_kind(kind)
        .map(|r| (r.source_id.clone(), r.target_id.clone()))
        .collect()
}

pub fn has_edge(graph: &CodeGraph, source: &str, target: &str, kind: RelationshipKind) -> bool {
    graph
        .outgoing(source)
        .iter()
        .any(|r| r.target_id == target && r.kind == kind)
}

pub fn pair(source: &str, target: &str) -> (String, String) {
    (source.to_string(), target.to_string())
}
