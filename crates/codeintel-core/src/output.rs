//! JSON, DOT and Markdown artifacts written from a scan.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::Utc;
use log::debug;
use petgraph::dot::{Config, Dot};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::{Entity, EntityKind, Relationship, RelationshipKind, ScanDiagnostics};
use crate::error::AnalysisError;
use crate::graph::code_graph::CodeGraph;
use crate::pipeline::ScanOutcome;
use crate::report;
use crate::rules::RuleCandidate;

/// Hotspot lists in `ai_context.json` are cut at this length.
const HOTSPOT_LIMIT: usize = 25;

/// Source root shown when re-rendering a dump that did not record one.
const UNRECORDED_ROOT: &str = "(not recorded)";

/// Totals stored alongside a graph dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpContext {
    pub total_nodes: usize,
    pub total_edges: usize,
}

/// Self-describing serialized form of a scan: the graph plus what the
/// Markdown reports need to be rendered again without the sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDump {
    pub context: DumpContext,
    #[serde(default)]
    pub source_root: String,
    /// Module id → module docstring.
    #[serde(default)]
    pub docstrings: BTreeMap<String, String>,
    #[serde(default)]
    pub diagnostics: Option<ScanDiagnostics>,
    pub nodes: Vec<Entity>,
    pub edges: Vec<Relationship>,
}

impl GraphDump {
    pub fn new(outcome: &ScanOutcome, source_root: &str) -> Self {
        let graph = &outcome.graph;
        Self {
            context: DumpContext {
                total_nodes: graph.entity_count(),
                total_edges: graph.relationship_count(),
            },
            source_root: source_root.to_string(),
            docstrings: outcome.docstrings.clone(),
            diagnostics: Some(outcome.diagnostics.clone()),
            nodes: graph.entities().cloned().collect(),
            edges: graph.relationships().to_vec(),
        }
    }

    /// Rebuild the graph. Edge order is preserved.
    pub fn into_graph(self) -> CodeGraph {
        let mut graph = CodeGraph::new();
        for entity in self.nodes {
            graph.add_entity(entity);
        }
        for rel in self.edges {
            graph.add_relationship(rel);
        }
        graph
    }
}

/// Load a `graph.json` written by [`write_artifacts`].
pub fn load_dump(path: &Path) -> Result<GraphDump, AnalysisError> {
    let text = fs::read_to_string(path).map_err(|source| AnalysisError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Try to get the current git commit hash (first 12 chars).
fn get_commit_hash(repo_path: &str) -> Option<String> {
    Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(repo_path)
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
                Some(hash[..hash.len().min(12)].to_string())
            } else {
                None
            }
        })
}

fn metadata(source_root: &str) -> serde_json::Value {
    json!({
        "source_root": source_root,
        "generated_at": Utc::now().to_rfc3339(),
        "codeintel_version": env!("CARGO_PKG_VERSION"),
        "commit_hash": get_commit_hash(source_root),
    })
}

fn write_text(dir: &Path, name: &str, contents: &str) -> Result<PathBuf, AnalysisError> {
    let path = dir.join(name);
    fs::write(&path, contents).map_err(|source| AnalysisError::Io {
        path: path.display().to_string(),
        source,
    })?;
    debug!("wrote {}", path.display());
    Ok(path)
}

fn write_json(dir: &Path, name: &str, value: &impl Serialize) -> Result<PathBuf, AnalysisError> {
    let text = serde_json::to_string_pretty(value)?;
    write_text(dir, name, &text)
}

fn ensure_dir(dir: &Path) -> Result<(), AnalysisError> {
    fs::create_dir_all(dir).map_err(|source| AnalysisError::Io {
        path: dir.display().to_string(),
        source,
    })
}

/// `entity_map.json`: entities grouped by file plus type → methods.
pub fn entity_map(graph: &CodeGraph, source_root: &str) -> serde_json::Value {
    json!({
        "metadata": metadata(source_root),
        "by_file": report::entities_by_file(graph),
        "type_methods": report::type_methods(graph),
    })
}

/// `call_graph.json`: every call edge plus the call adjacency.
pub fn call_graph(graph: &CodeGraph, source_root: &str) -> serde_json::Value {
    let edges: Vec<&Relationship> = graph
        .relationships_of_kind(RelationshipKind::Calls)
        .collect();
    json!({
        "metadata": metadata(source_root),
        "edges": edges,
        "adjacency": report::calls_adjacency(graph),
    })
}

/// Call graph in Graphviz DOT, one node per id and one edge per distinct pair.
pub fn call_graph_dot(graph: &CodeGraph) -> String {
    let (digraph, _) = graph.to_digraph(RelationshipKind::Calls, false);
    format!("{}", Dot::with_config(&digraph, &[Config::EdgeNoLabel]))
}

/// `ai_context.json`: a compact digest for downstream tooling.
pub fn ai_context(
    graph: &CodeGraph,
    diagnostics: Option<&ScanDiagnostics>,
    source_root: &str,
) -> serde_json::Value {
    let entity_counts: BTreeMap<&str, usize> = [
        EntityKind::Module,
        EntityKind::Type,
        EntityKind::Function,
        EntityKind::Method,
    ]
    .into_iter()
    .map(|kind| (kind.as_str(), graph.count_entities(kind)))
    .collect();

    json!({
        "metadata": metadata(source_root),
        "stats": {
            "total_nodes": graph.entity_count(),
            "total_edges": graph.relationship_count(),
            "entities": entity_counts,
        },
        "hotspots": {
            "most_called": report::most_called(graph, HOTSPOT_LIMIT),
            "top_orchestrators": report::top_orchestrators(graph, HOTSPOT_LIMIT),
            "highest_coupling_modules": report::highest_coupling(graph, HOTSPOT_LIMIT),
            "most_imported": report::most_imported(graph, HOTSPOT_LIMIT),
        },
        "entrypoints": report::entrypoints(graph),
        "imports": report::imports_adjacency(graph),
        "import_cycles": report::import_cycles(graph),
        "diagnostics": diagnostics,
    })
}

/// Write the three Markdown reports. Used by both a fresh scan and a re-render
/// from `graph.json`.
fn write_reports(
    graph: &CodeGraph,
    docstrings: &BTreeMap<String, String>,
    diagnostics: Option<&ScanDiagnostics>,
    source_root: &str,
    top_n: usize,
    dir: &Path,
) -> Result<Vec<PathBuf>, AnalysisError> {
    ensure_dir(dir)?;
    Ok(vec![
        write_text(dir, "summary.md", &report::render_summary(graph, diagnostics, top_n))?,
        write_text(
            dir,
            "dependency_report.md",
            &report::render_dependency_report(graph, source_root, top_n),
        )?,
        write_text(
            dir,
            "domain_overview.md",
            &report::render_domain_overview(graph, docstrings, source_root),
        )?,
    ])
}

/// Re-render the Markdown reports from a loaded dump. Dumps written before the
/// source root was recorded show it as `(not recorded)` and have no docstrings.
pub fn rerender_reports(
    mut dump: GraphDump,
    top_n: usize,
    dir: &Path,
) -> Result<Vec<PathBuf>, AnalysisError> {
    let source_root = match dump.source_root.as_str() {
        "" => UNRECORDED_ROOT.to_string(),
        root => root.to_string(),
    };
    let docstrings = std::mem::take(&mut dump.docstrings);
    let diagnostics = dump.diagnostics.take();
    let graph = dump.into_graph();
    write_reports(&graph, &docstrings, diagnostics.as_ref(), &source_root, top_n, dir)
}

/// `business_rules.json`: every candidate with the scan metadata.
pub fn business_rules(candidates: &[RuleCandidate], source_root: &str) -> serde_json::Value {
    json!({
        "metadata": metadata(source_root),
        "count": candidates.len(),
        "candidates": candidates,
    })
}

/// Write every artifact of a scan into `dir`, creating it if needed.
///
/// Returns the written paths in a fixed order.
pub fn write_artifacts(
    outcome: &ScanOutcome,
    source_root: &str,
    top_n: usize,
    dir: &Path,
) -> Result<Vec<PathBuf>, AnalysisError> {
    ensure_dir(dir)?;
    let graph = &outcome.graph;

    let mut written = vec![
        write_json(dir, "graph.json", &GraphDump::new(outcome, source_root))?,
        write_json(dir, "entities.json", &graph.entities().collect::<Vec<_>>())?,
        write_json(dir, "relationships.json", &graph.relationships())?,
        write_json(dir, "entity_map.json", &entity_map(graph, source_root))?,
        write_json(dir, "call_graph.json", &call_graph(graph, source_root))?,
        write_text(dir, "call_graph.dot", &call_graph_dot(graph))?,
        write_json(
            dir,
            "ai_context.json",
            &ai_context(graph, Some(&outcome.diagnostics), source_root),
        )?,
        write_json(
            dir,
            "business_rules.json",
            &business_rules(&outcome.business_rules, source_root),
        )?,
        write_text(
            dir,
            "business_rules.md",
            &report::render_business_rules(&outcome.business_rules),
        )?,
    ];
    written.extend(write_reports(
        graph,
        &outcome.docstrings,
        Some(&outcome.diagnostics),
        source_root,
        top_n,
        dir,
    )?);
    Ok(written)
}
