//! Core data types and configuration for codeintel analysis.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::AnalysisError;

/// Kind of code construct an entity represents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Module,
    Type,
    Function,
    Method,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Type => "type",
            Self::Function => "function",
            Self::Method => "method",
        }
    }

    /// Functions and methods are the only kinds that can appear on either end of a call.
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function | Self::Method)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a directed relationship between two entity ids.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipKind {
    Defines,
    Calls,
    Inherits,
    Imports,
}

impl RelationshipKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Defines => "defines",
            Self::Calls => "calls",
            Self::Inherits => "inherits",
            Self::Imports => "imports",
        }
    }
}

impl std::fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structural code construct (module, type, function or method).
///
/// `id` is `parent_id + "." + name`; a module's id is the dotted path of its file
/// relative to the analysis root and it has no parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub file_path: String,
    pub line_number: usize,
    pub parent_id: Option<String>,
}

impl Entity {
    pub fn module(id: &str, file_path: &str) -> Self {
        let name = id.rsplit('.').next().unwrap_or(id);
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: EntityKind::Module,
            file_path: file_path.to_string(),
            line_number: 0,
            parent_id: None,
        }
    }

    /// Build a nested entity whose id is derived from its parent.
    pub fn nested(
        parent_id: &str,
        name: &str,
        kind: EntityKind,
        file_path: &str,
        line_number: usize,
    ) -> Self {
        Self {
            id: format!("{parent_id}.{name}"),
            name: name.to_string(),
            kind,
            file_path: file_path.to_string(),
            line_number,
            parent_id: Some(parent_id.to_string()),
        }
    }
}

/// A directed, typed edge. The target may name an entity that is not in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type")]
    pub kind: RelationshipKind,
}

impl Relationship {
    pub fn new(source_id: &str, target_id: &str, kind: RelationshipKind) -> Self {
        Self {
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            kind,
        }
    }
}

/// A file that could not be read or parsed and was skipped for both passes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    pub path: String,
    pub message: String,
}

/// Counters describing how well textual references resolved in Pass 2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionStats {
    /// Calls that resolved to a known entity (one `calls` edge each).
    pub calls_resolved: usize,
    /// Calls whose callee name did not resolve at all (or was not a plain name).
    pub calls_unresolved: usize,
    /// Calls whose name resolved to an id that is not a known entity.
    pub calls_external: usize,
    pub bases_resolved: usize,
    pub bases_unresolved: usize,
    /// `imports` edges emitted.
    pub imports: usize,
}

impl ResolutionStats {
    pub fn merge(&mut self, other: &ResolutionStats) {
        self.calls_resolved += other.calls_resolved;
        self.calls_unresolved += other.calls_unresolved;
        self.calls_external += other.calls_external;
        self.bases_resolved += other.bases_resolved;
        self.bases_unresolved += other.bases_unresolved;
        self.imports += other.imports;
    }

    /// Share of call sites that produced an edge, in `[0, 1]`.
    pub fn call_resolution_rate(&self) -> f64 {
        let total = self.calls_resolved + self.calls_unresolved + self.calls_external;
        if total == 0 {
            0.0
        } else {
            self.calls_resolved as f64 / total as f64
        }
    }
}

/// Quality signals for a scan: what was seen, what was skipped, what did not resolve.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanDiagnostics {
    pub files_discovered: usize,
    pub files_parsed: usize,
    #[serde(default)]
    pub parse_failures: Vec<ParseFailure>,
    /// Entity ids that were registered more than once (last write wins).
    #[serde(default)]
    pub identifier_collisions: Vec<String>,
    #[serde(default)]
    pub resolution: ResolutionStats,
}

/// Configuration for an analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub repo_path: String,
    pub output_path: Option<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub quiet: bool,
}

fn default_max_file_size() -> u64 {
    1_000_000
}
fn default_parallel() -> bool {
    true
}
fn default_top_n() -> usize {
    10
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            repo_path: String::new(),
            output_path: None,
            exclude_patterns: Vec::new(),
            max_file_size: default_max_file_size(),
            parallel: default_parallel(),
            top_n: default_top_n(),
            verbose: false,
            quiet: false,
        }
    }
}

impl AnalysisConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, AnalysisError> {
        let text = std::fs::read_to_string(path).map_err(|source| AnalysisError::Io {
            path: path.to_string_lossy().to_string(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}
