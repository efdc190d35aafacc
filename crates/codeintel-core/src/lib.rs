//! Codeintel Core: static analysis engine that maps a Python source tree onto a
//! graph of modules, types, functions and methods.
//!
//! This crate contains all analysis logic: tree-sitter parsing, the two scan
//! passes (definitions, then imports/inheritance/calls), and the reports and
//! artifacts rendered from the resulting graph and parsed files.

pub mod config;
pub mod error;
pub mod graph;
pub mod languages;
pub mod output;
pub mod phases;
pub mod pipeline;
pub mod report;
pub mod rules;
pub mod syntax;

pub use config::{AnalysisConfig, Entity, EntityKind, Relationship, RelationshipKind};
pub use error::AnalysisError;
pub use graph::code_graph::CodeGraph;
pub use pipeline::{run_pipeline, scan_sources, ScanOutcome};
