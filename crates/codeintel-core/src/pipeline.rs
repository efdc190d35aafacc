//! Sequential phase orchestrator with timing.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::path::Path;
use std::time::Instant;

use log::debug;

use crate::config::{AnalysisConfig, ScanDiagnostics};
use crate::error::AnalysisError;
use crate::graph::code_graph::CodeGraph;
use crate::languages::AnalyserRegistry;
use crate::phases;
use crate::phases::parsing::{ParsedFile, ParsedSources};
use crate::rules::{self, RuleCandidate};

/// Phase labels for progress reporting.
const PHASE_LABELS: &[(&str, &str)] = &[
    ("discovery", "Discovering source files"),
    ("parsing", "Parsing source files"),
    ("definitions", "Registering definitions"),
    ("relationships", "Resolving imports, inheritance and calls"),
];

/// Progress callback type: (phase_name, label).
pub type ProgressCallback = Box<dyn FnMut(&str, &str)>;

/// Everything a finished scan produced.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub graph: CodeGraph,
    /// Module id → module docstring, for modules that have one.
    pub docstrings: BTreeMap<String, String>,
    /// Business-rule candidates from every parsed file.
    pub business_rules: Vec<RuleCandidate>,
    pub diagnostics: ScanDiagnostics,
    /// Phase name → seconds.
    pub timings: BTreeMap<String, f64>,
    pub total_ms: f64,
}

/// State threaded through the phases of one run.
#[derive(Default)]
struct ScanState {
    paths: Vec<String>,
    parsed: Vec<ParsedFile>,
    outcome: ScanOutcome,
}

impl ScanState {
    fn accept_parsed(&mut self, parsed: ParsedSources) {
        let diagnostics = &mut self.outcome.diagnostics;
        diagnostics.files_parsed = parsed.files.len();
        diagnostics.parse_failures = parsed.failures;
        for file in &parsed.files {
            if let Some(doc) = &file.tree.docstring {
                self.outcome
                    .docstrings
                    .insert(file.module_id.clone(), doc.clone());
            }
        }
        self.outcome.business_rules = rules::collect_candidates(&parsed.files);
        self.parsed = parsed.files;
    }
}

/// Type alias for phase function closures to keep signatures readable.
/// The graph-building passes use `E = Infallible`.
type PhaseFn<E> =
    Box<dyn FnOnce(&AnalysisConfig, &AnalyserRegistry, &mut ScanState) -> Result<(), E>>;

fn label_for(name: &str) -> &str {
    PHASE_LABELS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, l)| *l)
        .unwrap_or(name)
}

fn run_phases<E>(
    config: &AnalysisConfig,
    mut state: ScanState,
    phase_fns: Vec<(&str, PhaseFn<E>)>,
    mut progress_callback: Option<ProgressCallback>,
) -> Result<ScanOutcome, E> {
    let registry = AnalyserRegistry::new();
    let total_start = Instant::now();

    for (name, phase_fn) in phase_fns {
        if let Some(ref mut cb) = progress_callback {
            cb(name, label_for(name));
        }

        let start = Instant::now();
        phase_fn(config, &registry, &mut state)?;
        let elapsed = start.elapsed().as_secs_f64();
        debug!("phase {name} finished in {:.1}ms", elapsed * 1000.0);
        state.outcome.timings.insert(name.to_string(), elapsed);
    }

    state.outcome.total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
    Ok(state.outcome)
}

/// The two graph-building passes, shared by both entry points.
fn scan_phases() -> Vec<(&'static str, PhaseFn<Infallible>)> {
    vec![
        (
            "definitions",
            Box::new(|config, _registry, state| {
                let outcome = &mut state.outcome;
                phases::definitions::run_definitions_phase(
                    &mut outcome.graph,
                    &state.parsed,
                    config.parallel,
                    &mut outcome.diagnostics,
                );
                Ok(())
            }),
        ),
        (
            "relationships",
            Box::new(|config, _registry, state| {
                let outcome = &mut state.outcome;
                phases::relationships::run_relationships_phase(
                    &mut outcome.graph,
                    &state.parsed,
                    config.parallel,
                    &mut outcome.diagnostics,
                );
                Ok(())
            }),
        ),
    ]
}

/// Execute the four-phase analysis pipeline over `config.repo_path`.
pub fn run_pipeline(
    config: &AnalysisConfig,
    progress_callback: Option<ProgressCallback>,
) -> Result<ScanOutcome, AnalysisError> {
    let mut phase_fns: Vec<(&str, PhaseFn<AnalysisError>)> = vec![
        (
            "discovery",
            Box::new(|config, registry, state| {
                let files = phases::discovery::run_discovery_phase(config, registry)?;
                state.outcome.diagnostics.files_discovered = files.len();
                state.paths = files;
                Ok(())
            }),
        ),
        (
            "parsing",
            Box::new(|config, registry, state| {
                let parsed = phases::parsing::run_parsing_phase(
                    Path::new(&config.repo_path),
                    &state.paths,
                    registry,
                    config.parallel,
                );
                state.accept_parsed(parsed);
                Ok(())
            }),
        ),
    ];
    for (name, phase_fn) in scan_phases() {
        let phase_fn: PhaseFn<AnalysisError> = Box::new(move |config, registry, state| {
            phase_fn(config, registry, state).map_err(|never| match never {})
        });
        phase_fns.push((name, phase_fn));
    }

    run_phases(config, ScanState::default(), phase_fns, progress_callback)
}

/// Scan in-memory `(relative_path, source)` pairs, skipping discovery.
pub fn scan_sources(sources: &[(String, String)], parallel: bool) -> ScanOutcome {
    let config = AnalysisConfig {
        parallel,
        ..AnalysisConfig::default()
    };
    let registry = AnalyserRegistry::new();

    let mut state = ScanState::default();
    state.outcome.diagnostics.files_discovered = sources.len();

    let start = Instant::now();
    state.accept_parsed(phases::parsing::parse_sources(sources, &registry, parallel));
    let parse_secs = start.elapsed().as_secs_f64();

    let mut outcome = run_phases(&config, state, scan_phases(), None)
        .unwrap_or_else(|never| match never {});
    outcome.timings.insert("parsing".to_string(), parse_secs);
    outcome.total_ms += parse_secs * 1000.0;
    outcome
}
