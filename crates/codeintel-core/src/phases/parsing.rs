//! Phase 2: Read and parse each source file into the neutral syntax model.

use std::path::Path;

use log::{debug, warn};
use rayon::prelude::*;

use crate::config::ParseFailure;
use crate::graph::module_id::module_id_for_path;
use crate::languages::AnalyserRegistry;
use crate::syntax::SyntaxTree;

/// A successfully parsed file, ready for both scan passes.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// Path relative to the analysis root.
    pub path: String,
    pub module_id: String,
    pub tree: SyntaxTree,
}

/// Outcome of the parsing phase. `files` keeps the input order.
#[derive(Debug, Default)]
pub struct ParsedSources {
    pub files: Vec<ParsedFile>,
    pub failures: Vec<ParseFailure>,
}

/// Parse in-memory `(relative_path, source)` pairs.
pub fn parse_sources(
    sources: &[(String, String)],
    registry: &AnalyserRegistry,
    parallel: bool,
) -> ParsedSources {
    let parse_one = |(path, source): &(String, String)| parse_file(path, source, registry);
    let results: Vec<Result<ParsedFile, ParseFailure>> = if parallel {
        sources.par_iter().map(parse_one).collect()
    } else {
        sources.iter().map(parse_one).collect()
    };
    split_results(results)
}

/// Run the parsing phase: read each discovered file below `root` and parse it.
///
/// Unreadable and unparseable files are reported, never fatal.
pub fn run_parsing_phase(
    root: &Path,
    paths: &[String],
    registry: &AnalyserRegistry,
    parallel: bool,
) -> ParsedSources {
    let read_and_parse = |path: &String| -> Result<ParsedFile, ParseFailure> {
        let source = std::fs::read_to_string(root.join(path)).map_err(|e| ParseFailure {
            path: path.clone(),
            message: format!("cannot read file: {e}"),
        })?;
        parse_file(path, &source, registry)
    };
    let results: Vec<Result<ParsedFile, ParseFailure>> = if parallel {
        paths.par_iter().map(read_and_parse).collect()
    } else {
        paths.iter().map(read_and_parse).collect()
    };
    split_results(results)
}

fn parse_file(
    path: &str,
    source: &str,
    registry: &AnalyserRegistry,
) -> Result<ParsedFile, ParseFailure> {
    let analyser = registry.get_for_path(path).ok_or_else(|| ParseFailure {
        path: path.to_string(),
        message: "no analyser for file extension".to_string(),
    })?;
    let tree = analyser.parse(source).map_err(|message| ParseFailure {
        path: path.to_string(),
        message,
    })?;
    debug!("parsed {path} ({} top-level nodes)", tree.body.len());
    Ok(ParsedFile {
        path: path.to_string(),
        module_id: module_id_for_path(path),
        tree,
    })
}

fn split_results(results: Vec<Result<ParsedFile, ParseFailure>>) -> ParsedSources {
    let mut parsed = ParsedSources::default();
    for result in results {
        match result {
            Ok(file) => parsed.files.push(file),
            Err(failure) => {
                warn!("skipping {}: {}", failure.path, failure.message);
                parsed.failures.push(failure);
            }
        }
    }
    parsed
}
