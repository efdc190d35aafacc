//! Codeintel CLI: map a Python source tree onto a code graph and write reports.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use codeintel_core::config::AnalysisConfig;
use codeintel_core::output::{load_dump, rerender_reports, write_artifacts};
use codeintel_core::pipeline::{self, ScanOutcome};
use codeintel_core::{EntityKind, RelationshipKind};

#[derive(Parser)]
#[command(
    name = "codeintel",
    about = "Codeintel - Build a graph of modules, types, functions and calls from Python sources"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a source tree and write the graph and reports
    Analyze {
        /// Path to the source tree to analyse
        path: PathBuf,

        /// Directory for the generated artifacts
        #[arg(short, long)]
        output: PathBuf,

        /// Additional directory names to exclude
        #[arg(long)]
        exclude: Vec<String>,

        /// JSON config file; flags override its values
        #[arg(long)]
        config: Option<PathBuf>,

        /// Length of the top-N lists in the reports
        #[arg(long)]
        top: Option<usize>,

        /// Scan files on a single thread
        #[arg(long)]
        sequential: bool,

        /// Show per-phase timing breakdown and debug logs
        #[arg(long)]
        verbose: bool,

        /// Suppress all output except errors
        #[arg(long)]
        quiet: bool,
    },
    /// Re-render the Markdown reports from an existing graph.json
    Report {
        /// Path to a graph.json written by `analyze`
        graph: PathBuf,

        /// Directory for the reports
        #[arg(short, long)]
        output: PathBuf,

        /// Length of the top-N lists in the reports
        #[arg(long, default_value = "10")]
        top: usize,
    },
}

fn init_logging(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if quiet {
        builder.filter_level(log::LevelFilter::Error);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("{context}: {err}");
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            path,
            output,
            exclude,
            config,
            top,
            sequential,
            verbose,
            quiet,
        } => {
            init_logging(verbose, quiet);

            let mut analysis = match config {
                Some(file) => AnalysisConfig::from_file(&file)
                    .unwrap_or_else(|e| fail("Invalid config", e)),
                None => AnalysisConfig::default(),
            };
            let repo_path = path.canonicalize().unwrap_or(path);
            analysis.repo_path = repo_path.to_string_lossy().to_string();
            analysis.output_path = Some(output.to_string_lossy().to_string());
            analysis.exclude_patterns.extend(exclude);
            if let Some(top) = top {
                analysis.top_n = top;
            }
            if sequential {
                analysis.parallel = false;
            }
            analysis.verbose = verbose;
            analysis.quiet = quiet;

            if quiet {
                run_quiet(&analysis, &output);
            } else {
                run_with_progress(&analysis, &output, verbose);
            }
        }
        Commands::Report { graph, output, top } => {
            init_logging(false, false);
            let dump = load_dump(&graph).unwrap_or_else(|e| fail("Cannot load graph", e));
            match rerender_reports(dump, top, &output) {
                Ok(paths) => {
                    for p in paths {
                        println!("  {} {}", style("wrote").green(), p.display());
                    }
                }
                Err(e) => fail("Error writing reports", e),
            }
        }
    }
}

fn run_quiet(config: &AnalysisConfig, output: &Path) {
    match pipeline::run_pipeline(config, None) {
        Ok(outcome) => {
            if let Err(e) = write_artifacts(&outcome, &config.repo_path, config.top_n, output) {
                fail("Error writing output", e);
            }
        }
        Err(e) => fail("Analysis failed", e),
    }
}

fn run_with_progress(config: &AnalysisConfig, output: &Path, verbose: bool) {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message("Initialising...");
    pb.enable_steady_tick(std::time::Duration::from_millis(80));

    let progress: pipeline::ProgressCallback = {
        let pb = pb.clone();
        Box::new(move |_name, label| {
            pb.set_message(label.to_string());
        })
    };

    let start = Instant::now();
    let outcome = match pipeline::run_pipeline(config, Some(progress)) {
        Ok(o) => o,
        Err(e) => {
            pb.finish_and_clear();
            fail("Analysis failed", e);
        }
    };
    pb.finish_and_clear();

    print_summary(config, &outcome, start);

    if verbose {
        println!("\n  Phase Timings:");
        for (phase, secs) in &outcome.timings {
            println!("    {:<14} {:.1}ms", phase, secs * 1000.0);
        }
    }

    if let Err(e) = write_artifacts(&outcome, &config.repo_path, config.top_n, output) {
        fail("Error writing output", e);
    }

    println!(
        "\n  {} {}",
        style("Output written to:").green(),
        output.display()
    );
}

fn print_summary(config: &AnalysisConfig, outcome: &ScanOutcome, start: Instant) {
    let graph = &outcome.graph;
    let diagnostics = &outcome.diagnostics;

    println!(
        "\n{}  Codeintel Analysis: {}",
        style("✓").green().bold(),
        style(
            Path::new(&config.repo_path)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        )
        .bold()
    );
    println!(
        "  {:<14} {} parsed / {} discovered",
        "Files:", diagnostics.files_parsed, diagnostics.files_discovered
    );
    println!("  {:<14} {}", "Modules:", graph.count_entities(EntityKind::Module));
    println!("  {:<14} {}", "Types:", graph.count_entities(EntityKind::Type));
    println!(
        "  {:<14} {}",
        "Functions:",
        graph.count_entities(EntityKind::Function) + graph.count_entities(EntityKind::Method)
    );
    println!(
        "  {:<14} {}",
        "Calls:",
        graph.count_relationships(RelationshipKind::Calls)
    );
    println!(
        "  {:<14} {}",
        "Imports:",
        graph.count_relationships(RelationshipKind::Imports)
    );
    println!(
        "  {:<14} {:.1}%",
        "Resolved:",
        diagnostics.resolution.call_resolution_rate() * 100.0
    );

    let duration = start.elapsed();
    println!(
        "  {:<14} {:.1}ms",
        "Duration:",
        duration.as_secs_f64() * 1000.0
    );

    if !diagnostics.parse_failures.is_empty() {
        println!(
            "\n  {} {} file(s) could not be parsed",
            style("!").yellow().bold(),
            diagnostics.parse_failures.len()
        );
        for failure in &diagnostics.parse_failures {
            println!("    {}: {}", failure.path, failure.message);
        }
    }
}
