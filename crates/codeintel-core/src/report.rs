//! Read-only analytics over a finished [`CodeGraph`] and the Markdown reports
//! rendered from them.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;
use std::sync::LazyLock;

use petgraph::algo::tarjan_scc;
use regex::Regex;

use crate::config::{Entity, EntityKind, RelationshipKind, ScanDiagnostics};
use crate::graph::code_graph::CodeGraph;
use crate::rules::RuleCandidate;

/// `(id, count)` pairs, highest count first, ties broken by id.
pub type Ranking = Vec<(String, usize)>;

/// Source id → sorted distinct targets.
pub type Adjacency = BTreeMap<String, Vec<String>>;

/// Function/method names treated as entry points.
const ENTRYPOINT_NAMES: &[&str] = &["main", "run", "cli", "app"];

/// Adjacency lines in the dependency report list at most this many targets.
const ADJACENCY_PREVIEW: usize = 12;

/// `business_rules.md` lists at most this many candidates.
const BUSINESS_RULE_PREVIEW: usize = 200;

/// Filename heuristics, checked in order. First match wins.
static ROLE_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"util|helper").unwrap(), "utilities/helpers"),
        (Regex::new(r"model|entity|schema").unwrap(), "domain models"),
        (Regex::new(r"service|client|api").unwrap(), "service/integration"),
        (Regex::new(r"main|app|cli|run").unwrap(), "entrypoint"),
    ]
});

fn rank(counts: HashMap<&str, usize>, limit: usize) -> Ranking {
    let mut ranked: Ranking = counts
        .into_iter()
        .map(|(id, count)| (id.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

fn count_sources(graph: &CodeGraph, kind: RelationshipKind, limit: usize) -> Ranking {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for rel in graph.relationships_of_kind(kind) {
        if rel.target_id.is_empty() {
            continue;
        }
        *counts.entry(rel.source_id.as_str()).or_insert(0) += 1;
    }
    rank(counts, limit)
}

/// Call targets by number of call edges pointing at them.
pub fn most_called(graph: &CodeGraph, limit: usize) -> Ranking {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for rel in graph.relationships_of_kind(RelationshipKind::Calls) {
        *counts.entry(rel.target_id.as_str()).or_insert(0) += 1;
    }
    rank(counts, limit)
}

/// Callers by number of outgoing call edges.
pub fn top_orchestrators(graph: &CodeGraph, limit: usize) -> Ranking {
    count_sources(graph, RelationshipKind::Calls, limit)
}

/// Types by number of methods they define.
pub fn largest_types(graph: &CodeGraph, limit: usize) -> Ranking {
    count_sources(graph, RelationshipKind::Defines, limit)
}

/// Modules by number of import edges they emit.
pub fn highest_coupling(graph: &CodeGraph, limit: usize) -> Ranking {
    count_sources(graph, RelationshipKind::Imports, limit)
}

/// Import targets by number of distinct modules importing them.
pub fn most_imported(graph: &CodeGraph, limit: usize) -> Ranking {
    let counts = imports_adjacency(graph).into_values().flatten().fold(
        HashMap::<String, usize>::new(),
        |mut acc, target| {
            *acc.entry(target).or_insert(0) += 1;
            acc
        },
    );
    rank(counts.iter().map(|(k, v)| (k.as_str(), *v)).collect(), limit)
}

fn adjacency(graph: &CodeGraph, kind: RelationshipKind) -> Adjacency {
    let mut adj: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for rel in graph.relationships_of_kind(kind) {
        if rel.target_id.is_empty() {
            continue;
        }
        adj.entry(rel.source_id.clone())
            .or_default()
            .insert(rel.target_id.clone());
    }
    adj.into_iter()
        .map(|(k, v)| (k, v.into_iter().collect()))
        .collect()
}

pub fn calls_adjacency(graph: &CodeGraph) -> Adjacency {
    adjacency(graph, RelationshipKind::Calls)
}

pub fn imports_adjacency(graph: &CodeGraph) -> Adjacency {
    adjacency(graph, RelationshipKind::Imports)
}

/// Type id → sorted method ids, from `defines` edges.
pub fn type_methods(graph: &CodeGraph) -> Adjacency {
    adjacency(graph, RelationshipKind::Defines)
}

/// Groups of scanned modules that import each other in a cycle.
///
/// Each group is sorted; groups are ordered by their first id.
pub fn import_cycles(graph: &CodeGraph) -> Vec<Vec<String>> {
    let (digraph, _) = graph.to_digraph(RelationshipKind::Imports, true);
    let mut cycles: Vec<Vec<String>> = tarjan_scc(&digraph)
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|component| {
            let mut ids: Vec<String> = component
                .into_iter()
                .map(|idx| digraph[idx].clone())
                .collect();
            ids.sort();
            ids
        })
        .collect();
    cycles.sort();
    cycles
}

/// Functions and methods whose name marks them as a likely entry point,
/// ordered by file, line, then name.
pub fn entrypoints(graph: &CodeGraph) -> Vec<&Entity> {
    let mut found: Vec<&Entity> = graph
        .entities()
        .filter(|e| e.kind.is_callable())
        .filter(|e| {
            let name = e.name.to_lowercase();
            ENTRYPOINT_NAMES.contains(&name.as_str()) || name.starts_with("main_")
        })
        .collect();
    found.sort_by(|a, b| {
        a.file_path
            .cmp(&b.file_path)
            .then(a.line_number.cmp(&b.line_number))
            .then_with(|| a.name.cmp(&b.name))
    });
    found
}

/// Guess what a file is for from its name alone.
pub fn likely_role(file_path: &str) -> Option<&'static str> {
    let filename = file_path
        .rsplit('/')
        .next()
        .unwrap_or(file_path)
        .to_lowercase();
    ROLE_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(&filename))
        .map(|(_, role)| *role)
}

/// Entities grouped by file, each group sorted by kind, name, then line.
pub fn entities_by_file(graph: &CodeGraph) -> BTreeMap<String, Vec<&Entity>> {
    let mut by_file: BTreeMap<String, Vec<&Entity>> = BTreeMap::new();
    for entity in graph.entities() {
        by_file
            .entry(entity.file_path.clone())
            .or_default()
            .push(entity);
    }
    for entities in by_file.values_mut() {
        entities.sort_by(|a, b| {
            a.kind
                .as_str()
                .cmp(b.kind.as_str())
                .then_with(|| a.name.cmp(&b.name))
                .then(a.line_number.cmp(&b.line_number))
        });
    }
    by_file
}

pub(crate) fn shorten(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", cut.trim_end())
}

fn push_ranking(out: &mut String, title: &str, ranking: &Ranking, unit: &str) {
    let _ = writeln!(out, "## {title}");
    if ranking.is_empty() {
        let _ = writeln!(out, "- (none)");
    }
    for (id, count) in ranking {
        let _ = writeln!(out, "- `{id}`: {count} {unit}");
    }
    out.push('\n');
}

/// The high-level summary: totals, top-N lists and resolution quality.
pub fn render_summary(graph: &CodeGraph, diagnostics: Option<&ScanDiagnostics>, top_n: usize) -> String {
    let mut out = String::from("# Code Intelligence Report\n\n");

    out.push_str("## High Level Stats\n");
    let _ = writeln!(out, "- Total Nodes: {}", graph.entity_count());
    let _ = writeln!(out, "- Total Edges: {}", graph.relationship_count());
    for kind in [
        EntityKind::Module,
        EntityKind::Type,
        EntityKind::Function,
        EntityKind::Method,
    ] {
        let _ = writeln!(out, "- {}: {}", kind, graph.count_entities(kind));
    }
    for kind in [
        RelationshipKind::Defines,
        RelationshipKind::Calls,
        RelationshipKind::Inherits,
        RelationshipKind::Imports,
    ] {
        let _ = writeln!(out, "- {} edges: {}", kind, graph.count_relationships(kind));
    }
    out.push('\n');

    push_ranking(
        &mut out,
        &format!("Top {top_n} Most Called Functions"),
        &most_called(graph, top_n),
        "calls",
    );
    push_ranking(
        &mut out,
        &format!("Top {top_n} Orchestrators (Functions calling others)"),
        &top_orchestrators(graph, top_n),
        "outgoing calls",
    );
    push_ranking(
        &mut out,
        "Largest Types (by Method count)",
        &largest_types(graph, top_n),
        "methods",
    );
    push_ranking(
        &mut out,
        "Highest Coupling (Modules with most imports)",
        &highest_coupling(graph, top_n),
        "imports",
    );

    if let Some(diagnostics) = diagnostics {
        let stats = &diagnostics.resolution;
        out.push_str("## Resolution Quality\n");
        let _ = writeln!(
            out,
            "- Files: {} discovered, {} parsed, {} failed",
            diagnostics.files_discovered,
            diagnostics.files_parsed,
            diagnostics.parse_failures.len()
        );
        let _ = writeln!(
            out,
            "- Call sites: {} resolved, {} external, {} unresolved ({:.1}% resolved)",
            stats.calls_resolved,
            stats.calls_external,
            stats.calls_unresolved,
            stats.call_resolution_rate() * 100.0
        );
        let _ = writeln!(
            out,
            "- Base classes: {} resolved, {} unresolved",
            stats.bases_resolved, stats.bases_unresolved
        );
        if !diagnostics.identifier_collisions.is_empty() {
            let _ = writeln!(
                out,
                "- Identifier collisions: {}",
                diagnostics.identifier_collisions.len()
            );
        }
        for failure in &diagnostics.parse_failures {
            let _ = writeln!(out, "- Parse failure `{}`: {}", failure.path, failure.message);
        }
        out.push('\n');
    }

    out
}

/// Fan-out, fan-in, cycles and the import adjacency.
pub fn render_dependency_report(graph: &CodeGraph, source_root: &str, top_n: usize) -> String {
    let adj = imports_adjacency(graph);
    let mut fan_out: Ranking = adj.iter().map(|(m, deps)| (m.clone(), deps.len())).collect();
    fan_out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    fan_out.truncate(top_n);

    let mut out = String::from("# Dependency Report\n\n");
    let _ = writeln!(out, "- Source root: {source_root}\n");

    out.push_str("## Top Fan-out (modules importing many others)\n");
    for (module, count) in &fan_out {
        let _ = writeln!(out, "- {module}: {count}");
    }
    out.push('\n');

    out.push_str("## Top Fan-in (modules imported by many others)\n");
    for (module, count) in most_imported(graph, top_n) {
        let _ = writeln!(out, "- {module}: {count}");
    }
    out.push('\n');

    let cycles = import_cycles(graph);
    out.push_str("## Import Cycles\n");
    if cycles.is_empty() {
        out.push_str("- (none)\n");
    }
    for cycle in &cycles {
        let _ = writeln!(out, "- {}", cycle.join(" <-> "));
    }
    out.push('\n');

    out.push_str("## Adjacency (imports)\n");
    for (module, deps) in &adj {
        let shown: Vec<&str> = deps
            .iter()
            .take(ADJACENCY_PREVIEW)
            .map(String::as_str)
            .collect();
        let more = if deps.len() > ADJACENCY_PREVIEW { "…" } else { "" };
        let _ = writeln!(out, "- {module} -> {}{more}", shown.join(", "));
    }

    out
}

/// One section per file: module docstring, entity counts and a role guess.
pub fn render_domain_overview(
    graph: &CodeGraph,
    docstrings: &BTreeMap<String, String>,
    source_root: &str,
) -> String {
    let mut out = String::from("# Domain Overview\n\n");
    let _ = writeln!(out, "- Source root: {source_root}");
    let _ = writeln!(
        out,
        "- Modules analyzed: {}",
        graph.count_entities(EntityKind::Module)
    );
    let _ = writeln!(out, "- Total entities: {}\n", graph.entity_count());

    for (file_path, entities) in entities_by_file(graph) {
        let _ = writeln!(out, "## {file_path}");
        let doc = entities
            .iter()
            .find(|e| e.kind == EntityKind::Module)
            .and_then(|module| docstrings.get(&module.id));
        if let Some(doc) = doc {
            let _ = writeln!(out, "{}", shorten(doc, 400));
        }
        out.push('\n');

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for entity in &entities {
            *counts.entry(entity.kind.as_str()).or_insert(0) += 1;
        }
        let counts: Vec<String> = counts.iter().map(|(k, v)| format!("{k}={v}")).collect();
        let _ = writeln!(out, "- Entities: {}", counts.join(", "));
        if let Some(role) = likely_role(&file_path) {
            let _ = writeln!(out, "- Likely role: {role}");
        }
        out.push('\n');
    }

    out
}

/// Render `business_rules.md`. Evidence is folded onto one line.
pub fn render_business_rules(candidates: &[RuleCandidate]) -> String {
    let mut out = String::from("# Business Rules (Heuristic)\n\n");
    out.push_str(
        "Found by static heuristics: rule-worded docstrings, `raise` and `assert` statements.\n\n",
    );
    if candidates.is_empty() {
        out.push_str("- (none)\n");
        return out;
    }

    for candidate in candidates.iter().take(BUSINESS_RULE_PREVIEW) {
        let evidence: Vec<&str> = candidate.evidence.split_whitespace().collect();
        let _ = writeln!(
            out,
            "- {} ({}:{})",
            candidate.title, candidate.file_path, candidate.line_number
        );
        let _ = writeln!(out, "  - {}", evidence.join(" "));
    }
    if candidates.len() > BUSINESS_RULE_PREVIEW {
        let _ = writeln!(
            out,
            "\n{} more in business_rules.json",
            candidates.len() - BUSINESS_RULE_PREVIEW
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Relationship;
    use pretty_assertions::assert_eq;

    fn graph() -> CodeGraph {
        let mut g = CodeGraph::new();
        for (module, file) in [("a", "a.py"), ("b", "b.py"), ("c", "c.py")] {
            g.add_entity(Entity::module(module, file));
        }
        g.add_entity(Entity::nested("a", "main", EntityKind::Function, "a.py", 3));
        g.add_entity(Entity::nested("b", "helper", EntityKind::Function, "b.py", 1));
        g.add_entity(Entity::nested("b", "Svc", EntityKind::Type, "b.py", 5));
        g.add_entity(Entity::nested("b.Svc", "run", EntityKind::Method, "b.py", 6));

        let edges = [
            ("a", "b", RelationshipKind::Imports),
            ("a", "os", RelationshipKind::Imports),
            ("b", "a", RelationshipKind::Imports),
            ("c", "os", RelationshipKind::Imports),
            ("c", "", RelationshipKind::Imports),
            ("b.Svc", "b.Svc.run", RelationshipKind::Defines),
            ("a.main", "b.helper", RelationshipKind::Calls),
            ("a.main", "b.helper", RelationshipKind::Calls),
            ("b.Svc.run", "b.helper", RelationshipKind::Calls),
            ("a.main", "b.Svc", RelationshipKind::Calls),
        ];
        for (source, target, kind) in edges {
            g.add_relationship(Relationship::new(source, target, kind));
        }
        g
    }

    #[test]
    fn rankings_count_occurrences() {
        let g = graph();
        assert_eq!(
            most_called(&g, 10),
            vec![("b.helper".to_string(), 3), ("b.Svc".to_string(), 1)]
        );
        assert_eq!(
            top_orchestrators(&g, 1),
            vec![("a.main".to_string(), 3)]
        );
        assert_eq!(largest_types(&g, 10), vec![("b.Svc".to_string(), 1)]);
        assert_eq!(
            highest_coupling(&g, 10),
            vec![
                ("a".to_string(), 2),
                ("b".to_string(), 1),
                ("c".to_string(), 1)
            ]
        );
        assert_eq!(
            most_imported(&g, 10),
            vec![
                ("os".to_string(), 2),
                ("a".to_string(), 1),
                ("b".to_string(), 1)
            ]
        );
    }

    #[test]
    fn adjacency_is_sorted_and_distinct() {
        let g = graph();
        let calls = calls_adjacency(&g);
        assert_eq!(calls["a.main"], vec!["b.Svc".to_string(), "b.helper".to_string()]);
        let imports = imports_adjacency(&g);
        assert_eq!(imports["c"], vec!["os".to_string()]);
        assert_eq!(type_methods(&g)["b.Svc"], vec!["b.Svc.run".to_string()]);
    }

    #[test]
    fn cycles_only_cover_scanned_modules() {
        assert_eq!(
            import_cycles(&graph()),
            vec![vec!["a".to_string(), "b".to_string()]]
        );
    }

    #[test]
    fn entrypoints_by_name() {
        let g = graph();
        let ids: Vec<&str> = entrypoints(&g).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a.main", "b.Svc.run"]);
    }

    #[test]
    fn roles_from_filenames() {
        assert_eq!(likely_role("pkg/string_utils.py"), Some("utilities/helpers"));
        assert_eq!(likely_role("models.py"), Some("domain models"));
        assert_eq!(likely_role("billing/api_client.py"), Some("service/integration"));
        assert_eq!(likely_role("__main__.py"), Some("entrypoint"));
        assert_eq!(likely_role("billing/ledger.py"), None);
    }

    #[test]
    fn summary_lists_hotspots() {
        let g = graph();
        let md = render_summary(&g, Some(&ScanDiagnostics::default()), 10);
        assert!(md.starts_with("# Code Intelligence Report\n"));
        assert!(md.contains("- Total Nodes: 7\n"));
        assert!(md.contains("- `b.helper`: 3 calls\n"));
        assert!(md.contains("## Resolution Quality\n"));
    }

    #[test]
    fn dependency_report_sections() {
        let md = render_dependency_report(&graph(), "/src", 20);
        assert!(md.contains("- a <-> b\n"));
        assert!(md.contains("- a -> b, os\n"));
        assert!(md.contains("- os: 2\n"));
    }

    #[test]
    fn domain_overview_uses_docstrings() {
        let mut docs = BTreeMap::new();
        docs.insert("b".to_string(), "Shared helpers.".to_string());
        let md = render_domain_overview(&graph(), &docs, "/src");
        assert!(md.contains("## b.py\nShared helpers.\n"));
        assert!(md.contains("- Entities: function=1, method=1, module=1, type=1\n"));
        assert!(md.contains("- Modules analyzed: 3\n"));
    }

    #[test]
    fn shorten_keeps_short_text() {
        assert_eq!(shorten("  hi  ", 10), "hi");
        assert_eq!(shorten("abcdefghij", 5), "abcd…");
    }

    fn candidate(line: usize, evidence: &str) -> RuleCandidate {
        RuleCandidate {
            id: format!("m:{line}:Exception-based_validation"),
            title: "Exception-based validation".to_string(),
            file_path: "m.py".to_string(),
            line_number: line,
            evidence: evidence.to_string(),
        }
    }

    #[test]
    fn business_rules_fold_evidence_and_cap_the_list() {
        let md = render_business_rules(&[candidate(4, "raise ValueError(\n    'bad'\n)")]);
        assert!(md.contains("- Exception-based validation (m.py:4)\n  - raise ValueError( 'bad' )\n"));

        let many: Vec<RuleCandidate> = (1..=205).map(|l| candidate(l, "raise")).collect();
        let md = render_business_rules(&many);
        assert_eq!(md.matches("- Exception-based validation").count(), 200);
        assert!(md.ends_with("\n5 more in business_rules.json\n"));

        assert!(render_business_rules(&[]).ends_with("- (none)\n"));
    }
}
