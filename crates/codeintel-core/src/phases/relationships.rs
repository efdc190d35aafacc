//! Pass 2: resolve imports, inheritance and calls into edges.

use log::info;
use rayon::prelude::*;

use crate::config::{Relationship, RelationshipKind, ScanDiagnostics};
use crate::graph::code_graph::CodeGraph;
use crate::graph::import_map::ImportMap;
use crate::phases::imports::resolve_imports;
use crate::phases::parsing::ParsedFile;
use crate::phases::{apply_batches, FileBatch};
use crate::syntax::SyntaxNode;

/// Read-only context for walking one file.
struct Resolver<'a> {
    graph: &'a CodeGraph,
    imports: &'a ImportMap,
    module_id: &'a str,
}

impl Resolver<'_> {
    fn visit(&self, nodes: &[SyntaxNode], scope: &mut Vec<String>, batch: &mut FileBatch) {
        for node in nodes {
            match node {
                SyntaxNode::TypeDef {
                    name,
                    bases,
                    children,
                    ..
                } => {
                    let id = format!("{}.{name}", self.current(scope));
                    for base in bases {
                        match self.imports.resolve(base, self.module_id, self.graph) {
                            Some(target) => {
                                batch.relationship(Relationship::new(
                                    &id,
                                    &target,
                                    RelationshipKind::Inherits,
                                ));
                                batch.stats.bases_resolved += 1;
                            }
                            None => batch.stats.bases_unresolved += 1,
                        }
                    }
                    scope.push(id);
                    self.visit(children, scope, batch);
                    scope.pop();
                }
                SyntaxNode::FunctionDef { name, children, .. } => {
                    let id = format!("{}.{name}", self.current(scope));
                    scope.push(id);
                    self.visit(children, scope, batch);
                    scope.pop();
                }
                SyntaxNode::CallExpr {
                    callee, children, ..
                } => {
                    self.record_call(callee.as_deref(), scope, batch);
                    self.visit(children, scope, batch);
                }
                SyntaxNode::Other { children } => self.visit(children, scope, batch),
                SyntaxNode::ImportStmt { .. } | SyntaxNode::ImportFromStmt { .. } => {}
            }
        }
    }

    fn current<'s>(&'s self, scope: &'s [String]) -> &'s str {
        scope.last().map(|s| s.as_str()).unwrap_or(self.module_id)
    }

    /// Only calls that land on a known entity become edges.
    fn record_call(&self, callee: Option<&str>, scope: &[String], batch: &mut FileBatch) {
        let Some(callee) = callee else {
            batch.stats.calls_unresolved += 1;
            return;
        };
        match self.imports.resolve(callee, self.module_id, self.graph) {
            Some(target) if self.graph.has_entity(&target) => {
                batch.relationship(Relationship::new(
                    self.current(scope),
                    &target,
                    RelationshipKind::Calls,
                ));
                batch.stats.calls_resolved += 1;
            }
            Some(_) => batch.stats.calls_external += 1,
            None => batch.stats.calls_unresolved += 1,
        }
    }
}

/// Collect every relationship one file contributes. `graph` must already hold
/// the entities of all files.
pub fn extract_relationships(file: &ParsedFile, graph: &CodeGraph) -> FileBatch {
    let mut batch = FileBatch::default();
    let imports = resolve_imports(&file.tree, &file.module_id, &mut batch);

    let resolver = Resolver {
        graph,
        imports: &imports,
        module_id: &file.module_id,
    };
    let mut scope = vec![file.module_id.clone()];
    resolver.visit(&file.tree.body, &mut scope, &mut batch);
    batch
}

/// Run Pass 2 over every parsed file. Extraction only reads the graph, so it can
/// run in parallel; the resulting batches are applied afterwards in file order.
pub fn run_relationships_phase(
    graph: &mut CodeGraph,
    files: &[ParsedFile],
    parallel: bool,
    diagnostics: &mut ScanDiagnostics,
) {
    let batches: Vec<FileBatch> = {
        let graph: &CodeGraph = graph;
        if parallel {
            files
                .par_iter()
                .map(|f| extract_relationships(f, graph))
                .collect()
        } else {
            files
                .iter()
                .map(|f| extract_relationships(f, graph))
                .collect()
        }
    };
    apply_batches(graph, batches, diagnostics);

    let stats = &diagnostics.resolution;
    info!(
        "resolved {} of {} call sites ({} external), {} bases, {} imports",
        stats.calls_resolved,
        stats.calls_resolved + stats.calls_unresolved + stats.calls_external,
        stats.calls_external,
        stats.bases_resolved,
        stats.imports
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Entity;
    use crate::config::EntityKind;
    use crate::languages::python::PythonAnalyser;
    use crate::languages::LanguageAnalyser;
    use crate::phases::definitions::extract_definitions;

    fn parsed(module_id: &str, source: &str) -> ParsedFile {
        ParsedFile {
            path: format!("{}.py", module_id.replace('.', "/")),
            module_id: module_id.to_string(),
            tree: PythonAnalyser::new().parse(source).unwrap(),
        }
    }

    fn graph_for(files: &[ParsedFile]) -> CodeGraph {
        let mut graph = CodeGraph::new();
        let mut diagnostics = ScanDiagnostics::default();
        apply_batches(
            &mut graph,
            files.iter().map(extract_definitions).collect(),
            &mut diagnostics,
        );
        graph
    }

    fn edges(batch: &FileBatch, kind: RelationshipKind) -> Vec<(String, String)> {
        batch
            .relationships()
            .filter(|r| r.kind == kind)
            .map(|r| (r.source_id.clone(), r.target_id.clone()))
            .collect()
    }

    #[test]
    fn same_file_calls_resolve() {
        let file = parsed(
            "app",
            "def helper():\n    pass\n\ndef a():\n    helper()\n\ndef b():\n    helper()\n    print('x')\n",
        );
        let graph = graph_for(std::slice::from_ref(&file));
        let batch = extract_relationships(&file, &graph);
        assert_eq!(
            edges(&batch, RelationshipKind::Calls),
            vec![
                ("app.a".to_string(), "app.helper".to_string()),
                ("app.b".to_string(), "app.helper".to_string()),
            ]
        );
        assert_eq!(batch.stats.calls_resolved, 2);
        assert_eq!(batch.stats.calls_unresolved, 1);
    }

    #[test]
    fn cross_file_calls_and_external_calls() {
        let utils = parsed("utils", "def helper_func():\n    pass\n");
        let main = parsed(
            "main",
            "import utils\nimport os\n\ndef run():\n    utils.helper_func()\n    utils.missing()\n    os.getcwd()\n",
        );
        let graph = graph_for(&[utils, main.clone()]);
        let batch = extract_relationships(&main, &graph);
        assert_eq!(
            edges(&batch, RelationshipKind::Calls),
            vec![("main.run".to_string(), "utils.helper_func".to_string())]
        );
        assert_eq!(batch.stats.calls_external, 2);
    }

    #[test]
    fn module_level_calls_use_the_module_scope() {
        let file = parsed("m", "def go():\n    pass\n\ngo()\n");
        let graph = graph_for(std::slice::from_ref(&file));
        let batch = extract_relationships(&file, &graph);
        assert_eq!(
            edges(&batch, RelationshipKind::Calls),
            vec![("m".to_string(), "m.go".to_string())]
        );
    }

    #[test]
    fn inheritance_may_dangle() {
        let file = parsed(
            "m",
            "from abc import ABC\n\nclass Local:\n    pass\n\nclass Impl(ABC, Local, mystery.Base):\n    pass\n",
        );
        let graph = graph_for(std::slice::from_ref(&file));
        let batch = extract_relationships(&file, &graph);
        assert_eq!(
            edges(&batch, RelationshipKind::Inherits),
            vec![
                ("m.Impl".to_string(), "abc.ABC".to_string()),
                ("m.Impl".to_string(), "m.Local".to_string()),
            ]
        );
        assert_eq!(batch.stats.bases_unresolved, 1);
    }

    #[test]
    fn self_calls_produce_no_edge() {
        let file = parsed(
            "m",
            "class S:\n    def connect(self):\n        pass\n    def run(self):\n        self.connect()\n",
        );
        let graph = graph_for(std::slice::from_ref(&file));
        let batch = extract_relationships(&file, &graph);
        assert!(edges(&batch, RelationshipKind::Calls).is_empty());
        assert_eq!(batch.stats.calls_unresolved, 1);
    }

    #[test]
    fn class_qualified_calls_resolve_locally() {
        let file = parsed(
            "m",
            "class Factory:\n    def build():\n        pass\n\ndef main():\n    Factory.build()\n    Factory()\n",
        );
        let graph = graph_for(std::slice::from_ref(&file));
        let batch = extract_relationships(&file, &graph);
        assert_eq!(
            edges(&batch, RelationshipKind::Calls),
            vec![
                ("m.main".to_string(), "m.Factory.build".to_string()),
                ("m.main".to_string(), "m.Factory".to_string()),
            ]
        );
    }

    #[test]
    fn phase_applies_edges_for_all_files() {
        let files = vec![
            parsed("base", "class Base:\n    pass\n"),
            parsed("child", "from base import Base\n\nclass Child(Base):\n    pass\n"),
        ];
        let mut graph = graph_for(&files);
        let mut diagnostics = ScanDiagnostics::default();
        run_relationships_phase(&mut graph, &files, true, &mut diagnostics);

        let inherits = graph.outgoing("child.Child");
        assert_eq!(inherits.len(), 1);
        assert_eq!(inherits[0].target_id, "base.Base");
        assert_eq!(diagnostics.resolution.imports, 1);
        assert!(graph.get_entity("base.Base").is_some());
        assert_eq!(
            graph.get_entity("child.Child").map(|e: &Entity| e.kind),
            Some(EntityKind::Type)
        );
    }
}
