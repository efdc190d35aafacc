//! Pass 1: register module, type, function and method entities.

use log::info;
use rayon::prelude::*;

use crate::config::{Entity, EntityKind, Relationship, RelationshipKind, ScanDiagnostics};
use crate::graph::code_graph::CodeGraph;
use crate::phases::parsing::ParsedFile;
use crate::phases::{apply_batches, FileBatch};
use crate::syntax::SyntaxNode;

/// Enclosing definitions while walking a file; the bottom entry is the module.
struct Scope {
    stack: Vec<(String, EntityKind)>,
}

impl Scope {
    fn new(module_id: &str) -> Self {
        Self {
            stack: vec![(module_id.to_string(), EntityKind::Module)],
        }
    }

    fn current(&self) -> (&str, EntityKind) {
        // The module entry is never popped.
        let (id, kind) = &self.stack[self.stack.len() - 1];
        (id.as_str(), *kind)
    }

    fn push(&mut self, id: String, kind: EntityKind) {
        self.stack.push((id, kind));
    }

    fn pop(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }
}

/// Collect every definition in one file. Types nest, functions nest, and a
/// function whose immediately enclosing scope is a type is a method.
pub fn extract_definitions(file: &ParsedFile) -> FileBatch {
    let mut batch = FileBatch::default();
    batch.entity(Entity::module(&file.module_id, &file.path));

    let mut scope = Scope::new(&file.module_id);
    visit(&file.tree.body, &file.path, &mut scope, &mut batch);
    batch
}

fn visit(nodes: &[SyntaxNode], file_path: &str, scope: &mut Scope, batch: &mut FileBatch) {
    for node in nodes {
        match node {
            SyntaxNode::TypeDef {
                name,
                line,
                children,
                ..
            } => {
                let (parent_id, _) = scope.current();
                let entity = Entity::nested(parent_id, name, EntityKind::Type, file_path, *line);
                let id = entity.id.clone();
                batch.entity(entity);

                scope.push(id, EntityKind::Type);
                visit(children, file_path, scope, batch);
                scope.pop();
            }
            SyntaxNode::FunctionDef {
                name,
                line,
                children,
                ..
            } => {
                let (parent_id, parent_kind) = scope.current();
                let kind = if parent_kind == EntityKind::Type {
                    EntityKind::Method
                } else {
                    EntityKind::Function
                };
                let entity = Entity::nested(parent_id, name, kind, file_path, *line);
                let id = entity.id.clone();
                if kind == EntityKind::Method {
                    batch.relationship(Relationship::new(parent_id, &id, RelationshipKind::Defines));
                }
                batch.entity(entity);

                scope.push(id, kind);
                visit(children, file_path, scope, batch);
                scope.pop();
            }
            SyntaxNode::CallExpr { children, .. } | SyntaxNode::Other { children } => {
                visit(children, file_path, scope, batch);
            }
            SyntaxNode::ImportStmt { .. } | SyntaxNode::ImportFromStmt { .. } => {}
        }
    }
}

/// Run Pass 1 over every parsed file and register the results in `graph`.
pub fn run_definitions_phase(
    graph: &mut CodeGraph,
    files: &[ParsedFile],
    parallel: bool,
    diagnostics: &mut ScanDiagnostics,
) {
    let batches: Vec<FileBatch> = if parallel {
        files.par_iter().map(extract_definitions).collect()
    } else {
        files.iter().map(extract_definitions).collect()
    };

    apply_batches(graph, batches, diagnostics);

    info!(
        "registered {} entities from {} files",
        graph.entity_count(),
        files.len()
    );
}
