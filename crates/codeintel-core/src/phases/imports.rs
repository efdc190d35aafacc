//! Per-file import resolution: build the import map and emit `imports` edges.

use crate::config::{Relationship, RelationshipKind};
use crate::graph::import_map::ImportMap;
use crate::phases::FileBatch;
use crate::syntax::{SyntaxNode, SyntaxTree};

/// Resolve the module path named by a `from` import.
///
/// `level` trailing components are stripped from `current_module_id`; when the
/// module id is too short the base is empty. `module` (if any) is appended.
pub fn resolve_relative_module(current_module_id: &str, level: usize, module: Option<&str>) -> String {
    let mut parts: Vec<&str> = if level == 0 {
        Vec::new()
    } else {
        let segments: Vec<&str> = current_module_id.split('.').collect();
        if segments.len() >= level {
            segments[..segments.len() - level].to_vec()
        } else {
            Vec::new()
        }
    };
    if let Some(module) = module.filter(|m| !m.is_empty()) {
        parts.push(module);
    }
    parts.join(".")
}

/// Join a module path and a name, skipping an empty module path.
fn qualify(module_path: &str, name: &str) -> String {
    if module_path.is_empty() {
        name.to_string()
    } else {
        format!("{module_path}.{name}")
    }
}

/// Walk every import statement in the file (at any depth, in source order),
/// bind local names and record one `imports` edge per imported module.
///
/// `import a, b` yields an edge per module; `from m import x, y` yields one edge to `m`.
pub fn resolve_imports(tree: &SyntaxTree, module_id: &str, batch: &mut FileBatch) -> ImportMap {
    let mut map = ImportMap::new();

    for node in tree.walk() {
        match node {
            SyntaxNode::ImportStmt { names, .. } => {
                for alias in names {
                    map.bind(alias.local_name(), &alias.name);
                    batch.relationship(Relationship::new(
                        module_id,
                        &alias.name,
                        RelationshipKind::Imports,
                    ));
                    batch.stats.imports += 1;
                }
            }
            SyntaxNode::ImportFromStmt {
                module,
                level,
                names,
                ..
            } => {
                let module_path = resolve_relative_module(module_id, *level, module.as_deref());
                for alias in names {
                    map.bind(alias.local_name(), &qualify(&module_path, &alias.name));
                }
                batch.relationship(Relationship::new(
                    module_id,
                    &module_path,
                    RelationshipKind::Imports,
                ));
                batch.stats.imports += 1;
            }
            _ => {}
        }
    }

    map
}
