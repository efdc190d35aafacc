//! Per-file symbol table: locally bound name → best-effort qualified id.

use std::collections::HashMap;

use crate::graph::code_graph::CodeGraph;

/// Same-file import bindings. Rebuilt for every file, never shared.
///
/// - `import a.b as c` binds `c → a.b`
/// - `from a import b as c` binds `c → a.b`
#[derive(Debug, Clone, Default)]
pub struct ImportMap {
    bindings: HashMap<String, String>,
}

impl ImportMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a local name. A later binding of the same name replaces the earlier one.
    pub fn bind(&mut self, local_name: &str, qualified: &str) {
        self.bindings
            .insert(local_name.to_string(), qualified.to_string());
    }

    pub fn get(&self, local_name: &str) -> Option<&str> {
        self.bindings.get(local_name).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Resolve a dotted textual reference to an entity id. First match wins:
    ///
    /// 1. the whole reference is a bound name
    /// 2. `module_id.reference` is a known entity (same-file definition)
    /// 3. the part before the first dot is a bound name: `bound.rest`
    ///
    /// Step 1 and 3 do not check that the id exists; callers decide whether a
    /// dangling id is acceptable. `None` means unknown/external.
    pub fn resolve(&self, reference: &str, module_id: &str, graph: &CodeGraph) -> Option<String> {
        if reference.is_empty() {
            return None;
        }

        if let Some(bound) = self.get(reference) {
            return Some(bound.to_string());
        }

        let local = format!("{module_id}.{reference}");
        if graph.has_entity(&local) {
            return Some(local);
        }

        let (base, suffix) = reference.split_once('.')?;
        self.get(base).map(|bound| format!("{bound}.{suffix}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Entity, EntityKind};

    fn graph_with(ids: &[&str]) -> CodeGraph {
        let mut g = CodeGraph::new();
        for id in ids {
            let (parent, name) = id.rsplit_once('.').unwrap();
            g.add_entity(Entity::nested(parent, name, EntityKind::Function, "x.py", 1));
        }
        g
    }

    #[test]
    fn exact_alias_wins() {
        let mut map = ImportMap::new();
        map.bind("helper", "utils.helper");
        // Even though a same-named local definition exists, the alias comes first.
        let g = graph_with(&["main.helper"]);
        assert_eq!(
            map.resolve("helper", "main", &g).as_deref(),
            Some("utils.helper")
        );
    }

    #[test]
    fn local_definition_match() {
        let map = ImportMap::new();
        let g = graph_with(&["main.helper"]);
        assert_eq!(map.resolve("helper", "main", &g).as_deref(), Some("main.helper"));
        assert_eq!(map.resolve("other", "main", &g), None);
    }

    #[test]
    fn qualified_local_reference() {
        let map = ImportMap::new();
        let g = graph_with(&["main.Service.build"]);
        assert_eq!(
            map.resolve("Service.build", "main", &g).as_deref(),
            Some("main.Service.build")
        );
    }

    #[test]
    fn prefix_split_match() {
        let mut map = ImportMap::new();
        map.bind("u", "pkg.utils");
        let g = CodeGraph::new();
        assert_eq!(
            map.resolve("u.helper.inner", "main", &g).as_deref(),
            Some("pkg.utils.helper.inner")
        );
    }

    #[test]
    fn self_calls_are_not_special() {
        let map = ImportMap::new();
        let g = graph_with(&["main.Service.connect"]);
        assert_eq!(map.resolve("self.connect", "main", &g), None);
    }

    #[test]
    fn later_binding_replaces_earlier() {
        let mut map = ImportMap::new();
        map.bind("json", "json");
        map.bind("json", "ujson");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("json"), Some("ujson"));
    }

    #[test]
    fn empty_reference_fails() {
        let map = ImportMap::new();
        assert_eq!(map.resolve("", "main", &CodeGraph::new()), None);
    }
}
