//! Language analyser trait and registry.

use std::collections::HashMap;

use tree_sitter::{Language, Node, Parser, Tree};

use crate::syntax::SyntaxTree;

pub mod python;

/// Deepest syntax nesting accepted. Lowering recurses once per level, so this
/// bounds stack use on rayon's worker threads; CPython's own parser limit is
/// of the same order.
pub const MAX_NESTING_DEPTH: usize = 200;

/// Trait that all language analysers implement.
pub trait LanguageAnalyser: Send + Sync {
    /// File extensions this analyser handles (e.g. &["py"]).
    fn extensions(&self) -> &[&str];

    /// Human-readable language name (e.g. "Python").
    fn language_name(&self) -> &str;

    /// Get the tree-sitter Language for parsing.
    fn get_language(&self) -> Language;

    /// Lower a parsed tree into the language-neutral syntax model. Recursive:
    /// callers go through [`LanguageAnalyser::parse`], which bounds the depth.
    fn lower(&self, tree: &Tree, source: &[u8]) -> SyntaxTree;

    /// Parse and lower a whole file. A tree that contains syntax errors or
    /// nests deeper than [`MAX_NESTING_DEPTH`] is rejected.
    fn parse(&self, source: &str) -> Result<SyntaxTree, String> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.get_language())
            .map_err(|e| format!("cannot load {} grammar: {e}", self.language_name()))?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| "parser returned no tree".to_string())?;
        let root = tree.root_node();
        if root.has_error() {
            return Err(describe_syntax_error(root));
        }
        if let Some(line) = first_line_deeper_than(root, MAX_NESTING_DEPTH) {
            return Err(format!(
                "nesting deeper than {MAX_NESTING_DEPTH} levels at line {line}"
            ));
        }
        Ok(self.lower(&tree, source.as_bytes()))
    }
}

/// Line of the first node more than `limit` levels below `root`. Iterative.
fn first_line_deeper_than(root: Node, limit: usize) -> Option<usize> {
    let mut cursor = root.walk();
    let mut depth = 0;
    loop {
        if depth > limit {
            return Some(cursor.node().start_position().row + 1);
        }
        if cursor.goto_first_child() {
            depth += 1;
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return None;
            }
            depth -= 1;
        }
    }
}

/// Point at the first ERROR or MISSING node below `root`.
fn describe_syntax_error(root: Node) -> String {
    let mut cursor = root.walk();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let pos = node.start_position();
            let what = if node.is_missing() {
                format!("missing `{}`", node.kind())
            } else {
                "invalid syntax".to_string()
            };
            return format!("{what} at line {}, column {}", pos.row + 1, pos.column + 1);
        }
        if node.has_error() {
            let children: Vec<Node> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    "invalid syntax".to_string()
}

/// Registry mapping file extensions to analysers.
pub struct AnalyserRegistry {
    analysers: Vec<Box<dyn LanguageAnalyser>>,
    extension_map: HashMap<String, usize>,
}

impl AnalyserRegistry {
    /// Build the registry with all available language analysers.
    pub fn new() -> Self {
        let analysers: Vec<Box<dyn LanguageAnalyser>> =
            vec![Box::new(python::PythonAnalyser::new())];

        let mut extension_map = HashMap::new();
        for (i, analyser) in analysers.iter().enumerate() {
            for ext in analyser.extensions() {
                extension_map.insert(ext.to_string(), i);
            }
        }

        Self {
            analysers,
            extension_map,
        }
    }

    /// Get the analyser for a given file extension, if one exists.
    pub fn get_by_extension(&self, ext: &str) -> Option<&dyn LanguageAnalyser> {
        self.extension_map
            .get(ext)
            .map(|&i| self.analysers[i].as_ref())
    }

    /// Get the analyser for a path by looking at its extension.
    pub fn get_for_path(&self, path: &str) -> Option<&dyn LanguageAnalyser> {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        let (_, ext) = file_name.rsplit_once('.')?;
        self.get_by_extension(ext)
    }
}

impl Default for AnalyserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn python_registered_for_py_only() {
        let registry = AnalyserRegistry::new();
        let python = registry.get_by_extension("py").map(|a| a.language_name());
        assert_eq!(python, Some("Python"));
        assert!(registry.get_by_extension("pyi").is_none());
        assert!(registry.get_by_extension("rs").is_none());
    }

    #[test]
    fn lookup_by_path() {
        let registry = AnalyserRegistry::new();
        assert!(registry.get_for_path("pkg/mod.py").is_some());
        assert!(registry.get_for_path("pkg.d/README").is_none());
        assert!(registry.get_for_path("Makefile").is_none());
    }

    #[test]
    fn syntax_errors_are_reported_with_position() {
        let registry = AnalyserRegistry::new();
        let analyser = registry.get_by_extension("py").unwrap();
        let err = analyser.parse("def ok():\n    pass\n\ndef broken(:\n    return\n").unwrap_err();
        assert!(err.contains("line"), "unexpected message: {err}");
    }

    #[test]
    fn deep_nesting_is_a_failure_not_a_crash() {
        let registry = AnalyserRegistry::new();
        let analyser = registry.get_by_extension("py").unwrap();
        let nested = |n: usize| format!("x = {}{}\n", "[".repeat(n), "]".repeat(n));

        assert!(analyser.parse(&nested(50)).is_ok());
        let err = analyser.parse(&nested(3000)).unwrap_err();
        assert_eq!(err, "nesting deeper than 200 levels at line 1");
    }
}
