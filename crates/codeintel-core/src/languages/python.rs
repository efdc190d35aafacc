//! Python language analyser.

use tree_sitter::{Language, Node, Tree};

use super::LanguageAnalyser;
use crate::syntax::{ImportAlias, RuleSite, RuleSiteKind, SyntaxNode, SyntaxTree};

pub struct PythonAnalyser;

impl Default for PythonAnalyser {
    fn default() -> Self {
        Self
    }
}

impl PythonAnalyser {
    pub fn new() -> Self {
        Self
    }

    fn text(node: Node, source: &[u8]) -> Option<String> {
        node.utf8_text(source).ok().map(|s| s.to_string())
    }

    fn field_text(node: Node, field: &str, source: &[u8]) -> Option<String> {
        node.child_by_field_name(field)
            .and_then(|n| Self::text(n, source))
    }

    /// Dotted text of a name or an attribute chain rooted in a name.
    fn dotted_name(node: Node, source: &[u8]) -> Option<String> {
        match node.kind() {
            "identifier" | "dotted_name" => Self::text(node, source),
            "attribute" => {
                let object = Self::dotted_name(node.child_by_field_name("object")?, source)?;
                let attr = Self::field_text(node, "attribute", source)?;
                Some(format!("{object}.{attr}"))
            }
            _ => None,
        }
    }

    fn line(node: Node) -> usize {
        node.start_position().row + 1
    }

    fn lower_children(&self, node: Node, source: &[u8]) -> Vec<SyntaxNode> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            out.extend(self.lower_node(child, source));
        }
        out
    }

    fn lower_field(&self, node: Node, field: &str, source: &[u8]) -> Vec<SyntaxNode> {
        match node.child_by_field_name(field) {
            Some(child) => self.lower_node(child, source),
            None => Vec::new(),
        }
    }

    fn lower_node(&self, node: Node, source: &[u8]) -> Vec<SyntaxNode> {
        match node.kind() {
            "class_definition" => self.lower_class(node, source, Vec::new()),
            "function_definition" => self.lower_function(node, source, Vec::new()),
            "decorated_definition" => self.lower_decorated(node, source),
            "call" => {
                let mut children = Vec::new();
                if let Some(function) = node.child_by_field_name("function") {
                    // `a().b()` and `x[0]()` hide calls inside the callee expression.
                    children.extend(self.lower_node(function, source));
                }
                children.extend(self.lower_field(node, "arguments", source));
                vec![SyntaxNode::CallExpr {
                    callee: node
                        .child_by_field_name("function")
                        .and_then(|f| Self::dotted_name(f, source)),
                    line: Self::line(node),
                    children,
                }]
            }
            "import_statement" => vec![SyntaxNode::ImportStmt {
                names: Self::import_names(node, source),
            }],
            "import_from_statement" => {
                let (module, level) = match node.child_by_field_name("module_name") {
                    Some(m) if m.kind() == "relative_import" => {
                        let text = Self::text(m, source).unwrap_or_default();
                        let level = text.chars().take_while(|c| *c == '.').count();
                        let rest = text[level..].trim();
                        (
                            (!rest.is_empty()).then(|| rest.to_string()),
                            level,
                        )
                    }
                    Some(m) => (Self::text(m, source), 0),
                    None => (None, 0),
                };
                let mut names = Self::import_names(node, source);
                let mut cursor = node.walk();
                if node
                    .named_children(&mut cursor)
                    .any(|c| c.kind() == "wildcard_import")
                {
                    names.push(ImportAlias::new("*", None));
                }
                vec![SyntaxNode::ImportFromStmt {
                    module,
                    level,
                    names,
                }]
            }
            "future_import_statement" => vec![SyntaxNode::ImportFromStmt {
                module: Some("__future__".to_string()),
                level: 0,
                names: Self::import_names(node, source),
            }],
            _ => {
                let children = self.lower_children(node, source);
                if children.is_empty() {
                    Vec::new()
                } else {
                    vec![SyntaxNode::Other { children }]
                }
            }
        }
    }

    fn lower_class(
        &self,
        node: Node,
        source: &[u8],
        decorators: Vec<SyntaxNode>,
    ) -> Vec<SyntaxNode> {
        let Some(name) = Self::field_text(node, "name", source) else {
            return self.lower_children(node, source);
        };

        let mut bases = Vec::new();
        let mut children = Vec::new();
        if let Some(superclasses) = node.child_by_field_name("superclasses") {
            let mut cursor = superclasses.walk();
            for arg in superclasses.named_children(&mut cursor) {
                // `metaclass=...` and other keywords are not bases.
                if arg.kind() != "keyword_argument" {
                    if let Some(base) = Self::dotted_name(arg, source) {
                        bases.push(base);
                    }
                }
                children.extend(self.lower_node(arg, source));
            }
        }
        children.extend(self.lower_field(node, "body", source));
        children.extend(decorators);

        vec![SyntaxNode::TypeDef {
            name,
            line: Self::line(node),
            bases,
            children,
        }]
    }

    fn lower_function(
        &self,
        node: Node,
        source: &[u8],
        decorators: Vec<SyntaxNode>,
    ) -> Vec<SyntaxNode> {
        let Some(name) = Self::field_text(node, "name", source) else {
            return self.lower_children(node, source);
        };

        let mut cursor = node.walk();
        let is_async = node.children(&mut cursor).any(|c| c.kind() == "async");

        let mut children = Vec::new();
        for field in ["parameters", "return_type", "body"] {
            children.extend(self.lower_field(node, field, source));
        }
        children.extend(decorators);

        vec![SyntaxNode::FunctionDef {
            name,
            line: Self::line(node),
            is_async,
            children,
        }]
    }

    /// Decorator expressions belong to the definition they decorate.
    fn lower_decorated(&self, node: Node, source: &[u8]) -> Vec<SyntaxNode> {
        let mut decorators = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == "decorator" {
                decorators.extend(self.lower_children(child, source));
            }
        }

        match node.child_by_field_name("definition") {
            Some(def) if def.kind() == "class_definition" => {
                self.lower_class(def, source, decorators)
            }
            Some(def) if def.kind() == "function_definition" => {
                self.lower_function(def, source, decorators)
            }
            _ => decorators,
        }
    }

    fn import_names(node: Node, source: &[u8]) -> Vec<ImportAlias> {
        let mut names = Vec::new();
        let mut cursor = node.walk();
        for child in node.children_by_field_name("name", &mut cursor) {
            match child.kind() {
                "dotted_name" => {
                    if let Some(name) = Self::text(child, source) {
                        names.push(ImportAlias { name, alias: None });
                    }
                }
                "aliased_import" => {
                    if let Some(name) = Self::field_text(child, "name", source) {
                        names.push(ImportAlias {
                            name,
                            alias: Self::field_text(child, "alias", source),
                        });
                    }
                }
                _ => {}
            }
        }
        names
    }

    /// The leading string literal of a module or block, without quotes and
    /// with the common indentation of its continuation lines removed.
    fn docstring(container: Node, source: &[u8]) -> Option<String> {
        let mut cursor = container.walk();
        let first = container
            .named_children(&mut cursor)
            .find(|c| c.kind() != "comment")?;
        if first.kind() != "expression_statement" {
            return None;
        }
        let string = first.named_child(0).filter(|n| n.kind() == "string")?;
        let mut cursor = string.walk();
        let content: String = string
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "string_content")
            .filter_map(|c| c.utf8_text(source).ok())
            .collect();
        dedent(&content)
    }

    /// Docstrings of types and functions plus every `raise` and `assert`,
    /// collected with an explicit cursor so depth costs no stack.
    fn rule_sites(root: Node, source: &[u8]) -> Vec<RuleSite> {
        let mut sites = Vec::new();
        let mut cursor = root.walk();
        loop {
            let node = cursor.node();
            let statement = |kind| {
                Self::text(node, source).map(|text| RuleSite {
                    kind,
                    owner: None,
                    line: Self::line(node),
                    text,
                })
            };
            let site = match node.kind() {
                "raise_statement" => statement(RuleSiteKind::Raise),
                "assert_statement" => statement(RuleSiteKind::Assert),
                "class_definition" | "function_definition" => node
                    .child_by_field_name("body")
                    .and_then(|body| Self::docstring(body, source))
                    .map(|text| RuleSite {
                        kind: RuleSiteKind::Docstring,
                        owner: Self::field_text(node, "name", source),
                        line: Self::line(node),
                        text,
                    }),
                _ => None,
            };
            sites.extend(site);

            if cursor.goto_first_child() {
                continue;
            }
            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return sites;
                }
            }
        }
    }
}

fn dedent(raw: &str) -> Option<String> {
    let mut lines = raw.lines();
    let first = lines.next().unwrap_or_default().trim();
    let rest: Vec<&str> = lines.collect();
    let indent = rest
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out = vec![first];
    out.extend(rest.iter().map(|l| l.get(indent..).unwrap_or_default().trim_end()));
    let text = out.join("\n");
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl LanguageAnalyser for PythonAnalyser {
    fn extensions(&self) -> &[&str] {
        &["py"]
    }

    fn language_name(&self) -> &str {
        "Python"
    }

    fn get_language(&self) -> Language {
        tree_sitter_python::LANGUAGE.into()
    }

    fn lower(&self, tree: &Tree, source: &[u8]) -> SyntaxTree {
        let root = tree.root_node();
        SyntaxTree {
            body: self.lower_children(root, source),
            docstring: Self::docstring(root, source),
            rule_sites: Self::rule_sites(root, source),
        }
    }
}
