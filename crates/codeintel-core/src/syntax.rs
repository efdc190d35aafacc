//! Language-neutral syntax tree consumed by both scan passes.
//!
//! Analysers lower their concrete parse trees into this closed set of node
//! kinds. Everything the passes do not care about is either dropped or kept
//! as an [`SyntaxNode::Other`] container so nested definitions and calls stay
//! reachable.

/// One name bound by an import statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportAlias {
    /// Imported name as written (`a.b` in `import a.b`, `x` in `from m import x`).
    pub name: String,
    /// `as` alias, if any.
    pub alias: Option<String>,
}

impl ImportAlias {
    pub fn new(name: &str, alias: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            alias: alias.map(String::from),
        }
    }

    /// The name this import binds in the importing file.
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxNode {
    /// A type (class) definition.
    TypeDef {
        name: String,
        line: usize,
        /// Textual base references (`Base`, `pkg.Base`). Bases that are not plain
        /// dotted names are omitted.
        bases: Vec<String>,
        children: Vec<SyntaxNode>,
    },
    /// A function or method definition; async definitions are identical apart from the flag.
    FunctionDef {
        name: String,
        line: usize,
        is_async: bool,
        children: Vec<SyntaxNode>,
    },
    /// A call. `callee` is the dotted callee text when it is nameable.
    CallExpr {
        callee: Option<String>,
        line: usize,
        children: Vec<SyntaxNode>,
    },
    /// `import a, b.c as d`
    ImportStmt { names: Vec<ImportAlias> },
    /// `from ..pkg import a as b`: `level` counts the leading dots.
    ImportFromStmt {
        module: Option<String>,
        level: usize,
        names: Vec<ImportAlias>,
    },
    /// Any other construct that contains interesting descendants.
    Other { children: Vec<SyntaxNode> },
}

impl SyntaxNode {
    pub fn children(&self) -> &[SyntaxNode] {
        match self {
            SyntaxNode::TypeDef { children, .. }
            | SyntaxNode::FunctionDef { children, .. }
            | SyntaxNode::CallExpr { children, .. }
            | SyntaxNode::Other { children } => children,
            SyntaxNode::ImportStmt { .. } | SyntaxNode::ImportFromStmt { .. } => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSiteKind {
    Docstring,
    Raise,
    Assert,
}

/// A statement that may spell out a business rule. These sit beside the
/// syntax tree because neither scan pass reads them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSite {
    pub kind: RuleSiteKind,
    /// Name of the documented type or function (docstrings only).
    pub owner: Option<String>,
    pub line: usize,
    /// Docstring text, or the source text of the statement.
    pub text: String,
}

/// A lowered source file. The root is the module itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxTree {
    pub body: Vec<SyntaxNode>,
    /// Leading string literal of the module, if any.
    pub docstring: Option<String>,
    /// Type and function docstrings, `raise` and `assert` statements, in source order.
    pub rule_sites: Vec<RuleSite>,
}

impl SyntaxTree {
    /// Pre-order walk over every node in the file.
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: self.body.iter().rev().collect(),
        }
    }
}

/// Pre-order iterator returned by [`SyntaxTree::walk`].
pub struct Walk<'a> {
    stack: Vec<&'a SyntaxNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}
