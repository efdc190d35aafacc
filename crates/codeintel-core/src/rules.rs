//! Heuristic business-rule candidates.
//!
//! A candidate is a type or function docstring that uses rule vocabulary
//! ("must", "only if", ...), or any `raise` or `assert` statement. Nothing here
//! touches the graph; candidates come straight from the parsed files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::phases::parsing::ParsedFile;
use crate::report::shorten;
use crate::syntax::{RuleSite, RuleSiteKind};

/// Lower-case fragments that mark a docstring as stating a rule.
const RULE_KEYWORDS: &[&str] = &[
    "must",
    "should",
    "shall",
    "rule",
    "validate",
    "validation",
    "policy",
    "require",
    "required",
    "forbid",
    "forbidden",
    "ensure",
    "guarantee",
    "only if",
    "unless",
];

const EVIDENCE_CHARS: usize = 320;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCandidate {
    /// `module:line:title` with spaces replaced by underscores.
    pub id: String,
    pub title: String,
    pub file_path: String,
    pub line_number: usize,
    pub evidence: String,
}

fn title_for(site: &RuleSite) -> Option<String> {
    match site.kind {
        RuleSiteKind::Docstring => {
            let text = site.text.to_lowercase();
            RULE_KEYWORDS.iter().any(|k| text.contains(k)).then(|| {
                let owner = site.owner.as_deref().unwrap_or("module");
                format!("Docstring rule in {owner}")
            })
        }
        RuleSiteKind::Raise => Some("Exception-based validation".to_string()),
        RuleSiteKind::Assert => Some("Assertion-based invariant".to_string()),
    }
}

/// Candidates from one file, in source order.
pub fn file_candidates(file: &ParsedFile) -> Vec<RuleCandidate> {
    file.tree
        .rule_sites
        .iter()
        .filter_map(|site| {
            let title = title_for(site)?;
            Some(RuleCandidate {
                id: format!("{}:{}:{}", file.module_id, site.line, title).replace(' ', "_"),
                title,
                file_path: file.path.clone(),
                line_number: site.line,
                evidence: shorten(&site.text, EVIDENCE_CHARS),
            })
        })
        .collect()
}

/// Candidates from every file, one per `(file, line, title)` (the last one
/// seen wins), sorted by that key.
pub fn collect_candidates(files: &[ParsedFile]) -> Vec<RuleCandidate> {
    let mut unique: BTreeMap<(String, usize, String), RuleCandidate> = BTreeMap::new();
    for candidate in files.iter().flat_map(file_candidates) {
        let key = (
            candidate.file_path.clone(),
            candidate.line_number,
            candidate.title.clone(),
        );
        unique.insert(key, candidate);
    }
    unique.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::python::PythonAnalyser;
    use crate::languages::LanguageAnalyser;
    use pretty_assertions::assert_eq;

    fn parsed(path: &str, module_id: &str, source: &str) -> ParsedFile {
        ParsedFile {
            path: path.to_string(),
            module_id: module_id.to_string(),
            tree: PythonAnalyser::new().parse(source).unwrap(),
        }
    }

    fn titles(candidates: &[RuleCandidate]) -> Vec<(usize, &str)> {
        candidates
            .iter()
            .map(|c| (c.line_number, c.title.as_str()))
            .collect()
    }

    #[test]
    fn only_rule_worded_docstrings_count() {
        let file = parsed(
            "billing.py",
            "billing",
            "class Invoice:\n    \"\"\"An invoice. Totals MUST stay positive.\"\"\"\n\n    def render(self):\n        \"\"\"Pretty print.\"\"\"\n        return ''\n",
        );
        let candidates = file_candidates(&file);
        assert_eq!(titles(&candidates), vec![(1, "Docstring rule in Invoice")]);
        assert_eq!(candidates[0].id, "billing:1:Docstring_rule_in_Invoice");
        assert_eq!(candidates[0].evidence, "An invoice. Totals MUST stay positive.");
    }

    #[test]
    fn raises_and_asserts_are_always_candidates() {
        let file = parsed(
            "pay.py",
            "pay",
            "def pay(amount):\n    assert amount >= 0\n    if amount > 100:\n        raise ValueError('over limit')\n",
        );
        let candidates = file_candidates(&file);
        assert_eq!(
            titles(&candidates),
            vec![
                (2, "Assertion-based invariant"),
                (4, "Exception-based validation"),
            ]
        );
        assert_eq!(candidates[1].evidence, "raise ValueError('over limit')");
        assert_eq!(candidates[1].file_path, "pay.py");
    }

    #[test]
    fn same_line_and_title_is_reported_once() {
        let file = parsed(
            "guard.py",
            "guard",
            "def check(x):\n    if x: raise KeyError(x)\n    raise ValueError(x) if x else TypeError(x)\n",
        );
        let twice = vec![file.clone(), file];
        let candidates = collect_candidates(&twice);
        assert_eq!(
            titles(&candidates),
            vec![
                (2, "Exception-based validation"),
                (3, "Exception-based validation"),
            ]
        );
    }

    #[test]
    fn evidence_is_shortened() {
        let long = format!("def f():\n    raise ValueError('{}')\n", "x".repeat(500));
        let candidates = file_candidates(&parsed("long.py", "long", &long));
        assert_eq!(candidates[0].evidence.chars().count(), EVIDENCE_CHARS);
        assert!(candidates[0].evidence.ends_with('…'));
    }

    #[test]
    fn candidates_are_sorted_across_files() {
        let files = vec![
            parsed("b.py", "b", "assert True\n"),
            parsed("a.py", "a", "\n\nraise SystemExit\nassert False\n"),
        ];
        let keys: Vec<(String, usize)> = collect_candidates(&files)
            .into_iter()
            .map(|c| (c.file_path, c.line_number))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("a.py".to_string(), 3),
                ("a.py".to_string(), 4),
                ("b.py".to_string(), 1),
            ]
        );
    }
}
