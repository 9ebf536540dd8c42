//! Python parsing front-end: tree-sitter parse plus AST normalization.

use crate::core::ast::{AstNode, NodeKind, Span};
use crate::core::errors::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tree_sitter::{Node, Parser};

/// A parsed source file. Constructed once per file and shared read-only
/// between the analyses that need the tree.
#[derive(Debug)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub source: String,
    pub ast: AstNode,
}

impl ParsedFile {
    pub fn total_lines(&self) -> usize {
        self.source.lines().count()
    }
}

/// Shared handle handed to concurrently running analyses.
pub type SharedParse = Arc<ParsedFile>;

fn python_parser() -> Result<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| Error::analysis(format!("failed to load Python grammar: {e}")))?;
    Ok(parser)
}

/// Parse one Python source file into the normalized tree.
///
/// Syntax errors surface as [`Error::Parse`] carrying the first error
/// location; callers skip the file and keep going.
pub fn parse_source(path: &Path, source: &str) -> Result<ParsedFile> {
    let mut parser = python_parser()?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| Error::parse(path, 1, "parser returned no tree"))?;

    let root = tree.root_node();
    if root.has_error() {
        let (line, message) = first_error(root);
        return Err(Error::parse(path, line, message));
    }

    let ast = normalize(root, source.as_bytes());
    Ok(ParsedFile {
        path: path.to_path_buf(),
        source: source.to_string(),
        ast,
    })
}

/// Read and parse a file from disk.
pub fn parse_file(path: &Path) -> Result<ParsedFile> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| Error::input(format!("failed to read {}: {e}", path.display())))?;
    parse_source(path, &source)
}

fn first_error(root: Node) -> (usize, String) {
    let mut cursor = root.walk();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let line = node.start_position().row + 1;
            let what = if node.is_missing() {
                format!("missing {}", node.kind())
            } else {
                "syntax error".to_string()
            };
            return (line, what);
        }
        for child in node.children(&mut cursor).collect::<Vec<_>>() {
            if child.has_error() {
                stack.push(child);
            }
        }
    }
    (root.start_position().row + 1, "syntax error".to_string())
}

fn span_of(node: Node) -> Span {
    let start = node.start_position();
    let end = node.end_position();
    Span::new(start.row + 1, end.row + 1, start.column, end.column)
}

/// Convert a tree-sitter node into the owned normalized tree.
///
/// Anonymous tokens and comments are dropped; identifier and literal text
/// is copied into the node payload.
fn normalize(node: Node, source: &[u8]) -> AstNode {
    let kind = NodeKind::from_grammar(node.kind());
    let mut out = AstNode::new(kind, span_of(node));

    if kind.keeps_text() {
        if let Ok(text) = node.utf8_text(source) {
            out.text = Some(text.to_string());
        }
    }

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "comment" {
            continue;
        }
        out.children.push(normalize(child, source));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn parse(source: &str) -> ParsedFile {
        parse_source(Path::new("test.py"), source).expect("source should parse")
    }

    #[test]
    fn parses_simple_function() {
        let parsed = parse(indoc! {"
            def add(a, b):
                return a + b
        "});
        assert_eq!(parsed.ast.kind, NodeKind::Module);
        let funcs = parsed.ast.functions();
        assert_eq!(funcs.len(), 1);
        assert_eq!(funcs[0].definition_name(), Some("add"));
    }

    #[test]
    fn syntax_error_is_reported_with_line() {
        let err = parse_source(Path::new("bad.py"), "def broken(:\n    pass\n").unwrap_err();
        match err {
            Error::Parse { file, line, .. } => {
                assert_eq!(file, PathBuf::from("bad.py"));
                assert!(line >= 1);
            }
            other => panic!("expected parse error, got {other}"),
        }
    }

    #[test]
    fn comments_are_dropped() {
        let parsed = parse(indoc! {"
            # leading comment
            x = 1  # trailing
        "});
        let mut saw_comment = false;
        parsed.ast.walk(&mut |n| {
            if n.kind == NodeKind::Other && n.text.is_some() {
                saw_comment = true;
            }
        });
        assert!(!saw_comment);
    }

    #[test]
    fn identifier_payload_is_kept() {
        let parsed = parse("total = 41\n");
        let mut names = Vec::new();
        parsed.ast.walk(&mut |n| {
            if n.kind == NodeKind::Identifier {
                names.push(n.text.clone().unwrap());
            }
        });
        assert_eq!(names, vec!["total".to_string()]);
    }

    #[test]
    fn nested_functions_are_all_found() {
        let parsed = parse(indoc! {"
            def outer():
                def inner():
                    pass
                return inner
        "});
        let names: Vec<_> = parsed
            .ast
            .functions()
            .iter()
            .filter_map(|f| f.definition_name())
            .collect();
        assert_eq!(names, vec!["outer", "inner"]);
    }
}
