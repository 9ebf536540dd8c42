//! Candidate clone fragments: statement-level subtrees of function bodies
//! meeting the configured size thresholds.

use crate::clones::dfa::DfaSummary;
use crate::core::ast::{AstNode, NodeKind, Span};
use crate::core::parsing::ParsedFile;
use std::path::PathBuf;
use std::sync::Arc;
use xxhash_rust::xxh64::xxh64;

/// A candidate clone unit. Owns its subtree so the per-file AST can be
/// dropped once extraction is done.
#[derive(Clone, Debug)]
pub struct Fragment {
    /// Assigned after all fragments are collected and sorted.
    pub id: usize,
    pub file: PathBuf,
    pub function: String,
    pub span: Span,
    pub root: AstNode,
    pub node_count: usize,
    /// Stable hash of the pre-order kind stream.
    pub fingerprint: u64,
    /// Token stream preserving identifiers and literals.
    pub exact_stream: Vec<String>,
    /// Def-use summary of the enclosing function, when computed.
    pub dfa: Option<Arc<DfaSummary>>,
}

impl Fragment {
    /// Two fragments in the same file with overlapping spans are nested
    /// views of the same code, never a clone pair.
    pub fn overlaps(&self, other: &Fragment) -> bool {
        self.file == other.file
            && self.span.start_line <= other.span.end_line
            && other.span.start_line <= self.span.end_line
    }
}

/// Size thresholds for fragment eligibility.
#[derive(Clone, Copy, Debug)]
pub struct FragmentLimits {
    pub min_lines: usize,
    pub min_nodes: usize,
}

/// Enumerate eligible fragments of one parsed file.
///
/// Candidate roots are function definitions and the compound statements
/// inside them; expression-level subtrees never satisfy the line
/// threshold and are not enumerated.
pub fn extract_fragments(parsed: &ParsedFile, limits: FragmentLimits) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    for func in parsed.ast.functions() {
        let name = func.definition_name().unwrap_or("<lambda>").to_string();
        collect_candidates(func, &name, parsed, limits, &mut fragments);
    }
    fragments
}

fn collect_candidates(
    node: &AstNode,
    function: &str,
    parsed: &ParsedFile,
    limits: FragmentLimits,
    out: &mut Vec<Fragment>,
) {
    if is_candidate_root(node.kind) {
        let node_count = node.node_count();
        if node_count >= limits.min_nodes && node.span.line_count() >= limits.min_lines {
            out.push(build_fragment(node, function, &parsed.path));
        }
    }
    for child in &node.children {
        // Nested functions restart the function label.
        if child.kind == NodeKind::FunctionDef {
            let name = child.definition_name().unwrap_or("<lambda>").to_string();
            collect_candidates(child, &name, parsed, limits, out);
        } else {
            collect_candidates(child, function, parsed, limits, out);
        }
    }
}

fn is_candidate_root(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::FunctionDef
            | NodeKind::If
            | NodeKind::While
            | NodeKind::For
            | NodeKind::Try
            | NodeKind::With
            | NodeKind::Match
    )
}

fn build_fragment(node: &AstNode, function: &str, file: &PathBuf) -> Fragment {
    Fragment {
        id: 0,
        file: file.clone(),
        function: function.to_string(),
        span: node.span,
        node_count: node.node_count(),
        fingerprint: fingerprint(node),
        exact_stream: exact_stream(node),
        root: node.clone(),
        dfa: None,
    }
}

/// Hash of the pre-order kind stream; identical values mean structurally
/// identical subtrees, used for exact-duplicate pre-filtering.
pub fn fingerprint(node: &AstNode) -> u64 {
    let mut bytes = Vec::with_capacity(node.node_count() * 2);
    node.walk(&mut |n| {
        bytes.extend_from_slice(kind_label(n.kind).as_bytes());
        bytes.push(0);
    });
    xxh64(&bytes, 0)
}

/// Pre-order token stream keeping identifier and literal text. Whitespace
/// and comments are already gone; equality of these streams is the Type-1
/// criterion.
pub fn exact_stream(node: &AstNode) -> Vec<String> {
    let mut tokens = Vec::with_capacity(node.node_count());
    node.walk(&mut |n| match &n.text {
        Some(text) => tokens.push(format!("{}={}", kind_label(n.kind), text)),
        None => tokens.push(kind_label(n.kind).to_string()),
    });
    tokens
}

/// Pre-order stream with identifiers and literals replaced by kind-tagged
/// placeholders; equality is the Type-2 criterion.
pub fn abstract_stream(node: &AstNode) -> Vec<&'static str> {
    let mut tokens = Vec::with_capacity(node.node_count());
    node.walk(&mut |n| tokens.push(kind_label(n.kind)));
    tokens
}

pub fn kind_label(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Module => "module",
        NodeKind::FunctionDef => "func",
        NodeKind::ClassDef => "class",
        NodeKind::DecoratedDef => "decorated",
        NodeKind::Decorator => "decorator",
        NodeKind::Parameters => "params",
        NodeKind::Parameter => "param",
        NodeKind::DefaultParameter => "default_param",
        NodeKind::TypedParameter => "typed_param",
        NodeKind::Block => "block",
        NodeKind::If => "if",
        NodeKind::ElifClause => "elif",
        NodeKind::ElseClause => "else",
        NodeKind::While => "while",
        NodeKind::For => "for",
        NodeKind::Try => "try",
        NodeKind::ExceptClause => "except",
        NodeKind::FinallyClause => "finally",
        NodeKind::With => "with",
        NodeKind::Match => "match",
        NodeKind::CaseClause => "case",
        NodeKind::Return => "return",
        NodeKind::Raise => "raise",
        NodeKind::Break => "break",
        NodeKind::Continue => "continue",
        NodeKind::Pass => "pass",
        NodeKind::Import => "import",
        NodeKind::ImportFrom => "import_from",
        NodeKind::ExpressionStmt => "expr_stmt",
        NodeKind::Assign => "assign",
        NodeKind::AugAssign => "aug_assign",
        NodeKind::Global => "global",
        NodeKind::Nonlocal => "nonlocal",
        NodeKind::Assert => "assert",
        NodeKind::Delete => "delete",
        NodeKind::Call => "call",
        NodeKind::ArgumentList => "args",
        NodeKind::KeywordArgument => "kwarg",
        NodeKind::Attribute => "attr",
        NodeKind::Subscript => "subscript",
        NodeKind::Slice => "slice",
        NodeKind::Await => "await",
        NodeKind::Lambda => "lambda",
        NodeKind::BoolOp => "bool_op",
        NodeKind::NotOp => "not_op",
        NodeKind::Compare => "compare",
        NodeKind::BinOp => "bin_op",
        NodeKind::UnaryOp => "unary_op",
        NodeKind::CondExpr => "cond_expr",
        NodeKind::ListComp => "list_comp",
        NodeKind::SetComp => "set_comp",
        NodeKind::DictComp => "dict_comp",
        NodeKind::GeneratorExp => "gen_exp",
        NodeKind::ForInClause => "for_in",
        NodeKind::IfClause => "if_clause",
        NodeKind::List => "list",
        NodeKind::Tuple => "tuple",
        NodeKind::Dict => "dict",
        NodeKind::Set => "set",
        NodeKind::Pair => "pair",
        NodeKind::Identifier => "id",
        NodeKind::Int => "int",
        NodeKind::Float => "float",
        NodeKind::Str => "str",
        NodeKind::True => "true",
        NodeKind::False => "false",
        NodeKind::NoneLit => "none",
        NodeKind::Ellipsis => "ellipsis",
        NodeKind::DottedName => "dotted_name",
        NodeKind::AliasedImport => "aliased_import",
        NodeKind::RelativeImport => "relative_import",
        NodeKind::ImportPrefix => "import_prefix",
        NodeKind::WildcardImport => "wildcard_import",
        NodeKind::Other => "other",
    }
}
