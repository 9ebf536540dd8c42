//! Typed syntax tree normalized from the tree-sitter parse tree.
//!
//! The adapter keeps only named grammar nodes, tags each with a [`NodeKind`],
//! and retains identifier/literal text so downstream analyses never touch
//! tree-sitter lifetimes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Source span within one file. Lines are 1-based, columns 0-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start_line: usize,
    pub end_line: usize,
    pub start_col: usize,
    pub end_col: usize,
}

impl Span {
    pub fn new(start_line: usize, end_line: usize, start_col: usize, end_col: usize) -> Self {
        Self {
            start_line,
            end_line,
            start_col,
            end_col,
        }
    }

    /// Number of source lines covered, inclusive.
    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// Smallest span covering both operands.
    pub fn merge(&self, other: &Span) -> Span {
        let (start_line, start_col) =
            if (self.start_line, self.start_col) <= (other.start_line, other.start_col) {
                (self.start_line, self.start_col)
            } else {
                (other.start_line, other.start_col)
            };
        let (end_line, end_col) = if (self.end_line, self.end_col) >= (other.end_line, other.end_col)
        {
            (self.end_line, self.end_col)
        } else {
            (other.end_line, other.end_col)
        };
        Span {
            start_line,
            end_line,
            start_col,
            end_col,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start_line == self.end_line {
            write!(f, "{}", self.start_line)
        } else {
            write!(f, "{}-{}", self.start_line, self.end_line)
        }
    }
}

/// Broad family a node kind belongs to, used by the language-aware edit
/// cost model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KindFamily {
    Definition,
    Statement,
    Expression,
    Literal,
    Name,
    Structural,
}

/// Python construct tags for normalized AST nodes.
///
/// Grammar kinds with no analytical meaning collapse into `Other`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Module,
    FunctionDef,
    ClassDef,
    DecoratedDef,
    Decorator,
    Parameters,
    Parameter,
    DefaultParameter,
    TypedParameter,
    Block,
    // Compound statements
    If,
    ElifClause,
    ElseClause,
    While,
    For,
    Try,
    ExceptClause,
    FinallyClause,
    With,
    Match,
    CaseClause,
    // Simple statements
    Return,
    Raise,
    Break,
    Continue,
    Pass,
    Import,
    ImportFrom,
    ExpressionStmt,
    Assign,
    AugAssign,
    Global,
    Nonlocal,
    Assert,
    Delete,
    // Expressions
    Call,
    ArgumentList,
    KeywordArgument,
    Attribute,
    Subscript,
    Slice,
    Await,
    Lambda,
    BoolOp,
    NotOp,
    Compare,
    BinOp,
    UnaryOp,
    CondExpr,
    ListComp,
    SetComp,
    DictComp,
    GeneratorExp,
    ForInClause,
    IfClause,
    List,
    Tuple,
    Dict,
    Set,
    Pair,
    // Atoms
    Identifier,
    Int,
    Float,
    Str,
    True,
    False,
    NoneLit,
    Ellipsis,
    // Import internals
    DottedName,
    AliasedImport,
    RelativeImport,
    ImportPrefix,
    WildcardImport,
    Other,
}

impl NodeKind {
    /// Map a tree-sitter-python grammar kind to the normalized tag.
    pub fn from_grammar(kind: &str) -> NodeKind {
        match kind {
            "module" => NodeKind::Module,
            "function_definition" => NodeKind::FunctionDef,
            "class_definition" => NodeKind::ClassDef,
            "decorated_definition" => NodeKind::DecoratedDef,
            "decorator" => NodeKind::Decorator,
            "parameters" | "lambda_parameters" => NodeKind::Parameters,
            "default_parameter" | "typed_default_parameter" => NodeKind::DefaultParameter,
            "typed_parameter" => NodeKind::TypedParameter,
            "block" => NodeKind::Block,
            "if_statement" => NodeKind::If,
            "elif_clause" => NodeKind::ElifClause,
            "else_clause" => NodeKind::ElseClause,
            "while_statement" => NodeKind::While,
            "for_statement" => NodeKind::For,
            "try_statement" => NodeKind::Try,
            "except_clause" | "except_group_clause" => NodeKind::ExceptClause,
            "finally_clause" => NodeKind::FinallyClause,
            "with_statement" => NodeKind::With,
            "match_statement" => NodeKind::Match,
            "case_clause" => NodeKind::CaseClause,
            "return_statement" => NodeKind::Return,
            "raise_statement" => NodeKind::Raise,
            "break_statement" => NodeKind::Break,
            "continue_statement" => NodeKind::Continue,
            "pass_statement" => NodeKind::Pass,
            "import_statement" => NodeKind::Import,
            "import_from_statement" => NodeKind::ImportFrom,
            "expression_statement" => NodeKind::ExpressionStmt,
            "assignment" => NodeKind::Assign,
            "augmented_assignment" => NodeKind::AugAssign,
            "global_statement" => NodeKind::Global,
            "nonlocal_statement" => NodeKind::Nonlocal,
            "assert_statement" => NodeKind::Assert,
            "delete_statement" => NodeKind::Delete,
            "call" => NodeKind::Call,
            "argument_list" => NodeKind::ArgumentList,
            "keyword_argument" => NodeKind::KeywordArgument,
            "attribute" => NodeKind::Attribute,
            "subscript" => NodeKind::Subscript,
            "slice" => NodeKind::Slice,
            "await" => NodeKind::Await,
            "lambda" => NodeKind::Lambda,
            "boolean_operator" => NodeKind::BoolOp,
            "not_operator" => NodeKind::NotOp,
            "comparison_operator" => NodeKind::Compare,
            "binary_operator" => NodeKind::BinOp,
            "unary_operator" => NodeKind::UnaryOp,
            "conditional_expression" => NodeKind::CondExpr,
            "list_comprehension" => NodeKind::ListComp,
            "set_comprehension" => NodeKind::SetComp,
            "dictionary_comprehension" => NodeKind::DictComp,
            "generator_expression" => NodeKind::GeneratorExp,
            "for_in_clause" => NodeKind::ForInClause,
            "if_clause" => NodeKind::IfClause,
            "list" => NodeKind::List,
            "tuple" | "pattern_list" | "expression_list" => NodeKind::Tuple,
            "dictionary" => NodeKind::Dict,
            "set" => NodeKind::Set,
            "pair" => NodeKind::Pair,
            "identifier" => NodeKind::Identifier,
            "integer" => NodeKind::Int,
            "float" => NodeKind::Float,
            "string" | "concatenated_string" => NodeKind::Str,
            "true" => NodeKind::True,
            "false" => NodeKind::False,
            "none" => NodeKind::NoneLit,
            "ellipsis" => NodeKind::Ellipsis,
            "dotted_name" => NodeKind::DottedName,
            "aliased_import" => NodeKind::AliasedImport,
            "relative_import" => NodeKind::RelativeImport,
            "import_prefix" => NodeKind::ImportPrefix,
            "wildcard_import" => NodeKind::WildcardImport,
            _ => NodeKind::Other,
        }
    }

    pub fn family(&self) -> KindFamily {
        use NodeKind::*;
        match self {
            FunctionDef | ClassDef | DecoratedDef | Lambda => KindFamily::Definition,
            If | ElifClause | ElseClause | While | For | Try | ExceptClause | FinallyClause
            | With | Match | CaseClause | Return | Raise | Break | Continue | Pass | Import
            | ImportFrom | ExpressionStmt | Assign | AugAssign | Global | Nonlocal | Assert
            | Delete => KindFamily::Statement,
            Int | Float | Str | True | False | NoneLit | Ellipsis => KindFamily::Literal,
            Identifier | DottedName => KindFamily::Name,
            Module | Block | Parameters | Parameter | DefaultParameter | TypedParameter
            | Decorator | ArgumentList | AliasedImport | RelativeImport | ImportPrefix
            | WildcardImport | Other => KindFamily::Structural,
            _ => KindFamily::Expression,
        }
    }

    /// Statement-level kinds occupy exactly one basic block slot.
    pub fn is_statement(&self) -> bool {
        self.family() == KindFamily::Statement
    }

    /// Statements that end a basic block with no successor edge.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            NodeKind::Return | NodeKind::Raise | NodeKind::Break | NodeKind::Continue
        )
    }

    pub fn is_literal(&self) -> bool {
        self.family() == KindFamily::Literal
    }

    /// Kinds whose source text is retained as the node payload.
    pub fn keeps_text(&self) -> bool {
        self.is_literal() || matches!(self, NodeKind::Identifier | NodeKind::DottedName)
    }
}

/// One node in the normalized tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AstNode {
    pub kind: NodeKind,
    pub span: Span,
    /// Identifier or literal text; `None` for every other kind.
    pub text: Option<String>,
    pub children: Vec<AstNode>,
}

impl AstNode {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self {
            kind,
            span,
            text: None,
            children: Vec::new(),
        }
    }

    /// Total node count of this subtree, the root included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(AstNode::node_count).sum::<usize>()
    }

    /// First child of the given kind, if any.
    pub fn child_of_kind(&self, kind: NodeKind) -> Option<&AstNode> {
        self.children.iter().find(|c| c.kind == kind)
    }

    /// All direct children of the given kind.
    pub fn children_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &AstNode> {
        self.children.iter().filter(move |c| c.kind == kind)
    }

    /// Pre-order walk of the subtree.
    pub fn walk(&self, visit: &mut impl FnMut(&AstNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// Pre-order kind stream; stable input for fingerprinting.
    pub fn kind_stream(&self) -> Vec<NodeKind> {
        let mut kinds = Vec::with_capacity(self.node_count());
        self.walk(&mut |node| kinds.push(node.kind));
        kinds
    }

    /// Identifier payload, for nodes that carry one.
    pub fn name(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The declared name of a function or class definition.
    pub fn definition_name(&self) -> Option<&str> {
        match self.kind {
            NodeKind::FunctionDef | NodeKind::ClassDef => self
                .child_of_kind(NodeKind::Identifier)
                .and_then(AstNode::name),
            NodeKind::DecoratedDef => self
                .children
                .iter()
                .find(|c| matches!(c.kind, NodeKind::FunctionDef | NodeKind::ClassDef))
                .and_then(AstNode::definition_name),
            _ => None,
        }
    }

    /// Collect every function definition in the subtree, nested ones included.
    pub fn functions(&self) -> Vec<&AstNode> {
        let mut out = Vec::new();
        self.collect_functions(&mut out);
        out
    }

    fn collect_functions<'a>(&'a self, out: &mut Vec<&'a AstNode>) {
        if self.kind == NodeKind::FunctionDef {
            out.push(self);
        }
        for child in &self.children {
            child.collect_functions(out);
        }
    }

    /// Collect every class definition in the subtree.
    pub fn classes(&self) -> Vec<&AstNode> {
        let mut out = Vec::new();
        self.walk_classes(&mut out);
        out
    }

    fn walk_classes<'a>(&'a self, out: &mut Vec<&'a AstNode>) {
        if self.kind == NodeKind::ClassDef {
            out.push(self);
        }
        for child in &self.children {
            child.walk_classes(out);
        }
    }

    /// The statement list of a definition or compound statement body.
    pub fn body(&self) -> &[AstNode] {
        self.child_of_kind(NodeKind::Block)
            .map(|b| b.children.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(kind: NodeKind, line: usize) -> AstNode {
        AstNode::new(kind, Span::new(line, line, 0, 4))
    }

    #[test]
    fn span_merge_covers_both() {
        let a = Span::new(3, 5, 4, 10);
        let b = Span::new(1, 4, 0, 2);
        let merged = a.merge(&b);
        assert_eq!(merged.start_line, 1);
        assert_eq!(merged.end_line, 5);
    }

    #[test]
    fn node_count_includes_root() {
        let mut root = leaf(NodeKind::Module, 1);
        root.children.push(leaf(NodeKind::Pass, 1));
        root.children.push(leaf(NodeKind::Return, 2));
        assert_eq!(root.node_count(), 3);
    }

    #[test]
    fn terminators_are_recognized() {
        assert!(NodeKind::Return.is_terminator());
        assert!(NodeKind::Raise.is_terminator());
        assert!(NodeKind::Break.is_terminator());
        assert!(NodeKind::Continue.is_terminator());
        assert!(!NodeKind::Pass.is_terminator());
    }

    #[test]
    fn grammar_mapping_covers_control_flow() {
        assert_eq!(NodeKind::from_grammar("if_statement"), NodeKind::If);
        assert_eq!(NodeKind::from_grammar("while_statement"), NodeKind::While);
        assert_eq!(
            NodeKind::from_grammar("except_clause"),
            NodeKind::ExceptClause
        );
        assert_eq!(NodeKind::from_grammar("frobnicate"), NodeKind::Other);
    }

    #[test]
    fn kind_stream_is_preorder() {
        let mut root = leaf(NodeKind::Module, 1);
        let mut f = leaf(NodeKind::FunctionDef, 1);
        f.children.push(leaf(NodeKind::Identifier, 1));
        root.children.push(f);
        assert_eq!(
            root.kind_stream(),
            vec![NodeKind::Module, NodeKind::FunctionDef, NodeKind::Identifier]
        );
    }
}
