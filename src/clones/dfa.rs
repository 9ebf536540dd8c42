//! Per-function def-use summaries feeding semantic (Type-4) clone scoring.
//!
//! A fixed-size feature vector per function: def-use pair count, average
//! chain length, cross-block fraction, and histograms over definition and
//! use kinds. No inter-procedural propagation.

use crate::cfg;
use crate::core::ast::{AstNode, NodeKind};
use crate::core::errors::Result;
use std::path::Path;

const DEF_KIND_COUNT: usize = 5;
const USE_KIND_COUNT: usize = 4;

// Feature weights for the DFA similarity blend.
const W_PAIR_COUNT: f64 = 0.25;
const W_CHAIN_LEN: f64 = 0.20;
const W_CROSS_BLOCK: f64 = 0.20;
const W_DEF_KINDS: f64 = 0.20;
const W_USE_KINDS: f64 = 0.15;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefKind {
    Assignment,
    Parameter,
    LoopVariable,
    Comprehension,
    ExceptBinding,
}

impl DefKind {
    fn index(self) -> usize {
        match self {
            DefKind::Assignment => 0,
            DefKind::Parameter => 1,
            DefKind::LoopVariable => 2,
            DefKind::Comprehension => 3,
            DefKind::ExceptBinding => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UseKind {
    Read,
    Call,
    Attribute,
    Subscript,
}

impl UseKind {
    fn index(self) -> usize {
        match self {
            UseKind::Read => 0,
            UseKind::Call => 1,
            UseKind::Attribute => 2,
            UseKind::Subscript => 3,
        }
    }
}

/// Fixed-size def-use feature vector for one function.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DfaSummary {
    pub pair_count: usize,
    pub avg_chain_len: f64,
    pub cross_block_fraction: f64,
    pub def_kinds: [f64; DEF_KIND_COUNT],
    pub use_kinds: [f64; USE_KIND_COUNT],
}

struct DefEvent {
    name: String,
    line: usize,
    kind: DefKind,
}

struct UseEvent {
    name: String,
    line: usize,
    kind: UseKind,
}

/// Summarize one function definition.
pub fn summarize_function(file: &Path, func: &AstNode) -> Result<DfaSummary> {
    let graph = cfg::build_function_cfg(file, func)?;

    let mut defs: Vec<DefEvent> = Vec::new();
    let mut uses: Vec<UseEvent> = Vec::new();
    if let Some(params) = func.child_of_kind(NodeKind::Parameters) {
        collect_parameter_defs(params, &mut defs);
    }
    for stmt in func.body() {
        collect(stmt, &mut defs, &mut uses);
    }

    // Pair each use with the closest preceding definition of the name;
    // uses before any def (loop bodies) fall back to the first one.
    let mut chain_lengths: Vec<usize> = vec![0; defs.len()];
    let mut pair_count = 0usize;
    let mut cross_block = 0usize;
    for use_event in &uses {
        let matched = defs
            .iter()
            .enumerate()
            .filter(|(_, d)| d.name == use_event.name && d.line <= use_event.line)
            .max_by_key(|(_, d)| d.line)
            .or_else(|| {
                defs.iter()
                    .enumerate()
                    .find(|(_, d)| d.name == use_event.name)
            });
        if let Some((idx, def)) = matched {
            pair_count += 1;
            chain_lengths[idx] += 1;
            let def_block = graph.block_at_line(def.line);
            let use_block = graph.block_at_line(use_event.line);
            if let (Some(db), Some(ub)) = (def_block, use_block) {
                if db != ub {
                    cross_block += 1;
                }
            }
        }
    }

    let chains_with_uses: Vec<usize> = chain_lengths.iter().copied().filter(|c| *c > 0).collect();
    let avg_chain_len = if chains_with_uses.is_empty() {
        0.0
    } else {
        chains_with_uses.iter().sum::<usize>() as f64 / chains_with_uses.len() as f64
    };
    let cross_block_fraction = if pair_count == 0 {
        0.0
    } else {
        cross_block as f64 / pair_count as f64
    };

    Ok(DfaSummary {
        pair_count,
        avg_chain_len,
        cross_block_fraction,
        def_kinds: histogram(defs.iter().map(|d| d.kind.index())),
        use_kinds: histogram(uses.iter().map(|u| u.kind.index())),
    })
}

fn histogram<const N: usize>(indices: impl Iterator<Item = usize>) -> [f64; N] {
    let mut counts = [0.0_f64; N];
    let mut total = 0.0;
    for i in indices {
        counts[i] += 1.0;
        total += 1.0;
    }
    if total > 0.0 {
        for slot in counts.iter_mut() {
            *slot /= total;
        }
    }
    counts
}

fn collect_parameter_defs(params: &AstNode, defs: &mut Vec<DefEvent>) {
    for child in &params.children {
        match child.kind {
            NodeKind::Identifier => push_def(defs, child, DefKind::Parameter),
            NodeKind::DefaultParameter | NodeKind::TypedParameter => {
                if let Some(name) = child.child_of_kind(NodeKind::Identifier) {
                    push_def(defs, name, DefKind::Parameter);
                }
            }
            _ => {}
        }
    }
}

fn push_def(defs: &mut Vec<DefEvent>, node: &AstNode, kind: DefKind) {
    if let Some(name) = node.name() {
        defs.push(DefEvent {
            name: name.to_string(),
            line: node.span.start_line,
            kind,
        });
    }
}

fn push_use(uses: &mut Vec<UseEvent>, node: &AstNode, kind: UseKind) {
    if let Some(name) = node.name() {
        uses.push(UseEvent {
            name: name.to_string(),
            line: node.span.start_line,
            kind,
        });
    }
}

fn collect_pattern_defs(node: &AstNode, kind: DefKind, defs: &mut Vec<DefEvent>) {
    match node.kind {
        NodeKind::Identifier => push_def(defs, node, kind),
        NodeKind::Tuple | NodeKind::List => {
            for child in &node.children {
                collect_pattern_defs(child, kind, defs);
            }
        }
        _ => {}
    }
}

fn collect(node: &AstNode, defs: &mut Vec<DefEvent>, uses: &mut Vec<UseEvent>) {
    match node.kind {
        // Nested definitions keep their own summaries.
        NodeKind::FunctionDef | NodeKind::ClassDef | NodeKind::Lambda => {}
        NodeKind::Assign => {
            if let Some((target, rest)) = node.children.split_first() {
                collect_pattern_defs(target, DefKind::Assignment, defs);
                collect_target_base_uses(target, uses);
                for child in rest {
                    collect(child, defs, uses);
                }
            }
        }
        NodeKind::AugAssign => {
            if let Some((target, rest)) = node.children.split_first() {
                collect_pattern_defs(target, DefKind::Assignment, defs);
                for child in rest {
                    collect(child, defs, uses);
                }
            }
        }
        NodeKind::For => {
            let mut exprs = node
                .children
                .iter()
                .filter(|c| !matches!(c.kind, NodeKind::Block | NodeKind::ElseClause));
            if let Some(pattern) = exprs.next() {
                collect_pattern_defs(pattern, DefKind::LoopVariable, defs);
            }
            for expr in exprs {
                collect(expr, defs, uses);
            }
            for child in node
                .children
                .iter()
                .filter(|c| matches!(c.kind, NodeKind::Block | NodeKind::ElseClause))
            {
                collect(child, defs, uses);
            }
        }
        NodeKind::ForInClause => {
            if let Some((pattern, rest)) = node.children.split_first() {
                collect_pattern_defs(pattern, DefKind::Comprehension, defs);
                for child in rest {
                    collect(child, defs, uses);
                }
            }
        }
        NodeKind::ExceptClause => {
            let non_block: Vec<&AstNode> = node
                .children
                .iter()
                .filter(|c| c.kind != NodeKind::Block)
                .collect();
            // `except Type as name:` binds the trailing identifier
            if non_block.len() >= 2 {
                if let Some(last) = non_block.last() {
                    if last.kind == NodeKind::Identifier {
                        push_def(defs, last, DefKind::ExceptBinding);
                    }
                }
                for expr in &non_block[..non_block.len() - 1] {
                    collect(expr, defs, uses);
                }
            } else {
                for expr in non_block {
                    collect(expr, defs, uses);
                }
            }
            if let Some(block) = node.child_of_kind(NodeKind::Block) {
                collect(block, defs, uses);
            }
        }
        NodeKind::Call => {
            if let Some((callee, rest)) = node.children.split_first() {
                if callee.kind == NodeKind::Identifier {
                    push_use(uses, callee, UseKind::Call);
                } else {
                    collect(callee, defs, uses);
                }
                for child in rest {
                    collect(child, defs, uses);
                }
            }
        }
        NodeKind::Attribute => {
            if let Some((object, _attr_name)) = node.children.split_first() {
                if object.kind == NodeKind::Identifier {
                    push_use(uses, object, UseKind::Attribute);
                } else {
                    collect(object, defs, uses);
                }
            }
        }
        NodeKind::Subscript => {
            if let Some((object, rest)) = node.children.split_first() {
                if object.kind == NodeKind::Identifier {
                    push_use(uses, object, UseKind::Subscript);
                } else {
                    collect(object, defs, uses);
                }
                for child in rest {
                    collect(child, defs, uses);
                }
            }
        }
        NodeKind::KeywordArgument => {
            // the keyword name is not a variable reference
            if let Some((_, rest)) = node.children.split_first() {
                for child in rest {
                    collect(child, defs, uses);
                }
            }
        }
        NodeKind::Identifier => push_use(uses, node, UseKind::Read),
        _ => {
            for child in &node.children {
                collect(child, defs, uses);
            }
        }
    }
}

/// Assigning through `obj.field` or `seq[i]` reads the base object.
fn collect_target_base_uses(target: &AstNode, uses: &mut Vec<UseEvent>) {
    match target.kind {
        NodeKind::Attribute => {
            if let Some(object) = target.children.first() {
                if object.kind == NodeKind::Identifier {
                    push_use(uses, object, UseKind::Attribute);
                }
            }
        }
        NodeKind::Subscript => {
            if let Some(object) = target.children.first() {
                if object.kind == NodeKind::Identifier {
                    push_use(uses, object, UseKind::Subscript);
                }
            }
        }
        _ => {}
    }
}

/// Weighted similarity of two summaries; each feature contributes a value
/// in `[0, 1]`.
pub fn dfa_similarity(a: &DfaSummary, b: &DfaSummary) -> f64 {
    let pair_sim = ratio_similarity(a.pair_count as f64, b.pair_count as f64);
    let chain_sim = ratio_similarity(a.avg_chain_len, b.avg_chain_len);
    let cross_sim = 1.0 - (a.cross_block_fraction - b.cross_block_fraction).abs();
    let def_sim = histogram_similarity(&a.def_kinds, &b.def_kinds);
    let use_sim = histogram_similarity(&a.use_kinds, &b.use_kinds);

    W_PAIR_COUNT * pair_sim
        + W_CHAIN_LEN * chain_sim
        + W_CROSS_BLOCK * cross_sim
        + W_DEF_KINDS * def_sim
        + W_USE_KINDS * use_sim
}

fn ratio_similarity(a: f64, b: f64) -> f64 {
    if a == 0.0 && b == 0.0 {
        return 1.0;
    }
    let (low, high) = if a < b { (a, b) } else { (b, a) };
    if high == 0.0 {
        0.0
    } else {
        low / high
    }
}

fn histogram_similarity(a: &[f64], b: &[f64]) -> f64 {
    let l1: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum();
    1.0 - 0.5 * l1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parsing::parse_source;
    use indoc::indoc;
    use std::path::Path;

    fn summary_of(source: &str) -> DfaSummary {
        let parsed = parse_source(Path::new("t.py"), source).unwrap();
        let funcs = parsed.ast.functions();
        summarize_function(Path::new("t.py"), funcs[0]).unwrap()
    }

    #[test]
    fn straight_line_def_use() {
        let summary = summary_of(indoc! {"
            def f():
                x = 1
                return x
        "});
        assert_eq!(summary.pair_count, 1);
        assert_eq!(summary.avg_chain_len, 1.0);
        // def and use land in the single entry block
        assert_eq!(summary.cross_block_fraction, 0.0);
    }

    #[test]
    fn parameters_count_as_defs() {
        let summary = summary_of(indoc! {"
            def f(a, b):
                return a + b
        "});
        assert_eq!(summary.pair_count, 2);
        assert!(summary.def_kinds[DefKind::Parameter.index()] > 0.9);
    }

    #[test]
    fn loop_variable_crosses_blocks() {
        let summary = summary_of(indoc! {"
            def f(items):
                total = 0
                for item in items:
                    total = total + item
                return total
        "});
        assert!(summary.pair_count >= 3);
        assert!(summary.cross_block_fraction > 0.0);
        assert!(summary.def_kinds[DefKind::LoopVariable.index()] > 0.0);
    }

    #[test]
    fn call_and_attribute_uses_are_classified() {
        let summary = summary_of(indoc! {"
            def f(conn, query):
                cursor = conn.cursor()
                cursor.execute(query)
                return cursor
        "});
        assert!(summary.use_kinds[UseKind::Attribute.index()] > 0.0);
        assert!(summary.use_kinds[UseKind::Read.index()] > 0.0);
    }

    #[test]
    fn similarity_of_identical_summaries_is_one() {
        let summary = summary_of(indoc! {"
            def f(a):
                b = a * 2
                return b
        "});
        let sim = dfa_similarity(&summary, &summary);
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn similarity_is_symmetric_and_bounded() {
        let a = summary_of(indoc! {"
            def f(xs):
                out = []
                for x in xs:
                    out.append(x * 2)
                return out
        "});
        let b = summary_of(indoc! {"
            def g(n):
                try:
                    return 1 / n
                except ZeroDivisionError as exc:
                    raise exc
        "});
        let ab = dfa_similarity(&a, &b);
        let ba = dfa_similarity(&b, &a);
        assert_eq!(ab, ba);
        assert!((0.0..=1.0).contains(&ab));
    }
}
