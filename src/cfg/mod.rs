//! Control-flow graphs for Python function bodies.
//!
//! Blocks and edges live in flat arenas indexed by [`BlockId`]; loops and
//! other cycles are integer back-edges, never pointer cycles.

pub mod builder;

pub use builder::{build_function_cfg, build_module_cfg};

use crate::core::ast::{NodeKind, Span};
use serde::{Deserialize, Serialize};

pub type BlockId = usize;

/// Branch semantics carried by a CFG edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeKind {
    FallThrough,
    TrueBranch,
    FalseBranch,
    LoopBack,
    Exception,
    Return,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Edge {
    pub from: BlockId,
    pub to: BlockId,
    pub kind: EdgeKind,
    /// Whether this edge counts toward cyclomatic complexity.
    pub decision: bool,
}

/// Lightweight reference to one statement placed in a block.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StmtRef {
    pub kind: NodeKind,
    pub span: Span,
}

/// Recorded at construction time: why a block was created without an
/// incoming edge. Drives dead-code severity classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnreachableCause {
    /// Code after `return`/`raise`/`break`/`continue` in the same
    /// lexical block.
    AfterTerminator(NodeKind),
    /// The untaken branch of a syntactically constant condition.
    ConstantCondition,
    /// Any other construction (e.g. all paths into a join terminated).
    Other,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    pub statements: Vec<StmtRef>,
    /// Terminator statement kind, when one ended this block.
    pub terminator: Option<NodeKind>,
    /// Construction-time hint for blocks born without predecessors.
    pub cause: Option<UnreachableCause>,
}

impl BasicBlock {
    /// Span covering all statements in the block, if any.
    pub fn span(&self) -> Option<Span> {
        let mut iter = self.statements.iter();
        let first = iter.next()?.span;
        Some(iter.fold(first, |acc, s| acc.merge(&s.span)))
    }
}

/// A per-function control-flow graph. Immutable after construction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cfg {
    pub function: String,
    pub span: Span,
    pub blocks: Vec<BasicBlock>,
    pub edges: Vec<Edge>,
    pub entry: BlockId,
    /// Short-circuit `and`/`or` operators found in conditions and
    /// simple statements.
    pub bool_ops: u32,
    /// Decisions whose edge was folded away by a constant condition.
    pub folded_decisions: u32,
}

impl Cfg {
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn successors(&self, block: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.edges
            .iter()
            .filter(move |e| e.from == block)
            .map(|e| e.to)
    }

    pub fn predecessors(&self, block: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.edges
            .iter()
            .filter(move |e| e.to == block)
            .map(|e| e.from)
    }

    /// Count of edges flagged as decisions during construction.
    pub fn decision_edges(&self) -> u32 {
        self.edges.iter().filter(|e| e.decision).count() as u32
    }

    /// Forward reachability from the entry block.
    pub fn reachable(&self) -> Vec<bool> {
        let mut seen = vec![false; self.blocks.len()];
        let mut stack = vec![self.entry];
        seen[self.entry] = true;
        while let Some(block) = stack.pop() {
            for next in self.successors(block) {
                if !seen[next] {
                    seen[next] = true;
                    stack.push(next);
                }
            }
        }
        seen
    }

    /// Every statement recorded across all blocks, in block order.
    pub fn statement_count(&self) -> usize {
        self.blocks.iter().map(|b| b.statements.len()).sum()
    }

    /// Block containing the given 1-based source line, if any.
    pub fn block_at_line(&self, line: usize) -> Option<BlockId> {
        self.blocks.iter().position(|b| {
            b.statements
                .iter()
                .any(|s| s.span.start_line <= line && line <= s.span.end_line)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_block_cfg() -> Cfg {
        Cfg {
            function: "f".to_string(),
            span: Span::new(1, 3, 0, 0),
            blocks: vec![
                BasicBlock {
                    id: 0,
                    ..Default::default()
                },
                BasicBlock {
                    id: 1,
                    ..Default::default()
                },
                BasicBlock {
                    id: 2,
                    ..Default::default()
                },
            ],
            edges: vec![Edge {
                from: 0,
                to: 1,
                kind: EdgeKind::FallThrough,
                decision: false,
            }],
            entry: 0,
            bool_ops: 0,
            folded_decisions: 0,
        }
    }

    #[test]
    fn reachability_stops_at_missing_edges() {
        let cfg = two_block_cfg();
        let reachable = cfg.reachable();
        assert_eq!(reachable, vec![true, true, false]);
    }

    #[test]
    fn successors_follow_edges() {
        let cfg = two_block_cfg();
        assert_eq!(cfg.successors(0).collect::<Vec<_>>(), vec![1]);
        assert_eq!(cfg.successors(1).count(), 0);
    }
}
