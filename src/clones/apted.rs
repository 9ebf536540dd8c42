//! Ordered tree edit distance with configurable cost models.
//!
//! Zhang–Shasha keyroot decomposition over the normalized AST. All cost
//! models are symmetric, so distances are independent of operand order,
//! and rename never costs more than delete plus insert, which makes the
//! equal-cost tie-break (prefer rename) hold by construction.

use crate::config::CostModelKind;
use crate::core::ast::{AstNode, KindFamily};

/// Matrix-cell budget; pairs above it are skipped rather than verified.
const MAX_CELLS: usize = 4_000_000;

#[derive(Clone, Copy, Debug)]
pub struct CostModel {
    kind: CostModelKind,
    ignore_identifiers: bool,
    ignore_literals: bool,
}

impl CostModel {
    pub fn new(kind: CostModelKind, ignore_identifiers: bool, ignore_literals: bool) -> Self {
        Self {
            kind,
            ignore_identifiers,
            ignore_literals,
        }
    }

    fn delete(&self, _node: &AstNode) -> f64 {
        1.0
    }

    fn insert(&self, _node: &AstNode) -> f64 {
        1.0
    }

    fn payload_matches(&self, a: &AstNode, b: &AstNode) -> bool {
        if a.kind.is_literal() && self.ignore_literals {
            return true;
        }
        if a.kind == crate::core::ast::NodeKind::Identifier && self.ignore_identifiers {
            return true;
        }
        a.text == b.text
    }

    fn rename(&self, a: &AstNode, b: &AstNode) -> f64 {
        let same_kind = a.kind == b.kind;
        if same_kind && self.payload_matches(a, b) {
            return 0.0;
        }
        match self.kind {
            CostModelKind::Default => 1.0,
            CostModelKind::Weighted => {
                // identifier and literal renames barely count; a renamed
                // copy of a function must stay near similarity 1.0
                if same_kind {
                    0.1
                } else {
                    1.0
                }
            }
            CostModelKind::Python => {
                if same_kind {
                    0.25
                } else if a.kind.family() == KindFamily::Literal
                    && b.kind.family() == KindFamily::Literal
                {
                    // swapping one literal for another is cheap
                    0.5
                } else if a.kind.family() == b.kind.family() {
                    0.75
                } else {
                    1.0
                }
            }
        }
    }
}

/// Tree edit distance engine; one instance per clone-detection run.
#[derive(Clone, Copy, Debug)]
pub struct TreeDistance {
    cost: CostModel,
}

impl TreeDistance {
    pub fn new(cost: CostModel) -> Self {
        Self { cost }
    }

    /// Edit distance between two trees, or `None` when the pair exceeds
    /// the matrix budget.
    pub fn distance(&self, a: &AstNode, b: &AstNode) -> Option<f64> {
        let ta = FlatTree::build(a);
        let tb = FlatTree::build(b);
        if ta.len() * tb.len() > MAX_CELLS {
            return None;
        }
        Some(zhang_shasha(&ta, &tb, &self.cost))
    }

    /// `(distance, similarity)` with `similarity = 1 − d / max(|A|, |B|)`
    /// clamped to `[0, 1]`.
    pub fn similarity(&self, a: &AstNode, b: &AstNode) -> Option<(f64, f64)> {
        let distance = self.distance(a, b)?;
        let max_nodes = a.node_count().max(b.node_count()).max(1);
        let similarity = (1.0 - distance / max_nodes as f64).clamp(0.0, 1.0);
        Some((distance, similarity))
    }
}

/// Postorder flattening with leftmost-leaf-descendant and keyroot tables.
struct FlatTree<'a> {
    /// Nodes in postorder, 1-indexed (slot 0 unused).
    nodes: Vec<&'a AstNode>,
    lmld: Vec<usize>,
    keyroots: Vec<usize>,
}

impl<'a> FlatTree<'a> {
    fn build(root: &'a AstNode) -> Self {
        let mut nodes: Vec<&'a AstNode> = Vec::with_capacity(root.node_count() + 1);
        let mut lmld: Vec<usize> = Vec::with_capacity(root.node_count() + 1);
        nodes.push(root); // dummy slot 0
        lmld.push(0);
        postorder(root, &mut nodes, &mut lmld);

        // A keyroot is the highest postorder index for each distinct
        // leftmost-leaf value.
        let n = nodes.len() - 1;
        let mut last_for_lmld = std::collections::HashMap::new();
        for i in 1..=n {
            last_for_lmld.insert(lmld[i], i);
        }
        let mut keyroots: Vec<usize> = last_for_lmld.into_values().collect();
        keyroots.sort_unstable();

        Self {
            nodes,
            lmld,
            keyroots,
        }
    }

    fn len(&self) -> usize {
        self.nodes.len() - 1
    }
}

fn postorder<'a>(node: &'a AstNode, nodes: &mut Vec<&'a AstNode>, lmld: &mut Vec<usize>) -> usize {
    let mut leftmost = 0;
    for (i, child) in node.children.iter().enumerate() {
        let child_lmld = postorder(child, nodes, lmld);
        if i == 0 {
            leftmost = child_lmld;
        }
    }
    nodes.push(node);
    if node.children.is_empty() {
        leftmost = nodes.len() - 1;
    }
    lmld.push(leftmost);
    leftmost
}

fn zhang_shasha(ta: &FlatTree, tb: &FlatTree, cost: &CostModel) -> f64 {
    let n = ta.len();
    let m = tb.len();
    if n == 0 || m == 0 {
        return (n + m) as f64;
    }

    let mut tree_dist = vec![0.0_f64; (n + 1) * (m + 1)];
    let mut forest = vec![0.0_f64; (n + 1) * (m + 1)];
    let td = |buf: &Vec<f64>, i: usize, j: usize| buf[i * (m + 1) + j];

    for &x in &ta.keyroots {
        for &y in &tb.keyroots {
            forest_dist(ta, tb, x, y, cost, &mut forest, &mut tree_dist, m);
        }
    }
    td(&tree_dist, n, m)
}

#[allow(clippy::too_many_arguments)]
fn forest_dist(
    ta: &FlatTree,
    tb: &FlatTree,
    x: usize,
    y: usize,
    cost: &CostModel,
    forest: &mut [f64],
    tree_dist: &mut [f64],
    m: usize,
) {
    let cols = m + 1;
    let lx = ta.lmld[x];
    let ly = tb.lmld[y];

    // forest[(i, j)] holds distances for subforests; index 0 stands for
    // the empty forest at l(x)-1 / l(y)-1.
    let fidx = |i: usize, j: usize| i * cols + j;
    forest[fidx(lx - 1, ly - 1)] = 0.0;

    for i in lx..=x {
        forest[fidx(i, ly - 1)] = forest[fidx(i - 1, ly - 1)] + cost.delete(ta.nodes[i]);
    }
    for j in ly..=y {
        forest[fidx(lx - 1, j)] = forest[fidx(lx - 1, j - 1)] + cost.insert(tb.nodes[j]);
    }
    for i in lx..=x {
        for j in ly..=y {
            let del = forest[fidx(i - 1, j)] + cost.delete(ta.nodes[i]);
            let ins = forest[fidx(i, j - 1)] + cost.insert(tb.nodes[j]);
            if ta.lmld[i] == lx && tb.lmld[j] == ly {
                let ren = forest[fidx(i - 1, j - 1)] + cost.rename(ta.nodes[i], tb.nodes[j]);
                let best = ren.min(del).min(ins);
                forest[fidx(i, j)] = best;
                tree_dist[i * cols + j] = best;
            } else {
                let sub = forest[fidx(ta.lmld[i] - 1, tb.lmld[j] - 1)] + tree_dist[i * cols + j];
                forest[fidx(i, j)] = sub.min(del).min(ins);
            }
        }
    }
}
