//! Lowers normalized Python ASTs into control-flow graphs.
//!
//! One linear pass over each statement list. Compound statements split the
//! current block; `return`/`raise`/`break`/`continue` terminate it.
//! Constant conditions fold the untaken edge away and record the cause on
//! the orphaned block so dead-code analysis can classify it.

use crate::cfg::{BasicBlock, BlockId, Cfg, Edge, EdgeKind, StmtRef, UnreachableCause};
use crate::core::ast::{AstNode, NodeKind, Span};
use crate::core::errors::{Error, Result};
use std::path::Path;

/// Build the CFG for one function definition.
pub fn build_function_cfg(file: &Path, func: &AstNode) -> Result<Cfg> {
    let name = func
        .definition_name()
        .unwrap_or("<lambda>")
        .to_string();
    let body = func
        .child_of_kind(NodeKind::Block)
        .ok_or_else(|| Error::parse_shape(file, format!("function {name} has no body")))?;
    CfgBuilder::new(file, name, func.span).build(&body.children)
}

/// Build the CFG for a module's top-level statements.
///
/// Function and class bodies are opaque single statements here; each
/// function gets its own graph via [`build_function_cfg`].
pub fn build_module_cfg(file: &Path, module: &AstNode) -> Result<Cfg> {
    CfgBuilder::new(file, "<module>".to_string(), module.span).build(&module.children)
}

struct LoopCtx {
    header: BlockId,
    follow: BlockId,
}

struct CfgBuilder<'a> {
    file: &'a Path,
    cfg: Cfg,
    loops: Vec<LoopCtx>,
    /// Cause attached to the next block created without a predecessor.
    pending_cause: UnreachableCause,
}

impl<'a> CfgBuilder<'a> {
    fn new(file: &'a Path, function: String, span: Span) -> Self {
        let mut cfg = Cfg {
            function,
            span,
            blocks: Vec::new(),
            edges: Vec::new(),
            entry: 0,
            bool_ops: 0,
            folded_decisions: 0,
        };
        cfg.blocks.push(BasicBlock {
            id: 0,
            ..Default::default()
        });
        Self {
            file,
            cfg,
            loops: Vec::new(),
            pending_cause: UnreachableCause::Other,
        }
    }

    fn build(mut self, stmts: &[AstNode]) -> Result<Cfg> {
        self.lower_stmts(stmts, Some(self.cfg.entry))?;
        Ok(self.cfg)
    }

    fn new_block(&mut self, cause: Option<UnreachableCause>) -> BlockId {
        let id = self.cfg.blocks.len();
        self.cfg.blocks.push(BasicBlock {
            id,
            statements: Vec::new(),
            terminator: None,
            cause,
        });
        id
    }

    fn edge(&mut self, from: BlockId, to: BlockId, kind: EdgeKind, decision: bool) {
        self.cfg.edges.push(Edge {
            from,
            to,
            kind,
            decision,
        });
    }

    fn push_stmt(&mut self, block: BlockId, kind: NodeKind, span: Span) {
        self.cfg.blocks[block].statements.push(StmtRef { kind, span });
    }

    /// Lower a statement list starting in `current`; returns the open block
    /// after the last statement, or `None` when control cannot fall through.
    fn lower_stmts(&mut self, stmts: &[AstNode], current: Option<BlockId>) -> Result<Option<BlockId>> {
        let mut current = current;
        for stmt in stmts {
            let block = match current {
                Some(b) => b,
                None => self.new_block(Some(self.pending_cause)),
            };
            current = self.lower_stmt(stmt, block)?;
        }
        Ok(current)
    }

    fn lower_stmt(&mut self, stmt: &AstNode, current: BlockId) -> Result<Option<BlockId>> {
        match stmt.kind {
            NodeKind::If => self.lower_if(stmt, current),
            NodeKind::While => self.lower_loop(stmt, current, true),
            NodeKind::For => self.lower_loop(stmt, current, false),
            NodeKind::Try => self.lower_try(stmt, current),
            NodeKind::Match => self.lower_match(stmt, current),
            NodeKind::With => self.lower_with(stmt, current),
            NodeKind::Return | NodeKind::Raise => {
                self.push_stmt(current, stmt.kind, stmt.span);
                self.cfg.bool_ops += count_bool_ops(stmt);
                self.cfg.blocks[current].terminator = Some(stmt.kind);
                self.pending_cause = UnreachableCause::AfterTerminator(stmt.kind);
                Ok(None)
            }
            NodeKind::Break => {
                self.push_stmt(current, stmt.kind, stmt.span);
                self.cfg.blocks[current].terminator = Some(NodeKind::Break);
                if let Some(ctx) = self.loops.last() {
                    let follow = ctx.follow;
                    self.edge(current, follow, EdgeKind::FallThrough, false);
                }
                self.pending_cause = UnreachableCause::AfterTerminator(NodeKind::Break);
                Ok(None)
            }
            NodeKind::Continue => {
                self.push_stmt(current, stmt.kind, stmt.span);
                self.cfg.blocks[current].terminator = Some(NodeKind::Continue);
                if let Some(ctx) = self.loops.last() {
                    let header = ctx.header;
                    self.edge(current, header, EdgeKind::LoopBack, false);
                }
                self.pending_cause = UnreachableCause::AfterTerminator(NodeKind::Continue);
                Ok(None)
            }
            _ => {
                self.push_stmt(current, stmt.kind, stmt.span);
                self.cfg.bool_ops += count_bool_ops(stmt);
                Ok(Some(current))
            }
        }
    }

    fn lower_if(&mut self, stmt: &AstNode, current: BlockId) -> Result<Option<BlockId>> {
        let branches = if_branches(self.file, stmt)?;
        let mut open_ends: Vec<BlockId> = Vec::new();
        // Condition block whose false edge still needs a target; None once a
        // constant-true condition folded the rest of the chain away.
        let mut pending_false: Option<BlockId> = None;
        let mut dead_rest = false;
        let mut saw_else = false;

        for (i, branch) in branches.iter().enumerate() {
            match branch.condition {
                Some(condition) => {
                    let host = if i == 0 {
                        current
                    } else {
                        let b = self.new_block(dead_rest.then_some(UnreachableCause::ConstantCondition));
                        if let Some(pf) = pending_false.take() {
                            self.edge(pf, b, EdgeKind::FalseBranch, false);
                        }
                        b
                    };
                    self.push_stmt(host, branch.marker, condition.span);
                    self.cfg.bool_ops += count_bool_ops(condition);

                    let truth = literal_truth(condition);
                    let body_block = self.new_block(
                        (truth == Some(false)).then_some(UnreachableCause::ConstantCondition),
                    );
                    if truth == Some(false) {
                        self.cfg.folded_decisions += 1;
                    } else {
                        self.edge(host, body_block, EdgeKind::TrueBranch, true);
                    }
                    if let Some(end) = self.lower_stmts(branch.body, Some(body_block))? {
                        open_ends.push(end);
                    }
                    if truth == Some(true) {
                        pending_false = None;
                        dead_rest = true;
                    } else {
                        pending_false = Some(host);
                    }
                }
                None => {
                    saw_else = true;
                    let b = self.new_block(
                        (pending_false.is_none()).then_some(UnreachableCause::ConstantCondition),
                    );
                    if let Some(pf) = pending_false.take() {
                        self.edge(pf, b, EdgeKind::FalseBranch, false);
                    }
                    if let Some(end) = self.lower_stmts(branch.body, Some(b))? {
                        open_ends.push(end);
                    }
                }
            }
        }

        // Rejoin, unless every path out of the statement terminated.
        if open_ends.is_empty() && (saw_else || pending_false.is_none()) {
            self.pending_cause = if saw_else && !dead_rest {
                UnreachableCause::Other
            } else {
                UnreachableCause::ConstantCondition
            };
            return Ok(None);
        }
        let join = self.new_block(None);
        for end in open_ends {
            self.edge(end, join, EdgeKind::FallThrough, false);
        }
        if !saw_else {
            if let Some(pf) = pending_false {
                self.edge(pf, join, EdgeKind::FalseBranch, false);
            }
        }
        Ok(Some(join))
    }

    /// `while` and `for` share the header/body/follow shape; only `while`
    /// has a foldable guard.
    fn lower_loop(&mut self, stmt: &AstNode, current: BlockId, is_while: bool) -> Result<Option<BlockId>> {
        let marker_kind = if is_while { NodeKind::While } else { NodeKind::For };
        let body = stmt
            .child_of_kind(NodeKind::Block)
            .ok_or_else(|| self.shape_error(stmt, "loop has no body"))?;
        let guard = stmt
            .children
            .iter()
            .find(|c| !matches!(c.kind, NodeKind::Block | NodeKind::ElseClause))
            .ok_or_else(|| self.shape_error(stmt, "loop has no guard expression"))?;

        let header = self.new_block(None);
        self.edge(current, header, EdgeKind::FallThrough, false);
        self.push_stmt(header, marker_kind, guard.span);
        for c in &stmt.children {
            if !matches!(c.kind, NodeKind::Block | NodeKind::ElseClause) {
                self.cfg.bool_ops += count_bool_ops(c);
            }
        }

        let truth = if is_while { literal_truth(guard) } else { None };

        let body_block = self
            .new_block((truth == Some(false)).then_some(UnreachableCause::ConstantCondition));
        if truth == Some(false) {
            self.cfg.folded_decisions += 1;
        } else {
            self.edge(header, body_block, EdgeKind::TrueBranch, true);
        }

        let follow = self
            .new_block((truth == Some(true)).then_some(UnreachableCause::ConstantCondition));

        // Loop else runs on normal exhaustion; break skips it.
        let else_body = stmt.child_of_kind(NodeKind::ElseClause);
        let false_target = match else_body {
            Some(_) => self.new_block((truth == Some(true)).then_some(UnreachableCause::ConstantCondition)),
            None => follow,
        };
        if truth != Some(true) {
            self.edge(header, false_target, EdgeKind::FalseBranch, false);
        }

        self.loops.push(LoopCtx { header, follow });
        let after_body = self.lower_stmts(&body.children, Some(body_block))?;
        self.loops.pop();
        if let Some(end) = after_body {
            self.edge(end, header, EdgeKind::LoopBack, false);
        }

        if let Some(else_clause) = else_body {
            let else_block = false_target;
            if let Some(end) = self.lower_stmts(else_clause.body(), Some(else_block))? {
                self.edge(end, follow, EdgeKind::FallThrough, false);
            }
        }

        Ok(Some(follow))
    }

    fn lower_try(&mut self, stmt: &AstNode, current: BlockId) -> Result<Option<BlockId>> {
        let body = stmt
            .child_of_kind(NodeKind::Block)
            .ok_or_else(|| self.shape_error(stmt, "try has no body"))?;

        let guarded = self.new_block(None);
        self.edge(current, guarded, EdgeKind::FallThrough, false);
        let after_try = self.lower_stmts(&body.children, Some(guarded))?;

        let mut ends: Vec<BlockId> = Vec::new();
        for handler in stmt.children_of_kind(NodeKind::ExceptClause) {
            let handler_body = handler
                .child_of_kind(NodeKind::Block)
                .ok_or_else(|| self.shape_error(handler, "except clause has no body"))?;
            let hb = self.new_block(None);
            self.edge(guarded, hb, EdgeKind::Exception, true);
            self.push_stmt(hb, NodeKind::ExceptClause, handler.span);
            if let Some(end) = self.lower_stmts(&handler_body.children, Some(hb))? {
                ends.push(end);
            }
        }

        // try/else runs only on the exception-free path.
        let mut normal_end = after_try;
        if let Some(else_clause) = stmt.child_of_kind(NodeKind::ElseClause) {
            if let Some(prev) = normal_end {
                let eb = self.new_block(None);
                self.edge(prev, eb, EdgeKind::FallThrough, false);
                normal_end = self.lower_stmts(else_clause.body(), Some(eb))?;
            }
        }
        if let Some(end) = normal_end {
            ends.push(end);
        }

        if let Some(finally_clause) = stmt.child_of_kind(NodeKind::FinallyClause) {
            let fb = self.new_block(None);
            for end in &ends {
                self.edge(*end, fb, EdgeKind::FallThrough, false);
            }
            // finally runs even when every guarded path raises or returns
            if ends.is_empty() {
                self.edge(guarded, fb, EdgeKind::Exception, false);
            }
            return self.lower_stmts(finally_clause.body(), Some(fb));
        }

        if ends.is_empty() {
            self.pending_cause = UnreachableCause::Other;
            return Ok(None);
        }
        let join = self.new_block(None);
        for end in ends {
            self.edge(end, join, EdgeKind::FallThrough, false);
        }
        Ok(Some(join))
    }

    fn lower_match(&mut self, stmt: &AstNode, current: BlockId) -> Result<Option<BlockId>> {
        let subject = stmt
            .children
            .iter()
            .find(|c| !matches!(c.kind, NodeKind::Block | NodeKind::CaseClause))
            .ok_or_else(|| self.shape_error(stmt, "match has no subject"))?;
        self.push_stmt(current, NodeKind::Match, subject.span);
        self.cfg.bool_ops += count_bool_ops(subject);

        // Case clauses may sit directly under the statement or inside its block.
        let mut cases: Vec<&AstNode> = stmt.children_of_kind(NodeKind::CaseClause).collect();
        if cases.is_empty() {
            if let Some(block) = stmt.child_of_kind(NodeKind::Block) {
                cases = block.children_of_kind(NodeKind::CaseClause).collect();
            }
        }
        if cases.is_empty() {
            return Ok(Some(current));
        }

        let mut open_ends: Vec<BlockId> = Vec::new();
        let mut prev_false: Option<BlockId> = None;
        for (i, case) in cases.iter().enumerate() {
            let test = self.new_block(None);
            match prev_false {
                None => self.edge(current, test, EdgeKind::FallThrough, false),
                Some(pf) => self.edge(pf, test, EdgeKind::FalseBranch, false),
            }
            self.push_stmt(test, NodeKind::CaseClause, case.span);

            let body_block = self.new_block(None);
            // The first arm is the baseline path; arms after it are decisions.
            self.edge(test, body_block, EdgeKind::TrueBranch, i > 0);
            let case_body = case
                .child_of_kind(NodeKind::Block)
                .ok_or_else(|| self.shape_error(case, "case clause has no body"))?;
            if let Some(end) = self.lower_stmts(&case_body.children, Some(body_block))? {
                open_ends.push(end);
            }
            prev_false = Some(test);
        }

        let join = self.new_block(None);
        if let Some(pf) = prev_false {
            self.edge(pf, join, EdgeKind::FalseBranch, false);
        }
        for end in open_ends {
            self.edge(end, join, EdgeKind::FallThrough, false);
        }
        Ok(Some(join))
    }

    fn lower_with(&mut self, stmt: &AstNode, current: BlockId) -> Result<Option<BlockId>> {
        let body = stmt
            .child_of_kind(NodeKind::Block)
            .ok_or_else(|| self.shape_error(stmt, "with has no body"))?;
        let header_span = stmt
            .children
            .iter()
            .find(|c| c.kind != NodeKind::Block)
            .map(|c| c.span)
            .unwrap_or(stmt.span);
        self.push_stmt(current, NodeKind::With, header_span);
        for c in &stmt.children {
            if c.kind != NodeKind::Block {
                self.cfg.bool_ops += count_bool_ops(c);
            }
        }
        self.lower_stmts(&body.children, Some(current))
    }

    fn shape_error(&self, node: &AstNode, message: &str) -> Error {
        Error::parse_shape(
            self.file,
            format!("{message} (line {})", node.span.start_line),
        )
    }
}

struct Branch<'a> {
    marker: NodeKind,
    condition: Option<&'a AstNode>,
    body: &'a [AstNode],
}

fn if_branches<'a>(file: &Path, stmt: &'a AstNode) -> Result<Vec<Branch<'a>>> {
    let condition = stmt
        .children
        .iter()
        .find(|c| {
            !matches!(
                c.kind,
                NodeKind::Block | NodeKind::ElifClause | NodeKind::ElseClause
            )
        })
        .ok_or_else(|| Error::parse_shape(file, "if statement has no condition".to_string()))?;
    let consequence = stmt
        .child_of_kind(NodeKind::Block)
        .ok_or_else(|| Error::parse_shape(file, "if statement has no body".to_string()))?;

    let mut branches = vec![Branch {
        marker: NodeKind::If,
        condition: Some(condition),
        body: &consequence.children,
    }];

    for clause in &stmt.children {
        match clause.kind {
            NodeKind::ElifClause => {
                let cond = clause
                    .children
                    .iter()
                    .find(|c| c.kind != NodeKind::Block)
                    .ok_or_else(|| {
                        Error::parse_shape(file, "elif clause has no condition".to_string())
                    })?;
                branches.push(Branch {
                    marker: NodeKind::ElifClause,
                    condition: Some(cond),
                    body: clause.body(),
                });
            }
            NodeKind::ElseClause => {
                branches.push(Branch {
                    marker: NodeKind::ElseClause,
                    condition: None,
                    body: clause.body(),
                });
            }
            _ => {}
        }
    }
    Ok(branches)
}

/// Syntactic truth value of a literal condition, when decidable.
fn literal_truth(condition: &AstNode) -> Option<bool> {
    match condition.kind {
        NodeKind::True => Some(true),
        NodeKind::False => Some(false),
        NodeKind::NoneLit => Some(false),
        NodeKind::Int | NodeKind::Float => {
            let text = condition.text.as_deref()?;
            let nonzero = text.trim().trim_matches('0').trim_matches('.') != "";
            Some(nonzero)
        }
        NodeKind::Str => {
            let text = condition.text.as_deref()?;
            let inner: String = text
                .chars()
                .filter(|c| !matches!(c, '"' | '\'' | 'f' | 'r' | 'b' | 'u'))
                .collect();
            Some(!inner.is_empty())
        }
        _ => None,
    }
}

/// Short-circuit operators in a statement, not descending into nested
/// definitions (those get their own CFGs).
fn count_bool_ops(node: &AstNode) -> u32 {
    let mut count = 0;
    if node.kind == NodeKind::BoolOp {
        count += 1;
    }
    for child in &node.children {
        if matches!(
            child.kind,
            NodeKind::FunctionDef | NodeKind::ClassDef | NodeKind::Lambda
        ) {
            continue;
        }
        count += count_bool_ops(child);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parsing::parse_source;
    use indoc::indoc;

    fn cfg_for(source: &str) -> Cfg {
        let parsed = parse_source(Path::new("test.py"), source).unwrap();
        let funcs = parsed.ast.functions();
        assert!(!funcs.is_empty(), "no function in test source");
        build_function_cfg(Path::new("test.py"), funcs[0]).unwrap()
    }

    #[test]
    fn straight_line_is_one_block() {
        let cfg = cfg_for(indoc! {"
            def f():
                x = 1
                y = 2
                return x + y
        "});
        let reachable = cfg.reachable();
        assert!(reachable.iter().all(|r| *r));
        assert_eq!(cfg.decision_edges(), 0);
        assert_eq!(cfg.blocks[cfg.entry].statements.len(), 3);
    }

    #[test]
    fn if_else_rejoins() {
        let cfg = cfg_for(indoc! {"
            def f(a):
                if a:
                    x = 1
                else:
                    x = 2
                return x
        "});
        assert_eq!(cfg.decision_edges(), 1);
        assert!(cfg.reachable().iter().all(|r| *r));
        // entry, true body, else body, join
        assert_eq!(cfg.block_count(), 4);
    }

    #[test]
    fn while_loop_has_back_edge() {
        let cfg = cfg_for(indoc! {"
            def f(n):
                while n > 0:
                    n -= 1
                return n
        "});
        assert!(cfg.edges.iter().any(|e| e.kind == EdgeKind::LoopBack));
        assert_eq!(cfg.decision_edges(), 1);
    }

    #[test]
    fn break_jumps_to_follow() {
        let cfg = cfg_for(indoc! {"
            def f(items):
                for item in items:
                    if item:
                        break
                return items
        "});
        // for + if
        assert_eq!(cfg.decision_edges(), 2);
        assert!(cfg.reachable().iter().all(|r| *r));
    }

    #[test]
    fn statements_after_return_are_unreachable() {
        let cfg = cfg_for(indoc! {"
            def f():
                x = 1
                return x
                y = 2
        "});
        let reachable = cfg.reachable();
        let dead: Vec<_> = cfg
            .blocks
            .iter()
            .filter(|b| !reachable[b.id] && !b.statements.is_empty())
            .collect();
        assert_eq!(dead.len(), 1);
        assert_eq!(
            dead[0].cause,
            Some(UnreachableCause::AfterTerminator(NodeKind::Return))
        );
    }

    #[test]
    fn constant_false_branch_is_folded() {
        let cfg = cfg_for(indoc! {"
            def f():
                if False:
                    x = 1
                return 2
        "});
        let reachable = cfg.reachable();
        let dead: Vec<_> = cfg
            .blocks
            .iter()
            .filter(|b| !reachable[b.id] && !b.statements.is_empty())
            .collect();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].cause, Some(UnreachableCause::ConstantCondition));
        assert_eq!(cfg.folded_decisions, 1);
    }

    #[test]
    fn try_except_adds_exception_edges() {
        let cfg = cfg_for(indoc! {"
            def f():
                try:
                    risky()
                except ValueError:
                    handle()
                except KeyError:
                    other()
                return 1
        "});
        let exception_edges = cfg
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Exception)
            .count();
        assert_eq!(exception_edges, 2);
        assert_eq!(cfg.decision_edges(), 2);
        assert!(cfg.reachable().iter().all(|r| *r));
    }

    #[test]
    fn combined_branch_decision_count() {
        // one if/else + one while + try with two handlers = 4 decisions
        let cfg = cfg_for(indoc! {"
            def f(a, n):
                if a:
                    x = 1
                else:
                    x = 2
                while n > 0:
                    n -= 1
                try:
                    risky()
                except ValueError:
                    pass
                except KeyError:
                    pass
                return x
        "});
        assert_eq!(cfg.decision_edges() + cfg.folded_decisions + cfg.bool_ops, 4);
    }

    #[test]
    fn boolean_short_circuit_counts() {
        let cfg = cfg_for(indoc! {"
            def f(a, b):
                if a and b:
                    return 1
                return 0
        "});
        assert_eq!(cfg.bool_ops, 1);
        assert_eq!(cfg.decision_edges(), 1);
    }

    #[test]
    fn elif_chain_counts_each_test() {
        let cfg = cfg_for(indoc! {"
            def f(a):
                if a == 1:
                    return 1
                elif a == 2:
                    return 2
                elif a == 3:
                    return 3
                return 0
        "});
        assert_eq!(cfg.decision_edges(), 3);
        assert!(cfg.reachable().iter().all(|r| *r));
    }

    #[test]
    fn match_counts_arms_after_first() {
        let cfg = cfg_for(indoc! {"
            def f(x):
                match x:
                    case 1:
                        return 1
                    case 2:
                        return 2
                    case _:
                        return 0
        "});
        assert_eq!(cfg.decision_edges(), 2);
    }

    #[test]
    fn finally_runs_on_all_paths() {
        let cfg = cfg_for(indoc! {"
            def f():
                try:
                    return risky()
                finally:
                    cleanup()
        "});
        assert!(cfg.reachable().iter().all(|r| *r));
    }
}
