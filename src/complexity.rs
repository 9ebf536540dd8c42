//! Cyclomatic complexity from control-flow graphs.
//!
//! `V = E − N + 2P`, computed as 1 plus the decision edges the CFG builder
//! flagged: every `if`/`elif`/`while`/`for` test, every `except` handler,
//! each `match` arm after the first, and each boolean short-circuit
//! operator. Decisions folded away by constant conditions still count.

use crate::cfg::{self, Cfg};
use crate::core::errors::Result;
use crate::core::parsing::ParsedFile;
use crate::core::{FunctionComplexity, RiskLevel};

/// Complexity risk thresholds; inclusive upper bounds for low and medium.
#[derive(Clone, Copy, Debug)]
pub struct ComplexityThresholds {
    pub low: u32,
    pub medium: u32,
}

impl Default for ComplexityThresholds {
    fn default() -> Self {
        Self { low: 9, medium: 19 }
    }
}

pub fn cyclomatic(cfg: &Cfg) -> u32 {
    1 + cfg.decision_edges() + cfg.folded_decisions + cfg.bool_ops
}

pub fn risk_level(complexity: u32, thresholds: ComplexityThresholds) -> RiskLevel {
    if complexity <= thresholds.low {
        RiskLevel::Low
    } else if complexity <= thresholds.medium {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// Compute per-function complexity for every function in a parsed file.
pub fn analyze_file(
    parsed: &ParsedFile,
    thresholds: ComplexityThresholds,
) -> Result<Vec<FunctionComplexity>> {
    let mut metrics = Vec::new();
    for func in parsed.ast.functions() {
        let graph = cfg::build_function_cfg(&parsed.path, func)?;
        let complexity = cyclomatic(&graph);
        metrics.push(FunctionComplexity {
            name: graph.function.clone(),
            file: parsed.path.clone(),
            span: graph.span,
            complexity,
            risk: risk_level(complexity, thresholds),
        });
    }
    Ok(metrics)
}
