//! Pure aggregation helpers over per-function complexity metrics.

use crate::core::{FunctionComplexity, RiskLevel};

pub fn calculate_average_complexity(functions: &[FunctionComplexity]) -> f64 {
    if functions.is_empty() {
        return 0.0;
    }
    let total: u64 = functions.iter().map(|f| f.complexity as u64).sum();
    total as f64 / functions.len() as f64
}

pub fn find_max_complexity(functions: &[FunctionComplexity]) -> u32 {
    functions.iter().map(|f| f.complexity).max().unwrap_or(0)
}

pub fn count_high_risk(functions: &[FunctionComplexity]) -> usize {
    functions
        .iter()
        .filter(|f| f.risk == RiskLevel::High)
        .count()
}
