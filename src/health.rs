//! Composite health score and letter grade.
//!
//! Deterministic penalty table over the aggregated analysis signals; the
//! composite is floored at 10 and graded A through F.

use crate::core::{
    CloneResponse, ComplexityResponse, CouplingResponse, DeadCodeResponse, DependencyResponse,
    Grade, HealthPenalty, HealthReport,
};

/// Everything the score depends on, extracted from the responses.
#[derive(Clone, Copy, Debug, Default)]
pub struct HealthInputs {
    pub files_analyzed: usize,
    pub average_complexity: f64,
    pub duplication_percent: f64,
    pub high_coupling_ratio: f64,
    pub critical_dead_code: usize,
    pub modules_total: usize,
    pub modules_in_cycles: usize,
    pub max_depth: usize,
    pub main_sequence_deviation: f64,
    pub compliance: Option<f64>,
}

impl HealthInputs {
    pub fn gather(
        files_analyzed: usize,
        complexity: Option<&ComplexityResponse>,
        dead_code: Option<&DeadCodeResponse>,
        clones: Option<&CloneResponse>,
        coupling: Option<&CouplingResponse>,
        dependencies: Option<&DependencyResponse>,
    ) -> Self {
        Self {
            files_analyzed,
            average_complexity: complexity
                .map(|c| c.summary.average_complexity)
                .unwrap_or(0.0),
            duplication_percent: clones
                .map(|c| c.summary.duplication_percent)
                .unwrap_or(0.0),
            high_coupling_ratio: coupling
                .map(|c| c.summary.high_coupling_ratio)
                .unwrap_or(0.0),
            critical_dead_code: dead_code.map(|d| d.summary.critical_count).unwrap_or(0),
            modules_total: dependencies.map(|d| d.summary.total_modules).unwrap_or(0),
            modules_in_cycles: dependencies
                .map(|d| d.summary.modules_in_cycles)
                .unwrap_or(0),
            max_depth: dependencies.map(|d| d.summary.max_depth).unwrap_or(0),
            main_sequence_deviation: dependencies
                .map(|d| d.summary.main_sequence_deviation)
                .unwrap_or(0.0),
            compliance: dependencies.and_then(|d| d.summary.compliance),
        }
    }
}

fn banded(value: f64, bands: [(f64, f64); 3]) -> f64 {
    for (threshold, penalty) in bands {
        if value > threshold {
            return penalty;
        }
    }
    0.0
}

/// Compute the composite score with its penalty breakdown.
pub fn score(inputs: &HealthInputs) -> HealthReport {
    let mut penalties = Vec::new();
    let mut push = |signal: &str, value: f64, penalty: f64| {
        if penalty > 0.0 {
            penalties.push(HealthPenalty {
                signal: signal.to_string(),
                value,
                penalty,
            });
        }
        penalty
    };

    let mut total = 0.0;
    total += push(
        "average_complexity",
        inputs.average_complexity,
        banded(inputs.average_complexity, [(20.0, 20.0), (10.0, 12.0), (5.0, 6.0)]),
    );
    total += push(
        "duplication_percent",
        inputs.duplication_percent,
        banded(inputs.duplication_percent, [(20.0, 20.0), (10.0, 12.0), (3.0, 6.0)]),
    );
    total += push(
        "high_coupling_ratio",
        inputs.high_coupling_ratio,
        banded(inputs.high_coupling_ratio, [(0.5, 16.0), (0.3, 10.0), (0.1, 5.0)]),
    );

    // Critical dead code, normalized for large projects.
    let norm = if inputs.files_analyzed > 10 {
        1.0 + (inputs.files_analyzed as f64 / 10.0).log10()
    } else {
        1.0
    };
    total += push(
        "critical_dead_code",
        inputs.critical_dead_code as f64,
        (inputs.critical_dead_code as f64 / norm).min(20.0),
    );

    let cycles_fraction = if inputs.modules_total > 0 {
        inputs.modules_in_cycles as f64 / inputs.modules_total as f64
    } else {
        0.0
    };
    total += push("cycles_fraction", cycles_fraction, cycles_fraction * 8.0);

    let allowed_depth = allowed_depth(inputs.modules_total);
    let depth_excess = inputs.max_depth.saturating_sub(allowed_depth) as f64;
    total += push("depth_excess", depth_excess, depth_excess.min(2.0));

    total += push(
        "main_sequence_deviation",
        inputs.main_sequence_deviation,
        inputs.main_sequence_deviation.clamp(0.0, 1.0) * 2.0,
    );

    if let Some(compliance) = inputs.compliance {
        let non_compliance = (1.0 - compliance).clamp(0.0, 1.0);
        total += push("architecture_non_compliance", non_compliance, non_compliance * 8.0);
    }

    let score = (100.0 - total).clamp(10.0, 100.0);
    HealthReport {
        score,
        grade: grade(score),
        penalties,
    }
}

/// Depth budget `max(3, ⌈log2(N + 1)⌉ + 1)`.
fn allowed_depth(modules: usize) -> usize {
    let log = ((modules + 1) as f64).log2().ceil() as usize;
    3.max(log + 1)
}

pub fn grade(score: f64) -> Grade {
    if score >= 85.0 {
        Grade::A
    } else if score >= 70.0 {
        Grade::B
    } else if score >= 55.0 {
        Grade::C
    } else if score >= 40.0 {
        Grade::D
    } else {
        Grade::F
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_project_scores_100() {
        let report = score(&HealthInputs::default());
        assert_eq!(report.score, 100.0);
        assert_eq!(report.grade, Grade::A);
        assert!(report.penalties.is_empty());
    }

    #[test]
    fn complexity_bands() {
        let mut inputs = HealthInputs::default();
        inputs.average_complexity = 6.0;
        assert_eq!(score(&inputs).score, 94.0);
        inputs.average_complexity = 11.0;
        assert_eq!(score(&inputs).score, 88.0);
        inputs.average_complexity = 25.0;
        assert_eq!(score(&inputs).score, 80.0);
    }

    #[test]
    fn score_is_floored_at_10() {
        let inputs = HealthInputs {
            files_analyzed: 5,
            average_complexity: 30.0,
            duplication_percent: 40.0,
            high_coupling_ratio: 0.9,
            critical_dead_code: 50,
            modules_total: 10,
            modules_in_cycles: 10,
            max_depth: 30,
            main_sequence_deviation: 1.0,
            compliance: Some(0.0),
        };
        let report = score(&inputs);
        assert_eq!(report.score, 10.0);
        assert_eq!(report.grade, Grade::F);
    }

    #[test]
    fn dead_code_normalization_kicks_in_above_ten_files() {
        let small = HealthInputs {
            files_analyzed: 10,
            critical_dead_code: 10,
            ..Default::default()
        };
        let large = HealthInputs {
            files_analyzed: 1000,
            critical_dead_code: 10,
            ..Default::default()
        };
        // same count hurts less in a larger project
        assert!(score(&large).score > score(&small).score);
    }

    #[test]
    fn grade_mapping_is_total() {
        assert_eq!(grade(100.0), Grade::A);
        assert_eq!(grade(85.0), Grade::A);
        assert_eq!(grade(84.9), Grade::B);
        assert_eq!(grade(70.0), Grade::B);
        assert_eq!(grade(55.0), Grade::C);
        assert_eq!(grade(40.0), Grade::D);
        assert_eq!(grade(39.9), Grade::F);
        assert_eq!(grade(0.0), Grade::F);
    }

    #[test]
    fn architecture_penalty_only_when_configured() {
        let mut inputs = HealthInputs::default();
        inputs.compliance = None;
        assert_eq!(score(&inputs).score, 100.0);
        inputs.compliance = Some(0.5);
        assert_eq!(score(&inputs).score, 96.0);
    }

    #[test]
    fn depth_excess_is_capped() {
        let inputs = HealthInputs {
            modules_total: 4,
            max_depth: 50,
            ..Default::default()
        };
        let report = score(&inputs);
        assert_eq!(report.score, 98.0);
    }
}
