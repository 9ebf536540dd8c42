pub mod ast;
pub mod errors;
pub mod metrics;
pub mod parsing;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use ast::{AstNode, KindFamily, NodeKind, Span};
pub use errors::{Error, Result};
pub use parsing::{parse_file, parse_source, ParsedFile, SharedParse};

/// Risk classification shared by complexity and coupling metrics.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        };
        write!(f, "{s}")
    }
}

/// Dead-code finding severity.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

/// Severity of a circular dependency, by cycle size.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum CycleSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl CycleSeverity {
    /// Size bands: 2 → low, 3-4 → medium, 5-7 → high, 8+ → critical.
    pub fn from_cycle_size(size: usize) -> Self {
        match size {
            0..=2 => CycleSeverity::Low,
            3..=4 => CycleSeverity::Medium,
            5..=7 => CycleSeverity::High,
            _ => CycleSeverity::Critical,
        }
    }
}

// ---------------------------------------------------------------------------
// Complexity
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FunctionComplexity {
    pub name: String,
    pub file: PathBuf,
    pub span: Span,
    pub complexity: u32,
    pub risk: RiskLevel,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ComplexitySummary {
    pub total_functions: usize,
    pub average_complexity: f64,
    pub max_complexity: u32,
    pub high_risk_count: usize,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ComplexityResponse {
    pub functions: Vec<FunctionComplexity>,
    pub summary: ComplexitySummary,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Dead code
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DeadCodeFinding {
    pub file: PathBuf,
    pub function: String,
    pub span: Span,
    pub severity: Severity,
    pub reason: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DeadCodeSummary {
    pub total_findings: usize,
    pub critical_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DeadCodeResponse {
    pub findings: Vec<DeadCodeFinding>,
    pub summary: DeadCodeSummary,
    pub warnings: Vec<String>,
}

impl DeadCodeResponse {
    pub fn recount(&mut self) {
        self.summary.total_findings = self.findings.len();
        self.summary.critical_count = self
            .findings
            .iter()
            .filter(|f| f.severity == Severity::Critical)
            .count();
        self.summary.warning_count = self
            .findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
            .count();
        self.summary.info_count = self
            .findings
            .iter()
            .filter(|f| f.severity == Severity::Info)
            .count();
    }
}

// ---------------------------------------------------------------------------
// Clones
// ---------------------------------------------------------------------------

/// Clone taxonomy, from textually identical to semantically equivalent.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CloneType {
    Type1,
    Type2,
    Type3,
    Type4,
}

impl std::fmt::Display for CloneType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        static DISPLAY_STRINGS: &[(CloneType, &str)] = &[
            (CloneType::Type1, "type-1"),
            (CloneType::Type2, "type-2"),
            (CloneType::Type3, "type-3"),
            (CloneType::Type4, "type-4"),
        ];

        let display_str = DISPLAY_STRINGS
            .iter()
            .find(|(t, _)| t == self)
            .map(|(_, s)| *s)
            .unwrap_or("unknown");

        write!(f, "{display_str}")
    }
}

/// One endpoint of a clone pair.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CloneSite {
    pub id: usize,
    pub file: PathBuf,
    pub function: String,
    pub span: Span,
    pub node_count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClonePair {
    pub clone_a: CloneSite,
    pub clone_b: CloneSite,
    pub similarity: f64,
    pub edit_distance: f64,
    pub clone_type: CloneType,
    pub confidence: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CloneGroup {
    pub id: usize,
    pub members: Vec<CloneSite>,
    pub min_similarity: f64,
    pub dominant_type: CloneType,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CloneSummary {
    pub fragments_extracted: usize,
    pub candidate_pairs: usize,
    pub pairs_reported: usize,
    pub groups_reported: usize,
    pub duplication_percent: f64,
    pub lsh_used: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CloneResponse {
    pub pairs: Vec<ClonePair>,
    pub groups: Vec<CloneGroup>,
    pub summary: CloneSummary,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Coupling (CBO)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClassCoupling {
    pub class_name: String,
    pub file: PathBuf,
    pub span: Span,
    pub cbo: u32,
    pub risk: RiskLevel,
    /// Distinct external names the class depends on, sorted.
    pub depends_on: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CouplingSummary {
    pub total_classes: usize,
    pub average_cbo: f64,
    pub high_coupling_count: usize,
    pub high_coupling_ratio: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CouplingResponse {
    pub classes: Vec<ClassCoupling>,
    pub summary: CouplingSummary,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Dependencies
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModuleReport {
    pub name: String,
    pub file_path: PathBuf,
    pub is_package: bool,
    pub imports_out: Vec<String>,
    pub imports_in: Vec<String>,
    /// Martin instability `Ce / (Ca + Ce)`, 0 when isolated.
    pub instability: f64,
    pub abstractness: f64,
    /// Distance from the main sequence `|A + I - 1|`.
    pub distance: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CycleReport {
    pub modules: Vec<String>,
    pub severity: CycleSeverity,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchViolation {
    pub from_module: String,
    pub to_module: String,
    pub from_layer: String,
    pub to_layer: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DependencySummary {
    pub total_modules: usize,
    pub total_dependencies: usize,
    pub cycles_total: usize,
    pub modules_in_cycles: usize,
    pub max_depth: usize,
    pub main_sequence_deviation: f64,
    /// `None` when no architecture rules are configured.
    pub compliance: Option<f64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DependencyResponse {
    pub modules: Vec<ModuleReport>,
    pub cycles: Vec<CycleReport>,
    pub violations: Vec<ArchViolation>,
    pub summary: DependencySummary,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

/// Per-analysis status record collected by the orchestrator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisStatus {
    pub name: String,
    pub enabled: bool,
    pub started: bool,
    pub completed: bool,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl AnalysisStatus {
    pub fn disabled(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: false,
            started: false,
            completed: false,
            success: false,
            duration_ms: 0,
            error: None,
        }
    }
}

/// Letter grade derived from the composite health score.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        write!(f, "{s}")
    }
}

/// Composite health score with its per-signal penalty breakdown.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthReport {
    pub score: f64,
    pub grade: Grade,
    pub penalties: Vec<HealthPenalty>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthPenalty {
    pub signal: String,
    pub value: f64,
    pub penalty: f64,
}

/// The aggregated result of one `analyze` run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalyzeReport {
    pub project_path: PathBuf,
    pub timestamp: DateTime<Utc>,
    pub files_analyzed: usize,
    pub total_lines: usize,
    pub complexity: Option<ComplexityResponse>,
    pub dead_code: Option<DeadCodeResponse>,
    pub clones: Option<CloneResponse>,
    pub coupling: Option<CouplingResponse>,
    pub dependencies: Option<DependencyResponse>,
    pub statuses: Vec<AnalysisStatus>,
    pub health: HealthReport,
}

impl AnalyzeReport {
    /// True when any enabled analysis ended in failure.
    pub fn has_failures(&self) -> bool {
        self.statuses.iter().any(|s| s.enabled && !s.success)
    }

    /// True when the analyses surfaced quality issues worth failing a
    /// `check` run over.
    pub fn has_quality_issues(&self) -> bool {
        let high_complexity = self
            .complexity
            .as_ref()
            .map(|c| c.summary.high_risk_count > 0)
            .unwrap_or(false);
        let critical_dead = self
            .dead_code
            .as_ref()
            .map(|d| d.summary.critical_count > 0)
            .unwrap_or(false);
        let clones = self
            .clones
            .as_ref()
            .map(|c| c.summary.groups_reported > 0)
            .unwrap_or(false);
        let cycles = self
            .dependencies
            .as_ref()
            .map(|d| d.summary.cycles_total > 0 || !d.violations.is_empty())
            .unwrap_or(false);
        high_complexity || critical_dead || clones || cycles
    }
}
