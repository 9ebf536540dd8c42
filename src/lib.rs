// Export modules for library usage
pub mod analyzers;
pub mod cancel;
pub mod cfg;
pub mod cli;
pub mod clones;
pub mod commands;
pub mod complexity;
pub mod config;
pub mod core;
pub mod coupling;
pub mod deadcode;
pub mod deps;
pub mod health;
pub mod io;
pub mod observability;
pub mod orchestrator;

// Re-export commonly used types
pub use crate::core::{
    AnalysisStatus, AnalyzeReport, ArchViolation, ClassCoupling, CloneGroup, ClonePair,
    CloneResponse, CloneSite, CloneType, ComplexityResponse, CouplingResponse, CycleReport,
    CycleSeverity, DeadCodeFinding, DeadCodeResponse, DependencyResponse, FunctionComplexity,
    Grade, HealthReport, ModuleReport, RiskLevel, Severity, Span,
};

pub use crate::core::errors::{Error, Result};

pub use crate::core::metrics::{
    calculate_average_complexity, count_high_risk, find_max_complexity,
};

pub use crate::analyzers::{all_analyses, Analysis, AnalysisContext, AnalysisOutcome};
pub use crate::cancel::CancelToken;
pub use crate::config::{CloneConfig, GroupMode, PyvetConfig};
pub use crate::io::output::{create_writer, OutputFormat, OutputWriter};
pub use crate::orchestrator::run_analyses;
