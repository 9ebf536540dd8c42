//! One runner per analysis, sharing a parsed-file corpus.
//!
//! Each runner exposes `run(ctx) → outcome`; file-level failures are
//! recovered inside the runner, analysis-level failures surface on the
//! outcome without short-circuiting sibling analyses.

use crate::cancel::CancelToken;
use crate::clones;
use crate::complexity::{self, ComplexityThresholds};
use crate::config::PyvetConfig;
use crate::core::errors::Error;
use crate::core::metrics::{calculate_average_complexity, count_high_risk, find_max_complexity};
use crate::core::parsing::{self, SharedParse};
use crate::core::{
    CloneResponse, ComplexityResponse, ComplexitySummary, CouplingResponse, DeadCodeResponse,
    DependencyResponse,
};
use crate::coupling;
use crate::deadcode;
use crate::deps;
use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Shared input corpus for one run. ASTs are parsed once, up front, and
/// shared read-only between analyses.
pub struct AnalysisContext {
    pub config: PyvetConfig,
    pub project_root: PathBuf,
    pub files: Vec<SharedParse>,
    pub parse_warnings: Vec<String>,
    pub cancel: CancelToken,
}

impl AnalysisContext {
    /// Parse every discovered file on a bounded worker pool. The file
    /// queue is capped at four entries per worker so discovery never runs
    /// far ahead of parsing. Files that fail to parse are skipped with a
    /// recorded warning.
    pub fn build(
        config: PyvetConfig,
        project_root: PathBuf,
        paths: &[PathBuf],
        cancel: CancelToken,
    ) -> Self {
        let workers = rayon::current_num_threads().max(1);
        let (tx, rx) = crossbeam::channel::bounded::<(usize, PathBuf)>(4 * workers);
        let results: Mutex<Vec<(usize, Result<SharedParse, String>)>> =
            Mutex::new(Vec::with_capacity(paths.len()));

        std::thread::scope(|scope| {
            scope.spawn(move || {
                for (i, path) in paths.iter().enumerate() {
                    if tx.send((i, path.clone())).is_err() {
                        break;
                    }
                }
            });
            for _ in 0..workers {
                let rx = rx.clone();
                let results = &results;
                scope.spawn(move || {
                    for (i, path) in rx.iter() {
                        let outcome = match parsing::parse_file(&path) {
                            Ok(parsed) => Ok(Arc::new(parsed)),
                            Err(e) => {
                                warn!(file = %path.display(), error = %e, "skipping unparsable file");
                                Err(e.to_string())
                            }
                        };
                        results.lock().push((i, outcome));
                    }
                });
            }
        });

        let mut collected = results.into_inner();
        collected.sort_by_key(|(i, _)| *i);
        let mut files = Vec::new();
        let mut parse_warnings = Vec::new();
        for (_, result) in collected {
            match result {
                Ok(parsed) => files.push(parsed),
                Err(message) => parse_warnings.push(message),
            }
        }
        // Deterministic corpus order regardless of discovery order.
        files.sort_by(|a, b| a.path.cmp(&b.path));

        Self {
            config,
            project_root,
            files,
            parse_warnings,
            cancel,
        }
    }

    pub fn total_lines(&self) -> usize {
        self.files.iter().map(|f| f.total_lines()).sum()
    }
}

/// A typed analysis response, one variant per analysis.
#[derive(Clone, Debug)]
pub enum AnalysisResponse {
    Complexity(ComplexityResponse),
    DeadCode(DeadCodeResponse),
    Clones(CloneResponse),
    Coupling(CouplingResponse),
    Dependencies(DependencyResponse),
}

/// What a runner hands back: possibly a partial response, possibly an
/// error, possibly both (timeout with partial results).
pub struct AnalysisOutcome {
    pub response: Option<AnalysisResponse>,
    pub error: Option<Error>,
}

impl AnalysisOutcome {
    fn ok(response: AnalysisResponse) -> Self {
        Self {
            response: Some(response),
            error: None,
        }
    }

    fn partial(response: AnalysisResponse, error: Error) -> Self {
        Self {
            response: Some(response),
            error: Some(error),
        }
    }
}

/// The single-operation abstraction the orchestrator drives.
pub trait Analysis: Sync {
    fn name(&self) -> &'static str;
    fn enabled(&self, config: &PyvetConfig) -> bool;
    fn run(&self, ctx: &AnalysisContext) -> AnalysisOutcome;
}

/// All runners in their fixed reporting order.
pub fn all_analyses() -> Vec<Box<dyn Analysis>> {
    vec![
        Box::new(ComplexityAnalysis),
        Box::new(DeadCodeAnalysis),
        Box::new(CloneAnalysis),
        Box::new(CouplingAnalysis),
        Box::new(DependencyAnalysis),
    ]
}

pub struct ComplexityAnalysis;

impl Analysis for ComplexityAnalysis {
    fn name(&self) -> &'static str {
        "complexity"
    }

    fn enabled(&self, config: &PyvetConfig) -> bool {
        config.complexity.enabled
    }

    fn run(&self, ctx: &AnalysisContext) -> AnalysisOutcome {
        let thresholds = ComplexityThresholds {
            low: ctx.config.complexity.low_threshold,
            medium: ctx.config.complexity.medium_threshold,
        };
        let mut warnings = ctx.parse_warnings.clone();
        let per_file: Vec<_> = ctx
            .files
            .par_iter()
            .map(|parsed| complexity::analyze_file(parsed, thresholds))
            .collect();

        let mut functions = Vec::new();
        for (parsed, result) in ctx.files.iter().zip(per_file) {
            match result {
                Ok(metrics) => functions.extend(metrics),
                Err(e) => {
                    warn!(file = %parsed.path.display(), error = %e, "complexity analysis skipped file");
                    warnings.push(format!("{}: {e}", parsed.path.display()));
                }
            }
        }
        let min = ctx.config.complexity.min_complexity;
        if min > 0 {
            functions.retain(|f| f.complexity >= min);
        }
        let max = ctx.config.complexity.max_complexity;
        if max > 0 {
            functions.retain(|f| f.complexity <= max);
        }
        functions.sort_by(|a, b| {
            (&a.file, a.span.start_line, &a.name).cmp(&(&b.file, b.span.start_line, &b.name))
        });
        if ctx.config.output.sort_by == "complexity" {
            functions.sort_by(|a, b| b.complexity.cmp(&a.complexity));
        }

        let summary = ComplexitySummary {
            total_functions: functions.len(),
            average_complexity: calculate_average_complexity(&functions),
            max_complexity: find_max_complexity(&functions),
            high_risk_count: count_high_risk(&functions),
        };
        AnalysisOutcome::ok(AnalysisResponse::Complexity(ComplexityResponse {
            functions,
            summary,
            warnings,
        }))
    }
}

pub struct DeadCodeAnalysis;

impl Analysis for DeadCodeAnalysis {
    fn name(&self) -> &'static str {
        "dead_code"
    }

    fn enabled(&self, config: &PyvetConfig) -> bool {
        config.dead_code.enabled
    }

    fn run(&self, ctx: &AnalysisContext) -> AnalysisOutcome {
        let min_severity = match ctx.config.dead_code.min_severity() {
            Ok(severity) => severity,
            Err(e) => {
                return AnalysisOutcome {
                    response: None,
                    error: Some(e),
                }
            }
        };
        let mut warnings = ctx.parse_warnings.clone();
        let per_file: Vec<_> = ctx
            .files
            .par_iter()
            .map(|parsed| deadcode::analyze_file(parsed))
            .collect();

        let mut findings = Vec::new();
        for (parsed, result) in ctx.files.iter().zip(per_file) {
            match result {
                Ok(file_findings) => findings.extend(file_findings),
                Err(e) => {
                    warn!(file = %parsed.path.display(), error = %e, "dead-code analysis skipped file");
                    warnings.push(format!("{}: {e}", parsed.path.display()));
                }
            }
        }
        findings.retain(|f| f.severity >= min_severity);
        findings.sort_by(|a, b| {
            (&a.file, a.span.start_line, a.span.start_col)
                .cmp(&(&b.file, b.span.start_line, b.span.start_col))
        });
        if ctx.config.output.sort_by == "severity" {
            findings.sort_by(|a, b| b.severity.cmp(&a.severity));
        }

        let mut response = DeadCodeResponse {
            findings,
            warnings,
            ..Default::default()
        };
        response.recount();
        AnalysisOutcome::ok(AnalysisResponse::DeadCode(response))
    }
}

pub struct CloneAnalysis;

impl Analysis for CloneAnalysis {
    fn name(&self) -> &'static str {
        "clones"
    }

    fn enabled(&self, config: &PyvetConfig) -> bool {
        config.clone.enabled
    }

    fn run(&self, ctx: &AnalysisContext) -> AnalysisOutcome {
        let timeout = Duration::from_secs(ctx.config.clone.timeout_seconds);
        let token = ctx.cancel.child_with_timeout(timeout);
        let mut response =
            clones::detect_clones(&ctx.files, &ctx.config.clone, &token, ctx.total_lines());
        response.warnings.extend(ctx.parse_warnings.iter().cloned());
        if token.is_cancelled() {
            let error = Error::timeout("clones", ctx.config.clone.timeout_seconds);
            return AnalysisOutcome::partial(AnalysisResponse::Clones(response), error);
        }
        AnalysisOutcome::ok(AnalysisResponse::Clones(response))
    }
}

pub struct CouplingAnalysis;

impl Analysis for CouplingAnalysis {
    fn name(&self) -> &'static str {
        "cbo"
    }

    fn enabled(&self, config: &PyvetConfig) -> bool {
        config.cbo.enabled
    }

    fn run(&self, ctx: &AnalysisContext) -> AnalysisOutcome {
        let known_classes: BTreeSet<String> = ctx
            .files
            .iter()
            .flat_map(|parsed| coupling::class_names(parsed))
            .collect();

        let mut classes: Vec<_> = ctx
            .files
            .par_iter()
            .flat_map_iter(|parsed| coupling::analyze_file(parsed, &ctx.config.cbo, &known_classes))
            .collect();
        classes.sort_by(|a, b| {
            (&a.file, a.span.start_line, &a.class_name)
                .cmp(&(&b.file, b.span.start_line, &b.class_name))
        });

        let mut response = coupling::summarize(classes);
        response.warnings.extend(ctx.parse_warnings.iter().cloned());
        AnalysisOutcome::ok(AnalysisResponse::Coupling(response))
    }
}

pub struct DependencyAnalysis;

impl Analysis for DependencyAnalysis {
    fn name(&self) -> &'static str {
        "deps"
    }

    fn enabled(&self, config: &PyvetConfig) -> bool {
        config.deps.enabled
    }

    fn run(&self, ctx: &AnalysisContext) -> AnalysisOutcome {
        let mut response = deps::analyze_dependencies(
            &ctx.files,
            &ctx.project_root,
            &ctx.config.deps,
            &ctx.config.architecture,
        );
        response.warnings.extend(ctx.parse_warnings.iter().cloned());
        AnalysisOutcome::ok(AnalysisResponse::Dependencies(response))
    }
}

/// Resolve the project root for a set of input paths: the first directory,
/// or the parent of the first file.
pub fn project_root_of(paths: &[PathBuf]) -> PathBuf {
    match paths.first() {
        Some(path) if path.is_dir() => path.clone(),
        Some(path) => path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
        None => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use tempfile::TempDir;

    fn context_for(sources: &[(&str, &str)]) -> (TempDir, AnalysisContext) {
        let dir = TempDir::new().unwrap();
        let mut paths = Vec::new();
        for (name, content) in sources {
            let path = dir.path().join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&path, content).unwrap();
            paths.push(path);
        }
        let ctx = AnalysisContext::build(
            PyvetConfig::default(),
            dir.path().to_path_buf(),
            &paths,
            CancelToken::new(),
        );
        (dir, ctx)
    }

    #[test]
    fn unparsable_files_become_warnings() {
        let (_dir, ctx) = context_for(&[
            ("good.py", "def f():\n    return 1\n"),
            ("bad.py", "def broken(:\n"),
        ]);
        assert_eq!(ctx.files.len(), 1);
        assert_eq!(ctx.parse_warnings.len(), 1);

        let outcome = ComplexityAnalysis.run(&ctx);
        match outcome.response.unwrap() {
            AnalysisResponse::Complexity(response) => {
                assert_eq!(response.summary.total_functions, 1);
                assert_eq!(response.warnings.len(), 1);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn corpus_order_is_deterministic() {
        let (_dir, ctx) = context_for(&[("b.py", "x = 1\n"), ("a.py", "y = 2\n")]);
        let names: Vec<String> = ctx
            .files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.py", "b.py"]);
    }

    #[test]
    fn dead_code_min_severity_filters() {
        let source = indoc! {"
            def f():
                if False:
                    x = 1
                return 2
        "};
        let (_dir, mut ctx) = context_for(&[("m.py", source)]);
        ctx.config.dead_code.min_severity = "critical".to_string();
        let outcome = DeadCodeAnalysis.run(&ctx);
        match outcome.response.unwrap() {
            AnalysisResponse::DeadCode(response) => {
                // the constant-condition warning is filtered out
                assert_eq!(response.summary.total_findings, 0);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn all_analyses_have_unique_names() {
        let names: Vec<&str> = all_analyses().iter().map(|a| a.name()).collect();
        let unique: BTreeSet<&str> = names.iter().copied().collect();
        assert_eq!(names.len(), unique.len());
    }
}
