//! Fans analyses out across worker threads and aggregates the report.
//!
//! One OS thread per enabled analysis; file-level parallelism inside each
//! analysis runs on the shared rayon pool. Failures are recorded on the
//! per-analysis status record and never short-circuit siblings.

use crate::analyzers::{all_analyses, AnalysisContext, AnalysisOutcome, AnalysisResponse};
use crate::cancel::CancelToken;
use crate::config::PyvetConfig;
use crate::core::errors::{Error, Result};
use crate::core::{AnalysisStatus, AnalyzeReport};
use crate::health::{self, HealthInputs};
use chrono::Utc;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Run every enabled analysis over the discovered files and compose the
/// aggregated report. Returns an error only for input and configuration
/// problems; analysis failures land on the status records.
pub fn run_analyses(
    config: PyvetConfig,
    project_root: PathBuf,
    files: &[PathBuf],
) -> Result<AnalyzeReport> {
    config.validate()?;
    if files.is_empty() {
        return Err(Error::input("no Python source files to analyze"));
    }

    let cancel = CancelToken::with_deadline(Duration::from_secs(config.deadline_seconds));
    let started = Instant::now();
    let ctx = AnalysisContext::build(config, project_root.clone(), files, cancel);
    info!(
        files = ctx.files.len(),
        skipped = ctx.parse_warnings.len(),
        "corpus parsed in {:?}",
        started.elapsed()
    );

    let analyses = all_analyses();
    let mut statuses: Vec<AnalysisStatus> = Vec::with_capacity(analyses.len());
    let mut outcomes: Vec<Option<AnalysisOutcome>> = Vec::with_capacity(analyses.len());

    std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(analyses.len());
        for analysis in &analyses {
            if !analysis.enabled(&ctx.config) {
                handles.push(None);
                continue;
            }
            let ctx_ref = &ctx;
            handles.push(Some(scope.spawn(move || {
                let begun = Instant::now();
                let outcome = analysis.run(ctx_ref);
                (begun.elapsed(), outcome)
            })));
        }

        for (analysis, handle) in analyses.iter().zip(handles) {
            match handle {
                None => {
                    statuses.push(AnalysisStatus::disabled(analysis.name()));
                    outcomes.push(None);
                }
                Some(handle) => match handle.join() {
                    Ok((duration, outcome)) => {
                        let error_text = outcome.error.as_ref().map(|e| e.to_string());
                        if let Some(ref message) = error_text {
                            warn!(analysis = analysis.name(), error = %message, "analysis failed");
                        }
                        statuses.push(AnalysisStatus {
                            name: analysis.name().to_string(),
                            enabled: true,
                            started: true,
                            completed: outcome.response.is_some(),
                            success: outcome.error.is_none(),
                            duration_ms: duration.as_millis() as u64,
                            error: error_text,
                        });
                        outcomes.push(Some(outcome));
                    }
                    Err(panic) => {
                        statuses.push(AnalysisStatus {
                            name: analysis.name().to_string(),
                            enabled: true,
                            started: true,
                            completed: false,
                            success: false,
                            duration_ms: started.elapsed().as_millis() as u64,
                            error: Some(format!("analysis panicked: {panic:?}")),
                        });
                        outcomes.push(None);
                    }
                },
            }
        }
    });

    let mut report = AnalyzeReport {
        project_path: project_root,
        timestamp: Utc::now(),
        files_analyzed: ctx.files.len(),
        total_lines: ctx.total_lines(),
        complexity: None,
        dead_code: None,
        clones: None,
        coupling: None,
        dependencies: None,
        statuses,
        health: health::score(&HealthInputs::default()),
    };

    for outcome in outcomes.into_iter().flatten() {
        match outcome.response {
            Some(AnalysisResponse::Complexity(r)) => report.complexity = Some(r),
            Some(AnalysisResponse::DeadCode(r)) => report.dead_code = Some(r),
            Some(AnalysisResponse::Clones(r)) => report.clones = Some(r),
            Some(AnalysisResponse::Coupling(r)) => report.coupling = Some(r),
            Some(AnalysisResponse::Dependencies(r)) => report.dependencies = Some(r),
            None => {}
        }
    }

    report.health = health::score(&HealthInputs::gather(
        report.files_analyzed,
        report.complexity.as_ref(),
        report.dead_code.as_ref(),
        report.clones.as_ref(),
        report.coupling.as_ref(),
        report.dependencies.as_ref(),
    ));
    Ok(report)
}
