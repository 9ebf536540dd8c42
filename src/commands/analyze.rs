//! The `analyze` command: discover, run, and render.

use crate::cli::Commands;
use crate::commands::{EXIT_ANALYSIS_ERROR, EXIT_CLEAN};
use crate::config::{ConfigOverrides, PyvetConfig};
use crate::core::errors::{Error, Result};
use crate::core::AnalyzeReport;
use crate::io::output::{self, OutputFormat};
use crate::io::{progress, walker};
use crate::orchestrator;
use crate::{analyzers, cli};
use std::path::PathBuf;
use tracing::info;

pub struct AnalyzeArgs {
    pub paths: Vec<PathBuf>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub recursive: bool,
    pub report: bool,
    pub overrides: ConfigOverrides,
    pub config_path: Option<PathBuf>,
}

impl AnalyzeArgs {
    pub fn from_command(command: &Commands, config_path: Option<PathBuf>) -> Option<Self> {
        match command {
            Commands::Analyze {
                paths,
                include,
                exclude,
                no_recursive,
                report,
                ..
            } => Some(Self {
                paths: paths.clone(),
                include: include.clone(),
                exclude: exclude.clone(),
                recursive: !no_recursive,
                report: *report,
                overrides: cli::overrides_from(command),
                config_path,
            }),
            _ => None,
        }
    }
}

/// Run a full analysis; returns the process exit code.
pub fn handle_analyze(args: AnalyzeArgs) -> Result<i32> {
    let (report, config) = run(&args)?;

    let format: OutputFormat = config.output.format.parse()?;
    let mut writer = output::create_writer(format, Box::new(std::io::stdout()));
    writer.write_report(&report)?;

    if args.report {
        let directory = report.project_path.join(&config.output.directory);
        let path = output::write_report_file(&report, &directory, format)?;
        info!(path = %path.display(), "report written");
    }
    // the colored recap only makes sense when a human is watching stdout
    if format != OutputFormat::Text
        && progress::is_interactive()
        && std::io::IsTerminal::is_terminal(&std::io::stdout())
    {
        output::print_summary(&report);
    }

    let code = if report.has_failures() {
        EXIT_ANALYSIS_ERROR
    } else {
        EXIT_CLEAN
    };
    Ok(code)
}

/// Shared by `analyze` and `check`: load config, discover files, run the
/// orchestrator.
pub fn run(args: &AnalyzeArgs) -> Result<(AnalyzeReport, PyvetConfig)> {
    let project_root = analyzers::project_root_of(&args.paths);
    let mut config = match args.config_path {
        Some(ref path) => PyvetConfig::from_file(path)?,
        None => PyvetConfig::load(&project_root)?,
    };
    config.apply_overrides(&args.overrides);
    config.validate()?;

    let files = walker::collect_files(&args.paths, args.recursive, &args.include, &args.exclude)?;
    if files.is_empty() {
        return Err(Error::input(format!(
            "no Python files found under {}",
            args.paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    let bar = progress::spinner("analyzing");
    let report = orchestrator::run_analyses(config.clone(), project_root, &files);
    bar.finish_and_clear();
    let report = report?;

    print_failure_summary(&report);
    Ok((report, config))
}

/// Categorized summary of failed analyses with recovery hints; always
/// printed to stderr, never to the report sink.
fn print_failure_summary(report: &AnalyzeReport) {
    for status in report.statuses.iter().filter(|s| s.enabled && !s.success) {
        eprintln!(
            "warning: analysis '{}' failed: {}",
            status.name,
            status.error.as_deref().unwrap_or("unknown error")
        );
        if let Some(ref message) = status.error {
            if message.contains("timed out") {
                eprintln!("  hint: raise the analysis timeout or narrow the input set");
            }
        }
    }
}
