//! The `check` command: quality gate with a pass/fail exit code.

use crate::commands::analyze::{run, AnalyzeArgs};
use crate::commands::{EXIT_ANALYSIS_ERROR, EXIT_CLEAN, EXIT_QUALITY_ISSUES};
use crate::config::ConfigOverrides;
use crate::core::errors::Result;
use colored::Colorize;
use std::path::PathBuf;

pub struct CheckArgs {
    pub paths: Vec<PathBuf>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub config_path: Option<PathBuf>,
}

pub fn handle_check(args: CheckArgs) -> Result<i32> {
    let analyze_args = AnalyzeArgs {
        paths: args.paths,
        include: args.include,
        exclude: args.exclude,
        recursive: true,
        report: false,
        overrides: ConfigOverrides::default(),
        config_path: args.config_path,
    };
    let (report, _) = run(&analyze_args)?;

    if report.has_failures() {
        eprintln!("{}", "check: analysis errors".red().bold());
        return Ok(EXIT_ANALYSIS_ERROR);
    }
    if report.has_quality_issues() {
        println!(
            "{} health {:.1} (grade {})",
            "check: quality issues found".yellow().bold(),
            report.health.score,
            report.health.grade
        );
        return Ok(EXIT_QUALITY_ISSUES);
    }
    println!(
        "{} health {:.1} (grade {})",
        "check: clean".green().bold(),
        report.health.score,
        report.health.grade
    );
    Ok(EXIT_CLEAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use tempfile::TempDir;

    fn check_dir(dir: &TempDir) -> i32 {
        handle_check(CheckArgs {
            paths: vec![dir.path().to_path_buf()],
            include: Vec::new(),
            exclude: Vec::new(),
            config_path: None,
        })
        .unwrap()
    }

    #[test]
    fn clean_project_exits_zero() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("ok.py"), "def f():\n    return 1\n").unwrap();
        assert_eq!(check_dir(&dir), EXIT_CLEAN);
    }

    #[test]
    fn dead_code_fails_the_gate() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("bad.py"),
            indoc! {"
                def f():
                    return 1
                    x = 2
            "},
        )
        .unwrap();
        assert_eq!(check_dir(&dir), EXIT_QUALITY_ISSUES);
    }
}
