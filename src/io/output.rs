//! Report writers: text, json, yaml, csv, html, and dot sinks.
//!
//! Writers are pure sinks over `io::Write`; the colored console summary
//! lives in [`print_summary`] and is only used for terminal output.

use crate::core::errors::{Error, Result};
use crate::core::{AnalyzeReport, Severity};
use colored::Colorize;
use comfy_table::Table;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
    Csv,
    Html,
    Dot,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
            OutputFormat::Csv => "csv",
            OutputFormat::Html => "html",
            OutputFormat::Dot => "dot",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            "csv" => Ok(OutputFormat::Csv),
            "html" => Ok(OutputFormat::Html),
            "dot" => Ok(OutputFormat::Dot),
            other => Err(Error::config(format!("unknown output format: {other}"))),
        }
    }
}

pub trait OutputWriter {
    fn write_report(&mut self, report: &AnalyzeReport) -> Result<()>;
}

pub fn create_writer(format: OutputFormat, sink: Box<dyn Write>) -> Box<dyn OutputWriter> {
    match format {
        OutputFormat::Text => Box::new(TextWriter::new(sink)),
        OutputFormat::Json => Box::new(JsonWriter::new(sink)),
        OutputFormat::Yaml => Box::new(YamlWriter::new(sink)),
        OutputFormat::Csv => Box::new(CsvWriter::new(sink)),
        OutputFormat::Html => Box::new(HtmlWriter::new(sink)),
        OutputFormat::Dot => Box::new(DotWriter::new(sink)),
    }
}

/// Write the report to `<directory>/analyze_YYYYMMDD_HHMMSS.<ext>` and
/// return the path.
pub fn write_report_file(
    report: &AnalyzeReport,
    directory: &Path,
    format: OutputFormat,
) -> Result<PathBuf> {
    std::fs::create_dir_all(directory)
        .map_err(|e| Error::output(format!("cannot create {}: {e}", directory.display())))?;
    let stamp = report.timestamp.format("%Y%m%d_%H%M%S");
    let path = directory.join(format!("analyze_{stamp}.{}", format.extension()));
    let file = std::fs::File::create(&path)
        .map_err(|e| Error::output(format!("cannot create {}: {e}", path.display())))?;
    create_writer(format, Box::new(file)).write_report(report)?;
    Ok(path)
}

fn out_err(e: std::io::Error) -> Error {
    Error::output(e.to_string())
}

pub struct JsonWriter<W: Write> {
    sink: W,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }
}

impl<W: Write> OutputWriter for JsonWriter<W> {
    fn write_report(&mut self, report: &AnalyzeReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;
        self.sink.write_all(json.as_bytes()).map_err(out_err)?;
        self.sink.write_all(b"\n").map_err(out_err)?;
        Ok(())
    }
}

pub struct YamlWriter<W: Write> {
    sink: W,
}

impl<W: Write> YamlWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }
}

impl<W: Write> OutputWriter for YamlWriter<W> {
    fn write_report(&mut self, report: &AnalyzeReport) -> Result<()> {
        let yaml =
            serde_yaml::to_string(report).map_err(|e| Error::output(e.to_string()))?;
        self.sink.write_all(yaml.as_bytes()).map_err(out_err)?;
        Ok(())
    }
}

pub struct TextWriter<W: Write> {
    sink: W,
}

impl<W: Write> TextWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }
}

impl<W: Write> OutputWriter for TextWriter<W> {
    fn write_report(&mut self, report: &AnalyzeReport) -> Result<()> {
        let w = &mut self.sink;
        writeln!(w, "pyvet analysis report").map_err(out_err)?;
        writeln!(
            w,
            "generated: {}",
            report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        )
        .map_err(out_err)?;
        writeln!(
            w,
            "project: {} ({} files, {} lines)",
            report.project_path.display(),
            report.files_analyzed,
            report.total_lines
        )
        .map_err(out_err)?;
        writeln!(
            w,
            "health: {:.1} (grade {})",
            report.health.score, report.health.grade
        )
        .map_err(out_err)?;
        writeln!(w).map_err(out_err)?;

        if let Some(ref complexity) = report.complexity {
            writeln!(
                w,
                "complexity: {} functions, average {:.1}, max {}, {} high risk",
                complexity.summary.total_functions,
                complexity.summary.average_complexity,
                complexity.summary.max_complexity,
                complexity.summary.high_risk_count
            )
            .map_err(out_err)?;
            for func in complexity
                .functions
                .iter()
                .filter(|f| f.risk == crate::core::RiskLevel::High)
                .take(10)
            {
                writeln!(
                    w,
                    "  {}:{} {} complexity {} ({})",
                    func.file.display(),
                    func.span.start_line,
                    func.name,
                    func.complexity,
                    func.risk
                )
                .map_err(out_err)?;
            }
        }
        if let Some(ref dead) = report.dead_code {
            writeln!(
                w,
                "dead code: {} findings ({} critical, {} warning, {} info)",
                dead.summary.total_findings,
                dead.summary.critical_count,
                dead.summary.warning_count,
                dead.summary.info_count
            )
            .map_err(out_err)?;
            for finding in dead
                .findings
                .iter()
                .filter(|f| f.severity == Severity::Critical)
                .take(10)
            {
                writeln!(
                    w,
                    "  {}:{} [{}] {} in {}",
                    finding.file.display(),
                    finding.span.start_line,
                    finding.severity,
                    finding.reason,
                    finding.function
                )
                .map_err(out_err)?;
            }
        }
        if let Some(ref clones) = report.clones {
            writeln!(
                w,
                "clones: {} pairs in {} groups, duplication {:.1}%",
                clones.summary.pairs_reported,
                clones.summary.groups_reported,
                clones.summary.duplication_percent
            )
            .map_err(out_err)?;
            for pair in clones.pairs.iter().take(10) {
                writeln!(
                    w,
                    "  {} {}:{} <-> {}:{} similarity {:.2}",
                    pair.clone_type,
                    pair.clone_a.file.display(),
                    pair.clone_a.span.start_line,
                    pair.clone_b.file.display(),
                    pair.clone_b.span.start_line,
                    pair.similarity
                )
                .map_err(out_err)?;
            }
        }
        if let Some(ref coupling) = report.coupling {
            writeln!(
                w,
                "coupling: {} classes, average CBO {:.1}, {} highly coupled",
                coupling.summary.total_classes,
                coupling.summary.average_cbo,
                coupling.summary.high_coupling_count
            )
            .map_err(out_err)?;
        }
        if let Some(ref deps) = report.dependencies {
            writeln!(
                w,
                "dependencies: {} modules, {} edges, {} cycles, depth {}",
                deps.summary.total_modules,
                deps.summary.total_dependencies,
                deps.summary.cycles_total,
                deps.summary.max_depth
            )
            .map_err(out_err)?;
            for cycle in &deps.cycles {
                writeln!(
                    w,
                    "  cycle [{}]: {}",
                    format!("{:?}", cycle.severity).to_lowercase(),
                    cycle.modules.join(" -> ")
                )
                .map_err(out_err)?;
            }
            for violation in &deps.violations {
                writeln!(
                    w,
                    "  violation: {} ({}) -> {} ({})",
                    violation.from_module,
                    violation.from_layer,
                    violation.to_module,
                    violation.to_layer
                )
                .map_err(out_err)?;
            }
        }

        writeln!(w).map_err(out_err)?;
        for status in &report.statuses {
            let state = if !status.enabled {
                "disabled".to_string()
            } else if status.success {
                format!("ok ({} ms)", status.duration_ms)
            } else {
                format!("failed: {}", status.error.as_deref().unwrap_or("unknown"))
            };
            writeln!(w, "analysis {}: {state}", status.name).map_err(out_err)?;
        }
        Ok(())
    }
}

pub struct CsvWriter<W: Write> {
    sink: W,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }
}

impl<W: Write> OutputWriter for CsvWriter<W> {
    fn write_report(&mut self, report: &AnalyzeReport) -> Result<()> {
        let w = &mut self.sink;
        writeln!(w, "analysis,file,line,item,value").map_err(out_err)?;
        if let Some(ref complexity) = report.complexity {
            for func in &complexity.functions {
                writeln!(
                    w,
                    "complexity,{},{},{},{}",
                    csv_field(&func.file.to_string_lossy()),
                    func.span.start_line,
                    csv_field(&func.name),
                    func.complexity
                )
                .map_err(out_err)?;
            }
        }
        if let Some(ref dead) = report.dead_code {
            for finding in &dead.findings {
                writeln!(
                    w,
                    "dead_code,{},{},{},{}",
                    csv_field(&finding.file.to_string_lossy()),
                    finding.span.start_line,
                    csv_field(&finding.reason),
                    finding.severity
                )
                .map_err(out_err)?;
            }
        }
        if let Some(ref clones) = report.clones {
            for pair in &clones.pairs {
                writeln!(
                    w,
                    "clones,{},{},{},{:.4}",
                    csv_field(&pair.clone_a.file.to_string_lossy()),
                    pair.clone_a.span.start_line,
                    pair.clone_type,
                    pair.similarity
                )
                .map_err(out_err)?;
            }
        }
        if let Some(ref coupling) = report.coupling {
            for class in &coupling.classes {
                writeln!(
                    w,
                    "cbo,{},{},{},{}",
                    csv_field(&class.file.to_string_lossy()),
                    class.span.start_line,
                    csv_field(&class.class_name),
                    class.cbo
                )
                .map_err(out_err)?;
            }
        }
        if let Some(ref deps) = report.dependencies {
            for module in &deps.modules {
                writeln!(
                    w,
                    "deps,{},1,{},{:.4}",
                    csv_field(&module.file_path.to_string_lossy()),
                    csv_field(&module.name),
                    module.instability
                )
                .map_err(out_err)?;
            }
        }
        Ok(())
    }
}

fn csv_field(raw: &str) -> String {
    if raw.contains(',') || raw.contains('"') {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

pub struct HtmlWriter<W: Write> {
    sink: W,
}

impl<W: Write> HtmlWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }
}

impl<W: Write> OutputWriter for HtmlWriter<W> {
    fn write_report(&mut self, report: &AnalyzeReport) -> Result<()> {
        let w = &mut self.sink;
        writeln!(w, "<!DOCTYPE html>").map_err(out_err)?;
        writeln!(w, "<html><head><meta charset=\"utf-8\"><title>pyvet report</title></head><body>")
            .map_err(out_err)?;
        writeln!(
            w,
            "<h1>pyvet analysis report</h1><p>project: {}</p><p>health: {:.1} (grade {})</p>",
            html_escape::encode_text(&report.project_path.display().to_string()),
            report.health.score,
            report.health.grade
        )
        .map_err(out_err)?;

        if let Some(ref complexity) = report.complexity {
            writeln!(w, "<h2>Complexity</h2><table border=\"1\"><tr><th>Function</th><th>File</th><th>Line</th><th>Complexity</th><th>Risk</th></tr>").map_err(out_err)?;
            for func in &complexity.functions {
                writeln!(
                    w,
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    html_escape::encode_text(&func.name),
                    html_escape::encode_text(&func.file.display().to_string()),
                    func.span.start_line,
                    func.complexity,
                    func.risk
                )
                .map_err(out_err)?;
            }
            writeln!(w, "</table>").map_err(out_err)?;
        }
        if let Some(ref dead) = report.dead_code {
            writeln!(w, "<h2>Dead code</h2><ul>").map_err(out_err)?;
            for finding in &dead.findings {
                writeln!(
                    w,
                    "<li>{}:{} [{}] {}</li>",
                    html_escape::encode_text(&finding.file.display().to_string()),
                    finding.span.start_line,
                    finding.severity,
                    html_escape::encode_text(&finding.reason)
                )
                .map_err(out_err)?;
            }
            writeln!(w, "</ul>").map_err(out_err)?;
        }
        writeln!(w, "</body></html>").map_err(out_err)?;
        Ok(())
    }
}

/// Emits the module dependency graph; other sections have no dot form.
pub struct DotWriter<W: Write> {
    sink: W,
}

impl<W: Write> DotWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }
}

impl<W: Write> OutputWriter for DotWriter<W> {
    fn write_report(&mut self, report: &AnalyzeReport) -> Result<()> {
        let w = &mut self.sink;
        writeln!(w, "digraph modules {{").map_err(out_err)?;
        if let Some(ref deps) = report.dependencies {
            for module in &deps.modules {
                writeln!(w, "    \"{}\";", module.name).map_err(out_err)?;
                for target in &module.imports_out {
                    writeln!(w, "    \"{}\" -> \"{}\";", module.name, target).map_err(out_err)?;
                }
            }
        }
        writeln!(w, "}}").map_err(out_err)?;
        Ok(())
    }
}

/// Colored console summary for interactive runs.
pub fn print_summary(report: &AnalyzeReport) {
    println!("{}", "pyvet analysis".bold().blue());

    let mut table = Table::new();
    table.set_header(vec!["metric", "value"]);
    table.add_row(vec!["files".to_string(), report.files_analyzed.to_string()]);
    table.add_row(vec!["lines".to_string(), report.total_lines.to_string()]);
    if let Some(ref complexity) = report.complexity {
        table.add_row(vec![
            "avg complexity".to_string(),
            format!("{:.1}", complexity.summary.average_complexity),
        ]);
    }
    if let Some(ref dead) = report.dead_code {
        table.add_row(vec![
            "dead code findings".to_string(),
            dead.summary.total_findings.to_string(),
        ]);
    }
    if let Some(ref clones) = report.clones {
        table.add_row(vec![
            "duplication".to_string(),
            format!("{:.1}%", clones.summary.duplication_percent),
        ]);
    }
    if let Some(ref deps) = report.dependencies {
        table.add_row(vec![
            "dependency cycles".to_string(),
            deps.summary.cycles_total.to_string(),
        ]);
    }
    println!("{table}");

    let score = format!("{:.1}", report.health.score);
    let colored_score = match report.health.grade {
        crate::core::Grade::A | crate::core::Grade::B => score.green(),
        crate::core::Grade::C => score.yellow(),
        _ => score.red(),
    };
    println!(
        "health score: {} (grade {})",
        colored_score,
        report.health.grade.to_string().bold()
    );

    let failed: Vec<_> = report
        .statuses
        .iter()
        .filter(|s| s.enabled && !s.success)
        .collect();
    if !failed.is_empty() {
        println!("{}", "some analyses failed:".red().bold());
        for status in failed {
            println!(
                "  {}: {}",
                status.name,
                status.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}
