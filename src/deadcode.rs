//! Dead-code detection via CFG reachability.
//!
//! Every block unreachable from the entry yields a finding. Severity comes
//! from the construction-time cause the builder recorded: code after a
//! terminator in the same lexical block is critical, untaken branches of
//! constant conditions are warnings, everything else is informational.

use crate::cfg::{self, Cfg, UnreachableCause};
use crate::core::ast::NodeKind;
use crate::core::errors::Result;
use crate::core::parsing::ParsedFile;
use crate::core::{DeadCodeFinding, Severity};
use std::path::Path;

/// Findings for one function CFG.
pub fn analyze_cfg(file: &Path, graph: &Cfg) -> Vec<DeadCodeFinding> {
    let reachable = graph.reachable();
    let causes = propagate_causes(graph, &reachable);

    let mut findings: Vec<DeadCodeFinding> = graph
        .blocks
        .iter()
        .filter(|b| !reachable[b.id] && !b.statements.is_empty())
        .map(|block| {
            let cause = causes[block.id];
            let (severity, reason) = classify(cause);
            DeadCodeFinding {
                file: file.to_path_buf(),
                function: graph.function.clone(),
                span: block.span().expect("non-empty block has a span"),
                severity,
                reason,
            }
        })
        .collect();

    findings.sort_by_key(|f| (f.span.start_line, f.span.start_col));
    merge_adjacent(findings)
}

/// All findings for a parsed file, module level included.
pub fn analyze_file(parsed: &ParsedFile) -> Result<Vec<DeadCodeFinding>> {
    let mut findings = Vec::new();
    let module_cfg = cfg::build_module_cfg(&parsed.path, &parsed.ast)?;
    findings.extend(analyze_cfg(&parsed.path, &module_cfg));
    for func in parsed.ast.functions() {
        let graph = cfg::build_function_cfg(&parsed.path, func)?;
        findings.extend(analyze_cfg(&parsed.path, &graph));
    }
    findings.sort_by_key(|f| (f.span.start_line, f.span.start_col));
    Ok(findings)
}

/// Blocks created for control flow nested inside a dead region carry no
/// cause of their own; they inherit one from an unreachable predecessor.
fn propagate_causes(graph: &Cfg, reachable: &[bool]) -> Vec<Option<UnreachableCause>> {
    let mut causes: Vec<Option<UnreachableCause>> =
        graph.blocks.iter().map(|b| b.cause).collect();
    // Bounded by block count; each pass fills at least one cause or stops.
    for _ in 0..graph.blocks.len() {
        let mut changed = false;
        for block in &graph.blocks {
            if reachable[block.id] || causes[block.id].is_some() {
                continue;
            }
            let inherited = graph
                .predecessors(block.id)
                .filter(|p| !reachable[*p])
                .find_map(|p| causes[p]);
            if inherited.is_some() {
                causes[block.id] = inherited;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    causes
}

fn classify(cause: Option<UnreachableCause>) -> (Severity, String) {
    match cause {
        Some(UnreachableCause::AfterTerminator(kind)) => {
            let what = match kind {
                NodeKind::Return => "return",
                NodeKind::Raise => "raise",
                NodeKind::Break => "break",
                NodeKind::Continue => "continue",
                _ => "terminator",
            };
            (Severity::Critical, format!("code after {what}"))
        }
        Some(UnreachableCause::ConstantCondition) => (
            Severity::Warning,
            "unreachable branch of constant condition".to_string(),
        ),
        Some(UnreachableCause::Other) | None => {
            (Severity::Info, "unreachable code".to_string())
        }
    }
}

/// Merge findings on adjacent lines with the same severity and reason into
/// one finding spanning first start to last end.
fn merge_adjacent(findings: Vec<DeadCodeFinding>) -> Vec<DeadCodeFinding> {
    let mut merged: Vec<DeadCodeFinding> = Vec::with_capacity(findings.len());
    for finding in findings {
        match merged.last_mut() {
            Some(last)
                if last.function == finding.function
                    && last.severity == finding.severity
                    && last.reason == finding.reason
                    && finding.span.start_line <= last.span.end_line + 1 =>
            {
                last.span = last.span.merge(&finding.span);
            }
            _ => merged.push(finding),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parsing::parse_source;
    use indoc::indoc;

    fn findings(source: &str) -> Vec<DeadCodeFinding> {
        let parsed = parse_source(Path::new("test.py"), source).unwrap();
        analyze_file(&parsed).unwrap()
    }

    #[test]
    fn clean_function_has_no_findings() {
        let found = findings(indoc! {"
            def f(a):
                if a:
                    return 1
                return 2
        "});
        assert!(found.is_empty());
    }

    #[test]
    fn code_after_return_is_critical() {
        let found = findings(indoc! {"
            def f():
                x = 1
                return x
                y = 2
        "});
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Critical);
        assert_eq!(found[0].reason, "code after return");
        assert_eq!(found[0].span.start_line, 4);
    }

    #[test]
    fn adjacent_dead_statements_merge_into_one_finding() {
        let found = findings(indoc! {"
            def f():
                return 0
                a = 1
                b = 2
                c = 3
        "});
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].span.start_line, 3);
        assert_eq!(found[0].span.end_line, 5);
    }

    #[test]
    fn constant_condition_branch_is_warning() {
        let found = findings(indoc! {"
            def f():
                if False:
                    x = 1
                return 2
        "});
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Warning);
    }

    #[test]
    fn code_after_raise_is_critical() {
        let found = findings(indoc! {"
            def f():
                raise ValueError(\"boom\")
                cleanup()
        "});
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Critical);
        assert_eq!(found[0].reason, "code after raise");
    }

    #[test]
    fn code_after_break_is_critical() {
        let found = findings(indoc! {"
            def f(items):
                for item in items:
                    break
                    process(item)
                return items
        "});
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, Severity::Critical);
        assert_eq!(found[0].reason, "code after break");
    }

    #[test]
    fn module_level_dead_code_is_found() {
        let found = findings(indoc! {"
            import sys

            if False:
                legacy_setup()

            x = 1
        "});
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].function, "<module>");
        assert_eq!(found[0].severity, Severity::Warning);
    }

    #[test]
    fn nested_control_flow_after_return_stays_critical() {
        let found = findings(indoc! {"
            def f():
                return 1
                if cond():
                    a = 2
        "});
        assert!(!found.is_empty());
        assert!(found.iter().all(|f| f.severity == Severity::Critical));
    }
}
