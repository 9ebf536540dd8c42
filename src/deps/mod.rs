//! System-level dependency analysis: import graph construction, cycle
//! detection, coupling metrics, and architecture validation.

pub mod architecture;
pub mod graph;
pub mod resolver;

use crate::config::{ArchitectureConfig, DepsConfig};
use crate::core::parsing::SharedParse;
use crate::core::{DependencyResponse, DependencySummary};
use graph::ModuleGraph;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// Build the module graph for the corpus and derive the full dependency
/// response.
pub fn analyze_dependencies(
    files: &[SharedParse],
    project_root: &Path,
    config: &DepsConfig,
    arch: &ArchitectureConfig,
) -> DependencyResponse {
    let mut module_graph = ModuleGraph::new();
    let mut identities = Vec::with_capacity(files.len());
    for parsed in files {
        let (name, is_package) = resolver::module_identity(project_root, &parsed.path);
        module_graph.add_module(&name, parsed.path.clone(), is_package);
        identities.push((name, is_package));
    }
    let known_modules: BTreeSet<String> =
        identities.iter().map(|(name, _)| name.clone()).collect();

    for (parsed, (name, is_package)) in files.iter().zip(&identities) {
        for raw in resolver::extract_imports(&parsed.ast) {
            for target in resolver::resolve(name, *is_package, &raw, &known_modules, config) {
                if target != *name {
                    module_graph.add_dependency(name, &target);
                }
            }
        }
    }
    debug!(
        modules = module_graph.module_count(),
        dependencies = module_graph.dependency_count(),
        "module graph built"
    );

    let cycles = if config.detect_cycles {
        module_graph.cycles()
    } else {
        Vec::new()
    };
    let modules_in_cycles = if config.detect_cycles {
        module_graph.modules_in_cycles()
    } else {
        0
    };

    let edges = module_graph.edges();
    let (violations, compliance) = architecture::validate(arch, &edges);

    let summary = DependencySummary {
        total_modules: module_graph.module_count(),
        total_dependencies: module_graph.dependency_count(),
        cycles_total: cycles.len(),
        modules_in_cycles,
        max_depth: module_graph.max_depth(),
        main_sequence_deviation: module_graph.main_sequence_deviation(),
        compliance,
    };

    DependencyResponse {
        modules: module_graph.module_reports(),
        cycles,
        violations,
        summary,
        warnings: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parsing::parse_source;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn corpus(files: &[(&str, &str)]) -> Vec<SharedParse> {
        files
            .iter()
            .map(|(path, source)| {
                Arc::new(parse_source(Path::new(path), source).unwrap())
            })
            .collect()
    }

    #[test]
    fn cycle_between_modules_is_detected() {
        let files = corpus(&[
            ("proj/a.py", "import b\n"),
            ("proj/b.py", "import c\n"),
            ("proj/c.py", "import a\n"),
            ("proj/d.py", "import a\n"),
        ]);
        let response = analyze_dependencies(
            &files,
            &PathBuf::from("proj"),
            &DepsConfig::default(),
            &ArchitectureConfig::default(),
        );
        assert_eq!(response.summary.cycles_total, 1);
        assert_eq!(response.cycles[0].modules, vec!["a", "b", "c"]);
        assert_eq!(response.summary.modules_in_cycles, 3);
        assert_eq!(response.summary.max_depth, 2);
        assert_eq!(response.summary.total_modules, 4);
    }

    #[test]
    fn cycle_detection_can_be_disabled() {
        let files = corpus(&[("p/a.py", "import b\n"), ("p/b.py", "import a\n")]);
        let mut config = DepsConfig::default();
        config.detect_cycles = false;
        let response = analyze_dependencies(
            &files,
            &PathBuf::from("p"),
            &config,
            &ArchitectureConfig::default(),
        );
        assert_eq!(response.summary.cycles_total, 0);
        assert_eq!(response.summary.total_dependencies, 2);
    }

    #[test]
    fn unresolved_imports_are_excluded_by_default() {
        let files = corpus(&[("p/a.py", "import os\nimport requests\n")]);
        let response = analyze_dependencies(
            &files,
            &PathBuf::from("p"),
            &DepsConfig::default(),
            &ArchitectureConfig::default(),
        );
        assert_eq!(response.summary.total_modules, 1);
        assert_eq!(response.summary.total_dependencies, 0);
    }

    #[test]
    fn modules_are_sorted_for_determinism() {
        let files = corpus(&[
            ("p/zebra.py", "import alpha\n"),
            ("p/alpha.py", "x = 1\n"),
        ]);
        let response = analyze_dependencies(
            &files,
            &PathBuf::from("p"),
            &DepsConfig::default(),
            &ArchitectureConfig::default(),
        );
        let names: Vec<&str> = response.modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zebra"]);
    }
}
