//! Module dependency graph: Tarjan SCC cycle detection, condensed-DAG
//! depth, and Martin coupling metrics.

use crate::core::{CycleReport, CycleSeverity, ModuleReport};
use petgraph::algo::{condensation, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct ModuleNode {
    pub name: String,
    pub file_path: PathBuf,
    pub is_package: bool,
}

/// Directed graph over project modules; edges are deduplicated imports.
#[derive(Default)]
pub struct ModuleGraph {
    graph: DiGraph<ModuleNode, ()>,
    indices: BTreeMap<String, NodeIndex>,
}

impl ModuleGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module(&mut self, name: &str, file_path: PathBuf, is_package: bool) -> NodeIndex {
        if let Some(&idx) = self.indices.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(ModuleNode {
            name: name.to_string(),
            file_path,
            is_package,
        });
        self.indices.insert(name.to_string(), idx);
        idx
    }

    /// Add one import edge; repeated imports collapse to a single edge.
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        let from_idx = match self.indices.get(from) {
            Some(&idx) => idx,
            None => self.add_module(from, PathBuf::new(), false),
        };
        let to_idx = match self.indices.get(to) {
            Some(&idx) => idx,
            None => self.add_module(to, PathBuf::new(), false),
        };
        if self.graph.find_edge(from_idx, to_idx).is_none() {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    pub fn module_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.indices.contains_key(name)
    }

    /// Every edge as `(from, to)` module names, sorted.
    pub fn edges(&self) -> Vec<(String, String)> {
        let mut edges: Vec<(String, String)> = self
            .graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(a, b)| {
                (
                    self.graph[a].name.clone(),
                    self.graph[b].name.clone(),
                )
            })
            .collect();
        edges.sort();
        edges
    }

    /// Circular dependencies: every SCC of size > 1 plus every self-loop.
    pub fn cycles(&self) -> Vec<CycleReport> {
        let mut reports = Vec::new();
        for scc in tarjan_scc(&self.graph) {
            if scc.len() > 1 {
                let mut modules: Vec<String> =
                    scc.iter().map(|&n| self.graph[n].name.clone()).collect();
                modules.sort();
                reports.push(CycleReport {
                    severity: CycleSeverity::from_cycle_size(modules.len()),
                    modules,
                });
            } else if let Some(&only) = scc.first() {
                if self.graph.find_edge(only, only).is_some() {
                    reports.push(CycleReport {
                        modules: vec![self.graph[only].name.clone()],
                        severity: CycleSeverity::from_cycle_size(1),
                    });
                }
            }
        }
        reports.sort_by(|a, b| a.modules.cmp(&b.modules));
        reports
    }

    /// Modules participating in multi-module cycles.
    pub fn modules_in_cycles(&self) -> usize {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| scc.len())
            .sum()
    }

    /// Longest path (in modules) through the condensed DAG.
    pub fn max_depth(&self) -> usize {
        if self.graph.node_count() == 0 {
            return 0;
        }
        let condensed = condensation(self.graph.clone(), true);
        let order = petgraph::algo::toposort(&condensed, None)
            .expect("condensed graph is acyclic");
        let mut depth: BTreeMap<NodeIndex, usize> = BTreeMap::new();
        let mut max = 0usize;
        for node in order {
            let here = depth.get(&node).copied().unwrap_or(1);
            max = max.max(here);
            for next in condensed.neighbors_directed(node, Direction::Outgoing) {
                let entry = depth.entry(next).or_insert(1);
                *entry = (*entry).max(here + 1);
            }
        }
        max
    }

    /// Per-module reports with Martin metrics. Abstractness estimates are
    /// not available for Python sources, so `A = 0` and `D = |I − 1|`.
    pub fn module_reports(&self) -> Vec<ModuleReport> {
        let mut reports: Vec<ModuleReport> = self
            .graph
            .node_indices()
            .map(|idx| {
                let node = &self.graph[idx];
                let mut imports_out: Vec<String> = self
                    .graph
                    .neighbors_directed(idx, Direction::Outgoing)
                    .map(|n| self.graph[n].name.clone())
                    .collect();
                let mut imports_in: Vec<String> = self
                    .graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .map(|n| self.graph[n].name.clone())
                    .collect();
                imports_out.sort();
                imports_in.sort();

                let ce = imports_out.len() as f64;
                let ca = imports_in.len() as f64;
                let instability = if ca + ce > 0.0 { ce / (ca + ce) } else { 0.0 };
                let abstractness = 0.0;
                let distance = (abstractness + instability - 1.0).abs();

                ModuleReport {
                    name: node.name.clone(),
                    file_path: node.file_path.clone(),
                    is_package: node.is_package,
                    imports_out,
                    imports_in,
                    instability,
                    abstractness,
                    distance,
                }
            })
            .collect();
        reports.sort_by(|a, b| a.name.cmp(&b.name));
        reports
    }

    pub fn main_sequence_deviation(&self) -> f64 {
        let reports = self.module_reports();
        if reports.is_empty() {
            return 0.0;
        }
        reports.iter().map(|r| r.distance).sum::<f64>() / reports.len() as f64
    }
}
