//! Groups clone pairs over the weighted pair graph.
//!
//! Vertices are clone sites, edges are reported pairs weighted by
//! similarity and filtered by the group threshold. Four modes: connected
//! components, star (centroid plus neighbors), complete-linkage
//! agglomerative clustering, and iterated k-core.

use crate::config::GroupMode;
use crate::core::{CloneGroup, ClonePair, CloneSite, CloneType};
use std::collections::{BTreeMap, BTreeSet};

pub fn group_pairs(
    mode: GroupMode,
    pairs: &[ClonePair],
    group_threshold: f64,
    k_core_k: usize,
) -> Vec<CloneGroup> {
    let graph = PairGraph::build(pairs, group_threshold);
    if graph.vertices.is_empty() {
        return Vec::new();
    }
    let member_sets = match mode {
        GroupMode::Connected => graph.connected_components(),
        GroupMode::Star => graph.star_groups(),
        GroupMode::CompleteLinkage => graph.complete_linkage(group_threshold),
        GroupMode::KCore => graph.k_core(k_core_k),
    };

    let mut groups: Vec<CloneGroup> = member_sets
        .into_iter()
        .filter(|members| members.len() >= 2)
        .enumerate()
        .map(|(id, members)| graph.finish_group(id, members))
        .collect();
    groups.sort_by_key(|g| g.members.first().map(|m| m.id));
    for (id, group) in groups.iter_mut().enumerate() {
        group.id = id;
    }
    groups
}

struct PairGraph {
    vertices: BTreeMap<usize, CloneSite>,
    /// Edge weight and type keyed by canonical `(low, high)` id pair.
    edges: BTreeMap<(usize, usize), (f64, CloneType)>,
}

impl PairGraph {
    fn build(pairs: &[ClonePair], threshold: f64) -> Self {
        let mut vertices = BTreeMap::new();
        let mut edges = BTreeMap::new();
        for pair in pairs {
            if pair.similarity < threshold {
                continue;
            }
            vertices
                .entry(pair.clone_a.id)
                .or_insert_with(|| pair.clone_a.clone());
            vertices
                .entry(pair.clone_b.id)
                .or_insert_with(|| pair.clone_b.clone());
            let key = canonical(pair.clone_a.id, pair.clone_b.id);
            edges.insert(key, (pair.similarity, pair.clone_type));
        }
        Self { vertices, edges }
    }

    fn neighbors(&self, v: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges.keys().filter_map(move |&(a, b)| {
            if a == v {
                Some(b)
            } else if b == v {
                Some(a)
            } else {
                None
            }
        })
    }

    fn degree(&self, v: usize, alive: &BTreeSet<usize>) -> usize {
        self.neighbors(v).filter(|n| alive.contains(n)).count()
    }

    fn connected_components(&self) -> Vec<BTreeSet<usize>> {
        let mut seen: BTreeSet<usize> = BTreeSet::new();
        let mut components = Vec::new();
        for &start in self.vertices.keys() {
            if seen.contains(&start) {
                continue;
            }
            let mut component = BTreeSet::new();
            let mut stack = vec![start];
            while let Some(v) = stack.pop() {
                if !component.insert(v) {
                    continue;
                }
                seen.insert(v);
                stack.extend(self.neighbors(v).filter(|n| !component.contains(n)));
            }
            components.push(component);
        }
        components
    }

    /// Repeatedly take the highest-degree remaining vertex as a centroid
    /// with its direct neighbors, then remove them.
    fn star_groups(&self) -> Vec<BTreeSet<usize>> {
        let mut alive: BTreeSet<usize> = self.vertices.keys().copied().collect();
        let mut groups = Vec::new();
        loop {
            let centroid = alive
                .iter()
                .copied()
                .map(|v| (self.degree(v, &alive), v))
                .filter(|(d, _)| *d > 0)
                // highest degree; ties break toward the lowest id
                .max_by(|(da, va), (db, vb)| da.cmp(db).then(vb.cmp(va)));
            let Some((_, centroid)) = centroid else {
                break;
            };
            let mut group: BTreeSet<usize> = self
                .neighbors(centroid)
                .filter(|n| alive.contains(n))
                .collect();
            group.insert(centroid);
            for v in &group {
                alive.remove(v);
            }
            groups.push(group);
        }
        groups
    }

    /// Agglomerative clustering; merge only while the minimum pairwise
    /// similarity within the merged cluster stays at or above threshold.
    fn complete_linkage(&self, threshold: f64) -> Vec<BTreeSet<usize>> {
        let mut clusters: Vec<BTreeSet<usize>> = self
            .vertices
            .keys()
            .map(|&v| BTreeSet::from([v]))
            .collect();
        loop {
            let mut best: Option<(f64, usize, usize)> = None;
            for i in 0..clusters.len() {
                for j in i + 1..clusters.len() {
                    if let Some(link) = self.linkage(&clusters[i], &clusters[j]) {
                        if link >= threshold
                            && best.map(|(s, _, _)| link > s).unwrap_or(true)
                        {
                            best = Some((link, i, j));
                        }
                    }
                }
            }
            let Some((_, i, j)) = best else {
                break;
            };
            let merged: BTreeSet<usize> = clusters[i].union(&clusters[j]).copied().collect();
            clusters.remove(j);
            clusters.remove(i);
            clusters.push(merged);
        }
        clusters
    }

    /// Complete linkage: the minimum similarity over all cross pairs; a
    /// missing edge counts as zero and blocks the merge.
    fn linkage(&self, a: &BTreeSet<usize>, b: &BTreeSet<usize>) -> Option<f64> {
        let mut min_sim = f64::INFINITY;
        for &x in a {
            for &y in b {
                match self.edges.get(&canonical(x, y)) {
                    Some((sim, _)) => min_sim = min_sim.min(*sim),
                    None => return None,
                }
            }
        }
        (min_sim != f64::INFINITY).then_some(min_sim)
    }

    /// Strip vertices with degree below `k` until a fixpoint, then return
    /// the components of what remains.
    fn k_core(&self, k: usize) -> Vec<BTreeSet<usize>> {
        let mut alive: BTreeSet<usize> = self.vertices.keys().copied().collect();
        loop {
            let doomed: Vec<usize> = alive
                .iter()
                .copied()
                .filter(|&v| self.degree(v, &alive) < k)
                .collect();
            if doomed.is_empty() {
                break;
            }
            for v in doomed {
                alive.remove(&v);
            }
        }
        // components restricted to surviving vertices
        let mut seen: BTreeSet<usize> = BTreeSet::new();
        let mut components = Vec::new();
        for &start in &alive {
            if seen.contains(&start) {
                continue;
            }
            let mut component = BTreeSet::new();
            let mut stack = vec![start];
            while let Some(v) = stack.pop() {
                if !component.insert(v) {
                    continue;
                }
                seen.insert(v);
                stack.extend(
                    self.neighbors(v)
                        .filter(|n| alive.contains(n) && !component.contains(n)),
                );
            }
            components.push(component);
        }
        components
    }

    fn finish_group(&self, id: usize, members: BTreeSet<usize>) -> CloneGroup {
        let mut min_similarity = f64::INFINITY;
        let mut dominant = CloneType::Type4;
        let ids: Vec<usize> = members.iter().copied().collect();
        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i + 1..] {
                if let Some((sim, clone_type)) = self.edges.get(&canonical(a, b)) {
                    min_similarity = min_similarity.min(*sim);
                    // Type1 is the most severe form of duplication
                    dominant = dominant.min(*clone_type);
                }
            }
        }
        CloneGroup {
            id,
            members: ids
                .into_iter()
                .map(|v| self.vertices[&v].clone())
                .collect(),
            min_similarity: if min_similarity == f64::INFINITY {
                0.0
            } else {
                min_similarity
            },
            dominant_type: dominant,
        }
    }
}

fn canonical(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}
