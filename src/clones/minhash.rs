//! MinHash sketches and banded LSH over fragment shingles.
//!
//! Shingles are 3-node subtree signatures (parent kind plus an adjacent
//! child-kind window). A sketch of `H` minima is split into `B` bands of
//! `R` rows; two fragments are candidates iff any band matches exactly,
//! giving collision probability `1 − (1 − s^R)^B` at Jaccard similarity
//! `s`.

use crate::clones::fragment::{kind_label, Fragment};
use crate::core::ast::AstNode;
use dashmap::DashMap;
use rayon::prelude::*;
use xxhash_rust::xxh64::xxh64;

/// Sketch geometry; `bands * rows == hashes` is validated at config load.
#[derive(Clone, Copy, Debug)]
pub struct LshParams {
    pub hashes: usize,
    pub bands: usize,
    pub rows: usize,
}

impl Default for LshParams {
    fn default() -> Self {
        Self {
            hashes: 128,
            bands: 32,
            rows: 4,
        }
    }
}

/// Multiset of k=3 subtree signatures for one fragment.
pub fn shingles(root: &AstNode) -> Vec<u64> {
    let mut out = Vec::new();
    root.walk(&mut |node| {
        let parent = kind_label(node.kind);
        match node.children.len() {
            0 => out.push(hash_shingle(parent, "", "")),
            1 => out.push(hash_shingle(parent, kind_label(node.children[0].kind), "")),
            _ => {
                for pair in node.children.windows(2) {
                    out.push(hash_shingle(
                        parent,
                        kind_label(pair[0].kind),
                        kind_label(pair[1].kind),
                    ));
                }
            }
        }
    });
    out
}

fn hash_shingle(parent: &str, left: &str, right: &str) -> u64 {
    let mut bytes = Vec::with_capacity(parent.len() + left.len() + right.len() + 2);
    bytes.extend_from_slice(parent.as_bytes());
    bytes.push(b'/');
    bytes.extend_from_slice(left.as_bytes());
    bytes.push(b'/');
    bytes.extend_from_slice(right.as_bytes());
    xxh64(&bytes, 0)
}

/// MinHash sketch: for each of `H` seeded hash functions, the minimum
/// over all shingles.
#[derive(Clone, Debug, PartialEq)]
pub struct MinHashSketch(pub Vec<u64>);

impl MinHashSketch {
    pub fn compute(shingles: &[u64], hashes: usize) -> Self {
        let mut mins = vec![u64::MAX; hashes];
        for &shingle in shingles {
            let bytes = shingle.to_le_bytes();
            for (i, slot) in mins.iter_mut().enumerate() {
                let h = xxh64(&bytes, i as u64);
                if h < *slot {
                    *slot = h;
                }
            }
        }
        Self(mins)
    }

    /// Fraction of agreeing positions, an unbiased Jaccard estimate.
    pub fn jaccard_estimate(&self, other: &Self) -> f64 {
        if self.0.is_empty() || self.0.len() != other.0.len() {
            return 0.0;
        }
        let matching = self
            .0
            .iter()
            .zip(other.0.iter())
            .filter(|(a, b)| a == b)
            .count();
        matching as f64 / self.0.len() as f64
    }
}

/// Banded index over fragment sketches. Buckets aggregate concurrently;
/// the resulting pair set is sorted, so thread interleaving never leaks
/// into the output.
pub struct LshIndex {
    params: LshParams,
    buckets: DashMap<(usize, u64), Vec<usize>>,
}

impl LshIndex {
    pub fn new(params: LshParams) -> Self {
        Self {
            params,
            buckets: DashMap::new(),
        }
    }

    /// Index all fragments and return the candidate pairs `(i, j)` with
    /// `i < j`, sorted and deduplicated.
    pub fn candidate_pairs(params: LshParams, fragments: &[Fragment]) -> Vec<(usize, usize)> {
        let index = Self::new(params);
        fragments.par_iter().enumerate().for_each(|(i, fragment)| {
            let sketch = MinHashSketch::compute(&shingles(&fragment.root), params.hashes);
            index.insert(i, &sketch);
        });
        index.pairs()
    }

    pub fn insert(&self, fragment_idx: usize, sketch: &MinHashSketch) {
        for band in 0..self.params.bands {
            let start = band * self.params.rows;
            let end = start + self.params.rows;
            let mut bytes = Vec::with_capacity(self.params.rows * 8);
            for value in &sketch.0[start..end] {
                bytes.extend_from_slice(&value.to_le_bytes());
            }
            let key = (band, xxh64(&bytes, 0));
            self.buckets.entry(key).or_default().push(fragment_idx);
        }
    }

    fn pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for entry in self.buckets.iter() {
            let members = entry.value();
            if members.len() < 2 {
                continue;
            }
            for (a, &i) in members.iter().enumerate() {
                for &j in &members[a + 1..] {
                    pairs.push(if i < j { (i, j) } else { (j, i) });
                }
            }
        }
        pairs.sort_unstable();
        pairs.dedup();
        pairs
    }
}
