//! Code-clone detection pipeline.
//!
//! Fragment extraction, optional MinHash/LSH candidate filtering, tree
//! edit distance verification, clone-type classification, and grouping.
//! Work proceeds in bounded batches so cancellation is honored between
//! batches and memory stays gated by `batch_size`.

pub mod apted;
pub mod classify;
pub mod dfa;
pub mod fragment;
pub mod group;
pub mod minhash;

use crate::cancel::CancelToken;
use crate::clones::apted::{CostModel, TreeDistance};
use crate::clones::classify::PairEvidence;
use crate::clones::dfa::DfaSummary;
use crate::clones::fragment::{abstract_stream, extract_fragments, Fragment, FragmentLimits};
use crate::clones::minhash::{LshIndex, LshParams};
use crate::config::CloneConfig;
use crate::core::parsing::SharedParse;
use crate::core::{ClonePair, CloneResponse, CloneSite, Span};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Weight of tree similarity versus DFA similarity in the Type-4 blend.
const W_CFG: f64 = 0.60;
const W_DFA: f64 = 0.40;

/// Run the full pipeline over the parsed corpus.
///
/// `total_lines` is the analyzed-line denominator for the duplication
/// percentage. Cancellation yields a partial response; the caller decides
/// whether to surface a timeout.
pub fn detect_clones(
    files: &[SharedParse],
    config: &CloneConfig,
    cancel: &CancelToken,
    total_lines: usize,
) -> CloneResponse {
    let mut response = CloneResponse::default();

    let mut fragments = collect_fragments(files, config);
    response.summary.fragments_extracted = fragments.len();
    if fragments.len() < 2 {
        return response;
    }

    if config.type_enabled(4) {
        attach_dfa_summaries(&mut fragments, files, &mut response.warnings);
    }

    let lsh_used = config.lsh_active(fragments.len());
    response.summary.lsh_used = lsh_used;
    let candidates = if lsh_used {
        let params = LshParams {
            hashes: config.lsh_hashes,
            bands: config.lsh_bands,
            rows: config.lsh_rows,
        };
        LshIndex::candidate_pairs(params, &fragments)
    } else {
        all_pairs(fragments.len())
    };
    let candidates: Vec<(usize, usize)> = candidates
        .into_iter()
        .filter(|&(i, j)| !fragments[i].overlaps(&fragments[j]))
        .collect();
    response.summary.candidate_pairs = candidates.len();
    debug!(
        fragments = fragments.len(),
        candidates = candidates.len(),
        lsh = lsh_used,
        "clone candidate enumeration done"
    );

    let engine = TreeDistance::new(CostModel::new(
        config.cost_model,
        config.ignore_identifiers,
        config.ignore_literals,
    ));

    // A dedicated pool when the clone analysis is capped below the
    // global worker count.
    let pool = (config.max_workers > 0)
        .then(|| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(config.max_workers)
                .build()
                .ok()
        })
        .flatten();

    let mut pairs: Vec<ClonePair> = Vec::new();
    for batch in candidates.chunks(config.batch_size) {
        if cancel.is_cancelled() {
            response
                .warnings
                .push("clone verification cancelled; results are partial".to_string());
            break;
        }
        let verify = || {
            batch
                .par_iter()
                .filter_map(|&(i, j)| verify_pair(&fragments[i], &fragments[j], &engine, config))
                .collect::<Vec<ClonePair>>()
        };
        let verified = match pool {
            Some(ref pool) => pool.install(verify),
            None => verify(),
        };
        pairs.extend(verified);
    }

    // Deterministic order regardless of worker interleaving.
    pairs.sort_by(|a, b| {
        (&a.clone_a.file, a.clone_a.span.start_line, &a.clone_b.file, a.clone_b.span.start_line).cmp(
            &(&b.clone_a.file, b.clone_a.span.start_line, &b.clone_b.file, b.clone_b.span.start_line),
        )
    });

    response.summary.pairs_reported = pairs.len();
    response.summary.duplication_percent = duplication_percent(&pairs, total_lines);
    response.groups = group::group_pairs(
        config.group_mode,
        &pairs,
        config.group_threshold,
        config.k_core_k,
    );
    response.summary.groups_reported = response.groups.len();
    response.pairs = pairs;
    response
}

fn collect_fragments(files: &[SharedParse], config: &CloneConfig) -> Vec<Fragment> {
    let limits = FragmentLimits {
        min_lines: config.min_lines,
        min_nodes: config.min_nodes,
    };
    let mut fragments: Vec<Fragment> = files
        .par_iter()
        .flat_map_iter(|parsed| extract_fragments(parsed, limits))
        .collect();
    // Clone-site ids follow lexicographic (file, span) order, so candidate
    // pairs (i, j) with i < j are already canonical.
    fragments.sort_by(|a, b| {
        (&a.file, a.span.start_line, a.span.end_line)
            .cmp(&(&b.file, b.span.start_line, b.span.end_line))
    });
    for (id, fragment) in fragments.iter_mut().enumerate() {
        fragment.id = id;
    }
    fragments
}

/// Summarize every function once per file, then hand each fragment the
/// summary of its innermost enclosing function.
fn attach_dfa_summaries(
    fragments: &mut [Fragment],
    files: &[SharedParse],
    warnings: &mut Vec<String>,
) {
    for parsed in files {
        let mut summaries: Vec<(Span, Arc<DfaSummary>)> = Vec::new();
        for func in parsed.ast.functions() {
            match dfa::summarize_function(&parsed.path, func) {
                Ok(summary) => summaries.push((func.span, Arc::new(summary))),
                Err(e) => {
                    warn!(file = %parsed.path.display(), error = %e, "skipping def-use summary");
                    warnings.push(format!("{}: {e}", parsed.path.display()));
                }
            }
        }
        for fragment in fragments.iter_mut().filter(|f| f.file == parsed.path) {
            fragment.dfa = summaries
                .iter()
                .filter(|(span, _)| {
                    span.start_line <= fragment.span.start_line
                        && fragment.span.end_line <= span.end_line
                })
                .min_by_key(|(span, _)| span.line_count())
                .map(|(_, summary)| Arc::clone(summary));
        }
    }
}

fn all_pairs(count: usize) -> Vec<(usize, usize)> {
    let mut pairs = Vec::with_capacity(count * (count - 1) / 2);
    for i in 0..count {
        for j in i + 1..count {
            pairs.push((i, j));
        }
    }
    pairs
}

fn verify_pair(
    a: &Fragment,
    b: &Fragment,
    engine: &TreeDistance,
    config: &CloneConfig,
) -> Option<ClonePair> {
    let exact_equal = a.exact_stream == b.exact_stream;
    let abstract_equal =
        a.fingerprint == b.fingerprint && abstract_stream(&a.root) == abstract_stream(&b.root);

    // Exact duplicates shortcut the edit-distance computation.
    let (edit_distance, similarity) = if exact_equal {
        (0.0, 1.0)
    } else {
        engine.similarity(&a.root, &b.root)?
    };
    if edit_distance > config.max_edit_distance {
        return None;
    }

    let dfa_blend = match (&a.dfa, &b.dfa) {
        (Some(da), Some(db)) => {
            Some(W_CFG * similarity + W_DFA * dfa::dfa_similarity(da, db))
        }
        _ => None,
    };

    // Cheap floor before classification.
    let passes_floor = similarity >= config.similarity_threshold
        || dfa_blend.map(|b| b >= config.type4_threshold).unwrap_or(false);
    if !passes_floor {
        return None;
    }

    let (clone_type, confidence) = classify::classify(
        PairEvidence {
            exact_equal,
            abstract_equal,
            similarity,
            dfa_blend,
        },
        config,
    )?;

    Some(ClonePair {
        clone_a: site_of(a),
        clone_b: site_of(b),
        similarity,
        edit_distance,
        clone_type,
        confidence,
    })
}

fn site_of(fragment: &Fragment) -> CloneSite {
    CloneSite {
        id: fragment.id,
        file: fragment.file.clone(),
        function: fragment.function.clone(),
        span: fragment.span,
        node_count: fragment.node_count,
    }
}

/// Unique source lines participating in any reported pair, divided by
/// total analyzed lines.
fn duplication_percent(pairs: &[ClonePair], total_lines: usize) -> f64 {
    if total_lines == 0 {
        return 0.0;
    }
    let mut lines: BTreeSet<(&std::path::Path, usize)> = BTreeSet::new();
    for pair in pairs {
        for site in [&pair.clone_a, &pair.clone_b] {
            for line in site.span.start_line..=site.span.end_line {
                lines.insert((site.file.as_path(), line));
            }
        }
    }
    100.0 * lines.len() as f64 / total_lines as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parsing::parse_source;
    use crate::core::CloneType;
    use indoc::indoc;
    use std::path::Path;

    fn run(sources: &[(&str, &str)], config: &CloneConfig) -> CloneResponse {
        let files: Vec<SharedParse> = sources
            .iter()
            .map(|(name, src)| Arc::new(parse_source(Path::new(name), src).unwrap()))
            .collect();
        let total_lines = files.iter().map(|f| f.total_lines()).sum();
        detect_clones(&files, config, &CancelToken::new(), total_lines)
    }

    fn test_config() -> CloneConfig {
        let mut config = CloneConfig::default();
        config.min_lines = 3;
        config.min_nodes = 8;
        config
    }

    const ORIGINAL: &str = indoc! {"
        def total_price(items):
            total = 0
            for item in items:
                if item.active:
                    total += item.price
            return total
    "};

    #[test]
    fn identical_functions_are_type1() {
        // same body, different leading comment and whitespace
        let copy = indoc! {"
            # recomputed for the report
            def total_price(items):
                total = 0
                for item in items:
                    if item.active:
                        total += item.price

                return total
        "};
        let response = run(&[("a.py", ORIGINAL), ("b.py", copy)], &test_config());
        let pair = response
            .pairs
            .iter()
            .find(|p| p.clone_a.function == "total_price" && p.clone_b.function == "total_price")
            .expect("type-1 pair");
        assert_eq!(pair.clone_type, CloneType::Type1);
        assert_eq!(pair.similarity, 1.0);
    }

    #[test]
    fn renamed_functions_are_type2() {
        let renamed = indoc! {"
            def sum_cost(entries):
                acc = 0
                for entry in entries:
                    if entry.active:
                        acc += entry.price
                return acc
        "};
        let mut config = test_config();
        config.cost_model = crate::config::CostModelKind::Weighted;
        let response = run(&[("a.py", ORIGINAL), ("b.py", renamed)], &config);
        let pair = response
            .pairs
            .iter()
            .find(|p| p.clone_a.function == "total_price")
            .expect("type-2 pair");
        assert_eq!(pair.clone_type, CloneType::Type2);
        assert!(pair.similarity >= 0.95);
    }

    #[test]
    fn canonical_order_and_ids() {
        let response = run(&[("a.py", ORIGINAL), ("b.py", ORIGINAL)], &test_config());
        for pair in &response.pairs {
            assert!(pair.clone_a.id < pair.clone_b.id);
        }
        let mut sorted = response.pairs.clone();
        sorted.sort_by(|a, b| {
            (&a.clone_a.file, a.clone_a.span.start_line, &a.clone_b.file, a.clone_b.span.start_line)
                .cmp(&(&b.clone_a.file, b.clone_a.span.start_line, &b.clone_b.file, b.clone_b.span.start_line))
        });
        assert_eq!(
            response.pairs.iter().map(|p| (p.clone_a.id, p.clone_b.id)).collect::<Vec<_>>(),
            sorted.iter().map(|p| (p.clone_a.id, p.clone_b.id)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn determinism_across_runs() {
        let inputs = [("a.py", ORIGINAL), ("b.py", ORIGINAL)];
        let first = run(&inputs, &test_config());
        let second = run(&inputs, &test_config());
        let key = |r: &CloneResponse| {
            r.pairs
                .iter()
                .map(|p| (p.clone_a.id, p.clone_b.id, p.clone_type))
                .collect::<Vec<_>>()
        };
        assert_eq!(key(&first), key(&second));
        assert_eq!(first.summary.duplication_percent, second.summary.duplication_percent);
    }

    #[test]
    fn unrelated_functions_produce_no_pairs() {
        let other = indoc! {"
            def parse_header(raw):
                name, _, value = raw.partition(\":\")
                return name.strip(), value.strip()
        "};
        let mut config = test_config();
        config.enabled_types = vec![1, 2, 3];
        let response = run(&[("a.py", ORIGINAL), ("b.py", other)], &config);
        assert!(response.pairs.is_empty());
        assert_eq!(response.summary.groups_reported, 0);
    }

    #[test]
    fn max_edit_distance_drops_pairs() {
        let near = indoc! {"
            def total_price(items):
                total = 0
                for item in items:
                    if item.active:
                        total += item.price * item.qty
            return total
        "};
        let mut config = test_config();
        config.max_edit_distance = 0.0;
        let response = run(&[("a.py", ORIGINAL), ("b.py", near)], &config);
        assert!(response
            .pairs
            .iter()
            .all(|p| p.edit_distance <= config.max_edit_distance));
    }

    #[test]
    fn cancelled_token_returns_partial_response() {
        let token = CancelToken::new();
        token.cancel();
        let files: Vec<SharedParse> = vec![
            Arc::new(parse_source(Path::new("a.py"), ORIGINAL).unwrap()),
            Arc::new(parse_source(Path::new("b.py"), ORIGINAL).unwrap()),
        ];
        let response = detect_clones(&files, &test_config(), &token, 12);
        assert!(response.pairs.is_empty());
        assert!(!response.warnings.is_empty());
    }

    #[test]
    fn duplication_percent_counts_unique_lines() {
        let response = run(&[("a.py", ORIGINAL), ("b.py", ORIGINAL)], &test_config());
        assert!(response.summary.duplication_percent > 0.0);
        assert!(response.summary.duplication_percent <= 100.0);
    }
}
