//! Maps verified pair evidence onto the clone taxonomy.

use crate::config::CloneConfig;
use crate::core::CloneType;

/// Everything the classifier needs to know about a verified pair.
#[derive(Clone, Copy, Debug)]
pub struct PairEvidence {
    /// Token streams identical with identifiers and literals kept.
    pub exact_equal: bool,
    /// Kind streams identical under identifier/literal abstraction.
    pub abstract_equal: bool,
    /// Tree similarity from edit distance.
    pub similarity: f64,
    /// DFA-augmented similarity, when both sides had summaries.
    pub dfa_blend: Option<f64>,
}

/// Classify a pair, or discard it. Disabled types fall through to the
/// next rule in severity order.
pub fn classify(evidence: PairEvidence, config: &CloneConfig) -> Option<(CloneType, f64)> {
    let s = evidence.similarity;

    if evidence.exact_equal && s >= config.type1_threshold && config.type_enabled(1) {
        return Some((CloneType::Type1, s));
    }
    if evidence.abstract_equal && s >= config.type2_threshold && config.type_enabled(2) {
        return Some((CloneType::Type2, s));
    }
    if s >= config.type3_threshold && config.type_enabled(3) {
        return Some((CloneType::Type3, scaled_confidence(s, config.type3_threshold)));
    }
    if let Some(blend) = evidence.dfa_blend {
        if blend >= config.type4_threshold && config.type_enabled(4) {
            return Some((CloneType::Type4, scaled_confidence(blend, config.type4_threshold)));
        }
    }
    None
}

/// Confidence grows from 0.5 at the threshold to 1.0 at similarity 1.0.
fn scaled_confidence(similarity: f64, threshold: f64) -> f64 {
    if threshold >= 1.0 {
        return similarity.clamp(0.0, 1.0);
    }
    (0.5 + 0.5 * (similarity - threshold) / (1.0 - threshold)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evidence(exact: bool, abstract_eq: bool, similarity: f64) -> PairEvidence {
        PairEvidence {
            exact_equal: exact,
            abstract_equal: abstract_eq,
            similarity,
            dfa_blend: None,
        }
    }

    #[test]
    fn identical_text_is_type1() {
        let result = classify(evidence(true, true, 1.0), &CloneConfig::default());
        assert_eq!(result, Some((CloneType::Type1, 1.0)));
    }

    #[test]
    fn renamed_identifiers_are_type2() {
        let result = classify(evidence(false, true, 0.96), &CloneConfig::default());
        assert_eq!(result.map(|(t, _)| t), Some(CloneType::Type2));
    }

    #[test]
    fn near_miss_structural_is_type3() {
        let result = classify(evidence(false, false, 0.85), &CloneConfig::default());
        assert_eq!(result.map(|(t, _)| t), Some(CloneType::Type3));
    }

    #[test]
    fn semantic_pairs_need_dfa_blend() {
        let config = CloneConfig::default();
        let without_dfa = classify(evidence(false, false, 0.5), &config);
        assert_eq!(without_dfa, None);

        let with_dfa = classify(
            PairEvidence {
                dfa_blend: Some(0.78),
                ..evidence(false, false, 0.5)
            },
            &config,
        );
        assert_eq!(with_dfa.map(|(t, _)| t), Some(CloneType::Type4));
    }

    #[test]
    fn disabled_types_fall_through() {
        let mut config = CloneConfig::default();
        config.enabled_types = vec![3];
        // would be type-1, but only type-3 is enabled
        let result = classify(evidence(true, true, 1.0), &config);
        assert_eq!(result.map(|(t, _)| t), Some(CloneType::Type3));
    }

    #[test]
    fn below_all_thresholds_is_discarded() {
        let result = classify(evidence(false, false, 0.4), &CloneConfig::default());
        assert_eq!(result, None);
    }

    #[test]
    fn confidence_scales_from_threshold() {
        let at_threshold = classify(evidence(false, false, 0.80), &CloneConfig::default())
            .unwrap()
            .1;
        let well_above = classify(evidence(false, false, 0.95), &CloneConfig::default())
            .unwrap()
            .1;
        assert!((at_threshold - 0.5).abs() < 1e-9);
        assert!(well_above > at_threshold);
    }
}
