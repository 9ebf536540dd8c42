use indoc::indoc;
use pyvet::cancel::CancelToken;
use pyvet::clones::{self, minhash};
use pyvet::config::{CloneConfig, CostModelKind};
use pyvet::core::parsing::{parse_source, SharedParse};
use pyvet::{CloneResponse, CloneType};
use std::path::Path;
use std::sync::Arc;

fn corpus(sources: &[(&str, &str)]) -> Vec<SharedParse> {
    sources
        .iter()
        .map(|(name, src)| Arc::new(parse_source(Path::new(name), src).unwrap()))
        .collect()
}

fn detect(sources: &[(&str, &str)], config: &CloneConfig) -> CloneResponse {
    let files = corpus(sources);
    let total_lines = files.iter().map(|f| f.total_lines()).sum();
    clones::detect_clones(&files, config, &CancelToken::new(), total_lines)
}

fn small_config() -> CloneConfig {
    let mut config = CloneConfig::default();
    config.min_lines = 3;
    config.min_nodes = 8;
    config
}

const VALIDATE_USER: &str = indoc! {"
    def validate_user(user):
        errors = []
        if not user.name:
            errors.append(\"missing name\")
        if not user.email:
            errors.append(\"missing email\")
        return errors
"};

#[test]
fn whitespace_and_comments_do_not_break_type1() {
    // identical statements, extra whitespace and a comment
    let with_noise = indoc! {"
        # validation helpers

        def validate_user(user):

            errors = []
            if not user.name:
                errors.append(\"missing name\")  # required
            if not user.email:
                errors.append(\"missing email\")
            return errors
    "};
    let response = detect(&[("a.py", VALIDATE_USER), ("b.py", with_noise)], &small_config());
    let pair = response
        .pairs
        .iter()
        .find(|p| p.clone_a.function == "validate_user" && p.clone_b.function == "validate_user")
        .expect("expected a clone pair");
    assert_eq!(pair.clone_type, CloneType::Type1);
    assert_eq!(pair.similarity, 1.0);
}

#[test]
fn renamed_identifiers_are_type2_under_weighted_model() {
    // all identifiers renamed
    let renamed = indoc! {"
        def check_account(account):
            problems = []
            if not account.name:
                problems.append(\"missing name\")
            if not account.email:
                problems.append(\"missing email\")
            return problems
    "};
    let mut config = small_config();
    config.cost_model = CostModelKind::Weighted;
    let response = detect(&[("a.py", VALIDATE_USER), ("b.py", renamed)], &config);
    let pair = response
        .pairs
        .iter()
        .find(|p| p.clone_a.function == "validate_user")
        .expect("expected a clone pair");
    assert_eq!(pair.clone_type, CloneType::Type2);
    assert!(pair.similarity >= 0.95, "similarity {}", pair.similarity);
}

#[test]
fn pairs_are_canonical_and_idempotent() {
    let inputs = [
        ("a.py", VALIDATE_USER),
        ("b.py", VALIDATE_USER),
        ("c.py", VALIDATE_USER),
    ];
    let first = detect(&inputs, &small_config());
    let second = detect(&inputs, &small_config());

    for pair in &first.pairs {
        assert!(pair.clone_a.id < pair.clone_b.id);
    }
    let ids = |r: &CloneResponse| {
        r.pairs
            .iter()
            .map(|p| (p.clone_a.id, p.clone_b.id, p.clone_type))
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&first), ids(&second));
}

#[test]
fn similarity_is_symmetric_and_reflexive() {
    use pyvet::clones::apted::{CostModel, TreeDistance};
    let a = parse_source(Path::new("a.py"), VALIDATE_USER).unwrap().ast;
    let b = parse_source(
        Path::new("b.py"),
        "def other(x):\n    while x:\n        x -= 1\n    return x\n",
    )
    .unwrap()
    .ast;
    let engine = TreeDistance::new(CostModel::new(CostModelKind::Default, false, false));
    let (_, ab) = engine.similarity(&a, &b).unwrap();
    let (_, ba) = engine.similarity(&b, &a).unwrap();
    assert_eq!(ab, ba);
    let (distance, self_sim) = engine.similarity(&a, &a).unwrap();
    assert_eq!(distance, 0.0);
    assert_eq!(self_sim, 1.0);
}

#[test]
fn fragments_below_thresholds_are_never_reported() {
    let tiny = "def f():\n    return 1\n";
    let response = detect(&[("a.py", tiny), ("b.py", tiny)], &small_config());
    assert_eq!(response.summary.fragments_extracted, 0);
    assert!(response.pairs.is_empty());
}

#[test]
fn max_edit_distance_gates_reporting() {
    let variant = indoc! {"
        def validate_user(user):
            errors = []
            if not user.name:
                errors.append(\"missing name\")
            if not user.phone:
                errors.append(\"missing phone number\")
            return errors
    "};
    let mut strict = small_config();
    strict.max_edit_distance = 0.5;
    let response = detect(&[("a.py", VALIDATE_USER), ("b.py", variant)], &strict);
    assert!(response
        .pairs
        .iter()
        .all(|p| p.edit_distance <= strict.max_edit_distance));
}

#[test]
fn lsh_activates_at_the_auto_threshold() {
    let mut config = small_config();
    config.lsh_auto_threshold = 2;
    let response = detect(&[("a.py", VALIDATE_USER), ("b.py", VALIDATE_USER)], &config);
    assert!(response.summary.lsh_used);
    assert!(!response.pairs.is_empty());

    config.lsh_auto_threshold = 500;
    let response = detect(&[("a.py", VALIDATE_USER), ("b.py", VALIDATE_USER)], &config);
    assert!(!response.summary.lsh_used);
}

#[test]
fn lsh_candidates_find_structural_twins() {
    let renamed = indoc! {"
        def check_account(account):
            problems = []
            if not account.name:
                problems.append(\"no name\")
            if not account.email:
                problems.append(\"no email\")
            return problems
    "};
    let files = corpus(&[("a.py", VALIDATE_USER), ("b.py", renamed)]);
    let fragments = pyvet::clones::fragment::extract_fragments(
        &files[0],
        pyvet::clones::fragment::FragmentLimits {
            min_lines: 3,
            min_nodes: 8,
        },
    );
    let other = pyvet::clones::fragment::extract_fragments(
        &files[1],
        pyvet::clones::fragment::FragmentLimits {
            min_lines: 3,
            min_nodes: 8,
        },
    );
    let mut all = fragments;
    all.extend(other);
    let pairs = minhash::LshIndex::candidate_pairs(minhash::LshParams::default(), &all);
    assert!(!pairs.is_empty());
}

#[test]
fn grouping_collects_all_copies() {
    let inputs = [
        ("a.py", VALIDATE_USER),
        ("b.py", VALIDATE_USER),
        ("c.py", VALIDATE_USER),
    ];
    let response = detect(&inputs, &small_config());
    assert!(response.summary.groups_reported >= 1);
    let group = &response.groups[0];
    assert!(group.members.len() >= 3);
    assert_eq!(group.dominant_type, CloneType::Type1);
    assert!(group.min_similarity >= 0.98);
}

#[test]
fn duplication_percent_is_bounded() {
    let response = detect(&[("a.py", VALIDATE_USER), ("b.py", VALIDATE_USER)], &small_config());
    assert!(response.summary.duplication_percent > 0.0);
    assert!(response.summary.duplication_percent <= 100.0);
}
