use indoc::indoc;
use pyvet::config::{ArchitectureConfig, DepsConfig, LayerConfig, LayerRule};
use pyvet::core::parsing::{parse_source, SharedParse};
use pyvet::deps;
use pyvet::CycleSeverity;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn corpus(files: &[(&str, &str)]) -> Vec<SharedParse> {
    files
        .iter()
        .map(|(path, source)| Arc::new(parse_source(Path::new(path), source).unwrap()))
        .collect()
}

#[test]
fn triangle_cycle_with_external_dependent() {
    // a -> b -> c -> a, plus d -> a
    let files = corpus(&[
        ("proj/a.py", "import b\n"),
        ("proj/b.py", "import c\n"),
        ("proj/c.py", "import a\n"),
        ("proj/d.py", "import a\n"),
    ]);
    let response = deps::analyze_dependencies(
        &files,
        &PathBuf::from("proj"),
        &DepsConfig::default(),
        &ArchitectureConfig::default(),
    );

    assert_eq!(response.summary.cycles_total, 1);
    assert_eq!(response.cycles[0].modules, vec!["a", "b", "c"]);
    assert_eq!(response.cycles[0].severity, CycleSeverity::Medium);
    assert_eq!(response.summary.modules_in_cycles, 3);
    assert_eq!(response.summary.max_depth, 2);

    let d = response.modules.iter().find(|m| m.name == "d").unwrap();
    assert!(d.imports_in.is_empty());
    assert_eq!(d.imports_out, vec!["a"]);
}

#[test]
fn martin_identity_holds_for_every_module() {
    let files = corpus(&[
        ("p/hub.py", "import spoke_one\nimport spoke_two\n"),
        ("p/spoke_one.py", "import shared\n"),
        ("p/spoke_two.py", "import shared\n"),
        ("p/shared.py", "x = 1\n"),
    ]);
    let response = deps::analyze_dependencies(
        &files,
        &PathBuf::from("p"),
        &DepsConfig::default(),
        &ArchitectureConfig::default(),
    );
    for module in &response.modules {
        let ca = module.imports_in.len() as f64;
        let ce = module.imports_out.len() as f64;
        let expected = if ca + ce > 0.0 { ce / (ca + ce) } else { 0.0 };
        assert!(
            (module.instability - expected).abs() < 1e-9,
            "instability mismatch for {}",
            module.name
        );
        assert!(
            (module.distance - (module.abstractness + module.instability - 1.0).abs()).abs()
                < 1e-9
        );
    }
    assert!(response.summary.main_sequence_deviation >= 0.0);
    assert!(response.summary.main_sequence_deviation <= 1.0);
}

#[test]
fn relative_imports_resolve_through_packages() {
    let files = corpus(&[
        ("proj/app/__init__.py", ""),
        ("proj/app/services/__init__.py", ""),
        (
            "proj/app/services/orders.py",
            indoc! {"
                from ..util import helpers
                from . import billing
            "},
        ),
        ("proj/app/services/billing.py", "x = 1\n"),
        ("proj/app/util/__init__.py", ""),
        ("proj/app/util/helpers.py", "y = 2\n"),
    ]);
    let response = deps::analyze_dependencies(
        &files,
        &PathBuf::from("proj"),
        &DepsConfig::default(),
        &ArchitectureConfig::default(),
    );
    let orders = response
        .modules
        .iter()
        .find(|m| m.name == "app.services.orders")
        .unwrap();
    assert_eq!(
        orders.imports_out,
        vec!["app.services.billing", "app.util.helpers"]
    );
}

#[test]
fn self_loops_count_as_cycles() {
    let files = corpus(&[("p/loopy.py", "import loopy\n")]);
    let response = deps::analyze_dependencies(
        &files,
        &PathBuf::from("p"),
        &DepsConfig::default(),
        &ArchitectureConfig::default(),
    );
    assert_eq!(response.summary.cycles_total, 1);
    assert_eq!(response.cycles[0].severity, CycleSeverity::Low);
}

#[test]
fn architecture_violations_flow_into_the_response() {
    let arch = ArchitectureConfig {
        strict: true,
        layers: vec![
            LayerConfig {
                name: "ui".to_string(),
                patterns: vec!["ui*".to_string()],
            },
            LayerConfig {
                name: "domain".to_string(),
                patterns: vec!["domain*".to_string()],
            },
            LayerConfig {
                name: "infra".to_string(),
                patterns: vec!["infra*".to_string()],
            },
        ],
        rules: vec![LayerRule {
            from_layer: "ui".to_string(),
            allow: vec!["domain".to_string()],
            deny: Vec::new(),
        }],
    };
    let files = corpus(&[
        ("p/ui_views.py", "import domain_orders\nimport infra_db\n"),
        ("p/domain_orders.py", "x = 1\n"),
        ("p/infra_db.py", "y = 2\n"),
    ]);
    let response = deps::analyze_dependencies(
        &files,
        &PathBuf::from("p"),
        &DepsConfig::default(),
        &arch,
    );
    assert_eq!(response.violations.len(), 1);
    assert_eq!(response.violations[0].to_layer, "infra");
    assert_eq!(response.summary.compliance, Some(0.5));
}
