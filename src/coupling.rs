//! Coupling Between Objects (CBO) per class.
//!
//! A class is coupled to every distinct externally-defined name it
//! references: base classes, imported bindings, and other classes in the
//! analyzed corpus. Builtins only count when configured.

use crate::config::CboConfig;
use crate::core::ast::{AstNode, NodeKind};
use crate::core::parsing::ParsedFile;
use crate::core::{ClassCoupling, CouplingResponse, CouplingSummary, RiskLevel};
use std::collections::BTreeSet;

const PYTHON_BUILTINS: &[&str] = &[
    "abs", "all", "any", "bool", "bytes", "dict", "enumerate", "filter", "float", "frozenset",
    "getattr", "hasattr", "int", "isinstance", "issubclass", "iter", "len", "list", "map", "max",
    "min", "next", "object", "open", "print", "range", "repr", "reversed", "round", "set",
    "setattr", "sorted", "str", "sum", "super", "tuple", "type", "zip",
];

/// Compute class coupling for one file against the corpus-wide class set.
pub fn analyze_file(
    parsed: &ParsedFile,
    config: &CboConfig,
    known_classes: &BTreeSet<String>,
) -> Vec<ClassCoupling> {
    let imports = imported_bindings(&parsed.ast);
    parsed
        .ast
        .classes()
        .iter()
        .map(|class| measure_class(class, parsed, config, &imports, known_classes))
        .collect()
}

/// Collect every class name defined in a file, for the corpus-wide set.
pub fn class_names(parsed: &ParsedFile) -> Vec<String> {
    parsed
        .ast
        .classes()
        .iter()
        .filter_map(|c| c.definition_name())
        .map(str::to_string)
        .collect()
}

/// Fold per-class metrics into the response summary.
pub fn summarize(classes: Vec<ClassCoupling>) -> CouplingResponse {
    let total_classes = classes.len();
    let high_coupling_count = classes
        .iter()
        .filter(|c| c.risk == RiskLevel::High)
        .count();
    let average_cbo = if total_classes == 0 {
        0.0
    } else {
        classes.iter().map(|c| c.cbo as f64).sum::<f64>() / total_classes as f64
    };
    let high_coupling_ratio = if total_classes == 0 {
        0.0
    } else {
        high_coupling_count as f64 / total_classes as f64
    };
    CouplingResponse {
        classes,
        summary: CouplingSummary {
            total_classes,
            average_cbo,
            high_coupling_count,
            high_coupling_ratio,
        },
        warnings: Vec::new(),
    }
}

fn measure_class(
    class: &AstNode,
    parsed: &ParsedFile,
    config: &CboConfig,
    imports: &BTreeSet<String>,
    known_classes: &BTreeSet<String>,
) -> ClassCoupling {
    let name = class.definition_name().unwrap_or("<class>").to_string();
    let mut referenced: BTreeSet<String> = BTreeSet::new();

    // Base classes couple regardless of where they come from.
    if let Some(bases) = class.child_of_kind(NodeKind::ArgumentList) {
        for base in &bases.children {
            if let Some(base_name) = root_name(base) {
                if base_name != name {
                    referenced.insert(base_name.to_string());
                }
            }
        }
    }

    let mut candidates: BTreeSet<String> = BTreeSet::new();
    collect_references(class, &mut candidates);
    for candidate in candidates {
        if candidate == name {
            continue;
        }
        let is_import = imports.contains(&candidate);
        let is_class = known_classes.contains(&candidate);
        let is_builtin = PYTHON_BUILTINS.contains(&candidate.as_str());
        let counts = (is_import && config.include_imports)
            || (is_class && !is_builtin)
            || (is_builtin && config.include_builtins);
        if counts {
            referenced.insert(candidate);
        }
    }

    let cbo = referenced.len() as u32;
    ClassCoupling {
        class_name: name,
        file: parsed.path.clone(),
        span: class.span,
        cbo,
        risk: risk_level(cbo, config),
        depends_on: referenced.into_iter().collect(),
    }
}

fn risk_level(cbo: u32, config: &CboConfig) -> RiskLevel {
    if cbo <= config.low_threshold {
        RiskLevel::Low
    } else if cbo <= config.medium_threshold {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

/// Local binding names introduced by imports: `import os` binds `os`,
/// `import os.path` binds `os`, `from x import y as z` binds `z`.
fn imported_bindings(module: &AstNode) -> BTreeSet<String> {
    let mut bindings = BTreeSet::new();
    module.walk(&mut |node| match node.kind {
        NodeKind::Import => {
            for child in &node.children {
                match child.kind {
                    NodeKind::DottedName => {
                        if let Some(first) = dotted_first(child) {
                            bindings.insert(first);
                        }
                    }
                    NodeKind::AliasedImport => {
                        if let Some(alias) = child.children.last() {
                            if let Some(alias_name) = alias.name() {
                                bindings.insert(alias_name.to_string());
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        NodeKind::ImportFrom => {
            // the module part comes first: a relative_import node, or the
            // first dotted name; everything after it is a binding
            let mut saw_module = false;
            for child in &node.children {
                match child.kind {
                    NodeKind::RelativeImport | NodeKind::ImportPrefix if !saw_module => {
                        saw_module = true;
                    }
                    NodeKind::DottedName if !saw_module => {
                        saw_module = true;
                    }
                    NodeKind::DottedName => {
                        if let Some(first) = dotted_first(child) {
                            bindings.insert(first);
                        }
                    }
                    NodeKind::AliasedImport => {
                        if let Some(alias) = child.children.last() {
                            if let Some(alias_name) = alias.name() {
                                bindings.insert(alias_name.to_string());
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    });
    bindings
}

fn dotted_first(node: &AstNode) -> Option<String> {
    node.name()
        .map(|n| n.split('.').next().unwrap_or(n).to_string())
        .or_else(|| {
            node.child_of_kind(NodeKind::Identifier)
                .and_then(AstNode::name)
                .map(str::to_string)
        })
}

fn root_name(node: &AstNode) -> Option<&str> {
    match node.kind {
        NodeKind::Identifier => node.name(),
        NodeKind::Attribute => node.children.first().and_then(root_name),
        _ => None,
    }
}

/// Names a class body refers to: plain identifier reads, call targets,
/// and the roots of attribute chains.
fn collect_references(node: &AstNode, out: &mut BTreeSet<String>) {
    match node.kind {
        NodeKind::Attribute => {
            if let Some(object) = node.children.first() {
                if let Some(name) = root_name(object) {
                    out.insert(name.to_string());
                } else {
                    collect_references(object, out);
                }
            }
        }
        NodeKind::Identifier => {
            if let Some(name) = node.name() {
                out.insert(name.to_string());
            }
        }
        _ => {
            for child in &node.children {
                collect_references(child, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parsing::parse_source;
    use indoc::indoc;
    use std::path::Path;

    fn measure(source: &str, config: &CboConfig, classes: &[&str]) -> Vec<ClassCoupling> {
        let parsed = parse_source(Path::new("t.py"), source).unwrap();
        let known: BTreeSet<String> = classes.iter().map(|s| s.to_string()).collect();
        analyze_file(&parsed, config, &known)
    }

    const SERVICE: &str = indoc! {"
        import requests
        from .models import Order, Customer

        class OrderService(BaseService):
            def fetch(self, order_id):
                response = requests.get(self.url(order_id))
                return Order(response.json())

            def owner(self, order):
                return Customer(order.customer_id)
    "};

    #[test]
    fn counts_imports_bases_and_classes() {
        let classes = measure(
            SERVICE,
            &CboConfig::default(),
            &["OrderService", "BaseService", "Order", "Customer"],
        );
        assert_eq!(classes.len(), 1);
        let service = &classes[0];
        assert_eq!(service.class_name, "OrderService");
        assert!(service.depends_on.contains(&"BaseService".to_string()));
        assert!(service.depends_on.contains(&"requests".to_string()));
        assert!(service.depends_on.contains(&"Order".to_string()));
        assert!(service.depends_on.contains(&"Customer".to_string()));
        // self-reference never counts
        assert!(!service.depends_on.contains(&"OrderService".to_string()));
    }

    #[test]
    fn builtins_excluded_by_default() {
        let source = indoc! {"
            class Box:
                def size(self):
                    return len(self.items)
        "};
        let classes = measure(source, &CboConfig::default(), &["Box"]);
        assert_eq!(classes[0].cbo, 0);

        let mut with_builtins = CboConfig::default();
        with_builtins.include_builtins = true;
        let classes = measure(source, &with_builtins, &["Box"]);
        assert_eq!(classes[0].cbo, 1);
    }

    #[test]
    fn imports_can_be_excluded() {
        let mut config = CboConfig::default();
        config.include_imports = false;
        let classes = measure(
            SERVICE,
            &config,
            &["OrderService", "BaseService", "Order", "Customer"],
        );
        assert!(!classes[0].depends_on.contains(&"requests".to_string()));
    }

    #[test]
    fn risk_uses_thresholds() {
        let config = CboConfig::default();
        assert_eq!(risk_level(4, &config), RiskLevel::Low);
        assert_eq!(risk_level(5, &config), RiskLevel::Medium);
        assert_eq!(risk_level(9, &config), RiskLevel::High);
    }

    #[test]
    fn summary_ratio() {
        let parsed = parse_source(Path::new("t.py"), "class A:\n    pass\n").unwrap();
        let classes = analyze_file(&parsed, &CboConfig::default(), &BTreeSet::new());
        let response = summarize(classes);
        assert_eq!(response.summary.total_classes, 1);
        assert_eq!(response.summary.high_coupling_ratio, 0.0);
    }
}
