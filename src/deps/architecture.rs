//! Layer assignment and architecture rule validation.

use crate::config::{ArchitectureConfig, LayerRule};
use crate::core::ArchViolation;

/// First matching layer for a module name, by configured order.
pub fn layer_of<'a>(config: &'a ArchitectureConfig, module: &str) -> Option<&'a str> {
    for layer in &config.layers {
        for pattern in &layer.patterns {
            if let Ok(glob) = glob::Pattern::new(pattern) {
                if glob.matches(module) {
                    return Some(&layer.name);
                }
            }
        }
    }
    None
}

fn rule_for<'a>(config: &'a ArchitectureConfig, from_layer: &str) -> Option<&'a LayerRule> {
    config.rules.iter().find(|r| r.from_layer == from_layer)
}

/// Validate every dependency edge against the layer rules.
///
/// Returns the violations and the compliance score
/// `1 − violations / dependencies`, clamped to `[0, 1]`; `None` when no
/// layers are configured.
pub fn validate(
    config: &ArchitectureConfig,
    edges: &[(String, String)],
) -> (Vec<ArchViolation>, Option<f64>) {
    if !config.is_configured() {
        return (Vec::new(), None);
    }

    let mut violations = Vec::new();
    for (from_module, to_module) in edges {
        let Some(from_layer) = layer_of(config, from_module) else {
            continue;
        };
        let Some(to_layer) = layer_of(config, to_module) else {
            continue;
        };
        if from_layer == to_layer {
            continue;
        }

        let rule = rule_for(config, from_layer);
        let violates = if config.strict {
            // strict: anything not explicitly allowed is forbidden
            !rule
                .map(|r| r.allow.iter().any(|l| l == to_layer))
                .unwrap_or(false)
        } else {
            // lenient: only explicit denials are forbidden
            rule.map(|r| r.deny.iter().any(|l| l == to_layer))
                .unwrap_or(false)
        };
        if violates {
            violations.push(ArchViolation {
                from_module: from_module.clone(),
                to_module: to_module.clone(),
                from_layer: from_layer.to_string(),
                to_layer: to_layer.to_string(),
            });
        }
    }

    let compliance = if edges.is_empty() {
        1.0
    } else {
        (1.0 - violations.len() as f64 / edges.len() as f64).clamp(0.0, 1.0)
    };
    (violations, Some(compliance))
}
