//! Resolves Python import statements to project module identifiers.
//!
//! Module identifiers are dotted paths derived from the project root.
//! Relative imports hop ancestors by leading-dot count; unresolved names
//! are kept only when third-party or stdlib tracking is enabled. Dynamic
//! (`importlib`, `__import__`) imports are not tracked.

use crate::config::DepsConfig;
use crate::core::ast::{AstNode, NodeKind};
use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// Modules of the standard library worth recognizing; anything else
/// unresolved is treated as third-party.
static STDLIB_MODULES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "abc", "argparse", "asyncio", "base64", "collections", "contextlib", "copy", "csv",
        "dataclasses", "datetime", "decimal", "enum", "functools", "glob", "hashlib", "heapq",
        "http", "importlib", "inspect", "io", "itertools", "json", "logging", "math",
        "multiprocessing", "os", "pathlib", "pickle", "queue", "random", "re", "shutil", "socket",
        "sqlite3", "string", "struct", "subprocess", "sys", "tempfile", "textwrap", "threading",
        "time", "traceback", "types", "typing", "unittest", "urllib", "uuid", "warnings",
        "weakref", "xml", "zlib",
    ]
    .into_iter()
    .collect()
});

/// One import statement as written, before resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct RawImport {
    /// Dotted module path; empty for `from . import x`.
    pub module: String,
    /// Leading-dot count; 0 means absolute.
    pub level: usize,
    /// Imported names for `from … import …`; empty for plain imports.
    pub items: Vec<String>,
    pub line: usize,
}

/// Derive `(module_name, is_package)` for a source file under the root.
pub fn module_identity(project_root: &Path, file: &Path) -> (String, bool) {
    let relative = pathdiff::diff_paths(file, project_root)
        .unwrap_or_else(|| file.to_path_buf());
    let is_package = relative
        .file_name()
        .map(|n| n == "__init__.py")
        .unwrap_or(false);

    let mut parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if let Some(last) = parts.last_mut() {
        if last == "__init__.py" {
            parts.pop();
        } else if let Some(stem) = last.strip_suffix(".py") {
            *last = stem.to_string();
        }
    }
    if parts.is_empty() {
        return ("<root>".to_string(), is_package);
    }
    (parts.join("."), is_package)
}

/// Extract every static import in a module.
pub fn extract_imports(ast: &AstNode) -> Vec<RawImport> {
    let mut imports = Vec::new();
    ast.walk(&mut |node| match node.kind {
        NodeKind::Import => {
            for child in &node.children {
                let target = match child.kind {
                    NodeKind::DottedName => child.name().map(str::to_string),
                    NodeKind::AliasedImport => child
                        .child_of_kind(NodeKind::DottedName)
                        .and_then(AstNode::name)
                        .map(str::to_string),
                    _ => None,
                };
                if let Some(module) = target {
                    imports.push(RawImport {
                        module,
                        level: 0,
                        items: Vec::new(),
                        line: node.span.start_line,
                    });
                }
            }
        }
        NodeKind::ImportFrom => {
            if let Some(raw) = from_import(node) {
                imports.push(raw);
            }
        }
        _ => {}
    });
    imports
}

fn from_import(node: &AstNode) -> Option<RawImport> {
    let mut module = String::new();
    let mut level = 0usize;
    let mut items = Vec::new();
    let mut saw_module = false;

    for child in &node.children {
        match child.kind {
            NodeKind::RelativeImport if !saw_module => {
                saw_module = true;
                if let Some(prefix) = child.child_of_kind(NodeKind::ImportPrefix) {
                    // the prefix span is exactly the run of dots
                    level = prefix.span.end_col.saturating_sub(prefix.span.start_col);
                }
                if let Some(name) = child.child_of_kind(NodeKind::DottedName).and_then(AstNode::name)
                {
                    module = name.to_string();
                }
            }
            NodeKind::DottedName if !saw_module => {
                saw_module = true;
                module = child.name().unwrap_or_default().to_string();
            }
            NodeKind::DottedName => {
                if let Some(name) = child.name() {
                    items.push(name.to_string());
                }
            }
            NodeKind::AliasedImport => {
                if let Some(name) = child
                    .child_of_kind(NodeKind::DottedName)
                    .and_then(AstNode::name)
                {
                    items.push(name.to_string());
                }
            }
            NodeKind::WildcardImport => {}
            _ => {}
        }
    }

    if !saw_module && items.is_empty() {
        return None;
    }
    Some(RawImport {
        module,
        level,
        items,
        line: node.span.start_line,
    })
}

/// Resolve one raw import to zero or more module identifiers.
pub fn resolve(
    importer: &str,
    importer_is_package: bool,
    raw: &RawImport,
    known_modules: &BTreeSet<String>,
    config: &DepsConfig,
) -> Vec<String> {
    if raw.level > 0 {
        if !config.follow_relative {
            return Vec::new();
        }
        return resolve_relative(importer, importer_is_package, raw, known_modules);
    }

    let base = raw.module.as_str();
    let mut resolved = Vec::new();
    if raw.items.is_empty() {
        if let Some(target) = resolve_absolute(base, known_modules, config) {
            resolved.push(target);
        }
    } else {
        for item in &raw.items {
            let qualified = format!("{base}.{item}");
            if known_modules.contains(&qualified) {
                resolved.push(qualified);
            } else if let Some(target) = resolve_absolute(base, known_modules, config) {
                resolved.push(target);
            }
        }
    }
    resolved.sort();
    resolved.dedup();
    resolved
}

fn resolve_absolute(
    module: &str,
    known_modules: &BTreeSet<String>,
    config: &DepsConfig,
) -> Option<String> {
    if module.is_empty() {
        return None;
    }
    if known_modules.contains(module) {
        return Some(module.to_string());
    }
    // a known module may be the package the dotted path dives into
    let mut prefix = module;
    while let Some(pos) = prefix.rfind('.') {
        prefix = &prefix[..pos];
        if known_modules.contains(prefix) {
            return Some(prefix.to_string());
        }
    }
    let root = module.split('.').next().unwrap_or(module);
    if STDLIB_MODULES.contains(root) {
        config.include_stdlib.then(|| root.to_string())
    } else {
        config.include_third_party.then(|| root.to_string())
    }
}

fn resolve_relative(
    importer: &str,
    importer_is_package: bool,
    raw: &RawImport,
    known_modules: &BTreeSet<String>,
) -> Vec<String> {
    // one dot means the current package; each further dot hops an ancestor
    let mut base: Vec<&str> = importer.split('.').collect();
    if !importer_is_package {
        base.pop();
    }
    for _ in 1..raw.level {
        if base.pop().is_none() {
            return Vec::new();
        }
    }
    let mut target = base.join(".");
    if !raw.module.is_empty() {
        if target.is_empty() {
            target = raw.module.clone();
        } else {
            target = format!("{target}.{}", raw.module);
        }
    }

    let mut resolved = Vec::new();
    if raw.items.is_empty() {
        if !target.is_empty() {
            resolved.push(target);
        }
    } else {
        for item in &raw.items {
            let qualified = if target.is_empty() {
                item.clone()
            } else {
                format!("{target}.{item}")
            };
            if known_modules.contains(&qualified) {
                resolved.push(qualified);
            } else if !target.is_empty() {
                resolved.push(target.clone());
            }
        }
    }
    resolved.sort();
    resolved.dedup();
    resolved
}
