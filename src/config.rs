//! Configuration surface: `.pyvet.toml` loading, defaults, CLI override
//! merging, and validation.
//!
//! Every option is recognized at load time; unknown keys are rejected so a
//! typo never silently reverts to a default. Validation runs once, before
//! any analysis starts.

use crate::core::errors::{Error, Result};
use crate::core::Severity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PyvetConfig {
    #[serde(default)]
    pub complexity: ComplexityConfig,
    #[serde(default)]
    pub dead_code: DeadCodeConfig,
    #[serde(default)]
    pub clone: CloneConfig,
    #[serde(default)]
    pub cbo: CboConfig,
    #[serde(default)]
    pub deps: DepsConfig,
    #[serde(default)]
    pub architecture: ArchitectureConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Overall wall-clock budget for one run, in seconds.
    #[serde(default = "default_deadline_seconds")]
    pub deadline_seconds: u64,
}

fn default_deadline_seconds() -> u64 {
    600
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComplexityConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Functions below this are omitted from the report.
    #[serde(default)]
    pub min_complexity: u32,
    /// Functions above this are omitted from the report; 0 means no cap.
    #[serde(default)]
    pub max_complexity: u32,
    #[serde(default = "default_low_threshold")]
    pub low_threshold: u32,
    #[serde(default = "default_medium_threshold")]
    pub medium_threshold: u32,
}

fn default_low_threshold() -> u32 {
    9
}

fn default_medium_threshold() -> u32 {
    19
}

impl Default for ComplexityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_complexity: 0,
            max_complexity: 0,
            low_threshold: default_low_threshold(),
            medium_threshold: default_medium_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeadCodeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_min_severity")]
    pub min_severity: String,
}

fn default_min_severity() -> String {
    "info".to_string()
}

impl Default for DeadCodeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_severity: default_min_severity(),
        }
    }
}

impl DeadCodeConfig {
    pub fn min_severity(&self) -> Result<Severity> {
        self.min_severity
            .parse()
            .map_err(|e: String| Error::config(e))
    }
}

/// Clone-detection pipeline options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CloneConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_min_lines")]
    pub min_lines: usize,
    #[serde(default = "default_min_nodes")]
    pub min_nodes: usize,
    #[serde(default = "default_max_edit_distance")]
    pub max_edit_distance: f64,
    #[serde(default = "default_type1_threshold")]
    pub type1_threshold: f64,
    #[serde(default = "default_type2_threshold")]
    pub type2_threshold: f64,
    #[serde(default = "default_type3_threshold")]
    pub type3_threshold: f64,
    #[serde(default = "default_type4_threshold")]
    pub type4_threshold: f64,
    /// Pairs below this never reach classification.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default)]
    pub ignore_literals: bool,
    #[serde(default)]
    pub ignore_identifiers: bool,
    /// Clone types to report, 1..=4.
    #[serde(default = "default_enabled_types")]
    pub enabled_types: Vec<u8>,
    #[serde(default = "default_group_mode")]
    pub group_mode: GroupMode,
    #[serde(default = "default_group_threshold")]
    pub group_threshold: f64,
    #[serde(default = "default_k_core_k")]
    pub k_core_k: usize,
    /// `None` defers to the auto-threshold heuristic.
    #[serde(default)]
    pub use_lsh: Option<bool>,
    #[serde(default = "default_lsh_auto_threshold")]
    pub lsh_auto_threshold: usize,
    #[serde(default = "default_lsh_bands")]
    pub lsh_bands: usize,
    #[serde(default = "default_lsh_rows")]
    pub lsh_rows: usize,
    #[serde(default = "default_lsh_hashes")]
    pub lsh_hashes: usize,
    #[serde(default)]
    pub cost_model: CostModelKind,
    #[serde(default = "default_clone_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// 0 means use the global worker count.
    #[serde(default)]
    pub max_workers: usize,
}

fn default_min_lines() -> usize {
    5
}
fn default_min_nodes() -> usize {
    10
}
fn default_max_edit_distance() -> f64 {
    50.0
}
fn default_type1_threshold() -> f64 {
    0.98
}
fn default_type2_threshold() -> f64 {
    0.95
}
fn default_type3_threshold() -> f64 {
    0.80
}
fn default_type4_threshold() -> f64 {
    0.75
}
fn default_similarity_threshold() -> f64 {
    0.70
}
fn default_enabled_types() -> Vec<u8> {
    vec![1, 2, 3, 4]
}
fn default_group_mode() -> GroupMode {
    GroupMode::Connected
}
fn default_group_threshold() -> f64 {
    0.80
}
fn default_k_core_k() -> usize {
    2
}
fn default_lsh_auto_threshold() -> usize {
    500
}
fn default_lsh_bands() -> usize {
    32
}
fn default_lsh_rows() -> usize {
    4
}
fn default_lsh_hashes() -> usize {
    128
}
fn default_clone_timeout() -> u64 {
    300
}
fn default_batch_size() -> usize {
    1000
}

impl Default for CloneConfig {
    fn default() -> Self {
        toml::from_str("").expect("empty clone config uses defaults")
    }
}

impl CloneConfig {
    /// LSH engages when forced on, or when the fragment count reaches the
    /// auto threshold.
    pub fn lsh_active(&self, fragment_count: usize) -> bool {
        match self.use_lsh {
            Some(forced) => forced,
            None => fragment_count >= self.lsh_auto_threshold,
        }
    }

    pub fn type_enabled(&self, type_number: u8) -> bool {
        self.enabled_types.contains(&type_number)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupMode {
    Connected,
    Star,
    CompleteLinkage,
    KCore,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostModelKind {
    #[default]
    Default,
    Weighted,
    /// Language-aware costs by kind family.
    Python,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CboConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cbo_low")]
    pub low_threshold: u32,
    #[serde(default = "default_cbo_medium")]
    pub medium_threshold: u32,
    #[serde(default)]
    pub include_builtins: bool,
    #[serde(default = "default_true")]
    pub include_imports: bool,
}

fn default_cbo_low() -> u32 {
    4
}
fn default_cbo_medium() -> u32 {
    8
}

impl Default for CboConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            low_threshold: default_cbo_low(),
            medium_threshold: default_cbo_medium(),
            include_builtins: false,
            include_imports: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DepsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub include_stdlib: bool,
    #[serde(default)]
    pub include_third_party: bool,
    #[serde(default = "default_true")]
    pub follow_relative: bool,
    #[serde(default = "default_true")]
    pub detect_cycles: bool,
}

impl Default for DepsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            include_stdlib: false,
            include_third_party: false,
            follow_relative: true,
            detect_cycles: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchitectureConfig {
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub layers: Vec<LayerConfig>,
    #[serde(default)]
    pub rules: Vec<LayerRule>,
}

impl ArchitectureConfig {
    pub fn is_configured(&self) -> bool {
        !self.layers.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerConfig {
    pub name: String,
    /// Glob patterns over dotted module names, first match wins.
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerRule {
    pub from_layer: String,
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Report directory, relative to the project root.
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_output_format")]
    pub format: String,
    #[serde(default = "default_sort_by")]
    pub sort_by: String,
}

fn default_output_directory() -> PathBuf {
    PathBuf::from(".reports")
}
fn default_output_format() -> String {
    "text".to_string()
}
fn default_sort_by() -> String {
    "location".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            format: default_output_format(),
            sort_by: default_sort_by(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// CLI-side overrides; `None` means "not explicitly set", and only
/// explicitly set values win over file values.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub max_complexity: Option<u32>,
    pub min_severity: Option<String>,
    pub format: Option<String>,
    pub output_directory: Option<PathBuf>,
    pub skip_clones: bool,
    pub skip_deps: bool,
    pub skip_cbo: bool,
    pub skip_dead_code: bool,
    pub deadline_seconds: Option<u64>,
}

impl PyvetConfig {
    /// Locate and load the configuration for a project root: `.pyvet.toml`
    /// first, then `pyvet.toml`, walking up parent directories. Missing
    /// files mean defaults.
    pub fn load(project_root: &Path) -> Result<Self> {
        let mut dir = Some(project_root);
        while let Some(current) = dir {
            for name in [".pyvet.toml", "pyvet.toml"] {
                let candidate = current.join(name);
                if candidate.is_file() {
                    return Self::from_file(&candidate);
                }
            }
            dir = current.parent();
        }
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("failed to read {}: {e}", path.display())))?;
        let config: PyvetConfig = toml::from_str(&content)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        Ok(config)
    }

    /// Apply CLI overrides; explicitly set flags win over file values.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(max) = overrides.max_complexity {
            self.complexity.max_complexity = max;
        }
        if let Some(ref severity) = overrides.min_severity {
            self.dead_code.min_severity = severity.clone();
        }
        if let Some(ref format) = overrides.format {
            self.output.format = format.clone();
        }
        if let Some(ref dir) = overrides.output_directory {
            self.output.directory = dir.clone();
        }
        if let Some(deadline) = overrides.deadline_seconds {
            self.deadline_seconds = deadline;
        }
        if overrides.skip_clones {
            self.clone.enabled = false;
        }
        if overrides.skip_deps {
            self.deps.enabled = false;
        }
        if overrides.skip_cbo {
            self.cbo.enabled = false;
        }
        if overrides.skip_dead_code {
            self.dead_code.enabled = false;
        }
    }

    /// Validate the whole record. Runs before any analysis; violations are
    /// configuration errors and never recovered.
    pub fn validate(&self) -> Result<()> {
        if self.complexity.low_threshold >= self.complexity.medium_threshold {
            return Err(Error::config(format!(
                "complexity low_threshold ({}) must be below medium_threshold ({})",
                self.complexity.low_threshold, self.complexity.medium_threshold
            )));
        }
        self.dead_code.min_severity()?;
        self.validate_clone()?;
        if self.cbo.low_threshold >= self.cbo.medium_threshold {
            return Err(Error::config(format!(
                "cbo low_threshold ({}) must be below medium_threshold ({})",
                self.cbo.low_threshold, self.cbo.medium_threshold
            )));
        }
        self.validate_architecture()?;
        match self.output.format.as_str() {
            "text" | "json" | "yaml" | "csv" | "html" | "dot" => {}
            other => {
                return Err(Error::config(format!("unknown output format: {other}")));
            }
        }
        match self.output.sort_by.as_str() {
            "location" | "complexity" | "severity" => {}
            other => {
                return Err(Error::config(format!("unknown sort key: {other}")));
            }
        }
        Ok(())
    }

    fn validate_clone(&self) -> Result<()> {
        let c = &self.clone;
        let thresholds = [
            ("type1_threshold", c.type1_threshold),
            ("type2_threshold", c.type2_threshold),
            ("type3_threshold", c.type3_threshold),
            ("type4_threshold", c.type4_threshold),
            ("similarity_threshold", c.similarity_threshold),
            ("group_threshold", c.group_threshold),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::config(format!(
                    "clone {name} must be within [0, 1], got {value}"
                )));
            }
        }
        // The type thresholds must strictly descend.
        if !(c.type1_threshold > c.type2_threshold
            && c.type2_threshold > c.type3_threshold
            && c.type3_threshold > c.type4_threshold)
        {
            return Err(Error::config(format!(
                "clone type thresholds must satisfy type1 > type2 > type3 > type4, got {} / {} / {} / {}",
                c.type1_threshold, c.type2_threshold, c.type3_threshold, c.type4_threshold
            )));
        }
        if c.min_lines == 0 || c.min_nodes == 0 {
            return Err(Error::config(
                "clone min_lines and min_nodes must be at least 1",
            ));
        }
        if c.lsh_bands * c.lsh_rows != c.lsh_hashes {
            return Err(Error::config(format!(
                "clone lsh_bands * lsh_rows must equal lsh_hashes ({} * {} != {})",
                c.lsh_bands, c.lsh_rows, c.lsh_hashes
            )));
        }
        for t in &c.enabled_types {
            if !(1..=4).contains(t) {
                return Err(Error::config(format!("unknown clone type: {t}")));
            }
        }
        if c.batch_size == 0 {
            return Err(Error::config("clone batch_size must be at least 1"));
        }
        Ok(())
    }

    fn validate_architecture(&self) -> Result<()> {
        let layer_names: Vec<&str> = self
            .architecture
            .layers
            .iter()
            .map(|l| l.name.as_str())
            .collect();
        for layer in &self.architecture.layers {
            for pattern in &layer.patterns {
                glob::Pattern::new(pattern).map_err(|e| {
                    Error::config(format!("layer {} pattern {pattern}: {e}", layer.name))
                })?;
            }
        }
        for rule in &self.architecture.rules {
            if !layer_names.contains(&rule.from_layer.as_str()) {
                return Err(Error::config(format!(
                    "architecture rule references unknown layer: {}",
                    rule.from_layer
                )));
            }
            for target in rule.allow.iter().chain(rule.deny.iter()) {
                if !layer_names.contains(&target.as_str()) {
                    return Err(Error::config(format!(
                        "architecture rule for {} references unknown layer: {target}",
                        rule.from_layer
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Default config file contents written by `pyvet init`.
pub fn default_config_toml() -> String {
    let defaults = PyvetConfig::default();
    toml::to_string_pretty(&defaults).expect("default config serializes")
}
