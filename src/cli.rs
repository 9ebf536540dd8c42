//! CLI surface: argument parsing and worker-pool setup.

use crate::config::ConfigOverrides;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pyvet",
    version,
    about = "Static code-quality analyzer for Python"
)]
pub struct Cli {
    /// Explicit configuration file; found by discovery otherwise
    #[arg(long, global = true, env = "PYVET_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze sources and emit the aggregated report
    Analyze {
        /// Files or directories to analyze
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,

        /// Output format: text, json, yaml, csv, html, dot
        #[arg(long, short)]
        format: Option<String>,

        /// Write a timestamped report file under this directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Also write the report file (to output.directory) in addition
        /// to stdout
        #[arg(long)]
        report: bool,

        /// Worker threads; 0 means hardware parallelism
        #[arg(long, short, default_value_t = 0)]
        jobs: usize,

        /// Only include patterns (glob over relative paths)
        #[arg(long)]
        include: Vec<String>,

        /// Exclude patterns; exclude wins over include
        #[arg(long)]
        exclude: Vec<String>,

        /// Do not recurse into subdirectories
        #[arg(long)]
        no_recursive: bool,

        /// Override dead_code.min_severity
        #[arg(long)]
        min_severity: Option<String>,

        /// Override complexity.max_complexity
        #[arg(long)]
        max_complexity: Option<u32>,

        /// Overall deadline in seconds
        #[arg(long)]
        deadline: Option<u64>,

        #[arg(long)]
        skip_clones: bool,
        #[arg(long)]
        skip_deps: bool,
        #[arg(long)]
        skip_cbo: bool,
        #[arg(long)]
        skip_dead_code: bool,
    },

    /// Analyze and exit non-zero when quality issues are found
    Check {
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,

        #[arg(long, short, default_value_t = 0)]
        jobs: usize,

        #[arg(long)]
        include: Vec<String>,

        #[arg(long)]
        exclude: Vec<String>,
    },

    /// Write a default .pyvet.toml into the current directory
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

impl Commands {
    pub fn jobs(&self) -> usize {
        match self {
            Commands::Analyze { jobs, .. } | Commands::Check { jobs, .. } => *jobs,
            Commands::Init { .. } => 0,
        }
    }
}

/// Resolve the worker count: explicit, or hardware parallelism.
pub fn worker_count(jobs: usize) -> usize {
    if jobs > 0 {
        jobs
    } else {
        num_cpus::get()
    }
}

/// Configure the global rayon pool once, before any parallel work.
pub fn configure_thread_pool(workers: usize) {
    let result = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build_global();
    if let Err(e) = result {
        // already configured (tests); the existing pool is fine
        tracing::debug!("thread pool already configured: {e}");
    }
}

/// Collect CLI overrides that should win over file configuration.
pub fn overrides_from(command: &Commands) -> ConfigOverrides {
    match command {
        Commands::Analyze {
            format,
            output,
            min_severity,
            max_complexity,
            deadline,
            skip_clones,
            skip_deps,
            skip_cbo,
            skip_dead_code,
            ..
        } => ConfigOverrides {
            max_complexity: *max_complexity,
            min_severity: min_severity.clone(),
            format: format.clone(),
            output_directory: output.clone(),
            skip_clones: *skip_clones,
            skip_deps: *skip_deps,
            skip_cbo: *skip_cbo,
            skip_dead_code: *skip_dead_code,
            deadline_seconds: *deadline,
        },
        _ => ConfigOverrides::default(),
    }
}
