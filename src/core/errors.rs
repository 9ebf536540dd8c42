//! Shared error types for the application

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pyvet operations.
///
/// File-level errors (`Parse`, `Analysis`) are recovered inside each
/// analysis; everything else surfaces to the orchestrator.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing path, empty file set, permission denied
    #[error("Input error: {0}")]
    Input(String),

    /// Invalid configuration values; never recovered
    #[error("Configuration error: {0}")]
    Config(String),

    /// A file failed to parse; the file is skipped
    #[error("Parse error in {file}:{line}: {message}")]
    Parse {
        file: PathBuf,
        line: usize,
        message: String,
    },

    /// The AST lacked expected structural children
    #[error("Unexpected AST shape in {file}: {message}")]
    ParseShape { file: PathBuf, message: String },

    /// A per-file analytical failure; the file is skipped
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// The analysis was cancelled; a partial response is still returned
    #[error("{analysis} analysis timed out after {elapsed_secs}s")]
    Timeout { analysis: String, elapsed_secs: u64 },

    /// Formatting or report-write failure; surfaced after aggregation
    #[error("Output error: {0}")]
    Output(String),

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Glob pattern errors
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
}

impl Error {
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn parse(file: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            line,
            message: message.into(),
        }
    }

    pub fn parse_shape(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ParseShape {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn analysis(message: impl Into<String>) -> Self {
        Self::Analysis(message.into())
    }

    pub fn timeout(analysis: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            analysis: analysis.into(),
            elapsed_secs,
        }
    }

    pub fn output(message: impl Into<String>) -> Self {
        Self::Output(message.into())
    }

    /// True for errors recovered at file granularity rather than
    /// failing the whole analysis.
    pub fn is_file_level(&self) -> bool {
        matches!(
            self,
            Error::Parse { .. } | Error::ParseShape { .. } | Error::Analysis(_)
        )
    }

    /// Category label used in the end-of-run summary.
    pub fn category(&self) -> &'static str {
        match self {
            Error::Input(_) => "input",
            Error::Config(_) => "config",
            Error::Parse { .. } | Error::ParseShape { .. } => "parse",
            Error::Analysis(_) => "analysis",
            Error::Timeout { .. } => "timeout",
            Error::Output(_) => "output",
            Error::Io(_) => "io",
            Error::Json(_) | Error::Pattern(_) => "internal",
        }
    }

    /// Short hint printed alongside the categorized failure summary.
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Error::Input(_) => "check that the given paths exist and contain Python sources",
            Error::Config(_) => "fix the reported option in .pyvet.toml or the CLI flags",
            Error::Parse { .. } | Error::ParseShape { .. } => {
                "the file was skipped; verify it parses with a Python interpreter"
            }
            Error::Analysis(_) => "the file was skipped; re-run with RUST_LOG=debug for details",
            Error::Timeout { .. } => {
                "raise the analysis timeout or narrow the input set; partial results were kept"
            }
            Error::Output(_) => "check the report directory is writable",
            Error::Io(_) => "check file permissions",
            Error::Json(_) | Error::Pattern(_) => "this is likely a bug; please report it",
        }
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_level_errors_are_recoverable() {
        assert!(Error::parse("a.py", 3, "bad indent").is_file_level());
        assert!(Error::analysis("odd shape").is_file_level());
        assert!(!Error::config("bad threshold").is_file_level());
        assert!(!Error::timeout("clones", 300).is_file_level());
    }

    #[test]
    fn categories_are_stable() {
        assert_eq!(Error::input("x").category(), "input");
        assert_eq!(Error::parse_shape("a.py", "no condition").category(), "parse");
        assert_eq!(Error::output("x").category(), "output");
    }
}
