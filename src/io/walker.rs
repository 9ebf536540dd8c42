//! Python source discovery with include/exclude glob filtering.

use crate::core::errors::{Error, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

pub struct FileWalker {
    root: PathBuf,
    recursive: bool,
    include: Vec<String>,
    exclude: Vec<String>,
}

impl FileWalker {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            recursive: true,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_include(mut self, patterns: Vec<String>) -> Self {
        self.include = patterns;
        self
    }

    pub fn with_exclude(mut self, patterns: Vec<String>) -> Self {
        self.exclude = patterns;
        self
    }

    pub fn walk(&self) -> Result<Vec<PathBuf>> {
        let mut builder = WalkBuilder::new(&self.root);
        builder.hidden(false).git_ignore(true);
        if !self.recursive {
            builder.max_depth(Some(1));
        }

        let mut files = Vec::new();
        for entry in builder.build() {
            let entry = entry.map_err(|e| Error::input(e.to_string()))?;
            let path = entry.path();
            if path.is_file() && self.should_process(path) {
                files.push(path.to_path_buf());
            }
        }
        files.sort();
        Ok(files)
    }

    fn should_process(&self, path: &Path) -> bool {
        if path.extension().map(|e| e != "py").unwrap_or(true) {
            return false;
        }
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let relative_str = relative.to_string_lossy();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        // exclude dominates include
        if matches_any(&self.exclude, &relative_str, &file_name) {
            return false;
        }
        if self.include.is_empty() {
            return true;
        }
        matches_any(&self.include, &relative_str, &file_name)
    }
}

fn matches_any(patterns: &[String], relative: &str, file_name: &str) -> bool {
    patterns.iter().any(|pattern| {
        glob::Pattern::new(pattern)
            .map(|p| p.matches(relative) || p.matches(file_name))
            .unwrap_or(false)
    })
}

/// Collect Python files for a mixed list of file and directory paths.
/// Explicitly named files bypass the include/exclude filters.
pub fn collect_files(
    paths: &[PathBuf],
    recursive: bool,
    include: &[String],
    exclude: &[String],
) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if !path.exists() {
            return Err(Error::input(format!("path does not exist: {}", path.display())));
        }
        if path.is_file() {
            if path.extension().map(|e| e == "py").unwrap_or(false) {
                files.push(path.clone());
            }
        } else {
            files.extend(
                FileWalker::new(path.clone())
                    .recursive(recursive)
                    .with_include(include.to_vec())
                    .with_exclude(exclude.to_vec())
                    .walk()?,
            );
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_path_buf();
        fs::create_dir_all(root.join("pkg")).unwrap();
        fs::create_dir_all(root.join("tests")).unwrap();
        fs::write(root.join("main.py"), "x = 1\n").unwrap();
        fs::write(root.join("pkg/__init__.py"), "").unwrap();
        fs::write(root.join("pkg/core.py"), "y = 2\n").unwrap();
        fs::write(root.join("tests/test_core.py"), "z = 3\n").unwrap();
        fs::write(root.join("README.md"), "# readme\n").unwrap();
        (dir, root)
    }

    #[test]
    fn finds_only_python_files() {
        let (_dir, root) = fixture();
        let files = FileWalker::new(root).walk().unwrap();
        assert_eq!(files.len(), 4);
        assert!(files.iter().all(|f| f.extension().unwrap() == "py"));
    }

    #[test]
    fn exclude_dominates_include() {
        let (_dir, root) = fixture();
        let files = FileWalker::new(root)
            .with_include(vec!["**/*.py".to_string()])
            .with_exclude(vec!["tests/**".to_string()])
            .walk()
            .unwrap();
        assert!(files
            .iter()
            .all(|f| !f.to_string_lossy().contains("test_core")));
    }

    #[test]
    fn non_recursive_stays_shallow() {
        let (_dir, root) = fixture();
        let files = FileWalker::new(root).recursive(false).walk().unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("main.py"));
    }

    #[test]
    fn explicit_file_bypasses_filters() {
        let (_dir, root) = fixture();
        let target = root.join("tests/test_core.py");
        let files = collect_files(
            &[target.clone()],
            true,
            &[],
            &["tests/**".to_string()],
        )
        .unwrap();
        assert_eq!(files, vec![target]);
    }

    #[test]
    fn missing_path_is_input_error() {
        let err = collect_files(&[PathBuf::from("/does/not/exist")], true, &[], &[]).unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }
}
