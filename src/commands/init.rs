//! The `init` command: write a default configuration file.

use crate::commands::EXIT_CLEAN;
use crate::config::default_config_toml;
use crate::core::errors::{Error, Result};
use std::path::Path;

pub fn handle_init(force: bool) -> Result<i32> {
    init_at(Path::new("."), force)
}

pub fn init_at(directory: &Path, force: bool) -> Result<i32> {
    let target = directory.join(".pyvet.toml");
    if target.exists() && !force {
        return Err(Error::config(format!(
            "{} already exists (use --force to overwrite)",
            target.display()
        )));
    }
    std::fs::write(&target, default_config_toml())
        .map_err(|e| Error::output(format!("cannot write {}: {e}", target.display())))?;
    println!("wrote {}", target.display());
    Ok(EXIT_CLEAN)
}
