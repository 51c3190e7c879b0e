use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

pub const CONFIG_FILE: &str = "quire.yaml";

pub fn find_project_root(start: impl AsRef<Path>) -> Result<PathBuf> {
    let mut current = start.as_ref().to_path_buf();

    loop {
        let candidate = current.join(CONFIG_FILE);
        if candidate.exists() {
            return Ok(current);
        }

        if !current.pop() {
            bail!(
                "could not locate {} starting from {}",
                CONFIG_FILE,
                start.as_ref().display()
            );
        }
    }
}

/// Picks the explicit `--root` when given, otherwise the nearest ancestor holding quire.yaml.
pub fn resolve_root(explicit: Option<&str>) -> Result<PathBuf> {
    match explicit {
        Some(value) => {
            let path = PathBuf::from(value);
            if !path.is_dir() {
                bail!("project root {} is not a directory", path.display());
            }
            Ok(path)
        }
        None => {
            let cwd = env::current_dir().context("failed to resolve current directory")?;
            find_project_root(cwd)
        }
    }
}
