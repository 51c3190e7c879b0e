use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::CleanArgs;
use crate::config::resolve_root;
use crate::render::OUTPUT_DIR;

fn ensure_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to recreate {}", path.display()))?;
    }
    Ok(())
}

fn remove_path(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }

    if path.is_dir() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory {}", path.display()))?;
    } else {
        fs::remove_file(path)
            .with_context(|| format!("failed to remove file {}", path.display()))?;
    }

    Ok(true)
}

pub fn run_clean_command(args: CleanArgs) -> Result<()> {
    let root = resolve_root(args.root.as_deref())?;
    let html = root.join(OUTPUT_DIR);

    if clean_output(&html)? {
        println!("Removed html output and created a fresh html/ directory.");
    } else {
        println!("Created empty html/ directory.");
    }

    Ok(())
}

fn clean_output(html: &Path) -> Result<bool> {
    let removed = remove_path(html)?;
    ensure_directory(html)?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn removes_rendered_output() {
        let dir = TempDir::new().unwrap();
        let html = dir.path().join("html");
        fs::create_dir_all(html.join("tags/bicep")).unwrap();
        fs::write(html.join("tags/bicep/index.html"), "old").unwrap();

        assert!(clean_output(&html).unwrap());
        assert!(html.is_dir());
        assert_eq!(fs::read_dir(&html).unwrap().count(), 0);
    }

    #[test]
    fn creates_missing_output() {
        let dir = TempDir::new().unwrap();
        let html = dir.path().join("html");
        assert!(!clean_output(&html).unwrap());
        assert!(html.is_dir());
    }
}
