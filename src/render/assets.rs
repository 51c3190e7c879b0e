use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use walkdir::WalkDir;

/// Copies `static/` verbatim into the output root. A missing directory copies nothing.
pub(super) fn copy_static_assets(root: &Path, html_root: &Path) -> Result<usize> {
    let static_dir = root.join("static");
    if !static_dir.exists() {
        return Ok(0);
    }

    let mut copied = 0usize;
    for entry in WalkDir::new(&static_dir) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }
        let relative = entry.path().strip_prefix(&static_dir)?;
        let destination = html_root.join(relative);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::copy(entry.path(), &destination).with_context(|| {
            format!(
                "failed to copy static asset from {} to {}",
                entry.path().display(),
                destination.display()
            )
        })?;
        copied += 1;
    }

    Ok(copied)
}
