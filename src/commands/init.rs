use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cli::InitArgs;
use crate::config::CONFIG_FILE;

const DIRECTORIES: &[&str] = &["html", "posts", "templates", "static"];

const DEFAULT_CONFIG: &str = include_str!("../../theme/quire.yaml");
const SAMPLE_POST: &str = include_str!("../../theme/hello-quire.md");

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../theme/templates/base.html")),
    ("index.html", include_str!("../../theme/templates/index.html")),
    ("tag.html", include_str!("../../theme/templates/tag.html")),
    ("tags.html", include_str!("../../theme/templates/tags.html")),
    (
        "layouts/post_simple.html",
        include_str!("../../theme/templates/layouts/post_simple.html"),
    ),
    (
        "layouts/post_layout.html",
        include_str!("../../theme/templates/layouts/post_layout.html"),
    ),
    (
        "layouts/post_banner.html",
        include_str!("../../theme/templates/layouts/post_banner.html"),
    ),
];

const STATIC_ASSETS: &[(&str, &str)] = &[
    ("js/theme-image.js", include_str!("../../theme/static/js/theme-image.js")),
    ("js/copy-code.js", include_str!("../../theme/static/js/copy-code.js")),
    ("css/style.css", include_str!("../../theme/static/css/style.css")),
];

pub fn run_init_command(args: InitArgs) -> Result<()> {
    let root = match args.root {
        Some(value) => PathBuf::from(value),
        None => env::current_dir().context("failed to resolve current directory")?,
    };

    let created = initialize(&root)?;
    println!(
        "Initialized quire workspace in {} ({} files created)",
        root.display(),
        created
    );
    Ok(())
}

/// Seeds everything that is missing and returns how many files were written.
fn initialize(root: &Path) -> Result<usize> {
    establish_directories(root)?;

    let mut created = 0usize;
    if write_if_missing(&root.join(CONFIG_FILE), DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {CONFIG_FILE}"))?
    {
        created += 1;
    }

    for (name, contents) in TEMPLATES {
        if write_if_missing(&root.join("templates").join(name), contents)
            .with_context(|| format!("failed to write templates/{name}"))?
        {
            created += 1;
        }
    }

    for (name, contents) in STATIC_ASSETS {
        if write_if_missing(&root.join("static").join(name), contents)
            .with_context(|| format!("failed to write static/{name}"))?
        {
            created += 1;
        }
    }

    if write_if_missing(&root.join("posts").join("hello-quire.md"), SAMPLE_POST)
        .context("failed to write sample post")?
    {
        created += 1;
    }

    Ok(created)
}

fn establish_directories(root: &Path) -> Result<()> {
    for entry in DIRECTORIES {
        let path = root.join(entry);
        if path.exists() {
            continue;
        }
        fs::create_dir_all(&path)
            .with_context(|| format!("failed to create directory {}", path.display()))?;
    }
    Ok(())
}

fn write_if_missing(path: &Path, contents: &str) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut file =
        fs::File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}
