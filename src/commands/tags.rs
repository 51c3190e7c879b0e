use std::path::Path;

use anyhow::{Result, bail};

use crate::cli::TagsArgs;
use crate::config::{CONFIG_FILE, Config, resolve_root};
use crate::content::discover_documents;
use crate::render::{OUTPUT_DIR, TAG_DATA_FILE};
use crate::routes::tag_url;
use crate::tags::{IndexDiff, TagIndex};

pub fn run_tags_command(args: TagsArgs) -> Result<()> {
    let root = resolve_root(args.root.as_deref())?;
    let fresh = scan(&root)?;

    if args.check {
        let persisted = TagIndex::load(root.join(OUTPUT_DIR).join(TAG_DATA_FILE))?;
        check(&fresh, &persisted)?;
        println!(
            "{} matches posts/ ({} tags)",
            TAG_DATA_FILE,
            fresh.len()
        );
        return Ok(());
    }

    print!("{}", describe(&fresh));
    Ok(())
}

fn scan(root: &Path) -> Result<TagIndex> {
    let config = Config::load(root.join(CONFIG_FILE))?;
    let documents = discover_documents(root.join("posts"), &config)?;
    Ok(TagIndex::build(&documents))
}

fn describe(index: &TagIndex) -> String {
    let mut out = String::new();
    for (tag_slug, count) in index.counts() {
        out.push_str(&format!(
            "{tag_slug}\t{count}\t{}\t{}\n",
            tag_url(tag_slug),
            index.spellings(tag_slug).join(", ")
        ));
    }
    for collision in index.collisions() {
        out.push_str(&format!(
            "[WARN] {} share /tags/{}/\n",
            collision.spellings.join(", "),
            collision.slug
        ));
    }
    out.push_str(&format!(
        "{} tags across {} tag assignments\n",
        index.len(),
        index.total()
    ));
    out
}

fn check(fresh: &TagIndex, persisted: &TagIndex) -> Result<()> {
    let diff = fresh.diff(persisted);
    if diff.is_empty() {
        return Ok(());
    }
    bail!("{} is out of date:\n{}", TAG_DATA_FILE, describe_diff(&diff))
}

fn describe_diff(diff: &IndexDiff) -> String {
    let mut lines = Vec::new();
    for key in &diff.missing {
        lines.push(format!("  missing: {key}"));
    }
    for key in &diff.extra {
        lines.push(format!("  extra: {key}"));
    }
    for (key, want, have) in &diff.changed {
        lines.push(format!("  changed: {key} (expected {want}, found {have})"));
    }
    lines.join("\n")
}
