mod assets;
mod documents;
mod listing;
mod redirects;
mod utils;


use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::components::ComponentRegistry;
use crate::config::{CONFIG_FILE, Config};
use crate::content::discover_documents;
use crate::routes::enumerate_static_params;
use crate::tags::TagIndex;
use crate::template;

use assets::copy_static_assets;
use documents::{check_series_membership, render_documents};
use listing::{remove_stale_tag_pages, render_homepage, render_tag_pages, render_tags_index};
use redirects::write_redirects;
use utils::log_status;

pub const OUTPUT_DIR: &str = "html";
pub const TAG_DATA_FILE: &str = "tag-data.json";

#[derive(Clone, Copy, Debug, Default)]
pub struct RenderPlan {
    pub verbose: bool,
}

#[derive(Default, Debug)]
pub struct RenderStats {
    pub documents: usize,
    pub tags: usize,
    pub stale_tags_removed: usize,
    pub collisions: usize,
    pub redirects: usize,
    pub static_assets: usize,
}

pub fn render_site(root: &Path, plan: RenderPlan) -> Result<RenderStats> {
    let started = Instant::now();
    let mut stats = RenderStats::default();

    let config = Config::load(root.join(CONFIG_FILE))?;
    let html_root = root.join(OUTPUT_DIR);
    fs::create_dir_all(&html_root).context("failed to ensure html directory exists")?;

    let mut env = template::environment(&config)?;
    let template_count = template::load_templates(root, &mut env)?;
    let registry = ComponentRegistry::new(config.components.strategy, &env);
    log_status(
        plan.verbose,
        "STEP",
        format!(
            "Loaded {template_count} templates; components use the {:?} strategy",
            registry.strategy()
        ),
    );

    log_status(plan.verbose, "STEP", "Discovering documents");
    let documents = discover_documents(root.join("posts"), &config)?;
    check_series_membership(&documents, &config)?;

    log_status(plan.verbose, "STEP", "Rendering documents");
    let summaries = render_documents(
        &html_root,
        &config,
        &env,
        &registry,
        &documents,
        plan.verbose,
    )?;
    stats.documents = documents.len();

    log_status(plan.verbose, "STEP", "Indexing tags");
    let index = TagIndex::build(&documents);
    for collision in index.collisions() {
        stats.collisions += 1;
        log_status(
            true,
            "WARN",
            format!(
                "tags {} all map to /tags/{}/; their counts are merged",
                collision
                    .spellings
                    .iter()
                    .map(|spelling| format!("'{spelling}'"))
                    .collect::<Vec<_>>()
                    .join(", "),
                collision.slug
            ),
        );
    }
    index.write(html_root.join(TAG_DATA_FILE))?;

    let params = enumerate_static_params(&index)?;
    stats.stale_tags_removed = remove_stale_tag_pages(&html_root, &params, plan.verbose)?;
    stats.tags = render_tag_pages(
        &html_root,
        &env,
        &index,
        &params,
        &documents,
        &summaries,
        plan.verbose,
    )?;
    render_tags_index(&html_root, &env, &index)?;

    log_status(plan.verbose, "STEP", "Rendering homepage");
    render_homepage(&html_root, &env, &documents, &summaries)?;

    stats.redirects = write_redirects(&html_root, &config, &documents, &params, plan.verbose)?;

    log_status(plan.verbose, "STATIC", "Copying static assets");
    stats.static_assets = copy_static_assets(root, &html_root)?;

    log_status(plan.verbose, "DONE", "Render complete");

    println!(
        "[SUMMARY] documents: {}; tag pages: {} (removed {} stale); tag collisions: {}; redirects: {}; static assets copied: {}; elapsed: {:.2?}",
        stats.documents,
        stats.tags,
        stats.stale_tags_removed,
        stats.collisions,
        stats.redirects,
        stats.static_assets,
        started.elapsed()
    );

    Ok(stats)
}
