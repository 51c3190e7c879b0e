use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use minijinja::Environment;
use serde::Serialize;

use crate::content::Document;
use crate::routes::{TagParam, render_tag, sort_newest_first, tag_url};
use crate::tags::TagIndex;
use crate::template::render_named;

use super::documents::DocumentSummary;
use super::utils::{log_status, remove_dir_if_empty, remove_file_if_exists, write_page};

#[derive(Serialize)]
struct TagContext<'a> {
    slug: &'a str,
    title: &'a str,
    name: &'a str,
    url: String,
    count: usize,
}

#[derive(Serialize)]
struct TagEntry<'a> {
    slug: &'a str,
    name: &'a str,
    url: String,
    count: usize,
}

/// Every document, newest first.
pub(super) fn render_homepage(
    html_root: &Path,
    env: &Environment<'static>,
    documents: &[Document],
    summaries: &[DocumentSummary],
) -> Result<()> {
    let by_slug = summaries_by_slug(documents, summaries);
    let mut ordered: Vec<&Document> = documents.iter().collect();
    sort_newest_first(&mut ordered);
    let newest_first: Vec<&DocumentSummary> = ordered
        .iter()
        .filter_map(|document| by_slug.get(document.slug.as_str()).copied())
        .collect();

    let rendered = render_named(
        env,
        "index.html",
        minijinja::context! { documents => newest_first },
        "rendering homepage",
    )?;
    write_page(&html_root.join("index.html"), &rendered)
}

/// One page per route parameter. `summaries` is parallel to `documents`.
pub(super) fn render_tag_pages(
    html_root: &Path,
    env: &Environment<'static>,
    index: &TagIndex,
    params: &[TagParam],
    documents: &[Document],
    summaries: &[DocumentSummary],
    verbose: bool,
) -> Result<usize> {
    let by_slug = summaries_by_slug(documents, summaries);

    for param in params {
        let page = render_tag(documents, &param.tag);
        let listed: Vec<&DocumentSummary> = page
            .documents
            .iter()
            .filter_map(|document| by_slug.get(document.slug.as_str()).copied())
            .collect();

        let tag = TagContext {
            slug: &page.slug,
            title: &page.title,
            name: index.display_name(&page.slug),
            url: tag_url(&page.slug),
            count: listed.len(),
        };
        let rendered = render_named(
            env,
            "tag.html",
            minijinja::context! { tag => tag, documents => listed },
            &format!("rendering tag {}", page.slug),
        )?;
        write_page(&tag_page_path(html_root, &page.slug), &rendered)?;
        log_status(
            verbose,
            "TAG",
            format!("Rendered {} ({} documents)", tag_url(&page.slug), listed.len()),
        );
    }

    Ok(params.len())
}

pub(super) fn render_tags_index(
    html_root: &Path,
    env: &Environment<'static>,
    index: &TagIndex,
) -> Result<()> {
    let tags: Vec<TagEntry<'_>> = index
        .counts()
        .iter()
        .map(|(tag_slug, count)| TagEntry {
            slug: tag_slug,
            name: index.display_name(tag_slug),
            url: tag_url(tag_slug),
            count: *count,
        })
        .collect();

    let rendered = render_named(
        env,
        "tags.html",
        minijinja::context! { tags => tags },
        "rendering tag list",
    )?;
    write_page(&html_root.join("tags").join("index.html"), &rendered)
}

/// Removes tag pages whose slug is no longer routed.
pub(super) fn remove_stale_tag_pages(
    html_root: &Path,
    params: &[TagParam],
    verbose: bool,
) -> Result<usize> {
    let tags_dir = html_root.join("tags");
    if !tags_dir.exists() {
        return Ok(0);
    }

    let keep: BTreeSet<&str> = params.iter().map(|param| param.tag.as_str()).collect();
    let mut removed = 0usize;

    let entries = fs::read_dir(&tags_dir)
        .with_context(|| format!("failed to read {}", tags_dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read {}", tags_dir.display()))?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if keep.contains(name.as_str()) {
            continue;
        }

        let page = entry.path().join("index.html");
        if page.exists() {
            remove_file_if_exists(&page)?;
            removed += 1;
            log_status(verbose, "TAG", format!("Removed stale tag page /tags/{name}/"));
        }
        remove_dir_if_empty(&entry.path())?;
    }

    Ok(removed)
}

fn summaries_by_slug<'a>(
    documents: &'a [Document],
    summaries: &'a [DocumentSummary],
) -> HashMap<&'a str, &'a DocumentSummary> {
    documents
        .iter()
        .zip(summaries)
        .map(|(document, summary)| (document.slug.as_str(), summary))
        .collect()
}

fn tag_page_path(html_root: &Path, tag_slug: &str) -> PathBuf {
    html_root.join("tags").join(tag_slug).join("index.html")
}
