use std::collections::HashSet;
use std::path::Path;

use anyhow::{Result, bail};
use minijinja::Environment;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::components::ComponentRegistry;
use crate::config::{Config, SeriesConfig, format_date};
use crate::content::Document;
use crate::markdown::Heading;
use crate::routes::tag_url;
use crate::tags::slug;
use crate::template::render_named;

use super::utils::{format_rfc3339, log_status, write_page};

#[derive(Debug, Clone, Serialize)]
pub(super) struct TagLink {
    pub(super) name: String,
    pub(super) slug: String,
    pub(super) url: String,
}

/// What listings (home page, tag pages) know about a document.
#[derive(Debug, Clone, Serialize)]
pub(super) struct DocumentSummary {
    pub(super) title: String,
    pub(super) slug: String,
    pub(super) date: String,
    pub(super) date_iso: String,
    pub(super) tags: Vec<TagLink>,
    pub(super) summary: String,
    pub(super) permalink: String,
    pub(super) series: Option<String>,
    #[serde(flatten)]
    pub(super) extra: serde_json::Map<String, JsonValue>,
}

#[derive(Serialize)]
struct DocumentTemplate<'a> {
    #[serde(flatten)]
    summary: &'a DocumentSummary,
    body: &'a str,
    headings: &'a [Heading],
}

/// Every `series:` key in front matter must be declared in quire.yaml.
pub(super) fn check_series_membership(documents: &[Document], config: &Config) -> Result<()> {
    for document in documents {
        if let Some(key) = document.series.as_deref()
            && config.series(key).is_none()
        {
            bail!(
                "{}: series '{}' is not defined in quire.yaml",
                document.content_path.display(),
                key
            );
        }
    }
    Ok(())
}

/// Renders each document through its layout and returns the summaries in
/// the same order as `documents`.
pub(super) fn render_documents(
    html_root: &Path,
    config: &Config,
    env: &Environment<'static>,
    registry: &ComponentRegistry<'_>,
    documents: &[Document],
    verbose: bool,
) -> Result<Vec<DocumentSummary>> {
    let mut summaries = Vec::with_capacity(documents.len());

    for document in documents {
        let body = registry.render_body(document, config)?;
        let summary = build_summary(config, document, &body.excerpt)?;
        let series: Option<&SeriesConfig> =
            document.series.as_deref().and_then(|key| config.series(key));

        let context = minijinja::context! {
            document => DocumentTemplate {
                summary: &summary,
                body: &body.html,
                headings: &body.headings,
            },
            series => series,
        };
        let rendered = render_named(
            env,
            document.layout.template_name(),
            context,
            &format!("rendering document {}", document.slug),
        )?;

        let output = html_root
            .join(document.permalink.trim_start_matches('/'))
            .join("index.html");
        write_page(&output, &rendered)?;
        log_status(verbose, "POST", format!("Rendered {}", document.permalink));

        summaries.push(summary);
    }

    Ok(summaries)
}

fn build_summary(config: &Config, document: &Document, excerpt: &str) -> Result<DocumentSummary> {
    let mut seen = HashSet::new();
    let tags = document
        .tags
        .iter()
        .filter_map(|raw| {
            let tag_slug = slug(raw);
            (!tag_slug.is_empty() && seen.insert(tag_slug.clone())).then(|| TagLink {
                name: raw.trim().to_string(),
                url: tag_url(&tag_slug),
                slug: tag_slug,
            })
        })
        .collect();

    Ok(DocumentSummary {
        title: document.title.clone(),
        slug: document.slug.clone(),
        date: format_date(&config.date_format, &document.date)?,
        date_iso: format_rfc3339(&document.date)?,
        tags,
        summary: document
            .summary
            .clone()
            .unwrap_or_else(|| excerpt.to_string()),
        permalink: document.permalink.clone(),
        series: document.series.clone(),
        extra: document.extra.clone(),
    })
}
